use std::collections::HashMap;

use tracing::{event, Level};

use crate::config::Config;
use crate::error::{Error, ErrorKind, LocationExt, Result};
use crate::flag_state::FlagState;
use crate::parser::{
    AddressingMode, Argument, Directive, DirectiveArgument, DirectiveName, Instruction, LineItem,
    Mnemonic, Statement, SymbolTable,
};

pub use encoding::{decode, disassemble, encode, instruction_size, operand_size};
pub use lookup_tables::{decode_opcode, opcode_for};

mod encoding;
pub(crate) mod lookup_tables;

/// Highest address the 24-bit program counter can reach.
const ADDRESS_LIMIT: u32 = 0x100_0000;

/// What one layout pass learned: symbol values (constants and label
/// addresses) and the joined flag state of every jump into each label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Layout {
    symbols: SymbolTable,
    incoming: HashMap<String, FlagState>,
}

#[derive(Debug)]
struct GenerationState<'a> {
    previous: &'a Layout,
    constants: &'a SymbolTable,
    layout: Layout,
    program_counter: u32,
    state: FlagState,
    reachable: bool,
    /// Only present in the final pass.
    output: Option<Vec<u8>>,
}

/// Assembles parsed statements into bytes.
///
/// Layout passes run until label addresses and the flag states flowing into
/// labels stop changing; a final pass then encodes everything with those.
pub fn generate_code(statements: &[Statement], config: &Config) -> Result<Vec<u8>> {
    let constants = collect_constants(statements)?;
    let labels = statements
        .iter()
        .flat_map(|s| &s.items)
        .filter(|item| matches!(item, LineItem::Label(_)))
        .count();
    // each label's incoming state can only lose information a bounded
    // number of times
    let max_passes = 2 + 12 * labels;

    let mut layout = Layout {
        symbols: constants.clone(),
        incoming: HashMap::new(),
    };
    let mut settled = false;
    for pass in 1..=max_passes {
        let next = GenerationState::new(config, &layout, &constants, false)
            .run(statements)?
            .layout;
        event!(Level::DEBUG, pass, symbols = next.symbols.len(), "layout pass");
        if next == layout {
            settled = true;
            break;
        }
        layout = next;
    }
    if !settled {
        return Err(Error::from(ErrorKind::Unsettled(max_passes)).in_file(&config.path));
    }

    let output = GenerationState::new(config, &layout, &constants, true)
        .run(statements)?
        .output
        .unwrap_or_default();
    event!(Level::DEBUG, bytes = output.len(), "emitted code");
    Ok(output)
}

fn equate(statement: &Statement) -> Option<(&str, &Argument)> {
    match statement.items.as_slice() {
        [LineItem::Label(name), LineItem::Directive(Directive {
            name: DirectiveName::Equ,
            argument: DirectiveArgument::Value(value),
        })] => Some((name, value)),
        _ => None,
    }
}

/// `.equ` definitions, in source order.  A definition may use constants
/// defined above it.
fn collect_constants(statements: &[Statement]) -> Result<SymbolTable> {
    let mut constants = SymbolTable::new();
    for statement in statements {
        if let Some((name, value)) = equate(statement) {
            let value = value.resolve(&constants).evaluate().at(&statement.location)?;
            if constants.insert(name.to_owned(), value).is_some() {
                return Err(Error::from(ErrorKind::DuplicateSymbol(name.to_owned()))
                    .at(&statement.location));
            }
            event!(Level::TRACE, name, value, "constant");
        }
    }
    Ok(constants)
}

/// `ADD` and `SUB` expand to a carry set-up followed by the real opcode.
fn lower(instruction: &Instruction) -> Vec<Instruction> {
    let setup = match instruction.mnemonic {
        Mnemonic::ADD => Mnemonic::CLC,
        Mnemonic::SUB => Mnemonic::SEC,
        _ => return vec![instruction.clone()],
    };
    vec![
        Instruction::new(setup, AddressingMode::Implied),
        Instruction {
            mnemonic: instruction.mnemonic.real_equivalent(),
            ..instruction.clone()
        },
    ]
}

/// Whether control may continue at the label named by the operand.
fn transfers_to_label(instruction: &Instruction) -> bool {
    let mnemonic = instruction.mnemonic;
    if mnemonic == Mnemonic::JMP || mnemonic.is_call() {
        matches!(
            instruction.addressing_mode,
            AddressingMode::Absolute | AddressingMode::AbsoluteLong
        )
    } else {
        mnemonic.is_branch()
    }
}

fn increment_pc(program_counter: &mut u32, by: usize) -> Result<()> {
    let next = *program_counter as usize + by;
    if next > ADDRESS_LIMIT as usize {
        return Err(ErrorKind::OutOfRange {
            value: next as i64,
            bytes: 3,
        }
        .into());
    }
    *program_counter = next as u32;
    Ok(())
}

impl<'a> GenerationState<'a> {
    fn new(config: &Config, previous: &'a Layout, constants: &'a SymbolTable, emit: bool) -> Self {
        GenerationState {
            previous,
            constants,
            layout: Layout {
                symbols: constants.clone(),
                incoming: previous.incoming.clone(),
            },
            program_counter: config.origin,
            state: config.initial_state,
            reachable: true,
            output: emit.then(Vec::new),
        }
    }

    fn emitting(&self) -> bool {
        self.output.is_some()
    }

    fn run(mut self, statements: &[Statement]) -> Result<Self> {
        for statement in statements {
            if equate(statement).is_some() {
                continue;
            }
            for item in &statement.items {
                self.item(item).at(&statement.location)?;
            }
        }
        Ok(self)
    }

    fn item(&mut self, item: &LineItem) -> Result<()> {
        match item {
            LineItem::Label(name) => self.label(name),
            LineItem::Instruction(instruction) => self.instruction(instruction),
            LineItem::Directive(directive) => self.directive(directive),
        }
    }

    fn label(&mut self, name: &str) -> Result<()> {
        let address = self.program_counter as i32;
        if self.layout.symbols.insert(name.to_owned(), address).is_some() {
            return Err(ErrorKind::DuplicateSymbol(name.to_owned()).into());
        }
        if let Some(incoming) = self.previous.incoming.get(name) {
            self.state = if self.reachable {
                self.state.join(incoming)
            } else {
                *incoming
            };
        }
        self.reachable = true;
        event!(Level::TRACE, name, address, state = %self.state, "label");
        Ok(())
    }

    /// A symbol's value: its value from this pass if already bound, else
    /// from the previous pass.
    fn symbol(&self, name: &str) -> Option<i32> {
        self.layout
            .symbols
            .get(name)
            .or_else(|| self.previous.symbols.get(name))
            .copied()
    }

    fn resolve(&self, argument: &Argument) -> Argument {
        match argument.label().and_then(|name| self.symbol(name)) {
            Some(value) => Argument::new(value),
            None => argument.clone(),
        }
    }

    fn instruction(&mut self, instruction: &Instruction) -> Result<()> {
        let instruction = &self.fit_constant(instruction);
        let resolved = Instruction {
            arg1: self.resolve(&instruction.arg1),
            arg2: self.resolve(&instruction.arg2),
            ..instruction.clone()
        };

        for part in lower(instruction) {
            let size = if self.emitting() {
                let bytes = self.encode(&part)?;
                let size = bytes.len();
                self.emit(&bytes);
                size
            } else {
                // a width that is still unknown fails in the final pass
                instruction_size(&part, &self.state).unwrap_or(2)
            };
            increment_pc(&mut self.program_counter, size)?;
        }

        if transfers_to_label(instruction) {
            if let Some(target) = instruction.arg1.label() {
                let entry = self.state.execute_branch(&resolved);
                self.layout
                    .incoming
                    .entry(target.to_owned())
                    .and_modify(|state| *state = state.join(&entry))
                    .or_insert(entry);
            }
        }

        self.state = self.state.execute(&resolved);
        if instruction.mnemonic.ends_flow() {
            self.reachable = false;
        }
        Ok(())
    }

    /// Constants are sized by their value, like literals.
    fn fit_constant(&self, instruction: &Instruction) -> Instruction {
        match instruction.arg1.label().and_then(|name| self.constants.get(name)) {
            Some(&value) => instruction.fit_to_value(value),
            None => instruction.clone(),
        }
    }

    /// Whether `name` is a code label rather than an `.equ` constant.
    fn is_address(&self, name: &str) -> bool {
        !self.constants.contains_key(name)
    }

    /// A label's address cut down to the low `size` bytes.
    fn bank_relative(&self, name: &str, size: usize) -> Result<i32> {
        let address = self
            .symbol(name)
            .ok_or_else(|| ErrorKind::UndefinedSymbol(name.to_owned()))?;
        let mask = (1i64 << (8 * size)) - 1;
        Ok((i64::from(address) & mask) as i32)
    }

    /// Encodes one real instruction at the current program counter.  Branch
    /// targets become displacements from the end of the instruction.
    fn encode(&self, instruction: &Instruction) -> Result<Vec<u8>> {
        let mode = instruction.addressing_mode;
        let operands = match instruction.arg1.label() {
            Some(name) if mode.is_relative() => {
                let target = self
                    .symbol(name)
                    .ok_or_else(|| ErrorKind::UndefinedSymbol(name.to_owned()))?;
                let size = instruction_size(instruction, &self.state)?;
                let end = i64::from(self.program_counter) + size as i64;
                let displacement = i64::from(target) - end;
                let displacement =
                    i32::try_from(displacement).map_err(|_| ErrorKind::OutOfRange {
                        value: displacement,
                        bytes: mode.fixed_operand_size().unwrap_or(1),
                    })?;
                instruction.clone().with_arg1(Argument::new(displacement))
            }
            // addresses are bank-relative: keep the bytes the mode has room for
            Some(name)
                if self.is_address(name)
                    && !mode.is_immediate()
                    && mode != AddressingMode::BlockMove =>
            {
                let size = mode.fixed_operand_size().unwrap_or(0);
                let address = self.bank_relative(name, size)?;
                instruction.clone().with_arg1(Argument::new(address))
            }
            _ => Instruction {
                arg1: self.resolve(&instruction.arg1),
                arg2: self.resolve(&instruction.arg2),
                ..instruction.clone()
            },
        };
        let bytes = encode(&operands, &self.state)?;
        event!(
            Level::TRACE,
            address = self.program_counter,
            instruction = %operands,
            "encoded"
        );
        Ok(bytes)
    }

    fn emit(&mut self, bytes: &[u8]) {
        if let Some(output) = self.output.as_mut() {
            output.extend_from_slice(bytes);
        }
    }

    fn directive(&mut self, directive: &Directive) -> Result<()> {
        match (&directive.argument, directive.name) {
            (DirectiveArgument::Value(value), DirectiveName::Org) => {
                let address = self.resolve(value).evaluate()?;
                self.program_counter = u32::try_from(address)
                    .ok()
                    .filter(|&a| a < ADDRESS_LIMIT)
                    .ok_or(ErrorKind::OutOfRange {
                        value: i64::from(address),
                        bytes: 3,
                    })?;
                event!(Level::DEBUG, address, "origin");
            }
            (DirectiveArgument::FlagState(state), name) => {
                self.state = *state;
                self.reachable = true;
                event!(Level::DEBUG, directive = %name, state = %state, "mode change");
            }
            (DirectiveArgument::List(values), name) => {
                let width = name.data_width().unwrap_or(1);
                for value in values {
                    if self.emitting() {
                        let value = match value.label() {
                            Some(name) if self.is_address(name) => {
                                self.bank_relative(name, width)?
                            }
                            _ => self.resolve(value).evaluate()?,
                        };
                        let bytes = encoding::little_endian(value, width, false)?;
                        self.emit(&bytes);
                    }
                    increment_pc(&mut self.program_counter, width)?;
                }
            }
            // equates were collected up front
            (DirectiveArgument::Value(_), _) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn assemble(source: &str) -> Result<Vec<u8>> {
        generate_code(&parse(source, "test.s")?, &Config::default())
    }

    #[test]
    fn basic_generation() {
        assert_eq!(Ok(vec![0x9C, 0x00, 0x03, 0x60]), assemble("  STZ $0300\n  RTS\n"));
    }

    #[test]
    fn labels_bind_to_program_counter() {
        let source = "
            .org $8000
        start:
            NOP
            JMP start
        ";
        assert_eq!(Ok(vec![0xEA, 0x4C, 0x00, 0x80]), assemble(source));
    }

    #[test]
    fn forward_and_backward_branches() {
        let source = "
        top:
            DEX
            BEQ done
            BRA top
        done:
            RTS
        ";
        // BEQ at 1, ends at 3, done at 5; BRA at 3, ends at 5, top at 0
        assert_eq!(Ok(vec![0xCA, 0xF0, 0x02, 0x80, 0xFB, 0x60]), assemble(source));
    }

    #[test]
    fn branch_out_of_range() {
        let mut source = String::from("top:\n");
        for _ in 0..130 {
            source.push_str("  NOP\n");
        }
        source.push_str("  BNE top\n");
        let e = assemble(&source).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::OutOfRange { .. }), "{:?}", e);
        assert_eq!(Some("test.s"), e.location().path.as_deref());
    }

    #[test]
    fn lowering_pseudo_mnemonics() {
        assert_eq!(
            vec![Mnemonic::CLC, Mnemonic::ADC],
            lower(&Instruction::new(Mnemonic::ADD, AddressingMode::ImmediateM))
                .iter()
                .map(|i| i.mnemonic)
                .collect::<Vec<_>>()
        );
        assert_eq!(Ok(vec![0x38, 0xE9, 0x01]), assemble("SUB #1"));
    }

    #[test]
    fn constants_and_duplicates() {
        assert_eq!(Ok(vec![0xE2, 0x30]), assemble("WIDTHS .equ $30\n SEP #WIDTHS"));
        assert_eq!(
            ErrorKind::DuplicateSymbol("a".to_owned()),
            *assemble("a .equ 1\na .equ 2").unwrap_err().kind()
        );
        assert_eq!(
            ErrorKind::DuplicateSymbol("a".to_owned()),
            *assemble("a:\na:").unwrap_err().kind()
        );
    }

    #[test]
    fn undefined_symbol_is_reported_with_location() {
        let e = assemble("  NOP\n  JMP nowhere\n").unwrap_err();
        assert_eq!(ErrorKind::UndefinedSymbol("nowhere".to_owned()), *e.kind());
        assert_eq!(Some(6), e.location().offset);
    }

    #[test]
    fn branch_target_state_is_joined() {
        // one path reaches `join` with a 16-bit accumulator, the other with
        // an 8-bit one
        let source = "
            .mode m16x16
            BCC join
            SEP #$20
        join:
            LDA #1
        ";
        let e = assemble(source).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::UnknownWidth { .. }), "{:?}", e);
    }

    #[test]
    fn state_flows_along_branches_into_unreachable_code() {
        let source = "
            .mode m16x16
            BRA skip
            .db 0
        skip:
            LDA #1
        ";
        assert_eq!(Ok(vec![0x80, 0x01, 0x00, 0xA9, 0x01, 0x00]), assemble(source));
    }

    #[test]
    fn settles_after_width_change_behind_backward_branch() {
        // the loop body is first laid out with a 16-bit index, then learns
        // from the back edge that the width is unknown
        let source = "
            .mode m8x16
        loop:
            LDX #1
            SEP #$10
            BRA loop
        ";
        let e = assemble(source).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::UnknownWidth { .. }), "{:?}", e);
    }

    #[test]
    fn constants_are_sized_by_value() {
        // a constant is a literal by another name: long when it needs a bank
        assert_eq!(
            Ok(vec![0xAF, 0x34, 0x12, 0x7E, 0xAF, 0x34, 0x12, 0x7E]),
            assemble("WRAM .equ $7E1234\n LDA WRAM\n LDA $7E1234")
        );
        assert_eq!(
            Ok(vec![0x85, 0x10, 0x8D, 0x00, 0x21]),
            assemble("ZP .equ $10\nINIDISP .equ $2100\n STA ZP\n STA INIDISP")
        );
        // and range-checked where the mnemonic has no wider form
        let e = assemble("FAR .equ $7E1234\n JSR FAR").unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::OutOfRange { .. }), "{:?}", e);
        assert!(matches!(
            assemble("BIG .equ $1234\n.db BIG").unwrap_err().kind(),
            ErrorKind::OutOfRange { .. }
        ));
    }

    #[test]
    fn data_labels_are_bank_relative() {
        let config = Config::default().with_origin(0x80_8000);
        let source = "handler: RTS\n.dw handler\n.dl handler";
        assert_eq!(
            Ok(vec![0x60, 0x00, 0x80, 0x00, 0x80, 0x80]),
            generate_code(&parse(source, "test.s").unwrap(), &config)
        );
    }

    #[test]
    fn data_directives() {
        assert_eq!(
            Ok(vec![0x01, 0x02, 0x34, 0x12, 0x56, 0x34, 0x12, 0x07, 0x00]),
            assemble(".db 1, 2\n.dw $1234\n.dl $123456\nlabel: .dw label")
        );
        assert!(matches!(
            assemble(".db $100").unwrap_err().kind(),
            ErrorKind::OutOfRange { .. }
        ));
    }
}
