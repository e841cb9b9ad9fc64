use std::fmt;

use mnemonic::Mnemonic;
use operand::{AddressingMode, Argument, SymbolTable};

use crate::code_generator::lookup_tables::opcode_for;
use crate::error::{Error, ErrorKind, Result};
use crate::parser::{parse_argument, NumericType, TokenStream, TokenValue};

pub mod mnemonic;
pub mod operand;

/// A mnemonic with its addressing mode and operands.  Arguments a mode does
/// not use are left at their default (zero).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub addressing_mode: AddressingMode,
    pub arg1: Argument,
    pub arg2: Argument,
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, addressing_mode: AddressingMode) -> Self {
        Instruction {
            mnemonic,
            addressing_mode,
            arg1: Argument::default(),
            arg2: Argument::default(),
        }
    }

    pub fn with_arg1(self, arg1: Argument) -> Self {
        Instruction { arg1, ..self }
    }

    pub fn with_arg2(self, arg2: Argument) -> Self {
        Instruction { arg2, ..self }
    }

    pub fn resolve(&self, symbols: &SymbolTable) -> Instruction {
        Instruction {
            arg1: self.arg1.resolve(symbols),
            arg2: self.arg2.resolve(symbols),
            ..self.clone()
        }
    }

    /// Re-picks the direct, absolute or long variant of the addressing mode
    /// for a now known operand value, the way a literal of that value would
    /// have been sized.  The mode is kept when no variant fits.
    pub(crate) fn fit_to_value(&self, value: i32) -> Instruction {
        let mode = tiers_of(self.addressing_mode)
            .and_then(|tiers| pick_width(self.mnemonic, None, Some(value), tiers))
            .unwrap_or(self.addressing_mode);
        Instruction {
            addressing_mode: mode,
            ..self.clone()
        }
    }

    pub(crate) fn parse(stream: &mut TokenStream) -> Result<Self> {
        let location = stream.location();
        let mnemonic = match stream.peek_value() {
            Some(TokenValue::Mnemonic(m)) => *m,
            _ => return Err(stream.unexpected("a mnemonic")),
        };
        stream.advance();

        let shape = Shape::parse(stream)?;
        let (addressing_mode, arg1, arg2) = select_mode(mnemonic, shape).ok_or_else(|| {
            Error::new(ErrorKind::Syntax(format!(
                "invalid addressing mode for {}",
                mnemonic
            )))
            .at(&location)
        })?;
        Ok(Instruction {
            mnemonic,
            addressing_mode,
            arg1,
            arg2,
        })
    }

    fn render_operands(&self) -> String {
        use AddressingMode::*;
        let size = self
            .addressing_mode
            .fixed_operand_size()
            .unwrap_or_else(|| immediate_size(&self.arg1));
        let a = self.arg1.render(size);
        match self.addressing_mode {
            Implied => String::new(),
            Accumulator => "A".to_owned(),
            ImmediateM | ImmediateX | Immediate8 => format!("#{}", a),
            Direct | Absolute | AbsoluteLong => a,
            DirectX | AbsoluteX | AbsoluteLongX => format!("{},X", a),
            DirectY | AbsoluteY => format!("{},Y", a),
            DirectIndirect | AbsoluteIndirect => format!("({})", a),
            DirectXIndirect | AbsoluteXIndirect => format!("({},X)", a),
            DirectIndirectY => format!("({}),Y", a),
            DirectIndirectLong | AbsoluteIndirectLong => format!("[{}]", a),
            DirectIndirectLongY => format!("[{}],Y", a),
            StackRelative => format!("{},S", a),
            StackRelativeIndirectY => format!("({},S),Y", a),
            Relative8 | Relative16 => self.arg1.to_branch_offset(),
            BlockMove => format!("{},{}", self.arg1.render(1), self.arg2.render(1)),
        }
    }
}

fn immediate_size(arg: &Argument) -> usize {
    match arg.evaluate() {
        Ok(v) if (-0x80..=0xFF).contains(&v) => 1,
        Ok(_) => 2,
        Err(_) => 1,
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = self.render_operands();
        if operands.is_empty() {
            write!(f, "{}", self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, operands)
        }
    }
}

struct Operand {
    argument: Argument,
    width: NumericType,
}

impl Operand {
    fn parse(stream: &mut TokenStream) -> Result<Self> {
        let (argument, width) = parse_argument(stream)?;
        Ok(Operand { argument, width })
    }
}

/// The syntactic form of an operand, before a mode is chosen.
enum Shape {
    Bare,
    Accumulator,
    Immediate(Operand),
    Plain(Operand),
    IndexedX(Operand),
    IndexedY(Operand),
    Stack(Operand),
    Indirect(Operand),
    IndirectX(Operand),
    IndirectY(Operand),
    StackIndirectY(Operand),
    IndirectLong(Operand),
    IndirectLongY(Operand),
    Pair(Operand, Operand),
}

fn expect_register(stream: &mut TokenStream, register: &str) -> Result<()> {
    if stream.eat_register(register) {
        Ok(())
    } else {
        Err(stream.unexpected(register))
    }
}

impl Shape {
    fn parse(stream: &mut TokenStream) -> Result<Self> {
        if stream.at_end() {
            return Ok(Shape::Bare);
        }
        if stream.eat('#') {
            return Ok(Shape::Immediate(Operand::parse(stream)?));
        }
        if stream.eat('(') {
            let inner = Operand::parse(stream)?;
            if stream.eat(',') {
                if stream.eat_register("X") {
                    stream.expect(')')?;
                    return Ok(Shape::IndirectX(inner));
                }
                expect_register(stream, "S")?;
                stream.expect(')')?;
                stream.expect(',')?;
                expect_register(stream, "Y")?;
                return Ok(Shape::StackIndirectY(inner));
            }
            stream.expect(')')?;
            if stream.eat(',') {
                expect_register(stream, "Y")?;
                return Ok(Shape::IndirectY(inner));
            }
            return Ok(Shape::Indirect(inner));
        }
        if stream.eat('[') {
            let inner = Operand::parse(stream)?;
            stream.expect(']')?;
            if stream.eat(',') {
                expect_register(stream, "Y")?;
                return Ok(Shape::IndirectLongY(inner));
            }
            return Ok(Shape::IndirectLong(inner));
        }
        if stream.eat_register("A") {
            return Ok(Shape::Accumulator);
        }

        let first = Operand::parse(stream)?;
        if !stream.eat(',') {
            return Ok(Shape::Plain(first));
        }
        if stream.eat_register("X") {
            Ok(Shape::IndexedX(first))
        } else if stream.eat_register("Y") {
            Ok(Shape::IndexedY(first))
        } else if stream.eat_register("S") {
            Ok(Shape::Stack(first))
        } else {
            Ok(Shape::Pair(first, Operand::parse(stream)?))
        }
    }
}

fn supports(mnemonic: Mnemonic, mode: AddressingMode) -> bool {
    opcode_for(mnemonic.real_equivalent(), mode).is_some()
}

/// The direct, absolute and long variants of one operand form.
type Tiers = [Option<AddressingMode>; 3];

const PLAIN: Tiers = [
    Some(AddressingMode::Direct),
    Some(AddressingMode::Absolute),
    Some(AddressingMode::AbsoluteLong),
];
const INDEXED_X: Tiers = [
    Some(AddressingMode::DirectX),
    Some(AddressingMode::AbsoluteX),
    Some(AddressingMode::AbsoluteLongX),
];
const INDEXED_Y: Tiers = [
    Some(AddressingMode::DirectY),
    Some(AddressingMode::AbsoluteY),
    None,
];
const INDIRECT: Tiers = [
    Some(AddressingMode::DirectIndirect),
    Some(AddressingMode::AbsoluteIndirect),
    None,
];
const INDIRECT_X: Tiers = [
    Some(AddressingMode::DirectXIndirect),
    Some(AddressingMode::AbsoluteXIndirect),
    None,
];
const INDIRECT_LONG: Tiers = [
    Some(AddressingMode::DirectIndirectLong),
    Some(AddressingMode::AbsoluteIndirectLong),
    None,
];

fn tiers_of(mode: AddressingMode) -> Option<Tiers> {
    [PLAIN, INDEXED_X, INDEXED_Y, INDIRECT, INDIRECT_X, INDIRECT_LONG]
        .into_iter()
        .find(|tiers| tiers.contains(&Some(mode)))
}

/// Picks the direct, absolute or long variant of a mode.  An explicit
/// literal width decides; otherwise labels prefer absolute and known values
/// take the smallest variant they fit.
fn pick_width(
    mnemonic: Mnemonic,
    width: Option<usize>,
    value: Option<i32>,
    variants: Tiers,
) -> Option<AddressingMode> {
    let order: &[usize] = match (width, value) {
        (Some(1), _) => &[0],
        (Some(2), _) => &[1],
        (Some(_), _) => &[2],
        (None, None) => &[1, 2, 0],
        (None, Some(v)) if (0..=0xFF).contains(&v) => &[0, 1, 2],
        (None, Some(v)) if (0..=0xFFFF).contains(&v) => &[1, 2],
        (None, Some(_)) => &[2],
    };
    order
        .iter()
        .filter_map(|&tier| variants[tier])
        .find(|&mode| supports(mnemonic, mode))
}

fn first_supported(mnemonic: Mnemonic, modes: &[AddressingMode]) -> Option<AddressingMode> {
    modes.iter().copied().find(|&mode| supports(mnemonic, mode))
}

fn select_mode(mnemonic: Mnemonic, shape: Shape) -> Option<(AddressingMode, Argument, Argument)> {
    use AddressingMode::*;

    let sized = |operand: Operand, variants: Tiers| {
        let value = operand.argument.evaluate().ok();
        pick_width(mnemonic, operand.width.bytes(), value, variants)
            .map(|mode| (mode, operand.argument, Argument::default()))
    };
    let only = |mode: AddressingMode| [Some(mode), None, None];

    match shape {
        Shape::Plain(operand) if mnemonic.is_relative() => {
            first_supported(mnemonic, &[Relative8, Relative16])
                .map(|mode| (mode, operand.argument, Argument::default()))
        }
        Shape::Bare => first_supported(mnemonic, &[Implied, Accumulator])
            .map(|mode| (mode, Argument::default(), Argument::default())),
        Shape::Accumulator => first_supported(mnemonic, &[Accumulator])
            .map(|mode| (mode, Argument::default(), Argument::default())),
        Shape::Immediate(operand) => {
            first_supported(mnemonic, &[ImmediateM, ImmediateX, Immediate8])
                .map(|mode| (mode, operand.argument, Argument::default()))
        }
        Shape::Plain(operand) => sized(operand, PLAIN),
        Shape::IndexedX(operand) => sized(operand, INDEXED_X),
        Shape::IndexedY(operand) => sized(operand, INDEXED_Y),
        Shape::Stack(operand) => sized(operand, only(StackRelative)),
        Shape::Indirect(operand) => sized(operand, INDIRECT),
        Shape::IndirectX(operand) => sized(operand, INDIRECT_X),
        Shape::IndirectY(operand) => sized(operand, only(DirectIndirectY)),
        Shape::StackIndirectY(operand) => sized(operand, only(StackRelativeIndirectY)),
        Shape::IndirectLong(operand) => sized(operand, INDIRECT_LONG),
        Shape::IndirectLongY(operand) => sized(operand, only(DirectIndirectLongY)),
        Shape::Pair(first, second) => {
            supports(mnemonic, BlockMove).then(|| (BlockMove, first.argument, second.argument))
        }
    }
}
