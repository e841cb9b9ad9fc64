use crate::code_generator::lookup_tables::{decode_opcode, opcode_for};
use crate::error::{Error, ErrorKind, Result};
use crate::flag_state::FlagState;
use crate::parser::{AddressingMode, Argument, Instruction};

/// Operand bytes for `mode` under `state`.  Immediate operands of the
/// accumulator and index registers need the corresponding width bit.
pub fn operand_size(mode: AddressingMode, state: &FlagState) -> Result<usize> {
    let unknown = |register| {
        Error::from(ErrorKind::UnknownWidth {
            register,
            state: state.to_string(),
        })
    };
    match mode {
        AddressingMode::ImmediateM => state
            .accumulator_bytes()
            .ok_or_else(|| unknown("accumulator")),
        AddressingMode::ImmediateX => state.index_bytes().ok_or_else(|| unknown("index")),
        other => Ok(other.fixed_operand_size().unwrap_or(0)),
    }
}

pub fn instruction_size(instruction: &Instruction, state: &FlagState) -> Result<usize> {
    Ok(1 + operand_size(instruction.addressing_mode, state)?)
}

/// `value` as `size` little-endian bytes.  Unsigned operands may use the
/// full unsigned range or the negative half of the signed one; relative
/// displacements must fit the signed range.
pub(crate) fn little_endian(value: i32, size: usize, signed: bool) -> Result<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }
    let bits = 8 * size as u32;
    let low = -(1i64 << (bits - 1));
    let high = if signed {
        (1i64 << (bits - 1)) - 1
    } else {
        (1i64 << bits) - 1
    };
    let wide = i64::from(value);
    if !(low..=high).contains(&wide) {
        return Err(ErrorKind::OutOfRange {
            value: wide,
            bytes: size,
        }
        .into());
    }
    Ok(value.to_le_bytes()[..size].to_vec())
}

fn operand_byte(argument: &Argument) -> Result<u8> {
    let bytes = little_endian(argument.evaluate()?, 1, false)?;
    Ok(bytes[0])
}

/// Opcode plus operand bytes.  Every argument the mode uses must already be
/// resolved, and relative operands must already be displacements.
pub fn encode(instruction: &Instruction, state: &FlagState) -> Result<Vec<u8>> {
    let mode = instruction.addressing_mode;
    let opcode = opcode_for(instruction.mnemonic, mode).ok_or(ErrorKind::Encoding {
        mnemonic: instruction.mnemonic,
        mode,
    })?;
    let mut bytes = vec![opcode];
    if mode == AddressingMode::BlockMove {
        // destination bank comes first in memory
        bytes.push(operand_byte(&instruction.arg2)?);
        bytes.push(operand_byte(&instruction.arg1)?);
        return Ok(bytes);
    }
    let size = operand_size(mode, state)?;
    if size > 0 {
        let value = instruction.arg1.evaluate()?;
        bytes.extend(little_endian(value, size, mode.is_relative())?);
    }
    Ok(bytes)
}

fn from_little_endian(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .rev()
        .fold(0, |value, &byte| (value << 8) | i32::from(byte))
}

fn sign_extend(value: i32, size: usize) -> i32 {
    let shift = 32 - 8 * size as u32;
    (value << shift) >> shift
}

/// Reads one instruction from the front of `bytes`.  Returns it with the
/// number of bytes it occupies.
pub fn decode(bytes: &[u8], state: &FlagState) -> Result<(Instruction, usize)> {
    let (&opcode, operands) = bytes.split_first().ok_or_else(|| {
        Error::from(ErrorKind::Syntax("no bytes left to decode".to_owned()))
    })?;
    let instruction = decode_opcode(opcode);
    let mode = instruction.addressing_mode;
    let size = operand_size(mode, state)?;
    if operands.len() < size {
        return Err(ErrorKind::Truncated {
            opcode,
            needed: size,
            available: operands.len(),
        }
        .into());
    }

    let operands = &operands[..size];
    let instruction = match mode {
        AddressingMode::BlockMove => instruction
            .with_arg1(Argument::new(i32::from(operands[1])))
            .with_arg2(Argument::new(i32::from(operands[0]))),
        _ if size == 0 => instruction,
        _ if mode.is_relative() => {
            instruction.with_arg1(Argument::new(sign_extend(from_little_endian(operands), size)))
        }
        _ => instruction.with_arg1(Argument::new(from_little_endian(operands))),
    };
    Ok((instruction, 1 + size))
}

/// Decodes a whole byte stream, threading the flag state along so that
/// `REP`/`SEP` change how later immediates are read.
pub fn disassemble(bytes: &[u8], mut state: FlagState) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        let (instruction, size) =
            decode(&bytes[position..], &state).map_err(|e| e.at_offset(position))?;
        state = state.execute(&instruction);
        instructions.push(instruction);
        position += size;
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Mnemonic;

    fn m16x16() -> FlagState {
        FlagState::from_name("m16x16").unwrap()
    }

    fn lda_immediate(value: i32) -> Instruction {
        Instruction::new(Mnemonic::LDA, AddressingMode::ImmediateM).with_arg1(Argument::new(value))
    }

    #[test]
    fn every_opcode_round_trips() {
        for state in [FlagState::emulation(), m16x16()] {
            for opcode in 0..=255u8 {
                let bytes = [opcode, 0x12, 0x34, 0x56];
                let (instruction, size) = decode(&bytes, &state).unwrap();
                assert_eq!(
                    Ok(bytes[..size].to_vec()),
                    encode(&instruction, &state),
                    "{}",
                    instruction
                );

                let bare = decode_opcode(opcode);
                assert_eq!(Some(&opcode), encode(&bare, &state).unwrap().first());
            }
        }
    }

    #[test]
    fn immediate_follows_width_bits() {
        assert_eq!(Ok(vec![0xA9, 0x34]), encode(&lda_immediate(0x34), &FlagState::emulation()));
        assert_eq!(Ok(vec![0xA9, 0x34, 0x12]), encode(&lda_immediate(0x1234), &m16x16()));

        let ldx =
            Instruction::new(Mnemonic::LDX, AddressingMode::ImmediateX).with_arg1(Argument::new(1));
        let m8x16 = FlagState::from_name("m8x16").unwrap();
        assert_eq!(Ok(vec![0xA2, 0x01, 0x00]), encode(&ldx, &m8x16));
        assert_eq!(Ok(vec![0xA9, 0x01]), encode(&lda_immediate(1), &m8x16));
    }

    #[test]
    fn unknown_width_is_an_error() {
        let native = FlagState::from_name("native").unwrap();
        let e = encode(&lda_immediate(1), &native).unwrap_err();
        assert_eq!(
            ErrorKind::UnknownWidth {
                register: "accumulator",
                state: "native".to_owned()
            },
            *e.kind()
        );
        // fixed-size modes do not care
        let sta = Instruction::new(Mnemonic::STA, AddressingMode::Absolute)
            .with_arg1(Argument::new(0x2100));
        assert_eq!(Ok(vec![0x8D, 0x00, 0x21]), encode(&sta, &native));
    }

    #[test]
    fn range_checks() {
        let emu = FlagState::emulation();
        assert_eq!(Ok(vec![0xA9, 0xFF]), encode(&lda_immediate(-1), &emu));
        assert_eq!(
            ErrorKind::OutOfRange { value: 0x100, bytes: 1 },
            *encode(&lda_immediate(0x100), &emu).unwrap_err().kind()
        );

        let branch = |d| {
            Instruction::new(Mnemonic::BNE, AddressingMode::Relative8).with_arg1(Argument::new(d))
        };
        assert_eq!(Ok(vec![0xD0, 0x80]), encode(&branch(-128), &emu));
        assert_eq!(Ok(vec![0xD0, 0x7F]), encode(&branch(127), &emu));
        assert!(encode(&branch(128), &emu).is_err());
        assert!(encode(&branch(-129), &emu).is_err());
    }

    #[test]
    fn pseudo_mnemonics_do_not_encode() {
        let add = Instruction::new(Mnemonic::ADD, AddressingMode::ImmediateM);
        assert_eq!(
            ErrorKind::Encoding {
                mnemonic: Mnemonic::ADD,
                mode: AddressingMode::ImmediateM
            },
            *encode(&add, &FlagState::emulation()).unwrap_err().kind()
        );
    }

    #[test]
    fn unresolved_operand_is_an_error() {
        let jmp = Instruction::new(Mnemonic::JMP, AddressingMode::Absolute)
            .with_arg1(Argument::symbol("far"));
        assert_eq!(
            ErrorKind::UndefinedSymbol("far".to_owned()),
            *encode(&jmp, &FlagState::emulation()).unwrap_err().kind()
        );
    }

    #[test]
    fn block_move_stores_destination_first() {
        let mvn = Instruction::new(Mnemonic::MVN, AddressingMode::BlockMove)
            .with_arg1(Argument::new(0x7E))
            .with_arg2(Argument::new(0x01));
        assert_eq!(Ok(vec![0x54, 0x01, 0x7E]), encode(&mvn, &FlagState::emulation()));
    }

    #[test]
    fn decode_sign_extends_branches() {
        let (bra, size) = decode(&[0x80, 0xFE], &FlagState::emulation()).unwrap();
        assert_eq!(2, size);
        assert_eq!(Ok(-2), bra.arg1.evaluate());

        let (brl, size) = decode(&[0x82, 0x00, 0x80], &FlagState::emulation()).unwrap();
        assert_eq!(3, size);
        assert_eq!(Ok(-0x8000), brl.arg1.evaluate());
    }

    #[test]
    fn decode_truncated() {
        let e = decode(&[0xAD, 0x00], &FlagState::emulation()).unwrap_err();
        assert_eq!(
            ErrorKind::Truncated {
                opcode: 0xAD,
                needed: 2,
                available: 1
            },
            *e.kind()
        );
        assert!(decode(&[], &FlagState::emulation()).is_err());
    }

    #[test]
    fn disassemble_tracks_widths() {
        // CLC; XCE; REP #$30; LDA #$1234; SEP #$20; LDA #$12; RTS
        let bytes = [
            0x18, 0xFB, 0xC2, 0x30, 0xA9, 0x34, 0x12, 0xE2, 0x20, 0xA9, 0x12, 0x60,
        ];
        let listing: Vec<String> = disassemble(&bytes, FlagState::emulation())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            vec!["CLC", "XCE", "REP #$30", "LDA #$1234", "SEP #$20", "LDA #$12", "RTS"],
            listing
        );
    }

    #[test]
    fn disassemble_reports_offset() {
        let e = disassemble(&[0xEA, 0xEA, 0x4C, 0x00], FlagState::emulation()).unwrap_err();
        assert_eq!(Some(2), e.location().offset);
    }
}
