use crate::parser::{AddressingMode, Instruction, Mnemonic};

use AddressingMode::*;
use Mnemonic::*;

/// The opcode map: entry `n` is what byte `n` decodes to.  Every
/// (mnemonic, mode) pair appears at most once.
#[rustfmt::skip]
pub(crate) static OPCODES: [(Mnemonic, AddressingMode); 256] = [
    // $00
    (BRK, Immediate8),
    (ORA, DirectXIndirect),
    (COP, Immediate8),
    (ORA, StackRelative),
    (TSB, Direct),
    (ORA, Direct),
    (ASL, Direct),
    (ORA, DirectIndirectLong),
    (PHP, Implied),
    (ORA, ImmediateM),
    (ASL, Accumulator),
    (PHD, Implied),
    (TSB, Absolute),
    (ORA, Absolute),
    (ASL, Absolute),
    (ORA, AbsoluteLong),
    // $10
    (BPL, Relative8),
    (ORA, DirectIndirectY),
    (ORA, DirectIndirect),
    (ORA, StackRelativeIndirectY),
    (TRB, Direct),
    (ORA, DirectX),
    (ASL, DirectX),
    (ORA, DirectIndirectLongY),
    (CLC, Implied),
    (ORA, AbsoluteY),
    (INC, Accumulator),
    (TCS, Implied),
    (TRB, Absolute),
    (ORA, AbsoluteX),
    (ASL, AbsoluteX),
    (ORA, AbsoluteLongX),
    // $20
    (JSR, Absolute),
    (AND, DirectXIndirect),
    (JSL, AbsoluteLong),
    (AND, StackRelative),
    (BIT, Direct),
    (AND, Direct),
    (ROL, Direct),
    (AND, DirectIndirectLong),
    (PLP, Implied),
    (AND, ImmediateM),
    (ROL, Accumulator),
    (PLD, Implied),
    (BIT, Absolute),
    (AND, Absolute),
    (ROL, Absolute),
    (AND, AbsoluteLong),
    // $30
    (BMI, Relative8),
    (AND, DirectIndirectY),
    (AND, DirectIndirect),
    (AND, StackRelativeIndirectY),
    (BIT, DirectX),
    (AND, DirectX),
    (ROL, DirectX),
    (AND, DirectIndirectLongY),
    (SEC, Implied),
    (AND, AbsoluteY),
    (DEC, Accumulator),
    (TSC, Implied),
    (BIT, AbsoluteX),
    (AND, AbsoluteX),
    (ROL, AbsoluteX),
    (AND, AbsoluteLongX),
    // $40
    (RTI, Implied),
    (EOR, DirectXIndirect),
    (WDM, Immediate8),
    (EOR, StackRelative),
    (MVP, BlockMove),
    (EOR, Direct),
    (LSR, Direct),
    (EOR, DirectIndirectLong),
    (PHA, Implied),
    (EOR, ImmediateM),
    (LSR, Accumulator),
    (PHK, Implied),
    (JMP, Absolute),
    (EOR, Absolute),
    (LSR, Absolute),
    (EOR, AbsoluteLong),
    // $50
    (BVC, Relative8),
    (EOR, DirectIndirectY),
    (EOR, DirectIndirect),
    (EOR, StackRelativeIndirectY),
    (MVN, BlockMove),
    (EOR, DirectX),
    (LSR, DirectX),
    (EOR, DirectIndirectLongY),
    (CLI, Implied),
    (EOR, AbsoluteY),
    (PHY, Implied),
    (TCD, Implied),
    (JMP, AbsoluteLong),
    (EOR, AbsoluteX),
    (LSR, AbsoluteX),
    (EOR, AbsoluteLongX),
    // $60
    (RTS, Implied),
    (ADC, DirectXIndirect),
    (PER, Relative16),
    (ADC, StackRelative),
    (STZ, Direct),
    (ADC, Direct),
    (ROR, Direct),
    (ADC, DirectIndirectLong),
    (PLA, Implied),
    (ADC, ImmediateM),
    (ROR, Accumulator),
    (RTL, Implied),
    (JMP, AbsoluteIndirect),
    (ADC, Absolute),
    (ROR, Absolute),
    (ADC, AbsoluteLong),
    // $70
    (BVS, Relative8),
    (ADC, DirectIndirectY),
    (ADC, DirectIndirect),
    (ADC, StackRelativeIndirectY),
    (STZ, DirectX),
    (ADC, DirectX),
    (ROR, DirectX),
    (ADC, DirectIndirectLongY),
    (SEI, Implied),
    (ADC, AbsoluteY),
    (PLY, Implied),
    (TDC, Implied),
    (JMP, AbsoluteXIndirect),
    (ADC, AbsoluteX),
    (ROR, AbsoluteX),
    (ADC, AbsoluteLongX),
    // $80
    (BRA, Relative8),
    (STA, DirectXIndirect),
    (BRL, Relative16),
    (STA, StackRelative),
    (STY, Direct),
    (STA, Direct),
    (STX, Direct),
    (STA, DirectIndirectLong),
    (DEY, Implied),
    (BIT, ImmediateM),
    (TXA, Implied),
    (PHB, Implied),
    (STY, Absolute),
    (STA, Absolute),
    (STX, Absolute),
    (STA, AbsoluteLong),
    // $90
    (BCC, Relative8),
    (STA, DirectIndirectY),
    (STA, DirectIndirect),
    (STA, StackRelativeIndirectY),
    (STY, DirectX),
    (STA, DirectX),
    (STX, DirectY),
    (STA, DirectIndirectLongY),
    (TYA, Implied),
    (STA, AbsoluteY),
    (TXS, Implied),
    (TXY, Implied),
    (STZ, Absolute),
    (STA, AbsoluteX),
    (STZ, AbsoluteX),
    (STA, AbsoluteLongX),
    // $A0
    (LDY, ImmediateX),
    (LDA, DirectXIndirect),
    (LDX, ImmediateX),
    (LDA, StackRelative),
    (LDY, Direct),
    (LDA, Direct),
    (LDX, Direct),
    (LDA, DirectIndirectLong),
    (TAY, Implied),
    (LDA, ImmediateM),
    (TAX, Implied),
    (PLB, Implied),
    (LDY, Absolute),
    (LDA, Absolute),
    (LDX, Absolute),
    (LDA, AbsoluteLong),
    // $B0
    (BCS, Relative8),
    (LDA, DirectIndirectY),
    (LDA, DirectIndirect),
    (LDA, StackRelativeIndirectY),
    (LDY, DirectX),
    (LDA, DirectX),
    (LDX, DirectY),
    (LDA, DirectIndirectLongY),
    (CLV, Implied),
    (LDA, AbsoluteY),
    (TSX, Implied),
    (TYX, Implied),
    (LDY, AbsoluteX),
    (LDA, AbsoluteX),
    (LDX, AbsoluteY),
    (LDA, AbsoluteLongX),
    // $C0
    (CPY, ImmediateX),
    (CMP, DirectXIndirect),
    (REP, Immediate8),
    (CMP, StackRelative),
    (CPY, Direct),
    (CMP, Direct),
    (DEC, Direct),
    (CMP, DirectIndirectLong),
    (INY, Implied),
    (CMP, ImmediateM),
    (DEX, Implied),
    (WAI, Implied),
    (CPY, Absolute),
    (CMP, Absolute),
    (DEC, Absolute),
    (CMP, AbsoluteLong),
    // $D0
    (BNE, Relative8),
    (CMP, DirectIndirectY),
    (CMP, DirectIndirect),
    (CMP, StackRelativeIndirectY),
    (PEI, DirectIndirect),
    (CMP, DirectX),
    (DEC, DirectX),
    (CMP, DirectIndirectLongY),
    (CLD, Implied),
    (CMP, AbsoluteY),
    (PHX, Implied),
    (STP, Implied),
    (JMP, AbsoluteIndirectLong),
    (CMP, AbsoluteX),
    (DEC, AbsoluteX),
    (CMP, AbsoluteLongX),
    // $E0
    (CPX, ImmediateX),
    (SBC, DirectXIndirect),
    (SEP, Immediate8),
    (SBC, StackRelative),
    (CPX, Direct),
    (SBC, Direct),
    (INC, Direct),
    (SBC, DirectIndirectLong),
    (INX, Implied),
    (SBC, ImmediateM),
    (NOP, Implied),
    (XBA, Implied),
    (CPX, Absolute),
    (SBC, Absolute),
    (INC, Absolute),
    (SBC, AbsoluteLong),
    // $F0
    (BEQ, Relative8),
    (SBC, DirectIndirectY),
    (SBC, DirectIndirect),
    (SBC, StackRelativeIndirectY),
    (PEA, Absolute),
    (SBC, DirectX),
    (INC, DirectX),
    (SBC, DirectIndirectLongY),
    (SED, Implied),
    (SBC, AbsoluteY),
    (PLX, Implied),
    (XCE, Implied),
    (JSR, AbsoluteXIndirect),
    (SBC, AbsoluteX),
    (INC, AbsoluteX),
    (SBC, AbsoluteLongX),
];

pub fn opcode_for(mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
    OPCODES
        .iter()
        .position(|&entry| entry == (mnemonic, mode))
        .map(|index| index as u8)
}

/// The instruction an opcode byte stands for, with zero operands.
pub fn decode_opcode(opcode: u8) -> Instruction {
    let (mnemonic, mode) = OPCODES[opcode as usize];
    Instruction::new(mnemonic, mode)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn table_has_no_duplicates() {
        let unique: HashSet<_> = OPCODES.iter().collect();
        assert_eq!(256, unique.len());
    }

    #[test]
    fn every_real_mnemonic_has_an_opcode() {
        for mnemonic in Mnemonic::all() {
            let found = OPCODES.iter().any(|&(m, _)| m == mnemonic);
            assert_eq!(!mnemonic.is_pseudo(), found, "{}", mnemonic);
        }
    }

    #[test]
    fn lookup_is_inverse_of_decode() {
        for opcode in 0..=255u8 {
            let instruction = decode_opcode(opcode);
            assert_eq!(
                Some(opcode),
                opcode_for(instruction.mnemonic, instruction.addressing_mode)
            );
        }
    }

    #[test]
    fn known_opcodes() {
        assert_eq!(Some(0x9C), opcode_for(STZ, Absolute));
        assert_eq!(Some(0x60), opcode_for(RTS, Implied));
        assert_eq!(Some(0xA9), opcode_for(LDA, ImmediateM));
        assert_eq!(Some(0xA2), opcode_for(LDX, ImmediateX));
        assert_eq!(Some(0xE2), opcode_for(SEP, Immediate8));
        assert_eq!(Some(0x5C), opcode_for(JMP, AbsoluteLong));
        assert_eq!(Some(0xDC), opcode_for(JMP, AbsoluteIndirectLong));
        assert_eq!(Some(0xFB), opcode_for(XCE, Implied));
        assert_eq!(None, opcode_for(ADD, ImmediateM));
        assert_eq!(None, opcode_for(STA, ImmediateM));
    }
}
