use std::str::FromStr;

use strum::IntoEnumIterator;

/// Every 65816 mnemonic, plus the `ADD` and `SUB` pseudo-mnemonics.
///
/// `ADD` and `SUB` stand for carry-clearing addition and carry-setting
/// subtraction.  They take part in flag-state analysis exactly like `ADC` and
/// `SBC`, but have no opcode of their own: the code generator lowers them to
/// `CLC`/`ADC` and `SEC`/`SBC`.
///
/// `JMP` covers the long forms some assemblers spell `JML`.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Mnemonic {
    ADC,
    AND,
    ASL,
    BIT,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    LDA,
    LDX,
    LDY,
    LSR,
    MVN,
    MVP,
    NOP,
    ORA,
    PEA,
    PEI,
    PER,
    PHA,
    PHB,
    PHD,
    PHK,
    PHX,
    PHY,
    PLA,
    PLB,
    PLD,
    PLX,
    PLY,
    ROL,
    ROR,
    SBC,
    SED,
    SEI,
    STA,
    STP,
    STX,
    STY,
    STZ,
    TAX,
    TAY,
    TCD,
    TCS,
    TDC,
    TRB,
    TSB,
    TSC,
    TSX,
    TXA,
    TXS,
    TXY,
    TYA,
    TYX,
    WAI,
    WDM,
    XBA,
    BCC,
    BCS,
    BEQ,
    BMI,
    BNE,
    BPL,
    BRA,
    BRK,
    BRL,
    BVC,
    BVS,
    COP,
    JMP,
    JSL,
    JSR,
    RTI,
    RTL,
    RTS,
    CLC,
    PHP,
    PLP,
    REP,
    SEC,
    SEP,
    XCE,
    ADD,
    SUB,
}

impl Mnemonic {
    /// Case-insensitive lookup.  A miss is not an error, just an absence.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn all() -> impl Iterator<Item = Mnemonic> {
        Self::iter()
    }

    pub fn is_pseudo(self) -> bool {
        matches!(self, Mnemonic::ADD | Mnemonic::SUB)
    }

    /// The real instruction a pseudo-mnemonic's arithmetic is performed by.
    pub fn real_equivalent(self) -> Self {
        match self {
            Mnemonic::ADD => Mnemonic::ADC,
            Mnemonic::SUB => Mnemonic::SBC,
            other => other,
        }
    }

    pub fn is_branch(self) -> bool {
        use Mnemonic::*;
        matches!(
            self,
            BCC | BCS | BEQ | BMI | BNE | BPL | BRA | BRL | BVC | BVS
        )
    }

    /// Mnemonics whose operand is a displacement from the next instruction.
    pub fn is_relative(self) -> bool {
        self.is_branch() || self == Mnemonic::PER
    }

    pub fn is_call(self) -> bool {
        matches!(self, Mnemonic::JSR | Mnemonic::JSL)
    }

    /// Unconditional transfers; nothing falls through to the next line.
    pub fn ends_flow(self) -> bool {
        use Mnemonic::*;
        matches!(self, BRA | BRL | JMP | RTS | RTL | RTI | STP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_names_round_trip() {
        for m in Mnemonic::all() {
            let name = m.to_string();
            assert_eq!(Some(m), Mnemonic::from_name(&name));
            assert_eq!(Some(m), Mnemonic::from_name(&name.to_lowercase()));
        }
    }

    #[test]
    fn mnemonic_count() {
        // 91 real mnemonics (JML folded into JMP), plus ADD and SUB
        assert_eq!(93, Mnemonic::all().count());
    }

    #[test]
    fn mnemonic_miss() {
        assert_eq!(None, Mnemonic::from_name(""));
        assert_eq!(None, Mnemonic::from_name("SAX"));
        assert_eq!(None, Mnemonic::from_name("LDA "));
    }

    #[test]
    fn pseudo_mnemonics() {
        assert!(Mnemonic::ADD.is_pseudo());
        assert!(Mnemonic::SUB.is_pseudo());
        assert!(!Mnemonic::ADC.is_pseudo());
        assert_eq!(Mnemonic::SBC, Mnemonic::SUB.real_equivalent());
        assert_eq!(Mnemonic::LDA, Mnemonic::LDA.real_equivalent());
    }

    #[test]
    fn flow_classes() {
        assert!(Mnemonic::BRL.is_branch());
        assert!(Mnemonic::PER.is_relative());
        assert!(!Mnemonic::PER.is_branch());
        assert!(Mnemonic::RTS.ends_flow());
        assert!(!Mnemonic::JSR.ends_flow());
        assert!(!Mnemonic::BNE.ends_flow());
    }
}
