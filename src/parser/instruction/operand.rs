use std::collections::HashMap;

use crate::error::{ErrorKind, Result};

pub type SymbolTable = HashMap<String, i32>;

/// Operand shapes of the 65816.
///
/// The three immediate modes differ only in how their operand is sized:
/// `ImmediateM` follows the accumulator width bit, `ImmediateX` the index
/// width bit, and `Immediate8` is always one byte (`REP`, `SEP`, `BRK`,
/// `COP`, `WDM`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, strum_macros::Display, strum_macros::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AddressingMode {
    Implied,
    Accumulator,
    ImmediateM,
    ImmediateX,
    Immediate8,
    Direct,
    DirectX,
    DirectY,
    DirectIndirect,
    DirectXIndirect,
    DirectIndirectY,
    DirectIndirectLong,
    DirectIndirectLongY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    AbsoluteIndirect,
    AbsoluteXIndirect,
    AbsoluteIndirectLong,
    StackRelative,
    StackRelativeIndirectY,
    Relative8,
    Relative16,
    BlockMove,
}

impl AddressingMode {
    /// Operand bytes for every mode whose size does not depend on the flag
    /// state.  `None` for `ImmediateM` and `ImmediateX`.
    pub fn fixed_operand_size(self) -> Option<usize> {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => Some(0),
            ImmediateM | ImmediateX => None,
            Immediate8 | Direct | DirectX | DirectY | DirectIndirect | DirectXIndirect
            | DirectIndirectY | DirectIndirectLong | DirectIndirectLongY | StackRelative
            | StackRelativeIndirectY | Relative8 => Some(1),
            Absolute | AbsoluteX | AbsoluteY | AbsoluteIndirect | AbsoluteXIndirect
            | AbsoluteIndirectLong | Relative16 | BlockMove => Some(2),
            AbsoluteLong | AbsoluteLongX => Some(3),
        }
    }

    pub fn is_immediate(self) -> bool {
        use AddressingMode::*;
        matches!(self, ImmediateM | ImmediateX | Immediate8)
    }

    pub fn is_relative(self) -> bool {
        matches!(self, AddressingMode::Relative8 | AddressingMode::Relative16)
    }
}

/// An operand value: either a number, or a symbol whose value is not known
/// yet.  While `label` is set, `value` is only a placeholder.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Argument {
    value: i32,
    label: Option<String>,
}

impl Argument {
    pub fn new(value: i32) -> Self {
        Argument { value, label: None }
    }

    pub fn symbol(name: &str) -> Self {
        Argument {
            value: 0,
            label: Some(name.to_owned()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn evaluate(&self) -> Result<i32> {
        match &self.label {
            None => Ok(self.value),
            Some(name) => Err(ErrorKind::UndefinedSymbol(name.clone()).into()),
        }
    }

    /// Substitutes the symbol's value if `symbols` knows it.
    pub fn resolve(&self, symbols: &SymbolTable) -> Argument {
        match self.label.as_ref().and_then(|name| symbols.get(name)) {
            Some(&value) => Argument::new(value),
            None => self.clone(),
        }
    }

    /// Renders the argument as `size` bytes of hex, or as its label.
    pub fn render(&self, size: usize) -> String {
        if let Some(name) = &self.label {
            return name.clone();
        }
        let size = size.clamp(1, 4);
        let mask = (1u64 << (8 * size)) - 1;
        let truncated = (self.value as i64 as u64) & mask;
        format!("${:0width$X}", truncated, width = size * 2)
    }

    /// Renders a relative branch operand as a signed displacement.
    pub fn to_branch_offset(&self) -> String {
        match &self.label {
            Some(name) => name.clone(),
            None => format!("{:+}", self.value),
        }
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::new(value)
    }
}
