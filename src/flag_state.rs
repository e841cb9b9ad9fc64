//! Static tracking of the 65816 status bits that decide operand widths.
//!
//! The accumulator and index registers are 8 or 16 bits wide depending on
//! the `m` and `x` status bits, and both are forced to 8 bits while the
//! emulation bit `e` is set.  Immediate operands are sized by those bits, so
//! the assembler has to know them at every instruction.  `FlagState` is an
//! abstract value for the four bits (plus the copies saved by `PHP`), and
//! `execute` is its transfer function.
//!
//! Everything here is a pure function over `Copy` values: callers thread a
//! state through an instruction sequence and join states where control flow
//! merges.

use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::char;
use nom::combinator::{all_consuming, opt, value};
use nom::sequence::{pair, preceded};
use nom::IResult;

use crate::error::{Error, ErrorKind};
use crate::parser::{Instruction, Mnemonic};

/// One status bit, as far as static analysis can tell.
///
/// `Original` means the bit has not been pinned and still has whatever value
/// the caller's context gave it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum BitState {
    On,
    Off,
    #[default]
    Unknown,
    Original,
}

impl BitState {
    pub fn is_known(self) -> bool {
        matches!(self, BitState::On | BitState::Off)
    }

    /// Least upper bound: agreeing values survive, anything else is unknown.
    pub fn join(self, other: BitState) -> BitState {
        if self == other {
            self
        } else {
            BitState::Unknown
        }
    }

    fn from_bool(b: bool) -> BitState {
        if b {
            BitState::On
        } else {
            BitState::Off
        }
    }
}

/// Applies the emulation-mode constraint to a width bit: with `e` set the
/// processor forces 8-bit registers.
pub fn constrained_for_e_bit(bit: BitState, e: BitState) -> BitState {
    match e {
        BitState::On => BitState::On,
        BitState::Off | BitState::Original => bit,
        // 8-bit either way when the bit is already set
        BitState::Unknown if bit == BitState::On => BitState::On,
        BitState::Unknown => BitState::Unknown,
    }
}

const CARRY_MASK: i32 = 0x01;
const INDEX_MASK: i32 = 0x10;
const ACCUMULATOR_MASK: i32 = 0x20;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub struct FlagState {
    c: BitState,
    e: BitState,
    m: BitState,
    x: BitState,
    pushed_m: BitState,
    pushed_x: BitState,
}

impl Default for FlagState {
    fn default() -> Self {
        FlagState::new(BitState::Original, BitState::Original, BitState::Original)
    }
}

impl FlagState {
    /// A state with the given mode bits, an unknown carry and nothing pushed.
    pub fn new(e: BitState, m: BitState, x: BitState) -> Self {
        FlagState {
            c: BitState::Unknown,
            e,
            m: constrained_for_e_bit(m, e),
            x: constrained_for_e_bit(x, e),
            pushed_m: BitState::Unknown,
            pushed_x: BitState::Unknown,
        }
    }

    pub fn emulation() -> Self {
        FlagState::new(BitState::On, BitState::On, BitState::On)
    }

    pub fn with_carry(self, c: BitState) -> Self {
        FlagState { c, ..self }
    }

    pub fn c_bit(&self) -> BitState {
        self.c
    }

    pub fn e_bit(&self) -> BitState {
        self.e
    }

    pub fn m_bit(&self) -> BitState {
        constrained_for_e_bit(self.m, self.e)
    }

    pub fn x_bit(&self) -> BitState {
        constrained_for_e_bit(self.x, self.e)
    }

    pub fn pushed_m_bit(&self) -> BitState {
        self.pushed_m
    }

    pub fn pushed_x_bit(&self) -> BitState {
        self.pushed_x
    }

    /// Immediate operand size for accumulator instructions, if known.
    pub fn accumulator_bytes(&self) -> Option<usize> {
        width_bytes(self.m_bit())
    }

    /// Immediate operand size for index register instructions, if known.
    pub fn index_bytes(&self) -> Option<usize> {
        width_bytes(self.x_bit())
    }

    pub fn join(&self, other: &FlagState) -> FlagState {
        FlagState {
            c: self.c.join(other.c),
            e: self.e.join(other.e),
            m: self.m.join(other.m),
            x: self.x.join(other.x),
            pushed_m: self.pushed_m.join(other.pushed_m),
            pushed_x: self.pushed_x.join(other.pushed_x),
        }
    }

    /// The state after `instruction` when execution continues with the next
    /// instruction in sequence.
    ///
    /// A conditional branch on carry that falls through says something about
    /// carry: after `BCC` falls through the carry must be set, after `BCS` it
    /// must be clear.
    pub fn execute(&self, instruction: &Instruction) -> FlagState {
        use Mnemonic::*;

        let mut next = *self;
        match instruction.mnemonic {
            SEC | BCC => next.c = BitState::On,
            CLC | BCS => next.c = BitState::Off,
            REP | SEP => {
                let target = BitState::from_bool(instruction.mnemonic == SEP);
                match instruction.arg1.evaluate() {
                    Ok(mask) => {
                        if mask & CARRY_MASK != 0 {
                            next.c = target;
                        }
                        if mask & INDEX_MASK != 0 {
                            next.x = constrained_for_e_bit(target, self.e);
                        }
                        if mask & ACCUMULATOR_MASK != 0 {
                            next.m = constrained_for_e_bit(target, self.e);
                        }
                    }
                    Err(_) => {
                        // Each bit is either set to `target` or left alone,
                        // so only bits already equal to `target` stay known.
                        if self.c != target {
                            next.c = BitState::Unknown;
                        }
                        if self.x != target {
                            next.x = constrained_for_e_bit(BitState::Unknown, self.e);
                        }
                        if self.m != target {
                            next.m = constrained_for_e_bit(BitState::Unknown, self.e);
                        }
                    }
                }
            }
            // No stack tracking: a PLP is assumed to pull whatever the most
            // recent PHP pushed.
            PHP => {
                next.pushed_m = self.m;
                next.pushed_x = self.x;
            }
            PLP => {
                next.m = constrained_for_e_bit(self.pushed_m, self.e);
                next.x = constrained_for_e_bit(self.pushed_x, self.e);
                next.pushed_m = BitState::Unknown;
                next.pushed_x = BitState::Unknown;
            }
            XCE => {
                std::mem::swap(&mut next.c, &mut next.e);
                next.m = constrained_for_e_bit(self.m, next.e);
                next.x = constrained_for_e_bit(self.x, next.e);
            }
            ADC | SBC | ADD | SUB | CMP | CPX | CPY | ASL | LSR | ROL | ROR => {
                next.c = BitState::Unknown;
            }
            // The callee may do anything to carry.
            JMP | JSL | JSR | BRK | COP => next.c = BitState::Unknown,
            _ => {}
        }
        next
    }

    /// The state at the target of `instruction` when its branch is taken.
    pub fn execute_branch(&self, instruction: &Instruction) -> FlagState {
        let mut next = self.execute(instruction);
        match instruction.mnemonic {
            Mnemonic::BCC => next.c = BitState::Off,
            Mnemonic::BCS => next.c = BitState::On,
            _ => {}
        }
        next
    }

    /// Short canonical name: `unk`, `emu`, `native`, or `m8`/`m16` and
    /// `x8`/`x16` parts for whichever width bits are known.
    pub fn to_name(&self) -> String {
        match self.e {
            BitState::On => "emu".to_owned(),
            BitState::Off => {
                let m = match self.m_bit() {
                    BitState::On => "m8",
                    BitState::Off => "m16",
                    _ => "",
                };
                let x = match self.x_bit() {
                    BitState::On => "x8",
                    BitState::Off => "x16",
                    _ => "",
                };
                if m.is_empty() && x.is_empty() {
                    "native".to_owned()
                } else {
                    format!("{}{}", m, x)
                }
            }
            BitState::Unknown | BitState::Original => "unk".to_owned(),
        }
    }

    /// Inverse of `to_name`, case-insensitive.  Also accepts the carry
    /// suffix that `Display` appends.
    pub fn from_name(name: &str) -> Option<FlagState> {
        let lower = name.trim().to_ascii_lowercase();
        let (body, c) = split_carry_suffix(&lower);
        let state = match body {
            "" => return None,
            "unk" => FlagState::new(BitState::Unknown, BitState::Unknown, BitState::Unknown),
            "emu" => FlagState::emulation(),
            "native" => FlagState::new(BitState::Off, BitState::Original, BitState::Original),
            parts => {
                let (_, (m, x)) = width_parts(parts).ok()?;
                FlagState::new(
                    BitState::Off,
                    m.unwrap_or(BitState::Original),
                    x.unwrap_or(BitState::Original),
                )
            }
        };
        Some(state.with_carry(c))
    }
}

fn width_bytes(bit: BitState) -> Option<usize> {
    match bit {
        BitState::On => Some(1),
        BitState::Off => Some(2),
        BitState::Unknown | BitState::Original => None,
    }
}

fn split_carry_suffix(name: &str) -> (&str, BitState) {
    let carry = [(",c=1", BitState::On), (",c=0", BitState::Off)];
    for (suffix, bit) in carry {
        if let Some(body) = name.strip_suffix(suffix) {
            return (body.trim_end(), bit);
        }
        let spaced = format!(", {}", &suffix[1..]);
        if let Some(body) = name.strip_suffix(spaced.as_str()) {
            return (body.trim_end(), bit);
        }
    }
    (name, BitState::Unknown)
}

fn width(i: &str) -> IResult<&str, BitState> {
    alt((value(BitState::On, tag("8")), value(BitState::Off, tag("16"))))(i)
}

fn width_parts(i: &str) -> IResult<&str, (Option<BitState>, Option<BitState>)> {
    all_consuming(pair(
        opt(preceded(char('m'), width)),
        opt(preceded(char('x'), width)),
    ))(i)
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let carry = match self.c {
            BitState::On => ", c=1",
            BitState::Off => ", c=0",
            _ => "",
        };
        write!(f, "{}{}", self.to_name(), carry)
    }
}

impl FromStr for FlagState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagState::from_name(s).ok_or_else(|| {
            ErrorKind::UnknownName {
                kind: "flag state",
                name: s.to_owned(),
            }
            .into()
        })
    }
}
