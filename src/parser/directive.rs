use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};
use crate::flag_state::FlagState;
use crate::parser::{parse_argument, Argument, TokenStream, TokenValue};

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
pub enum DirectiveName {
    #[strum(serialize = ".DB")]
    Db,
    #[strum(serialize = ".DW")]
    Dw,
    #[strum(serialize = ".DL")]
    Dl,
    #[strum(serialize = ".ENTRY")]
    Entry,
    #[strum(serialize = ".EQU")]
    Equ,
    #[strum(serialize = ".MODE")]
    Mode,
    #[strum(serialize = ".ORG")]
    Org,
}

/// The shape of a directive's argument.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DirectiveKind {
    SingleArg,
    ListArg,
    FlagArg,
}

impl DirectiveName {
    /// Case-insensitive lookup of a dotted name such as `.db`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn kind(self) -> DirectiveKind {
        match self {
            DirectiveName::Equ | DirectiveName::Org => DirectiveKind::SingleArg,
            DirectiveName::Db | DirectiveName::Dw | DirectiveName::Dl => DirectiveKind::ListArg,
            DirectiveName::Entry | DirectiveName::Mode => DirectiveKind::FlagArg,
        }
    }

    /// Bytes emitted per value by the data directives.
    pub fn data_width(self) -> Option<usize> {
        match self {
            DirectiveName::Db => Some(1),
            DirectiveName::Dw => Some(2),
            DirectiveName::Dl => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DirectiveArgument {
    Value(Argument),
    List(Vec<Argument>),
    FlagState(FlagState),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Directive {
    pub name: DirectiveName,
    pub argument: DirectiveArgument,
}

impl Directive {
    pub(crate) fn parse(stream: &mut TokenStream) -> Result<Self> {
        let name = match stream.peek_value() {
            Some(TokenValue::DirectiveName(name)) => *name,
            _ => return Err(stream.unexpected("a directive")),
        };
        stream.advance();

        let argument = match name.kind() {
            DirectiveKind::SingleArg => DirectiveArgument::Value(parse_argument(stream)?.0),
            DirectiveKind::ListArg => {
                let mut values = vec![parse_argument(stream)?.0];
                while stream.eat(',') {
                    values.push(parse_argument(stream)?.0);
                }
                DirectiveArgument::List(values)
            }
            DirectiveKind::FlagArg => {
                let location = stream.location();
                let state_name = match stream.peek_value() {
                    Some(TokenValue::Identifier(state_name)) => state_name,
                    _ => return Err(stream.unexpected("a flag state name")),
                };
                let state = FlagState::from_name(state_name).ok_or_else(|| {
                    Error::new(ErrorKind::UnknownName {
                        kind: "flag state",
                        name: state_name.clone(),
                    })
                    .at(&location)
                })?;
                stream.advance();
                DirectiveArgument::FlagState(state)
            }
        };
        Ok(Directive { name, argument })
    }
}

/// Bytes needed to render a single value without losing its bank.
fn value_width(value: &Argument) -> usize {
    match value.evaluate() {
        Ok(v) if (0..=0xFF).contains(&v) => 1,
        Ok(v) if (0..=0xFFFF).contains(&v) => 2,
        _ => 3,
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            DirectiveArgument::Value(v) => write!(f, "{} {}", self.name, v.render(value_width(v))),
            DirectiveArgument::List(values) => {
                let width = self.name.data_width().unwrap_or(1);
                let rendered: Vec<String> = values.iter().map(|v| v.render(width)).collect();
                write!(f, "{} {}", self.name, rendered.join(", "))
            }
            DirectiveArgument::FlagState(state) => write!(f, "{} {}", self.name, state.to_name()),
        }
    }
}
