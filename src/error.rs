use std::fmt;

use thiserror::Error as ThisError;

use crate::parser::{AddressingMode, Mnemonic};

pub type Result<T> = std::result::Result<T, Error>;

/// A position in a source file.
///
/// Locations are advisory: they only decorate diagnostics.  Either part may
/// be missing, e.g. when an error is raised before the caller knows which
/// file it is working on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: Option<String>,
    pub offset: Option<usize>,
}

impl Location {
    pub fn new(path: &str, offset: usize) -> Self {
        Location {
            path: Some(path.to_owned()),
            offset: Some(offset),
        }
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Location {
            path: self.path.clone(),
            offset: Some(offset),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.path.is_none() && self.offset.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.offset) {
            (Some(path), Some(offset)) => write!(f, "{}:{}", path, offset),
            (Some(path), None) => write!(f, "{}", path),
            (None, Some(offset)) => write!(f, "offset {}", offset),
            (None, None) => write!(f, "<unknown location>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    #[error("{0}")]
    Lex(String),
    #[error("unknown {kind} \"{name}\"")]
    UnknownName { kind: &'static str, name: String },
    #[error("{0}")]
    Syntax(String),
    #[error("no opcode for {mnemonic} with {mode} addressing")]
    Encoding {
        mnemonic: Mnemonic,
        mode: AddressingMode,
    },
    #[error("{register} width is not known in flag state \"{state}\"")]
    UnknownWidth {
        register: &'static str,
        state: String,
    },
    #[error("value {value} does not fit in {bytes} byte(s)")]
    OutOfRange { value: i64, bytes: usize },
    #[error("undefined symbol \"{0}\"")]
    UndefinedSymbol(String),
    #[error("symbol \"{0}\" is defined more than once")]
    DuplicateSymbol(String),
    #[error("code layout did not settle after {0} passes")]
    Unsettled(usize),
    #[error("opcode ${opcode:02X} needs {needed} operand byte(s) but only {available} remain")]
    Truncated {
        opcode: u8,
        needed: usize,
        available: usize,
    },
}

/// An error with an optional source location.
///
/// The location is filled in progressively as the error propagates outward:
/// `at`, `in_file` and `at_offset` only fill parts that are still missing, so
/// the innermost (most precise) location always wins.  `set_location`
/// overwrites unconditionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    location: Location,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            location: Location::default(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn set_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn at(mut self, location: &Location) -> Self {
        if self.location.path.is_none() {
            self.location.path = location.path.clone();
        }
        if self.location.offset.is_none() {
            self.location.offset = location.offset;
        }
        self
    }

    pub fn in_file(mut self, path: &str) -> Self {
        if self.location.path.is_none() {
            self.location.path = Some(path.to_owned());
        }
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        if self.location.offset.is_none() {
            self.location.offset = Some(offset);
        }
        self
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_unset() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.location, self.kind)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Location enrichment for `Result`s, so each layer can decorate an error
/// on its way through `?`.
pub trait LocationExt<T> {
    fn at(self, location: &Location) -> Result<T>;
    fn in_file(self, path: &str) -> Result<T>;
}

impl<T> LocationExt<T> for Result<T> {
    fn at(self, location: &Location) -> Result<T> {
        self.map_err(|e| e.at(location))
    }

    fn in_file(self, path: &str) -> Result<T> {
        self.map_err(|e| e.in_file(path))
    }
}
