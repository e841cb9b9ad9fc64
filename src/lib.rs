//! An assembler for the 65816, the CPU of the SNES.
//!
//! Source is parsed line by line into statements; the code generator then
//! tracks the processor's width bits through the program (see
//! [`flag_state`]) so that immediate operands get the right size.

pub mod code_generator;
pub mod config;
pub mod error;
pub mod flag_state;
pub mod parser;

pub use config::Config;
pub use error::{Error, ErrorKind, Location, Result};
pub use flag_state::{BitState, FlagState};

use error::LocationExt;

/// Assembles a whole source file into machine code.
pub fn assemble(source: &str, config: &Config) -> Result<Vec<u8>> {
    let statements = parser::parse(source, &config.path)?;
    code_generator::generate_code(&statements, config).in_file(&config.path)
}
