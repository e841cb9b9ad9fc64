use crate::flag_state::FlagState;

/// Settings for assembling one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name used in diagnostics.
    pub path: String,
    /// Processor state at the first line.
    pub initial_state: FlagState,
    /// Address of the first emitted byte, until an `.org` says otherwise.
    pub origin: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: "<input>".to_owned(),
            initial_state: FlagState::emulation(),
            origin: 0,
        }
    }
}

impl Config {
    pub fn with_path(self, path: &str) -> Self {
        Config {
            path: path.to_owned(),
            ..self
        }
    }

    pub fn with_initial_state(self, initial_state: FlagState) -> Self {
        Config {
            initial_state,
            ..self
        }
    }

    pub fn with_origin(self, origin: u32) -> Self {
        Config { origin, ..self }
    }
}
