use std::fmt;
use worlddiff_logger::{log, LogSeverity};

/// Which category of change a diff keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Blocks added between the two worlds.
    Add,
    /// Blocks removed between the two worlds.
    Del,
    /// Blocks that stayed the same.
    Stay,
}

impl Mode {
    pub fn from_name(name: &str) -> Option<Mode> {
        match name {
            "ADD" => Some(Mode::Add),
            "DEL" => Some(Mode::Del),
            "STAY" => Some(Mode::Stay),
            _ => None,
        }
    }

    /// Parses a mode argument. Anything unrecognized runs as ADD, with a warning.
    pub fn parse(name: &str) -> Mode {
        Self::from_name(name).unwrap_or_else(|| {
            log(
                format!("Unknown mode {:?}, falling back to ADD", name),
                LogSeverity::Warning,
            );
            Mode::Add
        })
    }

    /// ADD runs the removal diff with the worlds swapped.
    pub fn swaps_inputs(self) -> bool {
        self == Mode::Add
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Add => write!(f, "ADD"),
            Mode::Del => write!(f, "DEL"),
            Mode::Stay => write!(f, "STAY"),
        }
    }
}
