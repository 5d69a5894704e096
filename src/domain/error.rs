//! Error classification shared by every module
//!
//! Each module owns its own `thiserror` enum; `kind()` maps a variant onto
//! this taxonomy so commands can decide whether a failure aborts one item
//! of a batch or the whole invocation.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced document or file does not exist
    NotFound,
    /// Malformed user input (bad permutation, extension, wildcard, ...)
    Invalid,
    /// Two entries would share a key or an artifact name
    Collision,
    /// A subprocess failed or produced unusable output
    ExternalFailure,
    /// A post-condition of the core itself was violated
    Inconsistency,
}

impl ErrorKind {
    /// Failures of this kind end the whole command rather than one item
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::ExternalFailure | ErrorKind::Inconsistency)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Collision => "collision",
            ErrorKind::ExternalFailure => "external failure",
            ErrorKind::Inconsistency => "inconsistency",
        };
        f.write_str(label)
    }
}
