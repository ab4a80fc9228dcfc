//! Error types for the rope and the change algebra.
//!
//! Every fallible operation reports its failure at the call site and
//! produces no value; since all structures are immutable there is never any
//! partial state to roll back. Broken internal invariants are not errors:
//! they panic.

use thiserror::Error;

/// The two classes of recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A position, line number or range lies outside the valid bounds.
    OutOfRange,
    /// A malformed serialized value, or values that do not fit together
    /// (such as change sets of mismatched lengths).
    InvalidArgument,
}

/// Error returned by document and change operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid position {pos} in document of length {len}")]
    PositionOutOfRange { pos: usize, len: usize },

    #[error("Invalid line number {line} in {lines}-line document")]
    LineOutOfRange { line: usize, lines: usize },

    #[error("Invalid change range {from} to {to} (in doc of length {len})")]
    InvalidChangeRange { from: usize, to: usize, len: usize },

    #[error("Mismatched change set lengths (got {actual}, expected {expected})")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("A document must have at least one line")]
    EmptyDocument,

    #[error("Line {index} contains a line break")]
    LineContainsBreak { index: usize },

    #[error("Invalid JSON representation of {0}")]
    InvalidJson(&'static str),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        return match self {
            Error::PositionOutOfRange { .. }
            | Error::LineOutOfRange { .. }
            | Error::InvalidChangeRange { .. } => ErrorKind::OutOfRange,
            Error::LengthMismatch { .. }
            | Error::EmptyDocument
            | Error::LineContainsBreak { .. }
            | Error::InvalidJson(_) => ErrorKind::InvalidArgument,
        };
    }
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
