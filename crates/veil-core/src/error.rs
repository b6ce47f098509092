//! Error type shared by the engine.
//!
//! Most engine operations are total. Errors are reserved for out-of-contract positions,
//! which must fail fast instead of being clamped (a clamped offset would corrupt the splice
//! that reconstructs the full text), and for edits rejected by a read-only policy.

use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by `veil-core`.
pub enum CoreError {
    #[error("position {position} is outside 0..={length}")]
    /// A character offset lies outside the text it refers to.
    PositionOutOfRange {
        /// The offending character offset.
        position: usize,
        /// Length (in characters) of the text the offset refers to.
        length: usize,
    },

    #[error("edit touches read-only lines {first_line}..={last_line}")]
    /// An edit changes at least one read-only line.
    ReadOnly {
        /// First changed line.
        first_line: usize,
        /// Last changed line (inclusive).
        last_line: usize,
    },

    #[error("invalid section tag pattern: {0}")]
    /// A section tag grammar failed to compile.
    InvalidPattern(#[from] regex::Error),
}

/// Convenience alias used across the crate.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
