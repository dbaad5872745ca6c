//! Error types and handling for linkstore
//!
//! This module defines all error types used throughout the engine,
//! optimized for zero-cost error propagation and clear diagnostics.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the linkstore engine
#[derive(Error, Debug)]
pub enum Error {
    /// Storage contract violations and integrity failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Structural codec encode/decode errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
///
/// `IllegalArgument` and `IllegalStore` are programming-contract
/// violations signaled at the offending call; callers must fix the call,
/// not catch and retry. `Corruption` is raised only by the debug
/// integrity walk and should be unreachable from correct API usage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// An address or structural relationship violates a precondition
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// An attempted mutation is disallowed by the target container
    #[error("Illegal store: {0}")]
    IllegalStore(String),

    /// Internal invariant failure detected by the integrity check
    #[error("Storage corruption detected: {0}")]
    Corruption(String),
}

/// Structural codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The stream ended before the terminator sentinel
    #[error("Unexpected end of encoded stream at bit {0}")]
    UnexpectedEof(usize),

    /// A decoded rank exceeds the remaining candidate count
    #[error("Rank {rank} out of range for {remaining} remaining candidates")]
    RankOutOfRange {
        /// The decoded rank value
        rank: u32,
        /// Candidates still available at that point
        remaining: u32,
    },

    /// The declared address limit exceeds the decoder's ceiling
    #[error("Address limit {0} exceeds the maximum the decoder accepts")]
    AddressLimitTooLarge(u32),

    /// The value payload does not match the decoded topology
    #[error("Value payload mismatch: {expected} locations decoded, {actual} values supplied")]
    ValueCountMismatch {
        /// Locations decoded from the topology stream
        expected: usize,
        /// Values supplied by the caller
        actual: usize,
    },

    /// Value payload (de)serialization failed
    #[error("Value payload serialization failed: {0}")]
    ValuePayload(String),
}

impl StorageError {
    /// Shorthand for an illegal-argument violation at `location`.
    pub fn bad_location(op: &str, location: u32) -> Self {
        StorageError::IllegalArgument(format!("{op}: location {location} violates a precondition"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        // Goal: nested errors surface their context through the top-level Error
        let err: Error = StorageError::bad_location("insert_at", 7).into();
        let text = err.to_string();
        assert!(text.contains("insert_at"));
        assert!(text.contains('7'));
    }

    #[test]
    fn codec_errors_convert() {
        // Goal: CodecError converts into Error via From
        let err: Error = CodecError::UnexpectedEof(42).into();
        assert!(matches!(err, Error::Codec(CodecError::UnexpectedEof(42))));
    }
}
