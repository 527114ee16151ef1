//! Primitive parsing errors

use thiserror::Error;

/// Error while parsing a primitive from its text form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result type for primitive parsing
pub type ParseResult<T> = Result<T, ParseError>;
