//! Token Ledger Errors

use lib_types::{Address, Amount};
use thiserror::Error;

/// Error during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not a minting agent: {0}")]
    NotMintingAgent(Address),

    #[error("Minting is disabled")]
    MintingDisabled,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Supply cap exceeded: max {max}, would have {would_have}")]
    SupplyCapExceeded { max: Amount, would_have: Amount },

    #[error("Invalid construction: {0}")]
    ConstructionInvalid(String),

    #[error("Conservation invariant violated: {0}")]
    ConservationViolated(String),
}

/// Result type for ledger operations
pub type TokenResult<T> = Result<T, TokenError>;
