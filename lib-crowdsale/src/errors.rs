//! Crowdsale Errors
//!
//! Every failure aborts the whole transaction; see [`crate::state`].

use thiserror::Error;

use lib_crypto::CryptoError;
use lib_tokens::TokenError;
use lib_types::{Address, Amount};

/// Error during crowdsale, allocator, forwarder or referral operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrowdsaleError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Cap exceeded: cap {cap}, would have {would_have}")]
    CapExceeded { cap: Amount, would_have: Amount },

    #[error("Already claimed: {0}")]
    AlreadyClaimed(Address),

    #[error("Invalid construction: {0}")]
    ConstructionInvalid(String),

    #[error("Sale is not active at {0}")]
    SaleNotActive(u64),

    #[error("Contribution rejected: {0}")]
    ContributionRejected(String),

    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },

    #[error("Invalid call: {0}")]
    InvalidCall(String),

    #[error("No contract at {0}")]
    ContractNotFound(Address),

    #[error("Contract at {address} is not a {expected}")]
    WrongContractKind { address: Address, expected: &'static str },

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Token(TokenError),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl From<TokenError> for CrowdsaleError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Unauthorized(reason) => CrowdsaleError::Unauthorized(reason),
            TokenError::NotMintingAgent(address) => {
                CrowdsaleError::Unauthorized(format!("{} is not a minting agent", address))
            }
            TokenError::ZeroAmount => CrowdsaleError::ZeroAmount,
            TokenError::ConstructionInvalid(reason) => CrowdsaleError::ConstructionInvalid(reason),
            other => CrowdsaleError::Token(other),
        }
    }
}

impl From<CryptoError> for CrowdsaleError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidSignature(reason) => CrowdsaleError::InvalidSignature(reason),
            CryptoError::InvalidRecoveryId(v) => {
                CrowdsaleError::InvalidSignature(format!("invalid v {}", v))
            }
            other => CrowdsaleError::Crypto(other),
        }
    }
}

impl CrowdsaleError {
    /// True for caller-role failures (owner, signer, agent, allow-list)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CrowdsaleError::Unauthorized(_))
    }
}

/// Result type for crowdsale operations
pub type CrowdsaleResult<T> = Result<T, CrowdsaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_map_to_taxonomy() {
        let err: CrowdsaleError = TokenError::NotMintingAgent(Address::zero()).into();
        assert!(err.is_unauthorized());

        let err: CrowdsaleError = TokenError::Overflow.into();
        assert_eq!(err, CrowdsaleError::Token(TokenError::Overflow));
    }

    #[test]
    fn test_crypto_errors_map_to_invalid_signature() {
        let err: CrowdsaleError = CryptoError::InvalidRecoveryId(31).into();
        assert!(matches!(err, CrowdsaleError::InvalidSignature(_)));
    }
}
