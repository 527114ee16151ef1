//! Cryptography Errors

use thiserror::Error;

/// Error during signing or signer recovery
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Result type for cryptography operations
pub type CryptoResult<T> = Result<T, CryptoError>;
