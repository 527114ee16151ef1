//! Signer recovery
//!
//! The sale contracts never verify against a known public key. They recover
//! the address that produced `(v, r, s)` over the `eth_sign` digest and then
//! look that address up in a signer registry. A signature made for different
//! arguments therefore recovers some unrelated address rather than failing
//! outright; callers must treat "recovered an unknown address" as rejection.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

use lib_types::Address;

use crate::errors::{CryptoError, CryptoResult};
use crate::hashing::{eth_signed_message_hash, keccak256};

/// Offset Ethereum adds to the raw recovery id
pub const V_OFFSET: u8 = 27;

/// Recoverable ECDSA signature in Ethereum `(v, r, s)` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// Recovery id plus 27 (`27` or `28`); raw `0`/`1` is also accepted
    pub v: u8,
    /// Big-endian `r` scalar
    pub r: [u8; 32],
    /// Big-endian `s` scalar
    pub s: [u8; 32],
}

impl RecoverableSignature {
    /// Create a signature from its parts
    pub const fn new(v: u8, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { v, r, s }
    }

    /// 65-byte `r || s || v` layout returned by `eth_sign`
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Parse the 65-byte `r || s || v` layout
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 65 {
            return Err(CryptoError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { v: bytes[64], r, s })
    }

    /// Raw recovery id (`0` or `1`)
    pub fn recovery_id(&self) -> CryptoResult<RecoveryId> {
        let raw = if self.v >= V_OFFSET { self.v - V_OFFSET } else { self.v };
        if raw > 1 {
            return Err(CryptoError::InvalidRecoveryId(self.v));
        }
        RecoveryId::from_byte(raw).ok_or(CryptoError::InvalidRecoveryId(self.v))
    }

    fn ecdsa_signature(&self) -> CryptoResult<Signature> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        Signature::from_slice(&rs).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }
}

/// Ethereum address of a public key: last 20 bytes of keccak256(X || Y)
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Uncompressed SEC1 point is 0x04 || X || Y
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_word(&digest)
}

/// Recover the address that signed `hash` through `eth_sign`
///
/// `hash` is the 32-byte message hash (e.g. [`crate::mint_request_hash`]);
/// the prefix is applied here, as the contracts do before `ecrecover`.
pub fn recover_signer(hash: &[u8; 32], signature: &RecoverableSignature) -> CryptoResult<Address> {
    let recovery_id = signature.recovery_id()?;
    let ecdsa = signature.ecdsa_signature()?;
    let digest = eth_signed_message_hash(hash);

    let key = VerifyingKey::recover_from_prehash(&digest, &ecdsa, recovery_id)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    Ok(address_from_verifying_key(&key))
}
