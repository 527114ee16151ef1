//! Hashing module
//!
//! Keccak-256 is the only hash in this engine. It matches the EVM's
//! `keccak256`/`sha3` opcode and is used for request digests, function
//! selectors, transaction hashes and address derivation.

use sha3::{Digest, Keccak256};

/// Prefix that `eth_sign` prepends to a 32-byte hash before signing
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Keccak-256 of a single buffer
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Keccak-256 over several segments, equivalent to hashing their concatenation
pub fn keccak256_multiple(data_segments: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for segment in data_segments {
        hasher.update(segment);
    }
    hasher.finalize().into()
}

/// Digest actually signed by `eth_sign` for a 32-byte message hash
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    keccak256_multiple(&[ETH_SIGNED_MESSAGE_PREFIX, hash])
}
