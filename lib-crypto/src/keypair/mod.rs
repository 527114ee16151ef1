//! secp256k1 key pairs
//!
//! Signs 32-byte hashes the way `web3.eth.sign` does: the hash is wrapped
//! with the `eth_sign` prefix, hashed again and signed recoverably.

use std::fmt;

use k256::ecdsa::SigningKey;

use lib_types::{Address, Amount};

use crate::errors::{CryptoError, CryptoResult};
use crate::hashing::{eth_signed_message_hash, keccak256_multiple};
use crate::packed::{contribution_request_hash, mint_request_hash};
use crate::verification::{address_from_verifying_key, RecoverableSignature, V_OFFSET};

/// Domain tag for deterministic seed-derived keys
const SEED_DOMAIN: &[u8] = b"crowdsale-sim/keypair/v1";

/// secp256k1 signing key with its cached address
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPair {
    /// Build from a 32-byte secret scalar
    pub fn from_secret(secret: &[u8; 32]) -> CryptoResult<Self> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidSecretKey)?;
        let address = address_from_verifying_key(signing_key.verifying_key());
        Ok(Self { signing_key, address })
    }

    /// Deterministic key derived from an arbitrary seed
    pub fn from_seed(seed: &[u8]) -> CryptoResult<Self> {
        let secret = keccak256_multiple(&[SEED_DOMAIN, seed]);
        Self::from_secret(&secret)
    }

    /// Ethereum address of this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte message hash through the `eth_sign` prefix
    pub fn sign_hash(&self, hash: &[u8; 32]) -> CryptoResult<RecoverableSignature> {
        let digest = eth_signed_message_hash(hash);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature::new(recovery_id.to_byte() + V_OFFSET, r, s))
    }

    /// Sign a referral minting voucher for `(recipient, amount)`
    pub fn sign_mint_request(
        &self,
        recipient: &Address,
        amount: Amount,
    ) -> CryptoResult<RecoverableSignature> {
        self.sign_hash(&mint_request_hash(recipient, amount))
    }

    /// Sign a contribution voucher for `(contributor, wei_amount)` on `sale`
    pub fn sign_contribution(
        &self,
        sale: &Address,
        contributor: &Address,
        wei_amount: Amount,
    ) -> CryptoResult<RecoverableSignature> {
        self.sign_hash(&contribution_request_hash(sale, contributor, wei_amount))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({})", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = KeyPair::from_seed(b"account-1").unwrap();
        let b = KeyPair::from_seed(b"account-1").unwrap();
        let c = KeyPair::from_seed(b"account-2").unwrap();
        assert_eq!(a.address(), b.address());
        assert_ne!(a.address(), c.address());
        assert!(!a.address().is_zero());
    }

    #[test]
    fn test_known_address_derivation() {
        // Secret 0x...01 is the generator point; its address is well known
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = KeyPair::from_secret(&secret).unwrap();
        assert_eq!(
            key.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(matches!(
            KeyPair::from_secret(&[0u8; 32]),
            Err(CryptoError::InvalidSecretKey)
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = KeyPair::from_seed(b"debug").unwrap();
        let text = format!("{:?}", key);
        assert!(text.starts_with("KeyPair(0x"));
    }
}
