//! Crowdsale Cryptography Foundation
//!
//! Everything needed to authorize a minting request the way the sale
//! contracts do: Keccak-256 over tightly-packed arguments, the
//! `eth_sign` message prefix, and recoverable secp256k1 signatures.

pub mod errors;
pub mod hashing;
pub mod keypair;
pub mod packed;
pub mod verification;

pub use errors::{CryptoError, CryptoResult};
pub use hashing::{eth_signed_message_hash, keccak256, keccak256_multiple};
pub use keypair::KeyPair;
pub use packed::{contribution_request_hash, encode_packed_address_uint256, mint_request_hash};
pub use verification::{address_from_verifying_key, recover_signer, RecoverableSignature};
