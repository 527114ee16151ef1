//! Canonical Primitive Types
//!
//! These types are the building blocks for all simulated contract state.
//! They are designed to be:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Cheap to copy and compare

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ParseError, ParseResult};

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Token and wei amounts. ABI `uint256` values are accepted while they fit.
pub type Amount = u128;

/// Block time in seconds since the Unix epoch
pub type Timestamp = u64;

/// 18-decimal fixed-point scaling used by token amounts
pub const PRECISION: Amount = 1_000_000_000_000_000_000;

/// 5-decimal fixed-point scaling used by USD denominated prices
pub const USD_PRECISION: Amount = 100_000;

fn decode_fixed<const N: usize>(s: &str) -> ParseResult<[u8; N]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(ParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 20-byte account or contract address
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Build an address from the low 20 bytes of a 32-byte word
    pub fn from_word(word: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Self(bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// HASH TYPES
// ============================================================================

/// 32-byte transaction hash
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Create a new TxHash from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed TxHash
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TxHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Hex-string serde so addresses can key JSON maps
macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(Address);
hex_serde!(TxHash);

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_basics() {
        let addr = Address::new([3u8; 20]);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes(), &[3u8; 20]);
        assert!(Address::zero().is_zero());
    }

    #[test]
    fn test_address_display_and_parse() {
        let addr = Address::new([0xabu8; 20]);
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!(text[2..].parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_parse_rejects_bad_input() {
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(ParseError::InvalidLength { expected: 20, actual: 2 })
        ));
        assert!(matches!("0xzz".parse::<Address>(), Err(ParseError::InvalidHex(_))));
    }

    #[test]
    fn test_address_from_word() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[7u8; 20]);
        assert_eq!(Address::from_word(&word), Address::new([7u8; 20]));
    }

    #[test]
    fn test_tx_hash_basics() {
        let hash = TxHash::new([2u8; 32]);
        assert!(!hash.is_zero());
        assert_eq!(hash.as_bytes(), &[2u8; 32]);
        assert!(TxHash::zero().is_zero());
    }

    #[test]
    fn test_precision_constants() {
        assert_eq!(PRECISION, 10u128.pow(18));
        assert_eq!(USD_PRECISION, 10u128.pow(5));
        // Largest fixture amount must fit comfortably
        assert!(100_000u128.checked_mul(PRECISION).is_some());
    }

    #[test]
    fn test_json_roundtrip() {
        let addr = Address::new([9u8; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let restored: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, restored);
    }

    #[test]
    fn test_address_as_json_map_key() {
        let mut balances = std::collections::BTreeMap::new();
        balances.insert(Address::new([1u8; 20]), 5u128);
        let json = serde_json::to_string(&balances).unwrap();
        let restored: std::collections::BTreeMap<Address, u128> = serde_json::from_str(&json).unwrap();
        assert_eq!(balances, restored);
    }
}
