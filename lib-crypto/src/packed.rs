//! Tightly-packed argument encoding (`abi.encodePacked`)
//!
//! Minting vouchers are signed over `keccak256(abi.encodePacked(address, uint256))`:
//! the 20 raw address bytes followed by the 32-byte big-endian amount.
//! Contribution vouchers additionally lead with the sale address, so a
//! minting voucher never verifies as a contribution and vice versa.

use lib_types::{Address, Amount};

use crate::hashing::keccak256;

/// Length of a packed `(address, uint256)` pair
pub const PACKED_ADDRESS_UINT256_LEN: usize = 20 + 32;

/// Big-endian 32-byte `uint256` word for an amount
pub fn uint256_word(amount: Amount) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&amount.to_be_bytes());
    word
}

/// `abi.encodePacked(address, uint256)`
pub fn encode_packed_address_uint256(
    address: &Address,
    amount: Amount,
) -> [u8; PACKED_ADDRESS_UINT256_LEN] {
    let mut out = [0u8; PACKED_ADDRESS_UINT256_LEN];
    out[..20].copy_from_slice(address.as_bytes());
    out[20..].copy_from_slice(&uint256_word(amount));
    out
}

/// Hash a referral minting voucher authorizes: `(recipient, amount)`
pub fn mint_request_hash(recipient: &Address, amount: Amount) -> [u8; 32] {
    keccak256(&encode_packed_address_uint256(recipient, amount))
}

/// Hash a signed crowdsale contribution authorizes: `(sale, contributor, wei)`
///
/// `abi.encodePacked(address, address, uint256)`, 72 bytes.
pub fn contribution_request_hash(
    sale: &Address,
    contributor: &Address,
    wei_amount: Amount,
) -> [u8; 32] {
    let mut packed = [0u8; 20 + PACKED_ADDRESS_UINT256_LEN];
    packed[..20].copy_from_slice(sale.as_bytes());
    packed[20..].copy_from_slice(&encode_packed_address_uint256(contributor, wei_amount));
    keccak256(&packed)
}
