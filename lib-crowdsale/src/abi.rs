//! Contract call codec
//!
//! Calldata is a 4-byte selector (`keccak256(signature)[..4]`) followed by
//! 32-byte argument words. Only the calls the simulated contracts expose
//! are understood; anything else is `InvalidCall`.

use std::fmt;

use serde::{Deserialize, Serialize};

use lib_crypto::{keccak256, RecoverableSignature};
use lib_types::{Address, Amount, Timestamp};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

const WORD: usize = 32;

pub const MULTIVEST_MINT: &str = "multivestMint(address,uint256,uint8,bytes32,bytes32)";
pub const SET_CROWDSALE: &str = "setCrowdsale(address)";
pub const SET_ALLOCATOR: &str = "setAllocator(address)";
pub const SET_TOKEN: &str = "setToken(address)";
pub const SET_CONTRIBUTION_FORWARDER: &str = "setContributionForwarder(address)";
pub const SET_PRICING_STRATEGY: &str = "setPricingStrategy(address)";
pub const UPDATE_DATES: &str = "updateDates(uint256,uint256)";
pub const UPDATE_TIER_DATES: &str = "updateTierDates(uint256,uint256,uint256)";
pub const ADD_CROWDSALES: &str = "addCrowdsales(address)";
pub const REMOVE_CROWDSALES: &str = "removeCrowdsales(address)";
pub const ADD_SIGNER: &str = "addSigner(address)";
pub const REMOVE_SIGNER: &str = "removeSigner(address)";
pub const UPDATE_WHITELIST: &str = "updateWhitelist(address,bool)";
pub const UPDATE_MINTING_AGENT: &str = "updateMintingAgent(address,bool)";
pub const TRANSFER_OWNERSHIP: &str = "transferOwnership(address)";
pub const ACCEPT_OWNERSHIP: &str = "acceptOwnership()";
pub const DISABLE_MINTING: &str = "disableMinting()";
pub const TRANSFER: &str = "transfer(address,uint256)";
pub const CONTRIBUTE: &str = "contribute()";
pub const CONTRIBUTE_SIGNED: &str = "contributeSigned(uint8,bytes32,bytes32)";

/// First four bytes of `keccak256(signature)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// A decoded contract call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCall {
    MultivestMint {
        recipient: Address,
        amount: Amount,
        signature: RecoverableSignature,
    },
    SetCrowdsale(Address),
    SetAllocator(Address),
    SetToken(Address),
    SetContributionForwarder(Address),
    SetPricingStrategy(Address),
    /// Sale window
    UpdateDates { start_date: Timestamp, end_date: Timestamp },
    /// Window of one pricing tier
    UpdateTierDates {
        tier_index: usize,
        start_date: Timestamp,
        end_date: Timestamp,
    },
    AddCrowdsales(Address),
    RemoveCrowdsales(Address),
    AddSigner(Address),
    RemoveSigner(Address),
    UpdateWhitelist { address: Address, status: bool },
    UpdateMintingAgent { agent: Address, status: bool },
    TransferOwnership(Address),
    AcceptOwnership,
    DisableMinting,
    Transfer { to: Address, amount: Amount },
    /// Plain contribution; also what empty calldata decodes to
    Contribute,
    ContributeSigned(RecoverableSignature),
}

impl ContractCall {
    /// Canonical function signature
    pub fn signature(&self) -> &'static str {
        match self {
            ContractCall::MultivestMint { .. } => MULTIVEST_MINT,
            ContractCall::SetCrowdsale(_) => SET_CROWDSALE,
            ContractCall::SetAllocator(_) => SET_ALLOCATOR,
            ContractCall::SetToken(_) => SET_TOKEN,
            ContractCall::SetContributionForwarder(_) => SET_CONTRIBUTION_FORWARDER,
            ContractCall::SetPricingStrategy(_) => SET_PRICING_STRATEGY,
            ContractCall::UpdateDates { .. } => UPDATE_DATES,
            ContractCall::UpdateTierDates { .. } => UPDATE_TIER_DATES,
            ContractCall::AddCrowdsales(_) => ADD_CROWDSALES,
            ContractCall::RemoveCrowdsales(_) => REMOVE_CROWDSALES,
            ContractCall::AddSigner(_) => ADD_SIGNER,
            ContractCall::RemoveSigner(_) => REMOVE_SIGNER,
            ContractCall::UpdateWhitelist { .. } => UPDATE_WHITELIST,
            ContractCall::UpdateMintingAgent { .. } => UPDATE_MINTING_AGENT,
            ContractCall::TransferOwnership(_) => TRANSFER_OWNERSHIP,
            ContractCall::AcceptOwnership => ACCEPT_OWNERSHIP,
            ContractCall::DisableMinting => DISABLE_MINTING,
            ContractCall::Transfer { .. } => TRANSFER,
            ContractCall::Contribute => CONTRIBUTE,
            ContractCall::ContributeSigned(_) => CONTRIBUTE_SIGNED,
        }
    }

    /// Selector followed by the argument words
    pub fn encode(&self) -> Vec<u8> {
        let mut out = selector(self.signature()).to_vec();
        match self {
            ContractCall::MultivestMint {
                recipient,
                amount,
                signature,
            } => {
                out.extend_from_slice(&address_word(recipient));
                out.extend_from_slice(&amount_word(*amount));
                push_signature(&mut out, signature);
            }
            ContractCall::SetCrowdsale(address)
            | ContractCall::SetAllocator(address)
            | ContractCall::SetToken(address)
            | ContractCall::SetContributionForwarder(address)
            | ContractCall::SetPricingStrategy(address)
            | ContractCall::AddCrowdsales(address)
            | ContractCall::RemoveCrowdsales(address)
            | ContractCall::AddSigner(address)
            | ContractCall::RemoveSigner(address)
            | ContractCall::TransferOwnership(address) => {
                out.extend_from_slice(&address_word(address));
            }
            ContractCall::UpdateWhitelist { address, status }
            | ContractCall::UpdateMintingAgent {
                agent: address,
                status,
            } => {
                out.extend_from_slice(&address_word(address));
                out.extend_from_slice(&amount_word(Amount::from(*status)));
            }
            ContractCall::Transfer { to, amount } => {
                out.extend_from_slice(&address_word(to));
                out.extend_from_slice(&amount_word(*amount));
            }
            ContractCall::UpdateDates {
                start_date,
                end_date,
            } => {
                out.extend_from_slice(&amount_word(Amount::from(*start_date)));
                out.extend_from_slice(&amount_word(Amount::from(*end_date)));
            }
            ContractCall::UpdateTierDates {
                tier_index,
                start_date,
                end_date,
            } => {
                out.extend_from_slice(&amount_word(*tier_index as Amount));
                out.extend_from_slice(&amount_word(Amount::from(*start_date)));
                out.extend_from_slice(&amount_word(Amount::from(*end_date)));
            }
            ContractCall::ContributeSigned(signature) => push_signature(&mut out, signature),
            ContractCall::AcceptOwnership | ContractCall::DisableMinting | ContractCall::Contribute => {}
        }
        out
    }

    /// Decode calldata
    pub fn decode(data: &[u8]) -> CrowdsaleResult<Self> {
        if data.is_empty() {
            return Ok(ContractCall::Contribute);
        }
        if data.len() < 4 {
            return Err(CrowdsaleError::InvalidCall(format!(
                "calldata too short: {} bytes",
                data.len()
            )));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&data[..4]);
        let args = &data[4..];

        let single_address = |args: &[u8]| -> CrowdsaleResult<Address> {
            let mut words = Words::new(args, 1)?;
            words.address()
        };

        let call = if id == selector(MULTIVEST_MINT) {
            let mut words = Words::new(args, 5)?;
            ContractCall::MultivestMint {
                recipient: words.address()?,
                amount: words.amount()?,
                signature: words.signature()?,
            }
        } else if id == selector(SET_CROWDSALE) {
            ContractCall::SetCrowdsale(single_address(args)?)
        } else if id == selector(SET_ALLOCATOR) {
            ContractCall::SetAllocator(single_address(args)?)
        } else if id == selector(SET_TOKEN) {
            ContractCall::SetToken(single_address(args)?)
        } else if id == selector(SET_CONTRIBUTION_FORWARDER) {
            ContractCall::SetContributionForwarder(single_address(args)?)
        } else if id == selector(SET_PRICING_STRATEGY) {
            ContractCall::SetPricingStrategy(single_address(args)?)
        } else if id == selector(UPDATE_DATES) {
            let mut words = Words::new(args, 2)?;
            ContractCall::UpdateDates {
                start_date: words.timestamp()?,
                end_date: words.timestamp()?,
            }
        } else if id == selector(UPDATE_TIER_DATES) {
            let mut words = Words::new(args, 3)?;
            ContractCall::UpdateTierDates {
                tier_index: words.index()?,
                start_date: words.timestamp()?,
                end_date: words.timestamp()?,
            }
        } else if id == selector(ADD_CROWDSALES) {
            ContractCall::AddCrowdsales(single_address(args)?)
        } else if id == selector(REMOVE_CROWDSALES) {
            ContractCall::RemoveCrowdsales(single_address(args)?)
        } else if id == selector(ADD_SIGNER) {
            ContractCall::AddSigner(single_address(args)?)
        } else if id == selector(REMOVE_SIGNER) {
            ContractCall::RemoveSigner(single_address(args)?)
        } else if id == selector(TRANSFER_OWNERSHIP) {
            ContractCall::TransferOwnership(single_address(args)?)
        } else if id == selector(UPDATE_WHITELIST) {
            let mut words = Words::new(args, 2)?;
            ContractCall::UpdateWhitelist {
                address: words.address()?,
                status: words.bool()?,
            }
        } else if id == selector(UPDATE_MINTING_AGENT) {
            let mut words = Words::new(args, 2)?;
            ContractCall::UpdateMintingAgent {
                agent: words.address()?,
                status: words.bool()?,
            }
        } else if id == selector(TRANSFER) {
            let mut words = Words::new(args, 2)?;
            ContractCall::Transfer {
                to: words.address()?,
                amount: words.amount()?,
            }
        } else if id == selector(ACCEPT_OWNERSHIP) {
            Words::new(args, 0)?;
            ContractCall::AcceptOwnership
        } else if id == selector(DISABLE_MINTING) {
            Words::new(args, 0)?;
            ContractCall::DisableMinting
        } else if id == selector(CONTRIBUTE) {
            Words::new(args, 0)?;
            ContractCall::Contribute
        } else if id == selector(CONTRIBUTE_SIGNED) {
            let mut words = Words::new(args, 3)?;
            ContractCall::ContributeSigned(words.signature()?)
        } else {
            return Err(CrowdsaleError::InvalidCall(format!(
                "unknown selector 0x{}",
                hex::encode(id)
            )));
        };
        Ok(call)
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractCall::MultivestMint {
                recipient,
                amount,
                signature,
            } => write!(
                f,
                "multivestMint({}, {}, {}, 0x{}, 0x{})",
                recipient,
                amount,
                signature.v,
                hex::encode(signature.r),
                hex::encode(signature.s)
            ),
            ContractCall::SetCrowdsale(a) => write!(f, "setCrowdsale({})", a),
            ContractCall::SetAllocator(a) => write!(f, "setAllocator({})", a),
            ContractCall::SetToken(a) => write!(f, "setToken({})", a),
            ContractCall::SetContributionForwarder(a) => write!(f, "setContributionForwarder({})", a),
            ContractCall::SetPricingStrategy(a) => write!(f, "setPricingStrategy({})", a),
            ContractCall::UpdateDates {
                start_date,
                end_date,
            } => write!(f, "updateDates({}, {})", start_date, end_date),
            ContractCall::UpdateTierDates {
                tier_index,
                start_date,
                end_date,
            } => write!(f, "updateTierDates({}, {}, {})", tier_index, start_date, end_date),
            ContractCall::AddCrowdsales(a) => write!(f, "addCrowdsales({})", a),
            ContractCall::RemoveCrowdsales(a) => write!(f, "removeCrowdsales({})", a),
            ContractCall::AddSigner(a) => write!(f, "addSigner({})", a),
            ContractCall::RemoveSigner(a) => write!(f, "removeSigner({})", a),
            ContractCall::UpdateWhitelist { address, status } => {
                write!(f, "updateWhitelist({}, {})", address, status)
            }
            ContractCall::UpdateMintingAgent { agent, status } => {
                write!(f, "updateMintingAgent({}, {})", agent, status)
            }
            ContractCall::TransferOwnership(a) => write!(f, "transferOwnership({})", a),
            ContractCall::AcceptOwnership => write!(f, "acceptOwnership()"),
            ContractCall::DisableMinting => write!(f, "disableMinting()"),
            ContractCall::Transfer { to, amount } => write!(f, "transfer({}, {})", to, amount),
            ContractCall::Contribute => write!(f, "contribute()"),
            ContractCall::ContributeSigned(signature) => write!(
                f,
                "contributeSigned({}, 0x{}, 0x{})",
                signature.v,
                hex::encode(signature.r),
                hex::encode(signature.s)
            ),
        }
    }
}

// =============================================================================
// Word encoding
// =============================================================================

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn amount_word(amount: Amount) -> [u8; WORD] {
    lib_crypto::packed::uint256_word(amount)
}

fn push_signature(out: &mut Vec<u8>, signature: &RecoverableSignature) {
    out.extend_from_slice(&amount_word(Amount::from(signature.v)));
    out.extend_from_slice(&signature.r);
    out.extend_from_slice(&signature.s);
}

/// Sequential reader over an exact number of argument words
struct Words<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Words<'a> {
    fn new(data: &'a [u8], count: usize) -> CrowdsaleResult<Self> {
        if data.len() != count * WORD {
            return Err(CrowdsaleError::InvalidCall(format!(
                "expected {} argument bytes, got {}",
                count * WORD,
                data.len()
            )));
        }
        Ok(Self { data, offset: 0 })
    }

    fn next(&mut self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        word.copy_from_slice(&self.data[self.offset..self.offset + WORD]);
        self.offset += WORD;
        word
    }

    fn address(&mut self) -> CrowdsaleResult<Address> {
        let word = self.next();
        if word[..12].iter().any(|b| *b != 0) {
            return Err(CrowdsaleError::InvalidCall("address word has dirty high bytes".to_string()));
        }
        Ok(Address::from_word(&word))
    }

    fn amount(&mut self) -> CrowdsaleResult<Amount> {
        let word = self.next();
        if word[..16].iter().any(|b| *b != 0) {
            return Err(CrowdsaleError::InvalidCall("uint256 value exceeds u128".to_string()));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(Amount::from_be_bytes(low))
    }

    fn timestamp(&mut self) -> CrowdsaleResult<Timestamp> {
        Timestamp::try_from(self.amount()?)
            .map_err(|_| CrowdsaleError::InvalidCall("timestamp exceeds u64".to_string()))
    }

    fn index(&mut self) -> CrowdsaleResult<usize> {
        usize::try_from(self.amount()?)
            .map_err(|_| CrowdsaleError::InvalidCall("index out of range".to_string()))
    }

    fn bool(&mut self) -> CrowdsaleResult<bool> {
        match self.amount()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CrowdsaleError::InvalidCall(format!("bool word holds {}", other))),
        }
    }

    fn bytes32(&mut self) -> [u8; WORD] {
        self.next()
    }

    fn signature(&mut self) -> CrowdsaleResult<RecoverableSignature> {
        let v = u8::try_from(self.amount()?)
            .map_err(|_| CrowdsaleError::InvalidCall("uint8 value out of range".to_string()))?;
        let r = self.bytes32();
        let s = self.bytes32();
        Ok(RecoverableSignature::new(v, r, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("transferOwnership(address)")), "f2fde38b");
    }

    #[test]
    fn test_multivest_mint_layout() {
        let recipient = Address::new([0x42u8; 20]);
        let call = ContractCall::MultivestMint {
            recipient,
            amount: 1_000,
            signature: RecoverableSignature::new(28, [1u8; 32], [2u8; 32]),
        };
        let data = call.encode();
        assert_eq!(data.len(), 4 + 5 * 32);
        assert_eq!(&data[..4], &selector(MULTIVEST_MINT));
        assert_eq!(&data[16..36], recipient.as_bytes());
        assert_eq!(data[4 + 3 * 32 - 1], 28);
        assert_eq!(ContractCall::decode(&data).unwrap(), call);
    }

    #[test]
    fn test_empty_calldata_is_contribution() {
        assert_eq!(ContractCall::decode(&[]).unwrap(), ContractCall::Contribute);
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(matches!(
            ContractCall::decode(&[0xde, 0xad, 0xbe, 0xef]),
            Err(CrowdsaleError::InvalidCall(_))
        ));
        assert!(ContractCall::decode(&[0x01, 0x02]).is_err());

        let mut short = ContractCall::SetCrowdsale(Address::new([1u8; 20])).encode();
        short.pop();
        assert!(ContractCall::decode(&short).is_err());

        let mut bad_bool = ContractCall::UpdateWhitelist {
            address: Address::new([1u8; 20]),
            status: true,
        }
        .encode();
        let last = bad_bool.len() - 1;
        bad_bool[last] = 2;
        assert!(ContractCall::decode(&bad_bool).is_err());
    }

    #[test]
    fn test_update_tier_dates_layout() {
        let call = ContractCall::UpdateTierDates {
            tier_index: 2,
            start_date: 100,
            end_date: 200,
        };
        let data = call.encode();
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(data[4 + 31], 2);
        assert_eq!(data[4 + 2 * 32 + 31], 100);
        assert_eq!(ContractCall::decode(&data).unwrap(), call);
        assert_eq!(call.to_string(), "updateTierDates(2, 100, 200)");
    }

    #[test]
    fn test_timestamp_above_u64_rejected() {
        let mut data = ContractCall::UpdateDates {
            start_date: 0,
            end_date: 1,
        }
        .encode();
        data[4 + 32 + 23] = 1;
        assert!(matches!(ContractCall::decode(&data), Err(CrowdsaleError::InvalidCall(_))));
    }

    #[test]
    fn test_amount_above_u128_rejected() {
        let mut data = ContractCall::Transfer {
            to: Address::new([1u8; 20]),
            amount: 5,
        }
        .encode();
        // Set a bit above the low 128
        data[4 + 32 + 15] = 1;
        assert!(matches!(ContractCall::decode(&data), Err(CrowdsaleError::InvalidCall(_))));
    }

    #[test]
    fn test_display() {
        let call = ContractCall::UpdateMintingAgent {
            agent: Address::new([0xaau8; 20]),
            status: true,
        };
        assert!(call.to_string().starts_with("updateMintingAgent(0xaaaa"));
        assert_eq!(ContractCall::DisableMinting.to_string(), "disableMinting()");
    }
}
