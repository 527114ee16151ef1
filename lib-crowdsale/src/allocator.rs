//! MintableTokenAllocator
//!
//! Authorization relay between sale processes and the ledger. The allocator
//! holds no balances; it only decides which callers may have tokens minted
//! through it. The actual mint runs in [`crate::state::ChainState::allocate`],
//! which checks [`MintableTokenAllocator::ensure_allowed`] and then mints
//! with the allocator's own address as the minting agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use lib_tokens::{MintableToken, Ownership};
use lib_types::{Address, Amount};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

/// Allow-list of callers permitted to mint on one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintableTokenAllocator {
    pub ownership: Ownership,
    /// Ledger this allocator mints on
    pub token: Address,
    /// Sales and referral programs allowed to call `allocate`
    pub crowdsales: BTreeSet<Address>,
}

impl MintableTokenAllocator {
    pub fn new(owner: Address, token: Address) -> Self {
        Self {
            ownership: Ownership::new(owner),
            token,
            crowdsales: BTreeSet::new(),
        }
    }

    /// Allow `crowdsale` to request minting (owner only)
    pub fn add_crowdsales(&mut self, caller: &Address, crowdsale: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.crowdsales.insert(crowdsale);
        debug!("Allocator allow-listed {}", crowdsale);
        Ok(())
    }

    /// Revoke a previously allowed caller (owner only)
    pub fn remove_crowdsales(&mut self, caller: &Address, crowdsale: &Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.crowdsales.remove(crowdsale);
        debug!("Allocator removed {}", crowdsale);
        Ok(())
    }

    /// Point the allocator at another ledger (owner only)
    pub fn set_token(&mut self, caller: &Address, token: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.token = token;
        info!("Allocator token set to {}", token);
        Ok(())
    }

    pub fn is_allowed(&self, caller: &Address) -> bool {
        self.crowdsales.contains(caller)
    }

    /// Fail with `Unauthorized` unless `caller` is allow-listed
    pub fn ensure_allowed(&self, caller: &Address) -> CrowdsaleResult<()> {
        if !self.is_allowed(caller) {
            return Err(CrowdsaleError::Unauthorized(format!(
                "{} is not an allocator client",
                caller
            )));
        }
        Ok(())
    }

    /// Tokens still mintable on `token` (u128::MAX when uncapped)
    pub fn tokens_available(&self, token: &MintableToken) -> Amount {
        token.mintable_supply().unwrap_or(Amount::MAX)
    }
}
