//! Referral Program
//!
//! Pays out signer-authorized token rewards ("multivest" vouchers) through
//! an allocator. This module keeps the claim bookkeeping and its limits:
//!
//! - `sent_once`: each address may claim at most once
//! - `total_supply`: cap on the tokens any single address may claim in
//!   total (0 = unlimited)
//!
//! Signature recovery, the signer check and the mint are sequenced by
//! [`crate::state::ChainState::mint_referral`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use lib_tokens::Ownership;
use lib_types::{Address, Amount};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralProgram {
    pub ownership: Ownership,
    /// Per-address cap on claimed tokens, 0 = unlimited
    total_supply: Amount,
    pub allocator: Address,
    /// Sale whose signer registry authorizes vouchers
    pub crowdsale: Address,
    sent_once: bool,
    claimed: BTreeSet<Address>,
    claimed_balances: BTreeMap<Address, Amount>,
    /// Sum over all addresses, statistics only
    total_claimed: Amount,
}

impl ReferralProgram {
    pub fn new(
        owner: Address,
        total_supply: Amount,
        allocator: Address,
        crowdsale: Address,
        sent_once: bool,
    ) -> Self {
        Self {
            ownership: Ownership::new(owner),
            total_supply,
            allocator,
            crowdsale,
            sent_once,
            claimed: BTreeSet::new(),
            claimed_balances: BTreeMap::new(),
            total_claimed: 0,
        }
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn sent_once(&self) -> bool {
        self.sent_once
    }

    pub fn total_claimed(&self) -> Amount {
        self.total_claimed
    }

    pub fn claimed(&self, address: &Address) -> bool {
        self.claimed.contains(address)
    }

    /// Tokens claimed so far by `address`
    pub fn claimed_balance(&self, address: &Address) -> Amount {
        self.claimed_balances.get(address).copied().unwrap_or(0)
    }

    /// What `address` may still claim before hitting the cap (None = unlimited)
    pub fn remaining_for(&self, address: &Address) -> Option<Amount> {
        if self.total_supply == 0 {
            return None;
        }
        Some(self.total_supply.saturating_sub(self.claimed_balance(address)))
    }

    pub fn set_allocator(&mut self, caller: &Address, allocator: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.allocator = allocator;
        info!("Referral allocator set to {}", allocator);
        Ok(())
    }

    pub fn set_crowdsale(&mut self, caller: &Address, crowdsale: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.crowdsale = crowdsale;
        info!("Referral crowdsale set to {}", crowdsale);
        Ok(())
    }

    /// Book a claim of `amount` for `address`
    ///
    /// Checked in order: one-time claim, then the cap against the address's
    /// own claimed balance. Nothing is written unless both pass.
    pub fn record_claim(&mut self, address: Address, amount: Amount) -> CrowdsaleResult<Amount> {
        if self.sent_once && self.claimed(&address) {
            return Err(CrowdsaleError::AlreadyClaimed(address));
        }

        let new_balance = self
            .claimed_balance(&address)
            .checked_add(amount)
            .ok_or(CrowdsaleError::Overflow)?;
        if self.total_supply != 0 && new_balance > self.total_supply {
            return Err(CrowdsaleError::CapExceeded {
                cap: self.total_supply,
                would_have: new_balance,
            });
        }
        let new_total = self
            .total_claimed
            .checked_add(amount)
            .ok_or(CrowdsaleError::Overflow)?;

        self.claimed.insert(address);
        self.claimed_balances.insert(address, new_balance);
        self.total_claimed = new_total;

        debug!("Referral claim {} for {} (total {})", amount, address, new_total);
        Ok(new_balance)
    }
}
