//! Crowdsale
//!
//! Sale configuration plus the signer registry consulted by signed
//! contributions and by the referral program. Mode checks live here; the
//! money and token movements run in [`crate::state::ChainState`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use lib_tokens::Ownership;
use lib_types::{Address, Amount, Timestamp};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

/// How a contribution was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContributionMode {
    Anonymous,
    Whitelisted,
    /// Authorized by a registered signer over `(contributor, value)`
    Signed { signer: Address },
}

/// Sale record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crowdsale {
    pub ownership: Ownership,
    pub allocator: Address,
    pub contribution_forwarder: Address,
    pub pricing_strategy: Option<Address>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub allow_whitelisted: bool,
    pub allow_signed: bool,
    pub allow_anonymous: bool,
    pub tokens_sold: Amount,
    pub signers: BTreeSet<Address>,
    pub whitelist: BTreeSet<Address>,
}

impl Crowdsale {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: Address,
        allocator: Address,
        contribution_forwarder: Address,
        pricing_strategy: Option<Address>,
        start_date: Timestamp,
        end_date: Timestamp,
        allow_whitelisted: bool,
        allow_signed: bool,
        allow_anonymous: bool,
    ) -> Self {
        Self {
            ownership: Ownership::new(owner),
            allocator,
            contribution_forwarder,
            pricing_strategy,
            start_date,
            end_date,
            allow_whitelisted,
            allow_signed,
            allow_anonymous,
            tokens_sold: 0,
            signers: BTreeSet::new(),
            whitelist: BTreeSet::new(),
        }
    }

    // =========================================================================
    // Owner-only configuration
    // =========================================================================

    pub fn add_signer(&mut self, caller: &Address, signer: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.signers.insert(signer);
        info!("Signer {} registered", signer);
        Ok(())
    }

    pub fn remove_signer(&mut self, caller: &Address, signer: &Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.signers.remove(signer);
        info!("Signer {} removed", signer);
        Ok(())
    }

    pub fn update_whitelist(
        &mut self,
        caller: &Address,
        address: Address,
        status: bool,
    ) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        if status {
            self.whitelist.insert(address);
        } else {
            self.whitelist.remove(&address);
        }
        debug!("Whitelist {} set to {}", address, status);
        Ok(())
    }

    pub fn set_allocator(&mut self, caller: &Address, allocator: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.allocator = allocator;
        Ok(())
    }

    pub fn set_contribution_forwarder(
        &mut self,
        caller: &Address,
        forwarder: Address,
    ) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.contribution_forwarder = forwarder;
        info!("Sale forwarder set to {}", forwarder);
        Ok(())
    }

    pub fn set_pricing_strategy(&mut self, caller: &Address, strategy: Address) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.pricing_strategy = Some(strategy);
        info!("Sale pricing strategy set to {}", strategy);
        Ok(())
    }

    pub fn update_dates(
        &mut self,
        caller: &Address,
        start_date: Timestamp,
        end_date: Timestamp,
    ) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.start_date = start_date;
        self.end_date = end_date;
        info!("Sale window now {}..={}", start_date, end_date);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    /// Fail with `InvalidSignature` unless `address` is a registered signer
    pub fn ensure_signer(&self, address: &Address) -> CrowdsaleResult<()> {
        if !self.is_signer(address) {
            return Err(CrowdsaleError::InvalidSignature(format!(
                "{} is not a registered signer",
                address
            )));
        }
        Ok(())
    }

    pub fn is_whitelisted(&self, address: &Address) -> bool {
        self.whitelist.contains(address)
    }

    /// `start_date <= now <= end_date`
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Pick the mode for an unsigned contribution
    ///
    /// Whitelisted contributors go through the whitelist mode when it is
    /// open; everyone else needs anonymous contributions to be allowed.
    pub fn unsigned_mode(&self, contributor: &Address) -> CrowdsaleResult<ContributionMode> {
        if self.allow_whitelisted && self.is_whitelisted(contributor) {
            return Ok(ContributionMode::Whitelisted);
        }
        if self.allow_anonymous {
            return Ok(ContributionMode::Anonymous);
        }
        Err(CrowdsaleError::ContributionRejected(format!(
            "{} is not whitelisted and anonymous contributions are closed",
            contributor
        )))
    }

    /// Accept a signed contribution from a recovered signer
    pub fn signed_mode(&self, signer: Address) -> CrowdsaleResult<ContributionMode> {
        if !self.allow_signed {
            return Err(CrowdsaleError::ContributionRejected(
                "signed contributions are closed".to_string(),
            ));
        }
        self.ensure_signer(&signer)?;
        Ok(ContributionMode::Signed { signer })
    }

    /// Pricing strategy address, required before any contribution
    pub fn pricing(&self) -> CrowdsaleResult<Address> {
        self.pricing_strategy.ok_or_else(|| {
            CrowdsaleError::ContributionRejected("no pricing strategy set".to_string())
        })
    }

    pub fn record_tokens_sold(&mut self, tokens: Amount) -> CrowdsaleResult<()> {
        self.tokens_sold = self.tokens_sold.checked_add(tokens).ok_or(CrowdsaleError::Overflow)?;
        Ok(())
    }
}
