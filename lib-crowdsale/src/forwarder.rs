//! DistributedDirectContributionForwarder
//!
//! Splits each contribution among fixed recipients by weight. The share
//! computation lives here; crediting native balances is done by
//! [`crate::state::ChainState`] so that it commits with the rest of the
//! transaction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use lib_tokens::Ownership;
use lib_types::{Address, Amount};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

/// One payout recipient and its weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub address: Address,
    pub proportion: Amount,
}

/// Weighted contribution splitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedDirectContributionForwarder {
    pub ownership: Ownership,
    /// Sum every recipient weight must add up to
    pub proportion_absolute_max: Amount,
    pub receivers: Vec<Receiver>,
    /// Wei forwarded over the forwarder's lifetime
    pub total_forwarded: Amount,
}

impl DistributedDirectContributionForwarder {
    /// Build a forwarder
    ///
    /// Rejects mismatched list lengths, an empty recipient list, zero
    /// weights and weights that do not sum to `proportion_absolute_max`.
    pub fn new(
        owner: Address,
        proportion_absolute_max: Amount,
        recipients: Vec<Address>,
        proportions: Vec<Amount>,
    ) -> CrowdsaleResult<Self> {
        if recipients.len() != proportions.len() {
            return Err(CrowdsaleError::ConstructionInvalid(format!(
                "{} recipients but {} proportions",
                recipients.len(),
                proportions.len()
            )));
        }
        if recipients.is_empty() {
            return Err(CrowdsaleError::ConstructionInvalid(
                "forwarder needs at least one recipient".to_string(),
            ));
        }
        if proportions.iter().any(|p| *p == 0) {
            return Err(CrowdsaleError::ConstructionInvalid(
                "recipient proportion must be non-zero".to_string(),
            ));
        }

        let sum = proportions
            .iter()
            .try_fold(0 as Amount, |acc, p| acc.checked_add(*p))
            .ok_or(CrowdsaleError::Overflow)?;
        if sum != proportion_absolute_max {
            return Err(CrowdsaleError::ConstructionInvalid(format!(
                "proportions sum to {}, expected {}",
                sum, proportion_absolute_max
            )));
        }

        let receivers = recipients
            .into_iter()
            .zip(proportions)
            .map(|(address, proportion)| Receiver { address, proportion })
            .collect();

        Ok(Self {
            ownership: Ownership::new(owner),
            proportion_absolute_max,
            receivers,
            total_forwarded: 0,
        })
    }

    /// Split `amount` by weight
    ///
    /// Each recipient gets `amount * weight / total`; the rounding remainder
    /// goes to the first recipient so the shares always sum to `amount`.
    pub fn split(&self, amount: Amount) -> CrowdsaleResult<Vec<(Address, Amount)>> {
        let mut shares = Vec::with_capacity(self.receivers.len());
        let mut distributed: Amount = 0;

        for receiver in &self.receivers {
            let share = amount
                .checked_mul(receiver.proportion)
                .ok_or(CrowdsaleError::Overflow)?
                / self.proportion_absolute_max;
            distributed = distributed.checked_add(share).ok_or(CrowdsaleError::Overflow)?;
            shares.push((receiver.address, share));
        }

        let remainder = amount.checked_sub(distributed).ok_or(CrowdsaleError::Overflow)?;
        if remainder > 0 {
            if let Some(first) = shares.first_mut() {
                first.1 = first.1.checked_add(remainder).ok_or(CrowdsaleError::Overflow)?;
            }
        }

        debug!("Split {} across {} recipients", amount, shares.len());
        Ok(shares)
    }

    /// Account for a completed forward
    pub fn record_forward(&mut self, amount: Amount) -> CrowdsaleResult<()> {
        self.total_forwarded = self
            .total_forwarded
            .checked_add(amount)
            .ok_or(CrowdsaleError::Overflow)?;
        Ok(())
    }
}
