//! Tiered pricing strategy
//!
//! Each tier sells at a fixed wei-per-token price within a time window, up
//! to a token allowance, with a percentage bonus and a minimum investment.
//! Quotes that cannot be honoured come back as zero rather than as errors;
//! the sale turns a zero quote into a rejected contribution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use lib_tokens::Ownership;
use lib_types::{Address, Amount, Timestamp, PRECISION};

use crate::errors::{CrowdsaleError, CrowdsaleResult};

/// Bonus percentages are whole percents
const PERCENT_BASE: Amount = 100;

/// `a * b / c` without overflowing on 18-decimal operands
pub(crate) fn mul_div(a: Amount, b: Amount, c: Amount) -> CrowdsaleResult<Amount> {
    if c == 0 {
        return Err(CrowdsaleError::Overflow);
    }
    let whole = (a / c).checked_mul(b).ok_or(CrowdsaleError::Overflow)?;
    let part = (a % c).checked_mul(b).ok_or(CrowdsaleError::Overflow)? / c;
    whole.checked_add(part).ok_or(CrowdsaleError::Overflow)
}

/// One pricing tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Wei paid per whole token (`PRECISION` base units)
    pub token_in_wei: Amount,
    /// Tokens this tier may sell, bonus included; 0 = unlimited
    pub max_tokens_collected: Amount,
    pub sold_tokens: Amount,
    pub bonus_percents: Amount,
    /// Smallest accepted contribution in wei
    pub min_invest: Amount,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

impl Tier {
    fn contains(&self, now: Timestamp) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Remaining allowance (None = unlimited)
    pub fn remaining(&self) -> Option<Amount> {
        if self.max_tokens_collected == 0 {
            return None;
        }
        Some(self.max_tokens_collected.saturating_sub(self.sold_tokens))
    }

    fn is_sold_out(&self) -> bool {
        self.remaining() == Some(0)
    }
}

/// Result of a price lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenQuote {
    /// Tokens to mint, bonus included
    pub tokens: Amount,
    pub tokens_excluding_bonus: Amount,
    pub bonus: Amount,
    /// Tier that produced the quote
    pub tier_index: usize,
}

impl TokenQuote {
    pub fn is_zero(&self) -> bool {
        self.tokens == 0
    }
}

/// Ordered list of pricing tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredPricingStrategy {
    pub ownership: Ownership,
    pub tiers: Vec<Tier>,
}

impl TieredPricingStrategy {
    /// Build a strategy; every tier needs a price and a valid window
    pub fn new(owner: Address, tiers: Vec<Tier>) -> CrowdsaleResult<Self> {
        if tiers.is_empty() {
            return Err(CrowdsaleError::ConstructionInvalid(
                "pricing needs at least one tier".to_string(),
            ));
        }
        for (index, tier) in tiers.iter().enumerate() {
            if tier.token_in_wei == 0 {
                return Err(CrowdsaleError::ConstructionInvalid(format!(
                    "tier {} has zero price",
                    index
                )));
            }
            if tier.start_date > tier.end_date {
                return Err(CrowdsaleError::ConstructionInvalid(format!(
                    "tier {} ends before it starts",
                    index
                )));
            }
        }
        Ok(Self {
            ownership: Ownership::new(owner),
            tiers,
        })
    }

    /// Index of the first open, not sold out tier at `now`
    pub fn active_tier(&self, now: Timestamp) -> Option<usize> {
        self.tiers
            .iter()
            .position(|tier| tier.contains(now) && !tier.is_sold_out())
    }

    /// Tokens bought by `wei_amount` at `now`
    ///
    /// Zero when no tier is active, the amount is below the tier minimum,
    /// or the tokens exceed the tier allowance or `tokens_available`.
    pub fn get_tokens(
        &self,
        tokens_available: Amount,
        wei_amount: Amount,
        now: Timestamp,
    ) -> CrowdsaleResult<TokenQuote> {
        let Some(index) = self.active_tier(now) else {
            return Ok(TokenQuote::default());
        };
        let tier = &self.tiers[index];
        if wei_amount == 0 || wei_amount < tier.min_invest {
            return Ok(TokenQuote::default());
        }

        let tokens_excluding_bonus = mul_div(wei_amount, PRECISION, tier.token_in_wei)?;
        let bonus = tokens_excluding_bonus
            .checked_mul(tier.bonus_percents)
            .ok_or(CrowdsaleError::Overflow)?
            / PERCENT_BASE;
        let tokens = tokens_excluding_bonus
            .checked_add(bonus)
            .ok_or(CrowdsaleError::Overflow)?;

        if tier.remaining().is_some_and(|left| tokens > left) || tokens > tokens_available {
            return Ok(TokenQuote::default());
        }

        Ok(TokenQuote {
            tokens,
            tokens_excluding_bonus,
            bonus,
            tier_index: index,
        })
    }

    /// Wei needed for `tokens` (bonus excluded) at `now`, with the bonus earned
    ///
    /// `(0, 0)` when no tier is active, the price falls below the tier
    /// minimum, or the tokens plus bonus exceed the tier allowance.
    pub fn get_weis(&self, tokens: Amount, now: Timestamp) -> CrowdsaleResult<(Amount, Amount)> {
        let Some(index) = self.active_tier(now) else {
            return Ok((0, 0));
        };
        let tier = &self.tiers[index];

        let wei = mul_div(tokens, tier.token_in_wei, PRECISION)?;
        if wei == 0 || wei < tier.min_invest {
            return Ok((0, 0));
        }

        let bonus = tokens
            .checked_mul(tier.bonus_percents)
            .ok_or(CrowdsaleError::Overflow)?
            / PERCENT_BASE;
        let total = tokens.checked_add(bonus).ok_or(CrowdsaleError::Overflow)?;
        if tier.remaining().is_some_and(|left| total > left) {
            return Ok((0, 0));
        }

        Ok((wei, bonus))
    }

    /// Count `tokens` against a tier's allowance
    pub fn record_sale(&mut self, tier_index: usize, tokens: Amount) -> CrowdsaleResult<()> {
        let tier = self.tiers.get_mut(tier_index).ok_or_else(|| {
            CrowdsaleError::InvalidCall(format!("no pricing tier {}", tier_index))
        })?;
        tier.sold_tokens = tier.sold_tokens.checked_add(tokens).ok_or(CrowdsaleError::Overflow)?;
        debug!("Tier {} sold {} (total {})", tier_index, tokens, tier.sold_tokens);
        Ok(())
    }

    /// Move a tier's window (owner only)
    pub fn update_dates(
        &mut self,
        caller: &Address,
        tier_index: usize,
        start_date: Timestamp,
        end_date: Timestamp,
    ) -> CrowdsaleResult<()> {
        self.ownership.ensure_owner(caller)?;
        if start_date > end_date {
            return Err(CrowdsaleError::ConstructionInvalid(format!(
                "tier {} ends before it starts",
                tier_index
            )));
        }
        let tier = self.tiers.get_mut(tier_index).ok_or_else(|| {
            CrowdsaleError::InvalidCall(format!("no pricing tier {}", tier_index))
        })?;
        tier.start_date = start_date;
        tier.end_date = end_date;
        Ok(())
    }
}
