//! MintableToken
//!
//! The ledger contract: balances, total supply, an optional supply cap and
//! the set of minting agents allowed to increase supply.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use lib_types::{Address, Amount};

use crate::errors::{TokenError, TokenResult};
use crate::ownership::Ownership;

// =============================================================================
// MINTABLE TOKEN
// =============================================================================

/// Ledger with agent-gated minting
///
/// Invariant: the sum of all balances equals `total_supply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintableToken {
    // =========================================================================
    // Configuration
    // =========================================================================
    /// Owner (flags minting agents, disables minting)
    pub ownership: Ownership,
    /// Supply cap, 0 = uncapped
    pub max_supply: Amount,
    /// Cleared permanently by `disable_minting`
    pub minting_allowed: bool,

    // =========================================================================
    // Ledger State
    // =========================================================================
    /// Total supply in circulation
    pub total_supply: Amount,
    /// Holder balances; absent entries are zero
    pub balances: BTreeMap<Address, Amount>,
    /// Addresses allowed to call `mint`
    pub minting_agents: BTreeSet<Address>,
}

impl MintableToken {
    /// Create a ledger
    ///
    /// `minted_supply` is credited to `owner` up front. With a non-zero cap,
    /// the initial supply may not exceed `max_supply`.
    pub fn new(
        owner: Address,
        max_supply: Amount,
        minted_supply: Amount,
        minting_allowed: bool,
    ) -> TokenResult<Self> {
        if max_supply > 0 && minted_supply > max_supply {
            return Err(TokenError::ConstructionInvalid(format!(
                "minted supply {} exceeds max supply {}",
                minted_supply, max_supply
            )));
        }

        let mut balances = BTreeMap::new();
        if minted_supply > 0 {
            balances.insert(owner, minted_supply);
        }

        Ok(Self {
            ownership: Ownership::new(owner),
            max_supply,
            minting_allowed,
            total_supply: minted_supply,
            balances,
            minting_agents: BTreeSet::new(),
        })
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of a holder
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn is_minting_agent(&self, address: &Address) -> bool {
        self.minting_agents.contains(address)
    }

    /// Remaining mintable supply (None = unlimited)
    pub fn mintable_supply(&self) -> Option<Amount> {
        if !self.minting_allowed {
            return Some(0);
        }
        if self.max_supply == 0 {
            return None;
        }
        Some(self.max_supply.saturating_sub(self.total_supply))
    }

    /// Flag or unflag a minting agent (owner only)
    pub fn update_minting_agent(
        &mut self,
        caller: &Address,
        agent: Address,
        status: bool,
    ) -> TokenResult<()> {
        self.ownership.ensure_owner(caller)?;
        if status {
            self.minting_agents.insert(agent);
        } else {
            self.minting_agents.remove(&agent);
        }
        debug!("Minting agent {} set to {}", agent, status);
        Ok(())
    }

    /// Permanently stop minting (owner only)
    pub fn disable_minting(&mut self, caller: &Address) -> TokenResult<()> {
        self.ownership.ensure_owner(caller)?;
        self.minting_allowed = false;
        info!("Minting disabled, final supply {}", self.total_supply);
        Ok(())
    }

    /// Mint `amount` to `holder`
    ///
    /// # Enforcement
    ///
    /// - caller must be a minting agent
    /// - minting must still be allowed
    /// - amount must be non-zero
    /// - capped ledgers may not exceed `max_supply`
    ///
    /// Both the new supply and the new balance are computed before either is
    /// written, so a failure leaves the ledger untouched.
    pub fn mint(&mut self, caller: &Address, holder: Address, amount: Amount) -> TokenResult<Amount> {
        if !self.is_minting_agent(caller) {
            return Err(TokenError::NotMintingAgent(*caller));
        }
        if !self.minting_allowed {
            return Err(TokenError::MintingDisabled);
        }
        if amount == 0 {
            return Err(TokenError::ZeroAmount);
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        if self.max_supply > 0 && new_supply > self.max_supply {
            return Err(TokenError::SupplyCapExceeded {
                max: self.max_supply,
                would_have: new_supply,
            });
        }

        let new_balance = self
            .balance_of(&holder)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = new_supply;
        self.balances.insert(holder, new_balance);

        debug!("Minted {} to {} (supply {})", amount, holder, new_supply);
        Ok(new_balance)
    }

    /// Verify Σ balances == total_supply
    pub fn check_invariant(&self) -> TokenResult<()> {
        let sum = self
            .balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
            .ok_or(TokenError::Overflow)?;
        if sum != self.total_supply {
            return Err(TokenError::ConservationViolated(format!(
                "sum of balances ({}) != total_supply ({})",
                sum, self.total_supply
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::PRECISION;

    fn owner() -> Address {
        Address::new([1u8; 20])
    }

    fn agent() -> Address {
        Address::new([2u8; 20])
    }

    fn create_test_token() -> MintableToken {
        let mut token = MintableToken::new(owner(), 100_000 * PRECISION, 0, true).unwrap();
        token.update_minting_agent(&owner(), agent(), true).unwrap();
        token
    }

    #[test]
    fn test_new_token_state() {
        let token = MintableToken::new(owner(), 100_000 * PRECISION, 0, true).unwrap();
        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.owner(), owner());
        assert!(token.minting_agents.is_empty());
        assert_eq!(token.mintable_supply(), Some(100_000 * PRECISION));
    }

    #[test]
    fn test_initial_supply_credited_to_owner() {
        let token = MintableToken::new(owner(), 1_000, 400, true).unwrap();
        assert_eq!(token.balance_of(&owner()), 400);
        assert_eq!(token.total_supply(), 400);
        token.check_invariant().unwrap();
    }

    #[test]
    fn test_initial_supply_over_cap_rejected() {
        let result = MintableToken::new(owner(), 1_000, 1_001, true);
        assert!(matches!(result, Err(TokenError::ConstructionInvalid(_))));
    }

    #[test]
    fn test_mint_by_agent() {
        let mut token = create_test_token();
        let holder = Address::new([9u8; 20]);

        let balance = token.mint(&agent(), holder, 1_000).unwrap();
        assert_eq!(balance, 1_000);
        assert_eq!(token.balance_of(&holder), 1_000);
        assert_eq!(token.total_supply(), 1_000);
        token.check_invariant().unwrap();
    }

    #[test]
    fn test_mint_by_non_agent_rejected() {
        let mut token = create_test_token();
        let stranger = Address::new([7u8; 20]);

        let result = token.mint(&stranger, stranger, 1_000);
        assert!(matches!(result, Err(TokenError::NotMintingAgent(_))));
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_unflagged_agent_loses_minting() {
        let mut token = create_test_token();
        token.update_minting_agent(&owner(), agent(), false).unwrap();
        assert!(!token.is_minting_agent(&agent()));
        assert!(token.mint(&agent(), agent(), 1).is_err());
    }

    #[test]
    fn test_only_owner_updates_agents() {
        let mut token = create_test_token();
        let result = token.update_minting_agent(&agent(), agent(), true);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
    }

    #[test]
    fn test_mint_cap_leaves_state_untouched() {
        let mut token = MintableToken::new(owner(), 1_000, 0, true).unwrap();
        token.update_minting_agent(&owner(), agent(), true).unwrap();
        let holder = Address::new([9u8; 20]);

        token.mint(&agent(), holder, 900).unwrap();
        let result = token.mint(&agent(), holder, 101);
        assert!(matches!(
            result,
            Err(TokenError::SupplyCapExceeded { max: 1_000, would_have: 1_001 })
        ));
        assert_eq!(token.balance_of(&holder), 900);
        assert_eq!(token.total_supply(), 900);
    }

    #[test]
    fn test_uncapped_ledger() {
        let mut token = MintableToken::new(owner(), 0, 0, true).unwrap();
        token.update_minting_agent(&owner(), agent(), true).unwrap();
        assert_eq!(token.mintable_supply(), None);
        token.mint(&agent(), agent(), u128::MAX / 2).unwrap();
    }

    #[test]
    fn test_mint_zero_rejected() {
        let mut token = create_test_token();
        assert_eq!(token.mint(&agent(), agent(), 0), Err(TokenError::ZeroAmount));
    }

    #[test]
    fn test_json_keys_are_hex_addresses() {
        let mut token = create_test_token();
        let holder = Address::new([9u8; 20]);
        token.mint(&agent(), holder, 42).unwrap();

        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains(&format!("\"{}\":42", holder)));
        let restored: MintableToken = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn test_disable_minting() {
        let mut token = create_test_token();
        assert!(token.disable_minting(&agent()).is_err());
        token.disable_minting(&owner()).unwrap();
        assert_eq!(token.mintable_supply(), Some(0));
        assert_eq!(token.mint(&agent(), agent(), 1), Err(TokenError::MintingDisabled));
    }
}
