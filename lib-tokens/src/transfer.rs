//! Token Transfer Execution
//!
//! `apply_token_transfer` moves balance between holders of a
//! [`MintableToken`] without touching supply.

use tracing::debug;

use lib_types::{Address, Amount};

use crate::contract::MintableToken;
use crate::errors::{TokenError, TokenResult};

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Amount moved
    pub amount: Amount,
    /// Sender balance after the move
    pub from_balance: Amount,
    /// Recipient balance after the move
    pub to_balance: Amount,
}

impl MintableToken {
    /// ERC20-style `transfer` from `caller` to `to`
    pub fn transfer(&mut self, caller: &Address, to: Address, amount: Amount) -> TokenResult<TransferResult> {
        apply_token_transfer(self, *caller, to, amount)
    }
}

/// Apply a holder-to-holder transfer
///
/// # Enforcement
///
/// - amount > 0
/// - sender balance covers the amount
/// - supply is conserved (self-transfers are a no-op on balances)
///
/// Both balances are computed before either is written.
pub fn apply_token_transfer(
    token: &mut MintableToken,
    from: Address,
    to: Address,
    amount: Amount,
) -> TokenResult<TransferResult> {
    if amount == 0 {
        return Err(TokenError::ZeroAmount);
    }

    let from_balance = token.balance_of(&from);
    if from_balance < amount {
        return Err(TokenError::InsufficientBalance {
            have: from_balance,
            need: amount,
        });
    }

    if from == to {
        return Ok(TransferResult {
            amount,
            from_balance,
            to_balance: from_balance,
        });
    }

    let new_from_balance = from_balance
        .checked_sub(amount)
        .ok_or(TokenError::Underflow)?;
    let new_to_balance = token
        .balance_of(&to)
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;

    token.balances.insert(from, new_from_balance);
    token.balances.insert(to, new_to_balance);

    debug!("Transferred {} from {} to {}", amount, from, to);

    Ok(TransferResult {
        amount,
        from_balance: new_from_balance,
        to_balance: new_to_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_token(holder: Address, amount: Amount) -> MintableToken {
        let owner = Address::new([1u8; 20]);
        let mut token = MintableToken::new(owner, 0, 0, true).unwrap();
        token.update_minting_agent(&owner, owner, true).unwrap();
        token.mint(&owner, holder, amount).unwrap();
        token
    }

    #[test]
    fn test_basic_transfer() {
        let from = Address::new([2u8; 20]);
        let to = Address::new([3u8; 20]);
        let mut token = funded_token(from, 10_000);

        let result = apply_token_transfer(&mut token, from, to, 1_000).unwrap();
        assert_eq!(result.from_balance, 9_000);
        assert_eq!(result.to_balance, 1_000);
        assert_eq!(token.total_supply(), 10_000);
        token.check_invariant().unwrap();
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let from = Address::new([2u8; 20]);
        let to = Address::new([3u8; 20]);
        let mut token = funded_token(from, 500);

        let result = apply_token_transfer(&mut token, from, to, 1_000);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { have: 500, need: 1_000 })));
        assert_eq!(token.balance_of(&from), 500);
        assert_eq!(token.balance_of(&to), 0);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let holder = Address::new([2u8; 20]);
        let mut token = funded_token(holder, 500);

        apply_token_transfer(&mut token, holder, holder, 200).unwrap();
        assert_eq!(token.balance_of(&holder), 500);
        token.check_invariant().unwrap();
    }

    #[test]
    fn test_transfer_method() {
        let from = Address::new([2u8; 20]);
        let to = Address::new([3u8; 20]);
        let mut token = funded_token(from, 300);

        let result = token.transfer(&from, to, 300).unwrap();
        assert_eq!(result.from_balance, 0);
        assert_eq!(token.balance_of(&to), 300);
    }

    #[test]
    fn test_transfer_zero_amount() {
        let holder = Address::new([2u8; 20]);
        let mut token = funded_token(holder, 500);
        let result = apply_token_transfer(&mut token, holder, Address::zero(), 0);
        assert_eq!(result, Err(TokenError::ZeroAmount));
    }
}
