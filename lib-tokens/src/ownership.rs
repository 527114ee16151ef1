//! Two-step ownership
//!
//! Every simulated contract carries an owner and a pending-owner slot.
//! A transfer only takes effect once the pending owner accepts it.

use serde::{Deserialize, Serialize};
use tracing::info;

use lib_types::Address;

use crate::errors::{TokenError, TokenResult};

/// Owner and pending owner of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owner: Address,
    /// Pending transfer target; zero when no transfer is in flight
    new_owner: Address,
}

impl Ownership {
    /// Create ownership held by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            new_owner: Address::zero(),
        }
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Pending owner (zero if none)
    pub fn new_owner(&self) -> Address {
        self.new_owner
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        &self.owner == caller
    }

    /// Fail with `Unauthorized` unless `caller` is the owner
    pub fn ensure_owner(&self, caller: &Address) -> TokenResult<()> {
        if !self.is_owner(caller) {
            return Err(TokenError::Unauthorized(format!("{} is not the owner", caller)));
        }
        Ok(())
    }

    /// Nominate `new_owner`; the owner stays in control until acceptance
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        self.new_owner = new_owner;
        Ok(())
    }

    /// Complete a pending transfer; only the nominated address may call
    pub fn accept_ownership(&mut self, caller: &Address) -> TokenResult<Address> {
        if self.new_owner.is_zero() || &self.new_owner != caller {
            return Err(TokenError::Unauthorized(format!(
                "{} is not the pending owner",
                caller
            )));
        }
        let previous = self.owner;
        self.owner = self.new_owner;
        self.new_owner = Address::zero();
        info!("Ownership transferred from {} to {}", previous, self.owner);
        Ok(previous)
    }
}
