//! Mintable Token Ledger
//!
//! Authoritative balance and supply bookkeeping for the simulated sale.
//!
//! # Key Types
//!
//! - [`MintableToken`]: balances, total supply and the minting-agent set
//! - [`Ownership`]: owner plus pending-owner slot shared by every contract
//!
//! # Execution
//!
//! Minting goes through [`MintableToken::mint`], which only accepts callers
//! flagged with [`MintableToken::update_minting_agent`]. Holder-to-holder
//! moves go through [`apply_token_transfer`].

pub mod contract;
pub mod errors;
pub mod ownership;
pub mod transfer;

pub use contract::*;
pub use errors::*;
pub use ownership::Ownership;
pub use transfer::apply_token_transfer;
