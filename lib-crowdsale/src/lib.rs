//! Crowdsale Simulation Engine
//!
//! Deterministic off-chain model of a token sale: a capped mintable ledger,
//! an allocator gating who may mint, a sale record with a signer registry,
//! tiered pricing, a weighted contribution forwarder and a referral program
//! paying out signer-authorized vouchers.
//!
//! # Key Types
//!
//! - [`ChainState`]: deployed contracts plus native balances; every
//!   transaction is all-or-nothing
//! - [`ContractCall`]: calldata codec for the exposed contract functions
//! - [`DeploymentConfig`] / [`deploy`]: one-shot deployment and wiring
//!
//! # Example
//!
//! ```ignore
//! let mut state = ChainState::new(0);
//! let deployment = deploy(&mut state, owner, &DeploymentConfig::default())?;
//! let signature = signer.sign_mint_request(&recipient, amount)?;
//! state
//!     .mint_referral(recipient, deployment.referral, recipient, amount, signature)
//!     .ensure_success()?;
//! ```

pub mod abi;
pub mod allocator;
pub mod config;
pub mod errors;
pub mod forwarder;
pub mod pricing;
pub mod referral;
pub mod sale;
pub mod state;

pub use abi::{selector, ContractCall};
pub use allocator::MintableTokenAllocator;
pub use config::{deploy, Deployment, DeploymentConfig};
pub use errors::{CrowdsaleError, CrowdsaleResult};
pub use forwarder::DistributedDirectContributionForwarder;
pub use pricing::{Tier, TieredPricingStrategy, TokenQuote};
pub use referral::ReferralProgram;
pub use sale::{ContributionMode, Crowdsale};
pub use state::{ChainState, Contract, Event, Receipt, Transaction, TxStatus};
