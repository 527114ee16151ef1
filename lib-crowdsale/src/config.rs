//! Deployment configuration
//!
//! Describes one full sale deployment: ledger, forwarder, optional pricing,
//! sale record and referral program. Every section is optional; missing
//! sections fall back to the reference fixture:
//!
//! ```toml
//! [token]
//! max_supply = 100000        # whole tokens
//!
//! [forwarder]
//! proportion_absolute_max = 100
//! recipients = ["0x00000000000000000000000000000000000000ee"]
//! proportions = [100]
//!
//! [crowdsale]
//! start_date = 0
//! end_date = 1
//! signers = ["0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"]
//!
//! [referral]
//! total_supply = 1000        # whole tokens, 0 = unlimited
//! sent_once = false
//! ```
//!
//! Token amounts (`max_supply`, `minted_supply`, `total_supply`,
//! `max_tokens`) and `min_invest_ether` are whole units and are scaled by
//! `PRECISION` on deploy. `token_in_wei` is raw wei.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use lib_types::{Address, Amount, Timestamp, PRECISION};

use crate::abi::ContractCall;
use crate::errors::{CrowdsaleError, CrowdsaleResult};
use crate::pricing::Tier;
use crate::state::ChainState;

/// Recipient of forwarded contributions in the reference fixture
pub const DEFAULT_ETHER_HOLDER: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xee,
]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    #[serde(default)]
    pub crowdsale: CrowdsaleConfig,
    /// Without pricing the sale accepts no contributions
    #[serde(default)]
    pub pricing: Option<PricingConfig>,
    #[serde(default)]
    pub referral: ReferralConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Whole tokens, 0 = uncapped
    #[serde(default = "default_max_supply")]
    pub max_supply: u64,
    #[serde(default)]
    pub minted_supply: u64,
    #[serde(default = "default_true")]
    pub minting_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    #[serde(default = "default_proportion_max")]
    pub proportion_absolute_max: u64,
    #[serde(default = "default_recipients")]
    pub recipients: Vec<Address>,
    #[serde(default = "default_proportions")]
    pub proportions: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrowdsaleConfig {
    #[serde(default)]
    pub start_date: Timestamp,
    #[serde(default = "default_end_date")]
    pub end_date: Timestamp,
    #[serde(default = "default_true")]
    pub allow_whitelisted: bool,
    #[serde(default = "default_true")]
    pub allow_signed: bool,
    #[serde(default = "default_true")]
    pub allow_anonymous: bool,
    #[serde(default)]
    pub signers: Vec<Address>,
    #[serde(default)]
    pub whitelist: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PricingConfig {
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Wei per whole token
    pub token_in_wei: u64,
    /// Whole tokens, 0 = unlimited
    #[serde(default)]
    pub max_tokens: u64,
    #[serde(default)]
    pub bonus_percents: u64,
    #[serde(default)]
    pub min_invest_ether: u64,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Whole tokens, 0 = unlimited
    #[serde(default = "default_referral_supply")]
    pub total_supply: u64,
    #[serde(default)]
    pub sent_once: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_supply() -> u64 {
    100_000
}

fn default_proportion_max() -> u64 {
    100
}

fn default_recipients() -> Vec<Address> {
    vec![DEFAULT_ETHER_HOLDER]
}

fn default_proportions() -> Vec<u64> {
    vec![100]
}

fn default_end_date() -> Timestamp {
    1
}

fn default_referral_supply() -> u64 {
    1_000
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_supply: default_max_supply(),
            minted_supply: 0,
            minting_allowed: true,
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            proportion_absolute_max: default_proportion_max(),
            recipients: default_recipients(),
            proportions: default_proportions(),
        }
    }
}

impl Default for CrowdsaleConfig {
    fn default() -> Self {
        Self {
            start_date: 0,
            end_date: default_end_date(),
            allow_whitelisted: true,
            allow_signed: true,
            allow_anonymous: true,
            signers: Vec::new(),
            whitelist: Vec::new(),
        }
    }
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            total_supply: default_referral_supply(),
            sent_once: false,
        }
    }
}

fn scale(whole: u64) -> CrowdsaleResult<Amount> {
    Amount::from(whole)
        .checked_mul(PRECISION)
        .ok_or(CrowdsaleError::Overflow)
}

impl TierConfig {
    fn to_tier(&self) -> CrowdsaleResult<Tier> {
        Ok(Tier {
            token_in_wei: Amount::from(self.token_in_wei),
            max_tokens_collected: scale(self.max_tokens)?,
            sold_tokens: 0,
            bonus_percents: Amount::from(self.bonus_percents),
            min_invest: scale(self.min_invest_ether)?,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

impl DeploymentConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> CrowdsaleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CrowdsaleError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> CrowdsaleResult<Self> {
        toml::from_str(text).map_err(|e| CrowdsaleError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> CrowdsaleResult<String> {
        toml::to_string(self).map_err(|e| CrowdsaleError::Config(e.to_string()))
    }
}

// =============================================================================
// DEPLOYMENT
// =============================================================================

/// Addresses of a deployed contract set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub token: Address,
    pub allocator: Address,
    pub forwarder: Address,
    pub pricing: Option<Address>,
    pub crowdsale: Address,
    pub referral: Address,
}

/// Deploy and wire every contract described by `config`
///
/// Wiring, all sent as `deployer`:
/// - ledger: allocator and referral flagged as minting agents
/// - allocator: referral allow-listed, plus the sale when it has pricing
/// - sale: configured signers and whitelist registered
pub fn deploy(
    state: &mut ChainState,
    deployer: Address,
    config: &DeploymentConfig,
) -> CrowdsaleResult<Deployment> {
    let token = state.deploy_token(
        deployer,
        scale(config.token.max_supply)?,
        scale(config.token.minted_supply)?,
        config.token.minting_allowed,
    )?;
    let allocator = state.deploy_allocator(deployer, token);
    let forwarder = state.deploy_forwarder(
        deployer,
        Amount::from(config.forwarder.proportion_absolute_max),
        config.forwarder.recipients.clone(),
        config.forwarder.proportions.iter().copied().map(Amount::from).collect(),
    )?;

    let pricing = match &config.pricing {
        Some(pricing) => {
            let tiers = pricing
                .tiers
                .iter()
                .map(TierConfig::to_tier)
                .collect::<CrowdsaleResult<Vec<_>>>()?;
            Some(state.deploy_pricing(deployer, tiers)?)
        }
        None => None,
    };

    let sale = &config.crowdsale;
    let crowdsale = state.deploy_crowdsale(
        deployer,
        allocator,
        forwarder,
        pricing,
        sale.start_date,
        sale.end_date,
        sale.allow_whitelisted,
        sale.allow_signed,
        sale.allow_anonymous,
    );
    let referral = state.deploy_referral(
        deployer,
        scale(config.referral.total_supply)?,
        allocator,
        crowdsale,
        config.referral.sent_once,
    );

    let mut wiring = vec![
        (token, ContractCall::UpdateMintingAgent { agent: referral, status: true }),
        (token, ContractCall::UpdateMintingAgent { agent: allocator, status: true }),
        (allocator, ContractCall::AddCrowdsales(referral)),
    ];
    if pricing.is_some() {
        wiring.push((allocator, ContractCall::AddCrowdsales(crowdsale)));
    }
    wiring.extend(sale.signers.iter().map(|s| (crowdsale, ContractCall::AddSigner(*s))));
    wiring.extend(sale.whitelist.iter().map(|a| {
        (
            crowdsale,
            ContractCall::UpdateWhitelist {
                address: *a,
                status: true,
            },
        )
    }));

    for (target, call) in wiring {
        state.call(deployer, target, call).ensure_success()?;
    }

    info!(
        "Deployment wired: token {}, crowdsale {}, referral {}",
        token, crowdsale, referral
    );
    Ok(Deployment {
        token,
        allocator,
        forwarder,
        pricing,
        crowdsale,
        referral,
    })
}
