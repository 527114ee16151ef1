//! Contribution flow: sale modes, tiered pricing and weighted forwarding

use lib_crowdsale::config::{PricingConfig, TierConfig};
use lib_crowdsale::{
    deploy, ChainState, ContractCall, ContributionMode, CrowdsaleError, Deployment,
    DeploymentConfig, Event, Transaction,
};
use lib_crypto::KeyPair;
use lib_types::{Address, PRECISION};

fn owner() -> Address {
    Address::new([0xa0; 20])
}

fn account(n: u8) -> Address {
    Address::new([n; 20])
}

fn team() -> Address {
    account(0x70)
}

fn treasury() -> Address {
    account(0x30)
}

/// Open sale at t=0..=100, one 30% bonus tier at 0.001 ether per token
fn sale_config() -> DeploymentConfig {
    let mut config = DeploymentConfig::default();
    config.token.max_supply = 10_000_000;
    config.forwarder.recipients = vec![team(), treasury()];
    config.forwarder.proportions = vec![70, 30];
    config.crowdsale.end_date = 100;
    config.pricing = Some(PricingConfig {
        tiers: vec![TierConfig {
            token_in_wei: 1_000_000_000_000_000,
            max_tokens: 2_000_000,
            bonus_percents: 30,
            min_invest_ether: 1,
            start_date: 0,
            end_date: 100,
        }],
    });
    config
}

fn setup(config: DeploymentConfig) -> (ChainState, Deployment) {
    let mut state = ChainState::new(10);
    let deployment = deploy(&mut state, owner(), &config).unwrap();
    for n in 1..=4 {
        state.fund(account(n), 1_000 * PRECISION).unwrap();
    }
    (state, deployment)
}

#[test]
fn test_anonymous_contribution() {
    let (mut state, deployment) = setup(sale_config());
    let contributor = account(1);

    let receipt = state
        .contribute(contributor, deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();

    let tokens = 13_000 * PRECISION;
    assert_eq!(state.balance_of(&deployment.token, &contributor).unwrap(), tokens);
    assert_eq!(state.ether_balance(&contributor), 990 * PRECISION);
    assert_eq!(state.ether_balance(&team()), 7 * PRECISION);
    assert_eq!(state.ether_balance(&treasury()), 3 * PRECISION);

    assert_eq!(state.crowdsale(&deployment.crowdsale).unwrap().tokens_sold, tokens);
    let pricing = deployment.pricing.unwrap();
    assert_eq!(state.pricing(&pricing).unwrap().tiers[0].sold_tokens, tokens);
    assert_eq!(
        state.forwarder(&deployment.forwarder).unwrap().total_forwarded,
        10 * PRECISION
    );

    assert!(receipt.events.contains(&Event::Contributed {
        crowdsale: deployment.crowdsale,
        contributor,
        wei: 10 * PRECISION,
        tokens,
        bonus: 3_000 * PRECISION,
        mode: ContributionMode::Anonymous,
    }));
    assert!(receipt.events.contains(&Event::Forwarded {
        forwarder: deployment.forwarder,
        recipient: team(),
        amount: 7 * PRECISION,
    }));
    state.token(&deployment.token).unwrap().check_invariant().unwrap();
}

#[test]
fn test_empty_calldata_contributes() {
    let (mut state, deployment) = setup(sale_config());
    state
        .send_transaction(Transaction {
            from: account(2),
            to: deployment.crowdsale,
            value: 2 * PRECISION,
            data: Vec::new(),
        })
        .ensure_success()
        .unwrap();
    assert_eq!(
        state.balance_of(&deployment.token, &account(2)).unwrap(),
        2_600 * PRECISION
    );
}

#[test]
fn test_contribution_outside_window() {
    let (mut state, deployment) = setup(sale_config());
    state.set_time(101);

    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert_eq!(receipt.error, Some(CrowdsaleError::SaleNotActive(101)));
    assert_eq!(state.ether_balance(&account(1)), 1_000 * PRECISION);
}

#[test]
fn test_below_min_invest_rejected() {
    let (mut state, deployment) = setup(sale_config());
    let receipt = state.contribute(account(1), deployment.crowdsale, PRECISION / 2);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));
    assert_eq!(state.ether_balance(&account(1)), 1_000 * PRECISION);
    assert_eq!(state.ether_balance(&team()), 0);
}

#[test]
fn test_contribution_needs_funds() {
    let (mut state, deployment) = setup(sale_config());
    let broke = account(9);
    let receipt = state.contribute(broke, deployment.crowdsale, 5 * PRECISION);
    assert_eq!(
        receipt.error,
        Some(CrowdsaleError::InsufficientFunds {
            have: 0,
            need: 5 * PRECISION,
        })
    );
    assert_eq!(state.balance_of(&deployment.token, &broke).unwrap(), 0);
}

#[test]
fn test_zero_value_contribution_rejected() {
    let (mut state, deployment) = setup(sale_config());
    let receipt = state.contribute(account(1), deployment.crowdsale, 0);
    assert_eq!(receipt.error, Some(CrowdsaleError::ZeroAmount));
}

#[test]
fn test_tier_allowance_limits_purchase() {
    let (mut state, deployment) = setup(sale_config());
    state.fund(account(1), 10_000 * PRECISION).unwrap();

    // 1600 ether buys 2.08M tokens with bonus, over the 2M tier allowance
    let receipt = state.contribute(account(1), deployment.crowdsale, 1_600 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));

    state
        .contribute(account(1), deployment.crowdsale, 1_500 * PRECISION)
        .ensure_success()
        .unwrap();
    assert_eq!(
        state.balance_of(&deployment.token, &account(1)).unwrap(),
        1_950_000 * PRECISION
    );
}

#[test]
fn test_ledger_cap_limits_purchase() {
    let mut config = sale_config();
    config.token.max_supply = 1_000;
    let (mut state, deployment) = setup(config);

    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));
}

#[test]
fn test_whitelisted_only_sale() {
    let mut config = sale_config();
    config.crowdsale.allow_anonymous = false;
    config.crowdsale.allow_signed = false;
    config.crowdsale.whitelist = vec![account(1)];
    let (mut state, deployment) = setup(config);

    let receipt = state.contribute(account(2), deployment.crowdsale, 10 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));

    let receipt = state
        .contribute(account(1), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();
    assert!(receipt.events.iter().any(|e| matches!(
        e,
        Event::Contributed {
            mode: ContributionMode::Whitelisted,
            ..
        }
    )));

    state
        .call(
            owner(),
            deployment.crowdsale,
            ContractCall::UpdateWhitelist {
                address: account(2),
                status: true,
            },
        )
        .ensure_success()
        .unwrap();
    state
        .contribute(account(2), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();
}

#[test]
fn test_signed_contribution() {
    let signer = KeyPair::from_seed(b"sale-signer").unwrap();
    let mut config = sale_config();
    config.crowdsale.allow_anonymous = false;
    config.crowdsale.allow_whitelisted = false;
    config.crowdsale.signers = vec![signer.address()];
    let (mut state, deployment) = setup(config);
    let contributor = account(3);

    let receipt = state.contribute(contributor, deployment.crowdsale, 10 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));

    let signature = signer
        .sign_contribution(&deployment.crowdsale, &contributor, 10 * PRECISION)
        .unwrap();

    // Voucher does not cover a different amount
    let receipt = state.contribute_signed(contributor, deployment.crowdsale, 20 * PRECISION, signature);
    assert!(matches!(receipt.error, Some(CrowdsaleError::InvalidSignature(_))));

    let receipt = state
        .contribute_signed(contributor, deployment.crowdsale, 10 * PRECISION, signature)
        .ensure_success()
        .unwrap();
    assert!(receipt.events.iter().any(|e| matches!(
        e,
        Event::Contributed {
            mode: ContributionMode::Signed { .. },
            ..
        }
    )));
    assert_eq!(
        state.balance_of(&deployment.token, &contributor).unwrap(),
        13_000 * PRECISION
    );
}

#[test]
fn test_mint_voucher_does_not_authorize_contribution() {
    let signer = KeyPair::from_seed(b"sale-signer").unwrap();
    let mut config = sale_config();
    config.crowdsale.allow_anonymous = false;
    config.crowdsale.allow_whitelisted = false;
    config.crowdsale.signers = vec![signer.address()];
    let (mut state, deployment) = setup(config);
    let contributor = account(3);

    let voucher = signer.sign_mint_request(&contributor, 10 * PRECISION).unwrap();
    let receipt = state.contribute_signed(contributor, deployment.crowdsale, 10 * PRECISION, voucher);
    assert!(matches!(receipt.error, Some(CrowdsaleError::InvalidSignature(_))));
    assert_eq!(state.ether_balance(&contributor), 1_000 * PRECISION);
    assert_eq!(state.balance_of(&deployment.token, &contributor).unwrap(), 0);
}

#[test]
fn test_sale_without_pricing_rejects_contributions() {
    let (mut state, deployment) = setup(DeploymentConfig::default());
    state.set_time(0);
    let receipt = state.contribute(account(1), deployment.crowdsale, PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));
}

#[test]
fn test_disabled_minting_reverts_contribution() {
    let (mut state, deployment) = setup(sale_config());
    state
        .call(owner(), deployment.token, ContractCall::DisableMinting)
        .ensure_success()
        .unwrap();

    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert!(receipt.error.is_some());
    assert_eq!(state.ether_balance(&account(1)), 1_000 * PRECISION);
    assert_eq!(state.ether_balance(&team()), 0);
    assert_eq!(state.crowdsale(&deployment.crowdsale).unwrap().tokens_sold, 0);
}

#[test]
fn test_owner_reschedules_sale_and_tier() {
    let (mut state, deployment) = setup(sale_config());
    let pricing = deployment.pricing.unwrap();
    let reschedule = ContractCall::UpdateDates {
        start_date: 0,
        end_date: 200,
    };

    let receipt = state.call(account(1), deployment.crowdsale, reschedule.clone());
    assert!(receipt.error.unwrap().is_unauthorized());
    state
        .call(owner(), deployment.crowdsale, reschedule)
        .ensure_success()
        .unwrap();
    state.set_time(150);

    // Sale is open again but its only tier closed at 100
    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::ContributionRejected(_))));

    let reschedule_tier = ContractCall::UpdateTierDates {
        tier_index: 0,
        start_date: 0,
        end_date: 200,
    };
    let receipt = state.call(account(1), pricing, reschedule_tier.clone());
    assert!(receipt.error.unwrap().is_unauthorized());
    state
        .send_transaction(Transaction {
            from: owner(),
            to: pricing,
            value: 0,
            data: reschedule_tier.encode(),
        })
        .ensure_success()
        .unwrap();

    state
        .contribute(account(1), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();
    assert_eq!(state.pricing(&pricing).unwrap().tiers[0].end_date, 200);
}

#[test]
fn test_owner_redirects_forwarder_and_pricing() {
    let (mut state, deployment) = setup(sale_config());
    let vault = account(0x40);
    let forwarder = state
        .deploy_forwarder(owner(), 100, vec![vault], vec![100])
        .unwrap();

    let receipt = state.call(
        account(1),
        deployment.crowdsale,
        ContractCall::SetContributionForwarder(forwarder),
    );
    assert!(receipt.error.unwrap().is_unauthorized());
    state
        .call(owner(), deployment.crowdsale, ContractCall::SetContributionForwarder(forwarder))
        .ensure_success()
        .unwrap();

    state
        .contribute(account(1), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();
    assert_eq!(state.ether_balance(&vault), 10 * PRECISION);
    assert_eq!(state.ether_balance(&team()), 0);

    // Pointing the sale at a non-pricing contract makes quoting fail
    state
        .call(owner(), deployment.crowdsale, ContractCall::SetPricingStrategy(forwarder))
        .ensure_success()
        .unwrap();
    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert!(matches!(receipt.error, Some(CrowdsaleError::WrongContractKind { .. })));
    assert_eq!(
        state.crowdsale(&deployment.crowdsale).unwrap().pricing_strategy,
        Some(forwarder)
    );
}

#[test]
fn test_allocator_token_switch() {
    let (mut state, deployment) = setup(sale_config());
    let other_token = state.deploy_token(owner(), 0, 0, true).unwrap();

    let receipt = state.call(account(1), deployment.allocator, ContractCall::SetToken(other_token));
    assert!(receipt.error.unwrap().is_unauthorized());
    state
        .call(owner(), deployment.allocator, ContractCall::SetToken(other_token))
        .ensure_success()
        .unwrap();
    assert_eq!(state.allocator(&deployment.allocator).unwrap().token, other_token);

    // The allocator is not a minting agent on the new ledger yet
    let receipt = state.contribute(account(1), deployment.crowdsale, 10 * PRECISION);
    assert!(receipt.error.unwrap().is_unauthorized());

    state
        .call(
            owner(),
            other_token,
            ContractCall::UpdateMintingAgent {
                agent: deployment.allocator,
                status: true,
            },
        )
        .ensure_success()
        .unwrap();
    state
        .contribute(account(1), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();
    assert_eq!(state.balance_of(&other_token, &account(1)).unwrap(), 13_000 * PRECISION);
    assert_eq!(state.balance_of(&deployment.token, &account(1)).unwrap(), 0);
}

#[test]
fn test_snapshot_reflects_contribution() {
    let (mut state, deployment) = setup(sale_config());
    state
        .contribute(account(1), deployment.crowdsale, 10 * PRECISION)
        .ensure_success()
        .unwrap();

    let json = state.snapshot_json().unwrap();
    let restored: ChainState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
}
