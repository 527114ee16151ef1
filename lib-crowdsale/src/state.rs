//! Chain State and Transaction Execution
//!
//! [`ChainState`] owns every deployed contract, native (wei) balances and
//! block time. Each transaction runs against a staged copy of the state and
//! is committed only if every step succeeds; a failing transaction leaves
//! no trace besides its receipt.
//!
//! # Execution order
//!
//! `multivestMint`:
//! 1. recover the signer of `keccak256(recipient ‖ amount)`
//! 2. signer must be registered on the referral's crowdsale
//! 3. referral bookkeeping (`sent_once`, cap)
//! 4. allocator allow-list check, then ledger mint
//!
//! Contributions:
//! 1. sale window and contribution mode
//! 2. pricing quote (must be non-zero)
//! 3. debit contributor, forward wei to recipients
//! 4. count tokens sold, mint through the allocator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use lib_crypto::{
    contribution_request_hash, keccak256, keccak256_multiple, mint_request_hash, recover_signer,
    RecoverableSignature,
};
use lib_tokens::{apply_token_transfer, MintableToken, Ownership};
use lib_types::{Address, Amount, Timestamp, TxHash};

use crate::abi::ContractCall;
use crate::allocator::MintableTokenAllocator;
use crate::errors::{CrowdsaleError, CrowdsaleResult};
use crate::forwarder::DistributedDirectContributionForwarder;
use crate::pricing::{Tier, TieredPricingStrategy};
use crate::referral::ReferralProgram;
use crate::sale::{ContributionMode, Crowdsale};

// =============================================================================
// CONTRACTS
// =============================================================================

/// A deployed contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contract {
    Token(MintableToken),
    Allocator(MintableTokenAllocator),
    Crowdsale(Crowdsale),
    Pricing(TieredPricingStrategy),
    Forwarder(DistributedDirectContributionForwarder),
    Referral(ReferralProgram),
}

impl Contract {
    pub fn kind(&self) -> &'static str {
        match self {
            Contract::Token(_) => "token",
            Contract::Allocator(_) => "allocator",
            Contract::Crowdsale(_) => "crowdsale",
            Contract::Pricing(_) => "pricing strategy",
            Contract::Forwarder(_) => "forwarder",
            Contract::Referral(_) => "referral",
        }
    }

    pub fn ownership(&self) -> &Ownership {
        match self {
            Contract::Token(c) => &c.ownership,
            Contract::Allocator(c) => &c.ownership,
            Contract::Crowdsale(c) => &c.ownership,
            Contract::Pricing(c) => &c.ownership,
            Contract::Forwarder(c) => &c.ownership,
            Contract::Referral(c) => &c.ownership,
        }
    }

    fn ownership_mut(&mut self) -> &mut Ownership {
        match self {
            Contract::Token(c) => &mut c.ownership,
            Contract::Allocator(c) => &mut c.ownership,
            Contract::Crowdsale(c) => &mut c.ownership,
            Contract::Pricing(c) => &mut c.ownership,
            Contract::Forwarder(c) => &mut c.ownership,
            Contract::Referral(c) => &mut c.ownership,
        }
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Raw transaction: sender, target contract, attached wei and calldata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub data: Vec<u8>,
}

/// State change recorded by a successful transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Minted {
        token: Address,
        holder: Address,
        amount: Amount,
    },
    Transferred {
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    ReferralClaimed {
        referral: Address,
        recipient: Address,
        amount: Amount,
        signer: Address,
    },
    Contributed {
        crowdsale: Address,
        contributor: Address,
        wei: Amount,
        tokens: Amount,
        bonus: Amount,
        mode: ContributionMode,
    },
    Forwarded {
        forwarder: Address,
        recipient: Address,
        amount: Amount,
    },
    OwnershipTransferred {
        contract: Address,
        previous: Address,
        new_owner: Address,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Success,
    Failed,
}

/// Outcome of one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    /// Empty when the transaction failed
    pub events: Vec<Event>,
    pub error: Option<CrowdsaleError>,
}

impl Receipt {
    fn success(tx_hash: TxHash, events: Vec<Event>) -> Self {
        Self {
            tx_hash,
            status: TxStatus::Success,
            events,
            error: None,
        }
    }

    fn failed(tx_hash: TxHash, error: CrowdsaleError) -> Self {
        Self {
            tx_hash,
            status: TxStatus::Failed,
            events: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Turn a failed receipt back into its error
    pub fn ensure_success(self) -> CrowdsaleResult<Self> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

// =============================================================================
// CHAIN STATE
// =============================================================================

macro_rules! contract_accessors {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty, $kind:literal) => {
        pub fn $get(&self, address: &Address) -> CrowdsaleResult<&$ty> {
            match self.contracts.get(address) {
                Some(Contract::$variant(contract)) => Ok(contract),
                Some(_) => Err(CrowdsaleError::WrongContractKind {
                    address: *address,
                    expected: $kind,
                }),
                None => Err(CrowdsaleError::ContractNotFound(*address)),
            }
        }

        fn $get_mut(&mut self, address: &Address) -> CrowdsaleResult<&mut $ty> {
            match self.contracts.get_mut(address) {
                Some(Contract::$variant(contract)) => Ok(contract),
                Some(_) => Err(CrowdsaleError::WrongContractKind {
                    address: *address,
                    expected: $kind,
                }),
                None => Err(CrowdsaleError::ContractNotFound(*address)),
            }
        }
    };
}

/// Simulated chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Block time used by sale windows and pricing tiers
    pub now: Timestamp,
    ether_balances: BTreeMap<Address, Amount>,
    contracts: BTreeMap<Address, Contract>,
    nonces: BTreeMap<Address, u64>,
    tx_count: u64,
}

impl ChainState {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn set_time(&mut self, now: Timestamp) {
        self.now = now;
    }

    /// Credit native wei to an account outside of any transaction
    pub fn fund(&mut self, account: Address, amount: Amount) -> CrowdsaleResult<()> {
        self.credit_ether(&account, amount)
    }

    pub fn ether_balance(&self, account: &Address) -> Amount {
        self.ether_balances.get(account).copied().unwrap_or(0)
    }

    /// Ledger balance of `holder` on `token`
    pub fn balance_of(&self, token: &Address, holder: &Address) -> CrowdsaleResult<Amount> {
        Ok(self.token(token)?.balance_of(holder))
    }

    pub fn contract(&self, address: &Address) -> Option<&Contract> {
        self.contracts.get(address)
    }

    pub fn contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.contracts.iter()
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    contract_accessors!(token, token_mut, Token, MintableToken, "token");
    contract_accessors!(allocator, allocator_mut, Allocator, MintableTokenAllocator, "allocator");
    contract_accessors!(crowdsale, crowdsale_mut, Crowdsale, Crowdsale, "crowdsale");
    contract_accessors!(pricing, pricing_mut, Pricing, TieredPricingStrategy, "pricing strategy");
    contract_accessors!(
        forwarder,
        forwarder_mut,
        Forwarder,
        DistributedDirectContributionForwarder,
        "forwarder"
    );
    contract_accessors!(referral, referral_mut, Referral, ReferralProgram, "referral");

    /// Pretty-printed JSON of the whole state
    pub fn snapshot_json(&self) -> CrowdsaleResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CrowdsaleError::Serialization(e.to_string()))
    }

    // =========================================================================
    // Deployment
    // =========================================================================

    /// Next contract address for `deployer`: keccak256(deployer ‖ nonce)[12..]
    fn next_contract_address(&mut self, deployer: &Address) -> Address {
        let nonce = self.nonces.entry(*deployer).or_insert(0);
        let hash = keccak256_multiple(&[deployer.as_bytes(), &nonce.to_be_bytes()]);
        *nonce += 1;
        Address::from_word(&hash)
    }

    fn install(&mut self, deployer: &Address, contract: Contract) -> Address {
        let address = self.next_contract_address(deployer);
        info!("Deployed {} at {} (owner {})", contract.kind(), address, deployer);
        self.contracts.insert(address, contract);
        address
    }

    pub fn deploy_token(
        &mut self,
        deployer: Address,
        max_supply: Amount,
        minted_supply: Amount,
        minting_allowed: bool,
    ) -> CrowdsaleResult<Address> {
        let token = MintableToken::new(deployer, max_supply, minted_supply, minting_allowed)?;
        Ok(self.install(&deployer, Contract::Token(token)))
    }

    pub fn deploy_allocator(&mut self, deployer: Address, token: Address) -> Address {
        let allocator = MintableTokenAllocator::new(deployer, token);
        self.install(&deployer, Contract::Allocator(allocator))
    }

    pub fn deploy_forwarder(
        &mut self,
        deployer: Address,
        proportion_absolute_max: Amount,
        recipients: Vec<Address>,
        proportions: Vec<Amount>,
    ) -> CrowdsaleResult<Address> {
        let forwarder = DistributedDirectContributionForwarder::new(
            deployer,
            proportion_absolute_max,
            recipients,
            proportions,
        )?;
        Ok(self.install(&deployer, Contract::Forwarder(forwarder)))
    }

    pub fn deploy_pricing(&mut self, deployer: Address, tiers: Vec<Tier>) -> CrowdsaleResult<Address> {
        let pricing = TieredPricingStrategy::new(deployer, tiers)?;
        Ok(self.install(&deployer, Contract::Pricing(pricing)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn deploy_crowdsale(
        &mut self,
        deployer: Address,
        allocator: Address,
        contribution_forwarder: Address,
        pricing_strategy: Option<Address>,
        start_date: Timestamp,
        end_date: Timestamp,
        allow_whitelisted: bool,
        allow_signed: bool,
        allow_anonymous: bool,
    ) -> Address {
        let sale = Crowdsale::new(
            deployer,
            allocator,
            contribution_forwarder,
            pricing_strategy,
            start_date,
            end_date,
            allow_whitelisted,
            allow_signed,
            allow_anonymous,
        );
        self.install(&deployer, Contract::Crowdsale(sale))
    }

    pub fn deploy_referral(
        &mut self,
        deployer: Address,
        total_supply: Amount,
        allocator: Address,
        crowdsale: Address,
        sent_once: bool,
    ) -> Address {
        let referral = ReferralProgram::new(deployer, total_supply, allocator, crowdsale, sent_once);
        self.install(&deployer, Contract::Referral(referral))
    }

    // =========================================================================
    // Transaction entry points
    // =========================================================================

    /// Decode and execute raw calldata
    pub fn send_transaction(&mut self, tx: Transaction) -> Receipt {
        match ContractCall::decode(&tx.data) {
            Ok(call) => self.execute(tx.from, tx.to, tx.value, call),
            Err(error) => {
                let tx_hash = self.next_tx_hash(&tx.from, &tx.to, tx.value, &tx.data);
                warn!("Transaction {} rejected: {}", tx_hash, error);
                Receipt::failed(tx_hash, error)
            }
        }
    }

    /// Execute a decoded call atomically
    pub fn execute(&mut self, from: Address, to: Address, value: Amount, call: ContractCall) -> Receipt {
        let tx_hash = self.next_tx_hash(&from, &to, value, &call.encode());
        let mut staged = self.clone();
        let mut events = Vec::new();

        match staged.dispatch(from, to, value, &call, &mut events) {
            Ok(()) => {
                *self = staged;
                debug!("Transaction {} committed: {}", tx_hash, call);
                Receipt::success(tx_hash, events)
            }
            Err(error) => {
                warn!("Transaction {} reverted ({}): {}", tx_hash, call, error);
                Receipt::failed(tx_hash, error)
            }
        }
    }

    /// Submit a referral minting voucher
    pub fn mint_referral(
        &mut self,
        from: Address,
        referral: Address,
        recipient: Address,
        amount: Amount,
        signature: RecoverableSignature,
    ) -> Receipt {
        let call = ContractCall::MultivestMint {
            recipient,
            amount,
            signature,
        };
        self.execute(from, referral, 0, call)
    }

    /// Unsigned (anonymous or whitelisted) contribution
    pub fn contribute(&mut self, from: Address, crowdsale: Address, value: Amount) -> Receipt {
        self.execute(from, crowdsale, value, ContractCall::Contribute)
    }

    /// Contribution authorized by a signer over `(crowdsale, from, value)`
    pub fn contribute_signed(
        &mut self,
        from: Address,
        crowdsale: Address,
        value: Amount,
        signature: RecoverableSignature,
    ) -> Receipt {
        self.execute(from, crowdsale, value, ContractCall::ContributeSigned(signature))
    }

    /// Non-payable administrative call
    pub fn call(&mut self, from: Address, to: Address, call: ContractCall) -> Receipt {
        self.execute(from, to, 0, call)
    }

    fn next_tx_hash(&mut self, from: &Address, to: &Address, value: Amount, data: &[u8]) -> TxHash {
        let count = self.tx_count;
        self.tx_count += 1;
        TxHash::new(keccak256_multiple(&[
            from.as_bytes(),
            to.as_bytes(),
            &value.to_be_bytes(),
            &count.to_be_bytes(),
            &keccak256(data),
        ]))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(
        &mut self,
        from: Address,
        to: Address,
        value: Amount,
        call: &ContractCall,
        events: &mut Vec<Event>,
    ) -> CrowdsaleResult<()> {
        let payable = matches!(call, ContractCall::Contribute | ContractCall::ContributeSigned(_));
        if value > 0 && !payable {
            return Err(CrowdsaleError::InvalidCall(format!(
                "{} does not accept value",
                call.signature()
            )));
        }

        match call {
            ContractCall::MultivestMint {
                recipient,
                amount,
                signature,
            } => {
                self.multivest_mint(to, *recipient, *amount, signature, events)?;
            }
            ContractCall::SetCrowdsale(crowdsale) => {
                self.referral_mut(&to)?.set_crowdsale(&from, *crowdsale)?;
            }
            ContractCall::SetAllocator(allocator) => match self.contracts.get_mut(&to) {
                Some(Contract::Referral(referral)) => referral.set_allocator(&from, *allocator)?,
                Some(Contract::Crowdsale(sale)) => sale.set_allocator(&from, *allocator)?,
                Some(_) => {
                    return Err(CrowdsaleError::WrongContractKind {
                        address: to,
                        expected: "referral or crowdsale",
                    })
                }
                None => return Err(CrowdsaleError::ContractNotFound(to)),
            },
            ContractCall::SetToken(token) => {
                self.allocator_mut(&to)?.set_token(&from, *token)?;
            }
            ContractCall::SetContributionForwarder(forwarder) => {
                self.crowdsale_mut(&to)?.set_contribution_forwarder(&from, *forwarder)?;
            }
            ContractCall::SetPricingStrategy(strategy) => {
                self.crowdsale_mut(&to)?.set_pricing_strategy(&from, *strategy)?;
            }
            ContractCall::UpdateDates {
                start_date,
                end_date,
            } => {
                self.crowdsale_mut(&to)?.update_dates(&from, *start_date, *end_date)?;
            }
            ContractCall::UpdateTierDates {
                tier_index,
                start_date,
                end_date,
            } => {
                self.pricing_mut(&to)?
                    .update_dates(&from, *tier_index, *start_date, *end_date)?;
            }
            ContractCall::AddCrowdsales(crowdsale) => {
                self.allocator_mut(&to)?.add_crowdsales(&from, *crowdsale)?;
            }
            ContractCall::RemoveCrowdsales(crowdsale) => {
                self.allocator_mut(&to)?.remove_crowdsales(&from, crowdsale)?;
            }
            ContractCall::AddSigner(signer) => {
                self.crowdsale_mut(&to)?.add_signer(&from, *signer)?;
            }
            ContractCall::RemoveSigner(signer) => {
                self.crowdsale_mut(&to)?.remove_signer(&from, signer)?;
            }
            ContractCall::UpdateWhitelist { address, status } => {
                self.crowdsale_mut(&to)?.update_whitelist(&from, *address, *status)?;
            }
            ContractCall::UpdateMintingAgent { agent, status } => {
                self.token_mut(&to)?.update_minting_agent(&from, *agent, *status)?;
            }
            ContractCall::TransferOwnership(new_owner) => {
                self.ownership_mut(&to)?.transfer_ownership(&from, *new_owner)?;
            }
            ContractCall::AcceptOwnership => {
                let previous = self.ownership_mut(&to)?.accept_ownership(&from)?;
                events.push(Event::OwnershipTransferred {
                    contract: to,
                    previous,
                    new_owner: from,
                });
            }
            ContractCall::DisableMinting => {
                self.token_mut(&to)?.disable_minting(&from)?;
            }
            ContractCall::Transfer {
                to: recipient,
                amount,
            } => {
                apply_token_transfer(self.token_mut(&to)?, from, *recipient, *amount)?;
                events.push(Event::Transferred {
                    token: to,
                    from,
                    to: *recipient,
                    amount: *amount,
                });
            }
            ContractCall::Contribute => {
                self.process_contribution(to, from, value, None, events)?;
            }
            ContractCall::ContributeSigned(signature) => {
                self.process_contribution(to, from, value, Some(signature), events)?;
            }
        }
        Ok(())
    }

    fn ownership_mut(&mut self, address: &Address) -> CrowdsaleResult<&mut Ownership> {
        self.contracts
            .get_mut(address)
            .map(Contract::ownership_mut)
            .ok_or(CrowdsaleError::ContractNotFound(*address))
    }

    // =========================================================================
    // Referral minting
    // =========================================================================

    fn multivest_mint(
        &mut self,
        referral_address: Address,
        recipient: Address,
        amount: Amount,
        signature: &RecoverableSignature,
        events: &mut Vec<Event>,
    ) -> CrowdsaleResult<()> {
        let signer = recover_signer(&mint_request_hash(&recipient, amount), signature)?;

        let (crowdsale, allocator) = {
            let referral = self.referral(&referral_address)?;
            (referral.crowdsale, referral.allocator)
        };
        self.crowdsale(&crowdsale)?.ensure_signer(&signer)?;

        self.referral_mut(&referral_address)?.record_claim(recipient, amount)?;
        self.allocate(&allocator, &referral_address, recipient, amount, events)?;

        info!(
            "Referral {} paid {} to {} (signer {})",
            referral_address, amount, recipient, signer
        );
        events.push(Event::ReferralClaimed {
            referral: referral_address,
            recipient,
            amount,
            signer,
        });
        Ok(())
    }

    /// Mint through an allocator on behalf of an allow-listed `caller`
    fn allocate(
        &mut self,
        allocator_address: &Address,
        caller: &Address,
        holder: Address,
        amount: Amount,
        events: &mut Vec<Event>,
    ) -> CrowdsaleResult<()> {
        let token = {
            let allocator = self.allocator(allocator_address)?;
            allocator.ensure_allowed(caller)?;
            allocator.token
        };
        self.token_mut(&token)?.mint(allocator_address, holder, amount)?;
        events.push(Event::Minted {
            token,
            holder,
            amount,
        });
        Ok(())
    }

    // =========================================================================
    // Contributions
    // =========================================================================

    fn process_contribution(
        &mut self,
        sale_address: Address,
        contributor: Address,
        value: Amount,
        signature: Option<&RecoverableSignature>,
        events: &mut Vec<Event>,
    ) -> CrowdsaleResult<()> {
        if value == 0 {
            return Err(CrowdsaleError::ZeroAmount);
        }
        let now = self.now;

        let (mode, pricing, forwarder, allocator) = {
            let sale = self.crowdsale(&sale_address)?;
            if !sale.is_active(now) {
                return Err(CrowdsaleError::SaleNotActive(now));
            }
            let mode = match signature {
                Some(signature) => {
                    let hash = contribution_request_hash(&sale_address, &contributor, value);
                    sale.signed_mode(recover_signer(&hash, signature)?)?
                }
                None => sale.unsigned_mode(&contributor)?,
            };
            (mode, sale.pricing()?, sale.contribution_forwarder, sale.allocator)
        };

        let available = {
            let relay = self.allocator(&allocator)?;
            relay.tokens_available(self.token(&relay.token)?)
        };
        let quote = self.pricing(&pricing)?.get_tokens(available, value, now)?;
        if quote.is_zero() {
            return Err(CrowdsaleError::ContributionRejected(format!(
                "no tokens available for {} wei at {}",
                value, now
            )));
        }

        self.debit_ether(&contributor, value)?;
        self.forward(&forwarder, value, events)?;

        self.pricing_mut(&pricing)?.record_sale(quote.tier_index, quote.tokens)?;
        self.crowdsale_mut(&sale_address)?.record_tokens_sold(quote.tokens)?;
        self.allocate(&allocator, &sale_address, contributor, quote.tokens, events)?;

        info!(
            "Contribution of {} wei from {} bought {} tokens ({:?})",
            value, contributor, quote.tokens, mode
        );
        events.push(Event::Contributed {
            crowdsale: sale_address,
            contributor,
            wei: value,
            tokens: quote.tokens,
            bonus: quote.bonus,
            mode,
        });
        Ok(())
    }

    fn forward(
        &mut self,
        forwarder_address: &Address,
        amount: Amount,
        events: &mut Vec<Event>,
    ) -> CrowdsaleResult<()> {
        let shares = self.forwarder(forwarder_address)?.split(amount)?;
        for (recipient, share) in shares {
            self.credit_ether(&recipient, share)?;
            events.push(Event::Forwarded {
                forwarder: *forwarder_address,
                recipient,
                amount: share,
            });
        }
        self.forwarder_mut(forwarder_address)?.record_forward(amount)
    }

    // =========================================================================
    // Native balances
    // =========================================================================

    fn credit_ether(&mut self, account: &Address, amount: Amount) -> CrowdsaleResult<()> {
        let balance = self.ether_balance(account);
        let new_balance = balance.checked_add(amount).ok_or(CrowdsaleError::Overflow)?;
        self.ether_balances.insert(*account, new_balance);
        Ok(())
    }

    fn debit_ether(&mut self, account: &Address, amount: Amount) -> CrowdsaleResult<()> {
        let balance = self.ether_balance(account);
        if balance < amount {
            return Err(CrowdsaleError::InsufficientFunds {
                have: balance,
                need: amount,
            });
        }
        self.ether_balances.insert(*account, balance - amount);
        Ok(())
    }
}
