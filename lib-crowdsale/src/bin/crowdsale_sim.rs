//! crowdsale-sim
//!
//! Deploys a sale from configuration, decodes calldata and produces signed
//! referral vouchers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::info;

use lib_crowdsale::{deploy, ChainState, ContractCall, DeploymentConfig};
use lib_crypto::KeyPair;
use lib_types::{Address, PRECISION};

/// Crowdsale simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "crowdsale-sim")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the configured contracts and print the resulting state
    Deploy {
        /// TOML deployment file (reference fixture when omitted)
        #[arg(short, long, env = "CROWDSALE_CONFIG")]
        config: Option<PathBuf>,

        /// Deployer address
        #[arg(long, default_value = "0x0000000000000000000000000000000000000001")]
        deployer: Address,
    },

    /// Decode hex calldata
    Decode {
        /// Calldata, with or without 0x
        data: String,
    },

    /// Sign a multivestMint voucher and print its calldata
    Sign {
        /// Seed the signing key is derived from
        #[arg(long)]
        seed: String,

        #[arg(long)]
        recipient: Address,

        /// Amount in whole tokens
        #[arg(long)]
        amount: u64,
    },
}

fn main() -> Result<()> {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deploy { config, deployer } => {
            let config = match config {
                Some(path) => DeploymentConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => DeploymentConfig::default(),
            };
            let mut state = ChainState::new(0);
            let deployment = deploy(&mut state, deployer, &config)?;
            info!("Referral program at {}", deployment.referral);
            println!("{}", state.snapshot_json()?);
        }
        Command::Decode { data } => {
            println!("{}", decode_calldata(&data)?);
        }
        Command::Sign {
            seed,
            recipient,
            amount,
        } => {
            let (signer, call) = sign_voucher(&seed, recipient, amount)?;
            println!("signer:   {}", signer);
            println!("call:     {}", call);
            println!("calldata: 0x{}", hex::encode(call.encode()));
        }
    }
    Ok(())
}

/// Parse hex calldata, with or without `0x`
fn decode_calldata(data: &str) -> Result<ContractCall> {
    let bytes = hex::decode(data.trim().trim_start_matches("0x")).context("calldata is not hex")?;
    Ok(ContractCall::decode(&bytes)?)
}

/// `multivestMint` call for `whole_tokens` signed by the key derived from `seed`
fn sign_voucher(seed: &str, recipient: Address, whole_tokens: u64) -> Result<(Address, ContractCall)> {
    let key = KeyPair::from_seed(seed.as_bytes())?;
    let amount = u128::from(whole_tokens)
        .checked_mul(PRECISION)
        .context("amount overflows")?;
    let signature = key.sign_mint_request(&recipient, amount)?;
    Ok((
        key.address(),
        ContractCall::MultivestMint {
            recipient,
            amount,
            signature,
        },
    ))
}
