mod builder;
mod bundler;
mod config;
mod encoding;
mod prompt;
mod signer;
mod types;

use anyhow::{Context, Result};
use builder::{GasMiddleware, UserOperationBuilder};
use bundler::BundlerClient;
use clap::{Args, Parser, Subcommand};
use config::VoltaConfig;
use ethers::abi::AbiParser;
use ethers::contract::Contract;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, U256};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "volta-aa", version, about = "Volta ERC-4337 user operation CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build + send a UserOperation that transfers ETH out of a vault.
    Transfer(TransferArgs),

    /// Interactive demo: transfer ETH or wrap it via a WETH-style deposit.
    Demo(DemoArgs),

    /// Sign a 32-byte hash with one or more keys and print the combined signature.
    Sign(SignArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Vault (smart account) address; the UserOperation sender.
    vault: String,

    /// Bundler base URL; the effective endpoint is `<base>/<chain>`.
    #[arg(long, env = "VOLTA_BUNDLER_URL", default_value = config::DEFAULT_BUNDLER_BASE_URL)]
    bundler_url: String,

    /// Chain name used as the bundler URL path segment.
    #[arg(long, env = "VOLTA_CHAIN", default_value = config::DEFAULT_CHAIN)]
    chain: String,

    /// Hex chain id, e.g. 0xa4b1.
    #[arg(long, env = "VOLTA_CHAIN_ID", default_value = config::DEFAULT_CHAIN_ID)]
    chain_id: String,

    /// EntryPoint contract address.
    #[arg(long, env = "VOLTA_ENTRYPOINT", default_value = config::ENTRY_POINT)]
    entrypoint: String,

    /// Vault owner private key for local signing.
    ///
    /// When unset, the flow prints the operation hash and prompts for a
    /// combined signature produced with the `sign` subcommand.
    #[arg(long, env = "VOLTA_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Do not send the UserOperation; only build, estimate, and sign.
    #[arg(long)]
    dry_run: bool,

    /// Do not wait for the userOp receipt.
    #[arg(long)]
    no_wait: bool,

    /// Max seconds to wait for the userOp receipt. Use 0 to disable timeout.
    #[arg(long, default_value_t = 180)]
    max_wait_seconds: u64,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Recipient address; prompted when omitted.
    #[arg(long)]
    to: Option<String>,

    /// ETH amount as a decimal string (e.g. 0.001); prompted when omitted.
    #[arg(long)]
    amount: Option<String>,
}

#[derive(Args, Debug)]
struct DemoArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct SignArgs {
    /// 32-byte hash to sign (the operation hash printed by the submit flows).
    #[arg(long)]
    hash: String,

    /// Private keys; one signature per key, concatenated in the given order.
    #[arg(required = true)]
    keys: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        // Logs go to stderr; stdout carries the prompts and results.
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Transfer(args) => cmd_transfer(args).await,
        Command::Demo(args) => cmd_demo(args).await,
        Command::Sign(args) => cmd_sign(args).await,
    }
}

async fn cmd_transfer(args: TransferArgs) -> Result<()> {
    let cfg = resolve_config(&args.common)?;
    let vault = parse_vault(&args.common.vault)?;

    let (target, amount_wei) = resolve_transfer(args.to, args.amount)?;
    let call_data = encoding::execute_call_data(target, amount_wei, Bytes::default())?;

    submit_user_op(&cfg, vault, call_data, &args.common).await
}

async fn cmd_demo(args: DemoArgs) -> Result<()> {
    let cfg = resolve_config(&args.common)?;
    let vault = parse_vault(&args.common.vault)?;

    let action = prompt::read_line("Enter action (transfer,wrap): ")?;
    let call_data = match action.as_str() {
        "transfer" => {
            let (target, amount_wei) = resolve_transfer(None, None)?;
            encoding::execute_call_data(target, amount_wei, Bytes::default())?
        }
        "wrap" => {
            let token = prompt::read_line(
                "Enter wrap token address (arbitrum-mainnet: 0x82aF49447D8a07e3bd95BD0d56f35241523fBab1): ",
            )?;
            let token = Address::from_str(&token).context("invalid wrap token address")?;
            let amount = prompt::read_line("Enter amount (format 0.001): ")?;
            let amount_wei = ethers::utils::parse_ether(amount.as_str())
                .with_context(|| format!("invalid amount: {amount}"))?;
            encoding::execute_call_data(token, amount_wei, encoding::deposit_call_data()?)?
        }
        _ => {
            println!("Stopped");
            return Ok(());
        }
    };

    submit_user_op(&cfg, vault, call_data, &args.common).await
}

async fn cmd_sign(args: SignArgs) -> Result<()> {
    let hash =
        encoding::parse_h256(&args.hash).context("invalid --hash (expected 32-byte hex)")?;
    println!("signing for hash: {}", encoding::fmt_h256(hash));

    let mut signatures = Vec::with_capacity(args.keys.len());
    for key in &args.keys {
        signatures.push(signer::sign_hash(key, hash).await?);
    }

    println!("{}", signer::combine_signatures(&signatures));
    Ok(())
}

fn resolve_config(common: &CommonArgs) -> Result<VoltaConfig> {
    VoltaConfig::resolve(
        &common.bundler_url,
        &common.chain,
        &common.chain_id,
        &common.entrypoint,
        common.private_key.clone(),
    )
}

fn parse_vault(s: &str) -> Result<Address> {
    Address::from_str(s).context("invalid vault address")
}

/// Flag values win; anything missing is prompted for.
fn resolve_transfer(to: Option<String>, amount: Option<String>) -> Result<(Address, U256)> {
    let target = match to {
        Some(t) => t,
        None => prompt::read_line("Enter target address: ")?,
    };
    let target = Address::from_str(&target).context("invalid target address")?;

    let amount = match amount {
        Some(a) => a,
        None => prompt::read_line("Enter amount (format 0.001): ")?,
    };
    let amount_wei = ethers::utils::parse_ether(amount.as_str())
        .with_context(|| format!("invalid amount: {amount}"))?;

    Ok((target, amount_wei))
}

async fn submit_user_op(
    cfg: &VoltaConfig,
    vault: Address,
    call_data: Bytes,
    common: &CommonArgs,
) -> Result<()> {
    let provider = Provider::<Http>::try_from(cfg.bundler_url.as_str())
        .context("invalid bundler url")?
        .interval(Duration::from_millis(350));
    let bundler = BundlerClient::new(cfg.bundler_url.clone());

    let nonce =
        fetch_entrypoint_nonce(Arc::new(provider.clone()), cfg.entrypoint, vault).await?;
    tracing::info!(vault = %vault, nonce = %nonce, chain = %cfg.chain, "building user operation");

    let mut op = UserOperationBuilder::new(vault)
        .nonce(nonce)
        // Vaults are initialized through the Volta dashboard before these
        // flows run, so the account always exists.
        .init_code(Bytes::default())
        .call_data(call_data)
        .use_middleware(GasMiddleware::GasPrice)
        // Gas limits rarely change between runs; hardcode them and drop this
        // middleware if estimation latency becomes a concern.
        .use_middleware(GasMiddleware::EstimateGas)
        .use_middleware(GasMiddleware::PadGas)
        .build(&provider, &bundler, cfg.entrypoint)
        .await?;

    // Fields are frozen from here on: the hash we print or sign is the hash
    // the bundler will verify.
    let op_hash = encoding::user_op_hash(&op, cfg.entrypoint, cfg.chain_id);

    let sig = match cfg.private_key.as_deref() {
        Some(key) => signer::sign_hash(key, op_hash).await?,
        None => prompt::read_line(&format!(
            "Combined signature for opHash ({}): ",
            encoding::fmt_h256(op_hash)
        ))?,
    };
    op.signature = signer::parse_signature_hex(&sig).context("invalid signature")?;

    println!(
        "UserOperation (final):\n{}",
        serde_json::to_string_pretty(&op)?
    );

    if common.dry_run {
        println!("--dry-run set: not sending user operation.");
        return Ok(());
    }

    println!("Sending ops to Volta bundler...");
    let user_op_hash = bundler
        .send_user_operation(serde_json::to_value(&op)?, cfg.entrypoint)
        .await
        .context("bundler send failed")?;

    println!("UserOp_hash: {}", encoding::fmt_h256(user_op_hash));
    println!(
        "url: {}/{}",
        config::EXPLORER_BASE_URL,
        encoding::fmt_h256(user_op_hash)
    );

    if common.no_wait {
        return Ok(());
    }

    let receipt = bundler
        .wait_user_operation_receipt(user_op_hash, Duration::from_secs(common.max_wait_seconds))
        .await
        .context("failed waiting for userOp receipt")?;

    println!(
        "UserOp receipt:\n{}",
        serde_json::to_string_pretty(&receipt)?
    );

    Ok(())
}

async fn fetch_entrypoint_nonce<M: Middleware + 'static>(
    client: Arc<M>,
    entrypoint: Address,
    vault: Address,
) -> Result<U256> {
    let entrypoint_abi = AbiParser::default()
        .parse(&["function getNonce(address sender, uint192 key) view returns (uint256)"])?;
    let entrypoint_c = Contract::new(entrypoint, entrypoint_abi, client);

    let nonce: U256 = entrypoint_c
        .method("getNonce", (vault, U256::zero()))?
        .call()
        .await
        .context("entryPoint.getNonce failed")?;
    Ok(nonce)
}
