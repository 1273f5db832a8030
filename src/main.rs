//! Stash distributor entry point
//!
//! Runs the recurring distribution job: every tick it re-fetches the
//! staking snapshot, resolves the recipient share set, and hands the
//! distribution engine one attempt. Also exposes one-shot commands for
//! the custody-wallet flows (balance check, claim payout).

#![deny(unused_imports)]
#![deny(unused_mut)]
#![warn(unused_must_use)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stash_distributor::config::Config;
use stash_distributor::distributor::{
    DistributionOutcome, DistributionRequest, Distributor, RetryPolicy,
};
use stash_distributor::endpoints;
use stash_distributor::ledger::{LedgerClient, RpcLedgerClient};
use stash_distributor::registry::{ClaimRecord, WalletRegistry};
use stash_distributor::snapshot::SnapshotSource;
use stash_distributor::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the recurring distribution job
    Run {
        /// Distribute once and exit instead of looping
        #[arg(long)]
        once: bool,
    },
    /// Show a user's custody wallet balance and access status
    Balance {
        /// External user identifier
        user: String,
    },
    /// Pay out a claim to an external wallet and record it
    Claim {
        /// External user identifier
        user: String,
        /// Destination wallet address
        wallet: String,
        /// Amount in whole token units
        amount: Decimal,
        /// Free-form claim reference
        #[arg(long, default_value = "manual")]
        reference: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("Starting stash distributor");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let mint = Pubkey::from_str(&config.token.mint).context("Invalid token mint address")?;

    let ledger = Arc::new(RpcLedgerClient::new(
        config.rpc.endpoint.clone(),
        mint,
        Duration::from_secs(config.rpc.timeout_secs),
    ));
    let engine = Distributor::new(
        Arc::clone(&ledger) as Arc<dyn LedgerClient>,
        mint,
        config.token.decimals,
        config.token.minimum_send,
    )
    .with_retry_policy(RetryPolicy::new(
        config.distribution.max_attempts,
        Duration::from_secs(config.distribution.retry_delay_secs),
    ));

    match args.command {
        Command::Run { once } => run_distribution_job(&config, &engine, once).await,
        Command::Balance { user } => show_balance(&config, ledger.as_ref(), &user).await,
        Command::Claim {
            user,
            wallet,
            amount,
            reference,
        } => pay_claim(&config, &engine, &user, &wallet, amount, &reference).await,
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "stash_distributor=debug,info"
    } else {
        "stash_distributor=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        anyhow::bail!("Config file '{}' not found", path);
    }
}

/// Load the stash wallet, honoring an environment override with a
/// base58-encoded key over the configured file path.
fn load_wallet(env_var: &str, path: &str) -> Result<WalletManager> {
    if let Ok(encoded) = std::env::var(env_var) {
        return WalletManager::from_base58(&encoded)
            .with_context(|| format!("Invalid base58 keypair in {}", env_var));
    }
    WalletManager::from_file(path)
}

/// The recurring distribution job
async fn run_distribution_job(config: &Config, engine: &Distributor, once: bool) -> Result<()> {
    let stash =
        load_wallet("STASH_KEYPAIR", &config.wallet.stash_keypair_path).context("Failed to load stash wallet")?;
    info!("Stash wallet: {}", stash.pubkey());

    if config.monitoring.enable_metrics {
        let port = config.monitoring.metrics_port;
        info!("Starting metrics server on port {}", port);
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let community_wallet = Pubkey::from_str(&config.distribution.community_wallet)
        .context("Invalid community wallet address")?;
    let snapshot = SnapshotSource::new(
        config.distribution.snapshot_url.clone(),
        community_wallet,
        config.distribution.community_share,
    );

    let mut ticks = tokio::time::interval(Duration::from_secs(config.distribution.interval_secs));
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if let Err(e) = run_distribution_tick(config, engine, &snapshot, &stash).await {
                    // Logged and swallowed: the next tick retries with a
                    // fresh snapshot and fresh ledger state.
                    error!("Distribution tick failed: {:#}", e);
                }
                if once {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                return Ok(());
            }
        }
    }
}

/// One scheduler tick: fresh snapshot, one distribution attempt
async fn run_distribution_tick(
    config: &Config,
    engine: &Distributor,
    snapshot: &SnapshotSource,
    stash: &WalletManager,
) -> Result<()> {
    info!("Gathering recipient set for distribution");
    let recipients = snapshot.fetch_recipients().await?;

    let request = DistributionRequest {
        source: stash.keypair_arc(),
        fee_payer: stash.keypair_arc(),
        recipients,
    };

    match engine.distribute(&request).await? {
        DistributionOutcome::Completed {
            signature,
            total_minor_units,
            recipients,
        } => {
            append_audit_record(
                &config.distribution.audit_log_path,
                &serde_json::json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "signature": signature.to_string(),
                    "total_minor_units": total_minor_units,
                    "recipients": recipients,
                }),
            )
            .await?;
        }
        DistributionOutcome::Skipped { balance, minimum } => {
            warn!(%balance, %minimum, "Distribution skipped this tick");
        }
    }
    Ok(())
}

/// Append one JSON line to the audit log owned by this caller
async fn append_audit_record(path: &str, record: &serde_json::Value) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open audit log {}", path))?;
    file.write_all(format!("{}\n", record).as_bytes())
        .await
        .context("Failed to append audit record")?;
    Ok(())
}

/// Show a user's custody wallet balance and whether it clears the entry amount
async fn show_balance(config: &Config, ledger: &RpcLedgerClient, user: &str) -> Result<()> {
    let registry = WalletRegistry::open(&config.registry.path)?;
    let wallet = registry.get_or_create(user)?;
    let balance = ledger
        .get_token_balance(&wallet.pubkey())
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let has_access = balance >= config.token.entry_amount;
    info!(
        user = %user,
        pubkey = %wallet.pubkey(),
        balance = %balance,
        entry_amount = %config.token.entry_amount,
        has_access = %has_access,
        "Custody wallet balance"
    );
    if has_access {
        registry.mark_paid(user)?;
    }
    println!("{} {} {}", wallet.pubkey(), balance, has_access);
    Ok(())
}

/// Pay a claim from the airdrop wallet and record it in the registry
async fn pay_claim(
    config: &Config,
    engine: &Distributor,
    user: &str,
    wallet: &str,
    amount: Decimal,
    reference: &str,
) -> Result<()> {
    use rust_decimal::prelude::ToPrimitive;

    let airdrop = load_wallet("AIRDROP_KEYPAIR", &config.wallet.airdrop_keypair_path)
        .context("Failed to load airdrop wallet")?;
    let destination = Pubkey::from_str(wallet).context("Invalid destination wallet address")?;

    let registry = WalletRegistry::open(&config.registry.path)?;
    let signature = engine
        .send_single(
            &airdrop.keypair_arc(),
            &airdrop.keypair_arc(),
            destination,
            amount,
            config.claim.sol_drop_amount,
        )
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let minor_units = (amount * Decimal::from(10u64.pow(config.token.decimals)))
        .floor()
        .to_u64()
        .context("Claim amount out of range")?;
    registry.add_claim(
        user,
        ClaimRecord {
            timestamp: Utc::now(),
            amount: minor_units,
            wallet: destination.to_string(),
            reference: reference.to_string(),
        },
    )?;

    info!(
        user = %user,
        wallet = %destination,
        amount = %amount,
        signature = %signature,
        "Claim paid and recorded"
    );
    println!("{}", signature);
    Ok(())
}
