//! Configuration module for the stash distributor
//!
//! Handles all configuration loading from TOML files and environment
//! variables, and provides structured configuration types.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Wallet key material locations
    pub wallet: WalletConfig,

    /// The distributed token
    pub token: TokenConfig,

    /// Distribution job configuration
    pub distribution: DistributionConfig,

    /// Claim payout configuration
    #[serde(default)]
    pub claim: ClaimConfig,

    /// Custody wallet registry storage
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to the daily stash keypair (source of distributed funds)
    pub stash_keypair_path: String,

    /// Path to the airdrop keypair (funds claim transfers)
    pub airdrop_keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token mint address
    pub mint: String,

    /// Declared decimal precision of the token
    #[serde(default = "default_decimals")]
    pub decimals: u32,

    /// Balances below this threshold skip the distribution
    #[serde(default = "default_minimum_send")]
    pub minimum_send: Decimal,

    /// Deposit required for a custody wallet to count as paid
    #[serde(default = "default_entry_amount")]
    pub entry_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Staking snapshot endpoint returning the recipient set
    pub snapshot_url: String,

    /// Community wallet that receives the fixed top-level share
    pub community_wallet: String,

    /// Fraction of each distribution routed to the community wallet
    #[serde(default = "default_community_share")]
    pub community_share: Decimal,

    /// Seconds between distribution ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Submission attempts before a distribution fails terminally
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between submission attempts, in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// File receiving one JSON line per completed distribution
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// Whole SOL sent alongside every claim so the recipient wallet can
    /// pay its own fees; zero disables the gas leg
    #[serde(default = "default_sol_drop_amount")]
    pub sol_drop_amount: Decimal,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            sol_drop_amount: default_sol_drop_amount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path of the embedded wallet registry database
    #[serde(default = "default_registry_path")]
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_rpc_timeout() -> u64 {
    30
}
fn default_decimals() -> u32 {
    3
}
fn default_minimum_send() -> Decimal {
    dec!(0.1)
}
fn default_entry_amount() -> Decimal {
    dec!(13)
}
fn default_community_share() -> Decimal {
    dec!(0.75)
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_max_attempts() -> u32 {
    10
}
fn default_retry_delay_secs() -> u64 {
    60
}
fn default_sol_drop_amount() -> Decimal {
    dec!(0.001)
}
fn default_audit_log_path() -> String {
    "distributions.jsonl".to_string()
}
fn default_registry_path() -> String {
    "registry.db".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }
}
