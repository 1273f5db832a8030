//! Token community-access bot: custody wallets, claims, and proportional
//! stash distribution on Solana.
//!
//! The crate's core is the [`distributor`] engine; everything else is the
//! glue that feeds it (config, wallet registry, staking snapshot) or
//! observes it (metrics, structured logging).

pub mod config;
pub mod distributor;
pub mod endpoints;
pub mod ledger;
pub mod metrics;
pub mod registry;
pub mod snapshot;
pub mod structured_logging;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};

#[cfg(test)]
mod tests {
    pub mod test_helpers;

    mod distribution_pipeline_tests;
}
