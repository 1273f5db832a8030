//! Custody wallet registry
//!
//! Maps external user ids to custody keypairs, lazily generating and
//! persisting one on first access, and records claim history for the drop
//! flow. Backed by an embedded sled database with two trees: `wallets`
//! (user id -> stored keypair + status) and `claims` (user id -> claim
//! records). The distribution engine never touches this registry; it only
//! ever receives resolved keypairs.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tracing::info;

use crate::metrics::metrics;

/// Lifecycle status of a custody wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Wallet generated, deposit not yet observed
    Created,
    /// Required deposit observed, access granted
    Paid,
}

/// A resolved custody wallet
pub struct CustodyWallet {
    pub user_id: String,
    pub keypair: Arc<Keypair>,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
}

impl CustodyWallet {
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

/// One recorded claim against the drop pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub timestamp: DateTime<Utc>,
    /// Claimed amount in minor units
    pub amount: u64,
    /// Destination wallet address the claim was paid to
    pub wallet: String,
    /// Free-form reference (campaign id, message link)
    pub reference: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredWallet {
    keypair: Vec<u8>,
    status: WalletStatus,
    created_at: DateTime<Utc>,
}

/// Sled-backed registry of custody wallets and claims
pub struct WalletRegistry {
    wallets: sled::Tree,
    claims: sled::Tree,
}

impl WalletRegistry {
    /// Open (or create) the registry at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).context("Failed to open wallet registry database")?;
        let wallets = db.open_tree("wallets")?;
        let claims = db.open_tree("claims")?;
        Ok(Self { wallets, claims })
    }

    /// Resolve a user's custody wallet, generating one on first access
    pub fn get_or_create(&self, user_id: &str) -> Result<CustodyWallet> {
        if let Some(raw) = self.wallets.get(user_id.as_bytes())? {
            let stored: StoredWallet =
                serde_json::from_slice(&raw).context("Corrupt wallet record")?;
            let keypair = Keypair::try_from(stored.keypair.as_slice())
                .map_err(|e| anyhow::anyhow!("Corrupt stored keypair: {e}"))?;
            return Ok(CustodyWallet {
                user_id: user_id.to_string(),
                keypair: Arc::new(keypair),
                status: stored.status,
                created_at: stored.created_at,
            });
        }

        let keypair = Keypair::new();
        let stored = StoredWallet {
            keypair: keypair.to_bytes().to_vec(),
            status: WalletStatus::Created,
            created_at: Utc::now(),
        };
        self.wallets
            .insert(user_id.as_bytes(), serde_json::to_vec(&stored)?)?;
        self.wallets.flush()?;
        info!(user_id = %user_id, pubkey = %keypair.pubkey(), "Created custody wallet");

        Ok(CustodyWallet {
            user_id: user_id.to_string(),
            keypair: Arc::new(keypair),
            status: stored.status,
            created_at: stored.created_at,
        })
    }

    /// Mark a user's wallet as paid after the deposit is observed
    pub fn mark_paid(&self, user_id: &str) -> Result<()> {
        let raw = self
            .wallets
            .get(user_id.as_bytes())?
            .context("Cannot mark unknown wallet as paid")?;
        let mut stored: StoredWallet =
            serde_json::from_slice(&raw).context("Corrupt wallet record")?;
        stored.status = WalletStatus::Paid;
        self.wallets
            .insert(user_id.as_bytes(), serde_json::to_vec(&stored)?)?;
        self.wallets.flush()?;
        info!(user_id = %user_id, "Marked wallet as paid");
        Ok(())
    }

    /// Append a claim record for a user
    pub fn add_claim(&self, user_id: &str, claim: ClaimRecord) -> Result<()> {
        let mut records = self.claims_for(user_id)?;
        records.push(claim);
        self.claims
            .insert(user_id.as_bytes(), serde_json::to_vec(&records)?)?;
        self.claims.flush()?;
        metrics().claims_recorded.inc();
        Ok(())
    }

    /// All claim records for a user
    pub fn claims_for(&self, user_id: &str) -> Result<Vec<ClaimRecord>> {
        match self.claims.get(user_id.as_bytes())? {
            Some(raw) => serde_json::from_slice(&raw).context("Corrupt claim records"),
            None => Ok(Vec::new()),
        }
    }

    /// Total minor units claimed by one user
    pub fn total_claimed(&self, user_id: &str) -> Result<u64> {
        Ok(self.claims_for(user_id)?.iter().map(|c| c.amount).sum())
    }

    /// Total minor units claimed across all users
    pub fn total_claimed_all(&self) -> Result<u64> {
        let mut total = 0u64;
        for entry in self.claims.iter() {
            let (_, raw) = entry?;
            let records: Vec<ClaimRecord> =
                serde_json::from_slice(&raw).context("Corrupt claim records")?;
            total += records.iter().map(|c| c.amount).sum::<u64>();
        }
        Ok(total)
    }
}
