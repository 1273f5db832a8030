//! Staking snapshot recipient source
//!
//! Each distribution tick fetches the current staking snapshot and turns
//! it into a recipient/share set: the community wallet takes a fixed
//! top-level share, and the remainder is split across stakers in
//! proportion to their staked NFT counts. Share sets are built fresh per
//! tick and never reused; a stale set would misallocate against the
//! current stake.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

use crate::distributor::shares::{validate_shares, Recipient};

/// Staker fractions are quantized to this many decimal places before
/// scaling, matching the snapshot provider's payout granularity.
const SHARE_SCALE: u32 = 6;

/// Consistency gate on the quantized share sum. Quantization at 1e-6 can
/// leave a small shortfall against 1; anything beyond this means the
/// snapshot itself is inconsistent.
const SNAPSHOT_SUM_TOLERANCE: Decimal = dec!(0.0001);

/// One entry of the staking snapshot: a single staked NFT.
#[derive(Debug, Clone, Deserialize)]
pub struct StakeEntry {
    pub staker: String,
}

/// HTTP-backed snapshot source.
pub struct SnapshotSource {
    client: reqwest::Client,
    url: String,
    community_wallet: Pubkey,
    community_share: Decimal,
}

impl SnapshotSource {
    pub fn new(url: impl Into<String>, community_wallet: Pubkey, community_share: Decimal) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            community_wallet,
            community_share,
        }
    }

    /// Fetch the current snapshot and build the tick's recipient set.
    pub async fn fetch_recipients(&self) -> Result<Vec<Recipient>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;
        if !response.status().is_success() {
            bail!("GET {} returned status {}", self.url, response.status());
        }
        let entries: Vec<StakeEntry> = response
            .json()
            .await
            .context("Failed to parse staking snapshot")?;

        build_share_set(&entries, &self.community_wallet, self.community_share)
    }
}

/// Build the recipient set from snapshot entries.
///
/// Stakers keep first-seen order; quantization shortfall against an exact
/// sum of 1 is added to the first staker's share (the same recipient that
/// later absorbs the allocator's rounding residual). A shortfall beyond
/// the share tolerance means the snapshot itself is inconsistent and is
/// an error, never silently corrected.
pub fn build_share_set(
    entries: &[StakeEntry],
    community_wallet: &Pubkey,
    community_share: Decimal,
) -> Result<Vec<Recipient>> {
    if community_share < Decimal::ZERO || community_share > Decimal::ONE {
        bail!("community share must be in [0, 1], got {community_share}");
    }

    // Count staked NFTs per staker, preserving first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for entry in entries {
        let count = counts.entry(entry.staker.clone()).or_insert(0);
        if *count == 0 {
            order.push(entry.staker.clone());
        }
        *count += 1;
    }
    let total_nfts: u64 = counts.values().sum();
    if total_nfts == 0 {
        bail!("staking snapshot contains no stakers");
    }
    info!(
        nfts = total_nfts,
        stakers = order.len(),
        "Built staking snapshot counts"
    );

    let staker_pool = Decimal::ONE - community_share;
    let quantum = 10u64.pow(SHARE_SCALE);

    let mut recipients = Vec::with_capacity(order.len() + 1);
    for staker in &order {
        let address = Pubkey::from_str(staker)
            .with_context(|| format!("Invalid staker address in snapshot: {staker}"))?;
        // Integer quantization of the staker's fraction at 1e-6.
        let quantized = Decimal::new(((counts[staker] * quantum) / total_nfts) as i64, SHARE_SCALE);
        recipients.push(Recipient::new(address, quantized * staker_pool));
    }
    recipients.push(Recipient::new(*community_wallet, community_share));

    let assigned: Decimal = recipients.iter().map(|r| r.share).sum();
    let shortfall = Decimal::ONE - assigned;
    if shortfall.abs() > SNAPSHOT_SUM_TOLERANCE {
        bail!("snapshot shares sum to {assigned}, outside tolerance");
    }
    recipients[0].share += shortfall;

    validate_shares(&recipients)?;
    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entries_for(stakers: &[(Pubkey, usize)]) -> Vec<StakeEntry> {
        let mut entries = Vec::new();
        for (staker, count) in stakers {
            for _ in 0..*count {
                entries.push(StakeEntry {
                    staker: staker.to_string(),
                });
            }
        }
        entries
    }

    #[test]
    fn test_even_split_with_community_share() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let community = Pubkey::new_unique();
        let entries = entries_for(&[(a, 1), (b, 1)]);

        let recipients = build_share_set(&entries, &community, dec!(0.75)).unwrap();

        assert_eq!(recipients.len(), 3);
        assert_eq!(recipients[0].address, a);
        assert_eq!(recipients[1].address, b);
        assert_eq!(recipients[2].address, community);
        assert_eq!(recipients[2].share, dec!(0.75));
        assert_eq!(recipients[0].share, dec!(0.125));
        assert_eq!(recipients[1].share, dec!(0.125));
    }

    #[test]
    fn test_quantization_shortfall_goes_to_first_staker() {
        // Three stakers, one NFT each: 1/3 quantizes to 0.333333, leaving
        // a 1e-6 shortfall that the first staker absorbs.
        let stakers: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let community = Pubkey::new_unique();
        let entries = entries_for(&[(stakers[0], 1), (stakers[1], 1), (stakers[2], 1)]);

        let recipients = build_share_set(&entries, &community, dec!(0.75)).unwrap();

        let sum: Decimal = recipients.iter().map(|r| r.share).sum();
        assert_eq!(sum, Decimal::ONE);
        assert!(recipients[0].share > recipients[1].share);
        assert_eq!(recipients[1].share, recipients[2].share);
    }

    #[test]
    fn test_counts_aggregate_per_staker() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let community = Pubkey::new_unique();
        // a stakes 3 NFTs, b stakes 1: a gets 3x b's share of the pool.
        let entries = entries_for(&[(a, 3), (b, 1)]);

        let recipients = build_share_set(&entries, &community, dec!(0)).unwrap();

        assert_eq!(recipients[0].address, a);
        assert_eq!(recipients[0].share, dec!(0.75));
        assert_eq!(recipients[1].share, dec!(0.25));
        // Zero community share keeps the community wallet as a recipient
        // with amount 0 downstream.
        assert_eq!(recipients[2].share, dec!(0));
    }

    #[test]
    fn test_empty_snapshot_rejected() {
        // An empty snapshot would silently reroute the staker pool; it is
        // an error, not a degenerate distribution.
        let community = Pubkey::new_unique();
        assert!(build_share_set(&[], &community, dec!(0.75)).is_err());
    }

    #[test]
    fn test_invalid_staker_address_rejected() {
        let community = Pubkey::new_unique();
        let entries = vec![StakeEntry {
            staker: "not-a-pubkey".to_string(),
        }];
        assert!(build_share_set(&entries, &community, dec!(0.75)).is_err());
    }

    #[test]
    fn test_community_share_out_of_range_rejected() {
        let community = Pubkey::new_unique();
        assert!(build_share_set(&[], &community, dec!(1.5)).is_err());
        assert!(build_share_set(&[], &community, dec!(-0.1)).is_err());
    }

    #[tokio::test]
    async fn test_fetch_recipients_from_http_snapshot() {
        let staker = Pubkey::new_unique();
        let community = Pubkey::new_unique();
        let body = serde_json::json!([{ "staker": staker.to_string() }]).to_string();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/staked")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let source = SnapshotSource::new(
            format!("{}/api/staked", server.url()),
            community,
            dec!(0.75),
        );
        let recipients = source.fetch_recipients().await.unwrap();

        mock.assert_async().await;
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].address, staker);
        assert_eq!(recipients[0].share, dec!(0.25));
        assert_eq!(recipients[1].share, dec!(0.75));
    }

    #[tokio::test]
    async fn test_fetch_recipients_propagates_http_failure() {
        let community = Pubkey::new_unique();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/staked")
            .with_status(502)
            .create_async()
            .await;

        let source = SnapshotSource::new(
            format!("{}/api/staked", server.url()),
            community,
            dec!(0.75),
        );
        assert!(source.fetch_recipients().await.is_err());
    }
}
