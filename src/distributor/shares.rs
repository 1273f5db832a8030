//! Recipient share sets and their validation
//!
//! A share is a recipient's fractional entitlement to the distributed
//! balance, kept as an exact `Decimal` end to end. Binary floating point is
//! banned here: accumulated representation error in share sums is exactly
//! the fund-loss bug class this engine exists to prevent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::errors::DistributionError;

/// One recipient of a distribution: an address and its fractional share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// The recipient's wallet address (owner, not token account)
    pub address: Pubkey,
    /// Exact decimal fraction in [0, 1]
    pub share: Decimal,
}

impl Recipient {
    pub fn new(address: Pubkey, share: Decimal) -> Self {
        Self { address, share }
    }
}

/// Validate that a recipient set's shares sum to exactly 1.
///
/// Exact decimal arithmetic makes an exact check viable: upstream sources
/// that quantize shares must reconcile their own rounding before handing
/// the set to the engine. Violations are fatal input errors carrying the
/// computed sum; the set is never auto-corrected.
pub fn validate_shares(recipients: &[Recipient]) -> Result<(), DistributionError> {
    if recipients.is_empty() {
        return Err(DistributionError::configuration(
            "recipient set is empty",
        ));
    }

    let sum: Decimal = recipients.iter().map(|r| r.share).sum();
    if sum != Decimal::ONE {
        return Err(DistributionError::InvalidShareDistribution { sum });
    }
    Ok(())
}
