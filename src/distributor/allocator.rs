//! Integer minor-unit allocation
//!
//! Converts a whole-unit decimal balance and a validated share set into
//! per-recipient integer amounts in minor units (1 unit = 10^decimals minor
//! units). The allocation must sum to `floor(balance * 10^decimals)`
//! exactly: per-recipient floor rounding can under-allocate by a few minor
//! units, so the first recipient in iteration order (the anchor) absorbs
//! the residual. All arithmetic stays in `Decimal` until the final
//! conversion to `u64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use super::errors::DistributionError;
use super::shares::Recipient;

/// A computed allocation: per-recipient integer minor-unit amounts.
///
/// Amounts preserve recipient input order. The invariant
/// `amounts.iter().sum() == total_minor_units` holds exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// (recipient address, minor-unit amount) in input order
    pub amounts: Vec<(Pubkey, u64)>,
    /// The distributed balance in minor units: floor(balance * 10^decimals)
    pub total_minor_units: u64,
    /// The token's declared decimal precision
    pub decimals: u32,
}

impl Allocation {
    /// Sum of all per-recipient amounts. Equals `total_minor_units` by
    /// construction; exposed for assertions and audit logging.
    pub fn allocated_minor_units(&self) -> u64 {
        self.amounts.iter().map(|(_, amount)| amount).sum()
    }
}

/// Allocate `balance` across `recipients` in integer minor units.
///
/// Recipients after the anchor get `floor(balance * share * 10^decimals)`;
/// the anchor (first recipient) gets the remainder of the total, which
/// equals its own floor amount plus the rounding residual. A zero-share
/// recipient stays in the allocation with amount 0 so its transfer
/// instruction is still emitted downstream.
///
/// The share set must already be validated; amounts are derived from
/// shares only, never patched after the fact. Deterministic: identical
/// inputs produce identical output.
pub fn allocate(
    balance: Decimal,
    decimals: u32,
    recipients: &[Recipient],
) -> Result<Allocation, DistributionError> {
    if recipients.is_empty() {
        return Err(DistributionError::configuration(
            "cannot allocate to an empty recipient set",
        ));
    }
    if balance.is_sign_negative() {
        return Err(DistributionError::configuration(format!(
            "balance must be non-negative, got {balance}"
        )));
    }

    let scale = Decimal::from(10u64.pow(decimals));
    let total_minor_units = (balance * scale)
        .floor()
        .to_u64()
        .ok_or_else(|| DistributionError::internal("scaled balance does not fit in u64"))?;

    let mut amounts = Vec::with_capacity(recipients.len());
    let mut non_anchor_sum: u64 = 0;
    for recipient in recipients.iter().skip(1) {
        let amount = (balance * recipient.share * scale)
            .floor()
            .to_u64()
            .ok_or_else(|| DistributionError::internal("scaled amount does not fit in u64"))?;
        non_anchor_sum = non_anchor_sum
            .checked_add(amount)
            .ok_or_else(|| DistributionError::internal("allocation sum overflow"))?;
        amounts.push((recipient.address, amount));
    }

    // Anchor absorbs the rounding residual so the allocation sums exactly.
    // An unvalidated share sum above 1 can make the non-anchor floors
    // exceed the total; that cannot be reconciled without minting units,
    // so it is surfaced rather than clamped.
    let anchor_amount = total_minor_units.checked_sub(non_anchor_sum).ok_or_else(|| {
        DistributionError::internal(
            "non-anchor amounts exceed the distributable total; share sum too far above 1",
        )
    })?;
    amounts.insert(0, (recipients[0].address, anchor_amount));

    Ok(Allocation {
        amounts,
        total_minor_units,
        decimals,
    })
}
