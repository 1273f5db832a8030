//! Account provisioning checks
//!
//! Before a recipient can receive a transfer it needs an associated token
//! account (ATA) for the mint. This step queries the ledger read path once
//! per recipient and records whether a create-account instruction must be
//! prepended to that recipient's transfer. The check runs before the
//! transaction builder so creation and transfer stay paired inside one
//! atomic submission.

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use super::allocator::Allocation;
use super::errors::DistributionError;
use crate::ledger::LedgerClient;

/// One recipient's slice of the transaction: where the tokens go, how many
/// minor units, and whether the destination account must be created first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStep {
    /// The recipient's wallet address
    pub recipient: Pubkey,
    /// The recipient's associated token account for the mint
    pub token_account: Pubkey,
    /// Transfer amount in minor units (zero amounts are still transferred)
    pub amount: u64,
    /// Whether a create-account instruction must precede the transfer
    pub needs_creation: bool,
}

/// Plan the per-recipient transfer steps for an allocation.
///
/// Queries account existence fresh for every call; results are never
/// cached across distribution attempts. A read failure surfaces as a
/// retryable [`DistributionError::AccountQuery`].
pub async fn plan_transfer_steps(
    ledger: &dyn LedgerClient,
    mint: &Pubkey,
    allocation: &Allocation,
) -> Result<Vec<TransferStep>, DistributionError> {
    let mut steps = Vec::with_capacity(allocation.amounts.len());
    for &(recipient, amount) in &allocation.amounts {
        let token_account = get_associated_token_address(&recipient, mint);
        let exists = ledger.account_exists(&token_account).await?;
        steps.push(TransferStep {
            recipient,
            token_account,
            amount,
            needs_creation: !exists,
        });
    }
    Ok(steps)
}
