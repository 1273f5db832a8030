//! Distribution engine orchestration
//!
//! One distribution attempt walks: validate shares, fetch the live
//! balance, gate on the minimum sendable threshold, allocate integer
//! amounts, plan provisioning, build and sign one transaction, submit
//! with retry. The engine owns no long-lived state; every attempt
//! re-queries fresh ledger state.
//!
//! Concurrency contract: attempts for distinct source wallets may run
//! concurrently, but callers must serialize attempts against the same
//! source wallet. The ledger accepts a single valid next transaction per
//! signer recency window and the engine provides no per-wallet locking.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use solana_sdk::{
    native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, signature::Keypair, signature::Signature,
    signer::Signer,
};
use tracing::info;

use super::allocator::allocate;
use super::builder::{build_claim_transaction, build_distribution_transaction, dedup_signers};
use super::errors::DistributionError;
use super::provisioning::plan_transfer_steps;
use super::shares::{validate_shares, Recipient};
use super::submit::{submit_with_retry, RetryPolicy};
use crate::ledger::LedgerClient;
use crate::metrics::metrics;
use crate::structured_logging::StructuredLogger;

/// One distribution attempt's inputs.
///
/// The source wallet holds the distributed balance and signs the debit;
/// the fee payer may be the same key. Recipient order matters: the first
/// recipient is the anchor that absorbs the rounding residual.
pub struct DistributionRequest {
    pub source: Arc<Keypair>,
    pub fee_payer: Arc<Keypair>,
    pub recipients: Vec<Recipient>,
}

/// Outcome of a distribution attempt that did not fail.
///
/// A skip is success-with-no-op, not an error: the balance was under the
/// minimum sendable threshold and nothing touched the ledger write path.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionOutcome {
    Completed {
        /// Ledger signature in canonical base58 form (via `Display`)
        signature: Signature,
        /// Total distributed, in minor units
        total_minor_units: u64,
        /// Number of recipients in the transaction
        recipients: usize,
    },
    Skipped {
        /// The observed balance, in whole units
        balance: Decimal,
        /// The configured minimum sendable balance
        minimum: Decimal,
    },
}

/// The proportional distribution engine for one token mint.
///
/// All collaborators are constructor-injected; nothing global.
pub struct Distributor {
    ledger: Arc<dyn LedgerClient>,
    mint: Pubkey,
    decimals: u32,
    minimum_balance: Decimal,
    retry: RetryPolicy,
}

impl Distributor {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        mint: Pubkey,
        decimals: u32,
        minimum_balance: Decimal,
    ) -> Self {
        Self {
            ledger,
            mint,
            decimals,
            minimum_balance,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one distribution attempt end to end.
    ///
    /// Returns `Ok(Skipped { .. })` when the balance is under the minimum
    /// threshold. Terminal failures are logged with the full
    /// recipient/share context before propagating, so an operator can
    /// re-run the distribution by hand.
    pub async fn distribute(
        &self,
        request: &DistributionRequest,
    ) -> Result<DistributionOutcome, DistributionError> {
        let logger = StructuredLogger::new_attempt();
        metrics().distributions_attempted.inc();

        match self.try_distribute(request, &logger).await {
            Ok(outcome) => {
                match &outcome {
                    DistributionOutcome::Completed { .. } => {
                        metrics().distributions_completed.inc()
                    }
                    DistributionOutcome::Skipped { .. } => metrics().distributions_skipped.inc(),
                }
                Ok(outcome)
            }
            Err(err) => {
                metrics().distributions_failed.inc();
                logger.log_terminal_failure(&err, &request.recipients);
                Err(err)
            }
        }
    }

    async fn try_distribute(
        &self,
        request: &DistributionRequest,
        logger: &StructuredLogger,
    ) -> Result<DistributionOutcome, DistributionError> {
        // VALIDATING: fatal before any ledger interaction
        validate_shares(&request.recipients)?;

        let source_pubkey = request.source.pubkey();
        logger.log_attempt_started(&source_pubkey, request.recipients.len());

        // ALLOCATING
        let balance = self.ledger.get_token_balance(&source_pubkey).await?;
        if balance < self.minimum_balance {
            logger.log_skip(balance, self.minimum_balance);
            return Ok(DistributionOutcome::Skipped {
                balance,
                minimum: self.minimum_balance,
            });
        }
        let allocation = allocate(balance, self.decimals, &request.recipients)?;
        logger.log_allocation(balance, allocation.total_minor_units);

        // BUILDING
        let steps = plan_transfer_steps(self.ledger.as_ref(), &self.mint, &allocation).await?;
        let mut tx = build_distribution_transaction(
            &steps,
            &source_pubkey,
            &request.fee_payer.pubkey(),
            &self.mint,
            self.decimals,
        )?;
        let blockhash = self.ledger.latest_blockhash().await?;
        let signers = dedup_signers(&request.source, &request.fee_payer);
        tx.try_sign(&signers, blockhash)
            .map_err(|e| DistributionError::SignerMismatch(e.to_string()))?;

        // SUBMITTING: the signed transaction is fixed; only resubmission loops
        let started = Instant::now();
        let signature = submit_with_retry(self.ledger.as_ref(), &tx, &self.retry).await?;
        metrics()
            .submit_latency
            .observe(started.elapsed().as_secs_f64());

        logger.log_completed(&signature, allocation.total_minor_units, steps.len());
        Ok(DistributionOutcome::Completed {
            signature,
            total_minor_units: allocation.total_minor_units,
            recipients: steps.len(),
        })
    }

    /// Transfer a fixed whole-unit amount to a single recipient.
    ///
    /// Used by the claim/drop flow: same provisioning pairing, builder and
    /// retry policy as a full distribution, but the amount is given
    /// instead of derived from the live balance. `sol_drop` (whole SOL)
    /// adds a lamport transfer to the recipient in the same transaction so
    /// a fresh wallet can pay its own fees afterwards.
    pub async fn send_single(
        &self,
        source: &Arc<Keypair>,
        fee_payer: &Arc<Keypair>,
        recipient: Pubkey,
        amount: Decimal,
        sol_drop: Decimal,
    ) -> Result<Signature, DistributionError> {
        use rust_decimal::prelude::ToPrimitive;

        if amount.is_sign_negative() {
            return Err(DistributionError::configuration(format!(
                "transfer amount must be non-negative, got {amount}"
            )));
        }
        if sol_drop.is_sign_negative() {
            return Err(DistributionError::configuration(format!(
                "drop amount must be non-negative, got {sol_drop}"
            )));
        }
        let scale = Decimal::from(10u64.pow(self.decimals));
        let minor_units = (amount * scale)
            .floor()
            .to_u64()
            .ok_or_else(|| DistributionError::internal("scaled amount does not fit in u64"))?;
        let lamports = (sol_drop * Decimal::from(LAMPORTS_PER_SOL))
            .floor()
            .to_u64()
            .ok_or_else(|| DistributionError::internal("drop amount does not fit in u64"))?;
        let gas_lamports = (lamports > 0).then_some(lamports);

        let token_account =
            spl_associated_token_account::get_associated_token_address(&recipient, &self.mint);
        let exists = self.ledger.account_exists(&token_account).await?;
        let step = super::provisioning::TransferStep {
            recipient,
            token_account,
            amount: minor_units,
            needs_creation: !exists,
        };

        let mut tx = build_claim_transaction(
            &step,
            &source.pubkey(),
            &fee_payer.pubkey(),
            &self.mint,
            self.decimals,
            gas_lamports,
        )?;
        let blockhash = self.ledger.latest_blockhash().await?;
        let signers = dedup_signers(source, fee_payer);
        tx.try_sign(&signers, blockhash)
            .map_err(|e| DistributionError::SignerMismatch(e.to_string()))?;

        let signature = submit_with_retry(self.ledger.as_ref(), &tx, &self.retry).await?;
        info!(
            recipient = %recipient,
            amount = %amount,
            sol_drop = %sol_drop,
            signature = %signature,
            "single transfer submitted"
        );
        Ok(signature)
    }
}
