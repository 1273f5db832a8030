//! Submission with bounded fixed-delay retry
//!
//! Broadcasts the already-signed transaction and, on retryable failure,
//! resubmits the identical bytes after a fixed delay until the attempt
//! bound is exhausted. The transaction is fixed at build time: re-deriving
//! amounts from a possibly-changed live balance between retries would
//! desynchronize the signed intent from actual ledger state. Fatal errors
//! short-circuit immediately.

use std::time::Duration;

use solana_sdk::{signature::Signature, transaction::Transaction};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::errors::DistributionError;
use crate::ledger::LedgerClient;
use crate::metrics::metrics;

/// Retry bounds for transaction submission.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial one
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Submit `tx` according to `policy`, returning its signature on success.
///
/// Only errors classified retryable loop; the last submission error is
/// surfaced once attempts are exhausted.
pub async fn submit_with_retry(
    ledger: &dyn LedgerClient,
    tx: &Transaction,
    policy: &RetryPolicy,
) -> Result<Signature, DistributionError> {
    if policy.max_attempts == 0 {
        return Err(DistributionError::configuration(
            "retry policy allows zero attempts",
        ));
    }

    let mut last_error = None;
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            debug!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                "resubmitting transaction"
            );
        }

        match ledger.send_transaction(tx).await {
            Ok(signature) => {
                if attempt > 0 {
                    debug!(
                        attempts = attempt + 1,
                        signature = %signature,
                        "submission succeeded after retry"
                    );
                }
                return Ok(signature);
            }
            Err(err) if !err.is_retryable() => {
                warn!(error = %err, "fatal submission error, not retrying");
                return Err(err);
            }
            Err(err) => {
                metrics().submit_retries.inc();
                if attempt + 1 < policy.max_attempts {
                    debug!(
                        attempt = attempt + 1,
                        delay_secs = policy.delay.as_secs(),
                        error = %err,
                        "transient submission error, backing off"
                    );
                    last_error = Some(err);
                    sleep(policy.delay).await;
                } else {
                    warn!(
                        attempts = attempt + 1,
                        error = %err,
                        "all submission attempts exhausted"
                    );
                    last_error = Some(err);
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| DistributionError::internal("retry exhausted without an error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::MockLedger;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::system_instruction;

    fn test_transaction() -> Transaction {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        Transaction::new_with_payer(&[ix], Some(&payer))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_fixed_delays() {
        let ledger = MockLedger::new();
        ledger.fail_submissions(2, "node is behind").await;
        let expected = ledger.next_signature().await;

        let policy = RetryPolicy::default();
        let tx = test_transaction();

        let started = tokio::time::Instant::now();
        let signature = submit_with_retry(&ledger, &tx, &policy).await.unwrap();

        // Two transient failures, then success: exactly 2 x 60s of delay.
        assert_eq!(signature, expected);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
        assert_eq!(ledger.sent_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_last_error() {
        let ledger = MockLedger::new();
        ledger.fail_submissions(100, "unreachable").await;

        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let result = submit_with_retry(&ledger, &test_transaction(), &policy).await;

        assert!(matches!(result, Err(DistributionError::Submission(_))));
        assert_eq!(ledger.sent_count().await, 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let ledger = MockLedger::new();
        ledger
            .fail_submission_fatal(DistributionError::SignerMismatch("missing key".into()))
            .await;

        let policy = RetryPolicy::new(10, Duration::from_secs(60));
        let result = submit_with_retry(&ledger, &test_transaction(), &policy).await;

        assert!(matches!(result, Err(DistributionError::SignerMismatch(_))));
        assert_eq!(ledger.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let ledger = MockLedger::new();
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let result = submit_with_retry(&ledger, &test_transaction(), &policy).await;
        assert!(matches!(result, Err(DistributionError::Configuration(_))));
    }
}
