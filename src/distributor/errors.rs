//! Error types for the distribution engine
//!
//! One taxonomy covers the whole distribution lifecycle: share validation,
//! balance reads, account provisioning checks, transaction construction,
//! signing and submission. Errors carry enough context for an operator to
//! re-run a failed distribution by hand, and each variant is classified as
//! retryable or fatal so the submission loop never burns attempts on a
//! malformed transaction.

use rust_decimal::Decimal;
use thiserror::Error;

/// Error type for all distribution engine operations
#[derive(Error, Debug, Clone)]
pub enum DistributionError {
    /// Recipient shares do not sum to exactly 1
    ///
    /// Always fatal and raised before any ledger interaction. Shares are
    /// never silently renormalized: doing so would misallocate funds
    /// without operator visibility.
    #[error("invalid share distribution: shares sum to {sum}, expected 1")]
    InvalidShareDistribution {
        /// The computed sum of all recipient shares
        sum: Decimal,
    },

    /// Failed to read the source wallet's token balance
    #[error("balance query failed: {0}")]
    BalanceQuery(String),

    /// Transient failure while checking whether a token account exists
    #[error("account query failed (account={account}): {reason}")]
    AccountQuery {
        /// The account whose existence check failed
        account: String,
        /// Underlying read-path failure
        reason: String,
    },

    /// Failed to fetch a recent blockhash for signing
    #[error("blockhash error: {0}")]
    Blockhash(String),

    /// Broadcast rejected or timed out
    ///
    /// Retried per policy; becomes terminal only after the retry bound
    /// is exhausted.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Source and fee-payer keys inconsistent with what the transaction requires
    ///
    /// Programmer error, never retried.
    #[error("signer mismatch: {0}")]
    SignerMismatch(String),

    /// Configuration or validation error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal invariant violation or unexpected state
    #[error("internal error: {0}")]
    Internal(String),
}

impl DistributionError {
    /// Check if this error is potentially retryable
    ///
    /// Returns `true` if resubmitting the same attempt might succeed,
    /// `false` if the error is fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient ledger-facing failures
            Self::BalanceQuery(_) => true,
            Self::AccountQuery { .. } => true,
            Self::Blockhash(_) => true,
            Self::Submission(_) => true,

            // Fatal input or programmer errors
            Self::InvalidShareDistribution { .. } => false,
            Self::SignerMismatch(_) => false,
            Self::Configuration(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidShareDistribution { .. } => "shares",
            Self::BalanceQuery(_) => "balance",
            Self::AccountQuery { .. } => "account_query",
            Self::Blockhash(_) => "blockhash",
            Self::Submission(_) => "submission",
            Self::SignerMismatch(_) => "signer",
            Self::Configuration(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl DistributionError {
    /// Create an account query error for a specific account
    pub fn account_query(account: impl ToString, reason: impl Into<String>) -> Self {
        Self::AccountQuery {
            account: account.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a submission error
    pub fn submission(reason: impl Into<String>) -> Self {
        Self::Submission(reason.into())
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = DistributionError::InvalidShareDistribution { sum: dec!(1.00005) };
        assert_eq!(
            err.to_string(),
            "invalid share distribution: shares sum to 1.00005, expected 1"
        );

        let err = DistributionError::account_query("abc123", "connection refused");
        assert_eq!(
            err.to_string(),
            "account query failed (account=abc123): connection refused"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(DistributionError::BalanceQuery("timeout".into()).is_retryable());
        assert!(DistributionError::account_query("a", "timeout").is_retryable());
        assert!(DistributionError::Submission("blockhash not found".into()).is_retryable());
        assert!(DistributionError::Blockhash("no quorum".into()).is_retryable());

        assert!(!DistributionError::InvalidShareDistribution { sum: dec!(0.9) }.is_retryable());
        assert!(!DistributionError::SignerMismatch("missing fee payer".into()).is_retryable());
        assert!(!DistributionError::Configuration("bad mint".into()).is_retryable());
        assert!(!DistributionError::Internal("bug".into()).is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            DistributionError::InvalidShareDistribution { sum: dec!(2) }.category(),
            "shares"
        );
        assert_eq!(DistributionError::Submission("x".into()).category(), "submission");
        assert_eq!(DistributionError::SignerMismatch("x".into()).category(), "signer");
    }
}
