//! Structured logging for the distribution pipeline

use rust_decimal::Decimal;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use uuid::Uuid;

use crate::distributor::errors::DistributionError;
use crate::distributor::shares::Recipient;

/// Structured logger carrying a per-attempt context id
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    /// Fresh logger for one distribution attempt
    pub fn new_attempt() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn log_attempt_started(&self, source: &Pubkey, recipients: usize) {
        tracing::info!(
            context_id = %self.context_id,
            source = %source,
            recipients = %recipients,
            "Distribution attempt started"
        );
    }

    pub fn log_skip(&self, balance: Decimal, minimum: Decimal) {
        tracing::info!(
            context_id = %self.context_id,
            balance = %balance,
            minimum = %minimum,
            "Balance under minimum sendable threshold, skipping distribution"
        );
    }

    pub fn log_allocation(&self, balance: Decimal, total_minor_units: u64) {
        tracing::info!(
            context_id = %self.context_id,
            balance = %balance,
            total_minor_units = %total_minor_units,
            "Allocation computed"
        );
    }

    pub fn log_completed(&self, signature: &Signature, total_minor_units: u64, recipients: usize) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            total_minor_units = %total_minor_units,
            recipients = %recipients,
            "Distribution completed"
        );
    }

    /// Terminal failures carry the full recipient/share context so a human
    /// can re-run the distribution by hand. Funds-affecting errors must
    /// never fail silently.
    pub fn log_terminal_failure(&self, error: &DistributionError, recipients: &[Recipient]) {
        let context = serde_json::to_string(recipients).unwrap_or_else(|_| "<unserializable>".into());
        tracing::error!(
            context_id = %self.context_id,
            error = %error,
            category = %error.category(),
            recipients = %context,
            "Distribution failed"
        );
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_ids_are_unique() {
        let a = StructuredLogger::new_attempt();
        let b = StructuredLogger::new_attempt();
        assert_ne!(a.context_id(), b.context_id());
    }
}
