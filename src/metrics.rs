//! Metrics collection and export module

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub distributions_attempted: IntCounter,
    pub distributions_completed: IntCounter,
    pub distributions_skipped: IntCounter,
    pub distributions_failed: IntCounter,
    pub submit_retries: IntCounter,
    pub claims_recorded: IntCounter,

    // Histograms
    pub submit_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let distributions_attempted = IntCounter::with_opts(Opts::new(
            "distributions_attempted_total",
            "Distribution attempts started",
        ))?;

        let distributions_completed = IntCounter::with_opts(Opts::new(
            "distributions_completed_total",
            "Distributions that broadcast successfully",
        ))?;

        let distributions_skipped = IntCounter::with_opts(Opts::new(
            "distributions_skipped_total",
            "Distributions skipped for balance under the minimum",
        ))?;

        let distributions_failed = IntCounter::with_opts(Opts::new(
            "distributions_failed_total",
            "Distributions that failed terminally",
        ))?;

        let submit_retries = IntCounter::with_opts(Opts::new(
            "submit_retries_total",
            "Transient submission failures that triggered a retry",
        ))?;

        let claims_recorded = IntCounter::with_opts(Opts::new(
            "claims_recorded_total",
            "Claim records appended to the wallet registry",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "submit_latency_seconds",
                "Time from first broadcast to accepted signature",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0, 600.0]),
        )?;

        registry.register(Box::new(distributions_attempted.clone()))?;
        registry.register(Box::new(distributions_completed.clone()))?;
        registry.register(Box::new(distributions_skipped.clone()))?;
        registry.register(Box::new(distributions_failed.clone()))?;
        registry.register(Box::new(submit_retries.clone()))?;
        registry.register(Box::new(claims_recorded.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;

        Ok(Self {
            registry,
            distributions_attempted,
            distributions_completed,
            distributions_skipped,
            distributions_failed,
            submit_retries,
            claims_recorded,
            submit_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_cleanly() {
        let m = Metrics::new().unwrap();
        m.distributions_attempted.inc();
        assert_eq!(m.distributions_attempted.get(), 1);
        assert_eq!(m.registry().gather().len(), 7);
    }
}
