//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub transfers_total: IntCounter,
    pub transfers_success: IntCounter,
    pub transfers_failed: IntCounter,
    pub submission_attempts: IntCounter,
    pub transfer_retries: IntCounterVec,
    pub index_poll_iterations: IntCounter,
    pub rate_limited_responses: IntCounter,

    // Histograms
    pub transfer_latency: Histogram,
    pub rpc_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transfers_total = IntCounter::with_opts(Opts::new(
            "transfers_total",
            "Total number of transfers attempted",
        ))?;

        let transfers_success = IntCounter::with_opts(Opts::new(
            "transfers_success",
            "Number of transfers confirmed by the relay",
        ))?;

        let transfers_failed = IntCounter::with_opts(Opts::new(
            "transfers_failed",
            "Number of transfers ending in a terminal error",
        ))?;

        let submission_attempts = IntCounter::with_opts(Opts::new(
            "submission_attempts_total",
            "Number of sign-and-send calls made to the relay",
        ))?;

        let transfer_retries = IntCounterVec::new(
            Opts::new("transfer_retries_total", "Retries by error class"),
            &["class"],
        )?;

        let index_poll_iterations = IntCounter::with_opts(Opts::new(
            "index_poll_iterations_total",
            "Account existence checks made while waiting for indexing",
        ))?;

        let rate_limited_responses = IntCounter::with_opts(Opts::new(
            "rate_limited_responses_total",
            "RPC responses rejected with a rate limit",
        ))?;

        let transfer_latency = Histogram::with_opts(
            HistogramOpts::new("transfer_latency_seconds", "End-to-end transfer latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;

        // Register all metrics
        registry.register(Box::new(transfers_total.clone()))?;
        registry.register(Box::new(transfers_success.clone()))?;
        registry.register(Box::new(transfers_failed.clone()))?;
        registry.register(Box::new(submission_attempts.clone()))?;
        registry.register(Box::new(transfer_retries.clone()))?;
        registry.register(Box::new(index_poll_iterations.clone()))?;
        registry.register(Box::new(rate_limited_responses.clone()))?;
        registry.register(Box::new(transfer_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            transfers_total,
            transfers_success,
            transfers_failed,
            submission_attempts,
            transfer_retries,
            index_poll_iterations,
            rate_limited_responses,
            transfer_latency,
            rpc_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_retry(&self, class: &str) {
        self.transfer_retries.with_label_values(&[class]).inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render_contains_counters() {
        let m = Metrics::new().unwrap();
        m.transfers_total.inc();
        m.record_retry("stale_transaction");

        let text = m.render().unwrap();
        assert!(text.contains("transfers_total 1"));
        assert!(text.contains("transfer_retries_total{class=\"stale_transaction\"} 1"));
    }

    #[test]
    fn test_global_metrics_is_singleton() {
        let a = metrics() as *const Metrics;
        let b = metrics() as *const Metrics;
        assert_eq!(a, b);
    }

    #[test]
    fn test_timer_observes() {
        let m = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&m.rpc_latency);
        assert_eq!(m.rpc_latency.get_sample_count(), 1);
    }
}
