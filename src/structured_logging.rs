//! Structured logging setup and per-transfer logger
//!
//! Known-benign chatter from third-party clients (rate-limit retry notices and
//! the like) is dropped by a `NoiseFilter` layer driven by a configurable
//! predicate. Errors always pass.

use crate::config::LoggingConfig;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

type SuppressFn = dyn Fn(&Level, &str, &str) -> bool + Send + Sync;

/// Drops events for which the predicate returns `true` (never `ERROR`)
#[derive(Clone)]
pub struct NoiseFilter {
    predicate: Arc<SuppressFn>,
}

impl NoiseFilter {
    /// Predicate over `(level, target, message)`
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Level, &str, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Suppress events whose message contains any of `patterns`
    pub fn from_patterns(patterns: Vec<String>) -> Self {
        Self::new(move |_, _, message| patterns.iter().any(|p| message.contains(p.as_str())))
    }

    pub fn should_suppress(&self, level: &Level, target: &str, message: &str) -> bool {
        *level != Level::ERROR && (self.predicate)(level, target, message)
    }
}

impl std::fmt::Debug for NoiseFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseFilter").finish_non_exhaustive()
    }
}

/// Collects the `message` field (and any string fields) of an event
#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        if field.name() != "message" {
            let _ = write!(self.message, "{}=", field.name());
        }
        self.message.push_str(value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if !self.message.is_empty() {
            self.message.push(' ');
        }
        if field.name() != "message" {
            let _ = write!(self.message, "{}=", field.name());
        }
        let _ = write!(self.message, "{:?}", value);
    }
}

impl<S: Subscriber> Layer<S> for NoiseFilter {
    fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
        let metadata = event.metadata();
        if *metadata.level() == Level::ERROR {
            return true;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        !self.should_suppress(metadata.level(), metadata.target(), &visitor.message)
    }
}

/// Initialize logging subsystem
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose {
        "gasless_transfer=debug,info".to_string()
    } else {
        config.level.clone()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let noise = NoiseFilter::from_patterns(config.suppressed_patterns.clone());

    let registry = tracing_subscriber::registry().with(env_filter).with(noise);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Structured logger for one logical transfer
#[derive(Debug, Clone)]
pub struct TransferLogger {
    context_id: String,
}

impl TransferLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    pub fn log_transfer_start(&self, asset: &str, recipient: &str, network: &str) {
        tracing::info!(
            context_id = %self.context_id,
            asset = %asset,
            recipient = %recipient,
            network = %network,
            "Starting transfer"
        );
    }

    pub fn log_attempt(&self, attempt: u32, instructions: usize, with_simulation: bool) {
        tracing::info!(
            context_id = %self.context_id,
            attempt = attempt + 1,
            instructions = %instructions,
            with_simulation = %with_simulation,
            "Submitting transaction"
        );
    }

    pub fn log_retry(&self, attempt: u32, error_class: &str, wait_ms: u64, error: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            attempt = attempt + 1,
            error_class = %error_class,
            wait_ms = %wait_ms,
            error = %error,
            "Transient failure, retrying"
        );
    }

    pub fn log_success(&self, signature: &str, attempts: u32, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            signature = %signature,
            attempts = %attempts,
            latency_ms = %latency_ms,
            "Transfer confirmed"
        );
    }

    pub fn log_failure(&self, code: &str, error: &str, attempts: u32, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            code = %code,
            error = %error,
            attempts = %attempts,
            latency_ms = %latency_ms,
            "Transfer failed"
        );
    }

    pub fn log_blockhash_refresh(&self, ok: bool, detail: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            ok = %ok,
            detail = %detail,
            "Proactive blockhash refresh"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLayer(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_should_suppress_respects_error_level() {
        let filter = NoiseFilter::from_patterns(vec!["429 Too Many Requests".to_string()]);
        assert!(filter.should_suppress(&Level::WARN, "solana_client", "429 Too Many Requests, retrying"));
        assert!(!filter.should_suppress(&Level::ERROR, "solana_client", "429 Too Many Requests"));
        assert!(!filter.should_suppress(&Level::WARN, "solana_client", "connection reset"));
    }

    #[test]
    fn test_predicate_sees_target() {
        let filter = NoiseFilter::new(|_, target, _| target.starts_with("noisy"));
        assert!(filter.should_suppress(&Level::INFO, "noisy::client", "anything"));
        assert!(!filter.should_suppress(&Level::INFO, "quiet", "anything"));
    }

    #[test]
    fn test_layer_drops_matching_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry()
            .with(NoiseFilter::from_patterns(vec!["Retrying after".to_string()]))
            .with(CountingLayer(count.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("Server responded with 429. Retrying after 500ms");
            tracing::warn!("genuine warning");
            tracing::error!("Retrying after fatal error");
        });

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
