//! Retry timing resolved for one network, plus per-attempt state

use super::classify::ErrorClass;
use crate::config::RetryConfig;
use crate::types::Network;
use std::time::Duration;

/// Retry constants for the active network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTiming {
    pub max_retries: u32,
    pub stale_retry_delay: Duration,
    pub stale_extended_delay: Duration,
    pub index_ceiling: Duration,
    pub poll_interval: Duration,
    pub rate_limit_backoff: Duration,
    pub identity_recheck: Duration,
}

impl RetryTiming {
    pub fn for_network(config: &RetryConfig, network: Network) -> Self {
        let (stale_extended, ceiling) = match network {
            Network::Test => (config.stale_extended_delay_test_ms, config.index_ceiling_test_ms),
            Network::Production => (
                config.stale_extended_delay_production_ms,
                config.index_ceiling_production_ms,
            ),
        };

        Self {
            max_retries: config.max_retries,
            stale_retry_delay: Duration::from_millis(config.stale_retry_delay_ms),
            stale_extended_delay: Duration::from_millis(stale_extended),
            index_ceiling: Duration::from_millis(ceiling),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            identity_recheck: Duration::from_millis(config.identity_recheck_ms),
        }
    }

    /// Total submission calls allowed for one transfer
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before resubmitting after a stale failure
    pub fn stale_delay(&self, during_chunk_creation: bool, relay_retries_exhausted: bool) -> Duration {
        if during_chunk_creation || relay_retries_exhausted {
            self.stale_extended_delay
        } else {
            self.stale_retry_delay
        }
    }

    /// Indexing ceiling for a 0-based attempt, growing linearly
    pub fn index_ceiling_for(&self, attempt: u32) -> Duration {
        self.index_ceiling.saturating_mul(attempt.saturating_add(1))
    }

    /// Poll iterations that fit in `ceiling` (at least one)
    pub fn poll_iterations(&self, ceiling: Duration) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        let iterations = (ceiling.as_millis() / interval).max(1);
        u32::try_from(iterations).unwrap_or(u32::MAX)
    }
}

impl Default for RetryTiming {
    fn default() -> Self {
        Self::for_network(&RetryConfig::default(), Network::Test)
    }
}

/// State of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAttempt {
    /// 0-based
    pub attempt_number: u32,
    pub last_error_class: Option<ErrorClass>,
    pub wait_before_retry: Duration,
}

impl SubmissionAttempt {
    pub fn first() -> Self {
        Self {
            attempt_number: 0,
            last_error_class: None,
            wait_before_retry: Duration::ZERO,
        }
    }

    /// Fresh attempt following a classified failure
    pub fn next(&self, class: ErrorClass, wait: Duration) -> Self {
        Self {
            attempt_number: self.attempt_number + 1,
            last_error_class: Some(class),
            wait_before_retry: wait,
        }
    }

    /// Whether another submission still fits in the budget
    pub fn has_retry_left(&self, timing: &RetryTiming) -> bool {
        self.attempt_number < timing.max_retries
    }
}
