//! Observability module for correlation and progress reporting

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::time::Duration;
use uuid::Uuid;

/// Correlation ID for tracking one logical transfer across retries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Advisory progress of a transfer, for UI status lines
#[derive(Debug, Clone, PartialEq)]
pub enum TransferProgress {
    Validating,
    Building { attempt: u32 },
    Submitting { attempt: u32, with_simulation: bool },
    Retrying { attempt: u32, reason: &'static str, wait: Duration },
    WaitingForIndexing { account: Option<Pubkey>, ceiling: Duration },
    Succeeded { signature: Signature },
    Failed { code: &'static str },
}

/// Receiver of progress notifications
///
/// Implementations must return quickly; the submission loop does not wait on
/// them and ignores anything they do.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, correlation_id: &CorrelationId, progress: TransferProgress);
}

/// Default sink: progress as debug-level tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn notify(&self, correlation_id: &CorrelationId, progress: TransferProgress) {
        tracing::debug!(correlation_id = %correlation_id, progress = ?progress, "Transfer progress");
    }
}
