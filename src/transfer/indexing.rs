//! Bounded wait for an account to show up on the RPC's read replicas

use super::timing::RetryTiming;
use crate::metrics::metrics;
use crate::rpc_manager::{LedgerRpc, RpcManagerError};
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Found { iterations: u32 },
    NotFound { iterations: u32 },
}

impl PollOutcome {
    pub fn found(&self) -> bool {
        matches!(self, PollOutcome::Found { .. })
    }

    pub fn iterations(&self) -> u32 {
        match self {
            PollOutcome::Found { iterations } | PollOutcome::NotFound { iterations } => *iterations,
        }
    }
}

enum Check {
    Visible,
    NotYet,
    RateLimited,
    /// The RPC rejected the query outright; polling again cannot help
    Unavailable(RpcManagerError),
}

async fn check_once(rpc: &dyn LedgerRpc, address: &Pubkey) -> Check {
    let mut rate_limited = false;
    for commitment in [CommitmentLevel::Finalized, CommitmentLevel::Confirmed] {
        match rpc.get_account_info(address, commitment).await {
            Ok(Some(_)) => return Check::Visible,
            Ok(None) => {}
            Err(e) if e.is_rate_limited() => {
                metrics().rate_limited_responses.inc();
                rate_limited = true;
            }
            Err(e) if e.is_retryable() => {
                debug!(account = %address, error = %e, "Indexing check failed")
            }
            Err(e) => return Check::Unavailable(e),
        }
    }
    if rate_limited {
        Check::RateLimited
    } else {
        Check::NotYet
    }
}

/// Poll `address` once per `poll_interval` for at most `ceiling`
///
/// A rate-limited iteration pauses for `rate_limit_backoff` instead of the
/// regular interval and still counts toward the iteration cap.
pub async fn wait_for_account(
    rpc: &dyn LedgerRpc,
    address: &Pubkey,
    ceiling: Duration,
    timing: &RetryTiming,
) -> PollOutcome {
    let max_iterations = timing.poll_iterations(ceiling);

    for iteration in 1..=max_iterations {
        metrics().index_poll_iterations.inc();

        let pause = match check_once(rpc, address).await {
            Check::Visible => {
                info!(account = %address, iterations = iteration, "Account indexed");
                return PollOutcome::Found {
                    iterations: iteration,
                };
            }
            Check::RateLimited => {
                debug!(account = %address, iteration, "Rate limited while polling, backing off");
                timing.rate_limit_backoff
            }
            Check::NotYet => timing.poll_interval,
            Check::Unavailable(e) => {
                warn!(account = %address, iteration, error = %e, "Indexing check rejected, giving up polling");
                return PollOutcome::NotFound {
                    iterations: iteration,
                };
            }
        };

        if iteration < max_iterations {
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        account = %address,
        iterations = max_iterations,
        ceiling_ms = ceiling.as_millis() as u64,
        "Account still not indexed"
    );
    PollOutcome::NotFound {
        iterations: max_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockLedgerRpc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_found_after_delay() {
        let rpc = MockLedgerRpc::new();
        let chunk = Pubkey::new_unique();
        // two lookups per iteration: visible on the third iteration
        rpc.add_account_after(chunk, 4);

        let timing = RetryTiming::default();
        let started = Instant::now();
        let outcome = wait_for_account(&rpc, &chunk, Duration::from_secs(15), &timing).await;

        assert_eq!(outcome, PollOutcome::Found { iterations: 3 });
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_when_never_found() {
        let rpc = MockLedgerRpc::new();
        let timing = RetryTiming::default();
        let started = Instant::now();

        let outcome = wait_for_account(&rpc, &Pubkey::new_unique(), Duration::from_secs(5), &timing).await;

        assert_eq!(outcome, PollOutcome::NotFound { iterations: 5 });
        // finalized + confirmed per iteration
        assert_eq!(rpc.account_query_count(), 10);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_counts_toward_cap() {
        let rpc = MockLedgerRpc::new();
        rpc.fail_account_queries_with("429 Too Many Requests");
        let timing = RetryTiming::default();
        let started = Instant::now();

        let outcome = wait_for_account(&rpc, &Pubkey::new_unique(), Duration::from_secs(3), &timing).await;

        assert!(!outcome.found());
        assert_eq!(outcome.iterations(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_keep_polling() {
        let rpc = MockLedgerRpc::new();
        rpc.fail_account_queries_with("error sending request: connection refused");
        let timing = RetryTiming::default();
        let started = Instant::now();

        let outcome = wait_for_account(&rpc, &Pubkey::new_unique(), Duration::from_secs(3), &timing).await;

        assert_eq!(outcome, PollOutcome::NotFound { iterations: 3 });
        assert_eq!(rpc.account_query_count(), 6);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_query_stops_polling() {
        let rpc = MockLedgerRpc::new();
        rpc.fail_account_queries_with("Invalid param: WrongSize");
        let timing = RetryTiming::default();
        let started = Instant::now();

        let outcome = wait_for_account(&rpc, &Pubkey::new_unique(), Duration::from_secs(15), &timing).await;

        assert_eq!(outcome, PollOutcome::NotFound { iterations: 1 });
        assert_eq!(rpc.account_query_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
