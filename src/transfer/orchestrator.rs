//! Transfer submission state machine
//!
//! One call to [`TransferOrchestrator::transfer`] is one logical transfer:
//! validate, build, submit through the relay, and recover from the two known
//! transient failure classes (stale transaction, account not yet indexed)
//! within a bounded budget of `max_retries + 1` submissions. All retry state
//! is local to the call; nothing is queued or shared between transfers.
//!
//! The instruction plan is rebuilt for every attempt. The relay mints a new
//! intermediate chunk (with a new nonce) on each call, so reusing a plan would
//! resubmit against stale relay state.

use super::classify::{classify_error, identify_missing_account, ErrorClass, MissingAccount, TransferParties};
use super::errors::TransferError;
use super::indexing::wait_for_account;
use super::timing::{RetryTiming, SubmissionAttempt};
use super::validation::validate_transfer;
use crate::metrics::{metrics, Timer};
use crate::observability::{CorrelationId, ProgressSink, TracingProgress, TransferProgress};
use crate::registry::AssetRegistry;
use crate::rpc_manager::{BlockhashSource, LedgerRpc};
use crate::structured_logging::TransferLogger;
use crate::tx_builder::{
    holding_account, probe_account, LedgerInstructionBuilder, TransferInstructionBuilder,
};
use crate::types::{
    AccountPresence, AssetKind, EchoedTransaction, Network, TransferRequest, TransferResult,
    ValidatedTransfer,
};
use crate::wallet::{RelayFailure, SignAndSendRequest, SmartWallet, TransactionOptions};
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do after a failed submission
enum Recovery {
    Retry {
        wait: Duration,
        refresh_blockhash: bool,
    },
    Fail(TransferError),
}

/// Per-call bookkeeping
struct TransferContext {
    correlation_id: CorrelationId,
    logger: TransferLogger,
    attempts: u32,
}

pub struct TransferOrchestrator {
    network: Network,
    registry: AssetRegistry,
    timing: RetryTiming,
    wallet: Arc<dyn SmartWallet>,
    rpc: Arc<dyn LedgerRpc>,
    blockhash_source: Arc<dyn BlockhashSource>,
    builder: Arc<dyn TransferInstructionBuilder>,
    progress: Arc<dyn ProgressSink>,
}

impl TransferOrchestrator {
    pub fn new(
        network: Network,
        registry: AssetRegistry,
        timing: RetryTiming,
        wallet: Arc<dyn SmartWallet>,
        rpc: Arc<dyn LedgerRpc>,
        blockhash_source: Arc<dyn BlockhashSource>,
    ) -> Self {
        let builder = Arc::new(LedgerInstructionBuilder::new(Arc::clone(&rpc), registry.clone()));
        Self {
            network,
            registry,
            timing,
            wallet,
            rpc,
            blockhash_source,
            builder,
            progress: Arc::new(TracingProgress),
        }
    }

    /// Replace the default ledger-backed instruction builder
    pub fn with_builder(mut self, builder: Arc<dyn TransferInstructionBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Replace the default tracing progress sink
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn timing(&self) -> &RetryTiming {
        &self.timing
    }

    /// Run one logical transfer to a terminal outcome
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferResult, TransferError> {
        let correlation_id = CorrelationId::new();
        let mut ctx = TransferContext {
            logger: TransferLogger::new(correlation_id.to_string()),
            correlation_id,
            attempts: 0,
        };
        let timer = Timer::new();
        metrics().transfers_total.inc();

        ctx.logger.log_transfer_start(
            request.asset.symbol(),
            request.recipient.trim(),
            request.network.as_str(),
        );

        let outcome = self.run(request, &mut ctx).await;

        timer.observe_duration(&metrics().transfer_latency);
        let latency_ms = (timer.elapsed_secs() * 1000.0) as u64;

        match &outcome {
            Ok(result) => {
                metrics().transfers_success.inc();
                ctx.logger
                    .log_success(&result.signature.to_string(), ctx.attempts, latency_ms);
                self.notify(
                    &ctx,
                    TransferProgress::Succeeded {
                        signature: result.signature,
                    },
                );
            }
            Err(e) => {
                metrics().transfers_failed.inc();
                ctx.logger
                    .log_failure(e.code(), &e.to_string(), ctx.attempts, latency_ms);
                self.notify(&ctx, TransferProgress::Failed { code: e.code() });
            }
        }

        outcome
    }

    async fn run(
        &self,
        request: &TransferRequest,
        ctx: &mut TransferContext,
    ) -> Result<TransferResult, TransferError> {
        self.notify(ctx, TransferProgress::Validating);

        let wallet_network = self.wallet.network();
        if wallet_network != self.network {
            return Err(TransferError::Configuration(format!(
                "the wallet session is on {} but transfers are configured for {}",
                wallet_network, self.network
            )));
        }

        let sender = self.resolve_sender(request).await;
        let validated = validate_transfer(request, sender, &self.registry)?;

        let recipient_presence =
            probe_account(self.rpc.as_ref(), &validated.recipient, CommitmentLevel::Confirmed).await;
        let simulation_hint = recipient_presence.exists().then_some(self.network);
        debug!(
            correlation_id = %ctx.correlation_id,
            recipient = %validated.recipient,
            presence = ?recipient_presence,
            "Recipient presence checked"
        );

        let parties = self.parties(&validated);
        self.refresh_blockhash(ctx).await;

        let mut attempt = SubmissionAttempt::first();
        let mut simulation_dropped = false;

        loop {
            ctx.attempts = attempt.attempt_number + 1;
            self.notify(
                ctx,
                TransferProgress::Building {
                    attempt: attempt.attempt_number,
                },
            );

            let plan = self.builder.build(&validated).await?;

            let cluster_simulation = if simulation_dropped { None } else { simulation_hint };
            let with_simulation = cluster_simulation.is_some();
            self.notify(
                ctx,
                TransferProgress::Submitting {
                    attempt: attempt.attempt_number,
                    with_simulation,
                },
            );
            ctx.logger
                .log_attempt(attempt.attempt_number, plan.instructions.len(), with_simulation);
            metrics().submission_attempts.inc();

            let submission = SignAndSendRequest {
                plan_id: plan.id,
                instructions: plan.instructions,
                options: TransactionOptions {
                    fee_token: validated.fee_asset,
                    cluster_simulation,
                },
            };

            let failure = match self.wallet.sign_and_send_transaction(submission).await {
                Ok(signature) => {
                    return Ok(TransferResult {
                        signature,
                        echoed: EchoedTransaction {
                            asset: request.asset,
                            amount: request.amount,
                            recipient: validated.recipient.to_string(),
                            network: request.network,
                        },
                    });
                }
                Err(failure) => failure,
            };

            let class = classify_error(&failure.message, failure.stack.as_deref());
            let recovery = self
                .recover(
                    ctx,
                    &attempt,
                    &class,
                    failure,
                    &parties,
                    recipient_presence,
                    &mut simulation_dropped,
                )
                .await;

            match recovery {
                Recovery::Fail(err) => return Err(err),
                Recovery::Retry {
                    wait,
                    refresh_blockhash,
                } => {
                    metrics().record_retry(class.label());
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    if refresh_blockhash {
                        self.refresh_blockhash(ctx).await;
                    }
                    attempt = attempt.next(class, wait);
                }
            }
        }
    }

    /// Decide how to recover from `failure`, polling for indexing when needed
    #[allow(clippy::too_many_arguments)]
    async fn recover(
        &self,
        ctx: &TransferContext,
        attempt: &SubmissionAttempt,
        class: &ErrorClass,
        failure: RelayFailure,
        parties: &TransferParties,
        recipient_presence: AccountPresence,
        simulation_dropped: &mut bool,
    ) -> Recovery {
        let retry_left = attempt.has_retry_left(&self.timing);

        match class {
            ErrorClass::Unknown => {
                warn!(
                    correlation_id = %ctx.correlation_id,
                    error = %failure.message,
                    "Unclassified relay failure"
                );
                Recovery::Fail(TransferError::Relay(failure))
            }

            ErrorClass::StaleTransaction {
                during_chunk_creation,
                relay_retries_exhausted,
            } => {
                if !retry_left {
                    return Recovery::Fail(TransferError::StaleTransaction {
                        attempts: ctx.attempts,
                    });
                }
                let wait = self
                    .timing
                    .stale_delay(*during_chunk_creation, *relay_retries_exhausted);
                self.announce_retry(ctx, attempt, class.label(), wait, &failure);
                Recovery::Retry {
                    wait,
                    refresh_blockhash: true,
                }
            }

            ErrorClass::AccountNotIndexed {
                addresses,
                relay_marker,
            } => match identify_missing_account(addresses, *relay_marker, parties) {
                MissingAccount::Recipient => {
                    if *simulation_dropped || !retry_left {
                        return Recovery::Fail(TransferError::RecipientNotFound {
                            address: parties.recipient.to_string(),
                            presence: recipient_presence,
                            network: self.network,
                        });
                    }
                    *simulation_dropped = true;
                    let wait = self.timing.stale_retry_delay;
                    self.announce_retry(ctx, attempt, "recipient_not_found", wait, &failure);
                    Recovery::Retry {
                        wait,
                        refresh_blockhash: false,
                    }
                }

                MissingAccount::RelayManaged { address } => {
                    if !retry_left {
                        return Recovery::Fail(TransferError::AccountNotIndexed {
                            address: address.map(|a| a.to_string()),
                            attempts: ctx.attempts,
                            network: self.network,
                        });
                    }
                    let ceiling = self.timing.index_ceiling_for(attempt.attempt_number);
                    self.notify(
                        ctx,
                        TransferProgress::WaitingForIndexing {
                            account: address,
                            ceiling,
                        },
                    );
                    if let Some(address) = address {
                        // Only gauges indexing latency; the retry uses a new chunk
                        let outcome =
                            wait_for_account(self.rpc.as_ref(), &address, ceiling, &self.timing)
                                .await;
                        debug!(
                            correlation_id = %ctx.correlation_id,
                            account = %address,
                            found = outcome.found(),
                            iterations = outcome.iterations(),
                            "Indexing poll finished"
                        );
                    }
                    self.announce_retry(ctx, attempt, class.label(), ceiling, &failure);
                    Recovery::Retry {
                        wait: ceiling,
                        refresh_blockhash: false,
                    }
                }

                MissingAccount::Unidentified => {
                    warn!(
                        correlation_id = %ctx.correlation_id,
                        error = %failure.message,
                        "Missing account could not be identified, not retrying"
                    );
                    Recovery::Fail(TransferError::Relay(failure))
                }
            },
        }
    }

    fn announce_retry(
        &self,
        ctx: &TransferContext,
        attempt: &SubmissionAttempt,
        reason: &'static str,
        wait: Duration,
        failure: &RelayFailure,
    ) {
        ctx.logger.log_retry(
            attempt.attempt_number,
            reason,
            wait.as_millis() as u64,
            &failure.message,
        );
        self.notify(
            ctx,
            TransferProgress::Retrying {
                attempt: attempt.attempt_number + 1,
                reason,
                wait,
            },
        );
    }

    /// Sender from the request, else the wallet identity (re-checked once)
    async fn resolve_sender(&self, request: &TransferRequest) -> Option<Pubkey> {
        if let Some(sender) = request.sender {
            return Some(sender);
        }
        if let Some(address) = self.wallet.smart_wallet_address() {
            return Some(address);
        }
        debug!("Wallet identity not published yet, re-checking");
        tokio::time::sleep(self.timing.identity_recheck).await;
        self.wallet.smart_wallet_address()
    }

    fn parties(&self, transfer: &ValidatedTransfer) -> TransferParties {
        let (sender_holding, recipient_holding) = match transfer.asset {
            AssetKind::Native => (None, None),
            AssetKind::FungibleToken => {
                let mint = self.registry.token_mint();
                (
                    Some(holding_account(&transfer.sender, &mint)),
                    Some(holding_account(&transfer.recipient, &mint)),
                )
            }
        };
        TransferParties {
            sender: transfer.sender,
            sender_holding,
            recipient: transfer.recipient,
            recipient_holding,
            token_mint: self.registry.token_mint(),
        }
    }

    /// Best effort; failures are logged and ignored
    async fn refresh_blockhash(&self, ctx: &TransferContext) {
        match self.blockhash_source.latest_blockhash().await {
            Ok(latest) => ctx
                .logger
                .log_blockhash_refresh(true, &latest.blockhash.to_string()),
            Err(e) => ctx.logger.log_blockhash_refresh(false, &e.to_string()),
        }
    }

    fn notify(&self, ctx: &TransferContext, progress: TransferProgress) {
        self.progress.notify(&ctx.correlation_id, progress);
    }
}
