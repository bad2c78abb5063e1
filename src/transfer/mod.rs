//! Gasless transfer pipeline
//!
//! Validation, relay error classification, indexing waits and the submission
//! state machine that ties them together.

pub mod classify;
pub mod errors;
pub mod indexing;
pub mod orchestrator;
pub mod timing;
pub mod validation;

pub use classify::{classify_error, identify_missing_account, ErrorClass, MissingAccount, TransferParties};
pub use errors::TransferError;
pub use indexing::{wait_for_account, PollOutcome};
pub use orchestrator::TransferOrchestrator;
pub use timing::{RetryTiming, SubmissionAttempt};
pub use validation::validate_transfer;
