//! Transfer instruction builder
//!
//! Turns a validated transfer into the ordered instruction list the relay
//! signs and submits.
//!
//! ## Architecture
//!
//! - **errors**: builder error taxonomy
//! - **amounts**: human amount <-> base unit conversion (9 decimals native, 6 token)
//! - **accounts**: holding-account derivation and existence probes
//! - **instructions**: plan construction, ordering checks, and the
//!   `TransferInstructionBuilder` seam used by the submission loop
//!
//! ## Ordering
//!
//! A token transfer to an owner without a holding account carries the
//! idempotent creation instruction first, paid by the sender:
//!
//! ```text
//! [create_associated_token_account_idempotent] -> transfer_checked
//! ```

pub mod accounts;
pub mod amounts;
pub mod errors;
pub mod instructions;

pub use accounts::{holding_account, probe_account};
pub use amounts::{from_base_units, to_base_units};
pub use errors::TransactionBuilderError;
pub use instructions::{
    plan_native_transfer, plan_token_transfer, sanity_check_ix_order, InstructionPlan,
    LedgerInstructionBuilder, TransferInstructionBuilder,
};
