//! Gasless Transfer Library
//!
//! Submits SOL and USDC transfers through a passkey smart-wallet relay that
//! sponsors network fees, and recovers from the relay's known transient
//! failures (expired transactions, accounts not yet indexed by the RPC).
//!
//! Entry point: [`transfer::TransferOrchestrator`].

pub mod balances;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod registry;
pub mod rpc_manager;
pub mod server;
pub mod structured_logging;
pub mod swap;
pub mod transfer;
pub mod tx_builder;
pub mod types;
pub mod wallet;

pub mod test_utils;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use transfer::{TransferError, TransferOrchestrator};
pub use types::{AssetKind, Network, TransferRequest, TransferResult};
