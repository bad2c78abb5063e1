//! RPC Manager Module
//!
//! Ledger RPC contract used by the transfer pipeline (balances, blockhash,
//! account existence) plus the blockhash sources used for proactive refresh.

use async_trait::async_trait;
use solana_sdk::{account::Account, commitment_config::CommitmentLevel, hash::Hash, pubkey::Pubkey};

// Submodules
pub mod blockhash;
pub mod rpc_errors;
pub mod solana_rpc;

// Re-exports for convenience
pub use blockhash::{BlockhashSource, HttpBlockhashSource, RpcBlockhashSource};
pub use rpc_errors::RpcManagerError;
pub use solana_rpc::SolanaLedgerRpc;

/// Result of `getLatestBlockhash`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Read-only ledger access the transfer pipeline depends on
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Endpoint label for logs and errors
    fn endpoint(&self) -> &str;

    /// Lamport balance of an address
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError>;

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError>;

    /// `Ok(None)` when the account does not exist at `commitment`
    async fn get_account_info(
        &self,
        address: &Pubkey,
        commitment: CommitmentLevel,
    ) -> Result<Option<Account>, RpcManagerError>;
}
