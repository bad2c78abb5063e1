//! `LedgerRpc` over the Solana JSON-RPC client

use super::{LatestBlockhash, LedgerRpc, RpcManagerError};
use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct SolanaLedgerRpc {
    client: Arc<RpcClient>,
    endpoint: String,
}

impl SolanaLedgerRpc {
    /// Client with `confirmed` default commitment
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            client: Arc::new(client),
            endpoint: url.to_string(),
        }
    }

    pub fn client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    fn observe(&self, timer: Timer, op: &str, ok: bool) {
        timer.observe_duration(&metrics().rpc_latency);
        if !ok {
            debug!(endpoint = %self.endpoint, op, "RPC call failed");
        }
    }
}

impl std::fmt::Debug for SolanaLedgerRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaLedgerRpc")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl LedgerRpc for SolanaLedgerRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcManagerError> {
        let timer = Timer::new();
        let result = self.client.get_balance(address).await;
        self.observe(timer, "getBalance", result.is_ok());
        result.map_err(|e| RpcManagerError::from_client_error(e, &self.endpoint))
    }

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await;
        self.observe(timer, "getLatestBlockhash", result.is_ok());
        let (blockhash, last_valid_block_height) =
            result.map_err(|e| RpcManagerError::from_client_error(e, &self.endpoint))?;
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_account_info(
        &self,
        address: &Pubkey,
        commitment: CommitmentLevel,
    ) -> Result<Option<Account>, RpcManagerError> {
        let timer = Timer::new();
        let result = self
            .client
            .get_account_with_commitment(address, CommitmentConfig { commitment })
            .await;
        self.observe(timer, "getAccountInfo", result.is_ok());
        let response = result.map_err(|e| RpcManagerError::from_client_error(e, &self.endpoint))?;
        Ok(response.value)
    }
}
