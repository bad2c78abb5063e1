//! Blockhash sources used for the proactive refresh before submission
//!
//! The refresh is an optimization only; callers log and ignore failures.

use super::{LatestBlockhash, LedgerRpc, RpcManagerError};
use crate::types::Network;
use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait BlockhashSource: Send + Sync {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError>;
}

/// Straight to the ledger RPC
pub struct RpcBlockhashSource {
    rpc: Arc<dyn LedgerRpc>,
}

impl RpcBlockhashSource {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl BlockhashSource for RpcBlockhashSource {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError> {
        self.rpc.get_latest_blockhash().await
    }
}

/// Through the app's own `GET /api/blockhash` passthrough
pub struct HttpBlockhashSource {
    base_url: String,
    network: Network,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashResponse {
    success: bool,
    blockhash: Option<String>,
    last_valid_block_height: Option<u64>,
    error: Option<String>,
}

impl HttpBlockhashSource {
    pub fn new(base_url: &str, network: Network, timeout: Duration) -> Result<Self, RpcManagerError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcManagerError::Transport {
                endpoint: base_url.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            base_url,
            network,
            client,
        })
    }

    fn url(&self) -> String {
        format!("{}/api/blockhash?network={}", self.base_url, self.network)
    }
}

#[async_trait]
impl BlockhashSource for HttpBlockhashSource {
    async fn latest_blockhash(&self) -> Result<LatestBlockhash, RpcManagerError> {
        let url = self.url();
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcManagerError::Timeout { endpoint: url.clone() }
                } else {
                    RpcManagerError::from_message(&e.to_string(), &url)
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(RpcManagerError::RateLimitExceeded { endpoint: url });
        }

        let body: BlockhashResponse = resp.json().await.map_err(|e| RpcManagerError::Decode {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() || !body.success {
            return Err(RpcManagerError::RpcResponse {
                endpoint: url,
                message: body.error.unwrap_or_else(|| "blockhash endpoint failed".to_string()),
                code: Some(status.as_u16() as i64),
            });
        }

        let decode_err = |message: &str| RpcManagerError::Decode {
            endpoint: url.clone(),
            message: message.to_string(),
        };
        let blockhash = body
            .blockhash
            .as_deref()
            .ok_or_else(|| decode_err("missing blockhash"))
            .and_then(|s| Hash::from_str(s).map_err(|e| decode_err(&e.to_string())))?;
        let last_valid_block_height = body
            .last_valid_block_height
            .ok_or_else(|| decode_err("missing lastValidBlockHeight"))?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }
}
