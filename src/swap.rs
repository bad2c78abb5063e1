//! Swap aggregator client
//!
//! Thin wrapper over the aggregator's HTTP API. Routes and prebuilt swap
//! transactions are passed through as opaque JSON.

use crate::config::SwapConfig;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("Invalid swap request: {0}")]
    InvalidRequest(String),

    #[error("Swap API request failed: {0}")]
    Http(String),

    #[error("Swap API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode swap API response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Input amount in base units
    pub amount: u64,
    /// Falls back to the configured default
    pub slippage_bps: Option<u16>,
}

pub struct SwapClient {
    base_url: String,
    default_slippage_bps: u16,
    client: reqwest::Client,
}

impl SwapClient {
    pub fn new(config: &SwapConfig) -> Result<Self, SwapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SwapError::Http(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_slippage_bps: config.default_slippage_bps,
            client,
        })
    }

    /// Best route for `request` (`GET /quote`)
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Value, SwapError> {
        if request.input_mint == request.output_mint {
            return Err(SwapError::InvalidRequest(
                "input and output mints are the same".to_string(),
            ));
        }
        if request.amount == 0 {
            return Err(SwapError::InvalidRequest("amount must be positive".to_string()));
        }

        let slippage = request.slippage_bps.unwrap_or(self.default_slippage_bps);
        debug!(
            input = %request.input_mint,
            output = %request.output_mint,
            amount = request.amount,
            slippage_bps = slippage,
            "Requesting swap quote"
        );

        let response = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", slippage.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SwapError::Http(e.to_string()))?;

        Self::json_body(response).await
    }

    /// Prebuilt swap transaction for a quote (`POST /swap`)
    pub async fn swap_transaction(&self, quote: &Value, user: &Pubkey) -> Result<Value, SwapError> {
        let response = self
            .client
            .post(format!("{}/swap", self.base_url))
            .json(&json!({
                "quoteResponse": quote,
                "userPublicKey": user.to_string(),
                "wrapAndUnwrapSol": true,
            }))
            .send()
            .await
            .map_err(|e| SwapError::Http(e.to_string()))?;

        Self::json_body(response).await
    }

    async fn json_body(response: reqwest::Response) -> Result<Value, SwapError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SwapError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(SwapError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| SwapError::Decode(e.to_string()))
    }
}
