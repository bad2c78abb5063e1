//! HTTP client for a passkey signing relay
//!
//! Endpoints:
//! - POST /v1/connect
//! - POST /v1/disconnect
//! - POST /v1/sign-and-send

use super::{
    RelayFailure, SignAndSendRequest, SmartWallet, TransactionOptions, WalletConnector,
    WalletError, WalletIdentity,
};
use crate::config::NetworksConfig;
use crate::types::{AssetKind, Network};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireAccountMeta {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInstruction {
    program_id: String,
    accounts: Vec<WireAccountMeta>,
    /// base64
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOptions {
    fee_token: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cluster_simulation: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignAndSendBody {
    request_id: String,
    instructions: Vec<WireInstruction>,
    options: WireOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    smart_wallet: String,
    credential_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignatureResponse {
    signature: String,
}

impl From<&Instruction> for WireInstruction {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id.to_string(),
            accounts: ix
                .accounts
                .iter()
                .map(|meta| WireAccountMeta {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: STANDARD.encode(&ix.data),
        }
    }
}

impl From<&TransactionOptions> for WireOptions {
    fn from(options: &TransactionOptions) -> Self {
        Self {
            fee_token: match options.fee_token {
                AssetKind::Native => "SOL",
                AssetKind::FungibleToken => "USDC",
            },
            cluster_simulation: options.cluster_simulation.map(|n| n.cluster_name()),
        }
    }
}

/// Pull `message`/`stack` out of whatever error shape the relay returned
fn relay_failure_from_body(status: reqwest::StatusCode, body: &str) -> RelayFailure {
    let fallback = || RelayFailure::new(format!("relay returned status {}: {}", status, body));

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback();
    };

    let error = value.get("error").unwrap_or(&value);
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str());
    let stack = error.get("stack").and_then(|s| s.as_str());

    match message {
        Some(message) => {
            let failure = RelayFailure::new(message);
            match stack {
                Some(stack) => failure.with_stack(stack),
                None => failure,
            }
        }
        None => fallback(),
    }
}

/// `SmartWallet` backed by a relay reachable over HTTP
pub struct HttpRelayWallet {
    base_url: String,
    network: Network,
    client: reqwest::Client,
    identity: RwLock<Option<WalletIdentity>>,
}

impl HttpRelayWallet {
    pub fn new(base_url: &str, network: Network, timeout: Duration) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Client(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            network,
            client,
            identity: RwLock::new(None),
        })
    }

    pub fn identity(&self) -> Option<WalletIdentity> {
        self.identity.read().clone()
    }
}

#[async_trait]
impl SmartWallet for HttpRelayWallet {
    fn network(&self) -> Network {
        self.network
    }

    async fn connect(&self) -> Result<WalletIdentity, WalletError> {
        let url = format!("{}/v1/connect", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "network": self.network.cluster_name() }))
            .send()
            .await
            .map_err(|e| WalletError::Connect(format!("relay request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WalletError::Connect(
                relay_failure_from_body(status, &body).message,
            ));
        }

        let body: ConnectResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::Connect(format!("failed to parse connect response: {}", e)))?;
        let smart_wallet = Pubkey::from_str(&body.smart_wallet).map_err(|e| {
            WalletError::Connect(format!("relay returned invalid smart wallet '{}': {}", body.smart_wallet, e))
        })?;

        let identity = WalletIdentity {
            smart_wallet,
            credential_id: body.credential_id,
        };
        *self.identity.write() = Some(identity.clone());
        Ok(identity)
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let was_connected = self.identity.write().take().is_some();
        if !was_connected {
            return Ok(());
        }

        let url = format!("{}/v1/disconnect", self.base_url);
        self.client
            .post(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WalletError::Disconnect(e.to_string()))?;
        Ok(())
    }

    fn smart_wallet_address(&self) -> Option<Pubkey> {
        self.identity.read().as_ref().map(|id| id.smart_wallet)
    }

    async fn sign_and_send_transaction(
        &self,
        request: SignAndSendRequest,
    ) -> Result<Signature, RelayFailure> {
        let url = format!("{}/v1/sign-and-send", self.base_url);
        let body = SignAndSendBody {
            request_id: request.plan_id.to_string(),
            instructions: request.instructions.iter().map(WireInstruction::from).collect(),
            options: WireOptions::from(&request.options),
        };

        debug!(
            plan_id = %request.plan_id,
            instructions = body.instructions.len(),
            cluster_simulation = ?body.options.cluster_simulation,
            "Submitting to relay"
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayFailure::new(format!("relay request failed: {}", e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RelayFailure::new(format!("failed to read relay response: {}", e)))?;

        if !status.is_success() {
            return Err(relay_failure_from_body(status, &text));
        }

        let parsed: SignatureResponse = serde_json::from_str(&text)
            .map_err(|e| RelayFailure::new(format!("failed to parse relay response: {}", e)))?;
        Signature::from_str(&parsed.signature).map_err(|e| {
            RelayFailure::new(format!("relay returned invalid signature '{}': {}", parsed.signature, e))
        })
    }
}

/// Opens `HttpRelayWallet`s from the per-network configuration
pub struct HttpRelayConnector {
    networks: NetworksConfig,
}

impl HttpRelayConnector {
    pub fn new(networks: NetworksConfig) -> Self {
        Self { networks }
    }
}

#[async_trait]
impl WalletConnector for HttpRelayConnector {
    async fn open(&self, network: Network) -> Result<Arc<dyn SmartWallet>, WalletError> {
        let cfg = self.networks.get(network);
        Ok(Arc::new(HttpRelayWallet::new(
            &cfg.relay_url,
            network,
            Duration::from_secs(cfg.timeout_secs),
        )?))
    }
}
