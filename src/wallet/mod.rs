//! Smart-wallet SDK contract
//!
//! The passkey wallet owns authentication, smart-wallet derivation and the
//! relay's multi-step signing protocol. This crate only ever calls
//! `connect`, `disconnect` and `sign_and_send_transaction`.

use crate::types::{AssetKind, Network};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use thiserror::Error;
use uuid::Uuid;

pub mod http_relay;
pub mod session;

pub use http_relay::{HttpRelayConnector, HttpRelayWallet};
pub use session::{WalletConnector, WalletSession};

/// Identity published by the SDK once a passkey session is ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletIdentity {
    /// Program-controlled smart wallet address
    pub smart_wallet: Pubkey,
    /// Passkey credential backing the wallet, when the SDK exposes it
    pub credential_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Failed to connect wallet: {0}")]
    Connect(String),

    #[error("Failed to disconnect wallet: {0}")]
    Disconnect(String),

    #[error("Failed to build relay HTTP client: {0}")]
    Client(String),
}

/// Failure reported by the relay
///
/// The relay exposes no structured error types; the message (and stack, when
/// present) is the only signal available for classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RelayFailure {
    pub message: String,
    pub stack: Option<String>,
}

impl RelayFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Relay options attached to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Asset the relay debits for the network fee
    pub fee_token: AssetKind,
    /// Run the relay's pre-flight simulation against this cluster
    pub cluster_simulation: Option<Network>,
}

/// One call to the relay's combined sign-and-send
#[derive(Debug, Clone)]
pub struct SignAndSendRequest {
    /// Id of the instruction plan this request was built from
    pub plan_id: Uuid,
    pub instructions: Vec<Instruction>,
    pub options: TransactionOptions,
}

#[async_trait]
pub trait SmartWallet: Send + Sync {
    /// Network this wallet session is bound to
    fn network(&self) -> Network;

    async fn connect(&self) -> Result<WalletIdentity, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Smart wallet address, once the SDK has published it
    ///
    /// May still be `None` shortly after `connect` reports success.
    fn smart_wallet_address(&self) -> Option<Pubkey>;

    /// Sign with the passkey and submit through the relay
    async fn sign_and_send_transaction(
        &self,
        request: SignAndSendRequest,
    ) -> Result<Signature, RelayFailure>;
}
