//! Network-bound wallet sessions
//!
//! A session is tied to exactly one network for its whole life. Switching
//! networks tears the session down and opens a new one; nothing is mutated in
//! place, so an orchestrator built for the old session can never submit to the
//! new network by accident.

use super::{SmartWallet, WalletError, WalletIdentity};
use crate::types::Network;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Opens SDK wallet handles for a network
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn open(&self, network: Network) -> Result<Arc<dyn SmartWallet>, WalletError>;
}

pub struct WalletSession {
    network: Network,
    wallet: Arc<dyn SmartWallet>,
    identity: WalletIdentity,
}

impl WalletSession {
    pub async fn connect(connector: &dyn WalletConnector, network: Network) -> Result<Self, WalletError> {
        let wallet = connector.open(network).await?;
        let identity = wallet.connect().await?;
        info!(network = %network, smart_wallet = %identity.smart_wallet, "Wallet session connected");
        Ok(Self {
            network,
            wallet,
            identity,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    pub fn wallet(&self) -> Arc<dyn SmartWallet> {
        Arc::clone(&self.wallet)
    }

    /// Replace this session with one bound to `network`
    ///
    /// A failed disconnect is logged and does not block the switch.
    pub async fn switch_network(
        self,
        connector: &dyn WalletConnector,
        network: Network,
    ) -> Result<Self, WalletError> {
        if network == self.network {
            return Ok(self);
        }
        let previous = self.network;
        if let Err(e) = self.disconnect().await {
            warn!(network = %previous, error = %e, "Disconnect during network switch failed");
        }
        info!(from = %previous, to = %network, "Switching wallet session network");
        Self::connect(connector, network).await
    }

    pub async fn disconnect(self) -> Result<(), WalletError> {
        self.wallet.disconnect().await
    }
}
