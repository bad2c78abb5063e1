//! Common types used throughout the transfer pipeline

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;
use std::str::FromStr;

/// Cluster the wallet session, RPC client and relay are bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Public test cluster (devnet)
    Test,
    /// Production cluster (mainnet-beta)
    Production,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Test => "test",
            Network::Production => "production",
        }
    }

    /// Cluster name the relay expects in its simulation hint
    pub fn cluster_name(&self) -> &'static str {
        match self {
            Network::Test => "devnet",
            Network::Production => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "devnet" => Ok(Network::Test),
            "production" | "mainnet" | "mainnet-beta" => Ok(Network::Production),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Asset being moved (or used to pay fees)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Native SOL
    #[serde(rename = "native")]
    Native,
    /// The network's registered fungible token (USDC)
    #[serde(rename = "token")]
    FungibleToken,
}

impl AssetKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssetKind::Native => "SOL",
            AssetKind::FungibleToken => "USDC",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "sol" => Ok(AssetKind::Native),
            "token" | "usdc" => Ok(AssetKind::FungibleToken),
            other => Err(format!("unknown asset '{}'", other)),
        }
    }
}

/// Transfer as submitted by the form
///
/// Never mutated once submission begins; retries rebuild everything from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Smart wallet paying for the transfer (`None` = the connected wallet)
    pub sender: Option<Pubkey>,

    /// Recipient as typed by the user
    pub recipient: String,

    /// Asset to move
    pub asset: AssetKind,

    /// Amount in human units (SOL / USDC)
    pub amount: f64,

    /// Asset the relay debits for network fees
    pub fee_asset: AssetKind,

    /// Network the request was composed against
    pub network: Network,
}

impl TransferRequest {
    pub fn new(recipient: impl Into<String>, asset: AssetKind, amount: f64, network: Network) -> Self {
        Self {
            sender: None,
            recipient: recipient.into(),
            asset,
            amount,
            fee_asset: AssetKind::FungibleToken,
            network,
        }
    }

    pub fn with_sender(mut self, sender: Pubkey) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_fee_asset(mut self, fee_asset: AssetKind) -> Self {
        self.fee_asset = fee_asset;
        self
    }
}

/// Receipt data echoed back for display only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoedTransaction {
    pub asset: AssetKind,
    pub amount: f64,
    pub recipient: String,
    pub network: Network,
}

/// Terminal success of a transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    /// Confirmation signature returned by the relay
    pub signature: Signature,

    /// Denormalized copy of the request for the receipt
    pub echoed: EchoedTransaction,
}

/// A request that passed every precondition, in ledger terms
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    pub sender: Pubkey,
    pub recipient: Pubkey,
    pub asset: AssetKind,
    /// Amount in the asset's base units (lamports / token units)
    pub base_units: u64,
    pub fee_asset: AssetKind,
    pub network: Network,
}

/// What a `getAccountInfo` probe told us about an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountPresence {
    Exists,
    Missing,
    /// Probe failed (rate limit, transport); treat conservatively
    Unknown,
}

impl AccountPresence {
    pub fn exists(&self) -> bool {
        matches!(self, AccountPresence::Exists)
    }
}
