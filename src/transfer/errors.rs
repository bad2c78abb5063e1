//! Client-surfaced transfer errors
//!
//! Every variant renders as a complete sentence the caller can show verbatim.

use crate::tx_builder::TransactionBuilderError;
use crate::types::{AccountPresence, Network};
use crate::wallet::RelayFailure;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransferError {
    #[error("Your wallet is still initializing. Please wait a moment and try again.")]
    WalletNotReady,

    #[error("{}", invalid_address_message(.address))]
    InvalidAddress { address: String },

    #[error(
        "Address {address} is a program-controlled account and cannot receive SOL directly. \
         Please send to a regular wallet address."
    )]
    UnsupportedRecipient { address: String },

    #[error("You cannot send funds to your own wallet. Please enter a different recipient address.")]
    SelfTransferDenied,

    #[error(
        "Address {address} is the {symbol} token mint, not a wallet. \
         Please paste the recipient's wallet address instead."
    )]
    RecipientIsMint { address: String, symbol: String },

    #[error("Invalid amount: {reason}. Please enter a positive number.")]
    InvalidAmount { reason: String },

    #[error(
        "The transaction expired before it could be confirmed ({attempts} attempts). \
         The network may be congested; please try again."
    )]
    StaleTransaction { attempts: u32 },

    #[error("{}", account_not_indexed_message(.address, .attempts, .network))]
    AccountNotIndexed {
        address: Option<String>,
        attempts: u32,
        network: Network,
    },

    #[error("{}", recipient_not_found_message(.address, .presence, .network))]
    RecipientNotFound {
        address: String,
        /// What the pre-submission probe saw
        presence: AccountPresence,
        network: Network,
    },

    #[error("Network mismatch: {0}. Please reconnect your wallet on the selected network.")]
    Configuration(String),

    #[error("Could not build the transaction: {0}")]
    Build(#[from] TransactionBuilderError),

    /// Unclassified relay failure, surfaced as-is
    #[error("{0}")]
    Relay(RelayFailure),
}

fn invalid_address_message(address: &str) -> String {
    if address.is_empty() {
        "A recipient address is required.".to_string()
    } else {
        format!(
            "\"{}\" is not a valid address. Please check the recipient and try again.",
            address
        )
    }
}

fn account_not_indexed_message(address: &Option<String>, attempts: &u32, network: &Network) -> String {
    let subject = match address {
        Some(address) => format!("account {}", address),
        None => "an intermediate account".to_string(),
    };
    format!(
        "The {} RPC did not index {} in time after {} attempts. This is a known indexing delay \
         of public infrastructure, not a problem with your transfer. Wait a minute and try \
         again, or configure a faster RPC provider.",
        network.cluster_name(),
        subject,
        attempts
    )
}

fn recipient_not_found_message(address: &str, presence: &AccountPresence, network: &Network) -> String {
    match presence {
        AccountPresence::Exists => format!(
            "The relay could not find recipient {} even though it exists on {}. Please check that \
             your wallet and the app are on the same network, then try again.",
            address,
            network.cluster_name()
        ),
        AccountPresence::Missing => format!(
            "Recipient {} does not exist on {} yet, and the relay's simulation requires existing \
             accounts. Please use an address that already has a balance, or fund it first.",
            address,
            network.cluster_name()
        ),
        AccountPresence::Unknown => format!(
            "The relay could not find recipient {} on {}, and the account could not be checked \
             beforehand. Please confirm the address is correct and on the selected network, \
             then try again.",
            address,
            network.cluster_name()
        ),
    }
}

impl TransferError {
    /// Stable taxonomy code
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::WalletNotReady => "WALLET_NOT_READY",
            TransferError::InvalidAddress { .. } => "INVALID_ADDRESS",
            TransferError::UnsupportedRecipient { .. } => "UNSUPPORTED_RECIPIENT",
            TransferError::SelfTransferDenied => "SELF_TRANSFER_DENIED",
            TransferError::RecipientIsMint { .. } => "RECIPIENT_IS_MINT",
            TransferError::InvalidAmount { .. } => "INVALID_AMOUNT",
            TransferError::StaleTransaction { .. } => "STALE_TRANSACTION",
            TransferError::AccountNotIndexed { .. } | TransferError::RecipientNotFound { .. } => {
                "ACCOUNT_NOT_INDEXED"
            }
            TransferError::Configuration(_) => "CONFIGURATION",
            TransferError::Build(_) | TransferError::Relay(_) => "UNKNOWN",
        }
    }

    /// Whether the caller may reasonably try the same transfer again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::WalletNotReady
                | TransferError::StaleTransaction { .. }
                | TransferError::AccountNotIndexed { .. }
        )
    }

    /// Precondition failure, raised before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidAddress { .. }
                | TransferError::UnsupportedRecipient { .. }
                | TransferError::SelfTransferDenied
                | TransferError::RecipientIsMint { .. }
                | TransferError::InvalidAmount { .. }
        )
    }
}

impl From<RelayFailure> for TransferError {
    fn from(failure: RelayFailure) -> Self {
        TransferError::Relay(failure)
    }
}
