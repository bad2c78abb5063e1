//! Precondition checks run before any network call
//!
//! Checks short-circuit in this order:
//! 1. sender resolved
//! 2. request targets the registry's network
//! 3. recipient present (whitespace trimmed)
//! 4. recipient parses as an address
//! 5. native transfers go to an on-curve recipient
//! 6. recipient differs from the sender
//! 7. recipient is not a known token mint
//! 8. amount is positive, finite and representable

use super::errors::TransferError;
use crate::registry::AssetRegistry;
use crate::tx_builder::{to_base_units, TransactionBuilderError};
use crate::types::{AssetKind, TransferRequest, ValidatedTransfer};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Validate `request` for `sender` against `registry`
pub fn validate_transfer(
    request: &TransferRequest,
    sender: Option<Pubkey>,
    registry: &AssetRegistry,
) -> Result<ValidatedTransfer, TransferError> {
    let sender = sender.ok_or(TransferError::WalletNotReady)?;

    if request.network != registry.network() {
        return Err(TransferError::Configuration(format!(
            "the transfer targets {} but the wallet session is on {}",
            request.network, registry.network()
        )));
    }

    let recipient_text = request.recipient.trim();
    if recipient_text.is_empty() {
        return Err(TransferError::InvalidAddress {
            address: String::new(),
        });
    }

    let recipient = Pubkey::from_str(recipient_text).map_err(|_| TransferError::InvalidAddress {
        address: recipient_text.to_string(),
    })?;

    if request.asset == AssetKind::Native && !recipient.is_on_curve() {
        return Err(TransferError::UnsupportedRecipient {
            address: recipient.to_string(),
        });
    }

    if recipient == sender {
        return Err(TransferError::SelfTransferDenied);
    }

    if let Some(symbol) = registry.mint_symbol(&recipient) {
        return Err(TransferError::RecipientIsMint {
            address: recipient.to_string(),
            symbol: symbol.to_string(),
        });
    }

    let base_units = to_base_units(request.amount, registry.decimals(request.asset)).map_err(|e| {
        let reason = match e {
            TransactionBuilderError::InvalidAmount(reason) => reason,
            other => other.to_string(),
        };
        TransferError::InvalidAmount { reason }
    })?;

    Ok(ValidatedTransfer {
        sender,
        recipient,
        asset: request.asset,
        base_units,
        fee_asset: request.fee_asset,
        network: request.network,
    })
}
