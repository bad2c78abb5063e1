//! Wallet balance lookup (native + token)

use crate::registry::AssetRegistry;
use crate::rpc_manager::{LedgerRpc, RpcManagerError};
use crate::tx_builder::{from_base_units, holding_account};
use crate::types::AssetKind;
use serde::Serialize;
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use spl_token::solana_program::program_pack::Pack;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletBalances {
    pub native_lamports: u64,
    pub token_base_units: u64,
    /// SOL
    pub native: f64,
    /// USDC
    pub token: f64,
}

/// Balances of `owner`; a missing token holding account reads as zero
pub async fn fetch_balances(
    rpc: &dyn LedgerRpc,
    registry: &AssetRegistry,
    owner: &Pubkey,
) -> Result<WalletBalances, RpcManagerError> {
    let native_lamports = rpc.get_balance(owner).await?;

    let holding = holding_account(owner, &registry.token_mint());
    let token_base_units = match rpc.get_account_info(&holding, CommitmentLevel::Confirmed).await? {
        None => 0,
        Some(account) => {
            spl_token::state::Account::unpack(&account.data)
                .map_err(|e| RpcManagerError::Decode {
                    endpoint: rpc.endpoint().to_string(),
                    message: format!("token account {}: {}", holding, e),
                })?
                .amount
        }
    };

    Ok(WalletBalances {
        native_lamports,
        token_base_units,
        native: from_base_units(native_lamports, registry.decimals(AssetKind::Native)),
        token: from_base_units(token_base_units, registry.decimals(AssetKind::FungibleToken)),
    })
}
