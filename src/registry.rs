//! Per-network asset registry
//!
//! Holds the mint of the fungible token, the decimal exponents used to convert
//! human amounts into base units, and the set of addresses that identify a
//! token definition rather than a wallet.

use crate::config::NetworkConfig;
use crate::types::{AssetKind, Network};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;

/// Decimal exponent of native SOL (lamports)
pub const NATIVE_DECIMALS: u8 = 9;

/// Decimal exponent of the fungible token (USDC)
pub const TOKEN_DECIMALS: u8 = 6;

/// Devnet USDC mint
pub const TEST_USDC_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Mainnet USDC mint
pub const PRODUCTION_USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Wrapped SOL mint, identical on every cluster
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Clone)]
pub struct AssetRegistry {
    network: Network,
    token_mint: Pubkey,
    /// mint address -> display symbol
    known_mints: HashMap<Pubkey, String>,
}

impl AssetRegistry {
    /// Built-in registry for a network
    pub fn for_network(network: Network) -> Self {
        let usdc = match network {
            Network::Test => TEST_USDC_MINT,
            Network::Production => PRODUCTION_USDC_MINT,
        };
        // Both constants are valid base58 keys
        let token_mint = Pubkey::from_str(usdc).unwrap_or_default();
        let wsol = Pubkey::from_str(WRAPPED_SOL_MINT).unwrap_or_default();

        let mut known_mints = HashMap::new();
        known_mints.insert(token_mint, "USDC".to_string());
        known_mints.insert(wsol, "wSOL".to_string());

        Self {
            network,
            token_mint,
            known_mints,
        }
    }

    /// Registry from configuration (mint override plus extra known mints)
    pub fn from_config(network: Network, config: &NetworkConfig) -> anyhow::Result<Self> {
        let mut registry = Self::for_network(network);

        let token_mint = Pubkey::from_str(&config.usdc_mint)
            .map_err(|e| anyhow::anyhow!("invalid usdc_mint '{}': {}", config.usdc_mint, e))?;
        if token_mint != registry.token_mint {
            registry.known_mints.remove(&registry.token_mint);
            registry.known_mints.insert(token_mint, "USDC".to_string());
            registry.token_mint = token_mint;
        }

        for extra in &config.extra_known_mints {
            let mint = Pubkey::from_str(extra)
                .map_err(|e| anyhow::anyhow!("invalid known mint '{}': {}", extra, e))?;
            registry.known_mints.entry(mint).or_insert_with(|| "token".to_string());
        }

        Ok(registry)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn token_mint(&self) -> Pubkey {
        self.token_mint
    }

    pub fn decimals(&self, asset: AssetKind) -> u8 {
        match asset {
            AssetKind::Native => NATIVE_DECIMALS,
            AssetKind::FungibleToken => TOKEN_DECIMALS,
        }
    }

    /// Symbol of the token whose mint is `address`, if it is one
    pub fn mint_symbol(&self, address: &Pubkey) -> Option<&str> {
        self.known_mints.get(address).map(String::as_str)
    }

    pub fn is_known_mint(&self, address: &Pubkey) -> bool {
        self.known_mints.contains_key(address)
    }
}
