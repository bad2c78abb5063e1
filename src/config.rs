//! Configuration module for the gasless transfer service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, and provides structured configuration types. The active network
//! is an ordinary configuration value: every component that needs it receives
//! it explicitly at construction time.

use crate::types::Network;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network selected at startup
    #[serde(default = "default_network")]
    pub network: Network,

    /// Per-network endpoints and asset registry overrides
    #[serde(default)]
    pub networks: NetworksConfig,

    /// Submission retry and indexing-poll timing
    #[serde(default)]
    pub retry: RetryConfig,

    /// Dev-server (blockhash passthrough, metrics)
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging and noise suppression
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Swap aggregator
    #[serde(default)]
    pub swap: SwapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworksConfig {
    #[serde(default = "default_test_network_config")]
    pub test: NetworkConfig,

    #[serde(default = "default_production_network_config")]
    pub production: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ledger RPC endpoint
    pub rpc_url: String,

    /// Signing relay (paymaster) endpoint
    pub relay_url: String,

    /// Mint of the fungible token used for transfers and fees
    pub usdc_mint: String,

    /// Additional token definitions users must not send funds to
    #[serde(default)]
    pub extra_known_mints: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// Retry timing. The values are empirically tuned against public RPC latency,
/// which is why none of them are hard-coded in the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first submission (2 => 3 submissions total)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Baseline wait before retrying a stale transaction
    #[serde(default = "default_stale_retry_delay")]
    pub stale_retry_delay_ms: u64,

    /// Wait when staleness hit the relay's chunk creation (test network)
    #[serde(default = "default_stale_extended_delay_test")]
    pub stale_extended_delay_test_ms: u64,

    /// Wait when staleness hit the relay's chunk creation (production)
    #[serde(default = "default_stale_extended_delay_production")]
    pub stale_extended_delay_production_ms: u64,

    /// Indexing ceiling per attempt on the test network
    #[serde(default = "default_index_ceiling_test")]
    pub index_ceiling_test_ms: u64,

    /// Indexing ceiling per attempt on production
    #[serde(default = "default_index_ceiling_production")]
    pub index_ceiling_production_ms: u64,

    /// Interval between account existence checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause inserted after a rate-limited poll
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_ms: u64,

    /// Delay before the single re-check of the wallet identity
    #[serde(default = "default_identity_recheck")]
    pub identity_recheck_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Substrings of known-benign warnings to drop (errors are never dropped)
    #[serde(default = "default_suppressed_patterns")]
    pub suppressed_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default = "default_swap_url")]
    pub base_url: String,

    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u16,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_network() -> Network { Network::Test }
fn default_request_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 2 }
fn default_stale_retry_delay() -> u64 { 1_000 }
fn default_stale_extended_delay_test() -> u64 { 3_000 }
fn default_stale_extended_delay_production() -> u64 { 2_000 }
fn default_index_ceiling_test() -> u64 { 15_000 }
fn default_index_ceiling_production() -> u64 { 5_000 }
fn default_poll_interval() -> u64 { 1_000 }
fn default_rate_limit_backoff() -> u64 { 2_000 }
fn default_identity_recheck() -> u64 { 100 }
fn default_bind() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_log_level() -> String { "gasless_transfer=info,warn".to_string() }
fn default_swap_url() -> String { "https://lite-api.jup.ag/swap/v1".to_string() }
fn default_slippage_bps() -> u16 { 50 }
fn default_test_network_config() -> NetworkConfig { NetworkConfig::defaults_for(Network::Test) }
fn default_production_network_config() -> NetworkConfig { NetworkConfig::defaults_for(Network::Production) }

fn default_suppressed_patterns() -> Vec<String> {
    vec![
        "429 Too Many Requests".to_string(),
        "Server responded with 429".to_string(),
        "Retrying after".to_string(),
    ]
}

impl NetworkConfig {
    pub fn defaults_for(network: Network) -> Self {
        match network {
            Network::Test => Self {
                rpc_url: "https://api.devnet.solana.com".to_string(),
                relay_url: "http://127.0.0.1:8787".to_string(),
                usdc_mint: crate::registry::TEST_USDC_MINT.to_string(),
                extra_known_mints: Vec::new(),
                timeout_secs: default_request_timeout(),
            },
            Network::Production => Self {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
                relay_url: "http://127.0.0.1:8788".to_string(),
                usdc_mint: crate::registry::PRODUCTION_USDC_MINT.to_string(),
                extra_known_mints: Vec::new(),
                timeout_secs: default_request_timeout(),
            },
        }
    }
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            test: default_test_network_config(),
            production: default_production_network_config(),
        }
    }
}

impl NetworksConfig {
    pub fn get(&self, network: Network) -> &NetworkConfig {
        match network {
            Network::Test => &self.test,
            Network::Production => &self.production,
        }
    }

    fn get_mut(&mut self, network: Network) -> &mut NetworkConfig {
        match network {
            Network::Test => &mut self.test,
            Network::Production => &mut self.production,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            stale_retry_delay_ms: default_stale_retry_delay(),
            stale_extended_delay_test_ms: default_stale_extended_delay_test(),
            stale_extended_delay_production_ms: default_stale_extended_delay_production(),
            index_ceiling_test_ms: default_index_ceiling_test(),
            index_ceiling_production_ms: default_index_ceiling_production(),
            poll_interval_ms: default_poll_interval(),
            rate_limit_backoff_ms: default_rate_limit_backoff(),
            identity_recheck_ms: default_identity_recheck(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            suppressed_patterns: default_suppressed_patterns(),
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            base_url: default_swap_url(),
            default_slippage_bps: default_slippage_bps(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: default_network(),
            networks: NetworksConfig::default(),
            retry: RetryConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            swap: SwapConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GASLESS_*` overrides; `lookup` is injectable for tests
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(network) = lookup("GASLESS_NETWORK") {
            self.network = Network::from_str(&network).map_err(anyhow::Error::msg)?;
        }

        for network in [Network::Test, Network::Production] {
            let prefix = match network {
                Network::Test => "GASLESS_TEST",
                Network::Production => "GASLESS_PRODUCTION",
            };
            let entry = self.networks.get_mut(network);
            if let Some(url) = lookup(&format!("{}_RPC_URL", prefix)) {
                entry.rpc_url = url;
            }
            if let Some(url) = lookup(&format!("{}_RELAY_URL", prefix)) {
                entry.relay_url = url;
            }
        }

        if let Some(port) = lookup("GASLESS_SERVER_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid GASLESS_SERVER_PORT: {}", port))?;
        }

        Ok(())
    }

    /// Reject configurations that would misbehave at runtime
    pub fn validate(&self) -> anyhow::Result<()> {
        for network in [Network::Test, Network::Production] {
            let entry = self.networks.get(network);
            if entry.rpc_url.trim().is_empty() {
                anyhow::bail!("networks.{}.rpc_url must not be empty", network);
            }
            if entry.relay_url.trim().is_empty() {
                anyhow::bail!("networks.{}.relay_url must not be empty", network);
            }
            crate::registry::AssetRegistry::from_config(network, entry)?;
        }

        if self.retry.poll_interval_ms == 0 {
            anyhow::bail!("retry.poll_interval_ms must be greater than zero");
        }
        if self.retry.max_retries > 10 {
            anyhow::bail!(
                "retry.max_retries = {} is unreasonably high (max 10)",
                self.retry.max_retries
            );
        }
        if self.swap.default_slippage_bps > 10_000 {
            anyhow::bail!("swap.default_slippage_bps must be <= 10000");
        }

        Ok(())
    }

    /// Endpoint set for the active network
    pub fn active(&self) -> &NetworkConfig {
        self.networks.get(self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.network, Network::Test);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.index_ceiling_test_ms, 15_000);
        assert_eq!(config.retry.index_ceiling_production_ms, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.active().rpc_url, "https://api.devnet.solana.com");
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            network = "production"

            [retry]
            max_retries = 1
            poll_interval_ms = 500

            [networks.production]
            rpc_url = "https://rpc.example.org"
            relay_url = "https://relay.example.org"
            usdc_mint = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            "#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Production);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.stale_retry_delay_ms, 1_000);
        assert_eq!(config.active().rpc_url, "https://rpc.example.org");
        assert_eq!(config.networks.test.rpc_url, "https://api.devnet.solana.com");
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let result = Config::from_toml_str("[retry]\npoll_interval_ms = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GASLESS_NETWORK", "mainnet"),
            ("GASLESS_PRODUCTION_RPC_URL", "https://fast-rpc.example"),
            ("GASLESS_SERVER_PORT", "8081"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network, Network::Production);
        assert_eq!(config.active().rpc_url, "https://fast-rpc.example");
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|k| {
            (k == "GASLESS_SERVER_PORT").then(|| "eighty".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9999\n").unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9999);
    }
}
