//! Gasless transfer dev server
//!
//! Serves the same-origin blockhash passthrough used by the transfer flow's
//! proactive refresh, plus health and Prometheus metrics.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use gasless_transfer::config::Config;
use gasless_transfer::rpc_manager::{LedgerRpc, SolanaLedgerRpc};
use gasless_transfer::server::{router, AppState};
use gasless_transfer::structured_logging::init_logging;
use gasless_transfer::types::Network;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GASLESS_CONFIG", default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Listen port (overrides server.port)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging, args.verbose)?;

    info!("Starting gasless transfer server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(network = %config.network, "Active network");

    let state = AppState {
        default_network: config.network,
        test_rpc: ledger_rpc(&config, Network::Test),
        production_rpc: ledger_rpc(&config, Network::Production),
    };

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shut down gracefully");
    Ok(())
}

fn ledger_rpc(config: &Config, network: Network) -> Arc<dyn LedgerRpc> {
    let entry = config.networks.get(network);
    Arc::new(SolanaLedgerRpc::new(
        &entry.rpc_url,
        Duration::from_secs(entry.timeout_secs),
    ))
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        // logging is not up yet
        eprintln!("Config file '{}' not found, using defaults", path);
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| std::env::var(key).ok())
            .context("Invalid environment override")?;
        config.validate()?;
        Ok(config)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
