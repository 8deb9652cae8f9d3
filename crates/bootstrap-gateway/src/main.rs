//! Bootstrap gateway binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bootstrap_gateway::domain::config::env;
use bootstrap_gateway::{BootstrapGateway, GatewayConfig, VERSION};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bootstrap-gateway", version, about = "Shared-secret admin bootstrap gateway")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = env::CONFIG)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let config = GatewayConfig::load(args.config.as_deref()).context("loading configuration")?;

    info!(version = VERSION, addr = %config.http_addr(), "Bootstrap gateway starting");

    let gateway = BootstrapGateway::new(config)?;
    gateway
        .start(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}
