//! BeetleGuard Relay Server
//!
//! Run with: cargo run --bin beetleguard-relay
//!
//! # Configuration
//!
//! Reads the `[relay]` and `[logging]` sections of the config file.
//! Environment variables:
//! - `BEETLEGUARD_RELAY_HOST`: Host to bind to (default: 0.0.0.0)
//! - `BEETLEGUARD_RELAY_PORT`: Port to listen on (default: 8000)
//! - `RUST_LOG`: Log filter (default: info)

use anyhow::Context;
use beetleguard::config::Config;
use beetleguard::logging;
use beetleguard::relay::{serve, RelayState};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beetleguard-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relay detection alerts to BeetleGuard monitors")]
struct Args {
    /// Config file (default: standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to, overrides the config
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the config
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref()).context("loading config")?;
    if let Some(host) = args.host {
        config.relay.host = host;
    }
    if let Some(port) = args.port {
        config.relay.port = port;
    }

    logging::init(&config.logging, "beetleguard=info,tower_http=debug")?;
    tracing::info!("Starting BeetleGuard relay v{}", env!("CARGO_PKG_VERSION"));

    let relay_config = config.relay_config();
    tracing::info!(
        alert_classes = ?relay_config.detection.alert_classes,
        cooldown_secs = relay_config.detection.cooldown_secs,
        min_box_area = relay_config.detection.min_box_area,
        "Detection policy"
    );

    let state = RelayState::new(&relay_config);
    serve(state, &relay_config).await?;

    tracing::info!("BeetleGuard relay stopped");
    Ok(())
}
