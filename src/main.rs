//! BeetleGuard Monitor
//!
//! Terminal alert monitor: connects to the relay, renders the alert list and
//! reads every new alert aloud.
//!
//! Keys (followed by Enter): `r` retry the connection, `d` dismiss the error
//! notice, `q` quit.

use anyhow::Context;
use beetleguard::config::Config;
use beetleguard::connection::WsTransport;
use beetleguard::logging;
use beetleguard::monitor::AlertMonitor;
use beetleguard::presenter::{render, AlertView};
use beetleguard::speech::{SilentEngine, SpeechEngine};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "beetleguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spoken driver alerts from a BeetleGuard relay")]
struct Args {
    /// Config file (default: standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay WebSocket URL, overrides the config
    #[arg(long)]
    url: Option<String>,

    /// Do not read alerts aloud
    #[arg(long)]
    no_speech: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref()).context("loading config")?;
    if let Some(url) = args.url {
        config.client.url = url;
    }

    logging::init(&config.logging, "beetleguard=info")?;
    tracing::info!("BeetleGuard monitor v{}", env!("CARGO_PKG_VERSION"));

    let engine: Arc<dyn SpeechEngine> = if args.no_speech {
        Arc::new(SilentEngine)
    } else {
        config.speech_engine()
    };

    tracing::info!(url = %config.client.url, speech = %engine.name(), "Connecting to relay");
    let monitor = AlertMonitor::start(config.monitor_config(), Arc::new(WsTransport), engine);

    let mut view = monitor.subscribe_view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    draw(&monitor.view());

    // One handler for the whole session so a signal between iterations is not lost
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                draw(&current);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "r" => monitor.retry(),
                    "d" => monitor.dismiss_error(),
                    "q" => break,
                    "" => {}
                    other => tracing::debug!(input = %other, "Unknown command"),
                },
                // Keep running until Ctrl+C
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                break;
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}

fn draw(view: &AlertView) {
    // Clear screen, cursor home
    print!("\x1b[2J\x1b[H");
    println!("BeetleGuard Alerts\n");
    print!("{}", render(view));
}
