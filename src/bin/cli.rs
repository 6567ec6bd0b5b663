//! BeetleGuard CLI
//!
//! Command-line interface for a running relay:
//! - Submit detections
//! - Send a ready-made alert
//! - Check relay health
//! - Generate a config file

use anyhow::{bail, Context};
use beetleguard::alerts::AlertRecord;
use beetleguard::config::generate_default_config;
use beetleguard::relay::dto::{BroadcastResponse, DetectionResponse, HealthResponse};
use beetleguard::relay::{BoundingBox, Detection, DetectionBatch};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beetleguard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Talk to a BeetleGuard relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Relay server URL
    #[arg(long, default_value = "http://localhost:8000", global = true)]
    pub relay_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit one frame of detections
    Detect {
        /// Detections as class:x1,y1,x2,y2 (e.g. car:10,10,110,110)
        #[arg(required = true)]
        detections: Vec<String>,
        /// Frame width in pixels
        #[arg(short, long, default_value = "640")]
        frame_width: i64,
        /// Lane split in pixels (default: half the frame width)
        #[arg(short, long)]
        lane_midpoint: Option<i64>,
    },

    /// Broadcast an alert to every connected monitor
    Send {
        /// Alert type (person, dog, car, ...)
        kind: String,
        /// Text to display and speak
        message: String,
        /// Side of the road
        #[arg(short, long, default_value = "left")]
        position: String,
    },

    /// Show relay health
    Health,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Detect {
            detections,
            frame_width,
            lane_midpoint,
        } => {
            let detections = detections
                .iter()
                .map(|spec| parse_detection(spec))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let batch = DetectionBatch {
                detections,
                frame_width,
                lane_midpoint,
                timestamp: None,
            };

            let response = client
                .post(format!("{}/api/v1/detections", cli.relay_url))
                .json(&batch)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let result: DetectionResponse = response.json().await?;
            if result.alerts.is_empty() {
                println!("No alerts raised (objects too far away or cooling down).");
            } else {
                for alert in &result.alerts {
                    println!("{:<10} {:<6} {}", alert.kind, alert.position, alert.message);
                }
                println!();
                println!("Delivered to {} monitor(s)", result.delivered_to);
            }
        }

        Commands::Send {
            kind,
            message,
            position,
        } => {
            let alert = AlertRecord::now(kind, message, position);

            let response = client
                .post(format!("{}/api/v1/alerts", cli.relay_url))
                .json(&alert)
                .send()
                .await?;

            if response.status().is_success() {
                let result: BroadcastResponse = response.json().await?;
                println!(
                    "Sent {} alert to {} monitor(s)",
                    alert.kind, result.delivered_to
                );
            } else {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Failed ({}): {}", status, text);
                std::process::exit(1);
            }
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.relay_url))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: HealthResponse = resp.json().await?;

                    println!("BeetleGuard relay v{}", health.version);
                    println!();
                    println!("Status: {}", health.status);
                    println!("Monitors connected: {}", health.clients);
                    println!("Uptime: {}", format_duration(health.uptime_seconds));
                }
                Ok(resp) => {
                    eprintln!("Relay returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to BeetleGuard relay at {}", cli.relay_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the relay is running:");
                    eprintln!("  cargo run --bin beetleguard-relay");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            if let Some(path) = output {
                std::fs::write(&path, &config)
                    .with_context(|| format!("writing {:?}", path))?;
                println!("Config written to {:?}", path);
            } else {
                print!("{}", config);
            }
        }
    }

    Ok(())
}

/// Parse `class:x1,y1,x2,y2`
fn parse_detection(spec: &str) -> anyhow::Result<Detection> {
    let Some((class, coords)) = spec.split_once(':') else {
        bail!("Expected class:x1,y1,x2,y2, got {:?}", spec);
    };
    if class.is_empty() {
        bail!("Missing class in {:?}", spec);
    }

    let coords = coords
        .split(',')
        .map(|c| c.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid coordinates in {:?}", spec))?;

    match coords.as_slice() {
        &[x1, y1, x2, y2] => Ok(Detection::new(class, BoundingBox::new(x1, y1, x2, y2))),
        _ => bail!("Expected 4 coordinates in {:?}, got {}", spec, coords.len()),
    }
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}
