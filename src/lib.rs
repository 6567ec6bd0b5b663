//! # BeetleGuard
//!
//! Driver-assistance alerts for the road ahead: a relay that turns camera
//! detections into alerts, and a self-healing monitor that receives them over
//! a WebSocket, keeps the most recent few on screen and reads each one aloud.
//!
//! ## Features
//!
//! - **Self-healing connection**: capped exponential backoff, then a manual retry
//! - **Bounded history**: the ten newest alerts, newest first
//! - **Spoken alerts**: a new alert interrupts the one being spoken
//! - **Relay**: detection filtering with per-side cooldowns, broadcast to all monitors
//!
//! ## Modules
//!
//! - [`alerts`]: Alert record and bounded store
//! - [`connection`]: WebSocket connection manager and reconnect policy
//! - [`speech`]: Text-to-speech engines and the interrupting announcer
//! - [`presenter`]: Banner, cards and error notice for rendering
//! - [`monitor`]: Wires connection, store, speech and presenter together
//! - [`relay`]: Detection relay server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beetleguard::connection::WsTransport;
//! use beetleguard::monitor::{AlertMonitor, MonitorConfig};
//! use beetleguard::speech::CommandEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let monitor = AlertMonitor::start(
//!         MonitorConfig::default(),
//!         Arc::new(WsTransport),
//!         Arc::new(CommandEngine::espeak(150)),
//!     );
//!
//!     let mut view = monitor.subscribe_view();
//!     while view.changed().await.is_ok() {
//!         println!("{}", beetleguard::presenter::render(&view.borrow_and_update()));
//!     }
//!
//!     monitor.shutdown().await;
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod connection;
pub mod logging;
pub mod monitor;
pub mod presenter;
pub mod relay;
pub mod speech;

// Re-export top-level types for convenience
pub use alerts::{AlertRecord, AlertStore, DEFAULT_ALERT_CAPACITY};

pub use connection::{
    AlertSocket, BackoffPolicy, ConnectionConfig, ConnectionError, ConnectionManager,
    ConnectionResult, ConnectionState, ConnectionStatus, Transport, WsTransport,
};

pub use speech::{CommandEngine, SilentEngine, SpeechAnnouncer, SpeechEngine, SpeechError};

pub use presenter::{render, AlertCard, AlertView, Severity, StatusBanner};

pub use monitor::{AlertMonitor, MonitorConfig};

pub use relay::{
    build_router, serve, AlertHub, ApiError, DetectionBatch, DetectionPolicy, RelayConfig,
    RelayState,
};

pub use config::{Config, ConfigError, LoggingConfig};
