//! BeetleGuard Relay
//!
//! HTTP/WebSocket server that alert monitors connect to, built with Axum.
//! Detection batches are filtered by [`DetectionPolicy`] and the resulting
//! alerts are pushed to every connected monitor.
//!
//! # Endpoints
//!
//! - `GET /ws` - Alert stream (JSON text frames)
//! - `GET /health` - Health status
//! - `POST /api/v1/detections` - Evaluate a frame of detections
//! - `POST /api/v1/alerts` - Broadcast a ready-made alert
//!
//! # Example
//!
//! ```rust,ignore
//! use beetleguard::relay::{serve, RelayConfig, RelayState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::default();
//!     serve(RelayState::new(&config), &config).await?;
//!     Ok(())
//! }
//! ```

pub mod detection;
pub mod dto;
pub mod error;
pub mod handler;
pub mod hub;
pub mod routes;

pub use detection::{
    BoundingBox, Detection, DetectionBatch, DetectionPolicy, DetectionPolicyConfig,
};
pub use error::{ApiError, ApiResult};
pub use hub::{AlertHub, HubError};

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handler::websocket_handler;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrent WebSocket clients
    pub max_connections: usize,
    pub detection: DetectionPolicyConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_connections: 100,
            detection: DetectionPolicyConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared state for all relay handlers
#[derive(Clone)]
pub struct RelayState {
    /// Connected alert monitors
    pub hub: Arc<AlertHub>,
    /// Cooldown bookkeeping across detection batches
    pub policy: Arc<Mutex<DetectionPolicy>>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            hub: Arc::new(AlertHub::new(config.max_connections)),
            policy: Arc::new(Mutex::new(DetectionPolicy::new(config.detection.clone()))),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Build the relay router with all routes and middleware
pub fn build_router(state: RelayState) -> Router {
    let api_routes = Router::new()
        .route("/detections", post(routes::detections::submit_detections))
        .route("/alerts", post(routes::alerts::broadcast_alert));

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(routes::health::health))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Start the relay server and run until Ctrl+C or SIGTERM
pub async fn serve(state: RelayState, config: &RelayConfig) -> Result<(), ApiError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("BeetleGuard relay listening on {}", addr);
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: RelayState,
    shutdown: F,
) -> Result<(), ApiError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("BeetleGuard relay shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
