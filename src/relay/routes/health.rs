//! Health Routes
//!
//! - GET /health - Liveness plus client count

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::relay::dto::HealthResponse;
use crate::relay::RelayState;

/// GET /health
pub async fn health(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        clients: state.hub.connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
