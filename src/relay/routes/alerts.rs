//! Alert Routes
//!
//! - POST /api/v1/alerts - Broadcast a ready-made alert to every client

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::alerts::AlertRecord;
use crate::relay::dto::BroadcastResponse;
use crate::relay::error::{ApiError, ApiResult};
use crate::relay::RelayState;

/// POST /api/v1/alerts
pub async fn broadcast_alert(
    State(state): State<Arc<RelayState>>,
    Json(alert): Json<AlertRecord>,
) -> ApiResult<(StatusCode, Json<BroadcastResponse>)> {
    if alert.kind.is_empty() {
        return Err(ApiError::Validation("Alert type is required".to_string()));
    }
    if alert.message.trim().is_empty() {
        return Err(ApiError::Validation("Alert message is required".to_string()));
    }

    let delivered_to = state.hub.broadcast(&alert).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BroadcastResponse {
            status: "ok".to_string(),
            delivered_to,
        }),
    ))
}
