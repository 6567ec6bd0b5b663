//! Detection Routes
//!
//! - POST /api/v1/detections - Evaluate one frame of detections and
//!   broadcast the alerts it raises

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::relay::detection::DetectionBatch;
use crate::relay::dto::DetectionResponse;
use crate::relay::error::{ApiError, ApiResult};
use crate::relay::RelayState;

/// Maximum detections accepted per frame
const MAX_DETECTIONS: usize = 1_000;

/// Largest pixel coordinate or frame width accepted
const MAX_PIXEL: i64 = 1_000_000;

/// POST /api/v1/detections
pub async fn submit_detections(
    State(state): State<Arc<RelayState>>,
    Json(batch): Json<DetectionBatch>,
) -> ApiResult<(StatusCode, Json<DetectionResponse>)> {
    validate_batch(&batch)?;

    let now = batch.timestamp.unwrap_or_else(|| Utc::now().timestamp());
    let alerts = state.policy.lock().await.evaluate(&batch, now);

    let mut delivered_to = 0;
    for alert in &alerts {
        delivered_to = state.hub.broadcast(alert).await?;
    }

    tracing::debug!(
        detections = batch.detections.len(),
        alerts = alerts.len(),
        "Evaluated detection batch"
    );

    Ok((
        StatusCode::OK,
        Json(DetectionResponse {
            alerts,
            delivered_to,
        }),
    ))
}

fn validate_batch(batch: &DetectionBatch) -> ApiResult<()> {
    if batch.frame_width <= 0 || batch.frame_width > MAX_PIXEL {
        return Err(ApiError::Validation(format!(
            "frame_width must be between 1 and {}",
            MAX_PIXEL
        )));
    }
    if batch.detections.len() > MAX_DETECTIONS {
        return Err(ApiError::Validation(format!(
            "Batch exceeds maximum of {} detections",
            MAX_DETECTIONS
        )));
    }
    if let Some(bad) = batch.detections.iter().find(|d| {
        [d.bbox.x1, d.bbox.y1, d.bbox.x2, d.bbox.y2]
            .iter()
            .any(|c| !(0..=MAX_PIXEL).contains(c))
    }) {
        return Err(ApiError::Validation(format!(
            "Bounding box for {} is outside 0..={} px",
            bad.class_name, MAX_PIXEL
        )));
    }
    if let Some(bad) = batch
        .detections
        .iter()
        .find(|d| d.bbox.x2 < d.bbox.x1 || d.bbox.y2 < d.bbox.y1)
    {
        return Err(ApiError::Validation(format!(
            "Inverted bounding box for {}",
            bad.class_name
        )));
    }
    Ok(())
}
