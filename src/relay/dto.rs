//! Relay Data Transfer Objects
//!
//! Response bodies for the relay HTTP endpoints. Request bodies reuse
//! [`DetectionBatch`](super::DetectionBatch) and
//! [`AlertRecord`](crate::alerts::AlertRecord) directly.

use serde::{Deserialize, Serialize};

use crate::alerts::AlertRecord;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the server answers
    pub status: String,
    /// Connected alert monitors
    pub clients: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

/// Result of evaluating a detection batch
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// Alerts raised by this batch, in broadcast order
    pub alerts: Vec<AlertRecord>,
    /// Clients each alert was delivered to
    pub delivered_to: usize,
}

/// Result of broadcasting a ready-made alert
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: String,
    pub delivered_to: usize,
}
