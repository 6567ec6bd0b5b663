//! Alert record type and its wire format
//!
//! Inbound frames are UTF-8 JSON objects shaped like
//! `{"type": "car", "message": "...", "position": "left", "timestamp": 1700000000}`.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

/// A single detection alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertRecord {
    /// Detection tag ("person", "car", "dog", "pet_owner", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable text, spoken verbatim
    pub message: String,
    /// Where the detection was made ("left" / "right")
    #[serde(default)]
    pub position: String,
    /// Unix timestamp in seconds
    #[serde(deserialize_with = "deserialize_unix_seconds")]
    pub timestamp: i64,
}

impl AlertRecord {
    /// Create an alert with an explicit timestamp
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        position: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            position: position.into(),
            timestamp,
        }
    }

    /// Create an alert stamped with the current time
    pub fn now(
        kind: impl Into<String>,
        message: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self::new(kind, message, position, Utc::now().timestamp())
    }

    /// Parse a raw text frame
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encode as a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Some producers stamp alerts with fractional seconds
#[derive(Deserialize)]
#[serde(untagged)]
enum UnixSeconds {
    Whole(i64),
    Fractional(f64),
}

fn deserialize_unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match UnixSeconds::deserialize(deserializer)? {
        UnixSeconds::Whole(secs) => secs,
        UnixSeconds::Fractional(secs) => secs.trunc() as i64,
    })
}
