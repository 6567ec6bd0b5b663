//! Detection Policy
//!
//! Turns raw object detections from a camera frame into driver alerts.
//! Only close objects count (large bounding boxes); each object class may
//! alert once per side of the lane within the cooldown window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::alerts::AlertRecord;

/// Message for a person and a dog close together on the left
pub const PET_OWNER_MESSAGE: &str =
    "Note: A person and a dog are nearby, possibly together as a pet and owner.";

/// Pixel-space bounding box, corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Area in px², saturating at `i64::MAX`
    pub fn area(&self) -> i64 {
        let width = self.x2.saturating_sub(self.x1);
        let height = self.y2.saturating_sub(self.y1);
        width.saturating_mul(height)
    }

    /// Horizontal center, rounded down
    pub fn midpoint_x(&self) -> i64 {
        let half = self.x2.saturating_sub(self.x1).div_euclid(2);
        self.x1.saturating_add(half)
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_name: String,
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            bbox,
            confidence: None,
        }
    }
}

/// All detections from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    pub detections: Vec<Detection>,
    pub frame_width: i64,
    /// Lane split in pixels; half the frame width when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_midpoint: Option<i64>,
    /// Frame time in Unix seconds; the relay clock when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl DetectionBatch {
    pub fn lane_midpoint(&self) -> i64 {
        self.lane_midpoint
            .unwrap_or_else(|| self.frame_width.div_euclid(2))
    }
}

/// Thresholds for [`DetectionPolicy`]
#[derive(Debug, Clone)]
pub struct DetectionPolicyConfig {
    pub alert_classes: Vec<String>,
    /// Minimum box area in px²
    pub min_box_area: i64,
    pub cooldown_secs: i64,
}

impl Default for DetectionPolicyConfig {
    fn default() -> Self {
        Self {
            alert_classes: vec!["person".to_string(), "dog".to_string(), "car".to_string()],
            min_box_area: 5000,
            cooldown_secs: 120,
        }
    }
}

/// Stateful alert filter; remembers when each `{class}_{position}` last fired
#[derive(Debug, Default)]
pub struct DetectionPolicy {
    config: DetectionPolicyConfig,
    last_alerted: HashMap<String, i64>,
}

impl DetectionPolicy {
    pub fn new(config: DetectionPolicyConfig) -> Self {
        Self {
            config,
            last_alerted: HashMap::new(),
        }
    }

    pub fn config(&self) -> &DetectionPolicyConfig {
        &self.config
    }

    /// Alerts to broadcast for `batch`, observed at `now` (Unix seconds)
    pub fn evaluate(&mut self, batch: &DetectionBatch, now: i64) -> Vec<AlertRecord> {
        let lane_midpoint = batch.lane_midpoint();
        let mut alerts = Vec::new();
        let mut person_left = false;
        let mut dog_left = false;

        for detection in &batch.detections {
            if detection.bbox.area() < self.config.min_box_area {
                continue;
            }

            let position = if detection.bbox.midpoint_x() < lane_midpoint {
                "left"
            } else {
                "right"
            };
            let class = detection.class_name.as_str();

            if position == "left" {
                person_left |= class == "person";
                dog_left |= class == "dog";
            }

            if !self.config.alert_classes.iter().any(|c| c == class) {
                continue;
            }

            if self.try_claim(&format!("{}_{}", class, position), now) {
                alerts.push(AlertRecord::new(
                    class,
                    alert_message(class, position),
                    position,
                    now,
                ));
            }
        }

        if person_left && dog_left && self.try_claim("pet_owner_left", now) {
            alerts.push(AlertRecord::new("pet_owner", PET_OWNER_MESSAGE, "left", now));
        }

        for alert in &alerts {
            tracing::debug!(kind = %alert.kind, position = %alert.position, "Detection raised alert");
        }

        alerts
    }

    /// Forget all cooldowns
    pub fn reset(&mut self) {
        self.last_alerted.clear();
    }

    fn try_claim(&mut self, key: &str, now: i64) -> bool {
        let cooled_down = match self.last_alerted.get(key) {
            Some(&last) => now.saturating_sub(last) > self.config.cooldown_secs,
            None => true,
        };
        if cooled_down {
            self.last_alerted.insert(key.to_string(), now);
        }
        cooled_down
    }
}

/// Spoken message for a class on one side of the lane
pub fn alert_message(class_name: &str, position: &str) -> String {
    match class_name {
        "person" => format!("Notice: A pedestrian is noticed on the {}.", position),
        "dog" => format!("Notice: Animal detected on the {}.", position),
        "car" => format!(
            "Please be cautious: A vehicle is spotted on the {}.",
            position
        ),
        other => format!("Attention: {} spotted on your {}.", other, position),
    }
}
