//! Relay Routes
//!
//! Route handlers organized by functionality.

pub mod alerts;
pub mod detections;
pub mod health;
