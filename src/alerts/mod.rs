//! Alert Records
//!
//! The detection alerts delivered by the relay and the bounded,
//! newest-first list the monitor keeps of them.

mod store;
mod types;

pub use store::{AlertStore, DEFAULT_ALERT_CAPACITY};
pub use types::AlertRecord;
