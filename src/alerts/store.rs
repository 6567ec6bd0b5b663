//! Bounded recent-alerts list

use std::collections::VecDeque;

use super::types::AlertRecord;

/// How many alerts the monitor keeps on screen
pub const DEFAULT_ALERT_CAPACITY: usize = 10;

/// Most recent alerts, newest first
///
/// Pushing beyond capacity evicts the oldest entries from the tail.
#[derive(Debug, Clone)]
pub struct AlertStore {
    records: VecDeque<AlertRecord>,
    capacity: usize,
}

impl AlertStore {
    /// Create a store holding at most `capacity` alerts
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend an alert, evicting the oldest beyond capacity
    pub fn push(&mut self, record: AlertRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    /// Current alerts, newest first
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}
