//! Connection state and its transitions
//!
//! The transitions are plain methods so the driver task and the tests share
//! exactly the same rules.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::backoff::BackoffPolicy;

/// Connection status as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    /// Connecting or connected: a new connect would be redundant
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable connection state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Automatic reconnects attempted since the last successful open
    pub retry_count: u32,
    /// A user-visible error condition is pending
    pub last_error: bool,
}

impl ConnectionState {
    /// Enter `connecting`. Returns false when already connecting or connected.
    pub fn begin_connect(&mut self) -> bool {
        if self.status.is_active() {
            return false;
        }
        self.status = ConnectionStatus::Connecting;
        true
    }

    pub fn on_open(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.retry_count = 0;
        self.last_error = false;
    }

    pub fn on_error(&mut self) {
        self.status = ConnectionStatus::Error;
        self.last_error = true;
    }

    /// Enter `disconnected` and return the delay before the next reconnect.
    ///
    /// `None` means the retry budget is spent; the error flag is raised so the
    /// user can retry by hand.
    pub fn on_close(&mut self, policy: &BackoffPolicy) -> Option<Duration> {
        self.status = ConnectionStatus::Disconnected;
        let delay = policy.delay_for(self.retry_count);
        if delay.is_none() {
            self.last_error = true;
        }
        delay
    }

    /// The reconnect timer fired
    pub fn on_retry_timer(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    pub fn retry_manually(&mut self) {
        self.retry_count = 0;
        self.last_error = false;
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = false;
    }

    pub fn on_shutdown(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}
