//! Connection error types

use thiserror::Error;

/// Errors raised by a transport while opening or reading a socket
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Handshake or TCP connect failed
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The socket failed after it was established
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for connection operations
pub type ConnectionResult<T> = Result<T, ConnectionError>;
