//! WebSocket Connection Lifecycle
//!
//! Keeps one logical connection to the alert relay alive and turns inbound
//! text frames into [`AlertRecord`](crate::alerts::AlertRecord)s.
//!
//! ## Architecture
//!
//! - **ConnectionState**: status, retry counter and the user-visible error flag
//! - **BackoffPolicy**: capped exponential delay between reconnect attempts
//! - **Transport**: opens sockets (tokio-tungstenite in production)
//! - **ConnectionManager**: handle to the driver task that owns the socket
//!
//! ## State machine
//!
//! ```text
//! disconnected --connect--> connecting --open--> connected
//! connecting|connected --error--> error
//! connected --close--> disconnected --(backoff)--> connecting
//! error --retry_manually--> connecting
//! ```

mod backoff;
mod error;
mod manager;
mod state;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::BackoffPolicy;
pub use error::{ConnectionError, ConnectionResult};
pub use manager::{ConnectionConfig, ConnectionManager};
pub use state::{ConnectionState, ConnectionStatus};
pub use transport::{AlertSocket, Transport, WsTransport};
