//! Alert Hub
//!
//! Registry of connected alert monitors. Every alert goes to every client
//! as one JSON text frame.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::alerts::AlertRecord;

/// Unique identifier for a WebSocket client
pub type ClientId = String;

/// Broadcasts alerts to all connected clients
pub struct AlertHub {
    /// Active clients: ClientId → outbound frame channel
    clients: Arc<RwLock<HashMap<ClientId, mpsc::UnboundedSender<String>>>>,
    max_connections: usize,
}

impl AlertHub {
    pub fn new(max_connections: usize) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            max_connections,
        }
    }

    /// Register a new WebSocket client
    ///
    /// Returns the client ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(&self, sender: mpsc::UnboundedSender<String>) -> Result<ClientId, HubError> {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.max_connections {
            return Err(HubError::TooManyConnections(self.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        clients.insert(id.clone(), sender);

        tracing::info!(client_id = %id, clients = clients.len(), "Alert client connected");
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        let mut clients = self.clients.write().await;
        if clients.remove(id).is_some() {
            tracing::info!(client_id = %id, clients = clients.len(), "Alert client disconnected");
        }
    }

    /// Send `alert` to every client; returns how many accepted it
    ///
    /// Clients whose channel is gone are dropped from the registry.
    pub async fn broadcast(&self, alert: &AlertRecord) -> Result<usize, HubError> {
        let frame = alert.to_json().map_err(|e| HubError::Encode(e.to_string()))?;

        let mut clients = self.clients.write().await;
        let mut dead = Vec::new();
        for (id, sender) in clients.iter() {
            if sender.send(frame.clone()).is_err() {
                dead.push(id.clone());
            }
        }
        for id in &dead {
            clients.remove(id);
            tracing::debug!(client_id = %id, "Dropped closed alert client");
        }

        let delivered = clients.len();
        tracing::info!(
            kind = %alert.kind,
            position = %alert.position,
            clients = delivered,
            "Broadcast alert"
        );
        Ok(delivered)
    }

    /// Get the current client count
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Errors that can occur in the alert hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Failed to encode alert: {0}")]
    Encode(String),
}
