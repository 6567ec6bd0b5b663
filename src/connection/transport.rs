//! Socket transports
//!
//! The manager only needs two things from a socket: the next text frame and
//! a way to close it. [`WsTransport`] provides them over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::{ConnectionError, ConnectionResult};

/// An open socket delivering text frames
#[async_trait]
pub trait AlertSocket: Send {
    /// Next text frame.
    ///
    /// `Ok(None)` means the peer closed the connection. Must be cancel-safe.
    async fn next_frame(&mut self) -> ConnectionResult<Option<String>>;

    /// Close the socket. Errors are not reported; the socket is gone either way.
    async fn close(&mut self);
}

/// Opens sockets to an endpoint
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> ConnectionResult<Box<dyn AlertSocket>>;
}

/// WebSocket transport backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> ConnectionResult<Box<dyn AlertSocket>> {
        let (stream, response) =
            connect_async(url)
                .await
                .map_err(|e| ConnectionError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsSocket { stream }))
    }
}

struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl AlertSocket for WsSocket {
    async fn next_frame(&mut self) -> ConnectionResult<Option<String>> {
        while let Some(result) = self.stream.next().await {
            let message = result.map_err(|e| ConnectionError::Transport(e.to_string()))?;
            match message {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(data) => {
                    tracing::debug!(bytes = data.len(), "Ignoring binary frame");
                }
                Message::Close(frame) => {
                    tracing::debug!(frame = ?frame, "Server closed WebSocket");
                    return Ok(None);
                }
                // Ping/pong handled by tungstenite
                _ => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "WebSocket close failed");
        }
    }
}
