//! Scripted transport for driving the manager in tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::error::{ConnectionError, ConnectionResult};
use super::transport::{AlertSocket, Transport};

type FrameTx = mpsc::UnboundedSender<ConnectionResult<Option<String>>>;
type FrameRx = mpsc::UnboundedReceiver<ConnectionResult<Option<String>>>;

/// Transport that answers connects from a script; refuses once it runs dry
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<FrameRx>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Accept the next connect; the returned server feeds its frames
    pub(crate) fn accept_next(&self) -> ScriptedServer {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(rx);
        ScriptedServer { tx }
    }

    /// Instants at which connect was called
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Gaps between consecutive attempts in milliseconds
    pub(crate) fn attempt_gaps_ms(&self) -> Vec<u128> {
        self.attempts()
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, url: &str) -> ConnectionResult<Box<dyn AlertSocket>> {
        self.attempts.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(frames) => Ok(Box::new(ScriptedSocket { frames })),
            None => Err(ConnectionError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Server side of an accepted scripted connection. Dropping it closes the socket.
pub(crate) struct ScriptedServer {
    tx: FrameTx,
}

impl ScriptedServer {
    pub(crate) fn send_text(&self, text: &str) {
        let _ = self.tx.send(Ok(Some(text.to_string())));
    }

    pub(crate) fn fail(&self, reason: &str) {
        let _ = self.tx.send(Err(ConnectionError::Transport(reason.to_string())));
    }
}

struct ScriptedSocket {
    frames: FrameRx,
}

#[async_trait]
impl AlertSocket for ScriptedSocket {
    async fn next_frame(&mut self) -> ConnectionResult<Option<String>> {
        self.frames.recv().await.unwrap_or(Ok(None))
    }

    async fn close(&mut self) {
        self.frames.close();
    }
}
