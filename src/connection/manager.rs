//! Connection Manager
//!
//! A cheap handle over a driver task. The driver owns the socket, the retry
//! counter and the reconnect timer, and multiplexes them with commands on a
//! single `select!` loop so every transition happens in order on one task.

use futures_util::future::BoxFuture;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Sleep};

use super::backoff::BackoffPolicy;
use super::error::ConnectionResult;
use super::state::ConnectionState;
use super::transport::{AlertSocket, Transport};
use crate::alerts::AlertRecord;

/// Configuration for the connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket endpoint (e.g. `ws://localhost:8000/ws`)
    pub url: String,
    /// Reconnect schedule
    pub backoff: BackoffPolicy,
    /// Capacity of the alert broadcast channel
    pub alert_buffer: usize,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            backoff: BackoffPolicy::default(),
            alert_buffer: 64,
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect,
    RetryManually,
    DismissError,
    Shutdown,
}

/// Handle to the connection driver
///
/// Dropping the handle tears the connection down as well.
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    alert_tx: broadcast::Sender<AlertRecord>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Spawn the driver task. Does not connect until [`connect`](Self::connect).
    pub fn spawn(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        let (alert_tx, _) = broadcast::channel(config.alert_buffer.max(1));

        let driver = Driver {
            url: config.url,
            policy: config.backoff,
            transport,
            state: ConnectionState::default(),
            state_tx,
            alert_tx: alert_tx.clone(),
            commands: command_rx,
            pending_connect: None,
            socket: None,
            reconnect: None,
        };
        let handle = tokio::spawn(driver.run());

        Self {
            commands: command_tx,
            state_rx,
            alert_tx,
            driver: Mutex::new(Some(handle)),
        }
    }

    /// Open the connection. No-op while connecting or connected.
    pub fn connect(&self) {
        self.send(Command::Connect);
    }

    /// Reset the retry budget and reconnect immediately
    pub fn retry_manually(&self) {
        self.send(Command::RetryManually);
    }

    /// Clear the error flag without reconnecting
    pub fn dismiss_error(&self) {
        self.send(Command::DismissError);
    }

    /// Close the socket and cancel any pending reconnect. Idempotent.
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown);
        if let Some(handle) = self.driver.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Connection driver panicked");
            }
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Observe connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Observe parsed alerts
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<AlertRecord> {
        self.alert_tx.subscribe()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Connection driver already stopped");
        }
    }
}

type ConnectFuture = BoxFuture<'static, ConnectionResult<Box<dyn AlertSocket>>>;

enum Event {
    Command(Option<Command>),
    Opened(ConnectionResult<Box<dyn AlertSocket>>),
    Frame(ConnectionResult<Option<String>>),
    ReconnectDue,
}

struct Driver {
    url: String,
    policy: BackoffPolicy,
    transport: Arc<dyn Transport>,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    alert_tx: broadcast::Sender<AlertRecord>,
    commands: mpsc::UnboundedReceiver<Command>,
    pending_connect: Option<ConnectFuture>,
    socket: Option<Box<dyn AlertSocket>>,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                biased;
                command = self.commands.recv() => Event::Command(command),
                frame = next_frame(&mut self.socket) => Event::Frame(frame),
                opened = finish_connect(&mut self.pending_connect) => Event::Opened(opened),
                _ = reconnect_due(&mut self.reconnect) => Event::ReconnectDue,
            };

            match event {
                Event::Command(Some(Command::Connect)) => self.connect(),
                Event::Command(Some(Command::RetryManually)) => self.retry_manually(),
                Event::Command(Some(Command::DismissError)) => {
                    self.state.dismiss_error();
                    self.publish();
                }
                Event::Command(Some(Command::Shutdown)) | Event::Command(None) => {
                    self.teardown().await;
                    break;
                }
                Event::Opened(Ok(socket)) => self.on_open(socket),
                Event::Opened(Err(e)) => {
                    tracing::warn!(url = %self.url, error = %e, "WebSocket connection failed");
                    self.on_error();
                    self.on_close();
                }
                Event::Frame(Ok(Some(text))) => self.on_message(&text),
                Event::Frame(Ok(None)) => {
                    tracing::info!(url = %self.url, "WebSocket disconnected");
                    self.socket = None;
                    self.on_close();
                }
                Event::Frame(Err(e)) => {
                    tracing::warn!(url = %self.url, error = %e, "WebSocket error");
                    self.socket = None;
                    self.on_error();
                    self.on_close();
                }
                Event::ReconnectDue => {
                    self.reconnect = None;
                    self.state.on_retry_timer();
                    tracing::info!(attempt = self.state.retry_count, "Attempting reconnect");
                    self.connect();
                }
            }
        }
    }

    fn connect(&mut self) {
        if !self.state.begin_connect() {
            tracing::debug!(status = %self.state.status, "Connect ignored");
            return;
        }
        // A connect supersedes any scheduled one
        self.reconnect = None;
        self.publish();

        tracing::debug!(url = %self.url, "Connecting");
        let transport = Arc::clone(&self.transport);
        let url = self.url.clone();
        self.pending_connect = Some(Box::pin(async move { transport.connect(&url).await }));
    }

    fn retry_manually(&mut self) {
        self.reconnect = None;
        self.state.retry_manually();
        self.publish();
        self.connect();
    }

    fn on_open(&mut self, socket: Box<dyn AlertSocket>) {
        tracing::info!(url = %self.url, "WebSocket connected");
        self.socket = Some(socket);
        self.state.on_open();
        self.publish();
    }

    fn on_message(&mut self, raw: &str) {
        match AlertRecord::parse(raw) {
            Ok(alert) => {
                tracing::debug!(kind = %alert.kind, position = %alert.position, "Alert received");
                // No subscribers is fine: nobody is rendering yet
                let _ = self.alert_tx.send(alert);
            }
            Err(e) => {
                tracing::warn!(error = %e, frame = %preview(raw), "Dropping malformed alert frame");
            }
        }
    }

    fn on_error(&mut self) {
        self.state.on_error();
        self.publish();
    }

    fn on_close(&mut self) {
        match self.state.on_close(&self.policy) {
            Some(delay) => {
                tracing::info!(
                    delay_ms = delay.as_millis() as u64,
                    retry = self.state.retry_count + 1,
                    max_retries = self.policy.max_retries,
                    "Scheduling reconnect"
                );
                self.reconnect = Some(Box::pin(sleep(delay)));
            }
            None => {
                tracing::warn!(
                    max_retries = self.policy.max_retries,
                    "Reconnect budget exhausted; waiting for manual retry"
                );
            }
        }
        self.publish();
    }

    async fn teardown(&mut self) {
        self.pending_connect = None;
        self.reconnect = None;
        if let Some(mut socket) = self.socket.take() {
            socket.close().await;
        }
        self.state.on_shutdown();
        self.publish();
        tracing::info!(url = %self.url, "Connection manager stopped");
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn next_frame(socket: &mut Option<Box<dyn AlertSocket>>) -> ConnectionResult<Option<String>> {
    match socket {
        Some(socket) => socket.next_frame().await,
        None => pending().await,
    }
}

async fn finish_connect(
    pending_connect: &mut Option<ConnectFuture>,
) -> ConnectionResult<Box<dyn AlertSocket>> {
    let result = match pending_connect.as_mut() {
        Some(future) => future.await,
        None => pending().await,
    };
    *pending_connect = None;
    result
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

/// First 120 characters of a frame for log output
fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(120) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::state::ConnectionStatus;
    use crate::connection::testing::ScriptedTransport;
    use std::time::Duration;

    const CAR_ALERT: &str = r#"{"type":"car","message":"Car detected left","position":"left","timestamp":1700000000}"#;

    fn manager(transport: &Arc<ScriptedTransport>) -> ConnectionManager {
        let transport: Arc<dyn Transport> = transport.clone();
        ConnectionManager::spawn(ConnectionConfig::default(), transport)
    }

    async fn wait_until(
        rx: &mut watch::Receiver<ConnectionState>,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) {
        rx.wait_for(predicate).await.expect("driver stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_receive_alert() {
        let transport = ScriptedTransport::new();
        let server = transport.accept_next();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();
        let mut alerts = manager.subscribe_alerts();

        manager.connect();
        wait_until(&mut state_rx, |s| s.is_connected()).await;

        server.send_text(CAR_ALERT);
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert, AlertRecord::new("car", "Car detected left", "left", 1700000000));

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_dropped() {
        let transport = ScriptedTransport::new();
        let server = transport.accept_next();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();
        let mut alerts = manager.subscribe_alerts();

        manager.connect();
        wait_until(&mut state_rx, |s| s.is_connected()).await;

        server.send_text("not json at all");
        server.send_text(r#"{"unexpected": true}"#);
        server.send_text(CAR_ALERT);

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.message, "Car detected left");
        assert!(alerts.try_recv().is_err());

        let state = manager.state();
        assert_eq!(state.status, ConnectionStatus::Connected);
        assert!(!state.last_error);
        assert_eq!(transport.attempt_count(), 1);

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_and_retry_ceiling() {
        let transport = ScriptedTransport::new();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| {
            s.retry_count == 5 && s.status == ConnectionStatus::Disconnected
        })
        .await;

        // Initial attempt plus five automatic retries
        assert_eq!(transport.attempt_count(), 6);
        assert_eq!(
            transport.attempt_gaps_ms(),
            vec![1000, 2000, 4000, 8000, 10_000]
        );
        assert!(manager.state().last_error);

        // No further automatic attempts
        sleep(Duration::from_secs(300)).await;
        assert_eq!(transport.attempt_count(), 6);

        manager.retry_manually();
        wait_until(&mut state_rx, |s| s.retry_count == 0).await;
        sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.attempt_count(), 7);

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reconnects_and_resets_retry_count() {
        let transport = ScriptedTransport::new();
        let first = transport.accept_next();
        let second = transport.accept_next();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| s.is_connected()).await;

        drop(first);
        wait_until(&mut state_rx, |s| s.status == ConnectionStatus::Disconnected).await;
        wait_until(&mut state_rx, |s| s.is_connected()).await;

        let state = manager.state();
        assert_eq!(state.retry_count, 0);
        assert!(!state.last_error);
        assert_eq!(transport.attempt_gaps_ms(), vec![1000]);

        drop(second);
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_error_raises_error_flag() {
        let transport = ScriptedTransport::new();
        let server = transport.accept_next();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| s.is_connected()).await;

        server.fail("reset by peer");
        wait_until(&mut state_rx, |s| {
            s.last_error && s.status == ConnectionStatus::Disconnected
        })
        .await;

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_noop_while_connected() {
        let transport = ScriptedTransport::new();
        let _server = transport.accept_next();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| s.is_connected()).await;
        manager.connect();
        manager.connect();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.attempt_count(), 1);
        assert!(manager.state().is_connected());

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_supersedes_pending_reconnect() {
        let transport = ScriptedTransport::new();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| {
            s.last_error && s.status == ConnectionStatus::Disconnected
        })
        .await;

        // A 1s reconnect is pending; connect early instead
        sleep(Duration::from_millis(10)).await;
        manager.connect();
        sleep(Duration::from_millis(1)).await;
        assert_eq!(transport.attempt_count(), 2);
        assert_eq!(manager.state().retry_count, 0);

        wait_until(&mut state_rx, |s| {
            s.retry_count == 5 && s.status == ConnectionStatus::Disconnected
        })
        .await;

        // The cancelled timer never fired; the schedule restarted from the manual attempt
        assert_eq!(
            transport.attempt_gaps_ms(),
            vec![10, 1000, 2000, 4000, 8000, 10_000]
        );
        sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempt_count(), 7);

        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_reconnect() {
        let transport = ScriptedTransport::new();
        let manager = manager(&transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| {
            s.last_error && s.status == ConnectionStatus::Disconnected
        })
        .await;
        assert_eq!(transport.attempt_count(), 1);

        manager.shutdown().await;
        manager.shutdown().await;

        sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempt_count(), 1);
        assert_eq!(manager.state().status, ConnectionStatus::Disconnected);

        // Commands after shutdown are ignored
        manager.connect();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_error_without_reconnecting() {
        let transport = ScriptedTransport::new();
        let config = ConnectionConfig {
            backoff: BackoffPolicy::new(0, Duration::from_secs(1), Duration::from_secs(10)),
            ..Default::default()
        };
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let manager = ConnectionManager::spawn(config, dyn_transport);
        let mut state_rx = manager.subscribe_state();

        manager.connect();
        wait_until(&mut state_rx, |s| {
            s.last_error && s.status == ConnectionStatus::Disconnected
        })
        .await;

        manager.dismiss_error();
        wait_until(&mut state_rx, |s| !s.last_error).await;
        sleep(Duration::from_secs(30)).await;

        assert_eq!(manager.state().status, ConnectionStatus::Disconnected);
        assert_eq!(transport.attempt_count(), 1);

        manager.shutdown().await;
    }

    #[test]
    fn test_preview_truncates_long_frames() {
        let long = "x".repeat(500);
        assert_eq!(preview(&long).len(), 120);
        assert_eq!(preview("short"), "short");
    }
}
