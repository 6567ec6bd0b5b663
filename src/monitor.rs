//! Alert Monitor
//!
//! Wires the connection manager to the alert store, the speech announcer and
//! the presenter view. Every inbound alert is stored, then spoken; every
//! alert or connection change republishes the view.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::alerts::{AlertRecord, AlertStore};
use crate::connection::{ConnectionConfig, ConnectionManager, ConnectionState, Transport};
use crate::presenter::AlertView;
use crate::speech::{SpeechAnnouncer, SpeechEngine};

/// Monitor configuration
///
/// The on-screen history is always the ten newest alerts.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub connection: ConnectionConfig,
}

/// Running alert monitor
pub struct AlertMonitor {
    manager: Arc<ConnectionManager>,
    store: Arc<RwLock<AlertStore>>,
    announcer: Arc<SpeechAnnouncer>,
    view_rx: watch::Receiver<AlertView>,
    ingest: Mutex<Option<JoinHandle<()>>>,
}

impl AlertMonitor {
    /// Start ingesting and connect to the relay
    pub fn start(
        config: MonitorConfig,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn SpeechEngine>,
    ) -> Self {
        let manager = Arc::new(ConnectionManager::spawn(config.connection, transport));
        let store = Arc::new(RwLock::new(AlertStore::default()));
        let announcer = Arc::new(SpeechAnnouncer::new(engine));

        // Subscribe before connecting so no alert is missed
        let alerts = manager.subscribe_alerts();
        let state_rx = manager.subscribe_state();
        let (view_tx, view_rx) = watch::channel(AlertView::new(&manager.state(), Vec::new()));

        let ingest = tokio::spawn(ingest_loop(
            alerts,
            state_rx,
            Arc::clone(&store),
            Arc::clone(&announcer),
            view_tx,
        ));

        tracing::info!(speech = %announcer.engine_name(), "Alert monitor started");
        manager.connect();

        Self {
            manager,
            store,
            announcer,
            view_rx,
            ingest: Mutex::new(Some(ingest)),
        }
    }

    /// Latest presenter view
    pub fn view(&self) -> AlertView {
        self.view_rx.borrow().clone()
    }

    /// Observe view changes
    pub fn subscribe_view(&self) -> watch::Receiver<AlertView> {
        self.view_rx.clone()
    }

    pub async fn alerts(&self) -> Vec<AlertRecord> {
        self.store.read().await.snapshot()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub async fn is_speaking(&self) -> bool {
        self.announcer.is_speaking().await
    }

    /// User asked to retry the connection
    pub fn retry(&self) {
        self.manager.retry_manually();
    }

    /// User closed the error notice
    pub fn dismiss_error(&self) {
        self.manager.dismiss_error();
    }

    /// Close the socket, cancel timers and silence speech. Idempotent.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
        if let Some(ingest) = self.ingest.lock().await.take() {
            if let Err(e) = ingest.await {
                tracing::error!(error = %e, "Alert ingestion task panicked");
            }
        }
        self.announcer.cancel().await;
        tracing::info!("Alert monitor stopped");
    }
}

async fn ingest_loop(
    mut alerts: broadcast::Receiver<AlertRecord>,
    mut state_rx: watch::Receiver<ConnectionState>,
    store: Arc<RwLock<AlertStore>>,
    announcer: Arc<SpeechAnnouncer>,
    view_tx: watch::Sender<AlertView>,
) {
    loop {
        tokio::select! {
            received = alerts.recv() => match received {
                Ok(alert) => {
                    tracing::info!(kind = %alert.kind, position = %alert.position, message = %alert.message, "Alert");
                    store.write().await.push(alert.clone());
                    announcer.speak(&alert.message).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Alert ingestion lagged, alerts dropped");
                }
                Err(RecvError::Closed) => break,
            },
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let state = state_rx.borrow_and_update().clone();
        let alerts = store.read().await.snapshot();
        view_tx.send_replace(AlertView::new(&state, alerts));
    }

    // Final state after the driver stopped
    let state = state_rx.borrow().clone();
    let alerts = store.read().await.snapshot();
    view_tx.send_replace(AlertView::new(&state, alerts));
}
