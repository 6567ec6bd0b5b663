//! Recording speech engine for tests

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{SpeechEngine, SpeechResult};

/// Records what was started and what was heard to the end
pub(crate) struct RecordingEngine {
    duration: Duration,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl RecordingEngine {
    pub(crate) fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            started: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub(crate) fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn speak(&self, text: &str) -> SpeechResult<()> {
        self.started.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.duration).await;
        self.finished.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
