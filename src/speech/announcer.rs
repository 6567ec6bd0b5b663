//! Speech Announcer
//!
//! Each utterance runs on its own task. Starting a new one aborts the old
//! task, which drops the engine future and stops the synthesizer.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::engine::SpeechEngine;

#[derive(Default)]
struct Utterances {
    /// Bumped for every utterance; only the latest may clear `speaking`
    generation: u64,
    speaking: bool,
    current: Option<JoinHandle<()>>,
}

/// Speaks at most one message at a time
pub struct SpeechAnnouncer {
    engine: Arc<dyn SpeechEngine>,
    utterances: Arc<Mutex<Utterances>>,
}

impl SpeechAnnouncer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            utterances: Arc::new(Mutex::new(Utterances::default())),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Interrupt whatever is being spoken and start speaking `message`
    ///
    /// Never fails; engine errors are logged and reset `speaking`.
    pub async fn speak(&self, message: &str) {
        let mut utterances = self.utterances.lock().await;
        if let Some(previous) = utterances.current.take() {
            previous.abort();
        }

        utterances.generation += 1;
        utterances.speaking = true;
        let generation = utterances.generation;

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.utterances);
        let message = message.to_string();
        utterances.current = Some(tokio::spawn(async move {
            if let Err(e) = engine.speak(&message).await {
                tracing::warn!(engine = %engine.name(), error = %e, "Speech failed");
            }
            let mut utterances = shared.lock().await;
            if utterances.generation == generation {
                utterances.speaking = false;
                utterances.current = None;
            }
        }));
    }

    /// Stop the in-flight utterance, if any
    pub async fn cancel(&self) {
        let mut utterances = self.utterances.lock().await;
        if let Some(current) = utterances.current.take() {
            current.abort();
        }
        utterances.generation += 1;
        utterances.speaking = false;
    }

    pub async fn is_speaking(&self) -> bool {
        self.utterances.lock().await.speaking
    }
}

impl Drop for SpeechAnnouncer {
    fn drop(&mut self) {
        if let Ok(mut utterances) = self.utterances.try_lock() {
            if let Some(current) = utterances.current.take() {
                current.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::engine::{SpeechError, SpeechResult};
    use crate::speech::testing::RecordingEngine;
    use async_trait::async_trait;
    use std::time::Duration;

    struct BrokenEngine;

    #[async_trait]
    impl SpeechEngine for BrokenEngine {
        fn name(&self) -> &str {
            "broken"
        }

        async fn speak(&self, _text: &str) -> SpeechResult<()> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(SpeechError::Failed("audio device lost".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_speaking_flag_follows_utterance() {
        let engine = RecordingEngine::new(Duration::from_secs(2));
        let announcer = SpeechAnnouncer::new(engine.clone());

        assert!(!announcer.is_speaking().await);
        announcer.speak("Car detected left").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(announcer.is_speaking().await);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!announcer.is_speaking().await);
        assert_eq!(engine.finished(), vec!["Car detected left"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_message_interrupts_previous() {
        let engine = RecordingEngine::new(Duration::from_secs(2));
        let announcer = SpeechAnnouncer::new(engine.clone());

        announcer.speak("m1").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        announcer.speak("m2").await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(engine.started(), vec!["m1", "m2"]);
        assert_eq!(engine.finished(), vec!["m2"]);
        assert!(!announcer.is_speaking().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_messages() {
        let engine = RecordingEngine::new(Duration::from_secs(2));
        let announcer = SpeechAnnouncer::new(engine.clone());

        announcer.speak("m1").await;
        announcer.speak("m2").await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(engine.finished(), vec!["m2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_failure_is_swallowed() {
        let announcer = SpeechAnnouncer::new(Arc::new(BrokenEngine));

        announcer.speak("will fail").await;
        assert!(announcer.is_speaking().await);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!announcer.is_speaking().await);

        // Next message still gets a chance
        announcer.speak("try again").await;
        assert!(announcer.is_speaking().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_utterance() {
        let engine = RecordingEngine::new(Duration::from_secs(2));
        let announcer = SpeechAnnouncer::new(engine.clone());

        announcer.speak("m1").await;
        announcer.cancel().await;
        assert!(!announcer.is_speaking().await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(engine.finished().is_empty());
        assert_eq!(announcer.engine_name(), "recording");
    }
}
