//! Native text-to-speech through the `tts` crate (SAPI, AVFoundation, ...)
//!
//! The platform synthesizer lives on its own thread; the async side only
//! sends commands. Each utterance carries an id so a late stop from an
//! aborted utterance never silences its replacement.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

use super::engine::{SpeechEngine, SpeechError, SpeechResult};

/// How often the synthesizer thread checks whether speech has ended
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Rate `tts` calls normal, in words per minute
const NORMAL_WPM: f32 = 150.0;

enum TtsCommand {
    Speak {
        id: u64,
        text: String,
        done: oneshot::Sender<SpeechResult<()>>,
    },
    Stop {
        id: u64,
    },
}

/// Speaks through the operating system's synthesizer
pub struct TtsEngine {
    commands: mpsc::Sender<TtsCommand>,
    next_id: AtomicU64,
}

impl TtsEngine {
    /// Start the synthesizer thread at `rate_wpm` words per minute
    pub fn new(rate_wpm: u32) -> SpeechResult<Self> {
        let (commands, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("beetleguard-tts".to_string())
            .spawn(move || {
                let mut tts = match tts::Tts::default() {
                    Ok(tts) => tts,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SpeechError::Unavailable(e.to_string())));
                        return;
                    }
                };
                let rate = scaled_rate(
                    rate_wpm,
                    tts.min_rate(),
                    tts.normal_rate(),
                    tts.max_rate(),
                );
                if let Err(e) = tts.set_rate(rate) {
                    tracing::debug!(error = %e, "Speech rate not supported");
                }
                let _ = ready_tx.send(Ok(()));
                run_synthesizer(&mut tts, rx);
            })
            .map_err(|e| SpeechError::Unavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| SpeechError::Unavailable("tts thread exited".to_string()))??;

        Ok(Self {
            commands,
            next_id: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl SpeechEngine for TtsEngine {
    fn name(&self) -> &str {
        "tts"
    }

    async fn speak(&self, text: &str) -> SpeechResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (done, finished) = oneshot::channel();

        self.commands
            .send(TtsCommand::Speak {
                id,
                text: text.to_string(),
                done,
            })
            .map_err(|_| SpeechError::Unavailable("tts thread exited".to_string()))?;

        let mut guard = StopOnDrop {
            commands: &self.commands,
            id,
            armed: true,
        };
        let result = finished
            .await
            .unwrap_or_else(|_| Err(SpeechError::Failed("tts thread exited".to_string())));
        guard.armed = false;
        result
    }
}

/// Stops the utterance when the speak future is dropped before it finishes
struct StopOnDrop<'a> {
    commands: &'a mpsc::Sender<TtsCommand>,
    id: u64,
    armed: bool,
}

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.commands.send(TtsCommand::Stop { id: self.id });
        }
    }
}

fn run_synthesizer(tts: &mut tts::Tts, rx: mpsc::Receiver<TtsCommand>) {
    let mut current: Option<(u64, oneshot::Sender<SpeechResult<()>>)> = None;

    loop {
        let command = if current.is_some() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(TtsCommand::Speak { id, text, done }) => {
                if let Some((_, previous)) = current.take() {
                    let _ = previous.send(Ok(()));
                }
                match tts.speak(text, true) {
                    Ok(_) => current = Some((id, done)),
                    Err(e) => {
                        let _ = done.send(Err(SpeechError::Failed(e.to_string())));
                    }
                }
            }
            Some(TtsCommand::Stop { id }) => {
                if matches!(current, Some((current_id, _)) if current_id == id) {
                    if let Err(e) = tts.stop() {
                        tracing::debug!(error = %e, "Failed to stop speech");
                    }
                    current = None;
                }
            }
            None => match tts.is_speaking() {
                Ok(true) => {}
                // Finished, or the backend cannot tell
                Ok(false) | Err(_) => {
                    if let Some((_, done)) = current.take() {
                        let _ = done.send(Ok(()));
                    }
                }
            },
        }
    }

    let _ = tts.stop();
}

/// Map words per minute onto the backend's rate range
pub(crate) fn scaled_rate(rate_wpm: u32, min: f32, normal: f32, max: f32) -> f32 {
    (normal * rate_wpm as f32 / NORMAL_WPM).clamp(min, max)
}
