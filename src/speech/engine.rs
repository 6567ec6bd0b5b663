//! Text-to-speech engines

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Errors from a speech engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// The synthesizer could not be started
    #[error("Speech engine unavailable: {0}")]
    Unavailable(String),

    /// The synthesizer failed while speaking
    #[error("Speech failed: {0}")]
    Failed(String),
}

pub type SpeechResult<T> = Result<T, SpeechError>;

/// A text-to-speech backend
///
/// `speak` resolves when the utterance has finished. Dropping the future must
/// stop the utterance.
#[async_trait]
pub trait SpeechEngine: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn speak(&self, text: &str) -> SpeechResult<()>;
}

/// Speaks through an external synthesizer process (espeak by default)
///
/// The text is passed as the final argument. The process is killed when the
/// utterance is canceled.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// espeak at the given rate in words per minute
    pub fn espeak(rate_wpm: u32) -> Self {
        Self::new("espeak", vec!["-s".to_string(), rate_wpm.to_string()])
    }
}

#[async_trait]
impl SpeechEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    async fn speak(&self, text: &str) -> SpeechResult<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| SpeechError::Unavailable(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Failed(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Engine used when speech is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentEngine;

#[async_trait]
impl SpeechEngine for SilentEngine {
    fn name(&self) -> &str {
        "silent"
    }

    async fn speak(&self, text: &str) -> SpeechResult<()> {
        tracing::debug!(text = %text, "Speech disabled, not speaking");
        Ok(())
    }
}
