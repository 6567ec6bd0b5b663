//! Speech Output
//!
//! Alerts are read aloud one at a time: a new message interrupts whatever is
//! being spoken, so the most recent alert always wins.
//!
//! - [`SpeechEngine`]: a text-to-speech backend (native synthesizer, external
//!   program or silent)
//! - [`SpeechAnnouncer`]: cancels the in-flight utterance and tracks `speaking`

mod announcer;
mod engine;
#[cfg(not(target_os = "linux"))]
mod native;

#[cfg(test)]
pub(crate) mod testing;

pub use announcer::SpeechAnnouncer;
pub use engine::{CommandEngine, SilentEngine, SpeechEngine, SpeechError, SpeechResult};
#[cfg(not(target_os = "linux"))]
pub use native::TtsEngine;
