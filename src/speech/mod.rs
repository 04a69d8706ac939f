//! Speech output — synthesis client, audio sink and the `Speaker` facade.
//!
//! # Architecture
//!
//! ```text
//! SpeechSynthesizer::speak(text, language)          ← module pipelines
//!        │
//!        ├─ SpeechEngine::synthesize  → Vec<u8>     ← HTTP (SpeechClient)
//!        │
//!        └─ spawn_blocking(AudioSink::play)         ← device (RodioSink)
//!               └─ returns when the clip ends
//! ```
//!
//! The `speak` future resolves only when playback has finished, so the UI
//! can keep a control disabled for exactly the audible duration.

pub mod client;
pub mod playback;
pub mod speaker;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{SpeechClient, SpeechEngine, SpeechError};
pub use playback::{AudioSink, RodioSink};
pub use speaker::{Speaker, SpeechSynthesizer};

// test-only re-exports for orchestrator test modules.
#[cfg(test)]
pub use client::MockSpeechEngine;
#[cfg(test)]
pub use playback::MockSink;
#[cfg(test)]
pub use speaker::MockSpeaker;
