//! `Speaker` — the synthesize-then-play facade used by the module pipelines.
//!
//! The pipelines never deal with clip bytes or audio devices; they hold an
//! `Arc<dyn SpeechSynthesizer>` and call [`speak`](SpeechSynthesizer::speak),
//! which resolves once the clip has finished playing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::lang::Language;
use crate::speech::client::{SpeechEngine, SpeechError};
use crate::speech::playback::AudioSink;

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Speak a text aloud in a given language.
///
/// # Contract
///
/// - `text` must be non-empty ([`SpeechError::EmptyText`]); the check runs
///   **before** any network traffic.
/// - Resolves `Ok(())` only when playback has ended naturally, so a caller
///   can sequence "speak, then re-arm the button" without polling.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError>;
}

// Compile-time assertion: Box<dyn SpeechSynthesizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechSynthesizer>) {}
};

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Production [`SpeechSynthesizer`]: a [`SpeechEngine`] for synthesis plus
/// an [`AudioSink`] for output.
pub struct Speaker {
    engine: Arc<dyn SpeechEngine>,
    sink: Arc<dyn AudioSink>,
}

impl Speaker {
    pub fn new(engine: Arc<dyn SpeechEngine>, sink: Arc<dyn AudioSink>) -> Self {
        Self { engine, sink }
    }
}

#[async_trait]
impl SpeechSynthesizer for Speaker {
    async fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let audio = self.engine.synthesize(text, language).await?;

        log::debug!(
            "speaker: playing {} byte clip ({})",
            audio.len(),
            language.tag()
        );

        // The sink blocks until the clip ends; keep it off the async runtime.
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.play(audio))
            .await
            .map_err(|e| SpeechError::Playback(format!("playback task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// MockSpeaker  (test-only)
// ---------------------------------------------------------------------------

/// A test double for the whole speak step: records requests, touches no
/// network and no device.
#[cfg(test)]
pub struct MockSpeaker {
    result: Result<(), SpeechError>,
    spoken: std::sync::Mutex<Vec<(String, Language)>>,
}

#[cfg(test)]
impl MockSpeaker {
    /// Create a speaker whose every call succeeds.
    pub fn ok() -> Self {
        Self {
            result: Ok(()),
            spoken: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a speaker whose every call fails with `error`.
    pub fn err(error: SpeechError) -> Self {
        Self {
            result: Err(error),
            spoken: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// All `(text, language)` pairs spoken so far.
    pub fn spoken(&self) -> Vec<(String, Language)> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn speak_count(&self) -> usize {
        self.spoken.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSpeaker {
    async fn speak(&self, text: &str, language: Language) -> Result<(), SpeechError> {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), language));
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
