//! Audio output sink — plays a synthesized clip to completion.
//!
//! [`AudioSink::play`] is deliberately **blocking**: it returns only when
//! the clip has finished (or failed).  Callers that live on the async
//! runtime wrap it in `tokio::task::spawn_blocking`; see
//! [`Speaker`](crate::speech::Speaker).
//!
//! [`RodioSink`] is the production implementation.  It opens a fresh output
//! stream per clip, which keeps the sink stateless and `Sync` (rodio's
//! stream handle is not `Send`, so it must live and die on the thread that
//! plays the clip).

use std::io::Cursor;

use crate::speech::client::SpeechError;

// ---------------------------------------------------------------------------
// AudioSink trait
// ---------------------------------------------------------------------------

/// Blocking audio output.
///
/// # Contract
///
/// - `audio` is a complete encoded clip (the speech service returns WAV).
/// - Returns `Ok(())` only after playback has ended naturally.
/// - Returns `Err(SpeechError::Playback)` when the device or decoder fails;
///   no partial-playback state is left behind.
pub trait AudioSink: Send + Sync {
    /// Decode and play `audio`, blocking until the clip ends.
    fn play(&self, audio: Vec<u8>) -> Result<(), SpeechError>;
}

// Compile-time assertion: Box<dyn AudioSink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioSink>) {}
};

// ---------------------------------------------------------------------------
// RodioSink
// ---------------------------------------------------------------------------

/// Production sink backed by the default audio output device.
#[derive(Debug, Default)]
pub struct RodioSink;

impl RodioSink {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSink for RodioSink {
    fn play(&self, audio: Vec<u8>) -> Result<(), SpeechError> {
        // The stream handle must outlive the sink; both are dropped together
        // when this function returns, on every exit path.
        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| SpeechError::Playback(format!("no output device: {e}")))?;

        let sink = rodio::Sink::try_new(&handle)
            .map_err(|e| SpeechError::Playback(e.to_string()))?;

        let source = rodio::Decoder::new(Cursor::new(audio))
            .map_err(|e| SpeechError::Playback(format!("undecodable clip: {e}")))?;

        sink.append(source);
        sink.sleep_until_end();

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSink  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records every played clip without touching a device.
#[cfg(test)]
pub struct MockSink {
    result: Result<(), SpeechError>,
    played: std::sync::Mutex<Vec<Vec<u8>>>,
}

#[cfg(test)]
impl MockSink {
    /// Create a sink whose every play succeeds.
    pub fn ok() -> Self {
        Self {
            result: Ok(()),
            played: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a sink whose every play fails with `error`.
    pub fn err(error: SpeechError) -> Self {
        Self {
            result: Err(error),
            played: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// All clips played so far, in order.
    pub fn played(&self) -> Vec<Vec<u8>> {
        self.played.lock().unwrap().clone()
    }

    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

#[cfg(test)]
impl AudioSink for MockSink {
    fn play(&self, audio: Vec<u8>) -> Result<(), SpeechError> {
        self.played.lock().unwrap().push(audio);
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
