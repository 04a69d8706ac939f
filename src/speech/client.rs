//! Core `SpeechEngine` trait and `SpeechClient` implementation.
//!
//! `SpeechClient` calls a Sarvam-style text-to-speech endpoint: one text
//! input plus a target locale tag in, a WAV clip (base64 in the `audios`
//! array) out.  Voice parameters (speaker, pitch, pace, loudness, sample
//! rate, model) all come from [`SpeechConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;

use crate::config::SpeechConfig;
use crate::lang::Language;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesizing or playing speech.
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    /// The text to speak was empty; nothing was sent.
    #[error("nothing to speak: text is empty")]
    EmptyText,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("speech request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("speech service error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The response (or its base64 audio payload) could not be decoded.
    #[error("failed to decode speech response: {0}")]
    Decode(String),

    /// The response carried an empty `audios` array.
    #[error("speech service returned no audio")]
    NoAudio,

    /// The audio device or decoder failed during playback.
    #[error("audio playback failed: {0}")]
    Playback(String),
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SpeechError::Timeout
        } else {
            SpeechError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// Async interface to the speech-synthesis service.
///
/// Returns the raw audio clip; playing it is the sink's job.  Implementors
/// must be `Send + Sync` so they can sit behind an `Arc<dyn SpeechEngine>`.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize `text` spoken in `language` and return the clip bytes.
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, SpeechError>;
}

// Compile-time assertion: Box<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(default)]
    audios: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FailureBody {
    message: String,
}

/// Build the synthesis request body.  `inputs` is an array by contract even
/// though we always send exactly one text.
fn build_request_body(config: &SpeechConfig, text: &str, language: Language) -> serde_json::Value {
    serde_json::json!({
        "inputs": [text],
        "target_language_code": language.tag(),
        "speaker": config.speaker,
        "pitch": config.pitch,
        "pace": config.pace,
        "loudness": config.loudness,
        "speech_sample_rate": config.sample_rate,
        "enable_preprocessing": config.enable_preprocessing,
        "model": config.model,
    })
}

/// Base64-decode the first entry of the `audios` array.
fn first_audio(response: SynthesizeResponse) -> Result<Vec<u8>, SpeechError> {
    let encoded = response
        .audios
        .into_iter()
        .next()
        .ok_or(SpeechError::NoAudio)?;

    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| SpeechError::Decode(format!("invalid base64 audio: {e}")))
}

/// Map a non-success response to [`SpeechError::Upstream`], preferring the
/// service's own `{"message":…}` body over the status reason.
fn upstream_error(status: reqwest::StatusCode, body: &str) -> SpeechError {
    let message = serde_json::from_str::<FailureBody>(body)
        .map(|f| f.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    SpeechError::Upstream {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// SpeechClient
// ---------------------------------------------------------------------------

/// Production [`SpeechEngine`] over HTTP.
///
/// The `api-subscription-key` header is attached **only** when
/// `config.api_key` is a non-empty string.
pub struct SpeechClient {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechClient {
    /// Build a `SpeechClient` from application config, with the per-request
    /// timeout from `config.timeout_secs`.
    pub fn from_config(config: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SpeechEngine for SpeechClient {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let body = build_request_body(&self.config, text, language);

        log::debug!(
            "speech: POST {} ({} chars, {})",
            self.config.base_url,
            text.len(),
            language.tag()
        );

        let mut req = self.client.post(&self.config.base_url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.header("api-subscription-key", key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status, &body));
        }

        let decoded: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Decode(e.to_string()))?;

        first_audio(decoded)
    }
}

// ---------------------------------------------------------------------------
// MockSpeechEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns pre-configured clip bytes (or an error) and
/// records every request.
#[cfg(test)]
pub struct MockSpeechEngine {
    response: Result<Vec<u8>, SpeechError>,
    requests: std::sync::Mutex<Vec<(String, Language)>>,
}

#[cfg(test)]
impl MockSpeechEngine {
    /// Create a mock that always returns `Ok(audio)`.
    pub fn ok(audio: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Ok(audio.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: SpeechError) -> Self {
        Self {
            response: Err(error),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// All `(text, language)` pairs synthesized so far.
    pub fn requests(&self) -> Vec<(String, Language)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>, SpeechError> {
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), language));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
