//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::lang::Language;

use super::AppPaths;

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Connection settings for the multimodal completion service.
///
/// Every module pipeline (triage, scribe, prescriptions) runs its stages
/// through the same endpoint and the same model; only the prompt and the
/// attached payload differ per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the API endpoint (up to but not including `/models/…`).
    pub base_url: String,
    /// API key sent as the `key` query parameter — `None` (or empty) when a
    /// fronting proxy injects credentials itself.
    pub api_key: Option<String>,
    /// Model identifier used for every pipeline stage.
    pub model: String,
    /// Maximum seconds to wait for a completion before timing out.  Image
    /// and audio payloads make these requests slow; keep this generous.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: None,
            model: "gemini-2.5-flash".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Connection and voice settings for the speech-synthesis service.
///
/// The voice parameters are sent verbatim in every request body; the
/// defaults match the service's documented values for the `bulbul:v2`
/// model with the `anushka` voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Full URL of the text-to-speech endpoint.
    pub base_url: String,
    /// API key sent as the `api-subscription-key` header — `None` (or
    /// empty) to send no credentials.
    pub api_key: Option<String>,
    /// Voice name.
    pub speaker: String,
    /// Pitch adjustment (0.0 = the voice's natural pitch).
    pub pitch: f32,
    /// Speaking rate multiplier (1.0 = normal speed).
    pub pace: f32,
    /// Output loudness multiplier (1.0 = normal volume).
    pub loudness: f32,
    /// Sample rate of the returned clip in Hz.
    pub sample_rate: u32,
    /// Let the service normalize numbers, dates and abbreviations before
    /// synthesis.
    pub enable_preprocessing: bool,
    /// Synthesis model identifier.
    pub model: String,
    /// Maximum seconds to wait for a clip before timing out.
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sarvam.ai/text-to-speech".into(),
            api_key: None,
            speaker: "anushka".into(),
            pitch: 0.0,
            pace: 1.0,
            loudness: 1.0,
            sample_rate: 8000,
            enable_preprocessing: true,
            model: "bulbul:v2".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Language pre-selected in every module's output selector on launch.
    /// Each module can still switch independently at runtime.
    pub default_language: Language,
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Show the collapsible raw-response panel under each result card.
    pub show_raw_response: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_language: Language::English,
            window_position: None,
            show_raw_response: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use sahayak::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings.
    pub gateway: GatewayConfig,
    /// Speech-synthesis settings.
    pub speech: SpeechConfig,
    /// UI / window settings.
    pub ui: UiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            speech: SpeechConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
