//! Configuration module for Sahayak.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the two
//! upstream services and the UI, `AppPaths` for cross-platform data
//! directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, GatewayConfig, SpeechConfig, UiConfig};
