//! Sahayak — a desktop assistant for rural clinical staff.
//!
//! Three independent modules share one multimodal completion service and one
//! speech-synthesis service:
//!
//! * **Injury Assistance** ([`modules::triage`]) — an injury photo becomes a
//!   structured severity assessment with first-aid steps, optionally
//!   translated and spoken aloud.
//! * **AI Medical Scribe** ([`modules::scribe`]) — a consultation recording
//!   becomes a transcript and a clinical summary, optionally translated.
//! * **Prescription Reader** ([`modules::rxvox`]) — a prescription photo
//!   becomes a medication list; each instruction can be translated and
//!   played aloud.
//!
//! Layering:
//!
//! ```text
//! app (egui shell)
//!   └─ modules (orchestrators: triage / scribe / rxvox)
//!        ├─ gateway (completion HTTP client, attachments, result parsing)
//!        ├─ speech  (synthesis HTTP client, playback sink, Speaker facade)
//!        ├─ lang    (the 11 supported locales)
//!        └─ config  (settings.toml persistence)
//! ```

pub mod app;
pub mod config;
pub mod gateway;
pub mod lang;
pub mod modules;
pub mod speech;
