//! The three clinical module pipelines and their shared plumbing.
//!
//! Each module — trauma triage, consultation scribe, Rx-Vox — is an
//! independent orchestrator task that owns its own session state, listens on
//! its own command channel, and mirrors displayable state into a shared view
//! the UI locks each frame.  The modules share code, not state: they compose
//! the same gateway, parser, and speech clients, but one module's pipeline
//! never touches another's session.
//!
//! # Architecture
//!
//! ```text
//! UI (egui)                         orchestrator tasks
//! ─────────                         ──────────────────
//! TriageCommand ──mpsc──▶ TriageOrchestrator ──▶ Gateway ─▶ parse ─▶ Speaker
//! ScribeCommand ──mpsc──▶ ScribeOrchestrator ──▶ Gateway ─▶ parse
//! RxCommand     ──mpsc──▶ RxOrchestrator     ──▶ Gateway ─▶ parse ─▶ Speaker
//!        ▲                        │
//!        └── Shared<…View> ◀──────┘   (locked briefly, never across awaits)
//! ```
//!
//! Stages within one pipeline run are strictly sequential, and every view
//! write lands immediately before or after an await point, so the UI always
//! shows a state consistent with the last settled stage.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::gateway::{GatewayError, ParseError};
use crate::speech::SpeechError;

pub mod prompts;
pub mod rxvox;
pub mod scribe;
pub mod session;
pub mod triage;

// ---------------------------------------------------------------------------
// Shared view state
// ---------------------------------------------------------------------------

/// Thread-safe handle to one module's view state.
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a view in a [`Shared`] handle.
pub fn new_shared<T>(view: T) -> Shared<T> {
    Arc::new(Mutex::new(view))
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Failure of one pipeline stage.
///
/// Stages let the underlying errors propagate unmodified; there is no retry
/// and no local recovery.  The orchestrator turns whichever error reached the
/// top into a single human-readable message for the view.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The completion call itself failed.
    #[error("completion request failed: {0}")]
    Gateway(#[from] GatewayError),
    /// The completion text did not decode to the expected record.
    #[error("unexpected response format: {0}")]
    Parse(#[from] ParseError),
    /// Speech synthesis or playback failed.
    #[error("speech output failed: {0}")]
    Speech(#[from] SpeechError),
}

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use rxvox::{
    InstructionPhase, InstructionRow, Medication, PrescriptionRecord, RxCommand, RxOrchestrator,
    RxPhase, RxView,
};
pub use scribe::{
    needs_translation, renderable, ConsultationReport, MedicalSummary, ScribeCommand,
    ScribeOrchestrator, ScribePhase, ScribeView, Transcript,
};
pub use session::ModuleSession;
pub use triage::{
    PlaybackPhase, SeverityBand, TraumaAssessment, TriageCommand, TriageOrchestrator, TriagePhase,
    TriageReport, TriageView, EMERGENCY_SCORE_THRESHOLD,
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
