//! Trauma triage — injury-photo analysis with severity scoring.
//!
//! [`TriageOrchestrator`] owns this module's [`ModuleSession`] and responds to
//! [`TriageCommand`]s received over a `tokio::sync::mpsc` channel, mirroring
//! everything the UI needs into a shared [`TriageView`].
//!
//! # Pipeline flow
//!
//! ```text
//! TriageCommand::Analyze { language }
//!   └─▶ gateway.complete(analysis prompt + photo)     [Analyzing]
//!         └─▶ parse TraumaAssessment
//!               ├─ language == English → Ready
//!               └─ otherwise → gateway.complete(translation prompt)
//!                                                     [Translating]
//!                     └─▶ store prose translation → Ready
//!
//! TriageCommand::PlayTranslation
//!   └─▶ speaker.speak(translation)                    [Speaking → Played]
//! ```
//!
//! Any stage failure aborts the rest of the run and surfaces one message in
//! the view; the trigger control re-arms.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::gateway::{parse_structured, Attachment, Gateway, PromptRequest};
use crate::lang::Language;
use crate::speech::SpeechSynthesizer;

use super::session::ModuleSession;
use super::{prompts, PipelineError, Shared};

// ---------------------------------------------------------------------------
// TraumaAssessment
// ---------------------------------------------------------------------------

/// Severity score at or above which the emergency affordance is always shown,
/// regardless of the model's `call_emergency` flag.
pub const EMERGENCY_SCORE_THRESHOLD: u8 = 8;

/// Structured injury assessment decoded from the analysis completion.
///
/// `warning_signs` tolerates an absent key; every other field is required and
/// a missing one fails the whole parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraumaAssessment {
    /// 1 (minor) to 10 (life-threatening).
    pub severity_score: u8,
    /// The model's own LOW / MEDIUM / HIGH classification.
    pub severity_level: String,
    pub injury_type: String,
    /// Ordered first-aid steps.
    pub immediate_actions: Vec<String>,
    /// The model's explicit recommendation to call emergency services.
    pub call_emergency: bool,
    #[serde(default)]
    pub warning_signs: Vec<String>,
    /// Two-to-three sentence clinical assessment.
    pub assessment: String,
}

impl TraumaAssessment {
    /// Whether the emergency affordance must be shown.
    ///
    /// Two independent triggers: a severity score of
    /// [`EMERGENCY_SCORE_THRESHOLD`] or above, or the model's explicit
    /// `call_emergency` flag.  The analysis prompt asks the model to set the
    /// flag from severity 7 up, but this gate never relies on the model
    /// having done so.
    pub fn requires_emergency(&self) -> bool {
        self.severity_score >= EMERGENCY_SCORE_THRESHOLD || self.call_emergency
    }

    /// Display band derived from the score alone (1–3 low, 4–6 medium,
    /// 7–10 high), matching the scale the analysis prompt spells out.
    pub fn severity_band(&self) -> SeverityBand {
        match self.severity_score {
            0..=3 => SeverityBand::Low,
            4..=6 => SeverityBand::Medium,
            _ => SeverityBand::High,
        }
    }
}

/// Coarse severity band used to colour the result panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityBand {
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// TriageReport
// ---------------------------------------------------------------------------

/// Result of one completed triage run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageReport {
    pub assessment: TraumaAssessment,
    /// Display language the run was started with.
    pub language: Language,
    /// Prose rendering of the assessment in `language`; `None` when the run
    /// was in English.  Feeds both the translated panel and audio playback.
    pub translation: Option<String>,
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Phase of the triage pipeline, rendered as the module's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriagePhase {
    #[default]
    Idle,
    /// Stage 1 — the photo is with the completion service.
    Analyzing,
    /// Stage 2 — translating the assessment into the selected language.
    Translating,
    /// A report is ready to render.
    Ready,
    /// The last run failed; the trigger control is re-armed.
    Failed,
}

impl TriagePhase {
    /// `true` while an analysis run is in flight.
    ///
    /// The UI uses this as the re-entrancy guard: the trigger control is
    /// disabled while busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, TriagePhase::Analyzing | TriagePhase::Translating)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriagePhase::Idle => "Idle",
            TriagePhase::Analyzing => "Analyzing injury image...",
            TriagePhase::Translating => "Translating assessment to selected language...",
            TriagePhase::Ready => "Done",
            TriagePhase::Failed => "Error",
        }
    }
}

/// State of the "play translated assessment" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// Synthesis requested; resolves only once the audio finished playing.
    Speaking,
    /// Playback finished; the UI shows a confirmation before re-arming.
    Played,
}

/// Everything the UI renders for the triage module.
///
/// Written by the orchestrator, read (and for presentation timers, reset) by
/// the egui loop each frame.
#[derive(Debug, Clone, Default)]
pub struct TriageView {
    pub phase: TriagePhase,
    /// Summary line for the selected photo ("wound.jpg (120.4 KB)").
    pub selection: Option<String>,
    pub report: Option<TriageReport>,
    pub playback: PlaybackPhase,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// TriageCommand
// ---------------------------------------------------------------------------

/// Commands the UI sends to the triage orchestrator.
#[derive(Debug)]
pub enum TriageCommand {
    /// A photo was picked or dropped onto the module panel.
    Select {
        path: PathBuf,
        /// Media type reported by the picker, used only when the extension
        /// is not recognised.
        declared_type: Option<String>,
    },
    /// Drop the selection and the last report.
    Clear,
    /// Run the analysis pipeline against the selected photo.
    Analyze { language: Language },
    /// Speak the stored translated assessment out loud.
    PlayTranslation,
}

// ---------------------------------------------------------------------------
// TriageOrchestrator
// ---------------------------------------------------------------------------

/// Drives the trauma-triage pipeline.
///
/// Create with [`TriageOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task.  Stages within one run are strictly sequential; the
/// view is updated immediately before and after every await so the UI always
/// reflects the last settled stage.
pub struct TriageOrchestrator {
    view: Shared<TriageView>,
    session: ModuleSession<TriageReport>,
    gateway: Arc<dyn Gateway>,
    speaker: Arc<dyn SpeechSynthesizer>,
}

impl TriageOrchestrator {
    pub fn new(
        view: Shared<TriageView>,
        gateway: Arc<dyn Gateway>,
        speaker: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            view,
            session: ModuleSession::new(),
            gateway,
            speaker,
        }
    }

    /// Run the orchestrator until the command channel is closed.
    pub async fn run(mut self, mut commands: mpsc::Receiver<TriageCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                TriageCommand::Select {
                    path,
                    declared_type,
                } => self.handle_select(path, declared_type.as_deref()).await,
                TriageCommand::Clear => self.handle_clear(),
                TriageCommand::Analyze { language } => self.handle_analyze(language).await,
                TriageCommand::PlayTranslation => self.handle_play().await,
            }
        }

        log::info!("triage: command channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_select(&mut self, path: PathBuf, declared_type: Option<&str>) {
        match Attachment::load(&path, declared_type).await {
            Ok(attachment) => {
                log::info!("triage: selected {}", attachment.summary());
                {
                    let mut view = self.view.lock().unwrap();
                    view.selection = Some(attachment.summary());
                    view.error = None;
                }
                self.session.select(attachment);
            }
            Err(e) => {
                // Keep any previous selection; just surface the problem.
                log::error!("triage: selection failed: {e}");
                self.view.lock().unwrap().error = Some(e.to_string());
            }
        }
    }

    fn handle_clear(&mut self) {
        self.session.clear();
        *self.view.lock().unwrap() = TriageView::default();
        log::debug!("triage: cleared");
    }

    async fn handle_analyze(&mut self, language: Language) {
        let Some(attachment) = self.session.attachment() else {
            log::warn!("triage: analyze requested with no photo selected");
            return;
        };

        {
            let mut view = self.view.lock().unwrap();
            view.phase = TriagePhase::Analyzing;
            view.playback = PlaybackPhase::Idle;
            view.error = None;
        }

        match self.run_pipeline(attachment, language).await {
            Ok(report) => {
                log::info!(
                    "triage: severity {}/10 ({}), emergency affordance {}",
                    report.assessment.severity_score,
                    report.assessment.severity_level,
                    report.assessment.requires_emergency(),
                );
                self.session.store(report.clone());
                let mut view = self.view.lock().unwrap();
                view.report = Some(report);
                view.phase = TriagePhase::Ready;
            }
            Err(e) => {
                log::error!("triage: analysis failed: {e}");
                let mut view = self.view.lock().unwrap();
                view.phase = TriagePhase::Failed;
                view.error = Some(e.to_string());
            }
        }
    }

    async fn handle_play(&mut self) {
        let Some((text, language)) = self
            .session
            .result()
            .and_then(|report| {
                report
                    .translation
                    .as_ref()
                    .map(|text| (text.clone(), report.language))
            })
        else {
            log::warn!("triage: audio requested but no translated assessment is stored");
            return;
        };

        self.set_playback(PlaybackPhase::Speaking);

        match self.speaker.speak(&text, language).await {
            Ok(()) => self.set_playback(PlaybackPhase::Played),
            Err(e) => {
                log::error!("triage: audio playback failed: {e}");
                let mut view = self.view.lock().unwrap();
                view.playback = PlaybackPhase::Idle;
                view.error = Some(PipelineError::from(e).to_string());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    async fn run_pipeline(
        &self,
        attachment: &Attachment,
        language: Language,
    ) -> Result<TriageReport, PipelineError> {
        // ── Stage 1: analyse the photo ──────────────────────────────────
        let completion = self
            .gateway
            .complete(PromptRequest::new(prompts::TRAUMA_ANALYSIS).with_attachment(attachment))
            .await?;
        let assessment: TraumaAssessment = parse_structured(&completion)?;

        // ── Stage 2: translate, unless English is selected ──────────────
        let translation = if language == Language::English {
            None
        } else {
            self.set_phase(TriagePhase::Translating);
            let prompt = prompts::assessment_translation(&assessment, language);
            let text = self.gateway.complete(PromptRequest::new(&prompt)).await?;
            Some(text.trim().to_string())
        };

        Ok(TriageReport {
            assessment,
            language,
            translation,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_phase(&self, phase: TriagePhase) {
        self.view.lock().unwrap().phase = phase;
    }

    fn set_playback(&self, playback: PlaybackPhase) {
        self.view.lock().unwrap().playback = playback;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
