//! Polyglot scribe — consultation audio to a structured clinical summary.
//!
//! [`ScribeOrchestrator`] owns this module's [`ModuleSession`] and responds
//! to [`ScribeCommand`]s, mirroring progress into a shared [`ScribeView`].
//!
//! # Pipeline flow
//!
//! ```text
//! ScribeCommand::Transcribe { language }
//!   └─▶ gateway.complete(transcription prompt + audio)   [Step 1/3]
//!         └─▶ parse Transcript, normalise defaults
//!               └─▶ gateway.complete(summary prompt)     [Step 2/3]
//!                     └─▶ parse MedicalSummary
//!                           ├─ selection is English, or matches the
//!                           │  detected code → Ready
//!                           └─ otherwise → gateway.complete(translation)
//!                                                        [Step 3/3]
//!                                 └─▶ parse translated summary → Ready
//! ```
//!
//! The terminal render prefers the translated summary when one was produced.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::gateway::{parse_structured, Attachment, Gateway, PromptRequest};
use crate::lang::Language;

use super::session::ModuleSession;
use super::{prompts, PipelineError, Shared};

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Stage-1 result: the transcription plus detected language.
///
/// Every field tolerates an absent key; [`normalized`](Self::normalized)
/// fills the gaps the same way the UI expects them ("Unknown" language,
/// English locale code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub transcript: String,
    /// Detected language name ("Hindi", "Bhojpuri", ...), free text.
    #[serde(default)]
    pub language: String,
    /// Detected locale tag ("hi-IN", ...), free text — compared against the
    /// user's selection to decide whether translation is needed.
    #[serde(default)]
    pub language_code: String,
}

impl Transcript {
    /// Fill empty fields with their display defaults.
    pub fn normalized(mut self) -> Self {
        if self.language.is_empty() {
            self.language = "Unknown".into();
        }
        if self.language_code.is_empty() {
            self.language_code = Language::English.tag().into();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// MedicalSummary
// ---------------------------------------------------------------------------

/// Structured clinical summary of one consultation.
///
/// Written for doctor-to-doctor handoff.  The three optional sections render
/// only when present; all other fields are required and a missing one fails
/// the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalSummary {
    pub chief_complaint: String,
    pub duration: String,
    pub symptoms: String,
    pub medical_history: Option<String>,
    pub physical_exam: Option<String>,
    pub assessment: String,
    pub treatment_plan: String,
    pub follow_up: String,
    pub red_flags: Option<String>,
}

/// Some(text) when an optional summary section should render — present and
/// non-blank.
pub fn renderable(section: &Option<String>) -> Option<&str> {
    section.as_deref().filter(|text| !text.trim().is_empty())
}

// ---------------------------------------------------------------------------
// ConsultationReport
// ---------------------------------------------------------------------------

/// Decide whether the translation stage runs: only for a non-English
/// selection that differs from the detected source code.
pub fn needs_translation(selected: Language, detected_code: &str) -> bool {
    selected != Language::English && selected.tag() != detected_code
}

/// Result of one completed scribe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultationReport {
    pub transcript: Transcript,
    /// Display language the run was started with.
    pub selected: Language,
    pub summary: MedicalSummary,
    /// Present only when the translation stage ran.
    pub translated: Option<MedicalSummary>,
}

impl ConsultationReport {
    /// The summary to render: translated when available, original otherwise.
    pub fn display_summary(&self) -> &MedicalSummary {
        self.translated.as_ref().unwrap_or(&self.summary)
    }

    /// Language line shown above the summary.
    pub fn language_badge(&self) -> String {
        if self.translated.is_some() {
            format!(
                "Detected: {} → Translated to: {}",
                self.transcript.language,
                self.selected.display_name()
            )
        } else {
            format!("Detected Language: {}", self.transcript.language)
        }
    }
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Phase of the scribe pipeline, rendered as the module's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScribePhase {
    #[default]
    Idle,
    Transcribing,
    Summarizing,
    Translating,
    Ready,
    Failed,
}

impl ScribePhase {
    /// `true` while a run is in flight; the trigger control is disabled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ScribePhase::Transcribing | ScribePhase::Summarizing | ScribePhase::Translating
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScribePhase::Idle => "Idle",
            ScribePhase::Transcribing => "Step 1/3: Transcribing audio...",
            ScribePhase::Summarizing => "Step 2/3: Generating comprehensive medical summary...",
            ScribePhase::Translating => "Step 3/3: Translating medical summary...",
            ScribePhase::Ready => "Done",
            ScribePhase::Failed => "Error",
        }
    }
}

/// Everything the UI renders for the scribe module.
#[derive(Debug, Clone, Default)]
pub struct ScribeView {
    pub phase: ScribePhase,
    /// Summary line for the selected recording.
    pub selection: Option<String>,
    pub report: Option<ConsultationReport>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// ScribeCommand
// ---------------------------------------------------------------------------

/// Commands the UI sends to the scribe orchestrator.
#[derive(Debug)]
pub enum ScribeCommand {
    /// A recording was picked or dropped onto the module panel.
    Select {
        path: PathBuf,
        declared_type: Option<String>,
    },
    /// Drop the selection and the last report.
    Clear,
    /// Run transcription → summary → (conditional) translation.
    Transcribe { language: Language },
}

// ---------------------------------------------------------------------------
// ScribeOrchestrator
// ---------------------------------------------------------------------------

/// Drives the consultation-scribe pipeline.
///
/// The three stages are strictly sequential; stage 3 is skipped entirely when
/// [`needs_translation`] says the selection already matches the detected
/// source language.
pub struct ScribeOrchestrator {
    view: Shared<ScribeView>,
    session: ModuleSession<ConsultationReport>,
    gateway: Arc<dyn Gateway>,
}

impl ScribeOrchestrator {
    pub fn new(view: Shared<ScribeView>, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            view,
            session: ModuleSession::new(),
            gateway,
        }
    }

    /// Run the orchestrator until the command channel is closed.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ScribeCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                ScribeCommand::Select {
                    path,
                    declared_type,
                } => self.handle_select(path, declared_type.as_deref()).await,
                ScribeCommand::Clear => self.handle_clear(),
                ScribeCommand::Transcribe { language } => self.handle_transcribe(language).await,
            }
        }

        log::info!("scribe: command channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_select(&mut self, path: PathBuf, declared_type: Option<&str>) {
        match Attachment::load(&path, declared_type).await {
            Ok(attachment) => {
                log::info!("scribe: selected {}", attachment.summary());
                {
                    let mut view = self.view.lock().unwrap();
                    view.selection = Some(attachment.summary());
                    view.error = None;
                }
                self.session.select(attachment);
            }
            Err(e) => {
                log::error!("scribe: selection failed: {e}");
                self.view.lock().unwrap().error = Some(e.to_string());
            }
        }
    }

    fn handle_clear(&mut self) {
        self.session.clear();
        *self.view.lock().unwrap() = ScribeView::default();
        log::debug!("scribe: cleared");
    }

    async fn handle_transcribe(&mut self, language: Language) {
        let Some(attachment) = self.session.attachment() else {
            log::warn!("scribe: transcribe requested with no recording selected");
            return;
        };

        {
            let mut view = self.view.lock().unwrap();
            view.phase = ScribePhase::Transcribing;
            view.error = None;
        }

        match self.run_pipeline(attachment, language).await {
            Ok(report) => {
                log::info!(
                    "scribe: consultation in {} summarised{}",
                    report.transcript.language,
                    if report.translated.is_some() {
                        ", translated"
                    } else {
                        ""
                    },
                );
                self.session.store(report.clone());
                let mut view = self.view.lock().unwrap();
                view.report = Some(report);
                view.phase = ScribePhase::Ready;
            }
            Err(e) => {
                log::error!("scribe: pipeline failed: {e}");
                let mut view = self.view.lock().unwrap();
                view.phase = ScribePhase::Failed;
                view.error = Some(e.to_string());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    async fn run_pipeline(
        &self,
        attachment: &Attachment,
        selected: Language,
    ) -> Result<ConsultationReport, PipelineError> {
        // ── Stage 1/3: transcribe and detect the language ────────────────
        let completion = self
            .gateway
            .complete(PromptRequest::new(prompts::TRANSCRIPTION).with_attachment(attachment))
            .await?;
        let transcript = parse_structured::<Transcript>(&completion)?.normalized();
        log::debug!(
            "scribe: detected {} ({})",
            transcript.language,
            transcript.language_code
        );

        // ── Stage 2/3: clinical summary in the source language's terms ──
        self.set_phase(ScribePhase::Summarizing);
        let prompt = prompts::medical_summary(&transcript.transcript, &transcript.language);
        let completion = self.gateway.complete(PromptRequest::new(&prompt)).await?;
        let summary: MedicalSummary = parse_structured(&completion)?;

        // ── Stage 3/3: translate when the selection differs ──────────────
        let translated = if needs_translation(selected, &transcript.language_code) {
            self.set_phase(ScribePhase::Translating);
            let prompt = prompts::summary_translation(&summary, selected);
            let completion = self.gateway.complete(PromptRequest::new(&prompt)).await?;
            Some(parse_structured::<MedicalSummary>(&completion)?)
        } else {
            None
        };

        Ok(ConsultationReport {
            transcript,
            selected,
            summary,
            translated,
        })
    }

    fn set_phase(&self, phase: ScribePhase) {
        self.view.lock().unwrap().phase = phase;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MockGateway};
    use crate::modules::new_shared;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const HINDI_TRANSCRIPT_JSON: &str = r#"{
        "transcript": "मुझे तीन दिन से बुखार और खांसी है",
        "language": "Hindi",
        "language_code": "hi-IN"
    }"#;

    const SUMMARY_JSON: &str = r#"{
        "chief_complaint": "Fever and cough",
        "duration": "Three days",
        "symptoms": "High-grade fever with dry cough",
        "medical_history": null,
        "physical_exam": null,
        "assessment": "Likely viral infection",
        "treatment_plan": "Paracetamol and fluids",
        "follow_up": "Review after three days",
        "red_flags": "Breathlessness or chest pain"
    }"#;

    const TRANSLATED_SUMMARY_JSON: &str = r#"{
        "chief_complaint": "बुखार और खांसी",
        "duration": "तीन दिन",
        "symptoms": "तेज बुखार और सूखी खांसी",
        "medical_history": null,
        "physical_exam": null,
        "assessment": "संभावित वायरल संक्रमण",
        "treatment_plan": "पैरासिटामोल और तरल पदार्थ",
        "follow_up": "तीन दिन बाद दिखाएं",
        "red_flags": "सांस फूलना या सीने में दर्द"
    }"#;

    fn fenced(json: &str) -> String {
        format!("```json\n{json}\n```")
    }

    fn temp_recording(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("consult.mp3");
        std::fs::write(&path, b"audio-bytes").unwrap();
        path
    }

    async fn drive(gateway: Arc<dyn Gateway>, commands: Vec<ScribeCommand>) -> Shared<ScribeView> {
        let view = new_shared(ScribeView::default());
        let orc = ScribeOrchestrator::new(Arc::clone(&view), gateway);

        let (tx, rx) = mpsc::channel(8);
        for command in commands {
            tx.send(command).await.unwrap();
        }
        drop(tx);

        orc.run(rx).await;
        view
    }

    // -----------------------------------------------------------------------
    // needs_translation
    // -----------------------------------------------------------------------

    #[test]
    fn english_selection_never_needs_translation() {
        assert!(!needs_translation(Language::English, "hi-IN"));
        assert!(!needs_translation(Language::English, "en-IN"));
    }

    #[test]
    fn matching_detected_code_skips_translation() {
        assert!(!needs_translation(Language::Hindi, "hi-IN"));
        assert!(!needs_translation(Language::Tamil, "ta-IN"));
    }

    #[test]
    fn differing_selection_needs_translation() {
        assert!(needs_translation(Language::Hindi, "en-IN"));
        assert!(needs_translation(Language::Tamil, "hi-IN"));
    }

    // -----------------------------------------------------------------------
    // Transcript normalisation
    // -----------------------------------------------------------------------

    #[test]
    fn empty_transcript_fields_get_display_defaults() {
        let transcript: Transcript = serde_json::from_str("{}").unwrap();
        let transcript = transcript.normalized();
        assert_eq!(transcript.transcript, "");
        assert_eq!(transcript.language, "Unknown");
        assert_eq!(transcript.language_code, "en-IN");
    }

    #[test]
    fn populated_transcript_fields_are_kept() {
        let transcript: Transcript = serde_json::from_str(HINDI_TRANSCRIPT_JSON).unwrap();
        let transcript = transcript.normalized();
        assert_eq!(transcript.language, "Hindi");
        assert_eq!(transcript.language_code, "hi-IN");
    }

    // -----------------------------------------------------------------------
    // Optional sections
    // -----------------------------------------------------------------------

    #[test]
    fn renderable_filters_missing_and_blank_sections() {
        assert_eq!(renderable(&None), None);
        assert_eq!(renderable(&Some(String::new())), None);
        assert_eq!(renderable(&Some("   ".into())), None);
        assert_eq!(renderable(&Some("On metformin".into())), Some("On metformin"));
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Detected hi-IN with selection hi-IN: stage 3 is skipped, the original
    /// summary renders, and the badge shows only the detected language.
    #[tokio::test]
    async fn matching_selection_skips_translation_stage() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(fenced(HINDI_TRANSCRIPT_JSON));
        gateway.push_ok(fenced(SUMMARY_JSON));

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![
                ScribeCommand::Select {
                    path: temp_recording(&dir),
                    declared_type: None,
                },
                ScribeCommand::Transcribe {
                    language: Language::Hindi,
                },
            ],
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, ScribePhase::Ready);

        let report = view.report.as_ref().unwrap();
        assert!(report.translated.is_none());
        assert_eq!(report.display_summary().chief_complaint, "Fever and cough");
        assert_eq!(report.language_badge(), "Detected Language: Hindi");
        assert_eq!(gateway.call_count(), 2);
    }

    /// A selection that differs from the detected code runs all three stages
    /// and renders the translated summary.
    #[tokio::test]
    async fn differing_selection_translates_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(HINDI_TRANSCRIPT_JSON);
        gateway.push_ok(SUMMARY_JSON);
        gateway.push_ok(fenced(TRANSLATED_SUMMARY_JSON));

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![
                ScribeCommand::Select {
                    path: temp_recording(&dir),
                    declared_type: None,
                },
                ScribeCommand::Transcribe {
                    language: Language::Tamil,
                },
            ],
        )
        .await;

        let view = view.lock().unwrap();
        let report = view.report.as_ref().unwrap();
        assert_eq!(report.display_summary().chief_complaint, "बुखार और खांसी");
        assert_eq!(
            report.language_badge(),
            "Detected: Hindi → Translated to: Tamil"
        );

        let calls = gateway.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].media_type.as_deref() == Some("audio/mp3"));
        assert!(calls[1].prompt.contains("The conversation was in Hindi."));
        assert!(calls[1].media_type.is_none());
        assert!(calls[2].prompt.contains("to Tamil"));
    }

    /// English selection skips stage 3 even for a foreign-language source.
    #[tokio::test]
    async fn english_selection_keeps_the_original_summary() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(HINDI_TRANSCRIPT_JSON);
        gateway.push_ok(SUMMARY_JSON);

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![
                ScribeCommand::Select {
                    path: temp_recording(&dir),
                    declared_type: None,
                },
                ScribeCommand::Transcribe {
                    language: Language::English,
                },
            ],
        )
        .await;

        assert_eq!(gateway.call_count(), 2);
        let view = view.lock().unwrap();
        assert!(view.report.as_ref().unwrap().translated.is_none());
    }

    /// A failure in the summary stage aborts before translation.
    #[tokio::test]
    async fn summary_stage_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(HINDI_TRANSCRIPT_JSON);
        gateway.push_err(GatewayError::Upstream {
            status: 500,
            message: "quota exceeded".into(),
        });

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![
                ScribeCommand::Select {
                    path: temp_recording(&dir),
                    declared_type: None,
                },
                ScribeCommand::Transcribe {
                    language: Language::Tamil,
                },
            ],
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, ScribePhase::Failed);
        assert!(view.error.as_ref().unwrap().contains("quota exceeded"));
        assert!(view.report.is_none());
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn transcribe_without_selection_is_ignored() {
        let gateway = Arc::new(MockGateway::new());

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![ScribeCommand::Transcribe {
                language: Language::Hindi,
            }],
        )
        .await;

        assert_eq!(gateway.call_count(), 0);
        assert_eq!(view.lock().unwrap().phase, ScribePhase::Idle);
    }

    #[tokio::test]
    async fn clear_drops_selection_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(HINDI_TRANSCRIPT_JSON);
        gateway.push_ok(SUMMARY_JSON);

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            vec![
                ScribeCommand::Select {
                    path: temp_recording(&dir),
                    declared_type: None,
                },
                ScribeCommand::Transcribe {
                    language: Language::Hindi,
                },
                ScribeCommand::Clear,
            ],
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, ScribePhase::Idle);
        assert!(view.selection.is_none());
        assert!(view.report.is_none());
    }
}
