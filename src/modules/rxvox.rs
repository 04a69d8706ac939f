//! Rx-Vox — prescription OCR with spoken medication instructions.
//!
//! [`RxOrchestrator`] owns this module's [`ModuleSession`] and responds to
//! [`RxCommand`]s, mirroring state into a shared [`RxView`].
//!
//! Reading is a single stage: prescription photo in, [`PrescriptionRecord`]
//! out.  Audio is a separate, per-medication micro-pipeline triggered later
//! from each row:
//!
//! ```text
//! RxCommand::SpeakInstruction { row, language }
//!   └─▶ gateway.complete(colloquial translation)   [row: Translating]
//!         └─▶ show translated text in the row
//!               └─▶ speaker.speak(translated)      [row: Playing → Played]
//! ```
//!
//! Each row's control cycles idle → translating → playing independently of
//! the other rows; a failure restores that row only.

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
// PrescriptionRecord
// ---------------------------------------------------------------------------

/// One medication line read off the prescription.
///
/// `colloquial_instruction` is required — it is what gets translated and
/// spoken for the patient.  Only `instructions` may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    /// Special instructions ("after food", ...), shown only when present.
    pub instructions: Option<String>,
    /// Plain-language guidance for the patient; feeds audio synthesis.
    pub colloquial_instruction: String,
}

/// Structured result of prescription OCR.
///
/// A missing `medications` key fails the parse — the whole module revolves
/// around iterating it.  An empty list is tolerated and renders nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub patient_name: Option<String>,
    pub medications: Vec<Medication>,
    pub general_advice: Option<String>,
    pub follow_up: Option<String>,
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Phase of the prescription-reading stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxPhase {
    #[default]
    Idle,
    Reading,
    Ready,
    Failed,
}

impl RxPhase {
    /// `true` while the prescription is with the completion service.
    pub fn is_busy(&self) -> bool {
        matches!(self, RxPhase::Reading)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RxPhase::Idle => "Idle",
            RxPhase::Reading => "Reading prescription...",
            RxPhase::Ready => "Done",
            RxPhase::Failed => "Error",
        }
    }
}

/// State of one medication row's translate-and-play control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstructionPhase {
    #[default]
    Idle,
    /// The colloquial instruction is being translated.
    Translating,
    /// Audio is playing; resolves when playback ends.
    Playing,
    /// Playback finished; the UI shows a confirmation before re-arming.
    Played,
}

impl InstructionPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, InstructionPhase::Translating | InstructionPhase::Playing)
    }
}

/// Per-medication presentation state, indexed in step with
/// `PrescriptionRecord::medications`.
#[derive(Debug, Clone, Default)]
pub struct InstructionRow {
    pub phase: InstructionPhase,
    /// Translated instruction, shown in the row once stage 1 finishes.
    pub translated: Option<String>,
    /// Failure text shown in the row's translation slot.
    pub error: Option<String>,
    /// Whether this row has completed playback at least once (the control
    /// re-labels to "play again").
    pub played_once: bool,
}

/// Everything the UI renders for the Rx-Vox module.
#[derive(Debug, Clone, Default)]
pub struct RxView {
    pub phase: RxPhase,
    /// Summary line for the selected prescription photo.
    pub selection: Option<String>,
    pub record: Option<PrescriptionRecord>,
    /// One row per medication; rebuilt on every successful read.
    pub rows: Vec<InstructionRow>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// RxCommand
// ---------------------------------------------------------------------------

/// Commands the UI sends to the Rx-Vox orchestrator.
#[derive(Debug)]
pub enum RxCommand {
    /// A prescription photo was picked or dropped onto the module panel.
    Select {
        path: PathBuf,
        declared_type: Option<String>,
    },
    /// Drop the selection and the last record.
    Clear,
    /// Read the selected prescription into a structured record.
    Read,
    /// Translate one medication's colloquial instruction and speak it.
    SpeakInstruction { row: usize, language: Language },
}

// ---------------------------------------------------------------------------
// RxOrchestrator
// ---------------------------------------------------------------------------

/// Drives prescription reading and per-medication audio.
pub struct RxOrchestrator {
    view: Shared<RxView>,
    session: ModuleSession<PrescriptionRecord>,
    gateway: Arc<dyn Gateway>,
    speaker: Arc<dyn SpeechSynthesizer>,
}

impl RxOrchestrator {
    pub fn new(
        view: Shared<RxView>,
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
    pub async fn run(mut self, mut commands: mpsc::Receiver<RxCommand>) {
        while let Some(command) = commands.recv().await {
            match command {
                RxCommand::Select {
                    path,
                    declared_type,
                } => self.handle_select(path, declared_type.as_deref()).await,
                RxCommand::Clear => self.handle_clear(),
                RxCommand::Read => self.handle_read().await,
                RxCommand::SpeakInstruction { row, language } => {
                    self.handle_speak(row, language).await
                }
            }
        }

        log::info!("rx: command channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_select(&mut self, path: PathBuf, declared_type: Option<&str>) {
        match Attachment::load(&path, declared_type).await {
            Ok(attachment) => {
                log::info!("rx: selected {}", attachment.summary());
                {
                    let mut view = self.view.lock().unwrap();
                    view.selection = Some(attachment.summary());
                    view.error = None;
                }
                self.session.select(attachment);
            }
            Err(e) => {
                log::error!("rx: selection failed: {e}");
                self.view.lock().unwrap().error = Some(e.to_string());
            }
        }
    }

    fn handle_clear(&mut self) {
        self.session.clear();
        *self.view.lock().unwrap() = RxView::default();
        log::debug!("rx: cleared");
    }

    async fn handle_read(&mut self) {
        let Some(attachment) = self.session.attachment() else {
            log::warn!("rx: read requested with no prescription selected");
            return;
        };

        {
            let mut view = self.view.lock().unwrap();
            view.phase = RxPhase::Reading;
            view.error = None;
        }

        match self.run_pipeline(attachment).await {
            Ok(record) => {
                if record.medications.is_empty() {
                    log::warn!("rx: prescription parsed but no medications were found");
                } else {
                    log::info!("rx: read {} medication(s)", record.medications.len());
                }
                self.session.store(record.clone());
                let mut view = self.view.lock().unwrap();
                view.rows = vec![InstructionRow::default(); record.medications.len()];
                view.record = Some(record);
                view.phase = RxPhase::Ready;
            }
            Err(e) => {
                log::error!("rx: reading failed: {e}");
                let mut view = self.view.lock().unwrap();
                view.phase = RxPhase::Failed;
                view.error = Some(e.to_string());
            }
        }
    }

    async fn handle_speak(&mut self, row: usize, language: Language) {
        let Some(text) = self
            .session
            .result()
            .and_then(|record| record.medications.get(row))
            .map(|medication| medication.colloquial_instruction.clone())
        else {
            log::warn!("rx: audio requested for unknown medication row {row}");
            return;
        };

        self.update_row(row, |r| {
            r.phase = InstructionPhase::Translating;
            r.error = None;
        });

        match self.translate_and_speak(row, &text, language).await {
            Ok(()) => self.update_row(row, |r| {
                r.phase = InstructionPhase::Played;
                r.played_once = true;
            }),
            Err(e) => {
                log::error!("rx: instruction audio failed for row {row}: {e}");
                let message = e.to_string();
                self.update_row(row, |r| {
                    r.phase = InstructionPhase::Idle;
                    r.error = Some(message);
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    async fn run_pipeline(
        &self,
        attachment: &Attachment,
    ) -> Result<PrescriptionRecord, PipelineError> {
        let completion = self
            .gateway
            .complete(PromptRequest::new(prompts::PRESCRIPTION_READING).with_attachment(attachment))
            .await?;
        Ok(parse_structured(&completion)?)
    }

    async fn translate_and_speak(
        &self,
        row: usize,
        text: &str,
        language: Language,
    ) -> Result<(), PipelineError> {
        let prompt = prompts::instruction_translation(text, language);
        let translated = self
            .gateway
            .complete(PromptRequest::new(&prompt))
            .await?
            .trim()
            .to_string();

        self.update_row(row, |r| {
            r.translated = Some(translated.clone());
            r.phase = InstructionPhase::Playing;
        });

        self.speaker.speak(&translated, language).await?;
        Ok(())
    }

    fn update_row(&self, row: usize, update: impl FnOnce(&mut InstructionRow)) {
        let mut view = self.view.lock().unwrap();
        if let Some(state) = view.rows.get_mut(row) {
            update(state);
        }
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
    use crate::speech::{MockSpeaker, SpeechError};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const PRESCRIPTION_JSON: &str = r#"{
        "doctor_name": "Dr. Meena Kulkarni",
        "date": null,
        "patient_name": null,
        "medications": [
            {
                "medicine_name": "Amoxicillin",
                "dosage": "500 mg",
                "frequency": "Three times a day",
                "duration": "5 days",
                "instructions": "Complete the full course",
                "colloquial_instruction": "Take one capsule morning, afternoon and night after food"
            },
            {
                "medicine_name": "Paracetamol",
                "dosage": "650 mg",
                "frequency": "When fever rises",
                "duration": "As needed",
                "instructions": null,
                "colloquial_instruction": "Take one tablet only when fever is high"
            }
        ],
        "general_advice": "Drink plenty of water",
        "follow_up": "Return after five days"
    }"#;

    fn fenced(json: &str) -> String {
        format!("```json\n{json}\n```")
    }

    fn temp_prescription(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("prescription.png");
        std::fs::write(&path, b"png-bytes").unwrap();
        path
    }

    async fn drive(
        gateway: Arc<dyn Gateway>,
        speaker: Arc<dyn SpeechSynthesizer>,
        commands: Vec<RxCommand>,
    ) -> Shared<RxView> {
        let view = new_shared(RxView::default());
        let orc = RxOrchestrator::new(Arc::clone(&view), gateway, speaker);

        let (tx, rx) = mpsc::channel(8);
        for command in commands {
            tx.send(command).await.unwrap();
        }
        drop(tx);

        orc.run(rx).await;
        view
    }

    fn select_and_read(dir: &tempfile::TempDir) -> Vec<RxCommand> {
        vec![
            RxCommand::Select {
                path: temp_prescription(dir),
                declared_type: None,
            },
            RxCommand::Read,
        ]
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// One stage: photo in, record out, one idle row per medication.
    #[tokio::test]
    async fn read_parses_record_and_builds_rows() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::ok(fenced(PRESCRIPTION_JSON)));
        let speaker = Arc::new(MockSpeaker::ok());

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            speaker,
            select_and_read(&dir),
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, RxPhase::Ready);

        let record = view.record.as_ref().unwrap();
        assert_eq!(record.doctor_name.as_deref(), Some("Dr. Meena Kulkarni"));
        assert!(record.patient_name.is_none());
        assert_eq!(record.medications.len(), 2);
        assert_eq!(record.medications[0].medicine_name, "Amoxicillin");
        assert!(record.medications[1].instructions.is_none());

        assert_eq!(view.rows.len(), 2);
        assert!(view
            .rows
            .iter()
            .all(|row| row.phase == InstructionPhase::Idle));

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("colloquial_instruction"));
        assert_eq!(calls[0].media_type.as_deref(), Some("image/png"));
    }

    /// The medications key is load-bearing; a record without it fails.
    #[tokio::test]
    async fn missing_medications_key_fails_the_parse() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::ok(r#"{"doctor_name": "Dr. Rao"}"#));
        let speaker = Arc::new(MockSpeaker::ok());

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            speaker,
            select_and_read(&dir),
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, RxPhase::Failed);
        assert!(view.error.is_some());
        assert!(view.record.is_none());
    }

    /// An empty medication list is not an error; it just renders nothing.
    #[tokio::test]
    async fn empty_medication_list_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::ok(r#"{"medications": []}"#));
        let speaker = Arc::new(MockSpeaker::ok());

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            speaker,
            select_and_read(&dir),
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, RxPhase::Ready);
        assert!(view.rows.is_empty());
        assert!(view.record.as_ref().unwrap().medications.is_empty());
    }

    #[tokio::test]
    async fn read_without_selection_is_ignored() {
        let gateway = Arc::new(MockGateway::new());
        let speaker = Arc::new(MockSpeaker::ok());

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            speaker,
            vec![RxCommand::Read],
        )
        .await;

        assert_eq!(gateway.call_count(), 0);
        assert_eq!(view.lock().unwrap().phase, RxPhase::Idle);
    }

    // -----------------------------------------------------------------------
    // Per-medication audio
    // -----------------------------------------------------------------------

    /// The row's colloquial instruction is translated, displayed, and the
    /// translated text is what gets spoken.
    #[tokio::test]
    async fn speak_translates_then_plays_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(PRESCRIPTION_JSON);
        gateway.push_ok("सुबह, दोपहर और रात को खाने के बाद एक कैप्सूल लें\n");
        let speaker = Arc::new(MockSpeaker::ok());

        let mut commands = select_and_read(&dir);
        commands.push(RxCommand::SpeakInstruction {
            row: 0,
            language: Language::Hindi,
        });

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            Arc::clone(&speaker) as Arc<dyn SpeechSynthesizer>,
            commands,
        )
        .await;

        let view = view.lock().unwrap();
        let row = &view.rows[0];
        assert_eq!(row.phase, InstructionPhase::Played);
        assert!(row.played_once);
        assert_eq!(
            row.translated.as_deref(),
            Some("सुबह, दोपहर और रात को खाने के बाद एक कैप्सूल लें")
        );

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1]
            .prompt
            .contains("Take one capsule morning, afternoon and night after food"));
        assert!(calls[1].prompt.contains("to Hindi"));

        assert_eq!(
            speaker.spoken(),
            vec![(
                "सुबह, दोपहर और रात को खाने के बाद एक कैप्सूल लें".to_string(),
                Language::Hindi
            )]
        );
    }

    /// A translation failure leaves the speaker untouched and re-arms the row.
    #[tokio::test]
    async fn translation_failure_skips_playback() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(PRESCRIPTION_JSON);
        gateway.push_err(GatewayError::Upstream {
            status: 503,
            message: "temporarily overloaded".into(),
        });
        let speaker = Arc::new(MockSpeaker::ok());

        let mut commands = select_and_read(&dir);
        commands.push(RxCommand::SpeakInstruction {
            row: 1,
            language: Language::Marathi,
        });

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            Arc::clone(&speaker) as Arc<dyn SpeechSynthesizer>,
            commands,
        )
        .await;

        assert_eq!(speaker.speak_count(), 0);

        let view = view.lock().unwrap();
        let row = &view.rows[1];
        assert_eq!(row.phase, InstructionPhase::Idle);
        assert!(!row.played_once);
        assert!(row.error.as_ref().unwrap().contains("temporarily overloaded"));
        // Other rows are untouched.
        assert!(view.rows[0].error.is_none());
    }

    /// A playback failure keeps the translated text but re-arms the control.
    #[tokio::test]
    async fn playback_failure_restores_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::new());
        gateway.push_ok(PRESCRIPTION_JSON);
        gateway.push_ok("औषध म्हणजे काय");
        let speaker = Arc::new(MockSpeaker::err(SpeechError::NoAudio));

        let mut commands = select_and_read(&dir);
        commands.push(RxCommand::SpeakInstruction {
            row: 0,
            language: Language::Marathi,
        });

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            Arc::clone(&speaker) as Arc<dyn SpeechSynthesizer>,
            commands,
        )
        .await;

        let view = view.lock().unwrap();
        let row = &view.rows[0];
        assert_eq!(row.phase, InstructionPhase::Idle);
        assert!(row.error.is_some());
        assert_eq!(row.translated.as_deref(), Some("औषध म्हणजे काय"));
        assert_eq!(speaker.speak_count(), 1);
    }

    #[tokio::test]
    async fn speak_for_unknown_row_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::ok(PRESCRIPTION_JSON));
        let speaker = Arc::new(MockSpeaker::ok());

        let mut commands = select_and_read(&dir);
        commands.push(RxCommand::SpeakInstruction {
            row: 7,
            language: Language::Hindi,
        });

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            Arc::clone(&speaker) as Arc<dyn SpeechSynthesizer>,
            commands,
        )
        .await;

        assert_eq!(gateway.call_count(), 1);
        assert_eq!(speaker.speak_count(), 0);
        assert_eq!(view.lock().unwrap().phase, RxPhase::Ready);
    }

    #[tokio::test]
    async fn clear_drops_record_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::ok(PRESCRIPTION_JSON));
        let speaker = Arc::new(MockSpeaker::ok());

        let mut commands = select_and_read(&dir);
        commands.push(RxCommand::Clear);

        let view = drive(
            Arc::clone(&gateway) as Arc<dyn Gateway>,
            speaker,
            commands,
        )
        .await;

        let view = view.lock().unwrap();
        assert_eq!(view.phase, RxPhase::Idle);
        assert!(view.selection.is_none());
        assert!(view.record.is_none());
        assert!(view.rows.is_empty());
    }
}
