//! Sahayak desktop shell — egui/eframe application.
//!
//! # Architecture
//!
//! [`SahayakApp`] is the top-level [`eframe::App`].  Per module it owns two
//! endpoints:
//!
//! * an `mpsc::Sender<…Command>` — UI → orchestrator, fire-and-forget
//! * a [`Shared`] view handle — orchestrator → UI, locked briefly at the top
//!   of every frame and cloned, so no lock is held while widgets render
//!
//! A left-hand navigation strip switches between the three module panels;
//! each panel offers drag-and-drop (or a typed path) to attach a file, a
//! language selector, a trigger button that disables itself while its
//! pipeline runs, and a result card.  Dropped files are routed to whichever
//! panel is active.
//!
//! # Panels
//!
//! | Panel | Input | Result card |
//! |-------|-------|-------------|
//! | Injury Assistance | photo | severity-banded assessment, emergency button, spoken translation |
//! | AI Medical Scribe | recording | clinical summary with language badge and transcript |
//! | Prescription Reader | photo | per-medication rows with translate-and-speak controls |

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::lang::{Language, ALL_LANGUAGES};
use crate::modules::{
    renderable, ConsultationReport, InstructionPhase, InstructionRow, PlaybackPhase,
    PrescriptionRecord, RxCommand, RxView, ScribeCommand, ScribeView, SeverityBand, Shared,
    TriageCommand, TriageReport, TriageView,
};

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const GREEN: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ORANGE: egui::Color32 = egui::Color32::from_rgb(240, 160, 60);
const RED: egui::Color32 = egui::Color32::from_rgb(235, 90, 80);
const BLUE: egui::Color32 = egui::Color32::from_rgb(100, 160, 255);
const GRAY: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);

/// How long the triage "audio played" confirmation shows before the play
/// control re-arms.
const TRIAGE_CONFIRM_WINDOW: Duration = Duration::from_secs(3);
/// Same for one prescription row's speak control.
const RX_CONFIRM_WINDOW: Duration = Duration::from_secs(2);

/// Panel accent for a severity band.
fn band_color(band: SeverityBand) -> egui::Color32 {
    match band {
        SeverityBand::Low => GREEN,
        SeverityBand::Medium => ORANGE,
        SeverityBand::High => RED,
    }
}

// ---------------------------------------------------------------------------
// ModulePanel
// ---------------------------------------------------------------------------

/// Which module panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModulePanel {
    Triage,
    Scribe,
    Rx,
}

impl ModulePanel {
    const ALL: [ModulePanel; 3] = [ModulePanel::Triage, ModulePanel::Scribe, ModulePanel::Rx];

    fn title(self) -> &'static str {
        match self {
            ModulePanel::Triage => "Injury Assistance",
            ModulePanel::Scribe => "AI Medical Scribe",
            ModulePanel::Rx => "Prescription Reader",
        }
    }

    fn nav_label(self) -> &'static str {
        match self {
            ModulePanel::Triage => "🚑 Injury Assistance",
            ModulePanel::Scribe => "🎙 AI Medical Scribe",
            ModulePanel::Rx => "💊 Prescription Reader",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            ModulePanel::Triage => "Upload a photo of the injury for first-aid guidance.",
            ModulePanel::Scribe => {
                "Upload a consultation recording for a structured clinical summary."
            }
            ModulePanel::Rx => "Upload a prescription photo and play each instruction aloud.",
        }
    }
}

// ---------------------------------------------------------------------------
// ModuleChannels
// ---------------------------------------------------------------------------

/// Per-module endpoints handed to the shell at startup: one command sender
/// and one shared view handle per orchestrator.
pub struct ModuleChannels {
    pub triage_view: Shared<TriageView>,
    pub triage_tx: mpsc::Sender<TriageCommand>,
    pub scribe_view: Shared<ScribeView>,
    pub scribe_tx: mpsc::Sender<ScribeCommand>,
    pub rx_view: Shared<RxView>,
    pub rx_tx: mpsc::Sender<RxCommand>,
}

// ---------------------------------------------------------------------------
// SahayakApp
// ---------------------------------------------------------------------------

/// eframe application — the three-module clinical assistant window.
pub struct SahayakApp {
    // ── Module views (written by the orchestrators) ─────────────────────
    triage_view: Shared<TriageView>,
    scribe_view: Shared<ScribeView>,
    rx_view: Shared<RxView>,

    // ── Command channels ─────────────────────────────────────────────────
    triage_tx: mpsc::Sender<TriageCommand>,
    scribe_tx: mpsc::Sender<ScribeCommand>,
    rx_tx: mpsc::Sender<RxCommand>,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Active module panel; dropped files are routed here.
    active: ModulePanel,
    /// Per-module output language selection.
    triage_language: Language,
    scribe_language: Language,
    rx_language: Language,
    /// Per-module manual path entry buffers.
    triage_path: String,
    scribe_path: String,
    rx_path: String,
    /// Whether the emergency-number overlay is showing.
    show_emergency: bool,

    // ── Presentation timers ──────────────────────────────────────────────
    /// When triage playback last entered `Played`; the confirmation label
    /// reverts to the play button after 3 s.
    triage_played_at: Option<Instant>,
    /// Same per prescription row, with a 2 s confirmation window.
    rx_played_at: HashMap<usize, Instant>,

    // ── Configuration ────────────────────────────────────────────────────
    /// Application configuration; the window position is updated in place
    /// and the whole struct persisted on exit.
    config: AppConfig,
}

impl SahayakApp {
    /// Create a new [`SahayakApp`] over already-spawned orchestrators.
    pub fn new(channels: ModuleChannels, config: AppConfig) -> Self {
        let default_language = config.ui.default_language;
        Self {
            triage_view: channels.triage_view,
            scribe_view: channels.scribe_view,
            rx_view: channels.rx_view,
            triage_tx: channels.triage_tx,
            scribe_tx: channels.scribe_tx,
            rx_tx: channels.rx_tx,
            active: ModulePanel::Triage,
            triage_language: default_language,
            scribe_language: default_language,
            rx_language: default_language,
            triage_path: String::new(),
            scribe_path: String::new(),
            rx_path: String::new(),
            show_emergency: false,
            triage_played_at: None,
            rx_played_at: HashMap::new(),
            config,
        }
    }

    // ── File drops ───────────────────────────────────────────────────────

    /// Route files dropped anywhere on the window to the active panel.
    fn route_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let Some(path) = file.path else {
                log::warn!("dropped file {} carries no filesystem path; ignoring", file.name);
                continue;
            };
            let declared_type = (!file.mime.is_empty()).then(|| file.mime.clone());
            match self.active {
                ModulePanel::Triage => {
                    let _ = self
                        .triage_tx
                        .try_send(TriageCommand::Select { path, declared_type });
                }
                ModulePanel::Scribe => {
                    let _ = self
                        .scribe_tx
                        .try_send(ScribeCommand::Select { path, declared_type });
                }
                ModulePanel::Rx => {
                    let _ = self
                        .rx_tx
                        .try_send(RxCommand::Select { path, declared_type });
                }
            }
        }
    }

    // ── Presentation timers ──────────────────────────────────────────────

    /// Track when playback controls entered `Played`, so the "audio played"
    /// confirmation can revert to a play button after a short window.
    fn tick_playback_timers(&mut self, triage: &TriageView, rx: &RxView) {
        if triage.playback == PlaybackPhase::Played {
            self.triage_played_at.get_or_insert_with(Instant::now);
        } else {
            self.triage_played_at = None;
        }

        self.rx_played_at
            .retain(|i, _| rx.rows.get(*i).map(|r| r.phase) == Some(InstructionPhase::Played));
        for (i, row) in rx.rows.iter().enumerate() {
            if row.phase == InstructionPhase::Played {
                self.rx_played_at.entry(i).or_insert_with(Instant::now);
            }
        }
    }

    /// Label and enabled-state for the triage translation play control.
    fn triage_play_control(&self, playback: PlaybackPhase) -> (&'static str, bool) {
        match playback {
            PlaybackPhase::Speaking => ("Generating Audio...", false),
            PlaybackPhase::Played
                if self
                    .triage_played_at
                    .is_some_and(|t| t.elapsed() < TRIAGE_CONFIRM_WINDOW) =>
            {
                ("✅ Audio Played", false)
            }
            _ => ("🔊 Play Audio", true),
        }
    }

    /// Label and enabled-state for one prescription row's speak control.
    fn instruction_control(&self, index: usize, row: &InstructionRow) -> (&'static str, bool) {
        match row.phase {
            InstructionPhase::Translating => ("Translating...", false),
            InstructionPhase::Playing => ("Playing Audio...", false),
            InstructionPhase::Played
                if self
                    .rx_played_at
                    .get(&index)
                    .is_some_and(|t| t.elapsed() < RX_CONFIRM_WINDOW) =>
            {
                ("✅ Audio Played", false)
            }
            _ if row.played_once => ("🔊 Play Audio Again", true),
            _ => ("🔊 Play Audio", true),
        }
    }

    // ── Repaint scheduling ───────────────────────────────────────────────

    /// While any pipeline or playback is in flight, poll the views at ~10 fps;
    /// while a confirmation window is counting down, at ~4 fps.  An idle
    /// shell schedules nothing and repaints only on input.
    fn repaint_delay(
        &self,
        triage: &TriageView,
        scribe: &ScribeView,
        rx: &RxView,
    ) -> Option<Duration> {
        let any_busy = triage.phase.is_busy()
            || triage.playback == PlaybackPhase::Speaking
            || scribe.phase.is_busy()
            || rx.phase.is_busy()
            || rx.rows.iter().any(|r| r.phase.is_busy());
        if any_busy {
            return Some(Duration::from_millis(100));
        }

        // `Played` persists until the next command, so key on the window
        // still counting down rather than on a timestamp being present.
        let confirming = self
            .triage_played_at
            .is_some_and(|t| t.elapsed() < TRIAGE_CONFIRM_WINDOW)
            || self
                .rx_played_at
                .values()
                .any(|t| t.elapsed() < RX_CONFIRM_WINDOW);
        confirming.then_some(Duration::from_millis(250))
    }

    fn schedule_repaints(
        &self,
        ctx: &egui::Context,
        triage: &TriageView,
        scribe: &ScribeView,
        rx: &RxView,
    ) {
        if let Some(delay) = self.repaint_delay(triage, scribe, rx) {
            ctx.request_repaint_after(delay);
        }
    }

    // ── Triage panel ─────────────────────────────────────────────────────

    fn draw_triage(&mut self, ui: &mut egui::Ui, view: &TriageView) {
        draw_drop_zone(ui, "Drop an injury photo here (jpg, png, gif, webp)");
        if let Some(path) = path_entry(ui, &mut self.triage_path) {
            let _ = self.triage_tx.try_send(TriageCommand::Select {
                path,
                declared_type: None,
            });
        }
        selection_line(ui, view.selection.as_deref());

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            language_selector(ui, "triage-language", &mut self.triage_language);

            let busy = view.phase.is_busy();
            let label = if busy { "Analyzing..." } else { "🔍 Analyze Injury" };
            if ui
                .add_enabled(view.selection.is_some() && !busy, egui::Button::new(label))
                .clicked()
            {
                let _ = self.triage_tx.try_send(TriageCommand::Analyze {
                    language: self.triage_language,
                });
            }

            let can_clear =
                view.selection.is_some() || view.report.is_some() || view.error.is_some();
            if ui
                .add_enabled(can_clear && !busy, egui::Button::new("Clear"))
                .clicked()
            {
                let _ = self.triage_tx.try_send(TriageCommand::Clear);
                self.triage_path.clear();
                self.triage_played_at = None;
                self.show_emergency = false;
            }
        });

        status_line(ui, view.phase.is_busy(), view.phase.label());
        error_banner(ui, view.error.as_deref());

        if let Some(report) = &view.report {
            self.draw_triage_report(ui, report, view.playback);
        }
    }

    fn draw_triage_report(
        &mut self,
        ui: &mut egui::Ui,
        report: &TriageReport,
        playback: PlaybackPhase,
    ) {
        let assessment = &report.assessment;
        let accent = band_color(assessment.severity_band());

        ui.add_space(8.0);
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(
                    egui::RichText::new(format!(
                        "Severity: {}/10 — {}",
                        assessment.severity_score, assessment.severity_level
                    ))
                    .color(accent)
                    .strong()
                    .size(16.0),
                );
                ui.label(egui::RichText::new(&assessment.injury_type).strong());
                ui.add_space(4.0);
                ui.label(&assessment.assessment);

                ui.add_space(6.0);
                ui.label(egui::RichText::new("Immediate actions").strong());
                for (i, action) in assessment.immediate_actions.iter().enumerate() {
                    ui.label(format!("{}. {}", i + 1, action));
                }

                if !assessment.warning_signs.is_empty() {
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new("Warning signs").strong().color(ORANGE));
                    for sign in &assessment.warning_signs {
                        ui.label(format!("• {sign}"));
                    }
                }

                if assessment.requires_emergency() {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new("🚨 Severe injury — emergency care recommended")
                            .color(RED)
                            .strong(),
                    );
                    if ui
                        .button(egui::RichText::new("📞 Call 108").color(RED))
                        .clicked()
                    {
                        self.show_emergency = true;
                    }
                }
            });

        if let Some(translation) = &report.translation {
            ui.add_space(6.0);
            egui::Frame::group(ui.style())
                .inner_margin(egui::Margin::same(10))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(
                        egui::RichText::new(format!("In {}", report.language.display_name()))
                            .color(BLUE)
                            .strong(),
                    );
                    ui.label(translation);
                    ui.add_space(4.0);
                    let (label, enabled) = self.triage_play_control(playback);
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        let _ = self.triage_tx.try_send(TriageCommand::PlayTranslation);
                    }
                });
        }

        self.draw_raw_response(ui, report);
    }

    // ── Scribe panel ─────────────────────────────────────────────────────

    fn draw_scribe(&mut self, ui: &mut egui::Ui, view: &ScribeView) {
        draw_drop_zone(
            ui,
            "Drop a consultation recording here (mp3, wav, aac, ogg, flac, m4a)",
        );
        if let Some(path) = path_entry(ui, &mut self.scribe_path) {
            let _ = self.scribe_tx.try_send(ScribeCommand::Select {
                path,
                declared_type: None,
            });
        }
        selection_line(ui, view.selection.as_deref());

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            language_selector(ui, "scribe-language", &mut self.scribe_language);

            let busy = view.phase.is_busy();
            let label = if busy { "Processing..." } else { "📋 Generate Summary" };
            if ui
                .add_enabled(view.selection.is_some() && !busy, egui::Button::new(label))
                .clicked()
            {
                let _ = self.scribe_tx.try_send(ScribeCommand::Transcribe {
                    language: self.scribe_language,
                });
            }

            let can_clear =
                view.selection.is_some() || view.report.is_some() || view.error.is_some();
            if ui
                .add_enabled(can_clear && !busy, egui::Button::new("Clear"))
                .clicked()
            {
                let _ = self.scribe_tx.try_send(ScribeCommand::Clear);
                self.scribe_path.clear();
            }
        });

        status_line(ui, view.phase.is_busy(), view.phase.label());
        error_banner(ui, view.error.as_deref());

        if let Some(report) = &view.report {
            self.draw_scribe_report(ui, report);
        }
    }

    fn draw_scribe_report(&mut self, ui: &mut egui::Ui, report: &ConsultationReport) {
        ui.add_space(8.0);
        ui.label(egui::RichText::new(report.language_badge()).color(BLUE).strong());

        ui.add_space(4.0);
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(10))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                let summary = report.display_summary();
                summary_field(ui, "Chief Complaint", &summary.chief_complaint);
                summary_field(ui, "Duration", &summary.duration);
                summary_field(ui, "Symptoms", &summary.symptoms);
                if let Some(text) = renderable(&summary.medical_history) {
                    summary_field(ui, "Medical History", text);
                }
                if let Some(text) = renderable(&summary.physical_exam) {
                    summary_field(ui, "Physical Exam", text);
                }
                summary_field(ui, "Assessment", &summary.assessment);
                summary_field(ui, "Treatment Plan", &summary.treatment_plan);
                summary_field(ui, "Follow-up", &summary.follow_up);
                if let Some(text) = renderable(&summary.red_flags) {
                    ui.add_space(4.0);
                    ui.label(egui::RichText::new("🚩 Red Flags").strong().color(RED));
                    ui.label(egui::RichText::new(text).color(RED));
                }
            });

        ui.add_space(4.0);
        ui.collapsing("Transcript", |ui| {
            ui.label(
                egui::RichText::new(format!(
                    "{} ({})",
                    report.transcript.language, report.transcript.language_code
                ))
                .color(GRAY)
                .size(11.0),
            );
            ui.label(&report.transcript.transcript);
        });

        self.draw_raw_response(ui, report);
    }

    // ── Prescription panel ───────────────────────────────────────────────

    fn draw_rx(&mut self, ui: &mut egui::Ui, view: &RxView) {
        draw_drop_zone(ui, "Drop a prescription photo here (jpg, png, gif, webp)");
        if let Some(path) = path_entry(ui, &mut self.rx_path) {
            let _ = self.rx_tx.try_send(RxCommand::Select {
                path,
                declared_type: None,
            });
        }
        selection_line(ui, view.selection.as_deref());

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            language_selector(ui, "rx-language", &mut self.rx_language);

            let busy = view.phase.is_busy();
            let label = if busy { "Reading..." } else { "📖 Read Prescription" };
            if ui
                .add_enabled(view.selection.is_some() && !busy, egui::Button::new(label))
                .clicked()
            {
                let _ = self.rx_tx.try_send(RxCommand::Read);
            }

            let can_clear =
                view.selection.is_some() || view.record.is_some() || view.error.is_some();
            if ui
                .add_enabled(can_clear && !busy, egui::Button::new("Clear"))
                .clicked()
            {
                let _ = self.rx_tx.try_send(RxCommand::Clear);
                self.rx_path.clear();
                self.rx_played_at.clear();
            }
        });

        status_line(ui, view.phase.is_busy(), view.phase.label());
        error_banner(ui, view.error.as_deref());

        if let Some(record) = &view.record {
            self.draw_rx_record(ui, record, &view.rows);
        }
    }

    fn draw_rx_record(
        &mut self,
        ui: &mut egui::Ui,
        record: &PrescriptionRecord,
        rows: &[InstructionRow],
    ) {
        ui.add_space(8.0);

        let has_header = renderable(&record.doctor_name).is_some()
            || renderable(&record.date).is_some()
            || renderable(&record.patient_name).is_some();
        if has_header {
            egui::Frame::group(ui.style())
                .inner_margin(egui::Margin::same(10))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    if let Some(text) = renderable(&record.doctor_name) {
                        ui.label(format!("Doctor: {text}"));
                    }
                    if let Some(text) = renderable(&record.date) {
                        ui.label(format!("Date: {text}"));
                    }
                    if let Some(text) = renderable(&record.patient_name) {
                        ui.label(format!("Patient: {text}"));
                    }
                });
            ui.add_space(4.0);
        }

        if record.medications.is_empty() {
            ui.label(
                egui::RichText::new("No medications could be read from this prescription.")
                    .color(ORANGE),
            );
        }

        for (index, medication) in record.medications.iter().enumerate() {
            let row = rows.get(index).cloned().unwrap_or_default();

            egui::Frame::group(ui.style())
                .inner_margin(egui::Margin::same(10))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(
                        egui::RichText::new(format!("{}. {}", index + 1, medication.medicine_name))
                            .strong()
                            .size(14.0),
                    );
                    ui.label(
                        egui::RichText::new(format!(
                            "{} · {} · {}",
                            medication.dosage, medication.frequency, medication.duration
                        ))
                        .color(GRAY),
                    );
                    if let Some(text) = renderable(&medication.instructions) {
                        ui.label(egui::RichText::new(text).italics());
                    }

                    ui.add_space(4.0);
                    ui.label(&medication.colloquial_instruction);
                    if let Some(translated) = &row.translated {
                        ui.label(egui::RichText::new(translated).color(GREEN));
                    }
                    if let Some(error) = &row.error {
                        ui.colored_label(RED, format!("Error: {error}"));
                    }

                    ui.add_space(4.0);
                    let (label, enabled) = self.instruction_control(index, &row);
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        let _ = self.rx_tx.try_send(RxCommand::SpeakInstruction {
                            row: index,
                            language: self.rx_language,
                        });
                    }
                });
            ui.add_space(4.0);
        }

        if let Some(text) = renderable(&record.general_advice) {
            summary_field(ui, "General Advice", text);
        }
        if let Some(text) = renderable(&record.follow_up) {
            summary_field(ui, "Follow-up", text);
        }

        self.draw_raw_response(ui, record);
    }

    // ── Shared panel pieces ──────────────────────────────────────────────

    /// Collapsible re-serialization of the last structured result.
    fn draw_raw_response<T: serde::Serialize>(&self, ui: &mut egui::Ui, value: &T) {
        if !self.config.ui.show_raw_response {
            return;
        }
        ui.add_space(4.0);
        ui.collapsing("Raw response", |ui| {
            let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".into());
            ui.label(egui::RichText::new(json).monospace().size(11.0));
        });
    }

    /// Centered modal-style window with the national emergency number.
    fn draw_emergency_overlay(&mut self, ctx: &egui::Context) {
        if !self.show_emergency {
            return;
        }
        egui::Window::new("Emergency")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("Emergency Number: 108 (India)")
                        .strong()
                        .size(18.0),
                );
                ui.label("Free ambulance service, available 24 hours.");
                ui.add_space(6.0);
                if ui.button("Close").clicked() {
                    self.show_emergency = false;
                }
            });
    }
}

// ---------------------------------------------------------------------------
// Stateless widget helpers
// ---------------------------------------------------------------------------

/// Full-width drop target hint; highlights while a file hovers the window.
fn draw_drop_zone(ui: &mut egui::Ui, hint: &str) {
    let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
    let text = if hovering { "Release to attach" } else { hint };
    egui::Frame::group(ui.style())
        .inner_margin(egui::Margin::same(14))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("📎").size(20.0));
                ui.label(egui::RichText::new(text).color(if hovering { GREEN } else { GRAY }));
            });
        });
}

/// Manual path entry row; returns `Some(path)` when submitted.
fn path_entry(ui: &mut egui::Ui, input: &mut String) -> Option<PathBuf> {
    let mut picked = None;
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(input)
                .hint_text("…or paste a file path")
                .desired_width(280.0),
        );
        let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (ui.button("Attach").clicked() || entered) && !input.trim().is_empty() {
            picked = Some(PathBuf::from(input.trim()));
            input.clear();
        }
    });
    picked
}

/// "📎 name.jpg (12.3 KB)" line under the drop zone.
fn selection_line(ui: &mut egui::Ui, selection: Option<&str>) {
    ui.add_space(4.0);
    match selection {
        Some(summary) => {
            ui.label(egui::RichText::new(format!("📎 {summary}")).color(GREEN));
        }
        None => {
            ui.label(egui::RichText::new("No file selected.").color(GRAY).size(11.0));
        }
    }
}

/// Output language selector over the 11 supported locales.
fn language_selector(ui: &mut egui::Ui, id: &str, selected: &mut Language) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected.display_name())
        .show_ui(ui, |ui| {
            for lang in ALL_LANGUAGES {
                ui.selectable_value(selected, lang, lang.display_name());
            }
        });
}

/// Spinner + phase label while a pipeline is in flight.
fn status_line(ui: &mut egui::Ui, busy: bool, label: &str) {
    if !busy {
        return;
    }
    ui.add_space(4.0);
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(egui::RichText::new(label).color(BLUE));
    });
}

/// Single-line error banner under the controls.
fn error_banner(ui: &mut egui::Ui, error: Option<&str>) {
    if let Some(message) = error {
        ui.add_space(4.0);
        ui.colored_label(RED, format!("⚠ {message}"));
    }
}

/// Bold label over a value, used for summary and record fields.
fn summary_field(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.add_space(2.0);
    ui.label(egui::RichText::new(label).strong().size(12.0));
    ui.label(value);
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for SahayakApp {
    /// Called every frame by eframe.  Routes drops, snapshots the module
    /// views, schedules repaints, then renders the active panel.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.route_dropped_files(ctx);

        // Snapshot the three views; the locks are held only for the clone.
        let triage = self.triage_view.lock().unwrap().clone();
        let scribe = self.scribe_view.lock().unwrap().clone();
        let rx = self.rx_view.lock().unwrap().clone();

        self.tick_playback_timers(&triage, &rx);
        self.schedule_repaints(ctx, &triage, &scribe, &rx);

        // Track the window position for persistence on exit.
        if let Some(outer) = ctx.input(|i| i.viewport().outer_rect) {
            self.config.ui.window_position = Some((outer.min.x, outer.min.y));
        }

        egui::SidePanel::left("module-nav")
            .resizable(false)
            .exact_width(210.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.heading("Sahayak");
                ui.label(
                    egui::RichText::new("Clinical assistant for rural health workers")
                        .color(GRAY)
                        .size(11.0),
                );
                ui.add_space(8.0);
                ui.separator();

                for panel in ModulePanel::ALL {
                    let busy = match panel {
                        ModulePanel::Triage => triage.phase.is_busy(),
                        ModulePanel::Scribe => scribe.phase.is_busy(),
                        ModulePanel::Rx => {
                            rx.phase.is_busy() || rx.rows.iter().any(|r| r.phase.is_busy())
                        }
                    };
                    let label = if busy {
                        format!("{} ⏳", panel.nav_label())
                    } else {
                        panel.nav_label().to_string()
                    };
                    if ui.selectable_label(self.active == panel, label).clicked() {
                        self.active = panel;
                    }
                    ui.add_space(2.0);
                }

                ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                    ui.add_space(8.0);
                    ui.label(
                        egui::RichText::new(format!("voice: {}", self.config.speech.speaker))
                            .color(GRAY)
                            .size(10.0),
                    );
                    ui.label(
                        egui::RichText::new(format!("model: {}", self.config.gateway.model))
                            .color(GRAY)
                            .size(10.0),
                    );
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading(self.active.title());
            ui.label(egui::RichText::new(self.active.subtitle()).color(GRAY).size(12.0));
            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| match self.active {
                    ModulePanel::Triage => self.draw_triage(ui, &triage),
                    ModulePanel::Scribe => self.draw_scribe(ui, &scribe),
                    ModulePanel::Rx => self.draw_rx(ui, &rx),
                });
        });

        self.draw_emergency_overlay(ctx);
    }

    /// Persist settings (including the tracked window position) on exit.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.config.save() {
            log::warn!("failed to persist settings on exit: {e}");
        }
        log::info!("sahayak closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
