//! Application entry point — Sahayak.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the shared service clients: the completion gateway and the
//!    synthesize-then-play speaker.
//! 5. Create one command channel and one shared view handle per module.
//! 6. Spawn the three module orchestrators on the tokio runtime.
//! 7. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use tokio::sync::mpsc;

use sahayak::{
    app::{ModuleChannels, SahayakApp},
    config::AppConfig,
    gateway::{Gateway, HttpGateway},
    modules::{
        new_shared, RxCommand, RxOrchestrator, RxView, ScribeCommand, ScribeOrchestrator,
        ScribeView, TriageCommand, TriageOrchestrator, TriageView,
    },
    speech::{AudioSink, RodioSink, Speaker, SpeechClient, SpeechEngine, SpeechSynthesizer},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([980.0, 720.0])
        .with_min_inner_size([720.0, 520.0]);

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Sahayak starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads — the pipelines are I/O-bound)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Shared service clients.  All three orchestrators use the same
    //    gateway; triage and prescriptions share the speaker.
    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::from_config(&config.gateway));
    let engine: Arc<dyn SpeechEngine> = Arc::new(SpeechClient::from_config(&config.speech));
    let sink: Arc<dyn AudioSink> = Arc::new(RodioSink::new());
    let speaker: Arc<dyn SpeechSynthesizer> = Arc::new(Speaker::new(engine, sink));

    if config.gateway.api_key.as_deref().unwrap_or("").is_empty() {
        log::warn!("no completion API key configured; requests will be sent without credentials");
    }

    // 5. Channel setup — one command channel + view handle per module
    let (triage_tx, triage_rx) = mpsc::channel::<TriageCommand>(16);
    let (scribe_tx, scribe_rx) = mpsc::channel::<ScribeCommand>(16);
    let (rx_tx, rx_rx) = mpsc::channel::<RxCommand>(16);

    let triage_view = new_shared(TriageView::default());
    let scribe_view = new_shared(ScribeView::default());
    let rx_view = new_shared(RxView::default());

    // 6. Spawn the three module orchestrators onto the tokio runtime
    rt.spawn(
        TriageOrchestrator::new(
            triage_view.clone(),
            Arc::clone(&gateway),
            Arc::clone(&speaker),
        )
        .run(triage_rx),
    );
    rt.spawn(ScribeOrchestrator::new(scribe_view.clone(), Arc::clone(&gateway)).run(scribe_rx));
    rt.spawn(
        RxOrchestrator::new(rx_view.clone(), Arc::clone(&gateway), Arc::clone(&speaker))
            .run(rx_rx),
    );

    // 7. Build the egui app and run it (blocks until the window is closed)
    let channels = ModuleChannels {
        triage_view,
        triage_tx,
        scribe_view,
        scribe_tx,
        rx_view,
        rx_tx,
    };
    let app = SahayakApp::new(channels, config.clone());
    let options = native_options(&config);

    eframe::run_native("Sahayak", options, Box::new(move |_cc| Ok(Box::new(app))))
}
