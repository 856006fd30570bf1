//! Application entry point — Scene Classifier.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk; on first run write the defaults out.
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the pipeline (tract loader, optional cache, stale-run policy).
//! 5. Create the command channel and spawn [`Pipeline::run`] on the runtime.
//! 6. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::mpsc;

use scene_classifier::{
    app::SceneApp,
    config::{AppConfig, AppPaths},
    pipeline::{Pipeline, PipelineCommand},
    source::{DialogImageSource, ImageSource},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Scene Classifier")
        .with_inner_size([width, height])
        .with_min_inner_size([280.0, 320.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Scene Classifier starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if AppConfig::is_first_run() {
        match config.save() {
            Ok(()) => log::info!("Wrote default settings to {}", paths.settings_file.display()),
            Err(e) => log::warn!("Could not write default settings: {e}"),
        }
    }

    // 3. Tokio runtime (inference runs on its blocking pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Pipeline
    let pipeline = Pipeline::from_config(&config, &paths);
    let store = pipeline.store().clone();

    // 5. Command channel + orchestrator task
    let (command_tx, command_rx) = mpsc::channel::<PipelineCommand>(16);
    rt.spawn(pipeline.run(command_rx));

    // 6. Window (blocks until closed)
    let source: Arc<dyn ImageSource> = Arc::new(DialogImageSource::new());
    let handle = rt.handle().clone();
    let options = native_options(&config);

    eframe::run_native(
        "Scene Classifier",
        options,
        Box::new(move |cc| {
            Ok(Box::new(SceneApp::new(
                &cc.egui_ctx,
                store,
                command_tx,
                source,
                handle,
                config,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("window failed: {e}"))?;

    log::info!("Scene Classifier shut down");
    Ok(())
}
