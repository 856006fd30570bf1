//! Scene classifier window — egui/eframe application.
//!
//! # Architecture
//!
//! [`SceneApp`] is the top-level [`eframe::App`].  It owns:
//!
//! * a [`PresentationStore`] handle, read every frame;
//! * `command_tx`, which sends [`PipelineCommand`]s to the pipeline task;
//! * an [`ImageSource`] that tapping the photo area drives on the tokio
//!   runtime so the picker never blocks rendering.
//!
//! The source is wrapped in a [`PreviewingSource`], which renders a thumbnail
//! of every selected photo on the blocking pool.  The photo area shows that
//! thumbnail, or a "Choose photo…" placeholder before the first pick.
//!
//! The store's observer hook requests a repaint whenever a run changes the
//! state, so the window updates without polling.
//!
//! # Window states
//!
//! | State       | Visual                                   |
//! |-------------|------------------------------------------|
//! | `Idle`      | "Tap image to select" — dim gray         |
//! | `Analyzing` | Spinner + "Analyzing image..."           |
//! | `Done` ok   | "Result: <label>" — green                |
//! | `Done` fail | "Image resize failed" / "Analysis failed" — red |

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::classifier::find_model_by_id;
use crate::config::AppConfig;
use crate::pipeline::{PipelineCommand, PresentationState, PresentationStore, Subscription};
use crate::preprocess::{PixelFormat, Preprocessor, RawImage, ResizeError, ResizeMode, TargetSize};
use crate::source::{forward_selection, ImageSource};

const IDLE_COLOR: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);
const BUSY_COLOR: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const SUCCESS_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const FAILURE_COLOR: egui::Color32 = egui::Color32::from_rgb(230, 70, 70);

/// Text colour for `state`.
pub fn state_color(state: &PresentationState) -> egui::Color32 {
    match state {
        PresentationState::Idle => IDLE_COLOR,
        PresentationState::Analyzing => BUSY_COLOR,
        PresentationState::Done(_) if state.is_failure() => FAILURE_COLOR,
        PresentationState::Done(_) => SUCCESS_COLOR,
    }
}

// ---------------------------------------------------------------------------
// Photo preview
// ---------------------------------------------------------------------------

/// Bounding box of the photo thumbnail.
pub const THUMBNAIL_SIZE: TargetSize = TargetSize::new(320, 240);

/// Latest thumbnail produced off the UI thread, waiting to be uploaded.
#[derive(Debug)]
pub enum Preview {
    Photo(egui::ColorImage),
    /// The photo could not be decoded; show the placeholder again.
    Unreadable,
}

type PendingPreview = Arc<Mutex<Option<Preview>>>;

/// Letterbox `image` into [`THUMBNAIL_SIZE`] as an egui bitmap.
pub fn thumbnail(image: &RawImage) -> Result<egui::ColorImage, ResizeError> {
    let buffer = Preprocessor::new(THUMBNAIL_SIZE)
        .with_mode(ResizeMode::Letterbox)
        .with_format(PixelFormat::Rgb8)
        .process(image)?;

    let (width, height) = (buffer.width(), buffer.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            rgb.extend(buffer.rgb_at(x, y).unwrap_or([0; 3]));
        }
    }
    Ok(egui::ColorImage::from_rgb(
        [width as usize, height as usize],
        &rgb,
    ))
}

/// Wraps another source and renders a thumbnail of each selected photo.
///
/// The selection is returned immediately; the thumbnail lands in the pending
/// slot later and a repaint is requested.
pub struct PreviewingSource {
    inner: Arc<dyn ImageSource>,
    pending: PendingPreview,
    ctx: egui::Context,
}

impl PreviewingSource {
    pub fn new(inner: Arc<dyn ImageSource>, ctx: egui::Context) -> Self {
        Self {
            inner,
            pending: Arc::new(Mutex::new(None)),
            ctx,
        }
    }

    /// Take the thumbnail produced since the last call, if any.
    pub fn take_preview(&self) -> Option<Preview> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl ImageSource for PreviewingSource {
    async fn select(&self) -> Option<RawImage> {
        let image = self.inner.select().await?;

        let photo = image.clone();
        let pending = Arc::clone(&self.pending);
        let ctx = self.ctx.clone();
        tokio::task::spawn_blocking(move || {
            let preview = match thumbnail(&photo) {
                Ok(bitmap) => Preview::Photo(bitmap),
                Err(e) => {
                    log::debug!("ui: no thumbnail for {}: {e}", photo.describe());
                    Preview::Unreadable
                }
            };
            *pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(preview);
            ctx.request_repaint();
        });

        Some(image)
    }
}

// ---------------------------------------------------------------------------
// SceneApp
// ---------------------------------------------------------------------------

/// eframe application: a single window with a picker and the result line.
pub struct SceneApp {
    store: PresentationStore,
    subscription: Option<Subscription>,
    command_tx: mpsc::Sender<PipelineCommand>,
    source: Arc<PreviewingSource>,
    runtime: Handle,
    photo: Option<egui::TextureHandle>,
    config: AppConfig,
    show_settings: bool,
    /// Result of the last "Save" in the settings panel.
    settings_status: Option<String>,
}

impl SceneApp {
    /// Create the app and hook repaints to store transitions.
    ///
    /// * `ctx`        — egui context from the creation callback.
    /// * `store`      — presentation state shared with the pipeline.
    /// * `command_tx` — sender end of the pipeline command channel.
    /// * `source`     — where photos come from (usually the file dialog);
    ///   wrapped in a [`PreviewingSource`].
    /// * `runtime`    — handle of the tokio runtime running the pipeline.
    pub fn new(
        ctx: &egui::Context,
        store: PresentationStore,
        command_tx: mpsc::Sender<PipelineCommand>,
        source: Arc<dyn ImageSource>,
        runtime: Handle,
        config: AppConfig,
    ) -> Self {
        let repaint = ctx.clone();
        let subscription = store.subscribe(move |_| repaint.request_repaint());

        Self {
            store,
            subscription: Some(subscription),
            command_tx,
            source: Arc::new(PreviewingSource::new(source, ctx.clone())),
            runtime,
            photo: None,
            config,
            show_settings: false,
            settings_status: None,
        }
    }

    /// Open the source on the runtime and forward whatever it yields.
    fn choose_photo(&self) {
        let source = Arc::clone(&self.source);
        let tx = self.command_tx.clone();
        self.runtime.spawn(async move {
            if let Err(e) = forward_selection(source.as_ref(), &tx).await {
                log::warn!("ui: selection not delivered: {e}");
            }
        });
    }

    /// Upload a freshly rendered thumbnail, if one arrived.
    fn refresh_photo(&mut self, ctx: &egui::Context) {
        match self.source.take_preview() {
            Some(Preview::Photo(bitmap)) => {
                self.photo = Some(ctx.load_texture("photo", bitmap, egui::TextureOptions::LINEAR));
            }
            Some(Preview::Unreadable) => self.photo = None,
            None => {}
        }
    }

    fn save_settings(&mut self) {
        self.settings_status = Some(match self.config.save() {
            Ok(()) => "Saved. Restart to apply.".to_string(),
            Err(e) => {
                log::warn!("ui: failed to save settings: {e}");
                format!("Save failed: {e}")
            }
        });
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("Scene Classifier")
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(15.0),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add(egui::Button::new(egui::RichText::new("=").size(12.0)).frame(false))
                    .on_hover_text("Settings")
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }
            });
        });
    }

    /// The photo area and the result line.
    fn draw_main(&self, ui: &mut egui::Ui, state: &PresentationState) {
        ui.add_space(12.0);

        let area = egui::vec2(ui.available_width(), 240.0);
        // Stays enabled while analyzing: a new pick starts another run.
        let tapped = match &self.photo {
            Some(texture) => ui
                .vertical_centered(|ui| {
                    ui.add(
                        egui::Image::new(texture)
                            .max_size(area)
                            .sense(egui::Sense::click()),
                    )
                    .on_hover_text("Tap to choose another photo")
                    .clicked()
                })
                .inner,
            None => ui
                .add(
                    egui::Button::new(egui::RichText::new("Choose photo…").size(16.0))
                        .min_size(area),
                )
                .clicked(),
        };
        if tapped {
            self.choose_photo();
        }

        ui.add_space(16.0);
        ui.horizontal(|ui| {
            if state.is_busy() {
                ui.add(egui::Spinner::new().size(16.0));
            }
            ui.label(
                egui::RichText::new(state.display_text())
                    .color(state_color(state))
                    .size(15.0),
            );
        });

        if let PresentationState::Done(result) = state {
            if !result.is_failure() {
                ui.add_space(6.0);
                if ui.small_button("Copy").clicked() {
                    ui.ctx().copy_text(state.display_text());
                }
            }
        }
    }

    fn draw_settings(&mut self, ui: &mut egui::Ui) {
        let dim = egui::Color32::from_rgb(150, 150, 150);
        let row = |ui: &mut egui::Ui, text: String| {
            ui.label(egui::RichText::new(text).color(dim).size(11.0));
        };

        ui.add_space(4.0);
        match find_model_by_id(&self.config.model.id) {
            Some(info) => row(
                ui,
                format!("Model: {} ({} classes, {})", info.display_name, info.classes, info.dataset),
            ),
            None => row(ui, format!("Model: {} (custom)", self.config.model.id)),
        }
        if let Some(path) = &self.config.model.path {
            row(ui, format!("  path: {}", path.display()));
        }
        row(
            ui,
            format!(
                "Input: {}  ({:?}, {:?})",
                self.config.model.target(),
                self.config.preprocess.mode,
                self.config.preprocess.filter
            ),
        );
        row(ui, format!("Overlapping runs now: {:?}", self.store.policy()));

        ui.add_space(8.0);
        egui::ComboBox::from_label("Resize")
            .selected_text(format!("{:?}", self.config.preprocess.mode))
            .show_ui(ui, |ui| {
                for mode in [ResizeMode::Stretch, ResizeMode::CenterCrop, ResizeMode::Letterbox] {
                    ui.selectable_value(&mut self.config.preprocess.mode, mode, format!("{mode:?}"));
                }
            });
        ui.checkbox(&mut self.config.model.cache, "Keep model loaded between runs");
        ui.checkbox(
            &mut self.config.pipeline.discard_stale_results,
            "Only show the latest photo's result",
        );
        ui.checkbox(&mut self.config.ui.always_on_top, "Always on top");

        ui.add_space(6.0);
        if ui.button("Save").clicked() {
            self.save_settings();
        }
        if let Some(status) = &self.settings_status {
            row(ui, status.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for SceneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_photo(ctx);
        let state = self.store.current_state();

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui);
            ui.separator();

            if self.show_settings {
                self.draw_settings(ui);
                return;
            }
            self.draw_main(ui, &state);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }
        log::info!("ui: window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
