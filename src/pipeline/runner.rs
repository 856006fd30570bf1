//! Pipeline orchestrator: photo → preprocess → classify → presentation state.
//!
//! [`Pipeline`] owns a [`PresentationStore`] handle and responds to
//! [`PipelineCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Run flow
//!
//! ```text
//! PipelineCommand::ImageSelected(raw)
//!   └─▶ store.begin_run()                                 [Analyzing]
//!         └─▶ spawn_blocking(preprocess → classify)
//!               ├─ Ok(label)        → finish(Success)     [Done]
//!               ├─ ResizeError      → finish(Resize)      [Done]
//!               ├─ InferenceError   → finish(Analysis)    [Done]
//!               └─ task panicked    → finish(Analysis)    [Done]
//! ```
//!
//! Each selection starts its own run; nothing is cancelled.  Which result
//! ends up on screen when runs overlap is the store's
//! [`StaleRunPolicy`](super::StaleRunPolicy).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::classifier::{CachedLoader, InferenceAdapter, ModelLoader, TractModelLoader};
use crate::config::{AppConfig, AppPaths};
use crate::preprocess::{Preprocessor, RawImage};

use super::state::{FailureReason, PredictionResult, PresentationStore};

// ---------------------------------------------------------------------------
// PipelineCommand
// ---------------------------------------------------------------------------

/// Events the display layer sends to the pipeline.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    /// The user picked a photo.  Re-selecting the same photo is a new run.
    ImageSelected(RawImage),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives one run per selected photo.
///
/// Create with [`Pipeline::new`] (or [`Pipeline::from_config`]), then call
/// [`run`](Self::run) inside a tokio task.
///
/// ```rust,no_run
/// use scene_classifier::config::{AppConfig, AppPaths};
/// use scene_classifier::pipeline::{Pipeline, PipelineCommand};
/// use scene_classifier::preprocess::RawImage;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let pipeline = Pipeline::from_config(&config, &AppPaths::new());
/// let store = pipeline.store().clone();
///
/// let (tx, rx) = tokio::sync::mpsc::channel(8);
/// tokio::spawn(pipeline.run(rx));
///
/// let photo = RawImage::open("beach.jpg").unwrap();
/// tx.send(PipelineCommand::ImageSelected(photo)).await.unwrap();
/// println!("{}", store.current_state().display_text());
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Pipeline {
    store: PresentationStore,
    preprocessor: Preprocessor,
    adapter: InferenceAdapter,
}

impl Pipeline {
    /// # Arguments
    ///
    /// * `store`        — presentation state, also read by the display layer.
    /// * `preprocessor` — resize policy; its target must match the model.
    /// * `adapter`      — classifier around an injected [`ModelLoader`].
    pub fn new(
        store: PresentationStore,
        preprocessor: Preprocessor,
        adapter: InferenceAdapter,
    ) -> Self {
        Self {
            store,
            preprocessor,
            adapter,
        }
    }

    /// Wire the tract backend, loader caching and stale-run policy from
    /// `config`.
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> Self {
        let model_path = config.model.resolve_path(paths);
        log::info!(
            "pipeline: model {:?} at {}, cache = {}",
            config.model.id,
            model_path.display(),
            config.model.cache
        );

        if !model_path.exists() {
            log::warn!(
                "pipeline: no model at {}; every run will fail until it is installed",
                model_path.display()
            );
        }

        let tract = TractModelLoader::new(model_path);
        let loader: Arc<dyn ModelLoader> = if config.model.cache {
            Arc::new(CachedLoader::new(tract))
        } else {
            Arc::new(tract)
        };

        Self::new(
            PresentationStore::new(config.pipeline.stale_policy()),
            config.preprocessor(),
            InferenceAdapter::new(loader),
        )
    }

    pub fn store(&self) -> &PresentationStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, then wait for in-flight runs.
    pub async fn run(self, mut commands: mpsc::Receiver<PipelineCommand>) {
        let mut runs = JoinSet::new();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(PipelineCommand::ImageSelected(image)) => {
                        let handle = self.start(image);
                        runs.spawn(handle);
                    }
                    None => break,
                },
                Some(_) = runs.join_next(), if !runs.is_empty() => {}
            }
        }

        log::info!(
            "pipeline: command channel closed, waiting for {} run(s)",
            runs.len()
        );
        while runs.join_next().await.is_some() {}
    }

    // -----------------------------------------------------------------------
    // Single run
    // -----------------------------------------------------------------------

    /// Start a run for `image` and wait for its result.
    pub async fn analyze(&self, image: RawImage) -> PredictionResult {
        match self.start(image).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("pipeline: run task failed: {e}");
                PredictionResult::Failure(FailureReason::Analysis)
            }
        }
    }

    /// Enter `Analyzing` now and finish the run in the background.
    ///
    /// The run token is taken before this returns, so runs started in
    /// selection order are ordered the same way in the store.
    pub fn start(&self, image: RawImage) -> JoinHandle<PredictionResult> {
        let token = self.store.begin_run();
        let this = self.clone();

        tokio::spawn(async move {
            let worker = this.clone();
            let result = match tokio::task::spawn_blocking(move || worker.process(&image)).await
            {
                Ok(result) => result,
                Err(e) => {
                    log::error!("pipeline: run {token} panicked: {e}");
                    PredictionResult::Failure(FailureReason::Analysis)
                }
            };
            this.store.finish(token, result.clone());
            result
        })
    }

    /// Preprocess and classify synchronously.  Blocks on model loading and
    /// inference; call it from a blocking context.
    pub fn process(&self, image: &RawImage) -> PredictionResult {
        log::debug!("pipeline: preprocessing {}", image.describe());

        let buffer = match self.preprocessor.process(image) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::error!("pipeline: resize failed for {}: {e}", image.describe());
                return PredictionResult::Failure(FailureReason::Resize);
            }
        };

        match self.adapter.classify(&buffer) {
            Ok(label) => {
                log::debug!("pipeline: classified as {label:?}");
                PredictionResult::Success(label)
            }
            Err(e) => {
                log::error!("pipeline: analysis failed: {e}");
                PredictionResult::Failure(FailureReason::Analysis)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
