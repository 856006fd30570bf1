//! Pipeline orchestration and the presentation state the window renders.
//!
//! # Architecture
//!
//! ```text
//! PipelineCommand (mpsc)
//!        │
//!        ▼
//! Pipeline::run()  ← async tokio task
//!        │
//!        └─ ImageSelected(raw)
//!              │
//!              ├─ store.begin_run()                      → Analyzing
//!              ├─ spawn_blocking(Preprocessor::process)
//!              ├─         └─ InferenceAdapter::classify
//!              └─ store.finish(token, result)            → Done
//!
//! PresentationStore (Arc<Mutex<…>>) ←─── read by egui update() each frame
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use scene_classifier::config::{AppConfig, AppPaths};
//! use scene_classifier::pipeline::{Pipeline, PipelineCommand};
//! use scene_classifier::preprocess::RawImage;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let pipeline = Pipeline::from_config(&config, &AppPaths::new());
//!     let store = pipeline.store().clone();
//!     store.subscribe(|state| println!("{}", state.display_text()));
//!
//!     let (tx, rx) = mpsc::channel(16);
//!     let runner = tokio::spawn(pipeline.run(rx));
//!
//!     let photo = RawImage::open("kitchen.jpg").unwrap();
//!     tx.send(PipelineCommand::ImageSelected(photo)).await.unwrap();
//!     drop(tx);
//!     runner.await.unwrap();
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Pipeline, PipelineCommand};
pub use state::{
    FailureReason, PredictionResult, PresentationState, PresentationStore, RunToken,
    StaleRunPolicy, Subscription,
};
