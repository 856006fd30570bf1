//! Scene classifier — pick a photo, get the scene it shows.
//!
//! ```text
//! ImageSource ──▶ Preprocessor ──▶ InferenceAdapter ──▶ PresentationStore ──▶ window
//!   (source)       (preprocess)      (classifier)         (pipeline)          (app)
//! ```

#[cfg(feature = "gui")]
pub mod app;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod preprocess;
pub mod source;
