//! Scene classification — the inference adapter and its model backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   InferenceAdapter                      │
//! │                                                         │
//! │   ┌──────────────────┐        ┌──────────────────┐      │
//! │   │ ModelLoader      │ load() │ SceneModel       │      │
//! │   │ - Tract (fresh)  │───────▶│ - predict(&buf)  │      │
//! │   │ - Cached<L>      │        │ - ranking        │      │
//! │   └──────────────────┘        └────────┬─────────┘      │
//! │                                        ▼                │
//! │                          top-1 label → humanize_label   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scene_classifier::classifier::{CachedLoader, InferenceAdapter, TractModelLoader};
//! use scene_classifier::preprocess::{resize, RawImage, TargetSize};
//!
//! let loader = CachedLoader::new(TractModelLoader::new("models/resnet18-places365.onnx"));
//! let adapter = InferenceAdapter::new(Arc::new(loader));
//!
//! let photo = RawImage::open("beach.jpg").unwrap();
//! let buffer = resize(&photo, TargetSize::SCENE_MODEL).unwrap();
//! println!("{}", adapter.classify(&buffer).unwrap());
//! ```

pub mod engine;
pub mod label;
pub mod loader;
pub mod model;
pub mod tract;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{
    check_input, InferenceAdapter, InferenceError, ModelLoader, Prediction, Ranked, SceneModel,
};
pub use label::{humanize_label, load_labels, parse_label_line, parse_labels};
pub use loader::CachedLoader;
pub use model::{find_model_by_id, ChannelOrder, ModelInfo, ModelManifest, ModelPaths, SCENE_MODELS};
pub use tract::{TractModelLoader, TractSceneModel};

// test-only re-export so the pipeline tests can build adapters around mocks.
#[cfg(test)]
pub use engine::{MockLoader, MockModel};
#[cfg(test)]
pub(crate) use tract::write_channel_mean_model;
