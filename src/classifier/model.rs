//! Model registry, artifact manifests and path resolution.
//!
//! [`SCENE_MODELS`] lists the scene classifiers the application knows how to
//! run.  A model artifact on disk is an ONNX file plus two optional sidecars
//! next to it:
//!
//! ```text
//! models/
//!   resnet18-places365.onnx   ← network
//!   resnet18-places365.json   ← ModelManifest (input size, normalisation)
//!   resnet18-places365.txt    ← one class label per line
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AppPaths;
use crate::preprocess::TargetSize;

use super::InferenceError;

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a known scene model.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier used in `ModelConfig::id`.
    pub id: &'static str,
    /// Human-readable name shown in the UI.
    pub display_name: &'static str,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Input resolution the network was trained at.
    pub input_size: TargetSize,
    /// Number of output classes.
    pub classes: usize,
    /// Training dataset.
    pub dataset: &'static str,
}

/// Scene models trained on the MIT Places datasets.
pub const SCENE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "resnet18-places365",
        display_name: "ResNet-18 Places365 [Recommended]",
        file_name: "resnet18-places365.onnx",
        input_size: TargetSize::SCENE_MODEL,
        classes: 365,
        dataset: "Places365",
    },
    ModelInfo {
        id: "googlenet-places365",
        display_name: "GoogLeNet Places365",
        file_name: "googlenet-places365.onnx",
        input_size: TargetSize::SCENE_MODEL,
        classes: 365,
        dataset: "Places365",
    },
    ModelInfo {
        id: "googlenet-places205",
        display_name: "GoogLeNet Places205",
        file_name: "googlenet-places205.onnx",
        input_size: TargetSize::SCENE_MODEL,
        classes: 205,
        dataset: "Places205",
    },
];

/// Find a [`ModelInfo`] by its `id`.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    SCENE_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves on-disk model locations.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory holding the `.onnx` files and their sidecars.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the ONNX file for `model`.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Path for an id, whether or not it is in [`SCENE_MODELS`].
    ///
    /// Unknown ids resolve to `<models_dir>/<id>.onnx`.
    pub fn path_for_id(&self, id: &str) -> PathBuf {
        match find_model_by_id(id) {
            Some(model) => self.model_path(model),
            None => self.models_dir.join(format!("{id}.onnx")),
        }
    }

    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// Registered models present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        SCENE_MODELS
            .iter()
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ModelManifest
// ---------------------------------------------------------------------------

/// Channel order the network expects in its input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    /// Caffe-converted networks.
    Bgr,
}

/// Input contract of a model artifact, read from the `.json` sidecar.
///
/// Every tensor value is computed as `(byte * scale - mean[c]) / std[c]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelManifest {
    pub input_width: u32,
    pub input_height: u32,
    pub channel_order: ChannelOrder,
    pub scale: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Labels file relative to the model's directory.  Defaults to the
    /// model file name with a `.txt` extension.
    pub labels_file: Option<String>,
    /// Convert raw scores to probabilities before ranking.
    pub apply_softmax: bool,
}

impl Default for ModelManifest {
    /// ImageNet-style normalisation at 224×224, the convention of the
    /// PyTorch Places365 releases.
    fn default() -> Self {
        Self {
            input_width: 224,
            input_height: 224,
            channel_order: ChannelOrder::Rgb,
            scale: 1.0 / 255.0,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            labels_file: None,
            apply_softmax: true,
        }
    }
}

impl ModelManifest {
    /// Load the sidecar manifest for `model_path`, or the default when none
    /// exists.
    pub fn load_for(model_path: &Path) -> Result<Self, InferenceError> {
        let sidecar = model_path.with_extension("json");
        if !sidecar.exists() {
            log::debug!(
                "classifier: no manifest at {}, using defaults",
                sidecar.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&sidecar)
            .map_err(|e| InferenceError::ModelLoad(format!("{}: {e}", sidecar.display())))?;
        let manifest: Self = serde_json::from_str(&content)
            .map_err(|e| InferenceError::ModelLoad(format!("{}: {e}", sidecar.display())))?;
        if manifest.input_width == 0 || manifest.input_height == 0 {
            return Err(InferenceError::ModelLoad(format!(
                "{}: input size must be positive",
                sidecar.display()
            )));
        }
        if manifest.std.iter().any(|s| *s == 0.0) {
            return Err(InferenceError::ModelLoad(format!(
                "{}: std must be non-zero",
                sidecar.display()
            )));
        }
        Ok(manifest)
    }

    pub fn input_size(&self) -> TargetSize {
        TargetSize::new(self.input_width, self.input_height)
    }

    /// Where the class labels for `model_path` live.
    pub fn labels_path(&self, model_path: &Path) -> PathBuf {
        match &self.labels_file {
            Some(file) => model_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(file),
            None => model_path.with_extension("txt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
