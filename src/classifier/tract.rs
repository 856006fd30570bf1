//! ONNX backend built on `tract-onnx`.
//!
//! [`TractModelLoader`] reads the artifact (network + manifest + labels) from
//! the local filesystem and produces a [`TractSceneModel`].  Each `load` call
//! parses and optimises the network again; wrap the loader in
//! [`CachedLoader`](super::CachedLoader) to keep one instance around.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tract_onnx::prelude::*;

use crate::preprocess::{PixelBuffer, TargetSize};

use super::engine::{check_input, InferenceError, ModelLoader, Prediction, SceneModel};
use super::label::load_labels;
use super::model::{ChannelOrder, ModelManifest};

type ScenePlan = TypedRunnableModel<TypedModel>;

// ---------------------------------------------------------------------------
// TractSceneModel
// ---------------------------------------------------------------------------

/// A scene network optimised and ready to run.
///
/// The plan is immutable after loading; every `predict` call allocates its
/// own tensors, so the model can be shared across threads.
pub struct TractSceneModel {
    plan: ScenePlan,
    manifest: ModelManifest,
    labels: Vec<String>,
}

impl std::fmt::Debug for TractSceneModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TractSceneModel")
            .field("manifest", &self.manifest)
            .field("labels", &self.labels.len())
            .finish_non_exhaustive()
    }
}

impl TractSceneModel {
    /// Class names in output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl SceneModel for TractSceneModel {
    fn input_size(&self) -> TargetSize {
        self.manifest.input_size()
    }

    fn predict(&self, input: &PixelBuffer) -> Result<Prediction, InferenceError> {
        check_input(self.manifest.input_size(), input)?;

        let (h, w) = (input.height() as usize, input.width() as usize);
        let data = buffer_to_nchw(input, &self.manifest);
        let tensor = Tensor::from_shape::<f32>(&[1, 3, h, w], &data)
            .map_err(|e| InferenceError::Prediction(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into_tvalue()))
            .map_err(|e| InferenceError::Prediction(e.to_string()))?;

        let first = outputs.first().ok_or(InferenceError::EmptyOutput)?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Prediction(e.to_string()))?;

        let mut scores: Vec<f32> = view.iter().copied().collect();
        if self.manifest.apply_softmax {
            softmax(&mut scores);
        }

        Prediction::from_scores(&scores, &self.labels)
    }
}

// ---------------------------------------------------------------------------
// TractModelLoader
// ---------------------------------------------------------------------------

/// Loads an ONNX scene model from disk on every call.
#[derive(Debug, Clone)]
pub struct TractModelLoader {
    model_path: PathBuf,
}

impl TractModelLoader {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Parse, type and optimise the network, then read its labels.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::ModelNotFound`] — the `.onnx` file is missing.
    /// - [`InferenceError::ModelLoad`]     — tract rejected the file or the
    ///   manifest is invalid.
    /// - [`InferenceError::Labels`]        — the labels file is unusable.
    pub fn load_model(&self) -> Result<TractSceneModel, InferenceError> {
        let path = self.model_path.as_path();
        if !path.exists() {
            return Err(InferenceError::ModelNotFound(path.display().to_string()));
        }

        let manifest = ModelManifest::load_for(path)?;
        let labels = load_labels(&manifest.labels_path(path))?;

        let started = Instant::now();
        let shape = [
            1,
            3,
            manifest.input_height as usize,
            manifest.input_width as usize,
        ];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoad(format!("{}: {e}", path.display())))?;

        log::info!(
            "classifier: loaded {} ({} classes) in {} ms",
            path.display(),
            labels.len(),
            started.elapsed().as_millis()
        );

        Ok(TractSceneModel {
            plan,
            manifest,
            labels,
        })
    }
}

impl ModelLoader for TractModelLoader {
    fn load(&self) -> Result<Arc<dyn SceneModel>, InferenceError> {
        Ok(Arc::new(self.load_model()?))
    }
}

// ---------------------------------------------------------------------------
// Tensor helpers
// ---------------------------------------------------------------------------

/// Convert `buffer` into a planar `[3, H, W]` float vector normalised per
/// `manifest`.
pub fn buffer_to_nchw(buffer: &PixelBuffer, manifest: &ModelManifest) -> Vec<f32> {
    let (w, h) = (buffer.width(), buffer.height());
    let plane = w as usize * h as usize;
    let mut out = vec![0.0f32; 3 * plane];

    for y in 0..h {
        for x in 0..w {
            let Some(rgb) = buffer.rgb_at(x, y) else {
                continue;
            };
            let px = match manifest.channel_order {
                ChannelOrder::Rgb => rgb,
                ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
            };
            let idx = y as usize * w as usize + x as usize;
            for c in 0..3 {
                out[c * plane + idx] =
                    (f32::from(px[c]) * manifest.scale - manifest.mean[c]) / manifest.std[c];
            }
        }
    }

    out
}

/// In-place numerically stable softmax.
pub fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    if sum > 0.0 {
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixture
// ---------------------------------------------------------------------------

/// Write a three-class network to `dir/<name>.onnx` whose scores are the mean
/// of each input channel (GlobalAveragePool → Flatten), plus its labels file.
///
/// With the default manifest a solid red photo ranks class 0 first, green
/// class 1 and blue class 2.
#[cfg(test)]
pub(crate) fn write_channel_mean_model(dir: &Path, name: &str, labels: &str) -> PathBuf {
    use prost::Message;
    use tract_onnx::pb;

    fn tensor_info(name: &str, dims: &[i64]) -> pb::ValueInfoProto {
        let dim = dims
            .iter()
            .map(|d| pb::tensor_shape_proto::Dimension {
                value: Some(pb::tensor_shape_proto::dimension::Value::DimValue(*d)),
                ..Default::default()
            })
            .collect();
        pb::ValueInfoProto {
            name: name.to_string(),
            r#type: Some(pb::TypeProto {
                value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                    elem_type: pb::tensor_proto::DataType::Float as i32,
                    shape: Some(pb::TensorShapeProto { dim }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn node(op: &str, input: &str, output: &str) -> pb::NodeProto {
        pb::NodeProto {
            input: vec![input.to_string()],
            output: vec![output.to_string()],
            name: output.to_string(),
            op_type: op.to_string(),
            ..Default::default()
        }
    }

    let model = pb::ModelProto {
        ir_version: 7,
        opset_import: vec![pb::OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        producer_name: "scene-classifier-tests".to_string(),
        graph: Some(pb::GraphProto {
            name: "channel_mean".to_string(),
            node: vec![
                node("GlobalAveragePool", "input", "pooled"),
                node("Flatten", "pooled", "scores"),
            ],
            input: vec![tensor_info("input", &[1, 3, 224, 224])],
            output: vec![tensor_info("scores", &[1, 3])],
            ..Default::default()
        }),
        ..Default::default()
    };

    let path = dir.join(format!("{name}.onnx"));
    std::fs::write(&path, model.encode_to_vec()).expect("write model");
    std::fs::write(path.with_extension("txt"), labels).expect("write labels");
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
