//! Inference adapter, model traits and prediction types.
//!
//! # Overview
//!
//! [`SceneModel`] is a loaded, ready-to-run network.  It is object-safe and
//! `Send + Sync`; `predict` takes `&self` so one instance can serve
//! overlapping pipeline runs without locking.
//!
//! [`ModelLoader`] produces models.  The adapter receives it as an explicit
//! constructor argument, so tests inject a mock and the binary chooses
//! between loading per call ([`TractModelLoader`](super::TractModelLoader))
//! and reusing the first load ([`CachedLoader`](super::CachedLoader)).
//!
//! [`InferenceAdapter::classify`] is the operation the pipeline calls:
//! load → predict → top-1 → [`humanize_label`].
//!
//! `MockModel` / `MockLoader` (available under `#[cfg(test)]`) are test
//! doubles that never touch the filesystem.

use std::sync::Arc;

use thiserror::Error;

use crate::preprocess::{PixelBuffer, TargetSize};

use super::label::humanize_label;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

/// All errors that can arise while loading a model or running it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    /// The model artifact does not exist at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The artifact exists but could not be parsed or optimised.
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// The labels file is missing, empty, or disagrees with the model.
    #[error("Labels error: {0}")]
    Labels(String),

    /// The pixel buffer does not match the model's input contract.
    #[error("Input mismatch: model expects {expected}, got {actual}")]
    InputMismatch { expected: String, actual: String },

    /// The forward pass failed.
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The model produced no scores.
    #[error("Model returned no predictions")]
    EmptyOutput,
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// One class with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// Raw class name as it appears in the labels file.
    pub label: String,
    pub score: f32,
}

/// Model output: every class ranked by descending score.
///
/// Ties keep label-file order, so ranking is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub ranking: Vec<Ranked>,
}

impl Prediction {
    /// Pair `scores[i]` with `labels[i]` and rank them.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::EmptyOutput`] — `scores` is empty.
    /// - [`InferenceError::Labels`] — lengths differ.
    pub fn from_scores(scores: &[f32], labels: &[String]) -> Result<Self, InferenceError> {
        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        if scores.len() != labels.len() {
            return Err(InferenceError::Labels(format!(
                "model produced {} scores but {} labels are loaded",
                scores.len(),
                labels.len()
            )));
        }

        let mut ranking: Vec<Ranked> = labels
            .iter()
            .zip(scores)
            .map(|(label, &score)| Ranked {
                label: label.clone(),
                score,
            })
            .collect();
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(Self { ranking })
    }

    /// Highest-scoring class.
    pub fn top(&self) -> Option<&Ranked> {
        self.ranking.first()
    }

    /// Raw top-1 class name.
    pub fn label(&self) -> Option<&str> {
        self.top().map(|r| r.label.as_str())
    }

    /// Score of the top-1 class.
    pub fn confidence(&self) -> Option<f32> {
        self.top().map(|r| r.score)
    }

    /// The `k` best classes.
    pub fn top_k(&self, k: usize) -> &[Ranked] {
        &self.ranking[..k.min(self.ranking.len())]
    }
}

// ---------------------------------------------------------------------------
// SceneModel / ModelLoader traits
// ---------------------------------------------------------------------------

/// A loaded classification network.
///
/// # Contract
///
/// - `input` must match [`SceneModel::input_size`]; implementations report a
///   mismatch as [`InferenceError::InputMismatch`].
/// - `predict` must not mutate shared state: a cached instance is called from
///   several threads at once.
pub trait SceneModel: Send + Sync {
    /// Resolution the network accepts.
    fn input_size(&self) -> TargetSize;

    /// Run the network on `input`.
    fn predict(&self, input: &PixelBuffer) -> Result<Prediction, InferenceError>;
}

/// Factory for [`SceneModel`]s.
pub trait ModelLoader: Send + Sync {
    /// Load (or hand out an already loaded) model.
    fn load(&self) -> Result<Arc<dyn SceneModel>, InferenceError>;
}

// Compile-time assertion: both traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SceneModel>, _: Box<dyn ModelLoader>) {}
};

/// Check `input` against a model's expected resolution.
pub fn check_input(expected: TargetSize, input: &PixelBuffer) -> Result<(), InferenceError> {
    if input.size() != expected {
        return Err(InferenceError::InputMismatch {
            expected: expected.to_string(),
            actual: input.size().to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// InferenceAdapter
// ---------------------------------------------------------------------------

/// Maps a [`PixelBuffer`] to a display-ready scene label.
#[derive(Clone)]
pub struct InferenceAdapter {
    loader: Arc<dyn ModelLoader>,
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter").finish_non_exhaustive()
    }
}

impl InferenceAdapter {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }

    /// Classify `buffer` and return the humanised top-1 label.
    ///
    /// Load and prediction failures are logged here; the caller only needs
    /// to know that analysis failed.
    pub fn classify(&self, buffer: &PixelBuffer) -> Result<String, InferenceError> {
        let model = self
            .loader
            .load()
            .inspect_err(|e| log::error!("classifier: model unavailable: {e}"))?;

        let prediction = model
            .predict(buffer)
            .inspect_err(|e| log::error!("classifier: prediction failed: {e}"))?;

        let top = prediction.top().ok_or(InferenceError::EmptyOutput)?;
        log::debug!(
            "classifier: top-1 = {:?} ({:.3})",
            top.label,
            top.score
        );

        Ok(humanize_label(&top.label))
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
type PredictFn = dyn Fn(&PixelBuffer) -> Result<Prediction, InferenceError> + Send + Sync;

/// A model whose behaviour is a closure over the input buffer.
#[cfg(test)]
pub struct MockModel {
    input_size: TargetSize,
    predict: Box<PredictFn>,
}

#[cfg(test)]
impl MockModel {
    pub fn new(
        predict: impl Fn(&PixelBuffer) -> Result<Prediction, InferenceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            input_size: TargetSize::SCENE_MODEL,
            predict: Box::new(predict),
        }
    }

    /// Always ranks `label` first.
    pub fn fixed(label: &str) -> Self {
        let labels = vec![label.to_string(), "other".to_string()];
        Self::new(move |_| Prediction::from_scores(&[0.9, 0.1], &labels))
    }

    /// Always fails with `error`.
    pub fn failing(error: InferenceError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }
}

#[cfg(test)]
impl SceneModel for MockModel {
    fn input_size(&self) -> TargetSize {
        self.input_size
    }

    fn predict(&self, input: &PixelBuffer) -> Result<Prediction, InferenceError> {
        // Enforce the input contract so callers are tested against it.
        check_input(self.input_size, input)?;
        (self.predict)(input)
    }
}

/// Loader that hands out a shared mock model and counts calls.
#[cfg(test)]
pub struct MockLoader {
    model: Result<Arc<dyn SceneModel>, InferenceError>,
    loads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockLoader {
    pub fn new(model: impl SceneModel + 'static) -> Self {
        Self {
            model: Ok(Arc::new(model)),
            loads: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(error: InferenceError) -> Self {
        Self {
            model: Err(error),
            loads: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ModelLoader for MockLoader {
    fn load(&self) -> Result<Arc<dyn SceneModel>, InferenceError> {
        self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.model.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::PixelFormat;

    fn gray_buffer(size: TargetSize) -> PixelBuffer {
        let len = (size.width * size.height) as usize * 3;
        PixelBuffer::from_packed(size.width, size.height, PixelFormat::Rgb8, vec![128; len])
            .unwrap()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // --- Prediction ---

    #[test]
    fn from_scores_ranks_descending() {
        let p = Prediction::from_scores(&[0.1, 0.7, 0.2], &labels(&["a", "b", "c"])).unwrap();
        let order: Vec<_> = p.ranking.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(p.top().unwrap().label, "b");
        assert_eq!(p.label(), Some("b"));
        assert_eq!(p.confidence(), Some(0.7));
        assert_eq!(p.top_k(2).len(), 2);
        assert_eq!(p.top_k(10).len(), 3);
    }

    #[test]
    fn from_scores_ties_keep_file_order() {
        let p = Prediction::from_scores(&[0.5, 0.5, 0.5], &labels(&["x", "y", "z"])).unwrap();
        assert_eq!(p.top().unwrap().label, "x");
    }

    #[test]
    fn from_scores_rejects_empty_and_mismatch() {
        assert_eq!(
            Prediction::from_scores(&[], &[]),
            Err(InferenceError::EmptyOutput)
        );
        assert!(matches!(
            Prediction::from_scores(&[0.1, 0.2], &labels(&["only"])),
            Err(InferenceError::Labels(_))
        ));
    }

    // --- check_input ---

    #[test]
    fn check_input_rejects_wrong_size() {
        let err = check_input(TargetSize::SCENE_MODEL, &gray_buffer(TargetSize::new(10, 10)))
            .unwrap_err();
        assert!(matches!(err, InferenceError::InputMismatch { .. }));
        assert!(err.to_string().contains("224x224"));
    }

    // --- InferenceAdapter ---

    #[test]
    fn classify_humanises_top_label() {
        let adapter = InferenceAdapter::new(Arc::new(MockLoader::new(MockModel::fixed(
            "ice_skating_rink",
        ))));
        let label = adapter.classify(&gray_buffer(TargetSize::SCENE_MODEL)).unwrap();
        assert_eq!(label, "ice skating rink");
    }

    #[test]
    fn classify_is_deterministic() {
        let names = labels(&["coast", "forest_road", "desert_sand"]);
        let model = MockModel::new(move |buf| {
            let [r, g, b] = buf.rgb_at(0, 0).unwrap_or_default();
            Prediction::from_scores(&[r as f32, g as f32, b as f32], &names)
        });
        let adapter = InferenceAdapter::new(Arc::new(MockLoader::new(model)));
        let buffer = gray_buffer(TargetSize::SCENE_MODEL);

        let first = adapter.classify(&buffer).unwrap();
        for _ in 0..5 {
            assert_eq!(adapter.classify(&buffer).unwrap(), first);
        }
    }

    #[test]
    fn classify_surfaces_load_failure() {
        let adapter = InferenceAdapter::new(Arc::new(MockLoader::failing(
            InferenceError::ModelNotFound("/models/x.onnx".into()),
        )));
        let err = adapter.classify(&gray_buffer(TargetSize::SCENE_MODEL)).unwrap_err();
        assert!(matches!(err, InferenceError::ModelNotFound(_)));
    }

    #[test]
    fn classify_surfaces_prediction_failure() {
        let adapter = InferenceAdapter::new(Arc::new(MockLoader::new(MockModel::failing(
            InferenceError::Prediction("nan".into()),
        ))));
        let err = adapter.classify(&gray_buffer(TargetSize::SCENE_MODEL)).unwrap_err();
        assert_eq!(err, InferenceError::Prediction("nan".into()));
    }

    #[test]
    fn classify_wrong_buffer_size_is_input_mismatch() {
        let adapter =
            InferenceAdapter::new(Arc::new(MockLoader::new(MockModel::fixed("beach"))));
        let err = adapter.classify(&gray_buffer(TargetSize::new(64, 64))).unwrap_err();
        assert!(matches!(err, InferenceError::InputMismatch { .. }));
    }

    #[test]
    fn box_dyn_traits_compile() {
        let model: Box<dyn SceneModel> = Box::new(MockModel::fixed("ok"));
        assert_eq!(model.input_size(), TargetSize::SCENE_MODEL);
        let loader: Box<dyn ModelLoader> = Box::new(MockLoader::new(MockModel::fixed("ok")));
        assert!(loader.load().is_ok());
    }
}
