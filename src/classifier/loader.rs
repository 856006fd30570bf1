//! Model caching policy.

use std::sync::{Arc, Mutex, PoisonError};

use super::engine::{InferenceError, ModelLoader, SceneModel};

/// Wraps a [`ModelLoader`] and keeps the first successfully loaded model.
///
/// Concurrent first calls are serialised so the artifact is read once.
/// Failures are not cached: the next call retries the inner loader.
pub struct CachedLoader<L> {
    inner: L,
    cached: Mutex<Option<Arc<dyn SceneModel>>>,
}

impl<L: ModelLoader> CachedLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }

    /// `true` once a model has been loaded and kept.
    pub fn is_loaded(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the cached model; the next `load` reads the artifact again.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<L: ModelLoader> ModelLoader for CachedLoader<L> {
    fn load(&self) -> Result<Arc<dyn SceneModel>, InferenceError> {
        let mut slot = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = self.inner.load()?;
        *slot = Some(Arc::clone(&model));
        log::debug!("classifier: model cached for reuse");
        Ok(model)
    }
}
