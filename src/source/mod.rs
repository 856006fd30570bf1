//! Image sources — where photos come from.
//!
//! An [`ImageSource`] asks for one photo and yields `Some(RawImage)` or
//! `None` when the user dismissed the picker.  `None` is not an error: no
//! command is sent and the presentation state stays as it was.
//!
//! | Source                 | Feature | Notes                              |
//! |------------------------|---------|------------------------------------|
//! | [`FileImageSource`]    | —       | fixed path, for tooling and tests  |
//! | `DialogImageSource`    | `gui`   | native file dialog via `rfd`       |

#[cfg(feature = "gui")]
pub mod dialog;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::pipeline::PipelineCommand;
use crate::preprocess::RawImage;

#[cfg(feature = "gui")]
pub use dialog::DialogImageSource;

/// File extensions offered by pickers.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Errors reading a photo from its source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command channel is closed; the pipeline has shut down.
    #[error("pipeline is not running")]
    PipelineClosed,
}

// ---------------------------------------------------------------------------
// ImageSource trait
// ---------------------------------------------------------------------------

/// Async provider of one photo per call.
///
/// Implementors must be `Send + Sync` so they can be shared with the tokio
/// task that awaits the picker.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Ask for a photo.  `None` means the selection was cancelled.
    async fn select(&self) -> Option<RawImage>;
}

/// Run one selection on `source` and forward it to the pipeline.
///
/// Returns `Ok(false)` when the selection was cancelled and nothing was sent.
pub async fn forward_selection(
    source: &dyn ImageSource,
    commands: &mpsc::Sender<PipelineCommand>,
) -> Result<bool, SourceError> {
    let Some(image) = source.select().await else {
        log::debug!("source: selection cancelled");
        return Ok(false);
    };

    log::info!("source: selected {}", image.describe());
    commands
        .send(PipelineCommand::ImageSelected(image))
        .await
        .map_err(|_| SourceError::PipelineClosed)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// FileImageSource
// ---------------------------------------------------------------------------

/// Always yields the file at a fixed path.
///
/// A missing or unreadable file is logged and treated like a cancelled
/// selection.  An empty file is still yielded; the preprocessor rejects it.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file without decoding it.
    pub async fn read(&self) -> Result<RawImage, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Read {
                path: self.path.clone(),
                source,
            })?;

        let image = RawImage::from_bytes(bytes);
        Ok(match self.path.file_name() {
            Some(name) => image.with_name(name.to_string_lossy()),
            None => image,
        })
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn select(&self) -> Option<RawImage> {
        self.read()
            .await
            .inspect_err(|e| log::warn!("source: {e}"))
            .ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{InferenceAdapter, MockLoader, MockModel};
    use crate::pipeline::{Pipeline, PresentationState, PresentationStore};
    use crate::preprocess::{Preprocessor, RawPixels, TargetSize};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// A picker the user always dismisses.
    struct CancelledSource;

    #[async_trait]
    impl ImageSource for CancelledSource {
        async fn select(&self) -> Option<RawImage> {
            None
        }
    }

    #[tokio::test]
    async fn file_source_reads_bytes_and_name() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("kitchen.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = FileImageSource::new(&path).select().await.expect("image");
        assert_eq!(image.name(), Some("kitchen.png"));
        match image.pixels() {
            RawPixels::Encoded(bytes) => assert_eq!(bytes.len(), 4),
            RawPixels::Decoded(_) => panic!("file source must not decode"),
        }
    }

    #[tokio::test]
    async fn empty_file_is_still_selected() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        assert!(FileImageSource::new(&path).select().await.is_some());
    }

    #[tokio::test]
    async fn missing_file_reads_as_error_and_selects_none() {
        let dir = tempdir().expect("temp dir");
        let source = FileImageSource::new(dir.path().join("gone.jpg"));

        assert!(matches!(source.read().await, Err(SourceError::Read { .. })));
        assert!(source.select().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_selection_leaves_state_untouched() {
        let pipeline = Pipeline::new(
            PresentationStore::default(),
            Preprocessor::new(TargetSize::SCENE_MODEL),
            InferenceAdapter::new(Arc::new(MockLoader::new(MockModel::fixed("beach")))),
        );
        let store = pipeline.store().clone();
        let (tx, rx) = mpsc::channel(4);
        let runner = tokio::spawn(pipeline.run(rx));

        let sent = forward_selection(&CancelledSource, &tx).await.unwrap();
        drop(tx);
        runner.await.unwrap();

        assert!(!sent);
        assert_eq!(store.current_state(), PresentationState::Idle);
    }

    #[tokio::test]
    async fn selection_is_forwarded_as_command() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("field.jpg");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let sent = forward_selection(&FileImageSource::new(&path), &tx)
            .await
            .unwrap();

        assert!(sent);
        let PipelineCommand::ImageSelected(image) = rx.recv().await.expect("command");
        assert_eq!(image.name(), Some("field.jpg"));
    }

    #[tokio::test]
    async fn closed_pipeline_is_reported() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("field.jpg");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = forward_selection(&FileImageSource::new(&path), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::PipelineClosed));
    }
}
