//! Native photo picker built on `rfd::AsyncFileDialog`.

use std::path::PathBuf;

use async_trait::async_trait;
use rfd::AsyncFileDialog;

use crate::preprocess::RawImage;

use super::{ImageSource, IMAGE_EXTENSIONS};

/// Opens the platform file dialog filtered to image files.
///
/// Dismissing the dialog yields `None`.  The chosen file is read into memory
/// but not decoded.
#[derive(Debug, Clone, Default)]
pub struct DialogImageSource {
    start_dir: Option<PathBuf>,
}

impl DialogImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog in `dir` instead of the platform default.
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl ImageSource for DialogImageSource {
    async fn select(&self) -> Option<RawImage> {
        let mut dialog = AsyncFileDialog::new()
            .set_title("Choose photo")
            .add_filter("Images", IMAGE_EXTENSIONS);
        if let Some(dir) = &self.start_dir {
            dialog = dialog.set_directory(dir);
        }

        let handle = dialog.pick_file().await?;
        let name = handle.file_name();
        let bytes = handle.read().await;
        Some(RawImage::from_bytes(bytes).with_name(name))
    }
}
