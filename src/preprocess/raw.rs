//! [`RawImage`] — the image handed over by an image source.
//!
//! A source either delivers the encoded file bytes (the common case for a
//! photo picker) or an already decoded bitmap.  Decoding of encoded input is
//! deferred to the preprocessor so that a corrupt or empty file surfaces as a
//! [`ResizeError`](super::ResizeError) inside the pipeline run rather than at
//! selection time.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

/// Pixel payload of a [`RawImage`].
#[derive(Clone)]
pub enum RawPixels {
    /// Encoded file contents (JPEG, PNG, ...), decoded on demand.
    Encoded(Arc<[u8]>),
    /// An in-memory bitmap of arbitrary dimensions and colour type.
    Decoded(Arc<DynamicImage>),
}

/// Immutable image captured from an image source.
///
/// Cloning is cheap (`Arc` clone of the payload).
#[derive(Clone)]
pub struct RawImage {
    pixels: RawPixels,
    name: Option<String>,
}

impl RawImage {
    /// Wrap encoded bytes as read from disk or a picker.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            pixels: RawPixels::Encoded(Arc::from(bytes.into())),
            name: None,
        }
    }

    /// Wrap an already decoded bitmap.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            pixels: RawPixels::Decoded(Arc::new(image)),
            name: None,
        }
    }

    /// Read `path` into memory without decoding it.
    ///
    /// The file name is kept as the display name.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(Self::from_bytes(bytes).with_name_opt(name))
    }

    /// Attach a display name (usually the file name).
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_name_opt(Some(name.into()))
    }

    fn with_name_opt(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Display name, if the source provided one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Borrow the pixel payload.
    pub fn pixels(&self) -> &RawPixels {
        &self.pixels
    }

    /// Short description used in log lines.
    pub fn describe(&self) -> String {
        let name = self.name.as_deref().unwrap_or("<unnamed>");
        match &self.pixels {
            RawPixels::Encoded(bytes) => format!("{name} ({} bytes encoded)", bytes.len()),
            RawPixels::Decoded(img) => format!("{name} ({}x{} decoded)", img.width(), img.height()),
        }
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("image", &self.describe())
            .finish()
    }
}
