//! Resize + pixel-buffer conversion.
//!
//! [`Preprocessor::process`] decodes a [`RawImage`] (when it is still
//! encoded), scales it to exactly the target size using the configured
//! [`ResizeMode`] and [`FilterKind`], and packs the result into a
//! [`PixelBuffer`] of the requested [`PixelFormat`].  The operation is pure
//! and all-or-nothing.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::buffer::{PixelBuffer, PixelFormat, TargetSize};
use super::raw::{RawImage, RawPixels};
use super::ResizeError;

// ---------------------------------------------------------------------------
// ResizeMode / FilterKind
// ---------------------------------------------------------------------------

/// How the source aspect ratio is reconciled with the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResizeMode {
    /// Scale each axis independently to the target (aspect ratio not kept).
    #[default]
    Stretch,
    /// Scale to cover the target, then crop the centre.
    CenterCrop,
    /// Scale to fit inside the target, then pad with black.
    Letterbox,
}

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterKind {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<FilterKind> for FilterType {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Nearest => FilterType::Nearest,
            FilterKind::Triangle => FilterType::Triangle,
            FilterKind::CatmullRom => FilterType::CatmullRom,
            FilterKind::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

// ---------------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------------

/// Deterministic `RawImage → PixelBuffer` transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    pub target: TargetSize,
    pub mode: ResizeMode,
    pub filter: FilterKind,
    pub format: PixelFormat,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(TargetSize::SCENE_MODEL)
    }
}

impl Preprocessor {
    /// Preprocessor for `target` with the default policy
    /// (stretch, bilinear, RGB).
    pub fn new(target: TargetSize) -> Self {
        Self {
            target,
            mode: ResizeMode::default(),
            filter: FilterKind::default(),
            format: PixelFormat::default(),
        }
    }

    pub fn with_mode(mut self, mode: ResizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: FilterKind) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Produce the model input buffer for `image`.
    ///
    /// # Errors
    ///
    /// - [`ResizeError::InvalidTarget`] — a target dimension is zero.
    /// - [`ResizeError::EmptyInput`] — encoded input has no bytes.
    /// - [`ResizeError::Decode`] / [`ResizeError::Unsupported`] — the bytes
    ///   cannot be decoded.
    /// - [`ResizeError::ZeroArea`] — the decoded image has no pixels.
    /// - [`ResizeError::BufferConversion`] — packing into the buffer failed.
    pub fn process(&self, image: &RawImage) -> Result<PixelBuffer, ResizeError> {
        if !self.target.is_valid() {
            return Err(ResizeError::InvalidTarget {
                width: self.target.width,
                height: self.target.height,
            });
        }

        let decoded = decode(image)?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ResizeError::ZeroArea {
                width: decoded.width(),
                height: decoded.height(),
            });
        }

        let resized = self.scale(&decoded);
        if resized.width() != self.target.width || resized.height() != self.target.height {
            return Err(ResizeError::BufferConversion(format!(
                "resampler produced {}x{}, expected {}",
                resized.width(),
                resized.height(),
                self.target
            )));
        }

        let buffer = pack(&resized, self.format)?;
        log::debug!(
            "preprocess: {} -> {} {:?} ({:?}, {:?})",
            image.describe(),
            self.target,
            self.format,
            self.mode,
            self.filter
        );
        Ok(buffer)
    }

    fn scale(&self, image: &DynamicImage) -> DynamicImage {
        let TargetSize { width, height } = self.target;
        let filter: FilterType = self.filter.into();

        match self.mode {
            ResizeMode::Stretch => image.resize_exact(width, height, filter),
            ResizeMode::CenterCrop => image.resize_to_fill(width, height, filter),
            ResizeMode::Letterbox => {
                let scaled = image.resize(width, height, filter).to_rgba8();
                let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
                let x = (width - scaled.width().min(width)) / 2;
                let y = (height - scaled.height().min(height)) / 2;
                imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
                DynamicImage::ImageRgba8(canvas)
            }
        }
    }
}

/// Resize `image` to `target` with the default policy.
///
/// Shorthand for `Preprocessor::new(target).process(image)`.
pub fn resize(image: &RawImage, target: TargetSize) -> Result<PixelBuffer, ResizeError> {
    Preprocessor::new(target).process(image)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode(raw: &RawImage) -> Result<Cow<'_, DynamicImage>, ResizeError> {
    match raw.pixels() {
        RawPixels::Decoded(img) => Ok(Cow::Borrowed(&**img)),
        RawPixels::Encoded(bytes) => {
            if bytes.is_empty() {
                return Err(ResizeError::EmptyInput);
            }
            image::load_from_memory(bytes)
                .map(Cow::Owned)
                .map_err(|e| match e {
                    ImageError::Unsupported(u) => ResizeError::Unsupported(u.to_string()),
                    other => ResizeError::Decode(other.to_string()),
                })
        }
    }
}

fn pack(image: &DynamicImage, format: PixelFormat) -> Result<PixelBuffer, ResizeError> {
    let (width, height) = (image.width(), image.height());
    let data = match format {
        PixelFormat::Rgb8 => image.to_rgb8().into_raw(),
        PixelFormat::Bgra8 => {
            let mut raw = image.to_rgba8().into_raw();
            for px in raw.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            raw
        }
    };
    PixelBuffer::from_packed(width, height, format, data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
