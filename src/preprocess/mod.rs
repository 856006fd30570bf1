//! Preprocessing — raw photo → fixed-size model input.
//!
//! # Pipeline
//!
//! ```text
//! RawImage (encoded bytes | decoded bitmap)
//!     └─▶ decode (image crate, format sniffed from content)
//!           └─▶ scale to TargetSize (Stretch | CenterCrop | Letterbox)
//!                 └─▶ pack into PixelBuffer (Rgb8 | Bgra8)
//! ```
//!
//! # Quick start
//!
//! ```
//! use image::DynamicImage;
//! use scene_classifier::preprocess::{resize, RawImage, TargetSize};
//!
//! let photo = RawImage::from_image(DynamicImage::new_rgb8(500, 500));
//! let buffer = resize(&photo, TargetSize::SCENE_MODEL).unwrap();
//! assert_eq!((buffer.width(), buffer.height()), (224, 224));
//! ```

pub mod buffer;
pub mod raw;
pub mod resize;

use thiserror::Error;

pub use buffer::{PixelBuffer, PixelFormat, TargetSize};
pub use raw::{RawImage, RawPixels};
pub use resize::{resize, FilterKind, Preprocessor, ResizeMode};

// ---------------------------------------------------------------------------
// ResizeError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while turning a [`RawImage`] into a
/// [`PixelBuffer`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResizeError {
    /// The image source delivered zero bytes.
    #[error("image data is empty")]
    EmptyInput,

    /// The bytes are corrupt or not an image.
    #[error("image could not be decoded: {0}")]
    Decode(String),

    /// The format or colour type is not supported by the decoder.
    #[error("unsupported image: {0}")]
    Unsupported(String),

    /// The decoded bitmap has no pixels.
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },

    /// The requested target size is not positive in both dimensions.
    #[error("invalid target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    /// The resized bitmap could not be packed into the buffer layout.
    #[error("pixel buffer conversion failed: {0}")]
    BufferConversion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_error_display() {
        let e = ResizeError::ZeroArea {
            width: 0,
            height: 5,
        };
        assert!(e.to_string().contains("0x5"));
        assert!(ResizeError::Decode("bad header".into())
            .to_string()
            .contains("bad header"));
    }
}
