//! [`PixelBuffer`] — the fixed-size model input produced by the preprocessor.

use serde::{Deserialize, Serialize};

use super::ResizeError;

// ---------------------------------------------------------------------------
// PixelFormat
// ---------------------------------------------------------------------------

/// Byte layout of a single pixel inside a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    /// 3 bytes per pixel, interleaved R, G, B.
    #[default]
    Rgb8,
    /// 4 bytes per pixel, interleaved B, G, R, A (32-bit BGRA).
    Bgra8,
}

impl PixelFormat {
    /// Number of bytes one pixel occupies.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Bgra8 => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// TargetSize
// ---------------------------------------------------------------------------

/// Width × height the preprocessor must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    /// 224 × 224, the input size of the bundled scene models.
    pub const SCENE_MODEL: TargetSize = TargetSize {
        width: 224,
        height: 224,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when both dimensions are positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::SCENE_MODEL
    }
}

impl std::fmt::Display for TargetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// PixelBuffer
// ---------------------------------------------------------------------------

/// A packed, row-major pixel buffer of fixed dimensions and format.
///
/// Rows are `stride` bytes apart; `stride` is always at least
/// `width * format.bytes_per_pixel()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Build a buffer from tightly packed rows.
    ///
    /// # Errors
    ///
    /// [`ResizeError::BufferConversion`] when `data.len()` does not equal
    /// `width * height * bytes_per_pixel` or a dimension is zero.
    pub fn from_packed(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, ResizeError> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::from_strided(width, height, format, stride, data)
    }

    /// Build a buffer whose rows may carry trailing padding bytes.
    pub fn from_strided(
        width: u32,
        height: u32,
        format: PixelFormat,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::BufferConversion(format!(
                "buffer dimensions must be positive, got {width}x{height}"
            )));
        }
        let row_bytes = width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(ResizeError::BufferConversion(format!(
                "stride {stride} is smaller than a {format:?} row of {row_bytes} bytes"
            )));
        }
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(ResizeError::BufferConversion(format!(
                "expected {expected} bytes for {width}x{height} {format:?}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            stride,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> TargetSize {
        TargetSize::new(self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes between the start of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw bytes, including any row padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Colour of pixel `(x, y)` as `[r, g, b]`, independent of the layout.
    ///
    /// Returns `None` when the coordinate lies outside the buffer.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * self.format.bytes_per_pixel();
        let px = &self.data[offset..offset + self.format.bytes_per_pixel()];
        Some(match self.format {
            PixelFormat::Rgb8 => [px[0], px[1], px[2]],
            PixelFormat::Bgra8 => [px[2], px[1], px[0]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_pixel() {
        assert_eq!(PixelFormat::Rgb8.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Bgra8.bytes_per_pixel(), 4);
    }

    #[test]
    fn target_size_validity() {
        assert!(TargetSize::SCENE_MODEL.is_valid());
        assert!(!TargetSize::new(0, 224).is_valid());
        assert!(!TargetSize::new(224, 0).is_valid());
        assert_eq!(TargetSize::default().to_string(), "224x224");
    }

    #[test]
    fn from_packed_rejects_wrong_length() {
        let err = PixelBuffer::from_packed(2, 2, PixelFormat::Rgb8, vec![0; 11]).unwrap_err();
        assert!(matches!(err, ResizeError::BufferConversion(_)));
    }

    #[test]
    fn from_packed_rejects_zero_dimension() {
        let err = PixelBuffer::from_packed(0, 2, PixelFormat::Rgb8, Vec::new()).unwrap_err();
        assert!(matches!(err, ResizeError::BufferConversion(_)));
    }

    #[test]
    fn strided_rows_are_addressed_correctly() {
        // 1x2 RGB with one padding byte per row.
        let data = vec![10, 20, 30, 0, 40, 50, 60, 0];
        let buf = PixelBuffer::from_strided(1, 2, PixelFormat::Rgb8, 4, data).unwrap();
        assert_eq!(buf.rgb_at(0, 0), Some([10, 20, 30]));
        assert_eq!(buf.rgb_at(0, 1), Some([40, 50, 60]));
        assert_eq!(buf.rgb_at(1, 0), None);
    }

    #[test]
    fn bgra_is_reported_as_rgb() {
        let buf = PixelBuffer::from_packed(1, 1, PixelFormat::Bgra8, vec![3, 2, 1, 255]).unwrap();
        assert_eq!(buf.rgb_at(0, 0), Some([1, 2, 3]));
    }
}
