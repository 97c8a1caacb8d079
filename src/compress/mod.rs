//! Lossy re-compression of already-encoded bytes.
//!
//! The dispatcher hands an intermediate encoding (truecolour PNG, baseline
//! JPEG at quality 100, lossless WEBP) to a [`Recompressor`] and writes
//! whatever comes back. [`NativeRecompressor`] is the production
//! implementation:
//!
//! | Format | Crate |
//! |---|---|
//! | PNG | `color_quant` (NeuQuant palette) + `png` (indexed encode) + `oxipng` |
//! | JPEG | `mozjpeg` |
//! | WEBP | `webp` (libwebp lossy) |

mod jpeg;
mod png_quant;
mod webp_lossy;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Could not read intermediate image: {0}")]
    Decode(String),
    #[error("Re-compression failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngOptions {
    /// Acceptable quality range `(min, max)`, both 0-100.
    pub quality: (u8, u8),
    /// 1 (slowest, best) to 11 (fastest).
    pub speed: u8,
    pub strip_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegOptions {
    pub quality: u8,
    pub progressive: bool,
    pub strip_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebpOptions {
    pub quality: u8,
    pub strip_metadata: bool,
}

/// Format-specific byte-to-byte compressors.
///
/// Shared by every transform in a batch, so implementations must be `Sync`.
pub trait Recompressor: Sync {
    fn png(&self, input: &[u8], options: &PngOptions) -> Result<Vec<u8>, CompressError>;

    fn jpeg(&self, input: &[u8], options: &JpegOptions) -> Result<Vec<u8>, CompressError>;

    fn webp(&self, input: &[u8], options: &WebpOptions) -> Result<Vec<u8>, CompressError>;
}

/// In-process re-compressors linked into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRecompressor;

impl Recompressor for NativeRecompressor {
    fn png(&self, input: &[u8], options: &PngOptions) -> Result<Vec<u8>, CompressError> {
        png_quant::recompress(input, options)
    }

    fn jpeg(&self, input: &[u8], options: &JpegOptions) -> Result<Vec<u8>, CompressError> {
        jpeg::recompress(input, options)
    }

    fn webp(&self, input: &[u8], options: &WebpOptions) -> Result<Vec<u8>, CompressError> {
        webp_lossy::recompress(input, options)
    }
}
