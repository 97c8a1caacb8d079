//! Lazy decode handle.
//!
//! A [`Pipeline`] owns the decoded source pixels behind an `Arc` plus a queue
//! of [`Operation`]s and at most one staged [`EncodeDirective`]. Cloning is
//! cheap: the pixels are shared read-only, the queue is copied. Nothing is
//! computed until [`Pipeline::to_buffer`] or [`Pipeline::to_file`] replays
//! the queue against a private copy of the pixels.

use super::calculations::PngCompression;
use super::operations;
use super::params::{CropFocus, Fit, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageReader};
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid colour: {0:?}")]
    InvalidColor(String),
    #[error("Requested size {width}x{height} exceeds {max}px per edge")]
    InvalidDimensions { width: u32, height: u32, max: u32 },
    #[error("No output encoding staged")]
    NothingStaged,
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// A queued pixel operation, replayed in order at materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Apply the source's EXIF orientation.
    AutoOrient,
    Resize {
        width: Option<u32>,
        height: Option<u32>,
        fit: Fit,
        focus: CropFocus,
        background: Option<String>,
    },
    Grayscale,
    /// Clockwise rotation; uncovered corners are filled with `background`.
    Rotate {
        degrees: i32,
        background: Option<String>,
    },
    Duotone {
        shadow: String,
        highlight: String,
        opacity: Option<u8>,
        keep_alpha: bool,
    },
}

/// The single encoding a pipeline materializes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeDirective {
    Png { compression: PngCompression },
    Jpeg { quality: Quality, progressive: bool },
    /// Lossless; lossy WEBP is the re-compressor's job.
    Webp,
    Tiff,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    source: Arc<DynamicImage>,
    orientation: Orientation,
    icc_profile: Option<Arc<Vec<u8>>>,
    operations: Vec<Operation>,
    directive: Option<EncodeDirective>,
    keep_metadata: bool,
}

impl Pipeline {
    /// Decode `path`, capturing its EXIF orientation and ICC profile.
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let icc_profile = decoder.icc_profile().ok().flatten();
        let image =
            DynamicImage::from_decoder(decoder).map_err(|e| PipelineError::Decode(e.to_string()))?;

        Ok(Self {
            source: Arc::new(image),
            orientation,
            icc_profile: icc_profile.map(Arc::new),
            operations: Vec::new(),
            directive: None,
            keep_metadata: true,
        })
    }

    /// Wrap already-decoded pixels, with no orientation or profile.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            source: Arc::new(image),
            orientation: Orientation::NoTransforms,
            icc_profile: None,
            operations: Vec::new(),
            directive: None,
            keep_metadata: true,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn directive(&self) -> Option<EncodeDirective> {
        self.directive
    }

    pub fn push(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Stage the output encoding, replacing any earlier one.
    pub fn stage(mut self, directive: EncodeDirective) -> Self {
        self.directive = Some(directive);
        self
    }

    /// Whether the encoded output embeds the source ICC profile.
    pub fn keep_metadata(mut self, keep: bool) -> Self {
        self.keep_metadata = keep;
        self
    }

    /// Replay the queued operations on a private copy of the source.
    pub fn materialize(&self) -> Result<DynamicImage, PipelineError> {
        let mut image = (*self.source).clone();
        for op in &self.operations {
            image = operations::apply(image, op, self.orientation)?;
        }
        Ok(image)
    }

    /// Materialize and encode into memory.
    pub fn to_buffer(&self) -> Result<Vec<u8>, PipelineError> {
        let (image, directive) = self.prepare()?;
        let mut cursor = Cursor::new(Vec::new());
        encode(&image, directive, self.profile(), &mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Materialize and encode straight to `path`.
    ///
    /// The file is only created once the pixels are ready, and removed again
    /// if encoding fails part way.
    pub fn to_file(&self, path: &Path) -> Result<(), PipelineError> {
        let (image, directive) = self.prepare()?;
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        let result = encode(&image, directive, self.profile(), &mut writer)
            .and_then(|()| writer.flush().map_err(PipelineError::from));
        drop(writer);
        if result.is_err() {
            let _ = std::fs::remove_file(path);
        }
        result
    }

    fn prepare(&self) -> Result<(DynamicImage, EncodeDirective), PipelineError> {
        let directive = self.directive.ok_or(PipelineError::NothingStaged)?;
        Ok((self.materialize()?, directive))
    }

    fn profile(&self) -> Option<Vec<u8>> {
        if self.keep_metadata {
            self.icc_profile.as_deref().cloned()
        } else {
            None
        }
    }
}

fn encode<W: Write + Seek>(
    image: &DynamicImage,
    directive: EncodeDirective,
    icc: Option<Vec<u8>>,
    writer: W,
) -> Result<(), PipelineError> {
    match directive {
        EncodeDirective::Png { compression } => {
            let level = match compression {
                PngCompression::Fast => CompressionType::Fast,
                PngCompression::Default => CompressionType::Default,
                PngCompression::Best => CompressionType::Best,
            };
            let encoder = PngEncoder::new_with_quality(writer, level, PngFilter::Adaptive);
            write_with_profile(encoder, &png_compatible(image), icc)
        }
        EncodeDirective::Jpeg { quality, .. } => {
            // Native JPEG is always baseline; progressive scans need mozjpeg
            let encoder = JpegEncoder::new_with_quality(writer, quality.as_u8());
            write_with_profile(encoder, &DynamicImage::ImageRgb8(image.to_rgb8()), icc)
        }
        EncodeDirective::Webp => {
            let encoder = WebPEncoder::new_lossless(writer);
            write_with_profile(encoder, &eight_bit_color(image), icc)
        }
        EncodeDirective::Tiff => {
            let encoder = TiffEncoder::new(writer);
            write_with_profile(encoder, &eight_bit_color(image), icc)
        }
    }
}

fn write_with_profile<E: ImageEncoder>(
    mut encoder: E,
    image: &DynamicImage,
    icc: Option<Vec<u8>>,
) -> Result<(), PipelineError> {
    if let Some(profile) = icc {
        if let Err(e) = encoder.set_icc_profile(profile) {
            log::debug!("ICC profile dropped: {e}");
        }
    }
    image
        .write_with_encoder(encoder)
        .map_err(|e| PipelineError::Encode(e.to_string()))
}

/// PNG takes 8/16-bit gray and colour; floats are narrowed.
fn png_compatible(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => eight_bit_color(image),
        other => other.clone(),
    }
}

fn eight_bit_color(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}
