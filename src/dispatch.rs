//! Pick how a composed pipeline becomes bytes on disk.
//!
//! | Condition (first match wins) | Strategy |
//! |---|---|
//! | `png` | staged PNG → buffer → lossy PNG re-compressor → file |
//! | `jpg` with mozjpeg enabled | baseline JPEG q100 → buffer → mozjpeg → file |
//! | `webp` | lossless WEBP → buffer → lossy WEBP re-compressor → file |
//! | anything else | native encoder straight to file |
//!
//! Every strategy writes exactly one file on success and nothing on failure.

use crate::compress::{CompressError, JpegOptions, PngOptions, Recompressor, WebpOptions};
use crate::imaging::{EncodeDirective, OutputFormat, Pipeline, PipelineError, Quality, png_quality_range};
use crate::process::{BatchOptions, TransformRequest};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single transform failed. Never fatal to the batch.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Encode failed: {0}")]
    Encode(#[from] PipelineError),
    #[error("{0}")]
    Compress(#[from] CompressError),
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RecompressPng,
    RecompressJpeg,
    RecompressWebp,
    Native,
}

/// Choose the encode path for `format`.
pub fn select_strategy(format: OutputFormat, use_mozjpeg: bool) -> Strategy {
    match format {
        OutputFormat::Png => Strategy::RecompressPng,
        OutputFormat::Jpg if use_mozjpeg => Strategy::RecompressJpeg,
        OutputFormat::Webp => Strategy::RecompressWebp,
        _ => Strategy::Native,
    }
}

/// Encode `pipeline` to `request.output_path`.
///
/// Returns the request on success so callers can collect outcomes as-is.
pub fn dispatch(
    pipeline: Pipeline,
    request: &TransformRequest,
    recompressor: &impl Recompressor,
    options: &BatchOptions,
) -> Result<TransformRequest, TransformError> {
    let args = &request.args;
    let quality = args.quality().as_u8();
    let strip_metadata = options.strip_metadata;
    let strategy = select_strategy(args.to_format, options.use_mozjpeg);
    log::debug!("{} via {:?}", request.output_path.display(), strategy);

    match strategy {
        Strategy::RecompressPng => {
            let bytes = pipeline.to_buffer()?;
            let out = recompressor.png(
                &bytes,
                &PngOptions {
                    quality: png_quality_range(args.quality().value()),
                    speed: args.png_compression_speed.unwrap_or(4),
                    strip_metadata,
                },
            )?;
            write_output(&request.output_path, &out)?;
        }
        Strategy::RecompressJpeg => {
            let bytes = pipeline
                .stage(EncodeDirective::Jpeg {
                    quality: Quality::new(100),
                    progressive: false,
                })
                .to_buffer()?;
            let out = recompressor.jpeg(
                &bytes,
                &JpegOptions {
                    quality,
                    progressive: args.jpeg_progressive(),
                    strip_metadata,
                },
            )?;
            write_output(&request.output_path, &out)?;
        }
        Strategy::RecompressWebp => {
            let bytes = pipeline.to_buffer()?;
            let out = recompressor.webp(
                &bytes,
                &WebpOptions {
                    quality,
                    strip_metadata,
                },
            )?;
            write_output(&request.output_path, &out)?;
        }
        Strategy::Native => pipeline.to_file(&request.output_path)?,
    }

    Ok(request.clone())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    std::fs::write(path, bytes).map_err(|source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    })
}
