//! Lossy PNG: palette quantization with a quality floor, then deflate tuning.
//!
//! Quality works like pngquant's: the mean squared error of the quantized
//! image is mapped onto a 0-100 scale. The smallest palette that still reaches
//! the top of the requested range wins. When not even the full 256-colour
//! palette reaches the bottom of the range, the truecolour input is kept.
//!
//! The input's ICC profile is copied onto the palette image unless metadata
//! is stripped.

use super::{CompressError, PngOptions};
use color_quant::NeuQuant;
use image::{ImageFormat, RgbaImage};
use oxipng::StripChunks;
use std::borrow::Cow;
use std::io::Cursor;

const PALETTE_SIZES: [usize; 4] = [256, 128, 64, 32];

pub(super) fn recompress(input: &[u8], options: &PngOptions) -> Result<Vec<u8>, CompressError> {
    let rgba = image::load_from_memory_with_format(input, ImageFormat::Png)
        .map_err(|e| CompressError::Decode(e.to_string()))?
        .to_rgba8();
    let (min, max) = options.quality;

    let indexed = match choose_palette(&rgba, min, max, sample_factor(options.speed)) {
        Some(quantized) => {
            log::debug!(
                "PNG quantized to {} colours at quality {}",
                quantized.palette.len(),
                quantized.quality
            );
            let icc = if options.strip_metadata {
                None
            } else {
                read_icc(input)?
            };
            encode_indexed(&quantized, rgba.width(), rgba.height(), icc)?
        }
        None => {
            log::debug!("PNG quality below {min}, keeping truecolour");
            input.to_vec()
        }
    };

    let mut opts = oxipng::Options::from_preset(oxipng_preset(options.speed));
    opts.strip = if options.strip_metadata {
        StripChunks::Safe
    } else {
        StripChunks::None
    };
    oxipng::optimize_from_memory(&indexed, &opts).map_err(|e| CompressError::Encode(e.to_string()))
}

/// A palette image and how close it came to the original.
struct Quantized {
    palette: Vec<[u8; 4]>,
    indices: Vec<u8>,
    quality: u8,
}

fn choose_palette(rgba: &RgbaImage, min: u8, max: u8, sample_factor: i32) -> Option<Quantized> {
    let mut chosen: Option<Quantized> = None;
    for colors in PALETTE_SIZES {
        let candidate = quantize(rgba, colors, sample_factor);
        if candidate.quality >= max {
            chosen = Some(candidate);
            continue;
        }
        if chosen.is_none() && candidate.quality >= min {
            chosen = Some(candidate);
        }
        break;
    }
    chosen
}

fn quantize(rgba: &RgbaImage, colors: usize, sample_factor: i32) -> Quantized {
    let pixels = rgba.as_raw();
    let nq = NeuQuant::new(sample_factor, colors, pixels);
    let palette: Vec<[u8; 4]> = nq
        .color_map_rgba()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();

    let mut error_sum = 0.0f64;
    let indices: Vec<u8> = pixels
        .chunks_exact(4)
        .map(|px| {
            let index = nq.index_of(px);
            let mapped = palette[index];
            error_sum += px
                .iter()
                .zip(mapped.iter())
                .map(|(&a, &b)| {
                    let d = (a as f64 - b as f64) / 255.0;
                    d * d
                })
                .sum::<f64>();
            index as u8
        })
        .collect();

    let mse = error_sum / indices.len().max(1) as f64;
    Quantized {
        palette,
        indices,
        quality: mse_to_quality(mse),
    }
}

fn read_icc(input: &[u8]) -> Result<Option<Vec<u8>>, CompressError> {
    let reader = ::png::Decoder::new(Cursor::new(input))
        .read_info()
        .map_err(|e| CompressError::Decode(e.to_string()))?;
    Ok(reader.info().icc_profile.as_ref().map(|p| p.to_vec()))
}

fn encode_indexed(
    quantized: &Quantized,
    width: u32,
    height: u32,
    icc: Option<Vec<u8>>,
) -> Result<Vec<u8>, CompressError> {
    let rgb: Vec<u8> = quantized
        .palette
        .iter()
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    let alpha: Vec<u8> = quantized.palette.iter().map(|c| c[3]).collect();

    let mut out = Vec::new();
    {
        let mut info = ::png::Info::with_size(width, height);
        info.icc_profile = icc.map(Cow::Owned);
        let mut encoder = ::png::Encoder::with_info(&mut out, info)
            .map_err(|e| CompressError::Encode(e.to_string()))?;
        encoder.set_color(::png::ColorType::Indexed);
        encoder.set_depth(::png::BitDepth::Eight);
        encoder.set_palette(rgb);
        if alpha.iter().any(|&a| a != 255) {
            encoder.set_trns(alpha);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| CompressError::Encode(e.to_string()))?;
        writer
            .write_image_data(&quantized.indices)
            .map_err(|e| CompressError::Encode(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| CompressError::Encode(e.to_string()))?;
    }
    Ok(out)
}

/// pngquant's quality → MSE curve. Quality 100 tolerates no error.
fn quality_to_mse(quality: u8) -> f64 {
    if quality == 0 {
        return f64::MAX;
    }
    if quality >= 100 {
        return 0.0;
    }
    let q = quality as f64;
    let extra_low_fudge = (0.016 / (0.001 + q) - 0.001).max(0.0);
    extra_low_fudge + 2.5 / (210.0 + q).powf(1.2) * (100.1 - q) / 100.0
}

/// Highest quality whose error allowance covers `mse`.
fn mse_to_quality(mse: f64) -> u8 {
    (1..=100u8)
        .rev()
        .find(|&q| mse <= quality_to_mse(q) + 1e-6)
        .unwrap_or(0)
}

/// NeuQuant sampling factor: 1 examines every pixel, 30 every 30th.
fn sample_factor(speed: u8) -> i32 {
    ((speed.clamp(1, 11) as i32 - 1) * 3 + 1).clamp(1, 30)
}

fn oxipng_preset(speed: u8) -> u8 {
    match speed {
        0..=3 => 4,
        4..=7 => 2,
        _ => 1,
    }
}
