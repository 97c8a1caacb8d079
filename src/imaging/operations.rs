//! Pixel work behind each queued [`Operation`].
//!
//! These functions combine the pure calculations with the `image` crate.
//! They consume the working image and return the next one.

use super::calculations::{
    MAX_EDGE, ResizePlan, exceeds_max_edge, gravity_offset, normalize_degrees, plan_resize,
    rotated_bounds,
};
use super::duotone;
use super::params::{CropFocus, Rgba};
use super::pipeline::{Operation, PipelineError};
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};

/// Apply one queued operation.
pub fn apply(
    image: DynamicImage,
    op: &Operation,
    orientation: Orientation,
) -> Result<DynamicImage, PipelineError> {
    match op {
        Operation::AutoOrient => {
            let mut image = image;
            image.apply_orientation(orientation);
            Ok(image)
        }
        Operation::Resize {
            width,
            height,
            fit,
            focus,
            background,
        } => {
            let plan = plan_resize(image.dimensions(), *width, *height, *fit);
            match plan {
                None => Ok(image),
                Some(plan) => resize(image, plan, *focus, background.as_deref()),
            }
        }
        Operation::Grayscale => Ok(grayscale(&image)),
        Operation::Rotate {
            degrees,
            background,
        } => rotate(image, *degrees, background.as_deref()),
        Operation::Duotone {
            shadow,
            highlight,
            opacity,
            keep_alpha,
        } => {
            let shadow = parse_color(shadow)?;
            let highlight = parse_color(highlight)?;
            Ok(duotone::remap(&image, shadow, highlight, *opacity, *keep_alpha))
        }
    }
}

fn parse_color(value: &str) -> Result<Rgba, PipelineError> {
    Rgba::parse(value).ok_or_else(|| PipelineError::InvalidColor(value.to_string()))
}

/// Background colour, opaque black unless given.
fn background_color(value: Option<&str>) -> Result<Rgba, PipelineError> {
    value.map(parse_color).transpose().map(|c| c.unwrap_or(Rgba::BLACK))
}

/// Execute a resize plan.
pub fn resize(
    image: DynamicImage,
    plan: ResizePlan,
    focus: CropFocus,
    background: Option<&str>,
) -> Result<DynamicImage, PipelineError> {
    if let Some((width, height)) = plan.oversized() {
        return Err(PipelineError::InvalidDimensions {
            width,
            height,
            max: MAX_EDGE,
        });
    }
    match plan {
        ResizePlan::Scale { width, height } => {
            Ok(image.resize_exact(width, height, FilterType::Lanczos3))
        }
        ResizePlan::Cover { scaled, target } => {
            let scaled_img = image.resize_exact(scaled.0, scaled.1, FilterType::Lanczos3);
            let (x, y) = match focus {
                CropFocus::Entropy => entropy_offset(&scaled_img.to_luma8(), target),
                other => gravity_offset(scaled, target, other),
            };
            Ok(scaled_img.crop_imm(x, y, target.0, target.1))
        }
        ResizePlan::Contain { scaled, canvas } => {
            // Validate before doing the expensive resample
            let fill = background_color(background)?;
            let scaled_img = image.resize_exact(scaled.0, scaled.1, FilterType::Lanczos3);
            let mut out = RgbaImage::from_pixel(canvas.0, canvas.1, image::Rgba(fill.0));
            let (x, y) = gravity_offset(canvas, scaled, focus);
            imageops::overlay(&mut out, &scaled_img.to_rgba8(), x as i64, y as i64);
            Ok(DynamicImage::ImageRgba8(out))
        }
    }
}

/// Offset of the `window`-sized crop with the most luminance entropy.
///
/// Cover crops only ever have slack on one axis, so candidates slide along
/// that axis in a handful of steps.
pub fn entropy_offset(luma: &GrayImage, window: (u32, u32)) -> (u32, u32) {
    const STEPS: u32 = 8;
    let free_x = luma.width().saturating_sub(window.0);
    let free_y = luma.height().saturating_sub(window.1);
    if free_x == 0 && free_y == 0 {
        return (0, 0);
    }

    let mut best = (free_x / 2, free_y / 2);
    let mut best_entropy = f64::MIN;
    for step in 0..=STEPS {
        let offset = (free_x * step / STEPS, free_y * step / STEPS);
        let e = window_entropy(luma, offset, window);
        if e > best_entropy {
            best_entropy = e;
            best = offset;
        }
    }
    best
}

fn window_entropy(luma: &GrayImage, origin: (u32, u32), size: (u32, u32)) -> f64 {
    let mut histogram = [0u64; 256];
    let view = imageops::crop_imm(luma, origin.0, origin.1, size.0, size.1);
    for (_, _, pixel) in view.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Grayscale, keeping the alpha channel when there is one.
pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageLumaA8(image.to_luma_alpha8())
    } else {
        DynamicImage::ImageLuma8(image.to_luma8())
    }
}

/// Rotate clockwise by `degrees`.
///
/// Right angles are lossless. Anything else is resampled bilinearly onto an
/// expanded canvas whose uncovered corners take the background colour.
pub fn rotate(
    image: DynamicImage,
    degrees: i32,
    background: Option<&str>,
) -> Result<DynamicImage, PipelineError> {
    match normalize_degrees(degrees) {
        0 => Ok(image),
        90 => Ok(image.rotate90()),
        180 => Ok(image.rotate180()),
        270 => Ok(image.rotate270()),
        d => {
            let fill = background_color(background)?;
            let (width, height) = rotated_bounds(image.width(), image.height(), d);
            if exceeds_max_edge(width, height) {
                return Err(PipelineError::InvalidDimensions {
                    width,
                    height,
                    max: MAX_EDGE,
                });
            }
            Ok(DynamicImage::ImageRgba8(rotate_arbitrary(
                &image.to_rgba8(),
                d,
                fill,
            )))
        }
    }
}

fn rotate_arbitrary(src: &RgbaImage, degrees: i32, fill: Rgba) -> RgbaImage {
    let (src_w, src_h) = src.dimensions();
    let (out_w, out_h) = rotated_bounds(src_w, src_h, degrees);
    let radians = (degrees as f64).to_radians();
    let (sin, cos) = radians.sin_cos();

    let src_cx = src_w as f64 / 2.0;
    let src_cy = src_h as f64 / 2.0;
    let out_cx = out_w as f64 / 2.0;
    let out_cy = out_h as f64 / 2.0;

    let sample = |x: i64, y: i64| -> [f64; 4] {
        if x < 0 || y < 0 || x >= src_w as i64 || y >= src_h as i64 {
            fill.0.map(f64::from)
        } else {
            src.get_pixel(x as u32, y as u32).0.map(f64::from)
        }
    };

    RgbaImage::from_fn(out_w, out_h, |ox, oy| {
        // Pixel centre relative to the output centre, rotated back into the source
        let dx = ox as f64 + 0.5 - out_cx;
        let dy = oy as f64 + 0.5 - out_cy;
        let sx = dx * cos + dy * sin + src_cx - 0.5;
        let sy = -dx * sin + dy * cos + src_cy - 0.5;

        let x0 = sx.floor();
        let y0 = sy.floor();
        let (fx, fy) = (sx - x0, sy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let tl = sample(x0, y0);
        let tr = sample(x0 + 1, y0);
        let bl = sample(x0, y0 + 1);
        let br = sample(x0 + 1, y0 + 1);

        let mut px = [0u8; 4];
        for c in 0..4 {
            let top = tl[c] + (tr[c] - tl[c]) * fx;
            let bottom = bl[c] + (br[c] - bl[c]) * fx;
            px[c] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
        }
        image::Rgba(px)
    })
}
