//! Pure calculation functions for image geometry and encoder tuning.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{CropFocus, Fit};

/// Largest edge, in pixels, that any operation may produce.
pub const MAX_EDGE: u32 = 16383;

/// Round a requested dimension to whole pixels.
///
/// Non-finite and non-positive values are treated as "not requested".
/// Anything positive rounds to at least one pixel.
pub fn round_dimension(value: f64) -> Option<u32> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value.round() as u32).max(1))
}

/// What a resize has to do to the pixels, decided from the source size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Plain resample to exactly `(width, height)`.
    Scale { width: u32, height: u32 },
    /// Resample to `scaled`, then crop a `target`-sized window.
    Cover {
        scaled: (u32, u32),
        target: (u32, u32),
    },
    /// Resample to `scaled`, then pad onto a `canvas`-sized background.
    Contain {
        scaled: (u32, u32),
        canvas: (u32, u32),
    },
}

impl ResizePlan {
    /// First buffer size the plan would allocate with an edge over [`MAX_EDGE`].
    pub fn oversized(&self) -> Option<(u32, u32)> {
        let sizes = match *self {
            ResizePlan::Scale { width, height } => [(width, height), (width, height)],
            ResizePlan::Cover { scaled, target } => [scaled, target],
            ResizePlan::Contain { scaled, canvas } => [scaled, canvas],
        };
        sizes.into_iter().find(|&(w, h)| exceeds_max_edge(w, h))
    }
}

pub fn exceeds_max_edge(width: u32, height: u32) -> bool {
    width > MAX_EDGE || height > MAX_EDGE
}

/// Decide how to get from `source` to the requested box.
///
/// Returns `None` when neither dimension is requested. With a single
/// dimension the other follows the source aspect ratio and `fit` is
/// irrelevant.
///
/// # Examples
/// ```
/// # use pixfan::imaging::{plan_resize, Fit, ResizePlan};
/// // 1000x800 with only width=500 → 500x400
/// assert_eq!(
///     plan_resize((1000, 800), Some(500), None, Fit::Cover),
///     Some(ResizePlan::Scale { width: 500, height: 400 })
/// );
/// ```
pub fn plan_resize(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    fit: Fit,
) -> Option<ResizePlan> {
    let (src_w, src_h) = source;
    match (width, height) {
        (None, None) => None,
        (Some(w), None) => Some(ResizePlan::Scale {
            width: w,
            height: scale_edge(src_h, w, src_w),
        }),
        (None, Some(h)) => Some(ResizePlan::Scale {
            width: scale_edge(src_w, h, src_h),
            height: h,
        }),
        (Some(w), Some(h)) => Some(match fit {
            Fit::Fill => ResizePlan::Scale {
                width: w,
                height: h,
            },
            Fit::Inside => {
                let (width, height) = fit_inside(source, (w, h));
                ResizePlan::Scale { width, height }
            }
            Fit::Outside => {
                let (width, height) = fit_outside(source, (w, h));
                ResizePlan::Scale { width, height }
            }
            Fit::Cover => ResizePlan::Cover {
                scaled: fit_outside(source, (w, h)),
                target: (w, h),
            },
            Fit::Contain => ResizePlan::Contain {
                scaled: fit_inside(source, (w, h)),
                canvas: (w, h),
            },
        }),
    }
}

/// `edge * numerator / denominator`, rounded, at least 1.
fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    ((edge as f64 * numerator as f64 / denominator.max(1) as f64).round() as u32).max(1)
}

/// Largest aspect-preserving size that fits inside `target`.
pub fn fit_inside(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let src_aspect = src_w as f64 / src_h.max(1) as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h.max(1) as f64;

    if src_aspect > tgt_aspect {
        // Wider than the box: width is the binding edge
        (tgt_w, scale_edge(src_h, tgt_w, src_w))
    } else {
        (scale_edge(src_w, tgt_h, src_h), tgt_h)
    }
}

/// Smallest aspect-preserving size that covers `target`.
///
/// One dimension matches exactly, the other may exceed.
pub fn fit_outside(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let src_aspect = src_w as f64 / src_h.max(1) as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h.max(1) as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        (scale_edge(src_w, tgt_h, src_h), tgt_h)
    } else {
        // Source is taller: width will match, height will exceed
        (tgt_w, scale_edge(src_h, tgt_w, src_w))
    }
}

/// Top-left offset of an `inner` rectangle placed inside `outer` by gravity.
///
/// Used both for choosing the crop window of a cover resize and for placing
/// the scaled image on a contain canvas. `Entropy` has no fixed position and
/// resolves to the centre here.
pub fn gravity_offset(outer: (u32, u32), inner: (u32, u32), focus: CropFocus) -> (u32, u32) {
    let free_x = outer.0.saturating_sub(inner.0);
    let free_y = outer.1.saturating_sub(inner.1);

    let x = match focus {
        CropFocus::West | CropFocus::Northwest | CropFocus::Southwest => 0,
        CropFocus::East | CropFocus::Northeast | CropFocus::Southeast => free_x,
        _ => free_x / 2,
    };
    let y = match focus {
        CropFocus::North | CropFocus::Northwest | CropFocus::Northeast => 0,
        CropFocus::South | CropFocus::Southwest | CropFocus::Southeast => free_y,
        _ => free_y / 2,
    };
    (x, y)
}

/// Normalize degrees into `0..360`.
pub fn normalize_degrees(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

/// Canvas size needed to hold a `width`x`height` image rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: i32) -> (u32, u32) {
    match normalize_degrees(degrees) {
        0 | 180 => (width, height),
        90 | 270 => (height, width),
        d => {
            let radians = (d as f64).to_radians();
            let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
            let (w, h) = (width as f64, height as f64);
            // Shave float noise before rounding up
            let out_w = (w * cos + h * sin - 1e-6).ceil() as u32;
            let out_h = (w * sin + h * cos - 1e-6).ceil() as u32;
            (out_w.max(1), out_h.max(1))
        }
    }
}

/// Quality range handed to the PNG quantizer: `(q, min(q + 25, 100))`.
pub fn png_quality_range(quality: u32) -> (u8, u8) {
    let min = quality.min(100);
    let max = (min + 25).min(100);
    (min as u8, max as u8)
}

/// Deflate effort of the intermediate PNG encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

/// Map a zlib-style level (0-9) onto the encoder's effort presets.
pub fn png_compression(level: u8) -> PngCompression {
    match level {
        0..=3 => PngCompression::Fast,
        4..=6 => PngCompression::Default,
        _ => PngCompression::Best,
    }
}
