//! Two-colour gradient map.

use super::params::{Duotone, OutputFormat, Rgba};
use super::pipeline::{Operation, Pipeline};
use image::{DynamicImage, RgbImage, RgbaImage};

/// Queue a duotone on `pipeline` for output in `format`.
///
/// Runs after every other pixel step, so it sees final geometry and colour.
/// Formats without alpha get an opaque result.
pub fn apply(spec: &Duotone, format: OutputFormat, pipeline: Pipeline) -> Pipeline {
    pipeline.push(Operation::Duotone {
        shadow: spec.shadow.clone(),
        highlight: spec.highlight.clone(),
        opacity: spec.opacity,
        keep_alpha: format.supports_alpha(),
    })
}

/// Map luminance onto the `shadow`→`highlight` gradient.
///
/// `opacity` (0-100) blends the result over the original; `None` replaces it.
pub fn remap(
    image: &DynamicImage,
    shadow: Rgba,
    highlight: Rgba,
    opacity: Option<u8>,
    keep_alpha: bool,
) -> DynamicImage {
    let strength = opacity.map_or(1.0, |o| o.min(100) as f32 / 100.0);
    let src = image.to_rgba8();

    let mapped = RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let t = (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0;
        let tone = |c: usize| shadow.0[c] as f32 + (highlight.0[c] as f32 - shadow.0[c] as f32) * t;
        let blend = |orig: u8, c: usize| {
            (orig as f32 + (tone(c) - orig as f32) * strength)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        image::Rgba([blend(r, 0), blend(g, 1), blend(b, 2), a])
    });

    if keep_alpha && image.color().has_alpha() {
        DynamicImage::ImageRgba8(mapped)
    } else {
        let (w, h) = mapped.dimensions();
        let rgb = RgbImage::from_fn(w, h, |x, y| {
            let [r, g, b, _] = mapped.get_pixel(x, y).0;
            image::Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(rgb)
    }
}
