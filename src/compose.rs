//! Turn one transform's args into queued pipeline steps.
//!
//! Step order is fixed; every step is conditional on the args:
//!
//! ```text
//! 1. AutoOrient     rotate absent or 0 (explicit rotation replaces EXIF)
//! 2. Resize         width and/or height set
//! 3. Stage format   png / webp / tiff
//! 4. Stage JPEG     jpg, unless the external JPEG path will re-encode it
//! 5. Grayscale      grayscale: true
//! 6. Rotate         rotate non-zero
//! 7. Duotone        duotone set; last, so it sees final geometry and colour
//! ```
//!
//! Rotation runs after resize, so `width`/`height` describe the image before
//! it is turned. Composition never fails: unparsable colours surface when the
//! pipeline is materialized.

use crate::imaging::{
    EncodeDirective, Operation, OutputFormat, Pipeline, TransformArgs, duotone, png_compression,
    round_dimension,
};

/// Queue the steps for `args` onto `pipeline`.
///
/// `external_jpeg` leaves JPEG output unstaged so the dispatcher can stage
/// its own lossless-ish intermediate for mozjpeg.
pub fn compose(pipeline: Pipeline, args: &TransformArgs, external_jpeg: bool) -> Pipeline {
    let mut pipeline = pipeline;
    let rotation = args.explicit_rotation();

    if rotation.is_none() {
        pipeline = pipeline.push(Operation::AutoOrient);
    }

    let width = args.width.and_then(round_dimension);
    let height = args.height.and_then(round_dimension);
    if width.is_some() || height.is_some() {
        pipeline = pipeline.push(Operation::Resize {
            width,
            height,
            fit: args.fit.unwrap_or_default(),
            focus: args.crop_focus.unwrap_or_default(),
            background: args.background.clone(),
        });
    }

    if let Some(directive) = format_directive(args) {
        pipeline = pipeline.stage(directive);
    }

    if args.to_format == OutputFormat::Jpg && !external_jpeg {
        pipeline = pipeline.stage(EncodeDirective::Jpeg {
            quality: args.quality(),
            progressive: args.jpeg_progressive(),
        });
    }

    if args.grayscale {
        pipeline = pipeline.push(Operation::Grayscale);
    }

    if let Some(degrees) = rotation {
        pipeline = pipeline.push(Operation::Rotate {
            degrees,
            background: args.background.clone(),
        });
    }

    if let Some(spec) = &args.duotone {
        pipeline = duotone::apply(spec, args.to_format, pipeline);
    }

    log::debug!(
        "composed {} with {} step(s)",
        args.to_format,
        pipeline.operations().len()
    );
    pipeline
}

/// Directive for the non-JPEG formats, chosen from `toFormat` alone.
fn format_directive(args: &TransformArgs) -> Option<EncodeDirective> {
    match args.to_format {
        OutputFormat::Png => Some(EncodeDirective::Png {
            compression: png_compression(args.png_compression_level.unwrap_or(9)),
        }),
        OutputFormat::Webp => Some(EncodeDirective::Webp),
        OutputFormat::Tiff => Some(EncodeDirective::Tiff),
        OutputFormat::Jpg => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{CropFocus, Duotone, Fit, PngCompression, Quality};
    use image::{DynamicImage, RgbImage};

    fn handle() -> Pipeline {
        Pipeline::from_image(DynamicImage::ImageRgb8(RgbImage::new(10, 10)))
    }

    fn args(format: OutputFormat) -> TransformArgs {
        TransformArgs::new(format)
    }

    #[test]
    fn minimal_args_only_auto_orient() {
        let p = compose(handle(), &args(OutputFormat::Tiff), false);
        assert_eq!(p.operations(), &[Operation::AutoOrient]);
        assert_eq!(p.directive(), Some(EncodeDirective::Tiff));
    }

    #[test]
    fn explicit_rotation_skips_auto_orient() {
        let mut a = args(OutputFormat::Webp);
        a.rotate = Some(90);
        let p = compose(handle(), &a, false);
        assert_eq!(
            p.operations(),
            &[Operation::Rotate {
                degrees: 90,
                background: None
            }]
        );
    }

    #[test]
    fn zero_rotation_means_auto_orient() {
        let mut a = args(OutputFormat::Webp);
        a.rotate = Some(0);
        let p = compose(handle(), &a, false);
        assert_eq!(p.operations(), &[Operation::AutoOrient]);
    }

    #[test]
    fn resize_uses_rounded_dimensions_and_defaults() {
        let mut a = args(OutputFormat::Png);
        a.width = Some(499.6);
        let p = compose(handle(), &a, false);
        assert_eq!(
            p.operations()[1],
            Operation::Resize {
                width: Some(500),
                height: None,
                fit: Fit::Cover,
                focus: CropFocus::Center,
                background: None,
            }
        );
    }

    #[test]
    fn full_order_is_fixed() {
        let mut a = args(OutputFormat::Png);
        a.width = Some(100.0);
        a.height = Some(50.0);
        a.grayscale = true;
        a.rotate = Some(45);
        a.background = Some("#fff".into());
        a.duotone = Some(Duotone {
            highlight: "#ffffff".into(),
            shadow: "#000000".into(),
            opacity: None,
        });
        let p = compose(handle(), &a, false);
        let kinds: Vec<&str> = p
            .operations()
            .iter()
            .map(|op| match op {
                Operation::AutoOrient => "orient",
                Operation::Resize { .. } => "resize",
                Operation::Grayscale => "gray",
                Operation::Rotate { .. } => "rotate",
                Operation::Duotone { .. } => "duotone",
            })
            .collect();
        assert_eq!(kinds, ["resize", "gray", "rotate", "duotone"]);
    }

    #[test]
    fn png_stages_compression_level() {
        let mut a = args(OutputFormat::Png);
        a.png_compression_level = Some(1);
        let p = compose(handle(), &a, false);
        assert_eq!(
            p.directive(),
            Some(EncodeDirective::Png {
                compression: PngCompression::Fast
            })
        );
    }

    #[test]
    fn jpeg_staged_natively() {
        let mut a = args(OutputFormat::Jpg);
        a.quality = Some(72);
        a.jpeg_progressive = Some(false);
        let p = compose(handle(), &a, false);
        assert_eq!(
            p.directive(),
            Some(EncodeDirective::Jpeg {
                quality: Quality::new(72),
                progressive: false
            })
        );
    }

    #[test]
    fn external_jpeg_leaves_directive_unstaged() {
        let p = compose(handle(), &args(OutputFormat::Jpg), true);
        assert_eq!(p.directive(), None);
    }

    #[test]
    fn external_flag_ignored_for_other_formats() {
        let p = compose(handle(), &args(OutputFormat::Webp), true);
        assert_eq!(p.directive(), Some(EncodeDirective::Webp));
    }

    #[test]
    fn composing_a_clone_leaves_the_original_untouched() {
        let base = handle();
        let mut a = args(OutputFormat::Png);
        a.grayscale = true;
        let _composed = compose(base.clone(), &a, false);
        assert!(base.operations().is_empty());
        assert_eq!(base.directive(), None);
    }
}
