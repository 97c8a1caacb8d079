//! JPEG re-compression through mozjpeg.

use super::{CompressError, JpegOptions};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use mozjpeg::{ColorSpace, Compress};
use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub(super) fn recompress(input: &[u8], options: &JpegOptions) -> Result<Vec<u8>, CompressError> {
    let (rgb, icc) = decode(input)?;
    let (width, height) = rgb.dimensions();
    let pixels = rgb.into_raw();
    let icc = if options.strip_metadata { None } else { icc };
    let options = *options;

    // libjpeg reports fatal errors by unwinding
    catch_unwind(AssertUnwindSafe(move || {
        encode(&pixels, width, height, icc.as_deref(), &options)
    }))
    .map_err(|_| CompressError::Encode("mozjpeg aborted".to_string()))?
    .map_err(|e| CompressError::Encode(e.to_string()))
}

fn decode(input: &[u8]) -> Result<(image::RgbImage, Option<Vec<u8>>), CompressError> {
    let mut decoder = ImageReader::with_format(Cursor::new(input), ImageFormat::Jpeg)
        .into_decoder()
        .map_err(|e| CompressError::Decode(e.to_string()))?;
    let icc = decoder.icc_profile().ok().flatten();
    let image =
        DynamicImage::from_decoder(decoder).map_err(|e| CompressError::Decode(e.to_string()))?;
    Ok((image.to_rgb8(), icc))
}

fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    icc: Option<&[u8]>,
    options: &JpegOptions,
) -> std::io::Result<Vec<u8>> {
    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    if !options.progressive {
        // mozjpeg's default profile is progressive; the fastest one is baseline
        comp.set_fastest_defaults();
        comp.set_optimize_coding(true);
    }
    comp.set_size(width as usize, height as usize);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_quality(options.quality as f32);
    if options.progressive {
        comp.set_progressive_mode();
    }

    let mut started = comp.start_compress(Vec::new())?;
    if let Some(profile) = icc {
        started.write_icc_profile(profile);
    }
    started.write_scanlines(pixels)?;
    started.finish()
}
