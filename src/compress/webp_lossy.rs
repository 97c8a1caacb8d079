//! Lossy WEBP through libwebp.
//!
//! libwebp writes bare VP8/VP8L frames with no EXIF or XMP chunks, so the
//! output carries no metadata whether or not stripping was asked for.

use super::{CompressError, WebpOptions};
use image::ImageFormat;

pub(super) fn recompress(input: &[u8], options: &WebpOptions) -> Result<Vec<u8>, CompressError> {
    let image = image::load_from_memory_with_format(input, ImageFormat::WebP)
        .map_err(|e| CompressError::Decode(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    let quality = options.quality as f32;

    let memory = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    }
    .map_err(|e| CompressError::Encode(format!("libwebp: {e:?}")))?;
    if memory.is_empty() {
        return Err(CompressError::Encode("libwebp produced no output".to_string()));
    }
    Ok(memory.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};

    fn lossless(img: DynamicImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::WebP).unwrap();
        buf.into_inner()
    }

    fn photo_like() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(96, 64, |x, y| {
            image::Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn lossy_output_is_webp_and_smaller() {
        let input = lossless(photo_like());
        let out = recompress(
            &input,
            &WebpOptions {
                quality: 50,
                strip_metadata: false,
            },
        )
        .unwrap();
        assert_eq!(&out[..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
        assert!(out.len() < input.len());
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (96, 64));
    }

    #[test]
    fn alpha_survives() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            16,
            16,
            image::Rgba([10, 200, 30, 128]),
        ));
        let out = recompress(
            &lossless(rgba),
            &WebpOptions {
                quality: 80,
                strip_metadata: true,
            },
        )
        .unwrap();
        assert!(image::load_from_memory(&out).unwrap().color().has_alpha());
    }

    #[test]
    fn png_input_is_rejected() {
        let result = recompress(
            b"\x89PNG\r\n\x1a\n",
            &WebpOptions {
                quality: 80,
                strip_metadata: false,
            },
        );
        assert!(matches!(result, Err(CompressError::Decode(_))));
    }
}
