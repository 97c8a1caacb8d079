//! Parameter types for image transforms.
//!
//! These types describe *what* a transform should produce, not *how* the
//! pixels get there. They are the interface between callers (who build
//! [`TransformArgs`] from JSON or code), the composer (which turns args into
//! queued [`Operation`](super::pipeline::Operation)s) and the fingerprint
//! generator (which hashes the serialized form).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 50). Clamped on construction.
//! - [`OutputFormat`]: Terminal format of a transform (`jpg`, `png`, `webp`, `tiff`).
//! - [`Fit`]: How a two-dimension resize reconciles aspect-ratio mismatch.
//! - [`CropFocus`]: Which part of the image survives a crop or sits where in a letterbox.
//! - [`Duotone`]: Two-colour gradient map applied after all other pixel work.
//! - [`Rgba`]: Parsed colour for backgrounds and duotone stops.
//! - [`TransformArgs`]: The full, flat parameter set of one transform.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Encoder-facing value, clamped to 1-100 even for a hand-built `Quality`.
    pub fn as_u8(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(50)
    }
}

/// Terminal format of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpeg")]
    Jpg,
    Png,
    Webp,
    #[serde(alias = "tif")]
    Tiff,
}

impl OutputFormat {
    /// File extension used when an output path is derived.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Whether the encoded file can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a resize with both dimensions set handles a different aspect ratio.
///
/// - `Cover`: scale to cover the box, crop the overflow (default)
/// - `Contain`: scale to fit inside the box, letterbox with `background`
/// - `Fill`: stretch to the exact box, ignoring aspect ratio
/// - `Inside`: scale to fit inside the box, no letterbox (output may be smaller)
/// - `Outside`: scale to cover the box, no crop (output may be larger)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    #[default]
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
}

/// Crop focus (gravity) for `cover` crops and `contain` letterboxing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropFocus {
    #[default]
    #[serde(alias = "centre")]
    Center,
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    /// Keep the crop window with the highest luminance entropy.
    Entropy,
}

/// Two-colour gradient map: dark tones go to `shadow`, light tones to `highlight`.
///
/// With `opacity` set (0–100), the duotoned image is blended over the
/// original at that strength instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Duotone {
    pub highlight: String,
    pub shadow: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
}

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` (alpha as 0–1) or `transparent`.
    pub fn parse(input: &str) -> Option<Rgba> {
        let s = input.trim().to_ascii_lowercase();
        if s == "transparent" {
            return Some(Rgba([0, 0, 0, 0]));
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgba(").and_then(|b| b.strip_suffix(')')) {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if parts.len() != 4 {
                return None;
            }
            let alpha: f32 = parts[3].parse().ok()?;
            if !(0.0..=1.0).contains(&alpha) {
                return None;
            }
            return Some(Rgba([
                parts[0].parse().ok()?,
                parts[1].parse().ok()?,
                parts[2].parse().ok()?,
                (alpha * 255.0).round() as u8,
            ]));
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|b| b.strip_suffix(')')) {
            let parts: Vec<&str> = body.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return None;
            }
            return Some(Rgba([
                parts[0].parse().ok()?,
                parts[1].parse().ok()?,
                parts[2].parse().ok()?,
                255,
            ]));
        }
        None
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Defaults filled into absent [`TransformArgs`] fields by [`TransformArgs::heal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformDefaults {
    pub quality: u32,
    pub png_compression_level: u8,
    pub png_compression_speed: u8,
    pub jpeg_progressive: bool,
}

impl Default for TransformDefaults {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            png_compression_level: 9,
            png_compression_speed: 4,
            jpeg_progressive: true,
        }
    }
}

/// Flat parameter set of one transform.
///
/// Field names serialize in camelCase (`toFormat`, `cropFocus`, ...). Those
/// names are part of the fingerprint contract: see [`crate::fingerprint`].
/// Keys this crate does not know are kept in `extra` and never affect output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformArgs {
    /// Target height in pixels. Fractional values are rounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Target width in pixels. Fractional values are rounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_focus: Option<CropFocus>,
    pub to_format: OutputFormat,
    /// zlib level 0-9 for the intermediate PNG encode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_compression_level: Option<u8>,
    /// Quantizer speed 1 (slow, best) to 11 (fast, rough).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_compression_speed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_progressive: Option<bool>,
    #[serde(default)]
    pub grayscale: bool,
    /// Clockwise rotation in degrees. Absent or zero means "follow EXIF".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duotone: Option<Duotone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<Fit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Caller-specific keys, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransformArgs {
    /// Args for `format` with every optional field unset.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            height: None,
            width: None,
            crop_focus: None,
            to_format: format,
            png_compression_level: None,
            png_compression_speed: None,
            quality: None,
            jpeg_progressive: None,
            grayscale: false,
            rotate: None,
            duotone: None,
            fit: None,
            background: None,
            extra: Map::new(),
        }
    }

    /// Fill absent tuning fields from `defaults`.
    pub fn heal(mut self, defaults: &TransformDefaults) -> Self {
        self.quality.get_or_insert(defaults.quality);
        self.png_compression_level
            .get_or_insert(defaults.png_compression_level);
        self.png_compression_speed
            .get_or_insert(defaults.png_compression_speed);
        self.jpeg_progressive.get_or_insert(defaults.jpeg_progressive);
        self
    }

    pub fn quality(&self) -> Quality {
        self.quality.map(Quality::new).unwrap_or_default()
    }

    pub fn jpeg_progressive(&self) -> bool {
        self.jpeg_progressive.unwrap_or(true)
    }

    /// Explicit rotation in degrees, `None` when absent or zero.
    pub fn explicit_rotation(&self) -> Option<i32> {
        self.rotate.filter(|r| *r != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_as_u8_never_wraps() {
        assert_eq!(Quality::new(80).as_u8(), 80);
        assert_eq!(Quality(300).as_u8(), 100);
        assert_eq!(Quality(0).as_u8(), 1);
    }

    #[test]
    fn quality_default_is_50() {
        assert_eq!(Quality::default().value(), 50);
    }

    #[test]
    fn parse_hex_colors() {
        assert_eq!(Rgba::parse("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(Rgba::parse("#00000080"), Some(Rgba([0, 0, 0, 128])));
        assert_eq!(Rgba::parse("#FF8000"), Some(Rgba([255, 128, 0, 255])));
        assert_eq!(Rgba::parse("#f008"), Some(Rgba([255, 0, 0, 136])));
    }

    #[test]
    fn parse_functional_colors() {
        assert_eq!(Rgba::parse("rgb(1, 2, 3)"), Some(Rgba([1, 2, 3, 255])));
        assert_eq!(
            Rgba::parse("rgba(10,20,30,0.5)"),
            Some(Rgba([10, 20, 30, 128]))
        );
        assert_eq!(Rgba::parse("transparent"), Some(Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Rgba::parse("#12"), None);
        assert_eq!(Rgba::parse("#gggggg"), None);
        assert_eq!(Rgba::parse("rgba(1,2,3,4)"), None);
        assert_eq!(Rgba::parse("chartreuse-ish"), None);
    }

    #[test]
    fn args_deserialize_camel_case() {
        let args: TransformArgs = serde_json::from_str(
            r#"{"width": 500, "toFormat": "jpeg", "cropFocus": "north", "jpegProgressive": false}"#,
        )
        .unwrap();
        assert_eq!(args.width, Some(500.0));
        assert_eq!(args.to_format, OutputFormat::Jpg);
        assert_eq!(args.crop_focus, Some(CropFocus::North));
        assert!(!args.jpeg_progressive());
    }

    #[test]
    fn args_keep_unknown_fields() {
        let args: TransformArgs =
            serde_json::from_str(r#"{"toFormat": "png", "maxWidth": 800, "sharpen": true}"#)
                .unwrap();
        assert_eq!(args.extra.get("maxWidth"), Some(&Value::from(800)));
        assert_eq!(args.extra.get("sharpen"), Some(&Value::Bool(true)));
        assert_eq!(args.to_format, OutputFormat::Png);
    }

    #[test]
    fn args_still_require_a_format() {
        let result: Result<TransformArgs, _> = serde_json::from_str(r#"{"width": 10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn heal_fills_only_absent_fields() {
        let mut args = TransformArgs::new(OutputFormat::Png);
        args.quality = Some(80);
        let healed = args.heal(&TransformDefaults::default());
        assert_eq!(healed.quality, Some(80));
        assert_eq!(healed.png_compression_level, Some(9));
        assert_eq!(healed.png_compression_speed, Some(4));
        assert_eq!(healed.jpeg_progressive, Some(true));
    }

    #[test]
    fn explicit_rotation_ignores_zero() {
        let mut args = TransformArgs::new(OutputFormat::Jpg);
        assert_eq!(args.explicit_rotation(), None);
        args.rotate = Some(0);
        assert_eq!(args.explicit_rotation(), None);
        args.rotate = Some(90);
        assert_eq!(args.explicit_rotation(), Some(90));
    }

    #[test]
    fn only_jpeg_lacks_alpha() {
        assert!(!OutputFormat::Jpg.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
        assert!(OutputFormat::Webp.supports_alpha());
    }
}
