//! Short, deterministic identifiers for transform args.
//!
//! Two transforms that would produce the same output bytes get the same
//! fingerprint, regardless of key order, irrelevant tuning fields, or
//! fields that only matter to a different output format. Callers typically
//! embed the fingerprint in output file names, which makes it a cache key.
//!
//! ## Derivation
//!
//! ```text
//! TransformArgs ──serialize──▶ JSON object (camelCase keys)
//!               ──whitelist──▶ only keys that change output bytes
//!               ──drop falsy─▶ no null / false / 0 / ""
//!               ──prune──────▶ jpg drops /png/i keys, png drops /jpe?g/i keys
//!               ──canonical──▶ sorted-key JSON
//!               ──MD5────────▶ 32 hex chars, keep the last 5
//! ```
//!
//! Dropping falsy values means `rotate: 0` and an absent `rotate` fingerprint
//! identically, as do `grayscale: false` and no `grayscale`.

use crate::imaging::{OutputFormat, TransformArgs};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Keys that can change the encoded output.
const RELEVANT_KEYS: &[&str] = &[
    "height",
    "width",
    "cropFocus",
    "toFormat",
    "pngCompressionLevel",
    "quality",
    "jpegProgressive",
    "grayscale",
    "rotate",
    "duotone",
    "fit",
    "background",
];

/// Number of trailing hex digest characters kept.
const FINGERPRINT_LEN: usize = 5;

/// Five lowercase hex characters identifying a transform's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArgsFingerprint(String);

impl ArgsFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArgsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArgsFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fingerprint `args`.
pub fn fingerprint(args: &TransformArgs) -> ArgsFingerprint {
    let canonical = fingerprint_canonical(args);
    let digest = format!("{:x}", Md5::digest(canonical.as_bytes()));
    ArgsFingerprint(digest[digest.len() - FINGERPRINT_LEN..].to_string())
}

/// The canonical JSON that [`fingerprint`] hashes.
pub fn fingerprint_canonical(args: &TransformArgs) -> String {
    let fields = match serde_json::to_value(args) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let relevant: BTreeMap<String, Value> = fields
        .into_iter()
        .filter(|(key, _)| RELEVANT_KEYS.contains(&key.as_str()))
        .filter(|(_, value)| !is_falsy(value))
        .filter(|(key, _)| !is_other_format_key(args.to_format, key))
        .map(|(key, value)| (key, canonical_value(value)))
        .collect();

    // BTreeMap serializes in key order; nested objects go through canonical_value
    serde_json::to_string(&relevant).unwrap_or_default()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Keys that only tune an encoder the target format never uses.
fn is_other_format_key(format: OutputFormat, key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    match format {
        OutputFormat::Jpg => key.contains("png"),
        OutputFormat::Png => key.contains("jpg") || key.contains("jpeg"),
        OutputFormat::Webp | OutputFormat::Tiff => false,
    }
}

/// Sort nested object keys and write integral floats as integers,
/// so `500` and `500.0` hash the same.
fn canonical_value(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonical_value(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical_value).collect()),
        other => other,
    }
}
