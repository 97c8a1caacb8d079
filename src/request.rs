//! Turn a transforms file into concrete [`TransformRequest`]s.
//!
//! A transforms file is a JSON array of specs:
//!
//! ```json
//! [
//!   { "args": { "toFormat": "webp", "width": 800 } },
//!   { "outputPath": "hero.jpg", "args": { "toFormat": "jpg", "quality": 80 } }
//! ]
//! ```
//!
//! Specs without an `outputPath` are named `<stem>-<fingerprint>.<ext>` in the
//! output directory. Relative paths are resolved against the output directory.
//! Args are healed with the configured defaults before fingerprinting, so an
//! explicit `"quality": 50` and an omitted quality name the same file.

use crate::fingerprint::fingerprint;
use crate::imaging::{TransformArgs, TransformDefaults};
use crate::process::TransformRequest;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid transforms file: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of a transforms file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestSpec {
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    pub args: TransformArgs,
}

/// Read a transforms file.
pub fn load_specs(path: &Path) -> Result<Vec<RequestSpec>, RequestError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Output file name for `args` applied to `source`.
pub fn derived_file_name(source: &Path, args: &TransformArgs) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "image".into());
    format!(
        "{}-{}.{}",
        stem,
        fingerprint(args),
        args.to_format.extension()
    )
}

/// Heal, name and de-duplicate specs.
///
/// Later specs resolving to an output path already taken are dropped; when
/// the path was derived, the fingerprint guarantees they are the same output.
pub fn plan_requests(
    source: &Path,
    specs: Vec<RequestSpec>,
    out_dir: &Path,
    defaults: &TransformDefaults,
) -> Vec<TransformRequest> {
    let mut seen = HashSet::new();
    let mut requests = Vec::with_capacity(specs.len());

    for spec in specs {
        let args = spec.args.heal(defaults);
        let output_path = match spec.output_path {
            Some(path) => out_dir.join(path),
            None => out_dir.join(derived_file_name(source, &args)),
        };
        if !seen.insert(output_path.clone()) {
            log::debug!("skipping duplicate {}", output_path.display());
            continue;
        }
        requests.push(TransformRequest { output_path, args });
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::OutputFormat;
    use tempfile::TempDir;

    fn specs(json: &str) -> Vec<RequestSpec> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn derived_name_uses_stem_fingerprint_and_extension() {
        let args = TransformArgs::new(OutputFormat::Webp);
        let name = derived_file_name(Path::new("/photos/sunset.JPG"), &args);
        let fp = fingerprint(&args);
        assert_eq!(name, format!("sunset-{fp}.webp"));
    }

    #[test]
    fn explicit_paths_resolve_against_out_dir() {
        let planned = plan_requests(
            Path::new("in.png"),
            specs(r#"[{"outputPath": "hero.jpg", "args": {"toFormat": "jpg"}}]"#),
            Path::new("/out"),
            &TransformDefaults::default(),
        );
        assert_eq!(planned[0].output_path, PathBuf::from("/out/hero.jpg"));
    }

    #[test]
    fn args_are_healed() {
        let planned = plan_requests(
            Path::new("in.png"),
            specs(r#"[{"args": {"toFormat": "png", "quality": 70}}]"#),
            Path::new("out"),
            &TransformDefaults::default(),
        );
        let args = &planned[0].args;
        assert_eq!(args.quality, Some(70));
        assert_eq!(args.png_compression_level, Some(9));
        assert_eq!(args.png_compression_speed, Some(4));
        assert_eq!(args.jpeg_progressive, Some(true));
    }

    #[test]
    fn equivalent_specs_are_planned_once() {
        let planned = plan_requests(
            Path::new("in.png"),
            specs(
                r#"[
                    {"args": {"toFormat": "jpg", "width": 500}},
                    {"args": {"width": 500.0, "toFormat": "jpeg", "quality": 50}},
                    {"args": {"toFormat": "jpg", "width": 500, "pngCompressionSpeed": 1}},
                    {"args": {"toFormat": "jpg", "width": 400}}
                ]"#,
            ),
            Path::new("out"),
            &TransformDefaults::default(),
        );
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[1].args.width, Some(400.0));
    }

    #[test]
    fn load_specs_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("transforms.json");
        std::fs::write(&path, r#"[{"args": {"toFormat": "tiff", "grayscale": true}}]"#).unwrap();
        let loaded = load_specs(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].args.grayscale);
        assert_eq!(loaded[0].output_path, None);
    }

    #[test]
    fn load_specs_rejects_unsupported_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("transforms.json");
        std::fs::write(&path, r#"[{"args": {"toFormat": "avif"}}]"#).unwrap();
        assert!(matches!(load_specs(&path), Err(RequestError::Json(_))));
    }

    #[test]
    fn caller_specific_args_do_not_change_derived_names() {
        let planned = plan_requests(
            Path::new("in.png"),
            specs(
                r#"[
                    {"args": {"toFormat": "webp", "width": 300}},
                    {"args": {"toFormat": "webp", "width": 300, "maxWidth": 1200}}
                ]"#,
            ),
            Path::new("out"),
            &TransformDefaults::default(),
        );
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn load_specs_missing_file_is_io_error() {
        assert!(matches!(
            load_specs(Path::new("/nonexistent/transforms.json")),
            Err(RequestError::Io(_))
        ));
    }
}
