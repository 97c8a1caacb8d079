//! Tool configuration module.
//!
//! Handles loading, validating, and merging `pixfan.toml`. Stock defaults are
//! the base layer; the user file overrides only the keys it names, and CLI
//! flags override both.
//!
//! ## Config File Location
//!
//! `pixfan process` reads `pixfan.toml` from the working directory when it
//! exists, or the file named by `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! strip_metadata = false      # Drop the ICC profile and ancillary chunks
//! use_mozjpeg = false         # Re-encode JPEG output through mozjpeg
//!
//! [defaults]
//! quality = 50                # Lossy quality (1-100) when a transform omits it
//! png_compression_level = 9   # zlib level (0-9) of the intermediate PNG
//! png_compression_speed = 4   # Quantizer speed (1 slow/best - 11 fast/rough)
//! jpeg_progressive = true     # Progressive scans (mozjpeg path only)
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::TransformDefaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "pixfan.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `pixfan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PixfanConfig {
    /// Batch-wide output switches.
    pub output: OutputConfig,
    /// Values healed into transforms that omit them.
    pub defaults: TransformDefaults,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PixfanConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.defaults.quality) {
            return Err(ConfigError::Validation(
                "defaults.quality must be 1-100".into(),
            ));
        }
        if self.defaults.png_compression_level > 9 {
            return Err(ConfigError::Validation(
                "defaults.png_compression_level must be 0-9".into(),
            ));
        }
        if !(1..=11).contains(&self.defaults.png_compression_speed) {
            return Err(ConfigError::Validation(
                "defaults.png_compression_speed must be 1-11".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub strip_metadata: bool,
    pub use_mozjpeg: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel transform workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PixfanConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value; `Ok(None)` when it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PixfanConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PixfanConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path` (a missing file means stock defaults).
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<PixfanConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        log::debug!("config: {}", path.display());
    }
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `pixfan.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixfan Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# pixfan reads ./pixfan.toml, or the file given with --config.
# Command-line flags override values set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output switches, applied to every transform in a batch
# ---------------------------------------------------------------------------
[output]
# Leave the embedded ICC profile and ancillary chunks out of every output.
strip_metadata = false
# Re-encode JPEG output through mozjpeg. Required for progressive JPEG.
use_mozjpeg = false

# ---------------------------------------------------------------------------
# Defaults filled into transforms that omit the field
# ---------------------------------------------------------------------------
[defaults]
# Lossy quality, 1-100. For PNG the accepted range is quality..quality+25.
quality = 50
# zlib level of the intermediate PNG, 0-9.
png_compression_level = 9
# PNG quantizer speed: 1 (slow, best) to 11 (fast, rough).
png_compression_speed = 4
# Progressive scans for mozjpeg output.
jpeg_progressive = true

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel transform workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = PixfanConfig::default();
        assert!(!config.output.strip_metadata);
        assert!(!config.output.use_mozjpeg);
        assert_eq!(config.defaults.quality, 50);
        assert_eq!(config.defaults.png_compression_level, 9);
        assert_eq!(config.defaults.png_compression_speed, 4);
        assert!(config.defaults.jpeg_progressive);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[defaults]
quality = 80
"#;
        let config: PixfanConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.quality, 80);
        assert_eq!(config.defaults.png_compression_speed, 4);
        assert!(!config.output.use_mozjpeg);
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: PixfanConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PixfanConfig::default());
    }

    // =========================================================================
    // ProcessingConfig tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
use_mozjpeg = true
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("use_mozjpeg").unwrap().as_bool(), Some(true));
        assert_eq!(output.get("strip_metadata").unwrap().as_bool(), Some(false));
        assert_eq!(
            merged
                .get("defaults")
                .unwrap()
                .get("quality")
                .unwrap()
                .as_integer(),
            Some(50)
        );
    }

    // =========================================================================
    // Unknown key rejection
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[defaults]
qualty = 90
"#;
        let result: Result<PixfanConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[outputs]
use_mozjpeg = true
"#;
        let result: Result<PixfanConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(PixfanConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_range() {
        let mut config = PixfanConfig::default();
        config.defaults.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.defaults.quality = 101;
        assert!(config.validate().is_err());
        config.defaults.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_png_settings() {
        let mut config = PixfanConfig::default();
        config.defaults.png_compression_level = 10;
        assert!(config.validate().is_err());

        let mut config = PixfanConfig::default();
        config.defaults.png_compression_speed = 12;
        assert!(config.validate().is_err());
        config.defaults.png_compression_speed = 11;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = PixfanConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, PixfanConfig::default());
    }

    #[test]
    fn load_config_reads_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[output]
strip_metadata = true

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.output.strip_metadata);
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.defaults.quality, 50);
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[defaults]\nquality = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "this is not toml [").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }
}
