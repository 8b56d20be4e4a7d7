//! Sanitizer configuration module.
//!
//! Handles loading, validating, and merging `upload-scrub.toml`. Stock
//! defaults are overridden by the user's config file, and command-line flags
//! override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_bytes = 4194304       # Output byte budget (4 MiB)
//! max_dimension = 1920      # Longer edge bound in pixels
//!
//! [output]
//! format = "jpeg"           # "jpeg" or "preserve-source"
//!
//! [search]
//! initial_quality = 92      # First attempt (percent)
//! quality_step = 10         # Percentage points per step
//! quality_floor = 30        # Shrink dimensions once quality is at or below this
//! reset_quality = 70        # Quality after each shrink
//! shrink_factor = 0.8       # Longer edge multiplier per shrink
//! dimension_floor = 800     # Longer edge never shrinks below this
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown
//! keys are rejected to catch typos early.

use crate::imaging::{Budget, OutputFormat, Quality, SearchPolicy};
use crate::sanitize::SanitizeOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "upload-scrub.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `upload-scrub.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrubConfig {
    /// Byte budget and dimension bound.
    pub limits: LimitsConfig,
    /// Encoded output format.
    pub output: OutputConfig,
    /// Quality/dimension search ladder.
    pub search: SearchConfig,
}

/// Byte budget and dimension bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_bytes: u64,
    pub max_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let budget = Budget::default();
        Self {
            max_bytes: budget.max_bytes,
            max_dimension: budget.max_dimension,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Search ladder settings, in percent for qualities and pixels for edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub initial_quality: u32,
    pub quality_step: u32,
    pub quality_floor: u32,
    pub reset_quality: u32,
    pub shrink_factor: f64,
    pub dimension_floor: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let policy = SearchPolicy::default();
        Self {
            initial_quality: policy.initial_quality.value(),
            quality_step: policy.quality_step,
            quality_floor: policy.quality_floor.value(),
            reset_quality: policy.reset_quality.value(),
            shrink_factor: policy.shrink_factor,
            dimension_floor: policy.dimension_floor,
        }
    }
}

impl SearchConfig {
    pub fn to_policy(&self) -> SearchPolicy {
        SearchPolicy {
            initial_quality: Quality::new(self.initial_quality),
            quality_step: self.quality_step,
            quality_floor: Quality::new(self.quality_floor),
            reset_quality: Quality::new(self.reset_quality),
            shrink_factor: self.shrink_factor,
            dimension_floor: self.dimension_floor,
        }
    }
}

impl ScrubConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_bytes must be positive".into(),
            ));
        }
        if self.limits.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "limits.max_dimension must be positive".into(),
            ));
        }
        let s = &self.search;
        if s.initial_quality == 0 || s.initial_quality > 100 {
            return Err(ConfigError::Validation(
                "search.initial_quality must be 1-100".into(),
            ));
        }
        if s.quality_step == 0 {
            return Err(ConfigError::Validation(
                "search.quality_step must be positive".into(),
            ));
        }
        if s.quality_floor == 0 || s.quality_floor >= s.reset_quality {
            return Err(ConfigError::Validation(
                "search.quality_floor must be at least 1 and below reset_quality".into(),
            ));
        }
        if s.reset_quality > s.initial_quality {
            return Err(ConfigError::Validation(
                "search.reset_quality must not exceed initial_quality".into(),
            ));
        }
        if !(s.shrink_factor > 0.0 && s.shrink_factor < 1.0) {
            return Err(ConfigError::Validation(
                "search.shrink_factor must be between 0 and 1 (exclusive)".into(),
            ));
        }
        if s.dimension_floor == 0 {
            return Err(ConfigError::Validation(
                "search.dimension_floor must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Build sanitize options from this config.
    pub fn to_options(&self) -> SanitizeOptions {
        SanitizeOptions {
            budget: Budget {
                max_bytes: self.limits.max_bytes,
                max_dimension: self.limits.max_dimension,
            },
            output: self.output.format,
            policy: self.search.to_policy(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ScrubConfig::default()).expect("default config must serialize")
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

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ScrubConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ScrubConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ScrubConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `upload-scrub.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# upload-scrub Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--max-bytes, --max-dimension, --preserve-format)
# override the values in this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output limits
# ---------------------------------------------------------------------------
[limits]
# Byte budget for each sanitized image (4 MiB).
max_bytes = 4194304

# Longer edge bound in pixels. Larger images are scaled down, aspect ratio
# preserved. Smaller images are never scaled up.
max_dimension = 1920

# ---------------------------------------------------------------------------
# Output format
# ---------------------------------------------------------------------------
[output]
# "jpeg" re-encodes everything as JPEG (alpha is dropped).
# "preserve-source" keeps PNG and GIF sources in their own format.
format = "jpeg"

# ---------------------------------------------------------------------------
# Search ladder
# ---------------------------------------------------------------------------
# Each image is encoded at initial_quality. While it is over budget, quality
# drops by quality_step. Once quality is at or below quality_floor, the
# longer edge shrinks by shrink_factor (never below dimension_floor) and
# quality resets to reset_quality. When both floors are reached, the last
# attempt is kept even if it is still over budget.
[search]
initial_quality = 92
quality_step = 10
quality_floor = 30
reset_quality = 70
shrink_factor = 0.8
dimension_floor = 800
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_upload_defaults() {
        let config = ScrubConfig::default();
        assert_eq!(config.limits.max_bytes, 4_194_304);
        assert_eq!(config.limits.max_dimension, 1920);
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        assert_eq!(config.search.initial_quality, 92);
        assert_eq!(config.search.quality_floor, 30);
        assert_eq!(config.search.reset_quality, 70);
        assert_eq!(config.search.dimension_floor, 800);
    }

    #[test]
    fn default_options_match_default_config() {
        assert_eq!(ScrubConfig::default().to_options(), SanitizeOptions::default());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[limits]
max_bytes = 1048576
"##;
        let config: ScrubConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.limits.max_bytes, 1_048_576);
        // Default values preserved
        assert_eq!(config.limits.max_dimension, 1920);
        assert_eq!(config.search.quality_step, 10);
    }

    #[test]
    fn parse_output_and_search() {
        let toml = r##"
[output]
format = "preserve-source"

[search]
quality_floor = 40
shrink_factor = 0.5
"##;
        let config: ScrubConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.output.format, OutputFormat::PreserveSource);
        let policy = config.search.to_policy();
        assert_eq!(policy.quality_floor, Quality::new(40));
        assert_eq!(policy.shrink_factor, 0.5);
        assert_eq!(policy.initial_quality, Quality::new(92));
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r##"
[limits]
max_byte = 10
"##;
        let result: Result<ScrubConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_output_format_rejected() {
        let toml = r##"
[output]
format = "webp"
"##;
        let result: Result<ScrubConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn validate_default_ok() {
        assert!(ScrubConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let mut config = ScrubConfig::default();
        config.limits.max_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_dimension() {
        let mut config = ScrubConfig::default();
        config.limits.max_dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_floor_above_reset() {
        let mut config = ScrubConfig::default();
        config.search.quality_floor = 70;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_reset_above_initial() {
        let mut config = ScrubConfig::default();
        config.search.reset_quality = 95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_shrink_factor() {
        for factor in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            let mut config = ScrubConfig::default();
            config.search.shrink_factor = factor;
            assert!(config.validate().is_err(), "accepted {factor}");
        }
    }

    #[test]
    fn validate_rejects_zero_step() {
        let mut config = ScrubConfig::default();
        config.search.quality_step = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, ScrubConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r##"
[limits]
max_dimension = 1080

[search]
dimension_floor = 600
"##,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.limits.max_dimension, 1080);
        assert_eq!(config.search.dimension_floor, 600);
        assert_eq!(config.limits.max_bytes, 4_194_304);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[limits]\nmax_bytes = 0\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_overlay_wins_on_scalars() {
        let base: toml::Value = toml::from_str("[limits]\nmax_bytes = 1\nmax_dimension = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[limits]\nmax_bytes = 5").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["limits"]["max_bytes"].as_integer(), Some(5));
        assert_eq!(merged["limits"]["max_dimension"].as_integer(), Some(2));
    }

    #[test]
    fn merge_adds_new_tables() {
        let base: toml::Value = toml::from_str("[limits]\nmax_bytes = 1").unwrap();
        let overlay: toml::Value = toml::from_str("[output]\nformat = \"jpeg\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert!(merged.get("limits").is_some());
        assert!(merged.get("output").is_some());
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ScrubConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ScrubConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[limits]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("[search]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        assert!(val.get("limits").is_some());
        assert!(val.get("output").is_some());
        assert!(val.get("search").is_some());
    }
}
