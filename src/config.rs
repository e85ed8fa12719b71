//! Tool configuration module.
//!
//! Handles loading, validating, and merging `magick.toml`. Stock defaults are
//! overridden by whatever keys the user file sets; everything else keeps its
//! default value.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! tool_dir = "/usr/bin"     # Directory holding the `convert` and `composite` executables
//! # temp_dir = "/tmp"       # Where session temp files are allocated (default: system temp dir)
//! working_quality = 100     # -quality passed when writing intermediate files (1-100)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The directory itself is checked when a [`Magick`](crate::imaging::Magick)
//! context is built from the config, not at load time: a config file is
//! allowed to describe a machine other than the one reading it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name looked up by [`load_config`].
pub const CONFIG_FILENAME: &str = "magick.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("ImageMagick path is not a valid directory: {}", .0.display())]
    ToolDirMissing(PathBuf),
    #[error("ImageMagick could not be invoked ({}): {source}", program.display())]
    ToolUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Driver configuration loaded from `magick.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagickConfig {
    /// Directory containing the ImageMagick executables.
    pub tool_dir: PathBuf,
    /// Directory for session temp files. `None` means the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Encoding quality for intermediate files.
    pub working_quality: u32,
}

impl Default for MagickConfig {
    fn default() -> Self {
        Self {
            tool_dir: PathBuf::from("/usr/bin"),
            temp_dir: None,
            working_quality: 100,
        }
    }
}

impl MagickConfig {
    /// Config pointing at `tool_dir`, everything else stock.
    pub fn with_tool_dir(tool_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_dir: tool_dir.into(),
            ..Self::default()
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("tool_dir must not be empty".into()));
        }
        if !(1..=100).contains(&self.working_quality) {
            return Err(ConfigError::Validation(
                "working_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Effective temp directory: the configured one, else the system default.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MagickConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(file: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !file.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(file)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<MagickConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MagickConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `magick.toml` from the given file path.
pub fn load_config_file(file: &Path) -> Result<MagickConfig, ConfigError> {
    resolve_config(load_raw_config(file)?)
}

/// Load `magick.toml` from a directory.
pub fn load_config(dir: &Path) -> Result<MagickConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILENAME))
}

/// Returns a fully-commented stock `magick.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# magick-session configuration
# =============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding the ImageMagick executables (`convert`, `composite`).
# On Windows the `.exe` suffix is appended automatically.
tool_dir = "/usr/bin"

# Directory where session temp files are allocated.
# Omit to use the system temp directory.
# temp_dir = "/tmp"

# -quality used when writing intermediate files between edits (1-100).
working_quality = 100
"##
}
