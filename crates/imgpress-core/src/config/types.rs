//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{ConversionForm, TargetFormat};

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding persisted presets and preferences
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.imgpress"),
        }
    }
}

/// Defaults for a fresh conversion form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Where converted files are written unless a run overrides it
    pub output_dir: String,

    /// Target format before any preset is applied
    pub format: TargetFormat,

    /// Lossy quality, 0-100
    pub quality: f64,

    /// Keep EXIF metadata in outputs
    pub preserve_metadata: bool,

    /// Appended to output base names
    pub filename_suffix: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: ConversionForm::DEFAULT_OUTPUT_DIR.to_string(),
            format: TargetFormat::Jpeg,
            quality: 75.0,
            preserve_metadata: true,
            filename_suffix: String::new(),
        }
    }
}

impl ConversionConfig {
    /// Build the form a new session starts from.
    pub fn default_form(&self) -> ConversionForm {
        ConversionForm {
            format: self.format,
            quality: self.quality,
            preserve_metadata: self.preserve_metadata,
            resize_percent: 100.0,
            output_directory_path: self.output_dir.clone(),
            filename_suffix: self.filename_suffix.clone(),
        }
    }
}

/// Drop registration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Accepted files are published to the job list in chunks of this size
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: 20 }
    }
}

/// Thumbnail preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Maximum number of cached previews
    pub cache_capacity: usize,

    /// Preview size in pixels (longest edge)
    pub max_dimension: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 100,
            max_dimension: 80,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
