//! Error types for the ImgPress conversion pipeline.
//!
//! Errors are organized by concern. Per-file conversion errors carry a
//! user-facing message because a failed job stores that text verbatim.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::TargetFormat;

/// Top-level error type for ImgPress operations.
#[derive(Error, Debug)]
pub enum ImgPressError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single file's conversion failed
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Preset persistence failed
    #[error("Preset store error: {0}")]
    Store(#[from] StoreError),

    /// A batch command was rejected
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-file conversion errors, one per engine step that can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The input could not be stat'ed, opened or decoded
    #[error("Couldn't read the original image {}: {message}", path.display())]
    ImageReadFailed { path: PathBuf, message: String },

    /// The transcoder has no encoder for the target format
    #[error("{0} is not supported by the available encoder.")]
    UnsupportedFormat(TargetFormat),

    /// The output file could not be created
    #[error("Failed to create the {0} destination file.")]
    DestinationCreationFailed(TargetFormat),

    /// Encoding or finalizing the output failed
    #[error("Image conversion failed for {}: {message}", path.display())]
    ConversionFailed { path: PathBuf, message: String },

    /// The output directory could not be created
    #[error("Couldn't create output directory at {}.", .0.display())]
    DirectoryCreationFailed(PathBuf),
}

/// Conditions raised while registering a drop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropError {
    /// Discovery found no acceptable image in the dropped paths
    #[error("No supported image files found. Drop a supported image file to get started.")]
    NoUsableFiles,
}

/// Rejected orchestrator commands.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A batch run is already active
    #[error("A conversion is already running")]
    AlreadyRunning,

    /// There are no pending jobs to convert
    #[error(transparent)]
    NoUsableFiles(#[from] DropError),
}

/// Key-value persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Writing to durable storage failed
    #[error("Failed to write {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the preset list failed
    #[error("Failed to encode presets: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for ImgPress results.
pub type Result<T> = std::result::Result<T, ImgPressError>;

/// Convenience type alias for per-file conversion results.
pub type ConversionOutcome<T> = std::result::Result<T, ConversionError>;
