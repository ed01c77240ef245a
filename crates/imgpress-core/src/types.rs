//! Core value types for the ImgPress conversion pipeline.
//!
//! These types describe what a conversion run is asked to do (`ConversionForm`)
//! and what it produced (`ConversionResult`, `ConversionSummary`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Output image formats a conversion can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Avif,
}

impl TargetFormat {
    /// Every target format, in display order.
    pub const ALL: [TargetFormat; 4] = [Self::Jpeg, Self::Png, Self::WebP, Self::Avif];

    /// Human-readable name ("JPEG", "WebP", ...).
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
            Self::Avif => "AVIF",
        }
    }

    /// File extension used for converted outputs.
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    /// Whether the format has a lossy quality knob.
    pub fn supports_quality(self) -> bool {
        !matches!(self, Self::Png)
    }

    /// Parse a format name or extension (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Parameters for one conversion run.
///
/// The orchestrator copies the current form when a run starts, so edits made
/// while a batch is in flight only affect the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionForm {
    /// Target output format
    pub format: TargetFormat,

    /// Lossy quality, 0-100. Ignored for formats without a quality knob.
    pub quality: f64,

    /// Carry source metadata (EXIF) into the output
    pub preserve_metadata: bool,

    /// Resize percentage of the longest edge. 100 leaves dimensions alone.
    pub resize_percent: f64,

    /// Output directory, `~` is expanded at conversion time
    pub output_directory_path: String,

    /// Appended to the input's base name before the extension
    pub filename_suffix: String,
}

impl ConversionForm {
    /// Default output directory used when a form is built from a preset.
    pub const DEFAULT_OUTPUT_DIR: &'static str = "~/Desktop/ImgPress";

    /// Whether this form asks for a resize.
    pub fn resize_enabled(&self) -> bool {
        self.resize_percent != 100.0
    }
}

impl Default for ConversionForm {
    fn default() -> Self {
        Self {
            format: TargetFormat::Jpeg,
            quality: 75.0,
            preserve_metadata: true,
            resize_percent: 100.0,
            output_directory_path: Self::DEFAULT_OUTPUT_DIR.to_string(),
            filename_suffix: String::new(),
        }
    }
}

/// Named sub-steps of a single file's conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionStage {
    EnsuringOutputDirectory,
    LoadingInput,
    Resizing,
    WritingOutput,
    Finished,
}

impl ConversionStage {
    /// Descriptive label.
    pub fn label(self) -> &'static str {
        match self {
            Self::EnsuringOutputDirectory => "Creating output directory",
            Self::LoadingInput => "Loading image",
            Self::Resizing => "Resizing",
            Self::WritingOutput => "Encoding",
            Self::Finished => "Completed",
        }
    }

    /// Compact label for narrow columns.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::EnsuringOutputDirectory => "Dir",
            Self::LoadingInput => "Load",
            Self::Resizing => "Size",
            Self::WritingOutput => "Encode",
            Self::Finished => "Done",
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of converting one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Input size in bytes
    pub original_size: u64,

    /// Output size in bytes
    pub output_size: u64,

    /// Where the converted file was written
    pub output_path: PathBuf,

    /// Wall-clock time from stat'ing the input to stat'ing the output
    pub duration: Duration,
}

impl ConversionResult {
    /// `output_size - original_size`, negative when the file shrank.
    pub fn size_delta(&self) -> i64 {
        self.output_size as i64 - self.original_size as i64
    }

    /// Size change as a percentage of the original. 0 when the original is empty.
    pub fn percent_change(&self) -> f64 {
        percent_change(self.original_size, self.output_size)
    }

    pub fn is_smaller(&self) -> bool {
        self.output_size <= self.original_size
    }
}

/// Aggregate statistics for a batch run.
///
/// Only produced for runs where at least one file completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Jobs in the run's snapshot
    pub total_files: usize,

    /// Jobs that produced an output
    pub completed_count: usize,

    /// Jobs whose conversion failed
    pub failed_count: usize,

    /// Summed input sizes of completed jobs
    pub total_original_size: u64,

    /// Summed output sizes of completed jobs
    pub total_output_size: u64,

    /// Elapsed time of the whole run
    pub duration: Duration,
}

impl ConversionSummary {
    pub fn total_size_delta(&self) -> i64 {
        self.total_output_size as i64 - self.total_original_size as i64
    }

    pub fn percent_change(&self) -> f64 {
        percent_change(self.total_original_size, self.total_output_size)
    }

    pub fn is_smaller(&self) -> bool {
        self.total_output_size <= self.total_original_size
    }

    /// Run duration divided by completed files, zero when nothing completed.
    pub fn average_time_per_file(&self) -> Duration {
        if self.completed_count == 0 {
            return Duration::ZERO;
        }
        self.duration.div_f64(self.completed_count as f64)
    }

    /// Jobs that were neither completed nor failed (left pending by a stop).
    pub fn skipped_count(&self) -> usize {
        self.total_files
            .saturating_sub(self.completed_count + self.failed_count)
    }
}

fn percent_change(original: u64, output: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let delta = output as f64 - original as f64;
    delta / original as f64 * 100.0
}
