//! Scripted transcoder shared by engine, orchestrator and facade tests.

use image::DynamicImage;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::transcoder::{FormatTag, ImageTranscoder, SourceInfo, TranscodeOptions};
use crate::error::{ConversionError, ConversionOutcome};
use crate::types::TargetFormat;

type Hook = Box<dyn Fn(usize) + Send + Sync>;

/// Deterministic transcoder that writes a fixed number of bytes per output.
///
/// Inputs whose name contains "corrupt" fail to decode. Formats listed in
/// `unsupported` have no format tag.
pub(crate) struct MockTranscoder {
    pub width: u32,
    pub height: u32,
    pub output_bytes: usize,
    pub unsupported: Vec<TargetFormat>,
    pub transcode_calls: AtomicUsize,
    pub last_options: Mutex<Option<TranscodeOptions>>,
    on_transcode: Option<Hook>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            width: 400,
            height: 300,
            output_bytes: 64,
            unsupported: Vec::new(),
            transcode_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
            on_transcode: None,
        }
    }

    /// Run `hook` with the zero-based call index before each transcode.
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_transcode = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> usize {
        self.transcode_calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<TranscodeOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

impl ImageTranscoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn format_tag(&self, format: TargetFormat) -> Option<FormatTag> {
        if self.unsupported.contains(&format) {
            return None;
        }
        let codec = match format {
            TargetFormat::Jpeg => image::ImageFormat::Jpeg,
            TargetFormat::Png => image::ImageFormat::Png,
            TargetFormat::WebP => image::ImageFormat::WebP,
            TargetFormat::Avif => image::ImageFormat::Avif,
        };
        Some(FormatTag {
            target: format,
            codec,
        })
    }

    fn decode_metadata(&self, path: &Path) -> ConversionOutcome<SourceInfo> {
        if path.to_string_lossy().contains("corrupt") {
            return Err(ConversionError::ImageReadFailed {
                path: path.to_path_buf(),
                message: "unrecognized data".to_string(),
            });
        }
        Ok(SourceInfo {
            width: self.width,
            height: self.height,
            metadata: Some(super::transcoder::MetadataBlob(b"MM\0*".to_vec())),
        })
    }

    fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        tag: FormatTag,
        options: &TranscodeOptions,
    ) -> ConversionOutcome<()> {
        let index = self.transcode_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_transcode {
            hook(index);
        }
        *self.last_options.lock().unwrap() = Some(options.clone());
        std::fs::write(output, vec![0u8; self.output_bytes])
            .map_err(|_| ConversionError::DestinationCreationFailed(tag.target))
    }

    fn thumbnail(&self, _path: &Path, max_dimension: u32) -> Option<DynamicImage> {
        Some(DynamicImage::new_rgb8(max_dimension, max_dimension))
    }
}
