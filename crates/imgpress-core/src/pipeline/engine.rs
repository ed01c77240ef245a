//! Single-file conversion: directory prep, decode, transform, encode, measure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::transcoder::{ImageTranscoder, TranscodeOptions};
use crate::error::{ConversionError, ConversionOutcome};
use crate::orchestrator::InputItem;
use crate::types::{ConversionForm, ConversionResult, ConversionStage};

/// Converts one input under a form using an [`ImageTranscoder`].
///
/// Outputs are named `<dir>/<stem><suffix>.<ext>`. Converting the same input
/// with the same form twice overwrites the earlier output.
#[derive(Clone)]
pub struct ConversionEngine {
    transcoder: Arc<dyn ImageTranscoder>,
}

impl ConversionEngine {
    pub fn new(transcoder: Arc<dyn ImageTranscoder>) -> Self {
        Self { transcoder }
    }

    pub fn transcoder(&self) -> &Arc<dyn ImageTranscoder> {
        &self.transcoder
    }

    /// Convert one input. Errors carry the message a failed job displays.
    pub fn convert(
        &self,
        item: &InputItem,
        form: &ConversionForm,
    ) -> ConversionOutcome<ConversionResult> {
        self.convert_with_progress(item, form, None)
    }

    /// Same as [`convert`](Self::convert), reporting each stage as it begins.
    pub fn convert_with_progress(
        &self,
        item: &InputItem,
        form: &ConversionForm,
        progress: Option<&dyn Fn(ConversionStage)>,
    ) -> ConversionOutcome<ConversionResult> {
        let report = |stage: ConversionStage| {
            if let Some(callback) = progress {
                callback(stage);
            }
        };
        let input = item.path.as_path();
        let start = Instant::now();

        let original_size = std::fs::metadata(input)
            .map_err(|e| ConversionError::ImageReadFailed {
                path: input.to_path_buf(),
                message: e.to_string(),
            })?
            .len();

        report(ConversionStage::EnsuringOutputDirectory);
        let output_dir = expand_directory(&form.output_directory_path);
        std::fs::create_dir_all(&output_dir)
            .map_err(|_| ConversionError::DirectoryCreationFailed(output_dir.clone()))?;
        let output = Self::output_path(input, &output_dir, form);

        let tag = self
            .transcoder
            .format_tag(form.format)
            .ok_or(ConversionError::UnsupportedFormat(form.format))?;

        report(ConversionStage::LoadingInput);
        let source = self.transcoder.decode_metadata(input)?;
        tracing::trace!(
            "  Decoded header {}x{} in {:?}",
            source.width,
            source.height,
            start.elapsed()
        );

        let max_dimension = if form.resize_enabled() {
            report(ConversionStage::Resizing);
            Some(scaled_dimension(source.width, source.height, form.resize_percent))
        } else {
            None
        };
        let options = TranscodeOptions {
            quality: form
                .format
                .supports_quality()
                .then(|| (form.quality / 100.0).clamp(0.0, 1.0) as f32),
            max_dimension,
            metadata: if form.preserve_metadata {
                source.metadata
            } else {
                None
            },
        };

        report(ConversionStage::WritingOutput);
        self.transcoder.transcode(input, &output, tag, &options)?;

        let output_size = std::fs::metadata(&output)
            .map_err(|e| ConversionError::ConversionFailed {
                path: output.clone(),
                message: e.to_string(),
            })?
            .len();
        report(ConversionStage::Finished);

        let duration = start.elapsed();
        tracing::debug!(
            "Converted {:?} -> {:?} ({} -> {} bytes) in {:?}",
            item.display_name,
            output,
            original_size,
            output_size,
            duration
        );

        Ok(ConversionResult {
            original_size,
            output_size,
            output_path: output,
            duration,
        })
    }

    /// Where `input` lands when converted with `form` into `output_dir`.
    pub fn output_path(input: &Path, output_dir: &Path, form: &ConversionForm) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        output_dir.join(format!(
            "{}{}.{}",
            stem,
            form.filename_suffix,
            form.format.file_extension()
        ))
    }
}

/// Expand a leading `~` in a form's output directory.
pub fn expand_directory(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Longest edge after scaling by `percent`, never below 1.
fn scaled_dimension(width: u32, height: u32, percent: f64) -> u32 {
    let longest = width.max(height) as f64;
    ((longest * percent / 100.0) as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::MockTranscoder;
    use crate::types::TargetFormat;
    use std::cell::RefCell;

    fn setup(
        transcoder: MockTranscoder,
    ) -> (tempfile::TempDir, Arc<MockTranscoder>, ConversionEngine) {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Arc::new(transcoder);
        let engine = ConversionEngine::new(transcoder.clone());
        (dir, transcoder, engine)
    }

    fn input(dir: &Path, name: &str, bytes: usize) -> InputItem {
        let path = dir.join(name);
        std::fs::write(&path, vec![1u8; bytes]).unwrap();
        InputItem::new(path, None)
    }

    fn form(out: &Path) -> ConversionForm {
        ConversionForm {
            output_directory_path: out.to_string_lossy().into_owned(),
            ..ConversionForm::default()
        }
    }

    #[test]
    fn test_convert_measures_sizes_and_names_output() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "holiday.heic", 1000);
        let mut form = form(&dir.path().join("out"));
        form.filename_suffix = "_web".to_string();

        let result = engine.convert(&item, &form).unwrap();
        assert_eq!(result.original_size, 1000);
        assert_eq!(result.output_size, 64);
        assert_eq!(result.output_path, dir.path().join("out/holiday_web.jpg"));
        assert!(result.is_smaller());
    }

    #[test]
    fn test_convert_creates_nested_output_directory() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.png", 10);
        let form = form(&dir.path().join("deep/nested/out"));

        engine.convert(&item, &form).unwrap();
        assert!(dir.path().join("deep/nested/out/a.jpg").is_file());
    }

    #[test]
    fn test_convert_missing_input_is_read_failure() {
        let (dir, transcoder, engine) = setup(MockTranscoder::new());
        let item = InputItem::new(dir.path().join("gone.jpg"), None);

        let err = engine.convert(&item, &form(dir.path())).unwrap_err();
        assert!(matches!(err, ConversionError::ImageReadFailed { .. }));
        assert_eq!(transcoder.calls(), 0);
    }

    #[test]
    fn test_convert_uncreatable_directory() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.jpg", 10);
        // A regular file where a directory component is expected
        std::fs::write(dir.path().join("blocker"), b"x").unwrap();

        let err = engine
            .convert(&item, &form(&dir.path().join("blocker/out")))
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::DirectoryCreationFailed(dir.path().join("blocker/out"))
        );
        assert!(err.to_string().contains("directory"));
    }

    #[test]
    fn test_convert_unsupported_format() {
        let mut mock = MockTranscoder::new();
        mock.unsupported = vec![TargetFormat::Avif];
        let (dir, _transcoder, engine) = setup(mock);
        let item = input(dir.path(), "a.jpg", 10);
        let mut form = form(dir.path());
        form.format = TargetFormat::Avif;

        let err = engine.convert(&item, &form).unwrap_err();
        assert_eq!(err, ConversionError::UnsupportedFormat(TargetFormat::Avif));
    }

    #[test]
    fn test_convert_undecodable_input() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "corrupt.jpg", 10);

        let err = engine.convert(&item, &form(dir.path())).unwrap_err();
        assert!(matches!(err, ConversionError::ImageReadFailed { .. }));
    }

    #[test]
    fn test_options_quality_only_for_lossy_formats() {
        let (dir, transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.jpg", 10);
        let mut form = form(dir.path());
        form.quality = 80.0;

        engine.convert(&item, &form).unwrap();
        assert_eq!(transcoder.last_options().unwrap().quality, Some(0.8));

        form.format = TargetFormat::Png;
        engine.convert(&item, &form).unwrap();
        assert_eq!(transcoder.last_options().unwrap().quality, None);
    }

    #[test]
    fn test_options_resize_and_metadata() {
        let (dir, transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.jpg", 10);
        let mut form = form(dir.path());

        engine.convert(&item, &form).unwrap();
        let options = transcoder.last_options().unwrap();
        assert_eq!(options.max_dimension, None);
        assert!(options.metadata.is_some());

        form.resize_percent = 50.0;
        form.preserve_metadata = false;
        engine.convert(&item, &form).unwrap();
        let options = transcoder.last_options().unwrap();
        assert_eq!(options.max_dimension, Some(200));
        assert!(options.metadata.is_none());
    }

    #[test]
    fn test_scaled_dimension_never_below_one() {
        assert_eq!(scaled_dimension(400, 300, 50.0), 200);
        assert_eq!(scaled_dimension(300, 400, 25.0), 100);
        assert_eq!(scaled_dimension(10, 10, 1.0), 1);
        assert_eq!(scaled_dimension(10, 10, 0.0), 1);
    }

    #[test]
    fn test_second_conversion_overwrites() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.jpg", 10);
        let form = form(dir.path().join("out").as_path());

        let first = engine.convert(&item, &form).unwrap();
        let second = engine.convert(&item, &form).unwrap();
        assert_eq!(first.output_path, second.output_path);
    }

    #[test]
    fn test_progress_reports_stages_in_order() {
        let (dir, _transcoder, engine) = setup(MockTranscoder::new());
        let item = input(dir.path(), "a.jpg", 10);
        let mut form = form(dir.path());
        form.resize_percent = 50.0;

        let seen = RefCell::new(Vec::new());
        let record = |stage: ConversionStage| seen.borrow_mut().push(stage);
        engine
            .convert_with_progress(&item, &form, Some(&record))
            .unwrap();

        assert_eq!(
            seen.into_inner(),
            vec![
                ConversionStage::EnsuringOutputDirectory,
                ConversionStage::LoadingInput,
                ConversionStage::Resizing,
                ConversionStage::WritingOutput,
                ConversionStage::Finished,
            ]
        );
    }

    #[test]
    fn test_expand_directory_tilde() {
        let expanded = expand_directory("~/Desktop/ImgPress");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("Desktop/ImgPress"));
    }
}
