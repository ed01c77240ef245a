//! The image codec capability the conversion engine and thumbnail cache use.
//!
//! [`ImageTranscoder`] is the seam between the pipeline and whatever decodes
//! and re-encodes pixels. [`NativeTranscoder`] implements it on top of the
//! `image` crate, with EXIF handled by `kamadak-exif`.

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use crate::error::{ConversionError, ConversionOutcome};
use crate::types::TargetFormat;

/// Raw EXIF payload (TIFF-structured bytes) carried from input to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlob(pub Vec<u8>);

/// What the transcoder learned from opening an input.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub metadata: Option<MetadataBlob>,
}

/// A target format resolved to the codec that will write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatTag {
    pub target: TargetFormat,
    pub codec: ImageFormat,
}

/// Encoder knobs for one transcode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscodeOptions {
    /// Lossy quality, 0.0-1.0
    pub quality: Option<f32>,
    /// Longest edge of the output; the aspect ratio is kept
    pub max_dimension: Option<u32>,
    /// Metadata to embed in the output
    pub metadata: Option<MetadataBlob>,
}

/// Decodes one image and re-encodes it under given parameters.
pub trait ImageTranscoder: Send + Sync {
    /// Transcoder name for logging.
    fn name(&self) -> &str;

    /// Resolve a target format, `None` if this transcoder can't write it.
    fn format_tag(&self, format: TargetFormat) -> Option<FormatTag>;

    /// Read dimensions and metadata without decoding pixels.
    fn decode_metadata(&self, path: &Path) -> ConversionOutcome<SourceInfo>;

    /// Decode `input` and write it to `output` in the tagged format.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        tag: FormatTag,
        options: &TranscodeOptions,
    ) -> ConversionOutcome<()>;

    /// Best-effort preview no larger than `max_dimension`. Never fails loudly.
    fn thumbnail(&self, path: &Path, max_dimension: u32) -> Option<DynamicImage>;
}

/// Speed setting for the AVIF encoder (1 = slowest, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// Quality used when a lossy format is written without an explicit setting.
const DEFAULT_QUALITY: u8 = 90;

/// Transcoder backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct NativeTranscoder;

impl NativeTranscoder {
    pub fn new() -> Self {
        Self
    }

    fn read_error(path: &Path, e: impl std::fmt::Display) -> ConversionError {
        ConversionError::ImageReadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }

    fn decode(path: &Path) -> ConversionOutcome<DynamicImage> {
        ImageReader::open(path)
            .map_err(|e| Self::read_error(path, e))?
            .with_guessed_format()
            .map_err(|e| Self::read_error(path, e))?
            .decode()
            .map_err(|e| Self::read_error(path, e))
    }

    /// Encode into memory so metadata can be spliced before anything touches disk.
    fn encode(
        image: &DynamicImage,
        target: TargetFormat,
        quality: Option<f32>,
    ) -> image::ImageResult<Vec<u8>> {
        let quality = quality
            .map(|q| (q * 100.0).round().clamp(1.0, 100.0) as u8)
            .unwrap_or(DEFAULT_QUALITY);
        let mut encoded = Vec::new();

        match target {
            TargetFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))?;
            }
            TargetFormat::Png => {
                let normalized = match image {
                    DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                        DynamicImage::ImageRgba16(image.to_rgba16())
                    }
                    other => other.clone(),
                };
                normalized.write_with_encoder(PngEncoder::new(&mut encoded))?;
            }
            TargetFormat::WebP => {
                // The pure-Rust WebP encoder is lossless only
                to_8bit(image).write_with_encoder(WebPEncoder::new_lossless(&mut encoded))?;
            }
            TargetFormat::Avif => {
                to_8bit(image).write_with_encoder(AvifEncoder::new_with_speed_quality(
                    &mut encoded,
                    AVIF_SPEED,
                    quality,
                ))?;
            }
        }

        Ok(encoded)
    }
}

impl ImageTranscoder for NativeTranscoder {
    fn name(&self) -> &str {
        "native"
    }

    fn format_tag(&self, format: TargetFormat) -> Option<FormatTag> {
        let codec = match format {
            TargetFormat::Jpeg => ImageFormat::Jpeg,
            TargetFormat::Png => ImageFormat::Png,
            TargetFormat::WebP => ImageFormat::WebP,
            TargetFormat::Avif => ImageFormat::Avif,
        };
        codec.writing_enabled().then_some(FormatTag {
            target: format,
            codec,
        })
    }

    fn decode_metadata(&self, path: &Path) -> ConversionOutcome<SourceInfo> {
        let (width, height) = ImageReader::open(path)
            .map_err(|e| Self::read_error(path, e))?
            .with_guessed_format()
            .map_err(|e| Self::read_error(path, e))?
            .into_dimensions()
            .map_err(|e| Self::read_error(path, e))?;

        let metadata = File::open(path).ok().and_then(|file| {
            let mut reader = BufReader::new(file);
            exif::Reader::new()
                .read_from_container(&mut reader)
                .ok()
                .map(|exif| MetadataBlob(exif.buf().to_vec()))
        });

        Ok(SourceInfo {
            width,
            height,
            metadata,
        })
    }

    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        tag: FormatTag,
        options: &TranscodeOptions,
    ) -> ConversionOutcome<()> {
        let mut image = Self::decode(input)?;

        if let Some(max) = options.max_dimension {
            // Only ever shrink
            if image.width().max(image.height()) > max {
                image = image.resize(max, max, FilterType::Lanczos3);
            }
        }

        let conversion_failed = |e: &dyn std::fmt::Display| ConversionError::ConversionFailed {
            path: output.to_path_buf(),
            message: e.to_string(),
        };

        let mut encoded =
            Self::encode(&image, tag.target, options.quality).map_err(|e| conversion_failed(&e))?;

        if let Some(metadata) = &options.metadata {
            match tag.target {
                TargetFormat::Jpeg => match embed_exif_in_jpeg(&encoded, &metadata.0) {
                    Some(with_exif) => encoded = with_exif,
                    None => tracing::warn!("EXIF block too large to embed in {:?}", output),
                },
                other => tracing::warn!(
                    "Metadata not embedded: {} output carries no EXIF in this transcoder",
                    other
                ),
            }
        }

        let mut file =
            File::create(output).map_err(|_| ConversionError::DestinationCreationFailed(tag.target))?;
        file.write_all(&encoded)
            .and_then(|_| file.sync_all())
            .map_err(|e| conversion_failed(&e))
    }

    fn thumbnail(&self, path: &Path, max_dimension: u32) -> Option<DynamicImage> {
        match Self::decode(path) {
            Ok(image) => Some(image.thumbnail(max_dimension, max_dimension)),
            Err(e) => {
                tracing::debug!("No thumbnail for {:?}: {}", path, e);
                None
            }
        }
    }
}

fn to_8bit(image: &DynamicImage) -> DynamicImage {
    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

/// Insert an APP1 Exif segment right after the JPEG SOI marker.
///
/// Returns `None` if the payload exceeds the 64 KiB segment limit or the
/// input isn't a JPEG stream.
fn embed_exif_in_jpeg(jpeg: &[u8], exif: &[u8]) -> Option<Vec<u8>> {
    const EXIF_HEADER: &[u8] = b"Exif\0\0";
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return None;
    }
    let segment_len = 2 + EXIF_HEADER.len() + exif.len();
    let segment_len = u16::try_from(segment_len).ok()?;

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif);
    out.extend_from_slice(&jpeg[2..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_decode_metadata_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "wide.png", 120, 40);

        let info = NativeTranscoder::new().decode_metadata(&input).unwrap();
        assert_eq!((info.width, info.height), (120, 40));
        assert!(info.metadata.is_none());
    }

    #[test]
    fn test_decode_metadata_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.jpg");
        std::fs::write(&bogus, b"not an image").unwrap();

        let err = NativeTranscoder::new().decode_metadata(&bogus).unwrap_err();
        assert!(matches!(err, ConversionError::ImageReadFailed { .. }));
    }

    #[test]
    fn test_transcode_png_to_jpeg_with_resize() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "in.png", 200, 100);
        let output = dir.path().join("out.jpg");
        let transcoder = NativeTranscoder::new();
        let tag = transcoder.format_tag(TargetFormat::Jpeg).unwrap();

        let options = TranscodeOptions {
            quality: Some(0.8),
            max_dimension: Some(50),
            metadata: None,
        };
        transcoder.transcode(&input, &output, tag, &options).unwrap();

        let written = image::open(&output).unwrap();
        assert_eq!(written.dimensions(), (50, 25));
    }

    #[test]
    fn test_transcode_never_upscales() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "small.png", 30, 20);
        let output = dir.path().join("small.png.out.png");
        let transcoder = NativeTranscoder::new();
        let tag = transcoder.format_tag(TargetFormat::Png).unwrap();

        let options = TranscodeOptions {
            max_dimension: Some(60),
            ..Default::default()
        };
        transcoder.transcode(&input, &output, tag, &options).unwrap();
        assert_eq!(image::open(&output).unwrap().dimensions(), (30, 20));
    }

    #[test]
    fn test_transcode_to_missing_directory_fails_destination() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "in.png", 10, 10);
        let output = dir.path().join("no/such/dir/out.png");
        let transcoder = NativeTranscoder::new();
        let tag = transcoder.format_tag(TargetFormat::Png).unwrap();

        let err = transcoder
            .transcode(&input, &output, tag, &TranscodeOptions::default())
            .unwrap_err();
        assert_eq!(err, ConversionError::DestinationCreationFailed(TargetFormat::Png));
    }

    #[test]
    fn test_thumbnail_fits_max_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "big.png", 400, 200);

        let thumb = NativeTranscoder::new().thumbnail(&input, 80).unwrap();
        assert_eq!(thumb.dimensions(), (80, 40));
        assert!(NativeTranscoder::new()
            .thumbnail(&dir.path().join("missing.png"), 80)
            .is_none());
    }

    #[test]
    fn test_embed_exif_in_jpeg_places_app1_after_soi() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02, 0xFF, 0xD9];
        let exif = b"MM\0*\0\0\0\x08";

        let out = embed_exif_in_jpeg(&jpeg, exif).unwrap();
        assert_eq!(&out[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
        assert_eq!(u16::from_be_bytes([out[4], out[5]]) as usize, 2 + 6 + exif.len());
        assert_eq!(&out[6..12], b"Exif\0\0");
        assert_eq!(&out[out.len() - jpeg.len() + 2..], &jpeg[2..]);
    }

    #[test]
    fn test_embed_exif_rejects_non_jpeg() {
        assert!(embed_exif_in_jpeg(b"\x89PNG", b"II*\0").is_none());
    }
}
