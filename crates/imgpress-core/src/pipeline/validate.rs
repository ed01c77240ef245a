//! Input classification: which dropped files are convertible images.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Broad families the validator's allow-list is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaCategory {
    /// Ordinary raster images (JPEG, PNG, HEIC, ...)
    Image,
    /// Camera RAW captures
    RawImage,
    /// Live-photo containers
    LivePhoto,
}

/// Detected media type of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Heic,
    Heif,
    Avif,
    QuickTimeImage,
    CanonCr2,
    CanonCr3,
    AdobeDng,
    CameraRaw,
    LivePhoto,
}

impl MediaType {
    /// Reverse-DNS type identifier.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Jpeg => "public.jpeg",
            Self::Png => "public.png",
            Self::Gif => "com.compuserve.gif",
            Self::WebP => "org.webmproject.webp",
            Self::Bmp => "com.microsoft.bmp",
            Self::Tiff => "public.tiff",
            Self::Heic => "public.heic",
            Self::Heif => "public.heif",
            Self::Avif => "public.avif",
            Self::QuickTimeImage => "com.apple.quicktime-image",
            Self::CanonCr2 => "com.canon.cr2-raw-image",
            Self::CanonCr3 => "com.canon.cr3-raw-image",
            Self::AdobeDng => "com.adobe.raw-image",
            Self::CameraRaw => "public.camera-raw-image",
            Self::LivePhoto => "com.apple.live-photo",
        }
    }

    pub fn category(self) -> MediaCategory {
        match self {
            Self::CanonCr2 | Self::CanonCr3 | Self::AdobeDng | Self::CameraRaw => {
                MediaCategory::RawImage
            }
            Self::LivePhoto => MediaCategory::LivePhoto,
            _ => MediaCategory::Image,
        }
    }

    /// Detect the media type of a file from its signature and extension.
    ///
    /// Returns `None` when the file can't be read or matches nothing known.
    pub fn detect(path: &Path) -> Option<Self> {
        let mut header = [0u8; 12];
        let bytes_read = std::fs::File::open(path)
            .and_then(|mut file| file.read(&mut header))
            .unwrap_or(0);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match Self::from_header(&header, bytes_read) {
            // TIFF is the container for most camera RAW formats
            Some(Self::Tiff) => Some(Self::tiff_based_raw(&extension).unwrap_or(Self::Tiff)),
            Some(detected) => Some(detected),
            None => Self::from_extension(&extension),
        }
    }

    fn tiff_based_raw(extension: &str) -> Option<Self> {
        match extension {
            "cr2" => Some(Self::CanonCr2),
            "dng" => Some(Self::AdobeDng),
            "nef" | "nrw" | "arw" | "srf" | "sr2" | "pef" | "srw" | "3fr" | "erf" | "mos" => {
                Some(Self::CameraRaw)
            }
            _ => None,
        }
    }

    /// Extension fallback for formats without a stable leading signature.
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "raf" | "orf" | "rw2" | "raw" | "rwl" | "x3f" => Some(Self::CameraRaw),
            "qtif" | "qti" => Some(Self::QuickTimeImage),
            "livp" => Some(Self::LivePhoto),
            _ => None,
        }
    }

    /// Match the header bytes against known image signatures.
    fn from_header(header: &[u8; 12], bytes_read: usize) -> Option<Self> {
        if bytes_read < 4 {
            return None;
        }

        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return Some(Self::Jpeg);
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return Some(Self::Png);
        }

        // GIF: GIF8
        if &header[0..4] == b"GIF8" {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if &header[0..4] == b"RIFF" && bytes_read >= 12 && &header[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        let is_tiff_le =
            header[0] == b'I' && header[1] == b'I' && header[2] == 0x2A && header[3] == 0x00;
        let is_tiff_be =
            header[0] == b'M' && header[1] == b'M' && header[2] == 0x00 && header[3] == 0x2A;
        if is_tiff_le || is_tiff_be {
            return Some(Self::Tiff);
        }

        // BMP: BM
        if header[0] == b'B' && header[1] == b'M' {
            return Some(Self::Bmp);
        }

        // ISO-BMFF: ftyp box at offset 4, major brand at offset 8
        if bytes_read >= 12 && &header[4..8] == b"ftyp" {
            return match &header[8..12] {
                b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => Some(Self::Heic),
                b"mif1" | b"msf1" | b"heif" => Some(Self::Heif),
                b"avif" | b"avis" => Some(Self::Avif),
                b"crx " => Some(Self::CanonCr3),
                _ => None,
            };
        }

        None
    }
}

/// Decides whether a dropped path is a convertible input.
#[derive(Debug, Clone)]
pub struct FileTypeValidator {
    allowed: Vec<MediaCategory>,
}

impl Default for FileTypeValidator {
    fn default() -> Self {
        Self {
            allowed: vec![
                MediaCategory::Image,
                MediaCategory::RawImage,
                MediaCategory::LivePhoto,
            ],
        }
    }
}

impl FileTypeValidator {
    /// Create a validator accepting only the given categories.
    pub fn with_allowed(allowed: Vec<MediaCategory>) -> Self {
        Self { allowed }
    }

    /// Whether `path` is a regular local file of an allowed media type.
    pub fn is_acceptable(&self, path: &Path) -> bool {
        self.accepted_type(path).is_some()
    }

    /// The detected media type of `path` if it passes the allow-list.
    pub fn accepted_type(&self, path: &Path) -> Option<MediaType> {
        let is_file = std::fs::metadata(path)
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return None;
        }
        MediaType::detect(path).filter(|media| self.allowed.contains(&media.category()))
    }

    /// Same as [`is_acceptable`](Self::is_acceptable) for a raw drop entry,
    /// which may be a plain path or a URL.
    pub fn is_acceptable_input(&self, raw: &str) -> bool {
        Self::local_path(raw)
            .map(|path| self.is_acceptable(&path))
            .unwrap_or(false)
    }

    /// Resolve a drop entry to a local path.
    ///
    /// `file://` URLs lose their scheme, any other `scheme://` entry is
    /// treated as non-local and rejected.
    pub fn local_path(raw: &str) -> Option<PathBuf> {
        if let Some(rest) = raw.strip_prefix("file://") {
            // file://localhost/path and file:///path both name /path
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            return Some(PathBuf::from(rest));
        }
        if let Some((scheme, _)) = raw.split_once("://") {
            let is_scheme = !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c));
            if is_scheme {
                return None;
            }
        }
        Some(PathBuf::from(raw))
    }
}
