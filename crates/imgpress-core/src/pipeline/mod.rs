//! Per-file pipeline components.
//!
//! - **discovery**: Flatten dropped files and folders into candidate files
//! - **validate**: Media-type detection and the input allow-list
//! - **transcoder**: The decode/encode capability and its native implementation
//! - **engine**: One file's end-to-end conversion
//! - **thumbnail**: Bounded preview cache

pub mod discovery;
pub mod engine;
pub mod thumbnail;
pub mod transcoder;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::FileDiscovery;
pub use engine::{expand_directory, ConversionEngine};
pub use thumbnail::ThumbnailCache;
pub use transcoder::{
    FormatTag, ImageTranscoder, MetadataBlob, NativeTranscoder, SourceInfo, TranscodeOptions,
};
pub use validate::{FileTypeValidator, MediaCategory, MediaType};
