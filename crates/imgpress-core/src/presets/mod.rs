//! Presets: named conversion templates and their persistence.

pub mod persistence;
pub mod preset;
pub mod store;

pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use preset::Preset;
pub use store::PresetStore;
