//! Key-value persistence for preferences.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

/// Generic durable key-value storage.
///
/// Reads are lenient: an unreadable key behaves like an absent one.
pub trait KeyValueStore: Send + Sync {
    fn read_blob(&self, key: &str) -> Option<Vec<u8>>;

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// `false` when the key is absent.
    fn read_bool(&self, key: &str) -> bool;

    fn write_bool(&self, key: &str, value: bool) -> Result<(), StoreError>;
}

/// One file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store under `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn read_blob(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.key_path(key)).ok()
    }

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        std::fs::write(self.key_path(key), bytes).map_err(io_error)
    }

    fn read_bool(&self, key: &str) -> bool {
        self.read_blob(key)
            .map(|bytes| String::from_utf8_lossy(&bytes).trim() == "true")
            .unwrap_or(false)
    }

    fn write_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        let bytes: &[u8] = if value { b"true" } else { b"false" };
        self.write_blob(key, bytes)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read_blob(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_bool(&self, key: &str) -> bool {
        self.read_blob(key).as_deref() == Some(b"true".as_slice())
    }

    fn write_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        let bytes: &[u8] = if value { b"true" } else { b"false" };
        self.write_blob(key, bytes)
    }
}
