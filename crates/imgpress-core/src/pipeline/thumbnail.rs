//! Bounded cache of input previews keyed by path.

use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::transcoder::ImageTranscoder;
use crate::config::ThumbnailConfig;

/// Shared preview cache. Safe to use from any thread.
///
/// When full, inserting a new path evicts one arbitrary entry. Generation
/// happens outside the lock, so two callers racing on the same path may both
/// decode it; the later insert wins.
pub struct ThumbnailCache {
    entries: Mutex<HashMap<PathBuf, Arc<DynamicImage>>>,
    capacity: usize,
    max_dimension: u32,
}

impl ThumbnailCache {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(config.cache_capacity)),
            capacity: config.cache_capacity.max(1),
            max_dimension: config.max_dimension,
        }
    }

    // A poisoned cache is still a valid cache
    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<DynamicImage>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<DynamicImage>> {
        self.entries().get(path).cloned()
    }

    pub fn put(&self, path: PathBuf, image: Arc<DynamicImage>) {
        let mut entries = self.entries();
        if !entries.contains_key(&path) && entries.len() >= self.capacity {
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
            }
        }
        entries.insert(path, image);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached preview for `path`, generating it on a miss.
    ///
    /// Failures are not cached, so a later call retries.
    pub fn thumbnail(
        &self,
        path: &Path,
        transcoder: &dyn ImageTranscoder,
    ) -> Option<Arc<DynamicImage>> {
        if let Some(hit) = self.get(path) {
            return Some(hit);
        }

        let image = Arc::new(transcoder.thumbnail(path, self.max_dimension)?);
        self.put(path.to_path_buf(), Arc::clone(&image));
        Some(image)
    }
}
