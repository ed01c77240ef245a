//! Flattening dropped paths into candidate files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Expands a drop (files and directories) into the regular files it contains.
pub struct FileDiscovery;

impl FileDiscovery {
    /// Flatten dropped paths into a deduplicated list of regular files.
    ///
    /// Files are taken as-is, directories are walked recursively. Hidden
    /// entries below a dropped directory are skipped, non-existent inputs are
    /// ignored. The result is sorted by path so repeated drops of the same
    /// set produce the same job order.
    pub fn flatten<P: AsRef<Path>>(inputs: &[P]) -> Vec<PathBuf> {
        let mut collected = BTreeSet::new();

        for input in inputs {
            let input = input.as_ref();
            let Ok(metadata) = std::fs::metadata(input) else {
                tracing::debug!("Skipping missing drop input {:?}", input);
                continue;
            };

            if metadata.is_dir() {
                Self::walk_directory(input, &mut collected);
            } else if let Some(resolved) = Self::resolve(input) {
                collected.insert(resolved);
            }
        }

        collected.into_iter().collect()
    }

    fn walk_directory(root: &Path, collected: &mut BTreeSet<PathBuf>) {
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                if let Some(resolved) = Self::resolve(entry.path()) {
                    collected.insert(resolved);
                }
            }
        }
    }

    /// Absolute, symlink-free form of a path, used as the dedup key.
    fn resolve(path: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(path).ok()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
