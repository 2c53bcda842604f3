//! In-memory content store for testing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use parking_lot::RwLock;

use super::{ContentStore, StoreError};

/// In-memory content store for testing.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl InMemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text file.
    pub fn add_text(&self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files
            .write()
            .insert(path.as_ref().to_path_buf(), text.into().into_bytes());
    }

    /// Add a table from rows (header row first).
    pub fn add_rows<R, C>(&self, path: impl AsRef<Path>, rows: R)
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let text = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.as_ref().to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.add_text(path, text);
    }

    /// Add a JSON document.
    pub fn add_document(&self, path: impl AsRef<Path>, value: &serde_json::Value) {
        self.add_text(path, value.to_string());
    }

    /// All stored paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.read().keys().cloned().collect()
    }

    /// Paths under a directory prefix.
    pub fn paths_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        self.files
            .read()
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect()
    }

    /// Get number of files.
    pub fn num_files(&self) -> usize {
        self.files.read().len()
    }
}

impl ContentStore for InMemoryContentStore {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        self.files.write().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }
}
