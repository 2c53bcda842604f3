//! Filesystem content store.

use std::fs;
use std::path::{Path, PathBuf};

use super::{ContentStore, StoreError};

/// Content store backed by the local filesystem.
///
/// Relative paths are resolved against `root`.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn io_error(path: &Path, e: std::io::Error) -> StoreError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    }

    fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }
        Ok(())
    }
}

impl ContentStore for FsContentStore {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let full = self.resolve(path);
        fs::read(&full).map_err(|e| Self::io_error(&full, e))
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let full = self.resolve(path);
        Self::ensure_parent(&full)?;
        fs::write(&full, bytes).map_err(|e| Self::io_error(&full, e))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn copy_asset(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        Self::ensure_parent(&dst)?;
        fs::copy(&src, &dst).map_err(|e| Self::io_error(&src, e))?;
        Ok(())
    }
}
