//! Content storage backends.
//!
//! The pipeline never touches files directly. Everything it reads (export,
//! localization tables, registry sheets, atlas manifests) and writes (bundle
//! documents, copied assets) goes through a [`ContentStore`].
//!
//! Tabular sources are UTF-8, tab-separated, one header row. A multi-sheet
//! workbook `book/registry` is stored as one table per sheet next to it:
//! `book/registry.config.tsv`, `book/registry.characters.tsv`, ...

pub mod memory;
pub mod fs;

use std::path::{Path, PathBuf};

/// Error type for store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Required input document does not exist.
    #[error("Required document not found: {0}")]
    NotFound(PathBuf),
    /// Underlying I/O failed.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Error text.
        message: String,
    },
    /// Document exists but cannot be decoded.
    #[error("Cannot parse {path}: {message}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Error text.
        message: String,
    },
}

impl StoreError {
    /// Create a parse error.
    pub fn parse(path: &Path, message: impl ToString) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Trait for content storage backends.
///
/// Implementations provide raw byte access; decoding is shared.
/// All methods take `&self`; writers use interior mutability.
pub trait ContentStore {
    /// Read a file's bytes.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, StoreError>;

    /// Write a file's bytes, creating parent directories as needed.
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError>;

    /// Whether a file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Read a UTF-8 text file.
    fn read_text(&self, path: &Path) -> Result<String, StoreError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| StoreError::parse(path, e))
    }

    /// Read tabular rows, header row included.
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(parse_tsv(&self.read_text(path)?))
    }

    /// Read one sheet of a multi-sheet workbook.
    fn read_sheet(&self, workbook: &Path, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.read_rows(&sheet_path(workbook, sheet))
    }

    /// Read a structured JSON document.
    fn read_document(&self, path: &Path) -> Result<serde_json::Value, StoreError> {
        let bytes = self.read_bytes(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::parse(path, e))
    }

    /// Write a structured JSON document (pretty-printed).
    fn write_document<T: serde::Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::parse(path, e))?;
        self.write_bytes(path, &bytes)
    }

    /// Copy a binary asset.
    fn copy_asset(&self, from: &Path, to: &Path) -> Result<(), StoreError> {
        let bytes = self.read_bytes(from)?;
        self.write_bytes(to, &bytes)
    }
}

/// Path of `sheet` inside the workbook stored at `workbook`.
pub fn sheet_path(workbook: &Path, sheet: &str) -> PathBuf {
    workbook.with_extension(format!("{}.tsv", sheet))
}

/// Split tab-separated text into rows of trimmed cells.
///
/// Trailing `\r` is stripped; fully empty lines are dropped.
pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

pub use memory::InMemoryContentStore;
pub use fs::FsContentStore;
