//! Tabular localization sources.
//!
//! Column 0 holds the key; the value column is chosen by a [`ColumnRule`].
//! The first row of every table is a header and is never read as data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{ContentStore, StoreError};

/// Insertion-ordered key -> text mapping.
pub type Dictionary = IndexMap<String, String>;

/// Which column carries the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRule {
    /// Always read this column.
    Fixed(usize),
    /// Read `secondary`; when blank, fall back to `primary`.
    Preferred {
        /// Column read first.
        secondary: usize,
        /// Column read when `secondary` is blank.
        primary: usize,
    },
}

impl ColumnRule {
    /// Pick the value cell from a row; `None` when blank or absent.
    pub fn pick<'a>(&self, row: &'a [String]) -> Option<&'a str> {
        let cell = |i: usize| row.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());
        match *self {
            Self::Fixed(column) => cell(column),
            Self::Preferred { secondary, primary } => cell(secondary).or_else(|| cell(primary)),
        }
    }

    /// Stable textual form, used in cache keys.
    pub fn describe(&self) -> String {
        match self {
            Self::Fixed(column) => format!("fixed:{}", column),
            Self::Preferred { secondary, primary } => format!("preferred:{}:{}", secondary, primary),
        }
    }
}

impl Default for ColumnRule {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

/// Parsed table with its load diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedTable {
    /// Parsed entries, first occurrence wins.
    pub entries: Dictionary,
    /// Keys seen more than once, in encounter order.
    pub duplicates: Vec<String>,
    /// Source files the table was built from.
    pub sources: Vec<PathBuf>,
}

impl LoadedTable {
    /// Add rows from one source; header row is skipped.
    pub fn extend_from_rows(&mut self, rows: &[Vec<String>], column: ColumnRule) {
        for row in rows.iter().skip(1) {
            let key = match row.first().map(|k| k.trim()).filter(|k| !k.is_empty()) {
                Some(key) => key,
                None => continue,
            };
            let value = match column.pick(row) {
                Some(value) => value,
                None => continue,
            };
            if self.entries.contains_key(key) {
                self.duplicates.push(key.to_string());
                continue;
            }
            self.entries.insert(key.to_string(), value.to_string());
        }
    }

    /// Get the text for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load and merge tables from `paths` in order.
///
/// A key duplicated within or across files is reported and the first value kept.
pub fn load_table<S: ContentStore>(
    store: &S,
    paths: &[PathBuf],
    column: ColumnRule,
) -> Result<LoadedTable, StoreError> {
    let mut table = LoadedTable::default();
    for path in paths {
        let rows = store.read_rows(path)?;
        table.extend_from_rows(&rows, column);
        table.sources.push(path.clone());
    }
    if !table.duplicates.is_empty() {
        tracing::warn!(
            sources = ?table.sources,
            count = table.duplicates.len(),
            first = %table.duplicates[0],
            "Duplicate localization keys, first occurrence kept"
        );
    }
    Ok(table)
}

/// Load a single-file table.
pub fn load_single<S: ContentStore>(
    store: &S,
    path: &Path,
    column: ColumnRule,
) -> Result<LoadedTable, StoreError> {
    load_table(store, &[path.to_path_buf()], column)
}
