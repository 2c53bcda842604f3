//! Two-level localization cache.
//!
//! Level 1 holds parsed tables keyed by (source path set, column rule,
//! internal flag). Level 2 holds fully assembled per-language data (strings
//! and book descriptions merged, aliases applied for the base language).

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheKey, CacheStats, MemoCache};
use crate::store::{ContentStore, StoreError};
use super::source::{load_table, ColumnRule, LoadedTable};
use super::merge::LanguageData;

/// Localization caches owned by one run context.
#[derive(Debug, Default)]
pub struct LocalizationCache {
    tables: MemoCache<LoadedTable>,
    languages: MemoCache<LanguageData>,
}

impl LocalizationCache {
    /// Create empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for a parsed table.
    pub fn table_key(paths: &[PathBuf], column: ColumnRule, internal: bool) -> CacheKey {
        paths
            .iter()
            .fold(CacheKey::builder().int(paths.len() as u64), |b, p| {
                b.part(&p.to_string_lossy())
            })
            .part(&column.describe())
            .flag(internal)
            .finish()
    }

    /// Parsed table for `paths`, loaded on first use.
    pub fn table<S: ContentStore>(
        &self,
        store: &S,
        paths: &[PathBuf],
        column: ColumnRule,
        internal: bool,
    ) -> Result<Arc<LoadedTable>, StoreError> {
        let key = Self::table_key(paths, column, internal);
        self.tables
            .get_or_try_insert(key, || load_table(store, paths, column))
    }

    /// Assembled language data, built on first use.
    pub fn language<E>(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Result<LanguageData, E>,
    ) -> Result<Arc<LanguageData>, E> {
        self.languages.get_or_try_insert(key, build)
    }

    /// Statistics for (tables, languages).
    pub fn stats(&self) -> (CacheStats, CacheStats) {
        (self.tables.stats(), self.languages.stats())
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.tables.clear();
        self.languages.clear();
    }
}
