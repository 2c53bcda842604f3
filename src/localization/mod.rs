//! Localization merge engine.
//!
//! ```text
//! tables (per language) ──► LanguageData ──► GroupMerge ──► {group}_{lang}.json
//!            │                  │  (base: aliases applied)
//!            └── LocalizationCache (tables, assembled languages)
//! ```
//!
//! ## Groups
//!
//! | Group | Keys |
//! |---|---|
//! | `chapter_<n>` | text keys of the chapter's nodes |
//! | `sharedstrings` | entity and location names, chapter titles, book descriptions |
//! | `previewstrings` | book description keys |
//!
//! The base language defines which keys a group must contain; every other
//! language is checked against it. Missing keys fail only that group in that
//! language, after its document has been written.

pub mod source;
pub mod alias;
pub mod merge;
pub mod cache;
pub mod engine;
pub mod words;

use crate::store::StoreError;

pub use source::{load_single, load_table, ColumnRule, Dictionary, LoadedTable};
pub use alias::{alias_sentinel, apply_aliases, parse_sentinel, AliasTable};
pub use merge::{GroupMerge, LanguageData, LocalizationGroup, MergeState, SharedStrings};
pub use cache::LocalizationCache;
pub use engine::{load_language, GroupOutcome, LocalizationEngine};
pub use words::{count_words, WordCounts};

/// Localization errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocalizationError {
    /// A group's document lacks keys the base language defines.
    #[error("{group} [{language}] is missing keys: {}", keys.join(", "))]
    MissingKeys {
        /// Group tag.
        group: String,
        /// Language code.
        language: String,
        /// Missing keys, in group order.
        keys: Vec<String>,
    },
    /// A merge step was called out of order.
    #[error("{group} [{language}]: cannot go from {from} to {to}")]
    InvalidTransition {
        /// Group tag.
        group: String,
        /// Language code.
        language: String,
        /// State at the time of the call.
        from: MergeState,
        /// Requested state.
        to: MergeState,
    },
    /// Base language has no source.
    #[error("Base language '{0}' has no configured source")]
    UnknownBaseLanguage(String),
    /// Source or output document failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
