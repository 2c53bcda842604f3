//! Word-count accounting for translation workload reports.
//!
//! Diagnostic only; nothing here affects what gets built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count whitespace-delimited tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Per-group and global word totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCounts {
    /// Words per group tag.
    pub per_group: BTreeMap<String, usize>,
    /// Sum over all groups.
    pub total: usize,
}

impl WordCounts {
    /// Add the words of `text` to `group`; empty text is ignored.
    pub fn add(&mut self, group: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let n = count_words(text);
        *self.per_group.entry(group.to_string()).or_insert(0) += n;
        self.total += n;
    }

    /// Words counted for `group`.
    pub fn group(&self, group: &str) -> usize {
        self.per_group.get(group).copied().unwrap_or(0)
    }
}
