//! Per-group merge state machine.
//!
//! Each (language, group) pair moves through
//! `Uninitialized → BaseLoaded → Merged → Validated → Written`.
//! Skipping or repeating a step is an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::store::ContentStore;
use super::alias::{parse_sentinel, AliasTable};
use super::source::Dictionary;
use super::LocalizationError;

/// Fully assembled data for one language.
#[derive(Debug, Clone, Default)]
pub struct LanguageData {
    /// Language code.
    pub code: String,
    /// All entries (strings then descriptions, first occurrence wins).
    pub entries: Dictionary,
    /// Aliases; populated for the base language only.
    pub aliases: AliasTable,
    /// Keys duplicated in the sources.
    pub duplicates: Vec<String>,
    /// Keys that came from the book description table.
    pub description_keys: Vec<String>,
}

impl LanguageData {
    /// Non-sentinel text for a key.
    fn text(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| parse_sentinel(v).is_none())
    }
}

/// Cross-group accumulator of resolved text, per language.
///
/// Lets an aliased key resolve through a canonical key that lives in a group
/// merged earlier (e.g. a chapter line aliased to a shared string).
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    by_language: BTreeMap<String, BTreeMap<String, String>>,
}

impl SharedStrings {
    /// Resolved text for `key` in `language`.
    pub fn get(&self, language: &str, key: &str) -> Option<&str> {
        self.by_language
            .get(language)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Record resolved output of a group.
    pub fn extend(&mut self, language: &str, output: &BTreeMap<String, String>) {
        let entry = self.by_language.entry(language.to_string()).or_default();
        for (k, v) in output {
            entry.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.by_language.clear();
    }
}

/// A localization document group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationGroup {
    /// Group tag: `chapter_<n>`, `sharedstrings` or `previewstrings`.
    pub tag: String,
    /// Keys that must be present, in first-seen order.
    pub keys: Vec<String>,
    /// Stage-direction keys: emitted but never checked for completeness.
    pub internal_keys: BTreeSet<String>,
}

impl LocalizationGroup {
    /// Tag of the shared group.
    pub const SHARED: &'static str = "sharedstrings";
    /// Tag of the preview group.
    pub const PREVIEW: &'static str = "previewstrings";

    /// Create an empty group.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            keys: Vec::new(),
            internal_keys: BTreeSet::new(),
        }
    }

    /// Tag for a chapter group.
    pub fn chapter_tag(number: u32) -> String {
        format!("chapter_{}", number)
    }

    /// Add a key once.
    pub fn push_key(&mut self, key: &str) {
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
    }

    /// Add an internal key once.
    pub fn push_internal(&mut self, key: &str) {
        self.push_key(key);
        self.internal_keys.insert(key.to_string());
    }

    /// Whether `key` is internal.
    pub fn is_internal(&self, key: &str) -> bool {
        self.internal_keys.contains(key)
    }
}

/// Merge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MergeState {
    /// Nothing loaded.
    Uninitialized,
    /// Base-language data attached.
    BaseLoaded,
    /// Target text resolved.
    Merged,
    /// Completeness checked.
    Validated,
    /// Document written.
    Written,
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of resolving one key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Text(String),
    Missing,
    AliasUnresolved(String),
}

/// State machine for one (language, group) pair.
#[derive(Debug)]
pub struct GroupMerge<'g> {
    group: &'g LocalizationGroup,
    language: String,
    state: MergeState,
    base: Option<Arc<LanguageData>>,
    output: BTreeMap<String, String>,
    missing: Vec<String>,
    unresolved_aliases: Vec<(String, String)>,
    absent_in_base: Vec<String>,
}

impl<'g> GroupMerge<'g> {
    /// Create an uninitialized merge.
    pub fn new(group: &'g LocalizationGroup, language: impl Into<String>) -> Self {
        Self {
            group,
            language: language.into(),
            state: MergeState::Uninitialized,
            base: None,
            output: BTreeMap::new(),
            missing: Vec::new(),
            unresolved_aliases: Vec::new(),
            absent_in_base: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> MergeState {
        self.state
    }

    fn advance(&mut self, from: MergeState, to: MergeState) -> Result<(), LocalizationError> {
        if self.state != from {
            return Err(LocalizationError::InvalidTransition {
                group: self.group.tag.clone(),
                language: self.language.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Attach the base-language data.
    pub fn load_base(&mut self, base: Arc<LanguageData>) -> Result<(), LocalizationError> {
        self.advance(MergeState::Uninitialized, MergeState::BaseLoaded)?;
        self.base = Some(base);
        Ok(())
    }

    /// Resolve every group key in `target`.
    ///
    /// Keys absent from the base data are substituted with empty text and
    /// noted; they are not part of the completeness contract.
    pub fn merge(&mut self, target: &LanguageData, shared: &SharedStrings) -> Result<(), LocalizationError> {
        self.advance(MergeState::BaseLoaded, MergeState::Merged)?;
        let base = match &self.base {
            Some(base) => Arc::clone(base),
            None => return Ok(()),
        };

        for key in &self.group.keys {
            if !base.entries.contains_key(key) {
                self.absent_in_base.push(key.clone());
                self.output.insert(key.clone(), String::new());
                continue;
            }

            if self.group.is_internal(key) {
                let text = resolve(key, &base, target, shared);
                let text = match text {
                    Resolved::Text(t) => t,
                    _ => match resolve(key, &base, &base, shared) {
                        Resolved::Text(t) => t,
                        _ => String::new(),
                    },
                };
                self.output.insert(key.clone(), text);
                continue;
            }

            match resolve(key, &base, target, shared) {
                Resolved::Text(text) => {
                    self.output.insert(key.clone(), text);
                }
                Resolved::Missing => self.missing.push(key.clone()),
                Resolved::AliasUnresolved(canonical) => {
                    self.unresolved_aliases.push((key.clone(), canonical));
                }
            }
        }
        Ok(())
    }

    /// Run the completeness check; returns the missing keys.
    pub fn validate(&mut self) -> Result<&[String], LocalizationError> {
        self.advance(MergeState::Merged, MergeState::Validated)?;
        Ok(&self.missing)
    }

    /// Write whatever was produced, complete or not.
    pub fn write<S: ContentStore>(&mut self, store: &S, path: &Path) -> Result<(), LocalizationError> {
        self.advance(MergeState::Validated, MergeState::Written)?;
        store.write_document(path, &self.output)?;
        Ok(())
    }

    /// Resolved key -> text.
    pub fn output(&self) -> &BTreeMap<String, String> {
        &self.output
    }

    /// Keys missing from the target language.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Aliased keys whose canonical text was not found: (alias, canonical).
    pub fn unresolved_aliases(&self) -> &[(String, String)] {
        &self.unresolved_aliases
    }

    /// Group keys the base data does not define.
    pub fn absent_in_base(&self) -> &[String] {
        &self.absent_in_base
    }

    /// Consume, returning output or the group error if keys were missing.
    pub fn finish(self) -> Result<BTreeMap<String, String>, LocalizationError> {
        if self.missing.is_empty() {
            Ok(self.output)
        } else {
            Err(LocalizationError::MissingKeys {
                group: self.group.tag.clone(),
                language: self.language,
                keys: self.missing,
            })
        }
    }
}

fn lookup_canonical(canonical: &str, target: &LanguageData, shared: &SharedStrings) -> Option<String> {
    target
        .text(canonical)
        .or_else(|| shared.get(&target.code, canonical))
        .map(str::to_string)
}

fn resolve(key: &str, base: &LanguageData, target: &LanguageData, shared: &SharedStrings) -> Resolved {
    let base_value = base.entries.get(key).map(String::as_str).unwrap_or_default();
    let canonical = base
        .aliases
        .canonical(key)
        .or_else(|| parse_sentinel(base_value))
        .or_else(|| target.entries.get(key).and_then(|v| parse_sentinel(v)));

    match canonical {
        // An alias never uses its own row: it ships the canonical text or nothing.
        Some(canonical) => match lookup_canonical(canonical, target, shared) {
            Some(text) => Resolved::Text(text),
            None => Resolved::AliasUnresolved(canonical.to_string()),
        },
        None => match target.text(key) {
            Some(text) => Resolved::Text(text.to_string()),
            None => Resolved::Missing,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::alias::apply_aliases;
    use crate::policy::AliasPolicy;
    use crate::store::InMemoryContentStore;

    fn language(code: &str, pairs: &[(&str, &str)]) -> LanguageData {
        LanguageData {
            code: code.to_string(),
            entries: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }

    fn base_with_aliases(pairs: &[(&str, &str)]) -> Arc<LanguageData> {
        let mut base = language("en", pairs);
        base.aliases = apply_aliases(&mut base.entries, &AliasPolicy::default());
        Arc::new(base)
    }

    fn group(keys: &[&str]) -> LocalizationGroup {
        let mut g = LocalizationGroup::new("chapter_1");
        for k in keys {
            g.push_key(k);
        }
        g
    }

    #[test]
    fn test_state_order_enforced() {
        let g = group(&["K1"]);
        let mut merge = GroupMerge::new(&g, "de");
        let err = merge.merge(&language("de", &[]), &SharedStrings::default()).unwrap_err();
        assert!(matches!(err, LocalizationError::InvalidTransition { from: MergeState::Uninitialized, .. }));
    }

    #[test]
    fn test_complete_group() {
        let g = group(&["K1", "K2"]);
        let base = base_with_aliases(&[("K1", "Hi"), ("K2", "Bye")]);
        let de = language("de", &[("K1", "Hallo"), ("K2", "Tschüss")]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert!(merge.validate().unwrap().is_empty());

        let out = merge.finish().unwrap();
        assert_eq!(out["K1"], "Hallo");
        assert_eq!(out["K2"], "Tschüss");
    }

    #[test]
    fn test_missing_key_reported_and_still_written() {
        let store = InMemoryContentStore::new();
        let g = group(&["K1", "K2"]);
        let base = base_with_aliases(&[("K1", "Hi"), ("K2", "Bye")]);
        let de = language("de", &[("K1", "Hallo")]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert_eq!(merge.validate().unwrap(), &["K2".to_string()]);
        merge.write(&store, Path::new("out/de.json")).unwrap();

        let doc = store.read_document(Path::new("out/de.json")).unwrap();
        assert_eq!(doc["K1"], "Hallo");

        match merge.finish().unwrap_err() {
            LocalizationError::MissingKeys { group, language, keys } => {
                assert_eq!(group, "chapter_1");
                assert_eq!(language, "de");
                assert_eq!(keys, vec!["K2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_alias_resolves_through_canonical() {
        let g = group(&["K1", "K2"]);
        let base = base_with_aliases(&[("K1", "Hello there, friend."), ("K2", "Hello there, friend.")]);
        let de = language("de", &[("K1", "Hallo, mein Freund.")]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(Arc::clone(&base)).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert!(merge.validate().unwrap().is_empty());
        let out = merge.finish().unwrap();
        assert_eq!(out["K2"], out["K1"]);

        // Base language resolves to the original text.
        let mut merge = GroupMerge::new(&g, "en");
        merge.load_base(Arc::clone(&base)).unwrap();
        merge.merge(&base, &SharedStrings::default()).unwrap();
        merge.validate().unwrap();
        let out = merge.finish().unwrap();
        assert_eq!(out["K2"], "Hello there, friend.");
    }

    #[test]
    fn test_alias_resolves_through_shared_accumulator() {
        let g = group(&["K2"]);
        let base = base_with_aliases(&[("K1", "Hello there, friend."), ("K2", "Hello there, friend.")]);
        let de = language("de", &[]);
        let mut shared = SharedStrings::default();
        shared.extend("de", &BTreeMap::from([("K1".to_string(), "Hallo!".to_string())]));

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &shared).unwrap();
        merge.validate().unwrap();
        assert_eq!(merge.output()["K2"], "Hallo!");
    }

    #[test]
    fn test_unresolved_alias_logged_not_missing() {
        let g = group(&["K2"]);
        let base = base_with_aliases(&[("K1", "Hello there, friend."), ("K2", "Hello there, friend.")]);
        let de = language("de", &[]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert!(merge.validate().unwrap().is_empty());
        assert_eq!(merge.unresolved_aliases(), &[("K2".to_string(), "K1".to_string())]);
    }

    #[test]
    fn test_alias_ignores_its_own_row_when_canonical_untranslated() {
        let g = group(&["K1", "K2"]);
        let base = base_with_aliases(&[("K1", "Hello there, friend."), ("K2", "Hello there, friend.")]);
        let de = language("de", &[("K2", "Servus")]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert_eq!(merge.validate().unwrap(), &["K1".to_string()]);
        assert!(merge.output().get("K1").is_none());
        assert!(merge.output().get("K2").is_none());
        assert_eq!(merge.unresolved_aliases(), &[("K2".to_string(), "K1".to_string())]);
    }

    #[test]
    fn test_internal_keys_fall_back_to_base() {
        let mut g = group(&["K1"]);
        g.push_internal("SD1");
        let base = base_with_aliases(&[("K1", "Hi"), ("SD1", "(whispers)")]);
        let de = language("de", &[("K1", "Hallo")]);

        let mut merge = GroupMerge::new(&g, "de");
        merge.load_base(base).unwrap();
        merge.merge(&de, &SharedStrings::default()).unwrap();
        assert!(merge.validate().unwrap().is_empty());
        assert_eq!(merge.output()["SD1"], "(whispers)");
    }

    #[test]
    fn test_key_absent_in_base_gets_empty_text() {
        let g = group(&["CHR_NOBODY"]);
        let base = base_with_aliases(&[]);
        let mut merge = GroupMerge::new(&g, "en");
        merge.load_base(Arc::clone(&base)).unwrap();
        merge.merge(&base, &SharedStrings::default()).unwrap();
        assert!(merge.validate().unwrap().is_empty());
        assert_eq!(merge.output()["CHR_NOBODY"], "");
        assert_eq!(merge.absent_in_base(), &["CHR_NOBODY".to_string()]);
    }
}
