//! Multi-language group emission.
//!
//! The engine owns the cross-group [`SharedStrings`] accumulator and drives a
//! [`GroupMerge`] for every configured language of every group, base
//! language first.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::CacheKey;
use crate::canonical::canonical_hash_hex;
use crate::config::LanguageSource;
use crate::policy::AliasPolicy;
use crate::store::ContentStore;
use crate::types::{Unit, ValidationReport};
use super::alias::{apply_aliases, parse_sentinel};
use super::cache::LocalizationCache;
use super::merge::{GroupMerge, LanguageData, LocalizationGroup, SharedStrings};
use super::words::WordCounts;
use super::LocalizationError;

/// Load and assemble one language, through the cache.
///
/// Description entries are appended after string entries; a key present in
/// both keeps the string value. Aliases are applied for the base language.
pub fn load_language<S: ContentStore>(
    store: &S,
    cache: &LocalizationCache,
    source: &LanguageSource,
    base_policy: Option<&AliasPolicy>,
) -> Result<Arc<LanguageData>, LocalizationError> {
    let mut key = CacheKey::builder().part(&source.code);
    for path in &source.strings {
        key = key.part(&path.to_string_lossy());
    }
    let key = key
        .part(&source.strings_column.describe())
        .part(&source.description.as_ref().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default())
        .part(&source.description_column.describe())
        .part(&base_policy.map(|p| p.params_hash()).unwrap_or_default())
        .finish();

    cache.language(key, || {
        let strings = cache.table(store, &source.strings, source.strings_column, false)?;
        let mut data = LanguageData {
            code: source.code.clone(),
            entries: strings.entries.clone(),
            duplicates: strings.duplicates.clone(),
            ..Default::default()
        };
        if let Some(path) = &source.description {
            let descriptions = cache.table(store, std::slice::from_ref(path), source.description_column, true)?;
            for (k, v) in &descriptions.entries {
                if data.entries.contains_key(k) {
                    data.duplicates.push(k.clone());
                } else {
                    data.entries.insert(k.clone(), v.clone());
                    data.description_keys.push(k.clone());
                }
            }
        }
        if let Some(policy) = base_policy {
            data.aliases = apply_aliases(&mut data.entries, policy);
        }
        tracing::debug!(language = %data.code, entries = data.entries.len(), "Language data assembled");
        Ok(data)
    })
}

/// Result of emitting one group in every language.
#[derive(Debug, Clone, Default)]
pub struct GroupOutcome {
    /// Resolved base-language output.
    pub base_output: BTreeMap<String, String>,
    /// Documents written, per language.
    pub written: BTreeMap<String, PathBuf>,
    /// Languages that failed completeness, with their error.
    pub failures: Vec<LocalizationError>,
}

/// Drives group merges for all languages of one run.
pub struct LocalizationEngine<'r, S: ContentStore> {
    store: &'r S,
    base: Arc<LanguageData>,
    languages: Vec<Arc<LanguageData>>,
    shared: SharedStrings,
    words: WordCounts,
}

impl<'r, S: ContentStore> LocalizationEngine<'r, S> {
    /// Load every language (base first) through `cache`.
    pub fn new(
        store: &'r S,
        cache: &LocalizationCache,
        base_language: &str,
        sources: &[LanguageSource],
        policy: &AliasPolicy,
    ) -> Result<Self, LocalizationError> {
        let base_source = sources
            .iter()
            .find(|s| s.code == base_language)
            .ok_or_else(|| LocalizationError::UnknownBaseLanguage(base_language.to_string()))?;
        let base = load_language(store, cache, base_source, Some(policy))?;

        let mut languages = Vec::new();
        for source in sources.iter().filter(|s| s.code != base_language) {
            languages.push(load_language(store, cache, source, None)?);
        }

        tracing::info!(
            base = %base.code,
            languages = languages.len() + 1,
            aliases = base.aliases.len(),
            "Localization sources loaded"
        );

        Ok(Self {
            store,
            base,
            languages,
            shared: SharedStrings::default(),
            words: WordCounts::default(),
        })
    }

    /// Base-language data.
    pub fn base(&self) -> &Arc<LanguageData> {
        &self.base
    }

    /// Language codes, base first.
    pub fn language_codes(&self) -> Vec<String> {
        std::iter::once(&self.base)
            .chain(self.languages.iter())
            .map(|l| l.code.clone())
            .collect()
    }

    /// Base-language text for `key`, following aliases.
    pub fn translate(&self, key: &str) -> Option<&str> {
        let value = self.base.entries.get(key)?;
        match self.base.aliases.canonical(key).or_else(|| parse_sentinel(value)) {
            Some(canonical) => self
                .base
                .entries
                .get(canonical)
                .map(String::as_str)
                .filter(|v| parse_sentinel(v).is_none()),
            None => Some(value.as_str()),
        }
    }

    /// Word totals accumulated so far (base language).
    pub fn words(&self) -> &WordCounts {
        &self.words
    }

    /// Fingerprint of the base data, for cache keys.
    pub fn base_fingerprint(&self) -> String {
        canonical_hash_hex(&self.base.entries)
    }

    /// Merge, validate and write `group` for every language.
    ///
    /// A language missing keys still gets its document; the failure is
    /// recorded in `report` and returned in the outcome.
    pub fn emit_group<F>(
        &mut self,
        group: &LocalizationGroup,
        path_for: F,
        report: &mut ValidationReport,
    ) -> Result<GroupOutcome, LocalizationError>
    where
        F: Fn(&str) -> PathBuf,
    {
        let mut outcome = GroupOutcome::default();
        let targets: Vec<Arc<LanguageData>> = std::iter::once(Arc::clone(&self.base))
            .chain(self.languages.iter().cloned())
            .collect();

        for target in targets {
            let unit = Unit::Group {
                group: group.tag.clone(),
                language: target.code.clone(),
            };
            let mut merge = GroupMerge::new(group, target.code.clone());
            merge.load_base(Arc::clone(&self.base))?;
            merge.merge(&target, &self.shared)?;
            merge.validate()?;

            for key in merge.absent_in_base() {
                report.warn(unit.clone(), format!("no base text for key {}, empty string substituted", key));
            }
            for (alias, canonical) in merge.unresolved_aliases() {
                report.warn(unit.clone(), format!("alias {} -> {} has no translation", alias, canonical));
            }

            let path = path_for(&target.code);
            merge.write(self.store, &path)?;
            outcome.written.insert(target.code.clone(), path);
            self.shared.extend(&target.code, merge.output());

            let is_base = target.code == self.base.code;
            match merge.finish() {
                Ok(output) => {
                    if is_base {
                        outcome.base_output = output;
                    }
                }
                Err(err) => {
                    let message = match &err {
                        LocalizationError::MissingKeys { keys, .. } => format!("missing keys: {}", keys.join(", ")),
                        other => other.to_string(),
                    };
                    report.error(unit, message);
                    outcome.failures.push(err);
                }
            }
        }

        for (key, text) in &outcome.base_output {
            if group.is_internal(key) || self.base.aliases.is_alias(key) {
                continue;
            }
            self.words.add(&group.tag, text);
        }
        Ok(outcome)
    }
}
