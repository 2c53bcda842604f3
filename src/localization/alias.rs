//! Key aliasing for duplicate base-language strings ("SystemLinkTo").
//!
//! When several keys carry the same base text, every key but the first is
//! rewritten in the base data to `*SystemLinkTo*<canonical>*`. Any language
//! then resolves the aliased key through the canonical key's translation, so
//! translators see each string once.

use std::collections::{BTreeMap, HashMap};

use crate::policy::AliasPolicy;
use super::source::Dictionary;

const SENTINEL_PREFIX: &str = "*SystemLinkTo*";
const SENTINEL_SUFFIX: &str = "*";

/// Build the sentinel value pointing at `canonical`.
pub fn alias_sentinel(canonical: &str) -> String {
    format!("{}{}{}", SENTINEL_PREFIX, canonical, SENTINEL_SUFFIX)
}

/// Canonical key embedded in a sentinel value, if `value` is one.
pub fn parse_sentinel(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix(SENTINEL_PREFIX)?
        .strip_suffix(SENTINEL_SUFFIX)
        .filter(|key| !key.is_empty())
}

/// Alias key -> canonical key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    links: BTreeMap<String, String>,
}

impl AliasTable {
    /// Canonical key for `key`, if it was aliased.
    pub fn canonical(&self, key: &str) -> Option<&str> {
        self.links.get(key).map(String::as_str)
    }

    /// Whether `key` was aliased.
    pub fn is_alias(&self, key: &str) -> bool {
        self.links.contains_key(key)
    }

    /// Number of aliased keys.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether nothing was aliased.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate (alias, canonical) pairs in alias order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }
}

/// Rewrite duplicate base texts to sentinels, in place.
///
/// The first key (in source order) with a given text stays canonical.
/// Values that already are sentinels are recorded but left untouched.
pub fn apply_aliases(base: &mut Dictionary, policy: &AliasPolicy) -> AliasTable {
    let mut table = AliasTable::default();
    let mut first_by_text: HashMap<String, String> = HashMap::new();

    for (key, value) in base.iter_mut() {
        if let Some(canonical) = parse_sentinel(value) {
            table.links.insert(key.clone(), canonical.to_string());
            continue;
        }
        if !policy.should_alias(value) {
            continue;
        }
        match first_by_text.get(value.as_str()) {
            Some(canonical) => {
                tracing::debug!(key = %key, canonical = %canonical, "Aliasing duplicate base text");
                table.links.insert(key.clone(), canonical.clone());
                *value = alias_sentinel(canonical);
            }
            None => {
                first_by_text.insert(value.clone(), key.clone());
            }
        }
    }

    if !table.is_empty() {
        tracing::info!(aliases = table.len(), "Linked duplicate base-language strings");
    }
    table
}
