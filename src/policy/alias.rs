//! Alias policy: when identical base-language strings are linked.
//!
//! Two keys with byte-identical base text are only worth linking when the
//! text is unambiguous enough that one translation fits both places. Short
//! strings ("Yes.", "Go!") often need different translations depending on
//! context, so they stay separate unless they carry a disambiguating
//! character.
//!
//! The thresholds are content policy, not format semantics; they are part of
//! the book id so changing them is visible in the manifest.

use serde::{Deserialize, Serialize};
use crate::canonical::canonical_hash_hex;

/// Alias policy version identifier.
pub const ALIAS_POLICY_VERSION: &str = "alias_policy_v1";

/// Heuristic deciding which duplicate strings get aliased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasPolicy {
    /// Policy version identifier.
    pub version: String,
    /// Whether aliasing runs at all.
    pub enabled: bool,
    /// Text longer than this many characters is aliased.
    pub min_length: usize,
    /// Text containing any of these characters is aliased regardless of length.
    pub disambiguating_chars: String,
}

impl AliasPolicy {
    /// Create a policy with explicit thresholds.
    pub fn new(min_length: usize, disambiguating_chars: impl Into<String>) -> Self {
        Self {
            version: ALIAS_POLICY_VERSION.to_string(),
            enabled: true,
            min_length,
            disambiguating_chars: disambiguating_chars.into(),
        }
    }

    /// Policy that never aliases.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether duplicate occurrences of `text` should be linked.
    pub fn should_alias(&self, text: &str) -> bool {
        if !self.enabled || text.trim().is_empty() {
            return false;
        }
        text.chars().count() > self.min_length
            || text.chars().any(|c| self.disambiguating_chars.contains(c))
    }

    /// Compute a hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for AliasPolicy {
    fn default() -> Self {
        Self::new(10, "?")
    }
}
