//! Build configuration.
//!
//! A [`BuildConfig`] is read from a JSON document and may be overridden from
//! the environment by the binary:
//!
//! | Variable | Field |
//! |---|---|
//! | `BOOK_OUTPUT_DIR` | `output_dir` |
//! | `BOOK_CHAPTERS` | `chapter_count` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::emotion::DEFAULT_TOLERANCE;
use crate::localization::ColumnRule;
use crate::policy::AliasPolicy;
use crate::store::{ContentStore, StoreError};

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Config document unreadable.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Config document does not match the schema.
    #[error("Invalid build config: {0}")]
    Parse(String),
    /// Base language is not among the configured languages.
    #[error("Base language '{0}' has no configured source")]
    UnknownBaseLanguage(String),
    /// A language code is configured twice.
    #[error("Language '{0}' configured more than once")]
    DuplicateLanguage(String),
    /// A language has no string tables.
    #[error("Language '{0}' has no string sources")]
    NoSources(String),
    /// Environment override has an invalid value.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidOverride {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

/// Where one language's text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSource {
    /// Language code, e.g. `en`.
    pub code: String,
    /// String tables, merged in order.
    pub strings: Vec<PathBuf>,
    /// Value column of the string tables.
    #[serde(default)]
    pub strings_column: ColumnRule,
    /// Optional book description table.
    #[serde(default)]
    pub description: Option<PathBuf>,
    /// Value column of the description table.
    #[serde(default = "default_description_column")]
    pub description_column: ColumnRule,
}

fn default_description_column() -> ColumnRule {
    ColumnRule::Preferred {
        secondary: 2,
        primary: 1,
    }
}

impl LanguageSource {
    /// Source with one string table read from column 1.
    pub fn new(code: impl Into<String>, strings: impl Into<PathBuf>) -> Self {
        Self {
            code: code.into(),
            strings: vec![strings.into()],
            strings_column: ColumnRule::default(),
            description: None,
            description_column: default_description_column(),
        }
    }

    /// Set the description table.
    pub fn with_description(mut self, path: impl Into<PathBuf>) -> Self {
        self.description = Some(path.into());
        self
    }

    /// Set the string table column.
    pub fn with_strings_column(mut self, column: ColumnRule) -> Self {
        self.strings_column = column;
        self
    }
}

/// Full configuration of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Flow-graph export document.
    pub export: PathBuf,
    /// Registry workbook (sheets stored beside it).
    pub registry: PathBuf,
    /// Directory holding atlas manifests.
    pub atlas_root: PathBuf,
    /// Directory holding binary assets to copy.
    pub asset_root: PathBuf,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Number of chapters to build; all discovered chapters when `None`.
    pub chapter_count: Option<usize>,
    /// Language treated as source of truth.
    pub base_language: String,
    /// Every language to emit, base included.
    pub languages: Vec<LanguageSource>,
    /// Duplicate-text alias heuristic.
    pub alias: AliasPolicy,
    /// Per-channel tolerance for exact palette matches.
    pub emotion_tolerance: f32,
    /// Bundle version echoed into the manifest.
    pub version: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            export: PathBuf::from("export.json"),
            registry: PathBuf::from("registry"),
            atlas_root: PathBuf::from("atlases"),
            asset_root: PathBuf::from("assets"),
            output_dir: PathBuf::from("out"),
            chapter_count: None,
            base_language: "en".to_string(),
            languages: Vec::new(),
            alias: AliasPolicy::default(),
            emotion_tolerance: DEFAULT_TOLERANCE,
            version: "1".to_string(),
        }
    }
}

impl BuildConfig {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a store.
    pub fn load<S: ContentStore>(store: &S, path: &Path) -> Result<Self, ConfigError> {
        let text = store.read_text(path)?;
        Self::from_json(&text)
    }

    /// Apply overrides from a variable lookup (usually `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BOOK_OUTPUT_DIR").filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("BOOK_CHAPTERS").filter(|v| !v.is_empty()) {
            let count = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: "BOOK_CHAPTERS".to_string(),
                    value: value.clone(),
                })?;
            self.chapter_count = Some(count);
        }
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for lang in &self.languages {
            if !seen.insert(lang.code.as_str()) {
                return Err(ConfigError::DuplicateLanguage(lang.code.clone()));
            }
            if lang.strings.is_empty() {
                return Err(ConfigError::NoSources(lang.code.clone()));
            }
        }
        if self.language(&self.base_language).is_none() {
            return Err(ConfigError::UnknownBaseLanguage(self.base_language.clone()));
        }
        Ok(())
    }

    /// Source for `code`.
    pub fn language(&self, code: &str) -> Option<&LanguageSource> {
        self.languages.iter().find(|l| l.code == code)
    }

    /// Language codes with the base language first.
    pub fn language_order(&self) -> Vec<String> {
        let mut codes = vec![self.base_language.clone()];
        codes.extend(
            self.languages
                .iter()
                .filter(|l| l.code != self.base_language)
                .map(|l| l.code.clone()),
        );
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> BuildConfig {
        BuildConfig {
            languages: vec![
                LanguageSource::new("de", "loc/de.tsv"),
                LanguageSource::new("en", "loc/en.tsv"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_json_defaults() {
        let cfg = BuildConfig::from_json(
            r#"{"base_language":"en","languages":[{"code":"en","strings":["en.tsv"]}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.alias, AliasPolicy::default());
        assert_eq!(cfg.languages[0].strings_column, ColumnRule::Fixed(1));
        assert_eq!(
            cfg.languages[0].description_column,
            ColumnRule::Preferred { secondary: 2, primary: 1 }
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(BuildConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [("BOOK_OUTPUT_DIR", "/tmp/book"), ("BOOK_CHAPTERS", "3")].into();
        let mut cfg = config();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/book"));
        assert_eq!(cfg.chapter_count, Some(3));

        let err = cfg.apply_overrides(|k| (k == "BOOK_CHAPTERS").then(|| "three".to_string()));
        assert!(matches!(err, Err(ConfigError::InvalidOverride { .. })));
    }

    #[test]
    fn test_validate() {
        config().validate().unwrap();

        let mut cfg = config();
        cfg.base_language = "fr".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::UnknownBaseLanguage(code)) if code == "fr"));

        let mut cfg = config();
        cfg.languages.push(LanguageSource::new("de", "other.tsv"));
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateLanguage(_))));
    }

    #[test]
    fn test_language_order_base_first() {
        assert_eq!(config().language_order(), vec!["en".to_string(), "de".to_string()]);
    }
}
