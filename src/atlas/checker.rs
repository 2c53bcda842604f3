//! Atlas manifest completeness check.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::Registry;
use crate::store::{ContentStore, StoreError};
use crate::types::CharacterMeta;
use super::clothing::{ClothingOutcome, ClothingTracker};
use super::requirements::{character_requirements, CharacterRequirements, SpriteRequirement};

/// Atlas errors. All of them abort the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AtlasError {
    /// A character's atlas manifest file does not exist.
    #[error("Atlas manifest {path} for '{character}' not found")]
    ManifestMissing {
        /// Character.
        character: String,
        /// Manifest path.
        path: PathBuf,
    },
    /// Manifest unreadable.
    #[error(transparent)]
    Store(StoreError),
}

/// A sprite found in none of a character's atlases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSprite {
    /// Character.
    pub character: String,
    /// Full primary sprite name.
    pub primary: String,
    /// Full fallback sprite name.
    pub fallback: Option<String>,
    /// Last atlas checked.
    pub atlas: PathBuf,
}

impl MissingSprite {
    /// Human-readable line.
    pub fn message(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "'{}': neither {} nor {} found in {}",
                self.character,
                self.primary,
                fallback,
                self.atlas.display()
            ),
            None => format!("'{}': {} not found in {}", self.character, self.primary, self.atlas.display()),
        }
    }
}

/// Outcome of [`AtlasChecker::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasReport {
    /// Sprites missing for characters without the custom-outfit exception.
    pub missing: Vec<MissingSprite>,
    /// Sprites missing but tolerated (custom outfit at game start).
    pub suppressed: Vec<MissingSprite>,
    /// Sprite requirements checked.
    pub checked: usize,
}

impl AtlasReport {
    /// Whether nothing is missing.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Error message, empty when complete.
    pub fn message(&self) -> String {
        self.missing
            .iter()
            .map(MissingSprite::message)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collects requirements over a run and checks them against atlases.
#[derive(Debug, Clone)]
pub struct AtlasChecker {
    registry: Registry,
    requirements: BTreeMap<String, CharacterRequirements>,
    clothing: ClothingTracker,
    bad_statements: Vec<(String, String)>,
}

impl AtlasChecker {
    /// Checker for a registry, with clothing seeded from `clothing`.
    pub fn new(registry: &Registry, clothing: ClothingTracker) -> Self {
        Self {
            registry: registry.clone(),
            requirements: BTreeMap::new(),
            clothing,
            bad_statements: Vec::new(),
        }
    }

    /// Require the sprites of a character introduced in the book.
    pub fn add_character(&mut self, meta: &CharacterMeta) {
        if self.requirements.contains_key(&meta.name) {
            return;
        }
        if let Some(req) = character_requirements(meta, &self.registry.config) {
            self.requirements.insert(meta.name.clone(), req);
        }
    }

    /// Interpret clothing assignments in an instruction.
    ///
    /// Malformed statements are logged and skipped.
    pub fn record_clothing_usage(&mut self, raw_script: &str) -> Vec<ClothingOutcome> {
        let outcomes = self.clothing.record_clothing_usage(raw_script);
        for outcome in &outcomes {
            if let ClothingOutcome::BadParse { statement, reason } = outcome {
                tracing::warn!(statement = %statement, reason = %reason, "Skipping malformed clothing statement");
                self.bad_statements.push((statement.clone(), reason.clone()));
            }
        }
        outcomes
    }

    /// Malformed clothing statements seen so far: (statement, reason).
    pub fn bad_statements(&self) -> &[(String, String)] {
        &self.bad_statements
    }

    /// Requirements of one character, clothing included.
    pub fn requirements(&self, character: &str) -> Option<CharacterRequirements> {
        let mut req = self.requirements.get(character)?.clone();
        for sprite in self.clothing.used(character) {
            req.require(SpriteRequirement::single(sprite));
        }
        Some(req)
    }

    /// Check every requirement against the atlas manifests under `atlas_root`.
    pub fn finalize<S: ContentStore>(&self, store: &S, atlas_root: &Path) -> Result<AtlasReport, AtlasError> {
        let mut report = AtlasReport::default();
        let mut manifests: BTreeMap<PathBuf, String> = BTreeMap::new();

        for name in self.requirements.keys() {
            let req = match self.requirements(name) {
                Some(req) => req,
                None => continue,
            };
            for file in &req.atlas_files {
                let path = atlas_root.join(file);
                if manifests.contains_key(&path) {
                    continue;
                }
                let text = store.read_text(&path).map_err(|e| match e {
                    StoreError::NotFound(path) => AtlasError::ManifestMissing {
                        character: req.name.clone(),
                        path,
                    },
                    other => AtlasError::Store(other),
                })?;
                manifests.insert(path, text);
            }

            for sprite in &req.sprites {
                report.checked += 1;
                let primary = format!("{}{}", req.prefix, sprite.primary);
                let fallback = sprite.fallback.as_ref().map(|f| format!("{}{}", req.prefix, f));

                let found = req.atlas_files.iter().any(|file| {
                    let text = manifests.get(&atlas_root.join(file)).map(String::as_str).unwrap_or("");
                    text.contains(&primary) || fallback.as_deref().map_or(false, |f| text.contains(f))
                });
                if found {
                    continue;
                }

                let missing = MissingSprite {
                    character: req.name.clone(),
                    primary,
                    fallback,
                    atlas: req.atlas_files.last().map(|f| atlas_root.join(f)).unwrap_or_default(),
                };
                if req.custom_outfit {
                    tracing::debug!(character = %req.name, sprite = %missing.primary, "Missing sprite tolerated for custom outfit");
                    report.suppressed.push(missing);
                } else {
                    tracing::warn!(character = %req.name, sprite = %missing.primary, atlas = %missing.atlas.display(), "Missing sprite");
                    report.missing.push(missing);
                }
            }
        }

        tracing::info!(
            characters = self.requirements.len(),
            checked = report.checked,
            missing = report.missing.len(),
            "Atlas check finished"
        );
        Ok(report)
    }
}
