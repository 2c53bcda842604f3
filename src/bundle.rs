//! Bundle documents and the book manifest.
//!
//! ## Layout
//!
//! ```text
//! {out}/
//!   manifest.json
//!   chapter_{n}/chapter.json
//!   chapter_{n}/localization/{lang}.json
//!   chapter_{n}/assets/...                 (newly introduced assets only)
//!   shared/base.json                       (global variables, entities, locations)
//!   shared/metadata.json                   (registry with resolved ids)
//!   shared/grid.json                       (chapter -> asset ids)
//!   shared/localization/sharedstrings_{lang}.json
//!   shared/localization/previewstrings_{lang}.json
//! ```
//!
//! Given the same inputs, every document except the manifest's `computed_at`
//! is byte-identical across runs, and so is `book_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::canonical::canonical_hash_hex;
use crate::emotion::{Emotion, EmotionClassifier};
use crate::graph::{FlowGraph, Namespace};
use crate::grid::ChapterAssets;
use crate::registry::Registry;
use crate::store::{ContentStore, StoreError};
use crate::types::{CharacterMeta, Connection, LocationMeta, Node, NodeId, NodeRole, RegistryConfig, PLACEHOLDER_ATLAS};
use crate::BUNDLE_SCHEMA_VERSION;

/// Output paths of one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    root: PathBuf,
}

impl BundleLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of chapter `n`.
    pub fn chapter_dir(&self, number: u32) -> PathBuf {
        self.root.join(format!("chapter_{}", number))
    }

    /// Chapter node document.
    pub fn chapter_document(&self, number: u32) -> PathBuf {
        self.chapter_dir(number).join("chapter.json")
    }

    /// Chapter localization document.
    pub fn chapter_localization(&self, number: u32, language: &str) -> PathBuf {
        self.chapter_dir(number)
            .join("localization")
            .join(format!("{}.json", language))
    }

    /// Chapter asset directory.
    pub fn chapter_assets(&self, number: u32) -> PathBuf {
        self.chapter_dir(number).join("assets")
    }

    /// Shared directory.
    pub fn shared_dir(&self) -> PathBuf {
        self.root.join("shared")
    }

    /// Shared base document.
    pub fn base_document(&self) -> PathBuf {
        self.shared_dir().join("base.json")
    }

    /// Registry metadata document.
    pub fn metadata_document(&self) -> PathBuf {
        self.shared_dir().join("metadata.json")
    }

    /// Chapter -> asset manifest.
    pub fn grid_document(&self) -> PathBuf {
        self.shared_dir().join("grid.json")
    }

    /// Shared or preview localization document.
    pub fn shared_localization(&self, group: &str, language: &str) -> PathBuf {
        self.shared_dir()
            .join("localization")
            .join(format!("{}_{}.json", group, language))
    }

    /// Book manifest.
    pub fn manifest(&self) -> PathBuf {
        self.root.join("manifest.json")
    }
}

/// One spoken or internal line of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationEntry {
    /// Localization key.
    pub source_key: String,
    /// Base-language text.
    pub text: String,
    /// Speaker's registry name.
    pub speaker_display_name: Option<String>,
    /// Emotion from the line's color.
    pub emotion: Emotion,
    /// Stage direction, not shown to players.
    pub is_internal: bool,
}

/// Per-chapter node document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDocument {
    /// Chapter number.
    pub number: u32,
    /// Chapter node.
    pub chapter_id: NodeId,
    /// Nodes of the chapter, in id order.
    pub nodes: Vec<Node>,
    /// Connections inside the chapter.
    pub connections: Vec<Connection>,
    /// Dialogue lines with resolved speaker and emotion.
    pub lines: Vec<LocalizationEntry>,
}

impl ChapterDocument {
    /// Build the document for one chapter's node set.
    pub fn build<'t, F>(
        number: u32,
        chapter_id: &NodeId,
        nodes: &BTreeSet<NodeId>,
        graph: &FlowGraph,
        registry: &Registry,
        classifier: &EmotionClassifier,
        translate: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<&'t str>,
    {
        let members: Vec<Node> = nodes.iter().filter_map(|id| graph.get(id)).cloned().collect();
        let mut lines = Vec::new();

        for node in members.iter().filter(|n| n.role == NodeRole::DialogueLine) {
            let speaker = node
                .speaker
                .as_ref()
                .and_then(|s| registry.character_by_node(s))
                .map(|c| c.name.clone());
            let emotion = classifier.classify(node.color.as_ref());

            let keys = [(&node.text_key, false), (&node.stage_directions_key, true)];
            for (key, is_internal) in keys {
                if let Some(key) = key {
                    lines.push(LocalizationEntry {
                        source_key: key.clone(),
                        text: translate(key.as_str()).unwrap_or_default().to_string(),
                        speaker_display_name: speaker.clone(),
                        emotion,
                        is_internal,
                    });
                }
            }
        }

        Self {
            number,
            chapter_id: chapter_id.clone(),
            nodes: members,
            connections: graph.connections_within(nodes),
            lines,
        }
    }
}

/// Shared base document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseDocument {
    /// Global variable declarations.
    pub global_variables: Vec<Namespace>,
    /// Entity nodes.
    pub entities: Vec<Node>,
    /// Location nodes.
    pub locations: Vec<Node>,
}

impl BaseDocument {
    /// Collect shared nodes from the graph.
    pub fn build(graph: &FlowGraph) -> Self {
        Self {
            global_variables: graph.namespaces().to_vec(),
            entities: graph.nodes_with_role(NodeRole::Entity).cloned().collect(),
            locations: graph.nodes_with_role(NodeRole::Location).cloned().collect(),
        }
    }
}

/// Registry echo with resolved ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Scalar configuration.
    pub config: RegistryConfig,
    /// Characters.
    pub characters: Vec<CharacterMeta>,
    /// Locations.
    pub locations: Vec<LocationMeta>,
}

impl From<&Registry> for MetadataDocument {
    fn from(registry: &Registry) -> Self {
        Self {
            config: registry.config.clone(),
            characters: registry.characters.clone(),
            locations: registry.locations.clone(),
        }
    }
}

/// Chapter -> asset manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDocument {
    /// Asset ids per chapter number.
    pub chapters: BTreeMap<u32, Vec<NodeId>>,
    /// Full ledger with names.
    pub ledger: Vec<ChapterAssets>,
}

/// Copy the files of newly introduced assets into the chapter.
///
/// Character atlas manifests come from `atlas_root`, location sprites and
/// idle sounds from `asset_root`. Placeholder entries are skipped.
pub fn copy_chapter_assets<S: ContentStore>(
    store: &S,
    layout: &BundleLayout,
    assets: &ChapterAssets,
    registry: &Registry,
    atlas_root: &Path,
    asset_root: &Path,
) -> Result<Vec<PathBuf>, StoreError> {
    let target_dir = layout.chapter_assets(assets.number);
    let mut sources: Vec<PathBuf> = Vec::new();

    for (name, _) in &assets.characters {
        if let Some(meta) = registry.character(name).filter(|m| !m.is_placeholder()) {
            sources.extend(meta.atlas_list().into_iter().map(|f| atlas_root.join(f)));
        }
    }
    for (name, _) in &assets.locations {
        if let Some(meta) = registry.location(name) {
            for file in std::iter::once(&meta.sprite).chain(meta.idle_sound.iter()) {
                if !file.is_empty() && file != PLACEHOLDER_ATLAS {
                    sources.push(asset_root.join(file));
                }
            }
        }
    }

    let mut copied = Vec::new();
    for source in sources {
        let file_name = match source.file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let target = target_dir.join(file_name);
        if copied.contains(&target) {
            continue;
        }
        store.copy_asset(&source, &target)?;
        copied.push(target);
    }
    tracing::debug!(chapter = assets.number, files = copied.len(), "Chapter assets copied");
    Ok(copied)
}

/// Per-chapter manifest summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    /// Chapter number.
    pub number: u32,
    /// Nodes in the chapter document.
    pub node_count: usize,
    /// Characters introduced.
    pub characters: Vec<String>,
    /// Locations introduced.
    pub locations: Vec<String>,
    /// Base-language words.
    pub word_count: usize,
}

/// The complete book manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookManifest {
    /// Content-derived identifier.
    pub book_id: String,
    /// Schema version.
    pub schema: String,
    /// Bundle version from the build config.
    pub version: String,
    /// Hash of the export document.
    pub export_hash: String,
    /// Chapters in order.
    pub chapters: Vec<ChapterSummary>,
    /// Languages, base first.
    pub languages: Vec<String>,
    /// Base-language words over the whole book.
    pub total_words: usize,
    /// RFC 3339 build time.
    pub computed_at: String,
}

/// Internal struct for computing book_id.
#[derive(Serialize)]
struct BookIdInput<'a> {
    schema: &'a str,
    version: &'a str,
    export_hash: &'a str,
    chapters: &'a [ChapterSummary],
    languages: &'a [String],
    total_words: usize,
}

/// Builder for book manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    version: String,
    export_hash: String,
    chapters: Vec<ChapterSummary>,
    languages: Vec<String>,
}

impl ManifestBuilder {
    /// Create a new builder.
    pub fn new(version: impl Into<String>, export_hash: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            export_hash: export_hash.into(),
            ..Default::default()
        }
    }

    /// Add a chapter summary.
    pub fn chapter(mut self, summary: ChapterSummary) -> Self {
        self.chapters.push(summary);
        self
    }

    /// Set the languages.
    pub fn languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Build the manifest stamped with `computed_at`.
    pub fn build_at(self, computed_at: DateTime<Utc>) -> BookManifest {
        let total_words = self.chapters.iter().map(|c| c.word_count).sum();
        let book_id = canonical_hash_hex(&BookIdInput {
            schema: BUNDLE_SCHEMA_VERSION,
            version: &self.version,
            export_hash: &self.export_hash,
            chapters: &self.chapters,
            languages: &self.languages,
            total_words,
        });

        BookManifest {
            book_id,
            schema: BUNDLE_SCHEMA_VERSION.to_string(),
            version: self.version,
            export_hash: self.export_hash,
            chapters: self.chapters,
            languages: self.languages,
            total_words,
            computed_at: computed_at.to_rfc3339(),
        }
    }

    /// Build the manifest stamped with the current time.
    pub fn build(self) -> BookManifest {
        self.build_at(Utc::now())
    }
}
