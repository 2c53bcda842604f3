//! Build pipeline: one run from export to bundle.
//!
//! ```text
//! config ─► localization sources ─► extract ─► chapters ─► registry
//!                                                             │
//!      manifest ◄─ documents + assets ◄─ atlas check ◄─ grid ◄┘
//! ```
//!
//! Every check that can abort the run happens before the first write, so a
//! fatal error never leaves a partial bundle behind. Missing translation
//! keys are the exception: they fail one group in one language, the document
//! is still written, and the run finishes with the error in its report.
//!
//! Caches live in the [`RunContext`] and survive between runs until
//! [`RunContext::clear`]; the grid ledger is reset at the start of each run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

use crate::atlas::{AtlasChecker, AtlasError, AtlasReport, ClothingOutcome, ClothingTracker};
use crate::bundle::{
    copy_chapter_assets, BaseDocument, BookManifest, BundleLayout, ChapterDocument, ChapterSummary, GridDocument,
    ManifestBuilder, MetadataDocument,
};
use crate::cache::CacheStats;
use crate::config::{BuildConfig, ConfigError};
use crate::emotion::EmotionClassifier;
use crate::extract::{ExtractError, ExtractionCache};
use crate::graph::FlowGraph;
use crate::grid::{link_chapter, link_intro, AssetGridLinker, GridError};
use crate::hierarchy::{order_chapters, resolve, HierarchyError};
use crate::localization::{LocalizationCache, LocalizationEngine, LocalizationError, LocalizationGroup, WordCounts};
use crate::registry::{Registry, RegistryError};
use crate::store::{ContentStore, StoreError};
use crate::types::{NodeId, NodeRole, Unit, ValidationReport};

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Build configuration invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Export could not be turned into a graph.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// Chapters could not be ordered.
    #[error("Chapter hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
    /// Registry invalid or inconsistent with the graph.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    /// Content references an asset the registry does not describe.
    #[error("Grid linking failed: {0}")]
    Grid(#[from] GridError),
    /// Localization sources unusable.
    #[error("Localization error: {0}")]
    Localization(#[from] LocalizationError),
    /// Atlas manifests unreadable.
    #[error("Atlas error: {0}")]
    Atlas(#[from] AtlasError),
    /// Sprites missing from the atlases.
    #[error("Atlas incomplete:\n{0}")]
    IncompleteAtlas(String),
    /// Input or output failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caches shared by consecutive runs.
#[derive(Debug, Default)]
pub struct RunCache {
    extraction: ExtractionCache,
    localization: LocalizationCache,
}

/// Hit/miss counts of a [`RunCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCacheStats {
    /// Extracted graphs.
    pub extraction: CacheStats,
    /// Parsed localization tables.
    pub tables: CacheStats,
    /// Assembled languages.
    pub languages: CacheStats,
}

impl RunCache {
    /// Create empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extraction cache.
    pub fn extraction(&self) -> &ExtractionCache {
        &self.extraction
    }

    /// Localization cache.
    pub fn localization(&self) -> &LocalizationCache {
        &self.localization
    }

    /// Current statistics.
    pub fn stats(&self) -> RunCacheStats {
        let (tables, languages) = self.localization.stats();
        RunCacheStats {
            extraction: self.extraction.stats(),
            tables,
            languages,
        }
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.extraction.clear();
        self.localization.clear();
    }
}

/// State owned across runs: caches plus the ledger of the latest run.
#[derive(Debug, Default)]
pub struct RunContext {
    cache: RunCache,
    ledger: AssetGridLinker,
}

impl RunContext {
    /// Fresh context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches.
    pub fn cache(&self) -> &RunCache {
        &self.cache
    }

    /// Grid ledger of the latest run.
    pub fn ledger(&self) -> &AssetGridLinker {
        &self.ledger
    }

    /// Cache statistics.
    pub fn stats(&self) -> RunCacheStats {
        self.cache.stats()
    }

    /// Forget everything, e.g. on project or language switch.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.ledger = AssetGridLinker::new();
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Run identifier, for log correlation.
    pub run_id: Uuid,
    /// Manifest as written.
    pub manifest: BookManifest,
    /// Warnings and per-group errors.
    pub report: ValidationReport,
    /// Base-language word totals.
    pub words: WordCounts,
    /// Atlas check result (tolerated misses included).
    pub atlas: AtlasReport,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
}

impl BuildReport {
    /// Whether the bundle is valid: no group failed.
    pub fn is_success(&self) -> bool {
        self.report.is_ok()
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "book {} ({} chapters, {} languages, {} words)\n",
            self.manifest.book_id,
            self.manifest.chapters.len(),
            self.manifest.languages.len(),
            self.words.total
        );
        for chapter in &self.manifest.chapters {
            out.push_str(&format!(
                "  chapter {}: {} nodes, {} words\n",
                chapter.number, chapter.node_count, chapter.word_count
            ));
        }
        out.push_str(&self.report.render());
        out
    }
}

/// Keys of one chapter's localization group.
///
/// Stage directions are internal; everything else must be translated.
pub fn chapter_group(number: u32, nodes: &BTreeSet<NodeId>, graph: &FlowGraph) -> LocalizationGroup {
    let mut group = LocalizationGroup::new(LocalizationGroup::chapter_tag(number));
    for node in nodes.iter().filter_map(|id| graph.get(id)) {
        for key in [&node.display_name_key, &node.menu_text_key, &node.text_key].into_iter().flatten() {
            group.push_key(key);
        }
        if let Some(key) = &node.stage_directions_key {
            group.push_internal(key);
        }
    }
    group
}

/// Converts one export into a bundle.
pub struct BookPipeline<'a, S: ContentStore> {
    store: &'a S,
    config: BuildConfig,
}

impl<'a, S: ContentStore> BookPipeline<'a, S> {
    /// Pipeline over `store`.
    pub fn new(store: &'a S, config: BuildConfig) -> Self {
        Self { store, config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run every stage.
    pub fn run(&self, ctx: &mut RunContext) -> Result<BuildReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("build", run_id = %run_id);
        let _guard = span.enter();

        let result = self.run_stages(ctx, run_id);
        match &result {
            Ok(build) => tracing::info!(
                book_id = %build.manifest.book_id,
                words = build.words.total,
                errors = build.report.errors().count(),
                warnings = build.report.warnings().count(),
                "Build finished"
            ),
            Err(e) => tracing::error!(error = %e, "Build aborted"),
        }
        result
    }

    fn run_stages(&self, ctx: &mut RunContext, run_id: Uuid) -> Result<BuildReport, PipelineError> {
        let config = &self.config;
        config.validate()?;
        ctx.ledger = AssetGridLinker::new();
        let RunContext { cache, ledger } = ctx;
        let mut report = ValidationReport::new();

        let mut engine = LocalizationEngine::new(
            self.store,
            &cache.localization,
            &config.base_language,
            &config.languages,
            &config.alias,
        )?;
        for key in &engine.base().duplicates {
            report.warn(Unit::Run, format!("duplicate key {} in base language sources, first value kept", key));
        }

        let bytes = self.store.read_bytes(&config.export)?;
        let extraction = cache
            .extraction
            .get_or_extract(&bytes, &engine.base_fingerprint(), |k| engine.translate(k))?;
        for warning in &extraction.warnings {
            report.warn(Unit::Run, warning.clone());
        }
        let graph = &extraction.graph;
        tracing::info!(
            nodes = graph.num_nodes(),
            connections = graph.num_connections(),
            chapters = extraction.chapter_numbers.len(),
            "Export extracted"
        );

        let chapters = order_chapters(&extraction.chapter_numbers, config.chapter_count)?;
        let partition = resolve(graph, &chapters);
        for warning in &partition.warnings {
            report.warn(Unit::Run, warning.clone());
        }

        let mut registry = Registry::load(self.store, &config.registry)?;
        for warning in registry.cross_reference(graph, |k| engine.translate(k))? {
            report.warn(Unit::Run, warning);
        }

        for (i, (chapter, set)) in partition.iter().enumerate() {
            ledger.add_chapter(chapter.number)?;
            if i == 0 {
                link_intro(ledger, &registry)?;
            }
            link_chapter(ledger, graph, set, &registry)?;
        }
        tracing::info!(chapters = ledger.chapters().len(), "Assets linked");

        let mut checker = AtlasChecker::new(&registry, ClothingTracker::new(&registry, graph));
        for assets in ledger.chapters() {
            for (name, _) in &assets.characters {
                if let Some(meta) = registry.character(name) {
                    checker.add_character(meta);
                }
            }
        }
        for (chapter, set) in partition.iter() {
            let instructions = set
                .iter()
                .filter_map(|id| graph.get(id))
                .filter(|n| n.role == NodeRole::Instruction);
            for expression in instructions.filter_map(|n| n.expression.as_deref()) {
                for outcome in checker.record_clothing_usage(expression) {
                    if let ClothingOutcome::BadParse { statement, reason } = outcome {
                        report.warn(
                            Unit::Chapter(chapter.number),
                            format!("skipped clothing statement '{}': {}", statement, reason),
                        );
                    }
                }
            }
        }
        let atlas = checker.finalize(self.store, &config.atlas_root)?;
        if !atlas.is_complete() {
            for missing in &atlas.missing {
                report.error(Unit::Run, missing.message());
            }
            return Err(PipelineError::IncompleteAtlas(atlas.message()));
        }

        // Nothing below aborts on content; only store failures remain fatal.
        let layout = BundleLayout::new(&config.output_dir);
        let classifier = EmotionClassifier::new(config.emotion_tolerance);
        let mut manifest = ManifestBuilder::new(&config.version, &extraction.export_hash).languages(engine.language_codes());
        let mut written = Vec::new();

        for (chapter, set) in partition.iter() {
            let number = chapter.number;
            let document = ChapterDocument::build(number, &chapter.id, set, graph, &registry, &classifier, |k| {
                engine.translate(k)
            });
            let path = layout.chapter_document(number);
            self.store.write_document(&path, &document)?;
            written.push(path);

            let group = chapter_group(number, set, graph);
            let outcome = engine.emit_group(&group, |lang| layout.chapter_localization(number, lang), &mut report)?;
            for failure in &outcome.failures {
                tracing::error!(chapter = number, error = %failure, "Chapter localization incomplete");
            }
            written.extend(outcome.written.into_values());

            let mut summary = ChapterSummary {
                number,
                node_count: document.nodes.len(),
                characters: Vec::new(),
                locations: Vec::new(),
                word_count: engine.words().group(&group.tag),
            };
            if let Some(assets) = ledger.chapter(number) {
                written.extend(copy_chapter_assets(
                    self.store,
                    &layout,
                    assets,
                    &registry,
                    &config.atlas_root,
                    &config.asset_root,
                )?);
                summary.characters = assets.characters.iter().map(|(name, _)| name.clone()).collect();
                summary.locations = assets.locations.iter().map(|(name, _)| name.clone()).collect();
            }
            tracing::info!(chapter = number, nodes = summary.node_count, words = summary.word_count, "Chapter written");
            manifest = manifest.chapter(summary);
        }

        let description_keys = engine.base().description_keys.clone();
        let mut shared = LocalizationGroup::new(LocalizationGroup::SHARED);
        let named = graph
            .nodes_with_role(NodeRole::Entity)
            .chain(graph.nodes_with_role(NodeRole::Location))
            .chain(partition.chapters.iter().filter_map(|c| graph.get(&c.id)));
        for key in named.filter_map(|n| n.display_name_key.as_deref()) {
            shared.push_key(key);
        }
        let mut preview = LocalizationGroup::new(LocalizationGroup::PREVIEW);
        // Description text falls back to the base language and is never counted.
        for key in &description_keys {
            shared.push_internal(key);
            preview.push_internal(key);
        }
        for group in [&shared, &preview] {
            let outcome = engine.emit_group(group, |lang| layout.shared_localization(&group.tag, lang), &mut report)?;
            for failure in &outcome.failures {
                tracing::error!(group = %group.tag, error = %failure, "Shared localization incomplete");
            }
            written.extend(outcome.written.into_values());
        }

        let base = layout.base_document();
        self.store.write_document(&base, &BaseDocument::build(graph))?;
        let metadata = layout.metadata_document();
        self.store.write_document(&metadata, &MetadataDocument::from(&registry))?;
        let grid = layout.grid_document();
        self.store.write_document(
            &grid,
            &GridDocument {
                chapters: ledger.manifest(),
                ledger: ledger.chapters().to_vec(),
            },
        )?;
        written.extend([base, metadata, grid]);

        let manifest = manifest.build();
        let manifest_path = layout.manifest();
        self.store.write_document(&manifest_path, &manifest)?;
        written.push(manifest_path);

        Ok(BuildReport {
            run_id,
            manifest,
            report,
            words: engine.words().clone(),
            atlas,
            written,
        })
    }
}
