//! # storybook-kernel
//!
//! Deterministic conversion of a narrative flow-graph export into a
//! chaptered, localized visual-novel bundle.
//!
//! The kernel answers one question per asset and per string:
//!
//! > Which chapter ships it, and is it complete in every language?
//!
//! ## Core Contract
//!
//! 1. Extract a typed [`FlowGraph`] from the authoring tool's export
//! 2. Partition it into chapters by walking parent chains
//! 3. Merge and validate localization per chapter and language
//! 4. Ship every character and location asset exactly once, in the first chapter using it
//! 5. Refuse a bundle whose sprites are missing from their atlases
//!
//! ## Architecture
//!
//! ```text
//! export ─► extract ─► hierarchy ─► grid ─► atlas ─► bundle
//!              │                      │
//!       localization ◄──────────── registry
//!              ↓
//!        ContentStore (filesystem or memory)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same export + same sources + same config → identical documents and `book_id`
//! - Node and key ordering is canonical (BTreeMap / sorted ids)
//! - Connections are ordered by (source, pin, target)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod cache;
pub mod store;
pub mod graph;
pub mod extract;
pub mod hierarchy;
pub mod registry;
pub mod script;
pub mod localization;
pub mod grid;
pub mod atlas;
pub mod emotion;
pub mod policy;
pub mod config;
pub mod bundle;
pub mod pipeline;

/// Schema identifier stamped into every manifest.
pub const BUNDLE_SCHEMA_VERSION: &str = "storybook_v1";

// Re-exports
pub use types::{NodeId, NodeRole, Node, Rgba, Connection};
pub use types::{CharacterMeta, LocationMeta, RegistryConfig};
pub use types::{Severity, Unit, Diagnostic, ValidationReport};
pub use canonical::{canonical_hash_hex, content_hash_hex, to_canonical_bytes, Fingerprint};
pub use cache::{CacheKey, CacheStats, MemoCache};
pub use store::{ContentStore, StoreError, InMemoryContentStore, FsContentStore};
pub use graph::{FlowGraph, Namespace, Variable, VariableType};
pub use extract::{extract, Extraction, ExtractionCache, ExtractError};
pub use hierarchy::{order_chapters, resolve, Chapter, ChapterPartition, HierarchyError};
pub use registry::{Registry, RegistryError};
pub use localization::{
    LocalizationCache, LocalizationEngine, LocalizationError, LocalizationGroup, GroupMerge, MergeState,
    WordCounts,
};
pub use grid::{AssetGridLinker, ChapterAssets, GridError};
pub use atlas::{AtlasChecker, AtlasError, AtlasReport, ClothingTracker, MissingSprite};
pub use emotion::{Emotion, EmotionClassifier};
pub use policy::AliasPolicy;
pub use config::{BuildConfig, ConfigError, LanguageSource};
pub use bundle::{BookManifest, BundleLayout, ManifestBuilder};
pub use pipeline::{BookPipeline, BuildReport, PipelineError, RunCache, RunContext};
