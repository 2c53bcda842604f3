//! Entity extraction from a raw flow-graph export.
//!
//! The export is a JSON document:
//!
//! ```text
//! {
//!   "GlobalVariables": [ { "Namespace": "Game", "Variables": [ {"Variable", "Type", "Value"} ] } ],
//!   "Packages": [
//!     { "Name": "Main", "Models": [
//!         { "Type": "DialogueFragment",
//!           "Properties": { "Id", "Parent", "DisplayName", "Text", "MenuText",
//!                           "StageDirections", "Speaker", "Color", "Attachments",
//!                           "Expression", "OutputPins": [ { "Connections": [ { "Target" } ] } ] } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Text properties are localization keys. Chapter numbers are parsed from the
//! *translated* display name, so extraction needs the base-language text and
//! is cached on (export bytes, base text) identity.

use regex_lite::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::cache::{CacheKey, CacheStats, MemoCache};
use crate::canonical::content_hash_hex;
use crate::graph::{FlowGraph, Namespace};
use crate::store::StoreError;
use crate::types::{Connection, Node, NodeId, NodeRole, Rgba};

/// Extraction errors. All of them abort the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    /// Export is not a valid document.
    #[error("Invalid export document: {0}")]
    Parse(String),
    /// Chapter node has no display name text.
    #[error("Chapter node {node} has no translated display name")]
    MissingChapterName {
        /// Chapter node.
        node: NodeId,
    },
    /// Chapter display name carries no number.
    #[error("Cannot parse chapter number from '{name}' (node {node})")]
    ChapterNumber {
        /// Chapter node.
        node: NodeId,
        /// Translated display name.
        name: String,
    },
    /// Export unreadable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawExport {
    #[serde(default)]
    global_variables: Vec<Namespace>,
    #[serde(default)]
    packages: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPackage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawModel {
    #[serde(rename = "Type", default)]
    type_tag: String,
    #[serde(default)]
    properties: RawProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProperties {
    id: Option<String>,
    parent: Option<String>,
    display_name: Option<String>,
    text: Option<String>,
    menu_text: Option<String>,
    stage_directions: Option<String>,
    speaker: Option<String>,
    color: Option<Rgba>,
    #[serde(default)]
    attachments: Vec<String>,
    expression: Option<String>,
    #[serde(default)]
    output_pins: Vec<RawPin>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPin {
    #[serde(default)]
    connections: Vec<RawConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConnection {
    target: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Result of extracting one export.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Typed graph.
    pub graph: FlowGraph,
    /// Parsed number of every chapter node.
    pub chapter_numbers: BTreeMap<NodeId, u32>,
    /// Hash of the export bytes.
    pub export_hash: String,
    /// Recoverable problems met while extracting.
    pub warnings: Vec<String>,
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid chapter number pattern"))
}

/// First run of digits in a chapter title.
pub fn parse_chapter_number(title: &str) -> Option<u32> {
    number_pattern()
        .find(title)
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract a typed graph from export bytes.
///
/// `translate` maps a localization key to base-language text; it is only
/// consulted for chapter display names.
pub fn extract<'t, F>(bytes: &[u8], translate: F) -> Result<Extraction, ExtractError>
where
    F: Fn(&str) -> Option<&'t str>,
{
    let raw: RawExport = serde_json::from_slice(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;

    let mut extraction = Extraction {
        export_hash: content_hash_hex(bytes),
        ..Default::default()
    };

    for namespace in raw.global_variables {
        extraction.graph.add_namespace(namespace);
    }

    for package in raw.packages {
        for model in package.models {
            let props = model.properties;
            let id = match non_blank(props.id) {
                Some(id) => NodeId::new(id),
                None => {
                    let msg = format!("node of type '{}' in package '{}' has no id, dropped", model.type_tag, package.name);
                    tracing::warn!(package = %package.name, type_tag = %model.type_tag, "Node without id dropped");
                    extraction.warnings.push(msg);
                    continue;
                }
            };

            if extraction.graph.contains(&id) {
                tracing::warn!(node_id = %id, type_tag = %model.type_tag, "Duplicate node id, later record dropped");
                extraction
                    .warnings
                    .push(format!("duplicate node id {} (type '{}'), later record dropped", id, model.type_tag));
                continue;
            }

            let role = match NodeRole::from_tag(&model.type_tag) {
                Some(role) => role,
                None => {
                    tracing::warn!(node_id = %id, type_tag = %model.type_tag, "Unknown node type, treated as Other");
                    extraction
                        .warnings
                        .push(format!("node {} has unknown type '{}', treated as other", id, model.type_tag));
                    NodeRole::Other
                }
            };

            for (pin, out) in props.output_pins.iter().enumerate() {
                for conn in &out.connections {
                    extraction
                        .graph
                        .add_connection(Connection::new(id.clone(), pin as u32, NodeId::new(conn.target.clone())));
                }
            }

            let node = Node {
                id: id.clone(),
                role,
                type_tag: model.type_tag,
                display_name_key: non_blank(props.display_name),
                text_key: non_blank(props.text),
                menu_text_key: non_blank(props.menu_text),
                stage_directions_key: non_blank(props.stage_directions),
                parent: non_blank(props.parent).map(NodeId::new),
                speaker: non_blank(props.speaker).map(NodeId::new),
                color: props.color,
                attachments: props
                    .attachments
                    .into_iter()
                    .filter(|a| !a.trim().is_empty())
                    .map(NodeId::new)
                    .collect(),
                expression: non_blank(props.expression),
            };

            if role == NodeRole::Chapter {
                let title = node
                    .display_name_key
                    .as_deref()
                    .and_then(|key| translate(key))
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| ExtractError::MissingChapterName { node: id.clone() })?;
                let number = parse_chapter_number(title).ok_or_else(|| ExtractError::ChapterNumber {
                    node: id.clone(),
                    name: title.to_string(),
                })?;
                extraction.chapter_numbers.insert(id.clone(), number);
            }

            extraction.graph.add_node(node);
        }
    }

    tracing::info!(
        nodes = extraction.graph.num_nodes(),
        connections = extraction.graph.num_connections(),
        chapters = extraction.chapter_numbers.len(),
        export_hash = %extraction.export_hash,
        "Export extracted"
    );
    Ok(extraction)
}

/// Memoized extraction keyed by (export bytes, base-language fingerprint).
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: MemoCache<Extraction>,
}

impl ExtractionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract, or return the cached result for identical inputs.
    pub fn get_or_extract<'t, F>(
        &self,
        bytes: &[u8],
        base_fingerprint: &str,
        translate: F,
    ) -> Result<Arc<Extraction>, ExtractError>
    where
        F: Fn(&str) -> Option<&'t str>,
    {
        let key = CacheKey::builder()
            .part(&content_hash_hex(bytes))
            .part(base_fingerprint)
            .finish();
        self.entries.get_or_try_insert(key, || extract(bytes, translate))
    }

    /// Hit/miss statistics.
    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn export() -> serde_json::Value {
        json!({
            "GlobalVariables": [
                { "Namespace": "Game", "Variables": [ { "Variable": "GunnClothes", "Type": "Integer", "Value": "1" } ] }
            ],
            "Packages": [ { "Name": "Main", "Models": [
                { "Type": "Chapter", "Properties": { "Id": "ch1", "DisplayName": "CH1_TITLE" } },
                { "Type": "Dialogue", "Properties": { "Id": "d1", "Parent": "ch1",
                    "OutputPins": [ { "Connections": [ { "Target": "d2" } ] } ] } },
                { "Type": "DialogueFragment", "Properties": { "Id": "l1", "Parent": "d1", "Speaker": "gunn",
                    "Text": "DLG_1", "Color": { "r": 1.0, "g": 0.0, "b": 0.0 } } },
                { "Type": "Entity", "Properties": { "Id": "gunn", "DisplayName": "CHR_GUNN" } },
                { "Type": "Spaceship", "Properties": { "Id": "x1" } },
                { "Type": "Dialogue", "Properties": { "Parent": "ch1" } }
            ] } ]
        })
    }

    fn titles() -> HashMap<&'static str, &'static str> {
        [("CH1_TITLE", "Chapter 1: Arrival")].into()
    }

    #[test]
    fn test_extract_roles_and_fields() {
        let titles = titles();
        let bytes = serde_json::to_vec(&export()).unwrap();
        let ex = extract(&bytes, |k| titles.get(k).copied()).unwrap();

        assert_eq!(ex.graph.num_nodes(), 5);
        assert_eq!(ex.graph.get(&"x1".into()).unwrap().role, NodeRole::Other);
        let line = ex.graph.get(&"l1".into()).unwrap();
        assert_eq!(line.role, NodeRole::DialogueLine);
        assert_eq!(line.speaker, Some(NodeId::new("gunn")));
        assert_eq!(line.color, Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(ex.chapter_numbers[&NodeId::new("ch1")], 1);
        assert_eq!(ex.graph.num_connections(), 1);
        assert_eq!(ex.graph.variable("Game", "GunnClothes").unwrap().initial_int(), Some(1));
        // Unknown type and missing id.
        assert_eq!(ex.warnings.len(), 2);
    }

    #[test]
    fn test_duplicate_id_keeps_first_record() {
        let mut export = export();
        export["Packages"][0]["Models"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "Type": "Dialogue", "Properties": { "Id": "ch1", "Parent": "gunn" } }));
        let titles = titles();
        let bytes = serde_json::to_vec(&export).unwrap();
        let ex = extract(&bytes, |k| titles.get(k).copied()).unwrap();

        let ch1 = ex.graph.get(&"ch1".into()).unwrap();
        assert_eq!(ch1.role, NodeRole::Chapter);
        assert_eq!(ch1.parent, None);
        assert_eq!(ex.chapter_numbers[&NodeId::new("ch1")], 1);
        assert_eq!(ex.warnings.len(), 3);
        assert!(ex.warnings.iter().any(|w| w.contains("duplicate node id ch1")));
    }

    #[test]
    fn test_chapter_without_number_is_fatal() {
        let titles: HashMap<&str, &str> = [("CH1_TITLE", "Prologue")].into();
        let bytes = serde_json::to_vec(&export()).unwrap();
        let err = extract(&bytes, |k| titles.get(k).copied()).unwrap_err();
        assert!(matches!(err, ExtractError::ChapterNumber { name, .. } if name == "Prologue"));
    }

    #[test]
    fn test_chapter_without_translation_is_fatal() {
        let bytes = serde_json::to_vec(&export()).unwrap();
        let err = extract(&bytes, |_| None).unwrap_err();
        assert!(matches!(err, ExtractError::MissingChapterName { .. }));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(extract(b"not json", |_| None), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_parse_chapter_number() {
        assert_eq!(parse_chapter_number("Chapter 12 - Storm"), Some(12));
        assert_eq!(parse_chapter_number("Глава 3"), Some(3));
        assert_eq!(parse_chapter_number("Epilogue"), None);
    }

    #[test]
    fn test_cache_hits_on_identical_inputs() {
        let titles = titles();
        let bytes = serde_json::to_vec(&export()).unwrap();
        let cache = ExtractionCache::new();

        let a = cache.get_or_extract(&bytes, "fp1", |k| titles.get(k).copied()).unwrap();
        let b = cache.get_or_extract(&bytes, "fp1", |k| titles.get(k).copied()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_extract(&bytes, "fp2", |k| titles.get(k).copied()).unwrap();
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 2);
    }
}
