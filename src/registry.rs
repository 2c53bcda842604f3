//! Character and location registry.
//!
//! The registry workbook has three sheets, each with one header row:
//!
//! | Sheet | Columns |
//! |---|---|
//! | `config` | key, value |
//! | `characters` | name, clothes variable, atlas files, base atlas, gendered |
//! | `locations` | number, name, sprite, idle sound, intro |
//!
//! Rows are keyed by translated display name and must match Entity/Location
//! nodes one to one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::FlowGraph;
use crate::store::{ContentStore, StoreError};
use crate::types::{CharacterMeta, LocationMeta, NodeId, NodeRole, RegistryConfig, PLACEHOLDER_ATLAS};

/// Sheet names.
pub const CONFIG_SHEET: &str = "config";
/// Character sheet.
pub const CHARACTER_SHEET: &str = "characters";
/// Location sheet.
pub const LOCATION_SHEET: &str = "locations";

/// Registry errors. All of them abort the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Two character rows share a name with conflicting atlas fields.
    #[error("Character '{0}' is defined more than once in the registry")]
    DuplicateCharacter(String),
    /// Two location rows share a name with conflicting sprites.
    #[error("Location '{0}' is defined more than once in the registry")]
    DuplicateLocation(String),
    /// Two location rows share a number.
    #[error("Location number {number} used by both '{first}' and '{second}'")]
    DuplicateLocationNumber {
        /// Shared number.
        number: i64,
        /// First name.
        first: String,
        /// Second name.
        second: String,
    },
    /// Two nodes translate to the same registry name.
    #[error("Two {kind} nodes are named '{name}' ({first}, {second})")]
    DuplicateNode {
        /// `character` or `location`.
        kind: &'static str,
        /// Shared display name.
        name: String,
        /// First node.
        first: NodeId,
        /// Second node.
        second: NodeId,
    },
    /// A registry row matches no node.
    #[error("Registry {kind} '{name}' matches no node in the export")]
    UnmatchedRow {
        /// `character` or `location`.
        kind: &'static str,
        /// Row name.
        name: String,
    },
    /// A cell cannot be decoded.
    #[error("Sheet '{sheet}' row {row}: {message}")]
    BadValue {
        /// Sheet name.
        sheet: &'static str,
        /// 1-based row number, header included.
        row: usize,
        /// What is wrong.
        message: String,
    },
    /// Sheet unreadable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(String::as_str).unwrap_or("")
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y" | "x")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the scalar configuration sheet.
pub fn parse_config(rows: &[Vec<String>]) -> Result<RegistryConfig, RegistryError> {
    let mut config = RegistryConfig {
        location_variable: RegistryConfig::DEFAULT_LOCATION_VARIABLE.to_string(),
        ..Default::default()
    };
    for (i, row) in rows.iter().enumerate().skip(1) {
        let key = cell(row, 0);
        let value = cell(row, 1);
        if key.is_empty() {
            continue;
        }
        match key {
            "Protagonist" => config.protagonist = Some(value.to_string()).filter(|v| !v.is_empty()),
            "Genders" => config.genders = parse_list(value),
            "Races" => config.races = parse_list(value),
            "CustomHairCount" => {
                config.custom_hair_count = if value.is_empty() {
                    0
                } else {
                    value.parse().map_err(|_| RegistryError::BadValue {
                        sheet: CONFIG_SHEET,
                        row: i + 1,
                        message: format!("CustomHairCount '{}' is not a number", value),
                    })?
                }
            }
            "CustomOutfitAtStart" => config.custom_outfit_at_start = parse_flag(value),
            "ClothesNames" => config.clothes_names = parse_list(value),
            "LocationVariable" if !value.is_empty() => config.location_variable = value.to_string(),
            _ => {
                config.extra.insert(key.to_string(), value.to_string());
            }
        }
    }
    Ok(config)
}

fn same_or_placeholder(a: &str, b: &str) -> bool {
    a.trim() == b.trim() || a.trim() == PLACEHOLDER_ATLAS || b.trim() == PLACEHOLDER_ATLAS
}

/// Parse the character sheet, folding tolerated duplicates.
pub fn parse_characters(rows: &[Vec<String>], config: &RegistryConfig) -> Result<Vec<CharacterMeta>, RegistryError> {
    let mut result: Vec<CharacterMeta> = Vec::new();
    for row in rows.iter().skip(1) {
        let name = cell(row, 0);
        if name.is_empty() {
            continue;
        }
        let mut meta = CharacterMeta::new(name, cell(row, 2), cell(row, 3));
        meta.clothes_variable = Some(cell(row, 1).to_string()).filter(|v| !v.is_empty());
        meta.gendered = parse_flag(cell(row, 4));
        meta.custom_outfit = config.is_protagonist(name) && config.custom_outfit_at_start;

        match result.iter_mut().find(|m| m.name == meta.name) {
            Some(existing) => {
                if !same_or_placeholder(&existing.atlas_files, &meta.atlas_files)
                    || !same_or_placeholder(&existing.base_atlas, &meta.base_atlas)
                {
                    return Err(RegistryError::DuplicateCharacter(meta.name));
                }
                tracing::warn!(name = %meta.name, "Duplicate character row tolerated");
                if existing.is_placeholder() && !meta.is_placeholder() {
                    *existing = meta;
                }
            }
            None => result.push(meta),
        }
    }
    Ok(result)
}

/// Parse the location sheet, folding tolerated duplicates.
pub fn parse_locations(rows: &[Vec<String>]) -> Result<Vec<LocationMeta>, RegistryError> {
    let mut result: Vec<LocationMeta> = Vec::new();
    for (i, row) in rows.iter().enumerate().skip(1) {
        let name = cell(row, 1);
        if name.is_empty() {
            continue;
        }
        let number: i64 = cell(row, 0).parse().map_err(|_| RegistryError::BadValue {
            sheet: LOCATION_SHEET,
            row: i + 1,
            message: format!("location number '{}' is not an integer", cell(row, 0)),
        })?;
        let meta = LocationMeta {
            number,
            name: name.to_string(),
            sprite: cell(row, 2).to_string(),
            idle_sound: Some(cell(row, 3).to_string()).filter(|v| !v.is_empty() && v != PLACEHOLDER_ATLAS),
            intro: parse_flag(cell(row, 4)),
            aid: None,
        };

        if let Some(existing) = result.iter_mut().find(|m| m.name == meta.name) {
            if !same_or_placeholder(&existing.sprite, &meta.sprite) {
                return Err(RegistryError::DuplicateLocation(meta.name));
            }
            tracing::warn!(name = %meta.name, "Duplicate location row tolerated");
            if existing.sprite.trim() == PLACEHOLDER_ATLAS {
                *existing = meta;
            }
            continue;
        }
        if let Some(other) = result.iter().find(|m| m.number == meta.number) {
            return Err(RegistryError::DuplicateLocationNumber {
                number: meta.number,
                first: other.name.clone(),
                second: meta.name,
            });
        }
        result.push(meta);
    }
    Ok(result)
}

/// Loaded registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// Scalar configuration.
    pub config: RegistryConfig,
    /// Character rows.
    pub characters: Vec<CharacterMeta>,
    /// Location rows.
    pub locations: Vec<LocationMeta>,
}

impl Registry {
    /// Load all three sheets of the workbook.
    pub fn load<S: ContentStore>(store: &S, workbook: &Path) -> Result<Self, RegistryError> {
        let config = parse_config(&store.read_sheet(workbook, CONFIG_SHEET)?)?;
        let characters = parse_characters(&store.read_sheet(workbook, CHARACTER_SHEET)?, &config)?;
        let locations = parse_locations(&store.read_sheet(workbook, LOCATION_SHEET)?)?;
        tracing::info!(
            characters = characters.len(),
            locations = locations.len(),
            protagonist = ?config.protagonist,
            "Registry loaded"
        );
        Ok(Self {
            config,
            characters,
            locations,
        })
    }

    /// Character row by display name.
    pub fn character(&self, name: &str) -> Option<&CharacterMeta> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Location row by display name.
    pub fn location(&self, name: &str) -> Option<&LocationMeta> {
        self.locations.iter().find(|l| l.name == name)
    }

    /// Location row by numeric id.
    pub fn location_by_number(&self, number: i64) -> Option<&LocationMeta> {
        self.locations.iter().find(|l| l.number == number)
    }

    /// Character row whose node is `id`.
    pub fn character_by_node(&self, id: &NodeId) -> Option<&CharacterMeta> {
        self.characters.iter().find(|c| c.aid.as_ref() == Some(id))
    }

    /// Location row whose node is `id`.
    pub fn location_by_node(&self, id: &NodeId) -> Option<&LocationMeta> {
        self.locations.iter().find(|l| l.aid.as_ref() == Some(id))
    }

    /// Attach node ids to rows by translated display name.
    ///
    /// Returns warnings for nodes that have no row or no translated name.
    pub fn cross_reference<'t, F>(&mut self, graph: &FlowGraph, translate: F) -> Result<Vec<String>, RegistryError>
    where
        F: Fn(&str) -> Option<&'t str>,
    {
        let mut warnings = Vec::new();
        let mut seen: BTreeMap<(NodeRole, String), NodeId> = BTreeMap::new();

        for node in graph.nodes().filter(|n| n.role.is_shared()) {
            let kind = if node.role == NodeRole::Entity { "character" } else { "location" };
            let name = match node.display_name_key.as_deref().and_then(|k| translate(k)) {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    tracing::warn!(node_id = %node.id, "Display name has no translation");
                    warnings.push(format!("{} node {} has no translated display name", kind, node.id));
                    continue;
                }
            };

            if let Some(first) = seen.get(&(node.role, name.clone())) {
                return Err(RegistryError::DuplicateNode {
                    kind,
                    name,
                    first: first.clone(),
                    second: node.id.clone(),
                });
            }
            seen.insert((node.role, name.clone()), node.id.clone());

            let slot = if node.role == NodeRole::Entity {
                self.characters.iter_mut().find(|c| c.name == name).map(|c| &mut c.aid)
            } else {
                self.locations.iter_mut().find(|l| l.name == name).map(|l| &mut l.aid)
            };
            match slot {
                Some(aid) => *aid = Some(node.id.clone()),
                None => {
                    tracing::warn!(node_id = %node.id, name = %name, "Node has no registry row");
                    warnings.push(format!("{} '{}' ({}) has no registry row", kind, name, node.id));
                }
            }
        }

        if let Some(row) = self.characters.iter().find(|c| c.aid.is_none()) {
            return Err(RegistryError::UnmatchedRow {
                kind: "character",
                name: row.name.clone(),
            });
        }
        if let Some(row) = self.locations.iter().find(|l| l.aid.is_none()) {
            return Err(RegistryError::UnmatchedRow {
                kind: "location",
                name: row.name.clone(),
            });
        }
        Ok(warnings)
    }
}
