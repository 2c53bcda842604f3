//! Registry metadata types: characters, locations and scalar configuration.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Atlas field value marking a placeholder row.
pub const PLACEHOLDER_ATLAS: &str = "-";

/// Character row from the registry spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMeta {
    /// Translated display name (registry key).
    pub name: String,
    /// Scripting variable holding the character's clothing index.
    pub clothes_variable: Option<String>,
    /// Comma-separated atlas manifest file names, checked in order.
    pub atlas_files: String,
    /// Sprite name prefix inside the atlases.
    pub base_atlas: String,
    /// Whether sprites come in gender variants.
    #[serde(default)]
    pub gendered: bool,
    /// Whether the player picks this character's outfit at game start.
    #[serde(default)]
    pub custom_outfit: bool,
    /// Resolved node id, attached during cross-referencing.
    pub aid: Option<NodeId>,
}

impl CharacterMeta {
    /// Create a character row.
    pub fn new(name: impl Into<String>, atlas_files: impl Into<String>, base_atlas: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clothes_variable: None,
            atlas_files: atlas_files.into(),
            base_atlas: base_atlas.into(),
            gendered: false,
            custom_outfit: false,
            aid: None,
        }
    }

    /// Atlas manifest files in check order.
    pub fn atlas_list(&self) -> Vec<&str> {
        self.atlas_files
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether this is a placeholder row without real atlases.
    pub fn is_placeholder(&self) -> bool {
        self.atlas_files.trim() == PLACEHOLDER_ATLAS
    }
}

/// Location row from the registry spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMeta {
    /// Numeric id used by location-change instructions.
    pub number: i64,
    /// Translated display name (registry key).
    pub name: String,
    /// Background sprite file.
    pub sprite: String,
    /// Ambient loop file.
    pub idle_sound: Option<String>,
    /// Whether the location is shown in the book intro.
    pub intro: bool,
    /// Resolved node id, attached during cross-referencing.
    pub aid: Option<NodeId>,
}

/// Scalar configuration sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Display name of the protagonist.
    pub protagonist: Option<String>,
    /// Gender variant names, e.g. `Male`, `Female`.
    pub genders: Vec<String>,
    /// Race variant names, protagonist only.
    pub races: Vec<String>,
    /// Number of custom hair styles; zero disables hair sprites.
    pub custom_hair_count: u32,
    /// Whether the protagonist picks an outfit at game start.
    pub custom_outfit_at_start: bool,
    /// Clothing sprite names indexed by clothes-variable value.
    pub clothes_names: Vec<String>,
    /// Scripting variable whose assignment changes the location.
    pub location_variable: String,
    /// Remaining key/value rows, echoed into the metadata document.
    pub extra: std::collections::BTreeMap<String, String>,
}

impl RegistryConfig {
    /// Default location variable name.
    pub const DEFAULT_LOCATION_VARIABLE: &'static str = "Location";

    /// Whether `name` is the protagonist.
    pub fn is_protagonist(&self, name: &str) -> bool {
        self.protagonist.as_deref() == Some(name)
    }
}
