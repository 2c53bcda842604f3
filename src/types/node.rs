//! Node types for the flow graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the flow graph.
///
/// Authoring-tool ids are opaque strings (usually hex like `0x0100000000001A2B`).
/// Implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Structural role of a node, decoded once from the export's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Top-level chapter fragment.
    Chapter,
    /// Dialogue container.
    Dialogue,
    /// Character entity.
    Entity,
    /// Location.
    Location,
    /// Single spoken line inside a dialogue.
    DialogueLine,
    /// Scripting instruction.
    Instruction,
    /// Branch condition.
    Condition,
    /// Jump to another node.
    Jump,
    /// Anything the pipeline does not interpret (subchapters, comments, ...).
    Other,
}

impl NodeRole {
    /// Parse a role from an export type tag.
    ///
    /// Returns `None` for unknown tags; callers map that to `Other` and log it.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Chapter" => Some(Self::Chapter),
            "Dialogue" => Some(Self::Dialogue),
            "Entity" => Some(Self::Entity),
            "Location" => Some(Self::Location),
            "DialogueFragment" | "DialogueLine" => Some(Self::DialogueLine),
            "Instruction" => Some(Self::Instruction),
            "Condition" => Some(Self::Condition),
            "Jump" => Some(Self::Jump),
            "FlowFragment" | "Comment" | "Hub" => Some(Self::Other),
            _ => None,
        }
    }

    /// Whether nodes of this role ship in the shared base document
    /// rather than inside a chapter.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Entity | Self::Location)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chapter => "chapter",
            Self::Dialogue => "dialogue",
            Self::Entity => "entity",
            Self::Location => "location",
            Self::DialogueLine => "dialogue_line",
            Self::Instruction => "instruction",
            Self::Condition => "condition",
            Self::Jump => "jump",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// RGBA color annotation, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Rgba {
    /// Create a color from unit-range components.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Create an opaque color from 8-bit components.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Whether all color channels are exactly zero (alpha ignored).
    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    /// Euclidean distance in RGB space (alpha ignored).
    pub fn distance(&self, other: &Rgba) -> f32 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Component-wise RGB match within `tolerance`.
    pub fn approx_eq(&self, other: &Rgba, tolerance: f32) -> bool {
        (self.r - other.r).abs() <= tolerance
            && (self.g - other.g).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
    }
}

/// One authoring-tool object after extraction.
///
/// Text fields hold localization keys, never resolved text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: NodeId,
    /// Decoded role.
    pub role: NodeRole,
    /// Raw type tag as exported, kept for unknown roles.
    pub type_tag: String,
    /// Localization key of the display name.
    pub display_name_key: Option<String>,
    /// Localization key of the body text.
    pub text_key: Option<String>,
    /// Localization key of the menu (choice) text.
    pub menu_text_key: Option<String>,
    /// Localization key of stage directions.
    pub stage_directions_key: Option<String>,
    /// Structurally enclosing node.
    pub parent: Option<NodeId>,
    /// Speaking entity, for dialogue lines.
    pub speaker: Option<NodeId>,
    /// Color annotation.
    pub color: Option<Rgba>,
    /// Entities and locations referenced by a dialogue.
    pub attachments: Vec<NodeId>,
    /// Raw scripting expression.
    pub expression: Option<String>,
}

impl Node {
    /// Create a bare node with the given id and role.
    pub fn new(id: impl Into<NodeId>, role: NodeRole) -> Self {
        Self {
            id: id.into(),
            role,
            type_tag: String::new(),
            display_name_key: None,
            text_key: None,
            menu_text_key: None,
            stage_directions_key: None,
            parent: None,
            speaker: None,
            color: None,
            attachments: Vec::new(),
            expression: None,
        }
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the display name key.
    pub fn with_display_name(mut self, key: impl Into<String>) -> Self {
        self.display_name_key = Some(key.into());
        self
    }

    /// Set the text key.
    pub fn with_text(mut self, key: impl Into<String>) -> Self {
        self.text_key = Some(key.into());
        self
    }

    /// Set the speaker.
    pub fn with_speaker(mut self, speaker: impl Into<NodeId>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// All localization keys carried by this node, stage directions excluded.
    pub fn text_keys(&self) -> impl Iterator<Item = &str> {
        [&self.display_name_key, &self.text_key, &self.menu_text_key]
            .into_iter()
            .filter_map(|k| k.as_deref())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
