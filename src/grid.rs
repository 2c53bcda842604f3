//! Asset grid linking.
//!
//! Each character and location asset ships in the first chapter that uses it
//! and never again, so chapter bundles are incremental deltas. The
//! [`AssetGridLinker`] is the append-only ledger enforcing that.
//!
//! ```text
//! chapter 1: intro locations, then assets referenced by chapter 1 content
//! chapter N: assets referenced by chapter N content, minus everything before
//! ```
//!
//! References are resolved against the registry; an asset the registry does
//! not describe aborts the run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::FlowGraph;
use crate::registry::Registry;
use crate::script::{parse_assignment, statements, AssignOp};
use crate::types::{NodeId, NodeRole};

/// Grid errors. All of them abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// `add_*` called before any chapter.
    #[error("No chapter open for asset '{0}'")]
    NoOpenChapter(String),
    /// Chapters must be added in increasing order.
    #[error("Chapter {next} added after chapter {previous}")]
    ChapterOrder {
        /// Last chapter.
        previous: u32,
        /// Rejected chapter.
        next: u32,
    },
    /// Speaker is not a registered character.
    #[error("Line {node} is spoken by {speaker}, which is not a registered character")]
    UnknownSpeaker {
        /// Dialogue line.
        node: NodeId,
        /// Speaker id.
        speaker: NodeId,
    },
    /// Attachment is neither a registered character nor location.
    #[error("Dialogue {node} references {target}, which is not in the registry")]
    UnknownAttachment {
        /// Dialogue.
        node: NodeId,
        /// Attached id.
        target: NodeId,
    },
    /// Location-change instruction names an unknown location.
    #[error("Instruction {node} sets location {number}, which is not in the registry")]
    UnknownLocation {
        /// Instruction.
        node: NodeId,
        /// Location number.
        number: String,
    },
}

/// Assets first introduced by one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAssets {
    /// Chapter number.
    pub number: u32,
    /// Character name -> asset id, in introduction order.
    pub characters: Vec<(String, NodeId)>,
    /// Location name -> asset id, in introduction order.
    pub locations: Vec<(String, NodeId)>,
}

/// Append-only per-run ledger of introduced assets.
#[derive(Debug, Clone, Default)]
pub struct AssetGridLinker {
    chapters: Vec<ChapterAssets>,
    characters: BTreeSet<String>,
    locations: BTreeSet<String>,
}

impl AssetGridLinker {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the next chapter.
    pub fn add_chapter(&mut self, number: u32) -> Result<(), GridError> {
        if let Some(last) = self.chapters.last() {
            if number <= last.number {
                return Err(GridError::ChapterOrder {
                    previous: last.number,
                    next: number,
                });
            }
        }
        self.chapters.push(ChapterAssets {
            number,
            ..Default::default()
        });
        Ok(())
    }

    /// Introduce a character in the open chapter.
    ///
    /// Returns `false` (and does nothing) if it was introduced before.
    pub fn add_character(&mut self, name: &str, asset_id: &NodeId) -> Result<bool, GridError> {
        if self.characters.contains(name) {
            return Ok(false);
        }
        let chapter = self
            .chapters
            .last_mut()
            .ok_or_else(|| GridError::NoOpenChapter(name.to_string()))?;
        chapter.characters.push((name.to_string(), asset_id.clone()));
        self.characters.insert(name.to_string());
        Ok(true)
    }

    /// Introduce a location in the open chapter.
    ///
    /// Returns `false` (and does nothing) if it was introduced before.
    pub fn add_location(&mut self, name: &str, asset_id: &NodeId) -> Result<bool, GridError> {
        if self.locations.contains(name) {
            return Ok(false);
        }
        let chapter = self
            .chapters
            .last_mut()
            .ok_or_else(|| GridError::NoOpenChapter(name.to_string()))?;
        chapter.locations.push((name.to_string(), asset_id.clone()));
        self.locations.insert(name.to_string());
        Ok(true)
    }

    /// Whether a character was introduced in any chapter so far.
    pub fn is_character_present(&self, name: &str) -> bool {
        self.characters.contains(name)
    }

    /// Whether a location was introduced in any chapter so far.
    pub fn is_location_present(&self, name: &str) -> bool {
        self.locations.contains(name)
    }

    /// Ledger in chapter order.
    pub fn chapters(&self) -> &[ChapterAssets] {
        &self.chapters
    }

    /// Assets of one chapter.
    pub fn chapter(&self, number: u32) -> Option<&ChapterAssets> {
        self.chapters.iter().find(|c| c.number == number)
    }

    /// Chapter number -> asset ids, for the shared manifest.
    pub fn manifest(&self) -> BTreeMap<u32, Vec<NodeId>> {
        self.chapters
            .iter()
            .map(|c| {
                let ids = c
                    .characters
                    .iter()
                    .chain(c.locations.iter())
                    .map(|(_, id)| id.clone())
                    .collect();
                (c.number, ids)
            })
            .collect()
    }
}

/// Link intro locations into the open chapter.
pub fn link_intro(linker: &mut AssetGridLinker, registry: &Registry) -> Result<(), GridError> {
    for location in registry.locations.iter().filter(|l| l.intro) {
        if let Some(aid) = &location.aid {
            linker.add_location(&location.name, aid)?;
        }
    }
    Ok(())
}

/// Link every asset referenced by one chapter's nodes.
pub fn link_chapter(
    linker: &mut AssetGridLinker,
    graph: &FlowGraph,
    nodes: &BTreeSet<NodeId>,
    registry: &Registry,
) -> Result<(), GridError> {
    let location_variable = registry.config.location_variable.as_str();

    for node in nodes.iter().filter_map(|id| graph.get(id)) {
        match node.role {
            NodeRole::DialogueLine => {
                if let Some(speaker) = &node.speaker {
                    let meta = registry
                        .character_by_node(speaker)
                        .ok_or_else(|| GridError::UnknownSpeaker {
                            node: node.id.clone(),
                            speaker: speaker.clone(),
                        })?;
                    linker.add_character(&meta.name, speaker)?;
                }
            }
            NodeRole::Dialogue => {
                for target in &node.attachments {
                    if let Some(meta) = registry.character_by_node(target) {
                        linker.add_character(&meta.name, target)?;
                    } else if let Some(meta) = registry.location_by_node(target) {
                        linker.add_location(&meta.name, target)?;
                    } else {
                        return Err(GridError::UnknownAttachment {
                            node: node.id.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
            NodeRole::Instruction => {
                let expression = match &node.expression {
                    Some(e) => e,
                    None => continue,
                };
                for statement in statements(expression) {
                    let assignment = match parse_assignment(statement) {
                        Some(a) if a.variable == location_variable && a.op == AssignOp::Set => a,
                        _ => continue,
                    };
                    let meta = assignment
                        .literal()
                        .and_then(|n| registry.location_by_number(n))
                        .filter(|m| m.aid.is_some())
                        .ok_or_else(|| GridError::UnknownLocation {
                            node: node.id.clone(),
                            number: assignment.value.clone(),
                        })?;
                    if let Some(aid) = &meta.aid {
                        linker.add_location(&meta.name, aid)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CharacterMeta, LocationMeta, Node};

    fn registry() -> Registry {
        let mut gunn = CharacterMeta::new("Gunn", "gunn.txt", "Gunn");
        gunn.aid = Some(NodeId::new("e_gunn"));
        let mut mira = CharacterMeta::new("Mira", "mira.txt", "Mira");
        mira.aid = Some(NodeId::new("e_mira"));
        let location = |number: i64, name: &str, intro: bool| LocationMeta {
            number,
            name: name.to_string(),
            sprite: format!("{}.png", name.to_lowercase()),
            idle_sound: None,
            intro,
            aid: Some(NodeId::new(format!("loc_{}", number))),
        };
        let mut registry = Registry {
            characters: vec![gunn, mira],
            locations: vec![location(1, "Docks", true), location(2, "Tavern", false)],
            ..Default::default()
        };
        registry.config.location_variable = "Location".into();
        registry
    }

    fn graph() -> FlowGraph {
        let mut g = FlowGraph::new();
        g.add_node(Node::new("l1", NodeRole::DialogueLine).with_speaker("e_gunn"));
        g.add_node(Node::new("l2", NodeRole::DialogueLine).with_speaker("e_mira"));
        let mut d = Node::new("d1", NodeRole::Dialogue);
        d.attachments = vec![NodeId::new("e_gunn"), NodeId::new("loc_2")];
        g.add_node(d);
        g.add_node(Node::new("i1", NodeRole::Instruction).with_expression("World.Location = 2; Game.Gold += 5"));
        g.add_node(Node::new("bad_line", NodeRole::DialogueLine).with_speaker("stranger"));
        g.add_node(Node::new("bad_instr", NodeRole::Instruction).with_expression("World.Location = 9"));
        g
    }

    fn set(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|s| NodeId::new(*s)).collect()
    }

    #[test]
    fn test_exactly_once() {
        let mut linker = AssetGridLinker::new();
        let id = NodeId::new("e_gunn");
        linker.add_chapter(1).unwrap();
        assert!(linker.add_character("Gunn", &id).unwrap());
        linker.add_chapter(2).unwrap();
        assert!(linker.is_character_present("Gunn"));
        assert!(!linker.add_character("Gunn", &id).unwrap());
        assert!(linker.chapter(2).unwrap().characters.is_empty());
        assert_eq!(linker.manifest()[&1], vec![id]);
    }

    #[test]
    fn test_requires_open_chapter_in_order() {
        let mut linker = AssetGridLinker::new();
        assert!(matches!(
            linker.add_location("Docks", &NodeId::new("loc_1")),
            Err(GridError::NoOpenChapter(_))
        ));
        linker.add_chapter(2).unwrap();
        assert_eq!(linker.add_chapter(1), Err(GridError::ChapterOrder { previous: 2, next: 1 }));
    }

    #[test]
    fn test_link_chapters() {
        let (g, r) = (graph(), registry());
        let mut linker = AssetGridLinker::new();
        linker.add_chapter(1).unwrap();
        link_intro(&mut linker, &r).unwrap();
        link_chapter(&mut linker, &g, &set(&["d1", "l1"]), &r).unwrap();
        linker.add_chapter(2).unwrap();
        link_chapter(&mut linker, &g, &set(&["i1", "l1", "l2"]), &r).unwrap();

        let ch1 = linker.chapter(1).unwrap();
        let names: Vec<&str> = ch1.locations.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Docks", "Tavern"]);
        assert_eq!(ch1.characters.len(), 1);

        let ch2 = linker.chapter(2).unwrap();
        assert_eq!(ch2.characters, vec![("Mira".to_string(), NodeId::new("e_mira"))]);
        assert!(ch2.locations.is_empty());
    }

    #[test]
    fn test_unknown_references_are_fatal() {
        let (g, r) = (graph(), registry());
        let mut linker = AssetGridLinker::new();
        linker.add_chapter(1).unwrap();

        let err = link_chapter(&mut linker, &g, &set(&["bad_line"]), &r).unwrap_err();
        assert!(matches!(err, GridError::UnknownSpeaker { .. }));

        let err = link_chapter(&mut linker, &g, &set(&["bad_instr"]), &r).unwrap_err();
        assert_eq!(
            err,
            GridError::UnknownLocation {
                node: NodeId::new("bad_instr"),
                number: "9".into()
            }
        );
    }
}
