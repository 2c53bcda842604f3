//! Chapter ordering and node partitioning.
//!
//! ## Algorithm
//!
//! ```text
//! 1. Order chapter nodes by parsed number; keep the first N (N = requested count).
//! 2. For every Dialogue, walk `parent` upward (bounded by node count):
//!      reached a kept chapter   → assign to it
//!      reached nothing / bound  → dead end, excluded and logged
//! 3. Per chapter, add every non-shared descendant whose parent is already
//!    in the set, until nothing changes.
//! ```
//!
//! Entity and Location nodes never enter a chapter set; they ship in the
//! shared base document. Every node lands in at most one set.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::FlowGraph;
use crate::types::{NodeId, NodeRole};

/// Hierarchy errors. All of them abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    /// Fewer chapters than requested.
    #[error("Not enough chapters: {requested} requested, {found} found")]
    NotEnoughChapters {
        /// Requested count.
        requested: usize,
        /// Chapters in the export.
        found: usize,
    },
    /// The export has no chapter nodes.
    #[error("Export contains no chapters")]
    NoChapters,
    /// Two chapter nodes parse to the same number.
    #[error("Chapter number {number} used by both {first} and {second}")]
    DuplicateNumber {
        /// Shared number.
        number: u32,
        /// First node.
        first: NodeId,
        /// Second node.
        second: NodeId,
    },
    /// Numbers are not 1, 2, 3, ...
    #[error("Chapter numbering has a gap: expected {expected}, found {found}")]
    Gap {
        /// Expected number.
        expected: u32,
        /// Number found at that position.
        found: u32,
    },
}

/// One kept chapter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based chapter number.
    pub number: u32,
    /// Chapter node.
    pub id: NodeId,
}

/// Order chapters by number and apply the requested count.
///
/// Extra chapters are dropped from the tail; a shortfall is fatal.
pub fn order_chapters(
    numbers: &BTreeMap<NodeId, u32>,
    requested: Option<usize>,
) -> Result<Vec<Chapter>, HierarchyError> {
    let mut chapters: Vec<Chapter> = numbers
        .iter()
        .map(|(id, n)| Chapter { number: *n, id: id.clone() })
        .collect();
    chapters.sort();

    if chapters.is_empty() {
        return Err(HierarchyError::NoChapters);
    }
    if let Some(requested) = requested {
        if chapters.len() < requested {
            return Err(HierarchyError::NotEnoughChapters {
                requested,
                found: chapters.len(),
            });
        }
        if chapters.len() > requested {
            tracing::info!(requested, found = chapters.len(), "Dropping chapters beyond requested count");
            chapters.truncate(requested);
        }
    }

    for pair in chapters.windows(2) {
        if pair[0].number == pair[1].number {
            return Err(HierarchyError::DuplicateNumber {
                number: pair[0].number,
                first: pair[0].id.clone(),
                second: pair[1].id.clone(),
            });
        }
    }
    for (i, chapter) in chapters.iter().enumerate() {
        let expected = i as u32 + 1;
        if chapter.number != expected {
            return Err(HierarchyError::Gap {
                expected,
                found: chapter.number,
            });
        }
    }
    Ok(chapters)
}

/// Chapter -> node set partition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterPartition {
    /// Kept chapters in order.
    pub chapters: Vec<Chapter>,
    /// One node set per chapter, same order.
    pub sets: Vec<BTreeSet<NodeId>>,
    /// Dialogues whose parent chain reached no kept chapter.
    pub excluded: Vec<NodeId>,
    /// Dead-end walks worth reporting.
    pub warnings: Vec<String>,
}

impl ChapterPartition {
    /// Number of the chapter containing `id`.
    pub fn chapter_of(&self, id: &NodeId) -> Option<u32> {
        self.chapters
            .iter()
            .zip(&self.sets)
            .find(|(_, set)| set.contains(id))
            .map(|(c, _)| c.number)
    }

    /// Iterate (chapter, set) pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Chapter, &BTreeSet<NodeId>)> {
        self.chapters.iter().zip(self.sets.iter())
    }

    /// Number of chapters.
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Whether there are no chapters.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

enum Walk {
    Reached(usize),
    DroppedChapter,
    DeadEnd(Option<NodeId>),
    Bounded,
}

fn walk_up(graph: &FlowGraph, start: &NodeId, index: &BTreeMap<&NodeId, usize>) -> Walk {
    let bound = graph.num_nodes();
    let mut current = graph.get(start).and_then(|n| n.parent.clone());
    let mut steps = 0usize;

    while let Some(id) = current {
        if let Some(&i) = index.get(&id) {
            return Walk::Reached(i);
        }
        steps += 1;
        if steps > bound {
            return Walk::Bounded;
        }
        match graph.get(&id) {
            Some(node) if node.role == NodeRole::Chapter => return Walk::DroppedChapter,
            Some(node) => current = node.parent.clone(),
            None => return Walk::DeadEnd(Some(id)),
        }
    }
    Walk::DeadEnd(None)
}

/// Partition the graph into per-chapter node sets.
pub fn resolve(graph: &FlowGraph, chapters: &[Chapter]) -> ChapterPartition {
    let index: BTreeMap<&NodeId, usize> = chapters.iter().enumerate().map(|(i, c)| (&c.id, i)).collect();
    let mut partition = ChapterPartition {
        chapters: chapters.to_vec(),
        sets: chapters.iter().map(|c| BTreeSet::from([c.id.clone()])).collect(),
        ..Default::default()
    };

    for dialogue in graph.nodes_with_role(NodeRole::Dialogue) {
        match walk_up(graph, &dialogue.id, &index) {
            Walk::Reached(i) => {
                partition.sets[i].insert(dialogue.id.clone());
            }
            Walk::DroppedChapter => {
                tracing::debug!(node_id = %dialogue.id, "Dialogue belongs to a dropped chapter");
                partition.excluded.push(dialogue.id.clone());
            }
            Walk::DeadEnd(dangling) => {
                let msg = match dangling {
                    Some(parent) => format!("dialogue {} has dangling parent {}, excluded", dialogue.id, parent),
                    None => format!("dialogue {} is not under any chapter, excluded", dialogue.id),
                };
                tracing::warn!(node_id = %dialogue.id, "Parent chain dead end");
                partition.warnings.push(msg);
                partition.excluded.push(dialogue.id.clone());
            }
            Walk::Bounded => {
                tracing::warn!(node_id = %dialogue.id, bound = graph.num_nodes(), "Parent chain exceeds node count");
                partition
                    .warnings
                    .push(format!("dialogue {} has a cyclic parent chain, excluded", dialogue.id));
                partition.excluded.push(dialogue.id.clone());
            }
        }
    }

    let mut assigned: BTreeSet<NodeId> = partition.sets.iter().flatten().cloned().collect();
    let excluded: BTreeSet<&NodeId> = partition.excluded.iter().collect();
    for set in partition.sets.iter_mut() {
        let mut queue: VecDeque<NodeId> = set.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            for child in graph.children(&id) {
                if assigned.contains(child) || excluded.contains(child) {
                    continue;
                }
                let role = match graph.get(child) {
                    Some(node) => node.role,
                    None => continue,
                };
                if role == NodeRole::Chapter || role.is_shared() {
                    continue;
                }
                assigned.insert(child.clone());
                set.insert(child.clone());
                queue.push_back(child.clone());
            }
        }
    }

    for (chapter, set) in partition.iter() {
        tracing::debug!(chapter = chapter.number, nodes = set.len(), "Chapter resolved");
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn numbers(pairs: &[(&str, u32)]) -> BTreeMap<NodeId, u32> {
        pairs.iter().map(|(id, n)| (NodeId::new(*id), *n)).collect()
    }

    fn graph() -> FlowGraph {
        let mut g = FlowGraph::new();
        g.add_node(Node::new("ch1", NodeRole::Chapter));
        g.add_node(Node::new("ch2", NodeRole::Chapter));
        g.add_node(Node::new("sub1", NodeRole::Other).with_parent("ch1"));
        g.add_node(Node::new("d1", NodeRole::Dialogue).with_parent("sub1"));
        g.add_node(Node::new("l1", NodeRole::DialogueLine).with_parent("d1"));
        g.add_node(Node::new("i1", NodeRole::Instruction).with_parent("d1"));
        g.add_node(Node::new("d2", NodeRole::Dialogue).with_parent("ch2"));
        g.add_node(Node::new("l2", NodeRole::DialogueLine).with_parent("d2"));
        g.add_node(Node::new("gunn", NodeRole::Entity).with_parent("ch1"));
        g.add_node(Node::new("orphan", NodeRole::Dialogue).with_parent("missing"));
        g.add_node(Node::new("c1", NodeRole::Dialogue).with_parent("c2"));
        g.add_node(Node::new("c2", NodeRole::Other).with_parent("c1"));
        g
    }

    fn chapters() -> Vec<Chapter> {
        order_chapters(&numbers(&[("ch2", 2), ("ch1", 1)]), None).unwrap()
    }

    #[test]
    fn test_order_by_number() {
        let ordered = order_chapters(&numbers(&[("b", 2), ("a", 3), ("c", 1)]), None).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_shortfall_is_fatal() {
        let err = order_chapters(&numbers(&[("a", 1), ("b", 2), ("c", 3)]), Some(5)).unwrap_err();
        assert_eq!(err, HierarchyError::NotEnoughChapters { requested: 5, found: 3 });
    }

    #[test]
    fn test_extra_chapters_truncated() {
        let ordered = order_chapters(&numbers(&[("a", 1), ("b", 2), ("c", 3)]), Some(2)).unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[1].number, 2);
    }

    #[test]
    fn test_gap_and_duplicate() {
        let err = order_chapters(&numbers(&[("a", 1), ("b", 3)]), None).unwrap_err();
        assert_eq!(err, HierarchyError::Gap { expected: 2, found: 3 });

        let err = order_chapters(&numbers(&[("a", 1), ("b", 1)]), None).unwrap_err();
        assert!(matches!(err, HierarchyError::DuplicateNumber { number: 1, .. }));

        // A gap beyond the requested count does not matter.
        assert!(order_chapters(&numbers(&[("a", 1), ("b", 2), ("c", 7)]), Some(2)).is_ok());
    }

    #[test]
    fn test_no_chapters() {
        assert_eq!(order_chapters(&BTreeMap::new(), None).unwrap_err(), HierarchyError::NoChapters);
    }

    #[test]
    fn test_resolve_assigns_descendants() {
        let p = resolve(&graph(), &chapters());
        let ch1: Vec<&str> = p.sets[0].iter().map(NodeId::as_str).collect();
        assert_eq!(ch1, vec!["ch1", "d1", "i1", "l1", "sub1"]);
        let ch2: Vec<&str> = p.sets[1].iter().map(NodeId::as_str).collect();
        assert_eq!(ch2, vec!["ch2", "d2", "l2"]);
        assert_eq!(p.chapter_of(&NodeId::new("l2")), Some(2));
    }

    #[test]
    fn test_entities_stay_shared() {
        let p = resolve(&graph(), &chapters());
        assert_eq!(p.chapter_of(&NodeId::new("gunn")), None);
    }

    #[test]
    fn test_dead_ends_and_cycles_excluded() {
        let p = resolve(&graph(), &chapters());
        assert_eq!(p.chapter_of(&NodeId::new("orphan")), None);
        assert_eq!(p.chapter_of(&NodeId::new("c1")), None);
        assert_eq!(p.chapter_of(&NodeId::new("c2")), None);
        assert_eq!(p.excluded.len(), 2);
        assert_eq!(p.warnings.len(), 2);
    }

    #[test]
    fn test_truncated_chapter_content_dropped_quietly() {
        let kept = order_chapters(&numbers(&[("ch1", 1), ("ch2", 2)]), Some(1)).unwrap();
        let p = resolve(&graph(), &kept);
        assert_eq!(p.chapter_of(&NodeId::new("d2")), None);
        assert!(p.excluded.contains(&NodeId::new("d2")));
        // Only the orphan and the cycle are reported.
        assert_eq!(p.warnings.len(), 2);
    }
}
