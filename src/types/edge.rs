//! Pin connections between flow nodes.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Directed connection from an output pin of `source` to `target`.
///
/// Implements `Ord` for deterministic ordering: (source, source_pin, target).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Node owning the output pin.
    pub source: NodeId,
    /// Index of the output pin on the source node.
    pub source_pin: u32,
    /// Node the connection leads to.
    pub target: NodeId,
}

impl Connection {
    /// Create a new connection.
    pub fn new(source: impl Into<NodeId>, source_pin: u32, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            source_pin,
            target: target.into(),
        }
    }
}

// Canonical ordering: source, then pin, then target
impl PartialOrd for Connection {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Connection {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.source_pin.cmp(&other.source_pin))
            .then_with(|| self.target.cmp(&other.target))
    }
}
