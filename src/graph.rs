//! In-memory flow graph.
//!
//! Nodes are stored by id; parents are plain references that may dangle, so
//! nothing here assumes the parent relation forms a tree.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

use crate::types::{Connection, Node, NodeId, NodeRole};

/// Declared type of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// String.
    String,
}

/// One global variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name.
    #[serde(rename = "Variable")]
    pub name: String,
    /// Declared type.
    #[serde(rename = "Type")]
    pub kind: VariableType,
    /// Default value as exported.
    #[serde(rename = "Value", default)]
    pub value: String,
}

impl Variable {
    /// Default value as an integer; booleans map to 0/1.
    pub fn initial_int(&self) -> Option<i64> {
        match self.kind {
            VariableType::Integer => self.value.trim().parse().ok(),
            VariableType::Boolean => match self.value.trim().to_ascii_lowercase().as_str() {
                "true" => Some(1),
                "false" => Some(0),
                _ => None,
            },
            VariableType::String => None,
        }
    }
}

/// Namespace of global variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Namespace name.
    #[serde(rename = "Namespace")]
    pub name: String,
    /// Declared variables.
    #[serde(rename = "Variables", default)]
    pub variables: Vec<Variable>,
}

/// Extracted flow graph.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
/// Read-only once extraction finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    /// Nodes by id.
    nodes: BTreeMap<NodeId, Node>,
    /// Parent -> children index.
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// All pin connections.
    connections: Vec<Connection>,
    /// Global variable namespaces.
    namespaces: Vec<Namespace>,
}

impl FlowGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; a node with the same id is replaced.
    pub fn add_node(&mut self, node: Node) {
        let old_parent = self.nodes.get(&node.id).and_then(|old| old.parent.clone());
        if let Some(old_parent) = old_parent {
            if let Some(siblings) = self.children.get_mut(&old_parent) {
                siblings.remove(&node.id);
            }
        }
        if let Some(parent) = &node.parent {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    /// Add a connection.
    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Add a global variable namespace.
    pub fn add_namespace(&mut self, namespace: Namespace) {
        self.namespaces.push(namespace);
    }

    /// Fetch a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Nodes of one role, in id order.
    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.role == role)
    }

    /// Direct children of a node, in id order.
    pub fn children(&self, id: &NodeId) -> Vec<&NodeId> {
        self.children
            .get(id)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Connections whose both ends lie in `ids`, canonically ordered.
    pub fn connections_within(&self, ids: &BTreeSet<NodeId>) -> Vec<Connection> {
        let mut result: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| ids.contains(&c.source) && ids.contains(&c.target))
            .cloned()
            .collect();
        result.sort();
        result
    }

    /// Global variable namespaces.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Look up a variable by namespace and name.
    pub fn variable(&self, namespace: &str, name: &str) -> Option<&Variable> {
        self.namespaces
            .iter()
            .filter(|ns| ns.name == namespace)
            .flat_map(|ns| ns.variables.iter())
            .find(|v| v.name == name)
    }

    /// Get number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get number of connections.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }
}
