//! In-memory property graph
//!
//! Used for tests, for building graphs before persisting them, and as a
//! lightweight store when no database is involved.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{Edge, EdgeKind, GraphStore, Label, Node, NodeId, Properties, PropertyValue};
use crate::{Error, Result};

/// In-memory property graph with adjacency indexes in both directions.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraph {
    /// Next node id to assign
    next_id: i64,
    /// All nodes indexed by id
    nodes: BTreeMap<NodeId, Node>,
    /// Outgoing adjacency: (from, kind) → targets
    edges_from: HashMap<(NodeId, EdgeKind), BTreeSet<NodeId>>,
    /// Incoming adjacency: (to, kind) → sources
    edges_to: HashMap<(NodeId, EdgeKind), BTreeSet<NodeId>>,
    /// Edge identity set
    edges: HashSet<Edge>,
    /// Nodes indexed by label
    nodes_by_label: HashMap<Label, BTreeSet<NodeId>>,
}

impl MemoryGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node from labels and `(key, value)` pairs
    pub fn add(&mut self, labels: &[Label], properties: &[(&str, PropertyValue)]) -> NodeId {
        let props: Properties = properties
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let id = NodeId(self.next_id);
        self.insert(Node::new(id, labels.iter().cloned(), props));
        id
    }

    /// Connect two existing nodes. Duplicate edges are ignored.
    pub fn connect(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        let edge = Edge::new(from, to, kind);
        if !self.edges.insert(edge.clone()) {
            return;
        }
        self.edges_from
            .entry((edge.from, edge.kind.clone()))
            .or_default()
            .insert(edge.to);
        self.edges_to
            .entry((edge.to, edge.kind))
            .or_default()
            .insert(edge.from);
    }

    fn insert(&mut self, node: Node) {
        self.next_id = self.next_id.max(node.id.0 + 1);
        for label in &node.labels {
            self.nodes_by_label
                .entry(label.clone())
                .or_default()
                .insert(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::NodeNotFound(id))
        }
    }
}

impl GraphStore for MemoryGraph {
    fn node(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn nodes_with_label(&self, label: &Label) -> Result<Vec<Node>> {
        Ok(self
            .nodes_by_label
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn outgoing(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
        Ok(self
            .edges_from
            .get(&(id, kind.clone()))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    fn incoming(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
        Ok(self
            .edges_to
            .get(&(id, kind.clone()))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    fn add_node(&mut self, labels: &[Label], properties: &Properties) -> Result<NodeId> {
        let id = NodeId(self.next_id);
        self.insert(Node::new(id, labels.iter().cloned(), properties.clone()));
        Ok(id)
    }

    fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        node.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn merge_edge(&mut self, edge: &Edge) -> Result<bool> {
        self.require(edge.from)?;
        self.require(edge.to)?;
        if self.edges.contains(edge) {
            return Ok(false);
        }
        self.connect(edge.from, edge.to, edge.kind.clone());
        Ok(true)
    }

    fn find_node(&self, label: &Label, properties: &Properties) -> Result<Option<NodeId>> {
        Ok(self
            .nodes_with_label(label)?
            .into_iter()
            .find(|n| n.properties == *properties)
            .map(|n| n.id))
    }

    fn count_nodes(&self) -> Result<usize> {
        Ok(self.nodes.len())
    }

    fn count_edges(&self) -> Result<usize> {
        Ok(self.edges.len())
    }

    fn count_label(&self, label: &Label) -> Result<usize> {
        Ok(self.nodes_by_label.get(label).map(|ids| ids.len()).unwrap_or(0))
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }
}
