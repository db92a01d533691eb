//! Property Graph - nodes, edges and the store interface
//!
//! A code property graph reduces to:
//! - `Node`: an id, one or more labels and a property map
//! - `Edge`: a directed, typed relationship between two nodes
//!
//! The linker only talks to a graph through [`GraphStore`], so the same
//! traversal runs against the in-memory graph and the SQLite store.

pub mod memory;
pub mod traverse;

pub use memory::MemoryGraph;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Property keys used by the linker
pub mod keys {
    pub const FULL_NAME: &str = "fullName";
    pub const ARGUMENT_INDEX: &str = "argumentIndex";
    pub const CODE: &str = "code";
    pub const VALUE: &str = "value";
    pub const NAME: &str = "name";
    pub const FILENAME: &str = "filename";
    pub const LINE_NUMBER: &str = "line_number";
    pub const ANNOTATION: &str = "annotation";
    pub const SUBMISSION: &str = "submission";
}

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node labels produced by CPG lowering, plus `Annotation`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Reference,
    CallExpression,
    Literal,
    VariableDeclaration,
    Annotation,
    CastExpression,
    FunctionDeclaration,
    /// Any other label from a CPG export, kept verbatim
    Other(String),
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Reference => "Reference",
            Label::CallExpression => "CallExpression",
            Label::Literal => "Literal",
            Label::VariableDeclaration => "VariableDeclaration",
            Label::Annotation => "Annotation",
            Label::CastExpression => "CastExpression",
            Label::FunctionDeclaration => "FunctionDeclaration",
            Label::Other(s) => s,
        }
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidGraph("empty label".to_string()));
        }
        Ok(match s {
            "Reference" => Label::Reference,
            "CallExpression" => Label::CallExpression,
            "Literal" => Label::Literal,
            "VariableDeclaration" => Label::VariableDeclaration,
            "Annotation" => Label::Annotation,
            "CastExpression" => Label::CastExpression,
            "FunctionDeclaration" => Label::FunctionDeclaration,
            other => Label::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node property value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Str(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            PropertyValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Str(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

/// Property map of a node, ordered for deterministic comparison and output
pub type Properties = BTreeMap<String, PropertyValue>;

/// A node in the property graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub labels: BTreeSet<Label>,
    pub properties: Properties,
}

impl Node {
    pub fn new(id: NodeId, labels: impl IntoIterator<Item = Label>, properties: Properties) -> Self {
        Self {
            id,
            labels: labels.into_iter().collect(),
            properties,
        }
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(PropertyValue::as_str)
    }

    pub fn int_property(&self, key: &str) -> Option<i64> {
        self.property(key).and_then(PropertyValue::as_int)
    }

    /// The node's `argumentIndex`, if set
    pub fn argument_index(&self) -> Option<i64> {
        self.int_property(keys::ARGUMENT_INDEX)
    }
}

/// Relationship types of the CPG
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// Evaluation order
    Eog,
    /// Data flow
    Dfg,
    /// Reference → declaration it refers to
    RefersTo,
    /// Call/operator → its operands
    OperatorArguments,
    /// Annotation → annotated declaration
    Annotate,
    /// Any other relationship type from a CPG export
    Other(String),
}

impl EdgeKind {
    pub fn as_str(&self) -> &str {
        match self {
            EdgeKind::Eog => "EOG",
            EdgeKind::Dfg => "DFG",
            EdgeKind::RefersTo => "REFERS_TO",
            EdgeKind::OperatorArguments => "OPERATOR_ARGUMENTS",
            EdgeKind::Annotate => "ANNOTATE",
            EdgeKind::Other(s) => s,
        }
    }

    /// The relationship types the linker reads or writes
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Eog,
            EdgeKind::Dfg,
            EdgeKind::RefersTo,
            EdgeKind::OperatorArguments,
            EdgeKind::Annotate,
        ]
    }
}

impl FromStr for EdgeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidGraph("empty edge kind".to_string()));
        }
        Ok(match s.to_uppercase().as_str() {
            "EOG" => EdgeKind::Eog,
            "DFG" => EdgeKind::Dfg,
            "REFERS_TO" => EdgeKind::RefersTo,
            "OPERATOR_ARGUMENTS" => EdgeKind::OperatorArguments,
            "ANNOTATE" => EdgeKind::Annotate,
            _ => EdgeKind::Other(s.to_string()),
        })
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge. Identity is (from, to, kind): stores never hold duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

/// Query and mutation interface over a labeled property graph.
///
/// Neighbour lists are returned in ascending id order so traversals are
/// deterministic regardless of the backing store.
pub trait GraphStore {
    /// Fetch a node with its labels and properties
    fn node(&self, id: NodeId) -> Result<Option<Node>>;

    /// All nodes carrying `label`, ascending by id
    fn nodes_with_label(&self, label: &Label) -> Result<Vec<Node>>;

    /// Targets of outgoing edges of `kind`
    fn outgoing(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>>;

    /// Sources of incoming edges of `kind`
    fn incoming(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>>;

    /// Create a node and return its id
    fn add_node(&mut self, labels: &[Label], properties: &Properties) -> Result<NodeId>;

    /// Set (or overwrite) a property on an existing node
    fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> Result<()>;

    /// Create the edge unless it already exists. Returns true if created.
    fn merge_edge(&mut self, edge: &Edge) -> Result<bool>;

    /// Find a node with `label` whose property map equals `properties` exactly
    fn find_node(&self, label: &Label, properties: &Properties) -> Result<Option<NodeId>>;

    fn count_nodes(&self) -> Result<usize>;

    fn count_edges(&self) -> Result<usize>;

    fn count_label(&self, label: &Label) -> Result<usize>;

    /// Run `f` atomically: either every write it made persists or none does
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;

    /// Return the node with `label` and exactly `properties`, creating it if
    /// missing. The flag is true when the node was created.
    fn merge_node(&mut self, label: &Label, properties: &Properties) -> Result<(NodeId, bool)> {
        if let Some(id) = self.find_node(label, properties)? {
            return Ok((id, false));
        }
        let id = self.add_node(std::slice::from_ref(label), properties)?;
        Ok((id, true))
    }

    /// Get statistics about the graph
    fn stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            nodes: self.count_nodes()?,
            edges: self.count_edges()?,
            annotations: self.count_label(&Label::Annotation)?,
            variables: self.count_label(&Label::VariableDeclaration)?,
        })
    }
}

/// Statistics about a property graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub annotations: usize,
    pub variables: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Edges: {}", self.edges)?;
        writeln!(f, "  Variable declarations: {}", self.variables)?;
        writeln!(f, "  Annotations: {}", self.annotations)
    }
}
