//! JSON graph import
//!
//! Loads a CPG export of the form
//! `{ "nodes": [{ "id", "labels", "properties" }], "edges": [{ "from", "to", "kind" }] }`
//! into any [`GraphStore`]. Dump ids are only used to wire edges; the store
//! assigns its own ids.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{Edge, GraphStore, Label, NodeId, Properties, PropertyValue};
use crate::{Error, Result};

/// A node as written by the exporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpNode {
    pub id: i64,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// An edge as written by the exporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpEdge {
    pub from: i64,
    pub to: i64,
    pub kind: String,
}

/// A whole graph export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDump {
    #[serde(default)]
    pub nodes: Vec<DumpNode>,
    #[serde(default)]
    pub edges: Vec<DumpEdge>,
}

/// Counts reported by an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub nodes: usize,
    pub edges: usize,
    /// Edges already present in the store
    pub duplicate_edges: usize,
}

impl GraphDump {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the dump into `store` as one transaction.
    pub fn load_into<S: GraphStore>(&self, store: &mut S) -> Result<ImportStats> {
        store.transaction(|s| self.write(s))
    }

    fn write<S: GraphStore>(&self, store: &mut S) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let mut ids: HashMap<i64, NodeId> = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            if ids.contains_key(&node.id) {
                return Err(Error::InvalidGraph(format!("duplicate node id {}", node.id)));
            }
            let labels = node
                .labels
                .iter()
                .map(|l| l.parse::<Label>())
                .collect::<Result<Vec<_>>>()?;
            let properties: Properties = node
                .properties
                .iter()
                .filter_map(|(k, v)| property_value(v).map(|v| (k.clone(), v)))
                .collect();
            let id = store.add_node(&labels, &properties)?;
            ids.insert(node.id, id);
            stats.nodes += 1;
        }

        for edge in &self.edges {
            let resolve = |dump_id: i64| {
                ids.get(&dump_id).copied().ok_or_else(|| {
                    Error::InvalidGraph(format!("edge references unknown node {}", dump_id))
                })
            };
            let edge = Edge::new(resolve(edge.from)?, resolve(edge.to)?, edge.kind.parse()?);
            if store.merge_edge(&edge)? {
                stats.edges += 1;
            } else {
                stats.duplicate_edges += 1;
            }
        }

        tracing::info!("Imported {} nodes and {} edges", stats.nodes, stats.edges);
        Ok(stats)
    }
}

/// Read a JSON dump from `path` and load it into `store`
pub fn import_json<S: GraphStore>(store: &mut S, path: &Path) -> Result<ImportStats> {
    let text = std::fs::read_to_string(path)?;
    GraphDump::from_json(&text)?.load_into(store)
}

/// Integers stay integers, null is dropped, everything else is kept as text.
fn property_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(PropertyValue::Str(s.clone())),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => PropertyValue::Int(i),
            None => PropertyValue::Str(n.to_string()),
        }),
        other => Some(PropertyValue::Str(other.to_string())),
    }
}
