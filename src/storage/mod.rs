//! Storage Layer - SQLite-backed property graph
//!
//! System of record is SQLite with tables:
//! - nodes(id)
//! - node_labels(node_id, label)
//! - node_properties(node_id, key, int_value, text_value)
//! - edges(from_id, to_id, kind)

pub mod import;
pub mod schema;
pub mod sqlite;

pub use import::{import_json, GraphDump, ImportStats};
pub use sqlite::SqliteGraph;
