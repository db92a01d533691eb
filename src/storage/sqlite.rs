//! SQLite storage implementation

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::schema;
use crate::graph::{Edge, EdgeKind, GraphStore, Label, Node, NodeId, Properties, PropertyValue};
use crate::{Error, Result};

/// SQLite-backed property graph
pub struct SqliteGraph {
    conn: Connection,
}

impl SqliteGraph {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {}", path.display(), e)))?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    /// Delete all data (for re-importing)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM edges", [])?;
        self.conn.execute("DELETE FROM node_properties", [])?;
        self.conn.execute("DELETE FROM node_labels", [])?;
        self.conn.execute("DELETE FROM nodes", [])?;
        Ok(())
    }

    // ========== Row Helpers ==========

    fn exists(&self, id: NodeId) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM nodes WHERE id = ?1", [id.0], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.exists(id)? {
            Ok(())
        } else {
            Err(Error::NodeNotFound(id))
        }
    }

    fn labels_of(&self, id: NodeId) -> Result<Vec<Label>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM node_labels WHERE node_id = ?1 ORDER BY label")?;
        let raw: Vec<String> = stmt
            .query_map([id.0], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        raw.iter().map(|s| s.parse()).collect()
    }

    fn properties_of(&self, id: NodeId) -> Result<Properties> {
        let mut stmt = self.conn.prepare(
            "SELECT key, int_value, text_value FROM node_properties WHERE node_id = ?1",
        )?;
        let rows = stmt.query_map([id.0], |row| {
            let key: String = row.get(0)?;
            let int_value: Option<i64> = row.get(1)?;
            let text_value: Option<String> = row.get(2)?;
            Ok((key, int_value, text_value))
        })?;

        let mut properties = Properties::new();
        for row in rows {
            let (key, int_value, text_value) = row?;
            let value = match (int_value, text_value) {
                (Some(i), _) => PropertyValue::Int(i),
                (None, Some(s)) => PropertyValue::Str(s),
                (None, None) => {
                    return Err(Error::InvalidGraph(format!(
                        "property '{}' of node {} has no value",
                        key, id
                    )));
                }
            };
            properties.insert(key, value);
        }
        Ok(properties)
    }

    fn write_property(&self, id: NodeId, key: &str, value: &PropertyValue) -> Result<()> {
        let (int_value, text_value) = match value {
            PropertyValue::Int(i) => (Some(*i), None),
            PropertyValue::Str(s) => (None, Some(s.as_str())),
        };
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO node_properties (node_id, key, int_value, text_value)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![id.0, key, int_value, text_value],
        )?;
        Ok(())
    }

    fn neighbour_ids(&self, sql: &str, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![id.0, kind.as_str()], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(NodeId))
            .collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }
}

impl GraphStore for SqliteGraph {
    fn node(&self, id: NodeId) -> Result<Option<Node>> {
        if !self.exists(id)? {
            return Ok(None);
        }
        Ok(Some(Node::new(id, self.labels_of(id)?, self.properties_of(id)?)))
    }

    fn nodes_with_label(&self, label: &Label) -> Result<Vec<Node>> {
        let mut stmt = self
            .conn
            .prepare("SELECT node_id FROM node_labels WHERE label = ?1 ORDER BY node_id")?;
        let ids: Vec<i64> = stmt
            .query_map([label.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.node(NodeId(id))? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn outgoing(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
        self.neighbour_ids(
            "SELECT to_id FROM edges WHERE from_id = ?1 AND kind = ?2 ORDER BY to_id",
            id,
            kind,
        )
    }

    fn incoming(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
        self.neighbour_ids(
            "SELECT from_id FROM edges WHERE to_id = ?1 AND kind = ?2 ORDER BY from_id",
            id,
            kind,
        )
    }

    fn add_node(&mut self, labels: &[Label], properties: &Properties) -> Result<NodeId> {
        self.conn.execute("INSERT INTO nodes DEFAULT VALUES", [])?;
        let id = NodeId(self.conn.last_insert_rowid());
        for label in labels {
            self.conn.execute(
                "INSERT OR IGNORE INTO node_labels (node_id, label) VALUES (?1, ?2)",
                params![id.0, label.as_str()],
            )?;
        }
        for (key, value) in properties {
            self.write_property(id, key, value)?;
        }
        Ok(id)
    }

    fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> Result<()> {
        self.require(id)?;
        self.write_property(id, key, &value)
    }

    fn merge_edge(&mut self, edge: &Edge) -> Result<bool> {
        self.require(edge.from)?;
        self.require(edge.to)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO edges (from_id, to_id, kind) VALUES (?1, ?2, ?3)",
            params![edge.from.0, edge.to.0, edge.kind.as_str()],
        )?;
        Ok(inserted > 0)
    }

    fn find_node(&self, label: &Label, properties: &Properties) -> Result<Option<NodeId>> {
        // Narrow by label and property count, then compare full maps
        let mut stmt = self.conn.prepare(
            r#"
            SELECT l.node_id FROM node_labels l
            WHERE l.label = ?1
              AND (SELECT COUNT(*) FROM node_properties p WHERE p.node_id = l.node_id) = ?2
            ORDER BY l.node_id
            "#,
        )?;
        let candidates: Vec<i64> = stmt
            .query_map(params![label.as_str(), properties.len() as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        for id in candidates {
            let id = NodeId(id);
            if self.properties_of(id)? == *properties {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn count_nodes(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_edges(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_label(&self, label: &Label) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM node_labels WHERE label = ?1",
            [label.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
