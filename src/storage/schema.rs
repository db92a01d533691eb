//! Database schema definitions

/// SQL to create the nodes table
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT
)
"#;

/// SQL to create the node_labels table
pub const CREATE_NODE_LABELS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS node_labels (
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    label TEXT NOT NULL,
    PRIMARY KEY (node_id, label)
)
"#;

/// SQL to create the node_properties table
/// Exactly one of int_value / text_value is set per row
pub const CREATE_NODE_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS node_properties (
    node_id INTEGER NOT NULL REFERENCES nodes(id),
    key TEXT NOT NULL,
    int_value INTEGER,
    text_value TEXT,
    PRIMARY KEY (node_id, key)
)
"#;

/// SQL to create the edges table
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_id INTEGER NOT NULL REFERENCES nodes(id),
    to_id INTEGER NOT NULL REFERENCES nodes(id),
    kind TEXT NOT NULL,
    UNIQUE(from_id, to_id, kind)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_node_labels_label ON node_labels(label)",
    "CREATE INDEX IF NOT EXISTS idx_node_properties_key ON node_properties(key)",
    "CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id, kind)",
    "CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id, kind)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_NODES_TABLE,
        CREATE_NODE_LABELS_TABLE,
        CREATE_NODE_PROPERTIES_TABLE,
        CREATE_EDGES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
