//! # annolink - Variable annotation linking for code property graphs
//!
//! Instruments Rust source so every traceable variable binding carries a
//! marker call, then recovers which graph node each marker documents once an
//! external toolchain has lowered the source into a code property graph.
//!
//! annolink provides:
//! - A source annotator that wraps `let` bindings in `annotate!` marker calls
//! - A property graph model with in-memory and SQLite-backed stores
//! - Bounded, label-filtered graph traversal primitives
//! - A linker that materializes `Annotation` nodes and links them to variables

pub mod annotator;
pub mod graph;
pub mod storage;
pub mod linker;
pub mod pipeline;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use annotator::{AnnotatorConfig, SourceAnnotator};
pub use graph::{Edge, EdgeKind, GraphStore, Label, MemoryGraph, Node, NodeId, PropertyValue};
pub use linker::{GraphLinker, LinkStats, LinkerConfig};
pub use storage::SqliteGraph;

/// Result type alias for annolink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for annolink operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid graph data: {0}")]
    InvalidGraph(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}
