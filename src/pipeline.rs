//! Submission pipeline
//!
//! Ties the two halves together for one submission:
//! 1. instrument the source and derive its submission key
//! 2. (external) lower the instrumented source into a graph store
//! 3. open the store, link annotations in one transaction, close the store
//!
//! Store failures are reported as a [`LinkReport`] rather than an error, so
//! the instrumented source stays usable when no graph is reachable.

use std::fmt;

use serde::Serialize;

use crate::annotator::{Annotated, SourceAnnotator};
use crate::graph::GraphStore;
use crate::linker::{GraphLinker, LinkStats, LinkerConfig};
use crate::{Error, Result};

/// Hex digits kept from the blake3 digest
const SUBMISSION_KEY_LEN: usize = 16;

/// Key identifying one instrumented source submission
pub fn submission_key(instrumented: &str) -> String {
    let hash = blake3::hash(instrumented.as_bytes());
    hash.to_hex()[..SUBMISSION_KEY_LEN].to_string()
}

/// An instrumented source ready to be lowered and linked
#[derive(Debug, Clone)]
pub struct Submission {
    pub key: String,
    pub annotated: Annotated,
}

impl Submission {
    pub fn source(&self) -> &str {
        &self.annotated.text
    }

    /// `base` with this submission's scope applied, if scoping is enabled
    pub fn linker_config(&self, base: &LinkerConfig) -> LinkerConfig {
        let config = base.clone();
        if config.scope_submissions {
            config.with_submission(self.key.clone())
        } else {
            config
        }
    }
}

/// Instrument `source` and key the result
pub fn prepare(annotator: &SourceAnnotator, source: &str) -> Submission {
    let annotated = annotator.annotate_with_report(source);
    let key = submission_key(&annotated.text);
    tracing::debug!(
        "Prepared submission {} ({} bindings wrapped)",
        key,
        annotated.wrapped.len()
    );
    Submission { key, annotated }
}

/// Outcome of linking one submission
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkReport {
    Linked(LinkStats),
    /// The graph store could not be opened
    Unavailable { reason: String },
    /// The linking pass failed and was rolled back
    Failed { reason: String },
}

impl LinkReport {
    pub fn is_success(&self) -> bool {
        matches!(self, LinkReport::Linked(_))
    }

    pub fn stats(&self) -> Option<&LinkStats> {
        match self {
            LinkReport::Linked(stats) => Some(stats),
            _ => None,
        }
    }

    /// One-line status for the user
    pub fn message(&self) -> String {
        match self {
            LinkReport::Linked(stats) => format!(
                "[SUCCESS] Annotation link success! {} annotations in graph",
                stats.annotations
            ),
            LinkReport::Unavailable { reason } => {
                format!("[FAILED] Annotation link: could not connect to graph store ({})", reason)
            }
            LinkReport::Failed { reason } => {
                format!("[FAILED] Annotation link: could not run linking pass ({})", reason)
            }
        }
    }
}

impl fmt::Display for LinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Open a store with `open`, run one linking pass and close the store.
pub fn link_submission<S, F>(open: F, config: &LinkerConfig) -> LinkReport
where
    S: GraphStore,
    F: FnOnce() -> Result<S>,
{
    let mut store = match open() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("Graph store unavailable: {}", e);
            let reason = match e {
                Error::StoreUnavailable(reason) => reason,
                other => other.to_string(),
            };
            return LinkReport::Unavailable { reason };
        }
    };

    let report = match GraphLinker::new(&mut store).with_config(config.clone()).run() {
        Ok(stats) => LinkReport::Linked(stats),
        Err(e) => {
            tracing::warn!("Annotation link failed: {}", e);
            LinkReport::Failed {
                reason: e.to_string(),
            }
        }
    };
    drop(store);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{keys, Label, MemoryGraph};
    use crate::linker::annotation_report;
    use crate::storage::{GraphDump, SqliteGraph};

    #[test]
    fn test_submission_key_is_stable() {
        let a = submission_key("let y = 10;");
        assert_eq!(a, submission_key("let y = 10;"));
        assert_ne!(a, submission_key("let y = 11;"));
        assert_eq!(a.len(), SUBMISSION_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_linker_config_scoping() {
        let submission = prepare(&SourceAnnotator::default(), "let y = 10;\n");
        let scoped = submission.linker_config(&LinkerConfig::default());
        assert_eq!(scoped.submission.as_deref(), Some(submission.key.as_str()));

        let base = LinkerConfig {
            scope_submissions: false,
            ..LinkerConfig::default()
        };
        assert_eq!(submission.linker_config(&base).submission, None);
    }

    #[test]
    fn test_unavailable_store_is_reported() {
        let report = link_submission(
            || -> Result<MemoryGraph> { Err(Error::StoreUnavailable("bolt://localhost:7687 refused".into())) },
            &LinkerConfig::default(),
        );
        assert!(!report.is_success());
        assert!(matches!(report, LinkReport::Unavailable { .. }));
        assert!(report.message().starts_with("[FAILED] Annotation link"));
        assert!(report.message().contains("7687 refused"));
    }

    #[test]
    fn test_empty_graph_links_nothing() {
        let report = link_submission(|| Ok(MemoryGraph::new()), &LinkerConfig::default());
        assert!(report.is_success());
        assert_eq!(report.stats().unwrap().annotations, 0);
        assert!(report.message().starts_with("[SUCCESS]"));
    }

    #[test]
    fn test_failed_report_message() {
        let report = LinkReport::Failed {
            reason: "disk I/O error".into(),
        };
        assert_eq!(
            report.to_string(),
            "[FAILED] Annotation link: could not run linking pass (disk I/O error)"
        );
    }

    /// Graph a CPG exporter produces for `annotate!(y = 10, "y", line!())`
    /// on line 3 of `main.rs`
    const LOWERED: &str = r#"{
        "nodes": [
            {"id": 1, "labels": ["Reference"], "properties": {"fullName": "llvm.ptr.annotation.p0"}},
            {"id": 2, "labels": ["Reference"], "properties": {"code": "%y"}},
            {"id": 3, "labels": ["Reference"], "properties": {"code": "@.str"}},
            {"id": 4, "labels": ["Reference"], "properties": {"code": "@.str.1"}},
            {"id": 5, "labels": ["Literal"], "properties": {"code": "3", "value": 3}},
            {"id": 6, "labels": ["Literal"], "properties": {"code": "null"}},
            {"id": 7, "labels": ["CallExpression"], "properties": {"fullName": "llvm.ptr.annotation.p0"}},
            {"id": 8, "labels": ["VariableDeclaration"], "properties": {"name": ".str"}},
            {"id": 9, "labels": ["Literal"], "properties": {"value": "y\u0000"}},
            {"id": 10, "labels": ["VariableDeclaration"], "properties": {"name": ".str.1"}},
            {"id": 11, "labels": ["CastExpression"], "properties": {}},
            {"id": 12, "labels": ["Literal"], "properties": {"value": "main.rs\u0000"}},
            {"id": 13, "labels": ["VariableDeclaration"], "properties": {"name": "y"}},
            {"id": 14, "labels": ["VariableDeclaration"], "properties": {"name": "_"}}
        ],
        "edges": [
            {"from": 1, "to": 2, "kind": "EOG"},
            {"from": 2, "to": 3, "kind": "EOG"},
            {"from": 3, "to": 4, "kind": "EOG"},
            {"from": 4, "to": 5, "kind": "EOG"},
            {"from": 7, "to": 2, "kind": "OPERATOR_ARGUMENTS"},
            {"from": 7, "to": 3, "kind": "OPERATOR_ARGUMENTS"},
            {"from": 7, "to": 4, "kind": "OPERATOR_ARGUMENTS"},
            {"from": 7, "to": 5, "kind": "OPERATOR_ARGUMENTS"},
            {"from": 7, "to": 6, "kind": "OPERATOR_ARGUMENTS"},
            {"from": 3, "to": 8, "kind": "REFERS_TO"},
            {"from": 8, "to": 9, "kind": "EOG"},
            {"from": 4, "to": 10, "kind": "REFERS_TO"},
            {"from": 10, "to": 11, "kind": "EOG"},
            {"from": 11, "to": 12, "kind": "EOG"},
            {"from": 2, "to": 13, "kind": "REFERS_TO"}
        ]
    }"#;

    #[test]
    fn test_end_to_end_single_binding() {
        let annotator = SourceAnnotator::default();
        let submission = prepare(&annotator, "let y = 10;\nlet _ = foo();");
        assert_eq!(submission.annotated.wrapped.len(), 1);
        assert!(submission.source().contains("annotate!(y = 10, \"y\", line!());"));
        assert!(submission.source().contains("let _ = foo();"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpg.db");
        {
            let mut store = SqliteGraph::open(&path).unwrap();
            GraphDump::from_json(LOWERED).unwrap().load_into(&mut store).unwrap();
        }

        let config = submission.linker_config(&LinkerConfig::default());
        let report = link_submission(|| SqliteGraph::open(&path), &config);
        assert!(report.is_success(), "{}", report);
        let stats = report.stats().unwrap();
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.annotations, 1);

        let store = SqliteGraph::open(&path).unwrap();
        let annotations = annotation_report(&store).unwrap();
        assert_eq!(annotations.len(), 1);
        let annotation = &annotations[0];
        assert_eq!(annotation.name, "y");
        assert_eq!(annotation.filename, "main.rs");
        assert_eq!(annotation.line_number, Some(3));
        assert_eq!(annotation.submission.as_deref(), Some(submission.key.as_str()));
        assert_eq!(annotation.variables.len(), 1);
        assert_eq!(annotation.variables[0].name.as_deref(), Some("y"));

        let discarded = store
            .nodes_with_label(&Label::VariableDeclaration)
            .unwrap()
            .into_iter()
            .find(|n| n.str_property(keys::NAME) == Some("_"))
            .unwrap();
        assert!(discarded.str_property(keys::ANNOTATION).is_none());
    }
}
