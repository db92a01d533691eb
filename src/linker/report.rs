//! Read-only view of linked annotations

use serde::Serialize;

use crate::Result;
use crate::graph::{keys, EdgeKind, GraphStore, Label, NodeId};

/// A declaration an annotation is linked to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedVariable {
    pub id: NodeId,
    pub name: Option<String>,
}

/// One Annotation node and the declarations it documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    pub id: NodeId,
    pub name: String,
    pub filename: String,
    pub line_number: Option<i64>,
    pub submission: Option<String>,
    pub variables: Vec<LinkedVariable>,
}

/// List every Annotation in the store, ordered by id.
pub fn annotation_report<S: GraphStore>(store: &S) -> Result<Vec<AnnotationSummary>> {
    let mut summaries = Vec::new();
    for annotation in store.nodes_with_label(&Label::Annotation)? {
        let mut variables = Vec::new();
        for id in store.outgoing(annotation.id, &EdgeKind::Annotate)? {
            let name = store
                .node(id)?
                .and_then(|n| n.str_property(keys::NAME).map(str::to_string));
            variables.push(LinkedVariable { id, name });
        }

        let text = |key: &str| {
            annotation
                .property(key)
                .map(|v| v.to_string())
                .unwrap_or_default()
        };
        summaries.push(AnnotationSummary {
            id: annotation.id,
            name: text(keys::NAME),
            filename: text(keys::FILENAME),
            line_number: annotation.int_property(keys::LINE_NUMBER),
            submission: annotation.str_property(keys::SUBMISSION).map(str::to_string),
            variables,
        });
    }
    Ok(summaries)
}
