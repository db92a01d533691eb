//! Annotation Linker - connects marker calls in a CPG to the variables they document
//!
//! After lowering, each `annotate!` call shows up as a call to the
//! `llvm.ptr.annotation` intrinsic whose arguments are scattered across
//! reference and literal nodes. The linker recovers the (name, filename, line)
//! triple of every marker, merges an `Annotation` node for it and links it to
//! the `VariableDeclaration` nodes whose data flows into the marked value.

pub mod annotation_linker;
pub mod report;

pub use annotation_linker::{AnnotationKey, GraphLinker, LinkStats, MarkerOutcome, UnresolvedReason};
pub use report::{annotation_report, AnnotationSummary, LinkedVariable};

use serde::{Deserialize, Serialize};

use crate::graph::traverse::DEFAULT_MAX_DEPTH;

/// Linker settings, the `[linker]` table of `annolink.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Substring of `fullName` identifying marker references and calls
    pub marker_symbol: String,
    /// EOG hops walked from the marker reference (the intrinsic's arity)
    pub argument_hops: usize,
    /// Bound on every graph expansion
    pub max_depth: usize,
    /// Key annotations by submission when linking through the pipeline
    pub scope_submissions: bool,
    /// Submission the pass belongs to; part of annotation identity when set
    #[serde(skip)]
    pub submission: Option<String>,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            marker_symbol: "llvm.ptr.annotation".to_string(),
            argument_hops: 4,
            max_depth: DEFAULT_MAX_DEPTH,
            scope_submissions: true,
            submission: None,
        }
    }
}

impl LinkerConfig {
    pub fn with_submission(mut self, submission: impl Into<String>) -> Self {
        self.submission = Some(submission.into());
        self
    }
}
