use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use super::LinkerConfig;
use crate::Result;
use crate::graph::traverse::{self, Direction, ExpandConfig, LabelPolicy};
use crate::graph::{keys, Edge, EdgeKind, GraphStore, Label, Node, NodeId, Properties, PropertyValue};

/// Number of metadata values a marker carries: name, filename, line
const MARKER_VALUES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Marker references found in the graph
    pub markers: usize,
    /// Markers that produced (or reused) an Annotation
    pub linked: usize,
    pub unresolved: usize,
    pub annotations_created: usize,
    /// ANNOTATE edges added by this pass
    pub edges_created: usize,
    /// Variable declarations written by this pass
    pub variables: usize,
    /// Annotation nodes in the graph after the pass
    pub annotations: usize,
}

impl fmt::Display for LinkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Annotation Linker Stats:")?;
        writeln!(f, "  Markers: {}", self.markers)?;
        writeln!(f, "  ✅ Linked: {}", self.linked)?;
        writeln!(f, "  ❓ Unresolved: {}", self.unresolved)?;
        writeln!(f, "  🏷️  New annotations: {}", self.annotations_created)?;
        writeln!(f, "  🔗 New links: {}", self.edges_created)?;
        writeln!(f, "  Annotations in graph: {}", self.annotations)
    }
}

/// Identity of an Annotation node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationKey {
    pub name: String,
    pub filename: String,
    pub line_number: i64,
    pub submission: Option<String>,
}

impl AnnotationKey {
    /// The exact property map an Annotation with this identity carries
    pub fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.insert(keys::NAME.to_string(), self.name.clone().into());
        props.insert(keys::FILENAME.to_string(), self.filename.clone().into());
        props.insert(keys::LINE_NUMBER.to_string(), PropertyValue::Int(self.line_number));
        if let Some(submission) = &self.submission {
            props.insert(keys::SUBMISSION.to_string(), submission.clone().into());
        }
        props
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}:{}", self.name, self.filename, self.line_number)
    }
}

/// Why a marker produced no Annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The EOG walk from the marker ended after `hops` edges
    ShortArgumentPath { hops: usize },
    /// No marker call owns the first argument
    NoMarkerCall,
    /// Argument resolution produced the wrong number of values
    ArgumentCount { found: usize },
    /// A resolved literal has no `value`
    MissingValue(NodeId),
    /// The line value is not an integer
    InvalidLine(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::ShortArgumentPath { hops } => {
                write!(f, "argument path ends after {} hops", hops)
            }
            UnresolvedReason::NoMarkerCall => write!(f, "no marker call for first argument"),
            UnresolvedReason::ArgumentCount { found } => {
                write!(f, "expected {} literal values, found {}", MARKER_VALUES, found)
            }
            UnresolvedReason::MissingValue(id) => write!(f, "literal {} has no value", id),
            UnresolvedReason::InvalidLine(v) => write!(f, "line '{}' is not an integer", v),
        }
    }
}

/// Result of linking one marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOutcome {
    Linked {
        annotation: NodeId,
        key: AnnotationKey,
        created: bool,
        variables: Vec<NodeId>,
    },
    Unresolved(UnresolvedReason),
}

/// Links every marker in a graph store to its Annotation.
pub struct GraphLinker<'a, S: GraphStore> {
    store: &'a mut S,
    config: LinkerConfig,
}

impl<'a, S: GraphStore> GraphLinker<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            config: LinkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LinkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one linking pass as a single transaction.
    pub fn run(&mut self) -> Result<LinkStats> {
        let config = &self.config;
        let stats = self.store.transaction(|store| LinkPass::new(store, config).run())?;
        tracing::info!(
            "Linked {}/{} markers ({} new annotations, {} new links)",
            stats.linked,
            stats.markers,
            stats.annotations_created,
            stats.edges_created
        );
        Ok(stats)
    }
}

/// State of one pass over the graph
struct LinkPass<'s, S: GraphStore> {
    store: &'s mut S,
    config: &'s LinkerConfig,
    /// Argument indexes assigned while processing the current marker
    indexes: HashMap<NodeId, i64>,
    stats: LinkStats,
}

impl<'s, S: GraphStore> LinkPass<'s, S> {
    fn new(store: &'s mut S, config: &'s LinkerConfig) -> Self {
        Self {
            store,
            config,
            indexes: HashMap::new(),
            stats: LinkStats::default(),
        }
    }

    fn run(mut self) -> Result<LinkStats> {
        let markers: Vec<Node> = self
            .store
            .nodes_with_label(&Label::Reference)?
            .into_iter()
            .filter(|n| self.is_marker(n))
            .collect();
        self.stats.markers = markers.len();

        for marker in &markers {
            self.indexes.clear();
            match self.link_marker(marker)? {
                MarkerOutcome::Linked { key, created, variables, .. } => {
                    tracing::debug!(
                        "Marker {} → {} ({} variables{})",
                        marker.id,
                        key,
                        variables.len(),
                        if created { ", new" } else { "" }
                    );
                    self.stats.linked += 1;
                    if created {
                        self.stats.annotations_created += 1;
                    }
                }
                MarkerOutcome::Unresolved(reason) => {
                    tracing::debug!("Marker {} unresolved: {}", marker.id, reason);
                    self.stats.unresolved += 1;
                }
            }
        }

        self.stats.annotations = self.store.count_label(&Label::Annotation)?;
        Ok(self.stats)
    }

    fn is_marker(&self, node: &Node) -> bool {
        node.str_property(keys::FULL_NAME)
            .is_some_and(|name| name.contains(&self.config.marker_symbol))
    }

    fn link_marker(&mut self, marker: &Node) -> Result<MarkerOutcome> {
        // Step 1: argument indexes along the evaluation order
        let hops = self.config.argument_hops;
        let path = traverse::chain(&*self.store, marker.id, &EdgeKind::Eog, hops)?;
        if path.len() <= hops.max(1) {
            return Ok(MarkerOutcome::Unresolved(UnresolvedReason::ShortArgumentPath {
                hops: path.len() - 1,
            }));
        }
        for (position, id) in path.iter().enumerate() {
            self.set_index(*id, position as i64 - 1)?;
        }

        // Step 2: the call and its arguments
        let Some(call) = self.marker_call(path[1])? else {
            return Ok(MarkerOutcome::Unresolved(UnresolvedReason::NoMarkerCall));
        };
        let arguments = self.nodes(&self.store.outgoing(call, &EdgeKind::OperatorArguments)?)?;

        let mut values: Vec<NodeId> = Vec::new();
        let mut targets: Vec<(NodeId, i64)> = Vec::new();
        for arg in &arguments {
            let index = self.index_of(arg);
            if arg.has_label(&Label::Literal) {
                let is_null = arg.str_property(keys::CODE).is_some_and(|c| c.contains("null"));
                if !is_null && index.is_none_or(|i| i > 0) {
                    values.push(arg.id);
                }
            } else if let Some(index) = index.filter(|i| *i > 0) {
                for target in self.store.outgoing(arg.id, &EdgeKind::RefersTo)? {
                    self.set_index(target, index)?;
                    targets.push((target, index));
                }
            }
        }

        // Step 3: follow references to the literal holding their value
        let literal_search = self.literal_search();
        for (target, index) in targets {
            if let Some(path) = traverse::first_path(&*self.store, target, &literal_search)? {
                self.set_index(path.end(), index)?;
                values.push(path.end());
            }
        }

        // Step 4: order the values and merge the annotation
        let key = match self.annotation_key(values)? {
            Ok(key) => key,
            Err(reason) => return Ok(MarkerOutcome::Unresolved(reason)),
        };
        let (annotation, created) = self.store.merge_node(&Label::Annotation, &key.properties())?;

        // Step 5: link every declaration flowing into the annotated value
        let variables = self.annotated_variables(&arguments)?;
        for &variable in &variables {
            self.annotate_variable(annotation, &key, variable)?;
        }

        Ok(MarkerOutcome::Linked {
            annotation,
            key,
            created,
            variables,
        })
    }

    /// The lowest-id marker call with an operator argument edge to `first`
    fn marker_call(&self, first: NodeId) -> Result<Option<NodeId>> {
        for caller in self.store.incoming(first, &EdgeKind::OperatorArguments)? {
            let Some(node) = self.store.node(caller)? else {
                continue;
            };
            if node.has_label(&Label::CallExpression) && self.is_marker(&node) {
                return Ok(Some(caller));
            }
        }
        Ok(None)
    }

    fn literal_search(&self) -> ExpandConfig {
        ExpandConfig::new()
            .follow(EdgeKind::Eog, Direction::Outgoing)
            .follow(EdgeKind::RefersTo, Direction::Outgoing)
            .label(Label::CastExpression, LabelPolicy::SkipThrough)
            .label(Label::FunctionDeclaration, LabelPolicy::SkipThrough)
            .label(Label::Literal, LabelPolicy::StopAt)
            .min_level(1)
            .max_depth(self.config.max_depth)
    }

    fn declaration_search(&self) -> ExpandConfig {
        ExpandConfig::new()
            .follow(EdgeKind::Dfg, Direction::Incoming)
            .label(Label::VariableDeclaration, LabelPolicy::StopAt)
            .min_level(0)
            .max_depth(self.config.max_depth)
    }

    /// Inner `Err` means the marker cannot be resolved; outer `Err` is a store failure
    fn annotation_key(
        &self,
        values: Vec<NodeId>,
    ) -> Result<std::result::Result<AnnotationKey, UnresolvedReason>> {
        let mut ids = values;
        ids.sort();
        ids.dedup();
        let mut literals = self.nodes(&ids)?;
        literals.sort_by_key(|n| (self.index_of(n).is_none(), self.index_of(n), n.id));

        if literals.len() != MARKER_VALUES {
            return Ok(Err(UnresolvedReason::ArgumentCount { found: literals.len() }));
        }

        let mut texts = Vec::with_capacity(MARKER_VALUES);
        for literal in &literals {
            match literal.property(keys::VALUE) {
                Some(value) => texts.push(strip_nul(&value.to_string())),
                None => return Ok(Err(UnresolvedReason::MissingValue(literal.id))),
            }
        }

        let line_number = match literals[2].property(keys::VALUE) {
            Some(PropertyValue::Int(i)) => *i,
            _ => match texts[2].trim().parse::<i64>() {
                Ok(i) => i,
                Err(_) => return Ok(Err(UnresolvedReason::InvalidLine(texts[2].clone()))),
            },
        };

        Ok(Ok(AnnotationKey {
            name: texts[0].clone(),
            filename: texts[1].clone(),
            line_number,
            submission: self.config.submission.clone(),
        }))
    }

    /// Declarations reached backwards over DFG from whatever the first
    /// argument refers to
    fn annotated_variables(&self, arguments: &[Node]) -> Result<Vec<NodeId>> {
        let mut registers = BTreeSet::new();
        for arg in arguments.iter().filter(|a| self.index_of(a) == Some(0)) {
            registers.extend(self.store.outgoing(arg.id, &EdgeKind::RefersTo)?);
            registers.extend(self.store.incoming(arg.id, &EdgeKind::RefersTo)?);
        }

        let search = self.declaration_search();
        let mut variables = BTreeSet::new();
        for register in registers {
            variables.extend(traverse::subgraph_nodes(&*self.store, register, &search)?);
        }
        Ok(variables.into_iter().collect())
    }

    fn annotate_variable(&mut self, annotation: NodeId, key: &AnnotationKey, variable: NodeId) -> Result<()> {
        self.store
            .set_property(variable, keys::ANNOTATION, key.name.clone().into())?;
        self.store
            .set_property(variable, keys::FILENAME, key.filename.clone().into())?;
        self.store
            .set_property(variable, keys::LINE_NUMBER, PropertyValue::Int(key.line_number))?;
        self.stats.variables += 1;

        if self
            .store
            .merge_edge(&Edge::new(annotation, variable, EdgeKind::Annotate))?
        {
            self.stats.edges_created += 1;
        }
        Ok(())
    }

    fn set_index(&mut self, id: NodeId, index: i64) -> Result<()> {
        self.indexes.insert(id, index);
        self.store
            .set_property(id, keys::ARGUMENT_INDEX, PropertyValue::Int(index))
    }

    fn index_of(&self, node: &Node) -> Option<i64> {
        self.indexes.get(&node.id).copied().or_else(|| node.argument_index())
    }

    fn nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.store.node(*id)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }
}

fn strip_nul(s: &str) -> String {
    s.trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;
    use crate::Error;

    const MARKER: &str = "llvm.ptr.annotation.p0";

    /// Nodes of one lowered marker call
    struct Marker {
        reference: NodeId,
        value_arg: NodeId,
    }

    /// Lay out a marker call the way CPG lowering does: the name and file
    /// reach their literals through globals, the line is a direct literal.
    fn add_marker(g: &mut MemoryGraph, name: &str, file: &str, line: PropertyValue) -> Marker {
        add_marker_parts(g, Some(name), file, line)
    }

    /// `name: None` leaves the name global without a literal behind it
    fn add_marker_parts(g: &mut MemoryGraph, name: Option<&str>, file: &str, line: PropertyValue) -> Marker {
        let reference = g.add(&[Label::Reference], &[(keys::FULL_NAME, MARKER.into())]);
        let value_arg = g.add(&[Label::Reference], &[(keys::CODE, "%x.addr".into())]);
        let name_arg = g.add(&[Label::Reference], &[(keys::CODE, "@.str".into())]);
        let file_arg = g.add(&[Label::Reference], &[(keys::CODE, "@.str.1".into())]);
        let line_arg = g.add(&[Label::Literal], &[(keys::CODE, "12".into()), (keys::VALUE, line)]);
        let null_arg = g.add(&[Label::Literal], &[(keys::CODE, "null".into())]);
        let call = g.add(&[Label::CallExpression], &[(keys::FULL_NAME, MARKER.into())]);

        g.connect(reference, value_arg, EdgeKind::Eog);
        g.connect(value_arg, name_arg, EdgeKind::Eog);
        g.connect(name_arg, file_arg, EdgeKind::Eog);
        g.connect(file_arg, line_arg, EdgeKind::Eog);
        for arg in [value_arg, name_arg, file_arg, line_arg, null_arg] {
            g.connect(call, arg, EdgeKind::OperatorArguments);
        }

        let name_global = g.add(&[Label::Other("Declaration".into())], &[]);
        g.connect(name_arg, name_global, EdgeKind::RefersTo);
        if let Some(name) = name {
            let name_literal = g.add(&[Label::Literal], &[(keys::VALUE, format!("{}\0", name).into())]);
            g.connect(name_global, name_literal, EdgeKind::Eog);
        }

        let file_global = g.add(&[Label::Other("Declaration".into())], &[]);
        let cast = g.add(&[Label::CastExpression], &[]);
        let file_literal = g.add(&[Label::Literal], &[(keys::VALUE, format!("{}\0", file).into())]);
        g.connect(file_arg, file_global, EdgeKind::RefersTo);
        g.connect(file_global, cast, EdgeKind::Eog);
        g.connect(cast, file_literal, EdgeKind::Eog);

        Marker { reference, value_arg }
    }

    /// A declaration whose value flows straight into the marker's first argument
    fn add_declaration(g: &mut MemoryGraph, marker: &Marker, name: &str) -> NodeId {
        let register = g.add(&[Label::Other("UnaryOperator".into())], &[]);
        let decl = g.add(&[Label::VariableDeclaration], &[(keys::NAME, name.into())]);
        g.connect(marker.value_arg, register, EdgeKind::RefersTo);
        g.connect(decl, register, EdgeKind::Dfg);
        decl
    }

    fn link(g: &mut MemoryGraph) -> LinkStats {
        GraphLinker::new(g).run().unwrap()
    }

    #[test]
    fn test_single_marker_links_declaration() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", PropertyValue::Int(3));
        let decl = add_declaration(&mut g, &marker, "y");

        let stats = link(&mut g);
        assert_eq!(stats.markers, 1);
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.annotations, 1);
        assert_eq!(stats.edges_created, 1);

        let annotation = &g.nodes_with_label(&Label::Annotation).unwrap()[0];
        assert_eq!(annotation.str_property(keys::NAME), Some("y"));
        assert_eq!(annotation.str_property(keys::FILENAME), Some("main.rs"));
        assert_eq!(annotation.int_property(keys::LINE_NUMBER), Some(3));
        assert_eq!(annotation.properties.len(), 3);
        assert_eq!(g.outgoing(annotation.id, &EdgeKind::Annotate).unwrap(), vec![decl]);

        let decl = g.node(decl).unwrap().unwrap();
        assert_eq!(decl.str_property(keys::ANNOTATION), Some("y"));
        assert_eq!(decl.str_property(keys::FILENAME), Some("main.rs"));
        assert_eq!(decl.int_property(keys::LINE_NUMBER), Some(3));
    }

    #[test]
    fn test_argument_indexes_recovered() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", PropertyValue::Int(3));
        link(&mut g);

        let path = traverse::chain(&g, marker.reference, &EdgeKind::Eog, 4).unwrap();
        let indexes: Vec<_> = path
            .iter()
            .map(|id| g.node(*id).unwrap().unwrap().argument_index())
            .collect();
        assert_eq!(indexes, vec![Some(-1), Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_line_given_as_string() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "n", "lib.rs", "42\0".into());
        add_declaration(&mut g, &marker, "n");

        link(&mut g);
        let annotation = &g.nodes_with_label(&Label::Annotation).unwrap()[0];
        assert_eq!(annotation.int_property(keys::LINE_NUMBER), Some(42));
    }

    #[test]
    fn test_identical_triples_merge() {
        let mut g = MemoryGraph::new();
        let first = add_marker(&mut g, "x", "main.rs", PropertyValue::Int(7));
        let second = add_marker(&mut g, "x", "main.rs", PropertyValue::Int(7));
        let a = add_declaration(&mut g, &first, "x");
        let b = add_declaration(&mut g, &second, "x");

        let stats = link(&mut g);
        assert_eq!(stats.linked, 2);
        assert_eq!(stats.annotations_created, 1);
        assert_eq!(stats.annotations, 1);

        let annotation = g.nodes_with_label(&Label::Annotation).unwrap()[0].id;
        assert_eq!(g.outgoing(annotation, &EdgeKind::Annotate).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_fan_out_to_every_declaration_in_flow() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "v", "main.rs", PropertyValue::Int(9));
        let register = g.add(&[Label::Other("UnaryOperator".into())], &[]);
        let phi = g.add(&[Label::Other("PhiNode".into())], &[]);
        let a = g.add(&[Label::VariableDeclaration], &[]);
        let b = g.add(&[Label::VariableDeclaration], &[]);
        g.connect(marker.value_arg, register, EdgeKind::RefersTo);
        g.connect(phi, register, EdgeKind::Dfg);
        g.connect(a, phi, EdgeKind::Dfg);
        g.connect(b, phi, EdgeKind::Dfg);

        let stats = link(&mut g);
        assert_eq!(stats.variables, 2);
        let annotation = g.nodes_with_label(&Label::Annotation).unwrap()[0].id;
        assert_eq!(g.outgoing(annotation, &EdgeKind::Annotate).unwrap(), vec![a, b]);
        for decl in [a, b] {
            let node = g.node(decl).unwrap().unwrap();
            assert_eq!(node.str_property(keys::ANNOTATION), Some("v"));
        }
    }

    #[test]
    fn test_unresolvable_marker_is_isolated() {
        let mut g = MemoryGraph::new();
        let good = add_marker(&mut g, "ok", "main.rs", PropertyValue::Int(1));
        add_declaration(&mut g, &good, "ok");

        // A marker whose evaluation order stops after two hops
        let broken = g.add(&[Label::Reference], &[(keys::FULL_NAME, MARKER.into())]);
        let a = g.add(&[Label::Reference], &[]);
        let b = g.add(&[Label::Reference], &[]);
        g.connect(broken, a, EdgeKind::Eog);
        g.connect(a, b, EdgeKind::Eog);

        let stats = link(&mut g);
        assert_eq!(stats.markers, 2);
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.annotations, 1);
    }

    #[test]
    fn test_unresolvable_literal_is_isolated() {
        let mut g = MemoryGraph::new();
        let good = add_marker(&mut g, "ok", "main.rs", PropertyValue::Int(1));
        let linked = add_declaration(&mut g, &good, "ok");
        let nameless = add_marker_parts(&mut g, None, "main.rs", PropertyValue::Int(2));
        let orphan = add_declaration(&mut g, &nameless, "lost");

        let stats = link(&mut g);
        assert_eq!(stats.markers, 2);
        assert_eq!(stats.linked, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.annotations, 1);

        let annotation = &g.nodes_with_label(&Label::Annotation).unwrap()[0];
        assert_eq!(annotation.str_property(keys::NAME), Some("ok"));
        assert_eq!(g.outgoing(annotation.id, &EdgeKind::Annotate).unwrap(), vec![linked]);

        let orphan = g.node(orphan).unwrap().unwrap();
        assert_eq!(orphan.str_property(keys::ANNOTATION), None);
        assert_eq!(orphan.int_property(keys::LINE_NUMBER), None);
    }

    #[test]
    fn test_extra_literal_leaves_no_annotation() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", PropertyValue::Int(3));
        add_declaration(&mut g, &marker, "y");
        let call = g.incoming(marker.value_arg, &EdgeKind::OperatorArguments).unwrap()[0];
        let extra = g.add(&[Label::Literal], &[(keys::CODE, "7".into()), (keys::VALUE, PropertyValue::Int(7))]);
        g.connect(call, extra, EdgeKind::OperatorArguments);

        let stats = link(&mut g);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.annotations, 0);
        assert_eq!(stats.variables, 0);
    }

    #[test]
    fn test_invalid_line_leaves_no_annotation() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", "twelve".into());
        add_declaration(&mut g, &marker, "y");

        let stats = link(&mut g);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.annotations, 0);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", PropertyValue::Int(3));
        add_declaration(&mut g, &marker, "y");

        let first = link(&mut g);
        let edges = g.count_edges().unwrap();
        let second = link(&mut g);

        assert_eq!(first.annotations, second.annotations);
        assert_eq!(second.annotations_created, 0);
        assert_eq!(second.edges_created, 0);
        assert_eq!(second.linked, 1);
        assert_eq!(g.count_edges().unwrap(), edges);
    }

    #[test]
    fn test_submission_scoped_annotations_stay_distinct() {
        let mut g = MemoryGraph::new();
        let marker = add_marker(&mut g, "y", "main.rs", PropertyValue::Int(3));
        add_declaration(&mut g, &marker, "y");

        for submission in ["aaaa", "bbbb"] {
            GraphLinker::new(&mut g)
                .with_config(LinkerConfig::default().with_submission(submission))
                .run()
                .unwrap();
        }

        let annotations = g.nodes_with_label(&Label::Annotation).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].str_property(keys::SUBMISSION), Some("aaaa"));
        assert_eq!(annotations[1].str_property(keys::SUBMISSION), Some("bbbb"));
    }

    #[test]
    fn test_other_references_ignored() {
        let mut g = MemoryGraph::new();
        g.add(&[Label::Reference], &[(keys::FULL_NAME, "core::fmt::write".into())]);
        let stats = link(&mut g);
        assert_eq!(stats, LinkStats::default());
    }

    /// Store that fails when the linker tries to write an ANNOTATE edge
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryGraph,
    }

    impl GraphStore for FailingStore {
        fn node(&self, id: NodeId) -> Result<Option<Node>> {
            self.inner.node(id)
        }
        fn nodes_with_label(&self, label: &Label) -> Result<Vec<Node>> {
            self.inner.nodes_with_label(label)
        }
        fn outgoing(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
            self.inner.outgoing(id, kind)
        }
        fn incoming(&self, id: NodeId, kind: &EdgeKind) -> Result<Vec<NodeId>> {
            self.inner.incoming(id, kind)
        }
        fn add_node(&mut self, labels: &[Label], properties: &Properties) -> Result<NodeId> {
            self.inner.add_node(labels, properties)
        }
        fn set_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> Result<()> {
            self.inner.set_property(id, key, value)
        }
        fn merge_edge(&mut self, edge: &Edge) -> Result<bool> {
            if edge.kind == EdgeKind::Annotate {
                return Err(Error::StoreUnavailable("connection lost".into()));
            }
            self.inner.merge_edge(edge)
        }
        fn find_node(&self, label: &Label, properties: &Properties) -> Result<Option<NodeId>> {
            self.inner.find_node(label, properties)
        }
        fn count_nodes(&self) -> Result<usize> {
            self.inner.count_nodes()
        }
        fn count_edges(&self) -> Result<usize> {
            self.inner.count_edges()
        }
        fn count_label(&self, label: &Label) -> Result<usize> {
            self.inner.count_label(label)
        }
        fn transaction<T, F>(&mut self, f: F) -> Result<T>
        where
            F: FnOnce(&mut Self) -> Result<T>,
        {
            let snapshot = self.inner.clone();
            let result = f(self);
            if result.is_err() {
                self.inner = snapshot;
            }
            result
        }
    }

    #[test]
    fn test_store_error_rolls_back_pass() {
        let mut store = FailingStore::default();
        let marker = add_marker(&mut store.inner, "y", "main.rs", PropertyValue::Int(3));
        let decl = add_declaration(&mut store.inner, &marker, "y");

        let result = GraphLinker::new(&mut store).run();
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(store.count_label(&Label::Annotation).unwrap(), 0);
        let decl = store.node(decl).unwrap().unwrap();
        assert!(decl.str_property(keys::ANNOTATION).is_none());
    }
}
