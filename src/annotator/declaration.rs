//! Binding declaration parser
//!
//! Variable bindings form a tiny sub-language inside a Rust file:
//!
//! ```text
//! let [mut] <ident> [: <type>] = <rhs>;
//! ```
//!
//! The source is parsed with tree-sitter-rust. Every `let_declaration` node
//! is classified into one of four shapes, tried in a fixed priority order;
//! `let_condition` nodes (`if let`, `while let`, let-chains) are reported as
//! control-flow bindings. Comments and literals never produce `let` nodes.
//! The exclusion predicates in this module decide whether a match may be
//! wrapped.

use std::fmt;

use tree_sitter::{Language, Node, Parser, Tree};

/// The identifier that binds nothing nameable
pub const DISCARD_IDENT: &str = "_";

const LET_DECLARATION: &str = "let_declaration";
const LET_CONDITION: &str = "let_condition";

/// Shape of a binding statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingShape {
    /// `let mut x: T = ...;`
    TypedMutable,
    /// `let mut x = ...;`
    UntypedMutable,
    /// `let x: T = ...;`
    TypedImmutable,
    /// `let x = ...;`
    UntypedImmutable,
}

impl BindingShape {
    /// All shapes in the order they are tried
    pub fn all() -> &'static [BindingShape] {
        &[
            BindingShape::TypedMutable,
            BindingShape::UntypedMutable,
            BindingShape::TypedImmutable,
            BindingShape::UntypedImmutable,
        ]
    }

    /// First shape, in priority order, that accepts the parsed fields
    pub fn classify(mutable: bool, typed: bool) -> BindingShape {
        BindingShape::all()
            .iter()
            .copied()
            .find(|shape| shape.is_mutable() == mutable && shape.has_type() == typed)
            .unwrap_or(BindingShape::UntypedImmutable)
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, BindingShape::TypedMutable | BindingShape::UntypedMutable)
    }

    pub fn has_type(&self) -> bool {
        matches!(self, BindingShape::TypedMutable | BindingShape::TypedImmutable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingShape::TypedMutable => "typed-mutable",
            BindingShape::UntypedMutable => "mutable",
            BindingShape::TypedImmutable => "typed-immutable",
            BindingShape::UntypedImmutable => "immutable",
        }
    }
}

impl fmt::Display for BindingShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `let` binding recognized by one of the binding shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationMatch {
    pub shape: BindingShape,
    /// Bound identifier
    pub identifier: String,
    /// Declared type (typed shapes only)
    pub ty: Option<String>,
    /// Everything between `let ` and the terminator, verbatim
    pub binding: String,
    /// Right-hand side expression text, verbatim
    pub rhs: String,
    /// Whether the `let` belongs to `if let`, `while let` or a let-chain
    pub control_flow_prefixed: bool,
    /// Byte offset of the `let` keyword
    pub start: usize,
    /// Byte offset just past the terminator
    pub end: usize,
    /// 1-indexed line of the `let` keyword
    pub line: u32,
}

impl DeclarationMatch {
    pub fn is_mutable(&self) -> bool {
        self.shape.is_mutable()
    }

    pub fn has_type(&self) -> bool {
        self.shape.has_type()
    }
}

/// Why a `let` occurrence was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pattern binding in `if let` / `while let` / let-chains
    ControlFlow,
    /// `let _ = ...;`
    Discard,
    /// Right-hand side starts with `{` or `(`
    OpensBlockOrGroup,
    /// The statement has a syntax error, usually a missing terminator
    Malformed,
    /// None of the binding shapes apply (destructuring, `let x;`, let-else)
    Unrecognized,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::ControlFlow => "control-flow pattern binding",
            SkipReason::Discard => "discard binding",
            SkipReason::OpensBlockOrGroup => "right-hand side opens a block or group",
            SkipReason::Malformed => "malformed statement",
            SkipReason::Unrecognized => "unrecognized binding",
        };
        write!(f, "{}", s)
    }
}

/// A `let` keyword the annotator decided not to wrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub offset: usize,
    pub line: u32,
    pub reason: SkipReason,
}

/// Result of scanning a source text for bindings
#[derive(Debug, Default, Clone)]
pub struct Scan {
    /// Wrappable declarations, in source order, non-overlapping
    pub matches: Vec<DeclarationMatch>,
    pub skipped: Vec<Skipped>,
}

/// Parse `text` as Rust, `None` if tree-sitter gives up.
pub fn parse_source(text: &str) -> Option<Tree> {
    let language: Language = tree_sitter_rust::LANGUAGE.into();
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language) {
        tracing::warn!("Failed to load Rust grammar: {}", e);
        return None;
    }
    parser.parse(text, None)
}

/// Scan `text` for binding statements.
pub fn scan(text: &str) -> Scan {
    let mut scan = Scan::default();
    match parse_source(text) {
        Some(tree) => collect(tree.root_node(), text, &mut scan),
        None => tracing::warn!("Failed to parse source, no bindings wrapped"),
    }
    scan
}

/// Pre-order walk; a wrapped declaration is not descended into, so matches
/// never overlap.
fn collect(node: Node<'_>, text: &str, scan: &mut Scan) {
    if matches!(node.kind(), LET_DECLARATION | LET_CONDITION) {
        let skipped = match parse_declaration(node, text) {
            Ok(decl) => match exclusion(&decl) {
                None => {
                    scan.matches.push(decl);
                    return;
                }
                Some(reason) => reason,
            },
            Err(reason) => reason,
        };
        scan.skipped.push(Skipped {
            offset: node.start_byte(),
            line: line_of(node),
            reason: skipped,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, text, scan);
    }
}

/// Classify a `let_declaration` or `let_condition` node.
pub fn parse_declaration(node: Node<'_>, text: &str) -> Result<DeclarationMatch, SkipReason> {
    let control_flow_prefixed = is_control_flow_prefixed(node);
    let unrecognized = if control_flow_prefixed {
        SkipReason::ControlFlow
    } else {
        SkipReason::Unrecognized
    };

    let (mutable, pattern) = binding_pattern(node).ok_or(unrecognized)?;
    let identifier = match pattern.kind() {
        "identifier" | DISCARD_IDENT => &text[pattern.byte_range()],
        _ => return Err(unrecognized),
    };
    let ty = node.child_by_field_name("type");
    let value = node.child_by_field_name("value").ok_or(unrecognized)?;
    if node.child_by_field_name("alternative").is_some() {
        return Err(SkipReason::Unrecognized);
    }

    // text after `let`, starting at `mut` or the pattern
    let binding_start = node.child(1).map(|c| c.start_byte()).unwrap_or(pattern.start_byte());
    let (binding_end, end) = if control_flow_prefixed {
        (node.end_byte(), node.end_byte())
    } else {
        if node.has_error() {
            return Err(SkipReason::Malformed);
        }
        let terminator = terminator(node).ok_or(SkipReason::Malformed)?;
        if opens_block_or_group(&text[value.byte_range()]) {
            return Err(SkipReason::OpensBlockOrGroup);
        }
        (terminator.start_byte(), terminator.end_byte())
    };

    Ok(DeclarationMatch {
        shape: BindingShape::classify(mutable, ty.is_some()),
        identifier: identifier.to_string(),
        ty: ty.map(|t| text[t.byte_range()].to_string()),
        binding: text[binding_start..binding_end].trim_end().to_string(),
        rhs: text[value.byte_range()].to_string(),
        control_flow_prefixed,
        start: node.start_byte(),
        end,
        line: line_of(node),
    })
}

/// Decide whether a parsed declaration must stay untouched
pub fn exclusion(decl: &DeclarationMatch) -> Option<SkipReason> {
    if decl.control_flow_prefixed {
        return Some(SkipReason::ControlFlow);
    }
    if is_discard(&decl.identifier) {
        return Some(SkipReason::Discard);
    }
    None
}

/// True for `let` nodes that are the condition of `if`, `while` or a let-chain.
pub fn is_control_flow_prefixed(node: Node<'_>) -> bool {
    node.kind() == LET_CONDITION
}

/// True for the discard identifier `_`
pub fn is_discard(identifier: &str) -> bool {
    identifier == DISCARD_IDENT
}

/// True if a right-hand side starts with a block or parenthesized group.
///
/// Such bindings are never wrapped.
pub fn opens_block_or_group(rhs: &str) -> bool {
    matches!(rhs.trim_start().as_bytes().first(), Some(b'{') | Some(b'('))
}

/// Mutability and the bound pattern, unwrapping `mut_pattern`
fn binding_pattern(node: Node<'_>) -> Option<(bool, Node<'_>)> {
    let pattern = node.child_by_field_name("pattern")?;
    let mut cursor = node.walk();
    let mutable = node
        .children(&mut cursor)
        .any(|c| c.kind() == "mutable_specifier");
    if pattern.kind() == "mut_pattern" {
        let inner = pattern.named_child(1).or_else(|| pattern.child(1))?;
        return Some((true, inner));
    }
    Some((mutable, pattern))
}

fn terminator(node: Node<'_>) -> Option<Node<'_>> {
    let last = node.child(node.child_count().checked_sub(1)?)?;
    (last.kind() == ";" && !last.is_missing()).then_some(last)
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}
