//! Bounded graph traversal
//!
//! Explicit replacements for declarative path matching:
//! - [`chain`]: fixed-length walk along one relationship type
//! - [`expand`]: breadth-first path expansion with a per-label policy
//! - [`subgraph_nodes`]: the node set reachable under the same policy
//!
//! Every walk is bounded by `max_depth` and visits each node at most once.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{EdgeKind, GraphStore, Label, Node, NodeId};
use crate::Result;

/// Direction in which an edge is followed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// How a node carrying a given label is treated during expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Walk through the node; it is never a result
    SkipThrough,
    /// The node is a result and the walk does not continue past it
    StopAt,
    /// The node is never entered
    Disallow,
}

/// Default bound on traversal depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for [`expand`] and [`subgraph_nodes`]
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    edges: Vec<(EdgeKind, Direction)>,
    policies: Vec<(Label, LabelPolicy)>,
    min_level: usize,
    max_depth: usize,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpandConfig {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            policies: Vec::new(),
            min_level: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Follow edges of `kind` in `direction`
    pub fn follow(mut self, kind: EdgeKind, direction: Direction) -> Self {
        self.edges.push((kind, direction));
        self
    }

    /// Apply `policy` to nodes carrying `label`
    pub fn label(mut self, label: Label, policy: LabelPolicy) -> Self {
        self.policies.push((label, policy));
        self
    }

    /// Minimum path length for a node to count as a result
    pub fn min_level(mut self, level: usize) -> Self {
        self.min_level = level;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Effective policy for a node.
    ///
    /// `Disallow` wins over `SkipThrough`, which wins over `StopAt`.
    fn policy_for(&self, node: &Node) -> Option<LabelPolicy> {
        let mut result = None;
        for (label, policy) in &self.policies {
            if !node.has_label(label) {
                continue;
            }
            result = match (result, policy) {
                (_, LabelPolicy::Disallow) | (Some(LabelPolicy::Disallow), _) => Some(LabelPolicy::Disallow),
                (_, LabelPolicy::SkipThrough) | (Some(LabelPolicy::SkipThrough), _) => {
                    Some(LabelPolicy::SkipThrough)
                }
                _ => Some(LabelPolicy::StopAt),
            };
        }
        result
    }

    fn has_stop_labels(&self) -> bool {
        self.policies.iter().any(|(_, p)| *p == LabelPolicy::StopAt)
    }
}

/// A path found by [`expand`], from the start node to a result node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
}

impl Path {
    pub fn end(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of edges on the path
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Neighbours of `id` along the configured edges, ascending and de-duplicated
pub fn neighbours<S: GraphStore>(
    store: &S,
    id: NodeId,
    edges: &[(EdgeKind, Direction)],
) -> Result<Vec<NodeId>> {
    let mut out = Vec::new();
    for (kind, direction) in edges {
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            out.extend(store.outgoing(id, kind)?);
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            out.extend(store.incoming(id, kind)?);
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Walk `hops` edges of `kind` forward from `start`.
///
/// Returns the visited nodes, starting with `start`. Where a node has several
/// successors the lowest id is taken; the walk ends early at a dead end or a
/// cycle, so the result may hold fewer than `hops + 1` nodes.
pub fn chain<S: GraphStore>(store: &S, start: NodeId, kind: &EdgeKind, hops: usize) -> Result<Vec<NodeId>> {
    let mut path = vec![start];
    let mut current = start;
    for _ in 0..hops {
        let Some(next) = store.outgoing(current, kind)?.into_iter().next() else {
            break;
        };
        if path.contains(&next) {
            break;
        }
        path.push(next);
        current = next;
    }
    Ok(path)
}

/// Breadth-first expansion from `start`, returning paths to result nodes in
/// discovery order (shortest first).
pub fn expand<S: GraphStore>(store: &S, start: NodeId, config: &ExpandConfig) -> Result<Vec<Path>> {
    walk(store, start, config, None)
}

/// The first path [`expand`] would return
pub fn first_path<S: GraphStore>(store: &S, start: NodeId, config: &ExpandConfig) -> Result<Option<Path>> {
    Ok(walk(store, start, config, Some(1))?.into_iter().next())
}

/// Result nodes reachable from `start`, in discovery order.
pub fn subgraph_nodes<S: GraphStore>(store: &S, start: NodeId, config: &ExpandConfig) -> Result<Vec<NodeId>> {
    Ok(walk(store, start, config, None)?
        .into_iter()
        .map(|p| p.end())
        .collect())
}

fn walk<S: GraphStore>(
    store: &S,
    start: NodeId,
    config: &ExpandConfig,
    limit: Option<usize>,
) -> Result<Vec<Path>> {
    let terminals_only = config.has_stop_labels();
    let mut results = Vec::new();
    let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((id, depth)) = queue.pop_front() {
        let Some(node) = store.node(id)? else {
            continue;
        };
        let policy = config.policy_for(&node);
        if policy == Some(LabelPolicy::Disallow) {
            continue;
        }

        let is_result = depth >= config.min_level
            && match policy {
                Some(LabelPolicy::StopAt) => true,
                Some(LabelPolicy::SkipThrough) => false,
                _ => !terminals_only,
            };
        if is_result {
            results.push(Path {
                nodes: path_to(&parents, start, id),
            });
            if limit.is_some_and(|l| results.len() >= l) {
                break;
            }
        }

        let stops_here = policy == Some(LabelPolicy::StopAt) && depth >= config.min_level;
        if stops_here || depth >= config.max_depth {
            continue;
        }

        for next in neighbours(store, id, &config.edges)? {
            if visited.insert(next) {
                parents.insert(next, id);
                queue.push_back((next, depth + 1));
            }
        }
    }

    Ok(results)
}

fn path_to(parents: &HashMap<NodeId, NodeId>, start: NodeId, end: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![end];
    let mut current = end;
    while current != start {
        match parents.get(&current) {
            Some(&parent) => {
                nodes.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    nodes.reverse();
    nodes
}
