//! Lineage graph with forward and reverse edges
//!
//! Built once per resolve call and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Node identifier (asset id or external source id)
pub type NodeId = String;

/// Directed edge: `to` depends on `from`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: NodeId,
    pub to: NodeId,
}

impl DependencyEdge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Dependency graph over project assets and external source leaves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineageGraph {
    /// Assets defined in the project
    nodes: BTreeSet<NodeId>,

    /// Referenced ids with no definition in the project.
    ///
    /// An external leaf only ever appears as the `from` side of an edge: it
    /// has no dependencies of its own, so `upstream` of it is always empty.
    /// `downstream` still lists the assets that read it.
    external: BTreeSet<NodeId>,

    /// Deduplicated edge set, ordered by (from, to)
    edges: BTreeSet<DependencyEdge>,

    /// node -> nodes it depends on
    parents: BTreeMap<NodeId, BTreeSet<NodeId>>,

    /// node -> nodes that depend on it
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl LineageGraph {
    /// Build a graph from its node sets and edges. Edge endpoints need not
    /// appear in either node set.
    pub fn new(
        nodes: BTreeSet<NodeId>,
        external: BTreeSet<NodeId>,
        edges: BTreeSet<DependencyEdge>,
    ) -> Self {
        let mut parents: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        let mut children: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

        for edge in &edges {
            parents
                .entry(edge.to.clone())
                .or_default()
                .insert(edge.from.clone());
            children
                .entry(edge.from.clone())
                .or_default()
                .insert(edge.to.clone());
        }

        Self {
            nodes,
            external,
            edges,
            parents,
            children,
        }
    }

    /// Project assets, in lexical order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// External source leaves, in lexical order
    pub fn external_sources(&self) -> impl Iterator<Item = &NodeId> {
        self.external.iter()
    }

    /// All edges, ordered by (from, to)
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether `id` is a project asset or an external leaf
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id) || self.external.contains(id)
    }

    pub fn is_external(&self, id: &str) -> bool {
        self.external.contains(id)
    }

    /// Immediate dependencies of a node
    pub fn upstream(&self, id: &str) -> Vec<&NodeId> {
        self.parents
            .get(id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Immediate dependents of a node
    pub fn downstream(&self, id: &str) -> Vec<&NodeId> {
        self.children
            .get(id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Every node that `id` depends on, directly or not, nearest first
    pub fn transitive_upstream(&self, id: &str) -> Vec<NodeId> {
        Self::walk(&self.parents, id)
    }

    /// Every node affected if `id` changes, nearest first
    ///
    /// This is the "blast radius" of a change.
    pub fn transitive_downstream(&self, id: &str) -> Vec<NodeId> {
        Self::walk(&self.children, id)
    }

    /// Whether `target` is reachable from `source` along dependency edges
    pub fn has_path(&self, source: &str, target: &str) -> bool {
        self.transitive_downstream(source)
            .iter()
            .any(|node| node == target)
    }

    fn walk(adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>, start: &str) -> Vec<NodeId> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::new();
        let mut result = Vec::new();

        if let Some(next) = adjacency.get(start) {
            queue.extend(next);
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.as_str()) {
                continue;
            }
            result.push(current.clone());

            if let Some(next) = adjacency.get(current) {
                queue.extend(next.iter().filter(|n| !visited.contains(n.as_str())));
            }
        }

        result
    }
}
