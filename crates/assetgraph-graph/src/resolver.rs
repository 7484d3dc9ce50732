//! Global dependency resolution
//!
//! Runs once per compile pass over the complete AST set:
//! 1. Edge construction (unknown ids become external leaves)
//! 2. Depth-first cycle detection
//! 3. Kahn ordering with lexical tie-breaking

use assetgraph_core::{Diagnostic, DiagnosticCode, Severity};
use assetgraph_parser::Ast;
use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};

use crate::error::ResolveError;
use crate::lineage::{DependencyEdge, LineageGraph, NodeId};

/// Resolver policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Accept references to ids outside the project as external leaves
    pub allow_external: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            allow_external: true,
        }
    }
}

/// Successful resolve output
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub graph: LineageGraph,

    /// Project assets, every one after all of its internal dependencies
    pub order: Vec<NodeId>,

    /// One `EXTERNAL_DEPENDENCY` note per (asset, external id) pair
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Builds the lineage graph and build order from per-asset dependency sets
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    options: ResolverOptions,
}

impl DependencyResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Resolve the full AST set of a project
    pub fn resolve(&self, asts: &[Ast]) -> Result<Resolution, ResolveError> {
        self.resolve_nodes(asts.iter().map(|ast| (ast.id.as_str(), &ast.dependencies)))
    }

    /// Resolve `(asset id, dependency ids)` pairs
    pub fn resolve_nodes<'a, I>(&self, assets: I) -> Result<Resolution, ResolveError>
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
    {
        let mut dependencies: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for (id, deps) in assets {
            dependencies
                .entry(id.to_string())
                .or_default()
                .extend(deps.iter().cloned());
        }

        let mut external = BTreeSet::new();
        let mut edges = BTreeSet::new();
        let mut diagnostics = Vec::new();

        for (asset, deps) in &dependencies {
            for dep in deps {
                if !dependencies.contains_key(dep) {
                    if !self.options.allow_external {
                        return Err(ResolveError::UnresolvedDependency {
                            asset: asset.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    tracing::debug!(asset = %asset, source = %dep, "external dependency");
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::ExternalDependency,
                            Severity::Info,
                            format!("'{}' is not defined in the project; treated as an external source", dep),
                        )
                        .with_asset(asset.clone()),
                    );
                    external.insert(dep.clone());
                }
                edges.insert(DependencyEdge::new(dep.clone(), asset.clone()));
            }
        }

        if let Some(path) = find_cycle(&dependencies) {
            tracing::debug!(cycle = ?path, "dependency cycle");
            return Err(ResolveError::CyclicDependency { path });
        }

        let order = topological_order(&dependencies);
        let nodes: BTreeSet<NodeId> = dependencies.into_keys().collect();
        let graph = LineageGraph::new(nodes, external, edges);

        tracing::info!(
            assets = order.len(),
            edges = graph.edge_count(),
            external = graph.external_sources().count(),
            "resolved lineage graph"
        );

        Ok(Resolution {
            graph,
            order,
            diagnostics,
        })
    }
}

/// Depth-first search from each asset along its internal dependencies.
///
/// Returns the first cycle found, from the repeated node back to itself.
/// Iterative so long chains cannot exhaust the call stack.
fn find_cycle(dependencies: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> Option<Vec<NodeId>> {
    let mut state: HashMap<&str, Visit> = HashMap::new();

    for (root, root_deps) in dependencies {
        if state.contains_key(root.as_str()) {
            continue;
        }

        let mut stack: Vec<(&str, btree_set::Iter<'_, NodeId>)> = vec![(root.as_str(), root_deps.iter())];
        state.insert(root.as_str(), Visit::Active);

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            let Some(dep) = pending.next() else {
                state.insert(node, Visit::Done);
                stack.pop();
                continue;
            };

            // external leaves have no outgoing edges
            let Some(dep_deps) = dependencies.get(dep) else {
                continue;
            };

            match state.get(dep.as_str()) {
                Some(Visit::Active) => {
                    let start = stack
                        .iter()
                        .position(|(id, _)| *id == dep.as_str())
                        .unwrap_or(0);
                    let mut path: Vec<NodeId> =
                        stack[start..].iter().map(|(id, _)| id.to_string()).collect();
                    path.push(dep.clone());
                    return Some(path);
                }
                Some(Visit::Done) => {}
                None => {
                    state.insert(dep.as_str(), Visit::Active);
                    stack.push((dep.as_str(), dep_deps.iter()));
                }
            }
        }
    }

    None
}

/// Kahn's algorithm over project assets; ready ties pop in ascending id order
fn topological_order(dependencies: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> Vec<NodeId> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (asset, deps) in dependencies {
        let internal: Vec<&str> = deps
            .iter()
            .filter(|dep| dependencies.contains_key(*dep))
            .map(String::as_str)
            .collect();
        in_degree.insert(asset.as_str(), internal.len());
        for dep in internal {
            dependents.entry(dep).or_default().push(asset.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());

        for &child in dependents.get(node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(child);
                }
            }
        }
    }

    debug_assert_eq!(order.len(), dependencies.len(), "cycle survived detection");
    order
}
