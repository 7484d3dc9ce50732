//! Project-wide lineage graph construction
//!
//! This crate handles:
//! - Building the dependency graph from per-asset ASTs
//! - Cycle detection with the full offending path
//! - Deterministic topological build order
//! - Upstream/downstream queries (immediate and transitive)

pub mod error;
pub mod lineage;
pub mod resolver;

pub use error::ResolveError;
pub use lineage::{DependencyEdge, LineageGraph, NodeId};
pub use resolver::{DependencyResolver, Resolution, ResolverOptions};
