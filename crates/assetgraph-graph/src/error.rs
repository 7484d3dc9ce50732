//! Dependency resolution errors

use crate::lineage::NodeId;

/// A resolve call either succeeds completely or returns one of these.
/// No partial graph or order is produced on failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// `path` starts and ends at the same asset
    #[error("Cyclic dependency detected: {}", path.join(" → "))]
    CyclicDependency { path: Vec<NodeId> },

    #[error("Asset '{asset}' references '{dependency}', which is not defined in the project")]
    UnresolvedDependency { asset: NodeId, dependency: NodeId },
}
