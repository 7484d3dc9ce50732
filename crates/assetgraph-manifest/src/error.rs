//! Compile pass errors

use assetgraph_core::ConfigError;
use assetgraph_graph::ResolveError;
use assetgraph_parser::DefinitionError;
use std::path::PathBuf;

/// Any of these aborts the whole compile pass. No artifact is produced or
/// cached for a failed pass.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to scan project directory {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("Duplicate asset id '{id}' defined in {first} and {second}")]
    DuplicateAsset {
        id: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
