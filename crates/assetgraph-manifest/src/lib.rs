//! Project compilation and cache-backed artifact loading
//!
//! This crate handles:
//! - Discovering asset definition files under a project root
//! - Parsing and AST generation on a worker pool, then one global resolve
//! - Projecting the compiled project into manifest, lineage, schema and test artifacts
//! - Serving those artifacts from the metadata cache when the asset files are unchanged

pub mod artifacts;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod project;

pub use artifacts::{
    AssetLineage, AssetRecord, AssetTests, Artifacts, LineageArtifact, Manifest, ProjectInfo,
    SchemaIndex, TestIndex,
};
pub use discovery::{SourceFile, SourceSet};
pub use error::CompileError;
pub use generator::{CompiledProject, ManifestGenerator};
pub use project::{CompileOutcome, Project};
