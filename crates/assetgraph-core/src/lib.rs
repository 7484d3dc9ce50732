//! assetgraph core
//!
//! Shared domain model for the asset compiler: canonical definition blocks,
//! schema and test metadata, non-fatal diagnostics and project configuration.
//! Diagnostic codes are part of the public API - never rename them.

pub mod blocks;
pub mod config;
pub mod diagnostic;
pub mod schema;

pub use blocks::{Blocks, ContractBlock, IngestBlock, TransformBlock};
pub use config::{Config, ConfigError, LimitsConfig, LineageConfig, ProjectConfig, CONFIG_FILE_NAME};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use schema::{ColumnInfo, ColumnSource, SchemaInfo, TestDefinition, UNKNOWN_TYPE};
