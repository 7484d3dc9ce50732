//! Normalized per-asset view used by the resolver and manifest generator
//!
//! The AST is ephemeral: it is rebuilt on every compile pass and never cached
//! on its own.

use assetgraph_core::{
    Blocks, ColumnInfo, ColumnSource, Diagnostic, DiagnosticCode, LimitsConfig, Location,
    SchemaInfo, TestDefinition,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::definition::AssetDefinition;
use crate::extractor::{LexicalExtractor, ReferenceExtractor};

/// Normalized asset with statically extracted references
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Asset identifier
    pub id: String,

    /// Definition file
    pub path: PathBuf,

    /// Free-text description, empty if not declared
    pub description: String,

    /// Canonical blocks
    pub blocks: Blocks,

    /// Columns referenced by the transform, capped
    pub columns_referenced: Vec<String>,

    /// Upstream asset ids referenced by the transform
    pub dependencies: BTreeSet<String>,

    /// Exposed schema (declared or inferred, possibly truncated)
    pub schema: SchemaInfo,

    /// Declared tests
    pub tests: Vec<TestDefinition>,

    /// Fingerprint of the definition file
    pub content_hash: String,

    /// Non-fatal findings for this asset
    pub warnings: Vec<Diagnostic>,
}

/// Builds an `Ast` from a parsed definition
pub struct AstGenerator {
    extractor: Box<dyn ReferenceExtractor>,
    limits: LimitsConfig,
}

impl AstGenerator {
    /// Create a generator using the lexical reference extractor
    pub fn new(limits: LimitsConfig) -> Self {
        Self::with_extractor(Box::new(LexicalExtractor::new()), limits)
    }

    /// Create a generator with a custom reference extractor
    pub fn with_extractor(extractor: Box<dyn ReferenceExtractor>, limits: LimitsConfig) -> Self {
        Self { extractor, limits }
    }

    /// Normalize a definition and extract its references.
    ///
    /// Never fails: extraction problems become warnings on the AST.
    pub fn generate(&self, definition: AssetDefinition) -> Ast {
        let AssetDefinition {
            id,
            path,
            description,
            blocks,
            content_hash,
        } = definition;
        let location = Location::new(path.display().to_string());
        tracing::debug!(asset = %id, path = %location, blocks = ?blocks.declared(), "generating ast");

        let extraction = self.extractor.extract(&blocks.transform.sql);
        let mut warnings = extraction.warnings;

        let mut columns_referenced = extraction.columns;
        columns_referenced.truncate(self.limits.max_inferred_columns);

        let schema = if !blocks.ingest.columns.is_empty() {
            SchemaInfo::from_columns(
                blocks.ingest.columns.clone(),
                ColumnSource::Declared,
                self.limits.max_schema_columns,
            )
        } else if !columns_referenced.is_empty() {
            let inferred = columns_referenced.iter().map(ColumnInfo::untyped).collect();
            SchemaInfo::from_columns(inferred, ColumnSource::Inferred, self.limits.max_schema_columns)
        } else {
            if !blocks.transform.sql.trim().is_empty() {
                warnings.push(Diagnostic::warn(
                    DiagnosticCode::ColumnsNotInferred,
                    "no columns declared in ingest and none could be inferred from transform",
                ));
            }
            SchemaInfo::empty()
        };

        if schema.truncated {
            warnings.push(Diagnostic::warn(
                DiagnosticCode::SchemaTruncated,
                format!(
                    "schema truncated to {} of {} columns",
                    schema.columns.len(),
                    schema.total_columns
                ),
            ));
        }

        let warnings: Vec<Diagnostic> = warnings
            .into_iter()
            .map(|w| w.with_asset(id.clone()).with_location(location.clone()))
            .collect();
        for warning in &warnings {
            tracing::warn!(asset = %id, "{}", warning);
        }

        let tests = blocks.tests.clone();

        Ast {
            id,
            path,
            description: description.unwrap_or_default(),
            blocks,
            columns_referenced,
            dependencies: extraction.dependencies,
            schema,
            tests,
            content_hash,
            warnings,
        }
    }
}

impl Default for AstGenerator {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}
