//! Compile pass: parse every asset, resolve once, project artifacts
//!
//! Parsing and AST generation are per-file and run on a rayon pool. The
//! resolve step needs the complete AST set and runs after the pool finishes.

use assetgraph_cache::FingerprintSet;
use assetgraph_core::Config;
use assetgraph_graph::{DependencyResolver, Resolution, ResolverOptions};
use assetgraph_parser::{Ast, AstGenerator, DefinitionError, DefinitionParser};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

use crate::artifacts::{
    AssetLineage, AssetRecord, AssetTests, Artifacts, LineageArtifact, Manifest, ProjectInfo,
    SchemaIndex, TestIndex,
};
use crate::discovery::{SourceFile, SourceSet};
use crate::error::CompileError;

/// Result of one successful compile pass
#[derive(Debug, Clone)]
pub struct CompiledProject {
    project_name: String,
    asts: BTreeMap<String, Ast>,
    resolution: Resolution,
    fingerprints: FingerprintSet,
}

impl CompiledProject {
    /// Fingerprint set of the files this pass compiled
    pub fn fingerprints(&self) -> &FingerprintSet {
        &self.fingerprints
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn asset_count(&self) -> usize {
        self.asts.len()
    }

    /// Consolidated manifest, assets in build order
    pub fn manifest(&self) -> Manifest {
        let graph = &self.resolution.graph;
        let assets = self
            .resolution
            .order
            .iter()
            .filter_map(|id| self.asts.get(id))
            .map(|ast| AssetRecord {
                id: ast.id.clone(),
                path: ast.path.to_string_lossy().into_owned(),
                description: ast.description.clone(),
                blocks: ast.blocks.clone(),
                schema: ast.schema.clone(),
                tests: ast.tests.clone(),
                content_hash: ast.content_hash.clone(),
                columns_referenced: ast.columns_referenced.clone(),
                lineage: AssetLineage {
                    upstream: graph.upstream(&ast.id).into_iter().cloned().collect(),
                    downstream: graph.downstream(&ast.id).into_iter().cloned().collect(),
                },
                warnings: ast.warnings.clone(),
            })
            .collect();

        Manifest {
            project: ProjectInfo {
                name: self.project_name.clone(),
                asset_count: self.asts.len(),
                build_order: self.resolution.order.clone(),
            },
            assets,
        }
    }

    pub fn lineage(&self) -> LineageArtifact {
        LineageArtifact::from_graph(&self.resolution.graph)
    }

    pub fn schemas(&self) -> SchemaIndex {
        SchemaIndex {
            schemas: self
                .asts
                .iter()
                .map(|(id, ast)| (id.clone(), ast.schema.clone()))
                .collect(),
        }
    }

    pub fn tests_index(&self) -> TestIndex {
        TestIndex {
            tests: self
                .asts
                .iter()
                .map(|(id, ast)| {
                    let entry = AssetTests {
                        tests: ast.tests.clone(),
                        count: ast.tests.len(),
                    };
                    (id.clone(), entry)
                })
                .collect(),
        }
    }

    pub fn artifacts(&self) -> Artifacts {
        Artifacts {
            manifest: self.manifest(),
            lineage: self.lineage(),
            schemas: self.schemas(),
            tests: self.tests_index(),
        }
    }
}

/// Compiles all assets under a project root
pub struct ManifestGenerator {
    config: Config,
    ast_generator: AstGenerator,
}

impl ManifestGenerator {
    pub fn new(config: Config) -> Self {
        let ast_generator = AstGenerator::new(config.limits.clone());
        Self {
            config,
            ast_generator,
        }
    }

    /// Generator for the project at `root`, configured from its `assetgraph.toml`
    pub fn for_project(root: &Path) -> Result<Self, CompileError> {
        Ok(Self::new(Config::for_project(root)?))
    }

    /// Replace the AST generator (e.g. to use a different reference extractor)
    pub fn with_ast_generator(mut self, ast_generator: AstGenerator) -> Self {
        self.ast_generator = ast_generator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover and compile every asset
    pub fn compile(&self) -> Result<CompiledProject, CompileError> {
        let sources = SourceSet::scan(&self.config)?;
        self.compile_sources(&sources)
    }

    /// Compile an already scanned file set.
    ///
    /// Fails on the first definition error in path order, a duplicate id, or a
    /// resolve error. No partial result is returned.
    pub fn compile_sources(&self, sources: &SourceSet) -> Result<CompiledProject, CompileError> {
        let results = self.generate_asts(sources.files());

        let mut asts: BTreeMap<String, Ast> = BTreeMap::new();
        for result in results {
            let ast = result?;
            if let Some(existing) = asts.get(&ast.id) {
                return Err(CompileError::DuplicateAsset {
                    id: ast.id.clone(),
                    first: existing.path.to_string_lossy().into_owned(),
                    second: ast.path.to_string_lossy().into_owned(),
                });
            }
            asts.insert(ast.id.clone(), ast);
        }

        let resolver = DependencyResolver::new(ResolverOptions {
            allow_external: self.config.lineage.allow_external,
        });
        let resolution = resolver.resolve_nodes(asts.values().map(|ast| (ast.id.as_str(), &ast.dependencies)))?;

        for diagnostic in &resolution.diagnostics {
            tracing::info!(asset = ?diagnostic.asset, "{}", diagnostic);
        }

        tracing::info!(
            project = %self.config.project.name,
            assets = asts.len(),
            external = resolution.graph.external_sources().count(),
            "compiled project"
        );

        Ok(CompiledProject {
            project_name: self.config.project.name.clone(),
            asts,
            resolution,
            fingerprints: sources.fingerprints(),
        })
    }

    pub fn generate_manifest(&self) -> Result<Manifest, CompileError> {
        Ok(self.compile()?.manifest())
    }

    pub fn generate_lineage(&self) -> Result<LineageArtifact, CompileError> {
        Ok(self.compile()?.lineage())
    }

    pub fn generate_schemas(&self) -> Result<SchemaIndex, CompileError> {
        Ok(self.compile()?.schemas())
    }

    pub fn generate_tests_index(&self) -> Result<TestIndex, CompileError> {
        Ok(self.compile()?.tests_index())
    }

    /// All four artifacts from a single pass
    pub fn generate_all(&self) -> Result<Artifacts, CompileError> {
        Ok(self.compile()?.artifacts())
    }

    /// Parse and normalize every file, preserving input order
    fn generate_asts(&self, files: &[SourceFile]) -> Vec<Result<Ast, DefinitionError>> {
        if files.is_empty() {
            return Vec::new();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.project.concurrency)
            .build();

        match pool {
            Ok(pool) => pool.install(|| files.par_iter().map(|file| self.generate_ast(file)).collect()),
            Err(e) => {
                tracing::warn!("worker pool unavailable, compiling sequentially: {}", e);
                files.iter().map(|file| self.generate_ast(file)).collect()
            }
        }
    }

    fn generate_ast(&self, file: &SourceFile) -> Result<Ast, DefinitionError> {
        let definition = DefinitionParser::parse_bytes(Path::new(&file.relative), &file.content)?;
        Ok(self.ast_generator.generate(definition))
    }
}
