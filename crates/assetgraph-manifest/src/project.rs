//! Cache-backed project loader
//!
//! Consumers read artifacts through `load_*`, which return `None` when the
//! cached copy does not match the asset files on disk. `compile` regenerates
//! all four artifacts in one pass on a miss and stores them.

use assetgraph_cache::{ArtifactKind, CacheStatus, FingerprintSet, MetadataCache};
use assetgraph_core::Config;
use assetgraph_parser::AstGenerator;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::artifacts::{Artifacts, LineageArtifact, Manifest, SchemaIndex, TestIndex};
use crate::discovery::SourceSet;
use crate::error::CompileError;
use crate::generator::ManifestGenerator;

/// Outcome of `Project::compile`
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub artifacts: Artifacts,

    /// All artifacts came from the cache
    pub cache_hit: bool,

    /// Definition files parsed during this call (0 on a hit)
    pub assets_parsed: usize,

    /// Fingerprint set the artifacts correspond to
    pub fingerprints: FingerprintSet,
}

/// A project root with its configuration and metadata cache
pub struct Project {
    generator: ManifestGenerator,
    cache: MetadataCache,
}

impl Project {
    /// Open the project at `root`, reading `assetgraph.toml` if present
    pub fn open(root: &Path) -> Result<Self, CompileError> {
        Ok(Self::from_config(Config::for_project(root)?))
    }

    pub fn from_config(config: Config) -> Self {
        let cache = MetadataCache::new(config.cache_path());
        Self {
            generator: ManifestGenerator::new(config),
            cache,
        }
    }

    /// Replace the AST generator used when the cache misses
    pub fn with_ast_generator(mut self, ast_generator: AstGenerator) -> Self {
        self.generator = self.generator.with_ast_generator(ast_generator);
        self
    }

    pub fn config(&self) -> &Config {
        self.generator.config()
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn generator(&self) -> &ManifestGenerator {
        &self.generator
    }

    /// Fingerprints of the asset files currently on disk. Hashes only, no parsing.
    pub fn fingerprints(&self) -> Result<FingerprintSet, CompileError> {
        Ok(SourceSet::scan(self.config())?.fingerprints())
    }

    pub fn load_manifest(&self) -> Result<Option<Manifest>, CompileError> {
        self.load(ArtifactKind::Manifest)
    }

    pub fn load_lineage(&self) -> Result<Option<LineageArtifact>, CompileError> {
        self.load(ArtifactKind::Lineage)
    }

    pub fn load_schemas(&self) -> Result<Option<SchemaIndex>, CompileError> {
        self.load(ArtifactKind::Schemas)
    }

    pub fn load_tests(&self) -> Result<Option<TestIndex>, CompileError> {
        self.load(ArtifactKind::Tests)
    }

    /// Cache status of every artifact against the files on disk
    pub fn cache_status(&self) -> Result<Vec<(ArtifactKind, CacheStatus)>, CompileError> {
        let fingerprints = self.fingerprints()?;
        Ok(ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind, self.cache.status(kind, &fingerprints)))
            .collect())
    }

    /// Produce all artifacts, from the cache when possible.
    ///
    /// `force` skips the cache lookup. Artifacts are saved only after the whole
    /// pass succeeds; a failed pass leaves the previous cache untouched.
    pub fn compile(&self, force: bool) -> Result<CompileOutcome, CompileError> {
        let sources = SourceSet::scan(self.config())?;
        let fingerprints = sources.fingerprints();

        if !force {
            if let Some(artifacts) = self.load_all(&fingerprints) {
                tracing::info!(assets = artifacts.manifest.project.asset_count, "artifacts loaded from cache");
                return Ok(CompileOutcome {
                    artifacts,
                    cache_hit: true,
                    assets_parsed: 0,
                    fingerprints,
                });
            }
        }

        let compiled = self.generator.compile_sources(&sources)?;
        let artifacts = compiled.artifacts();
        self.store(&artifacts, &fingerprints);

        Ok(CompileOutcome {
            artifacts,
            cache_hit: false,
            assets_parsed: sources.len(),
            fingerprints,
        })
    }

    fn load<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<Option<T>, CompileError> {
        let fingerprints = self.fingerprints()?;
        Ok(self.cache.load(kind, &fingerprints))
    }

    fn load_all(&self, fingerprints: &FingerprintSet) -> Option<Artifacts> {
        Some(Artifacts {
            manifest: self.cache.load(ArtifactKind::Manifest, fingerprints)?,
            lineage: self.cache.load(ArtifactKind::Lineage, fingerprints)?,
            schemas: self.cache.load(ArtifactKind::Schemas, fingerprints)?,
            tests: self.cache.load(ArtifactKind::Tests, fingerprints)?,
        })
    }

    /// Save every artifact. Failures are logged; the artifacts are still valid.
    fn store(&self, artifacts: &Artifacts, fingerprints: &FingerprintSet) {
        self.save(ArtifactKind::Manifest, &artifacts.manifest, fingerprints);
        self.save(ArtifactKind::Lineage, &artifacts.lineage, fingerprints);
        self.save(ArtifactKind::Schemas, &artifacts.schemas, fingerprints);
        self.save(ArtifactKind::Tests, &artifacts.tests, fingerprints);
    }

    fn save<T: Serialize>(&self, kind: ArtifactKind, payload: &T, fingerprints: &FingerprintSet) {
        if let Err(e) = self.cache.save(kind, payload, fingerprints) {
            tracing::warn!(%kind, "failed to write cache: {}", e);
        }
    }
}
