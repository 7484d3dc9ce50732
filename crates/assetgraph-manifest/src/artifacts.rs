//! Derived artifacts produced by a compile pass
//!
//! All maps are BTreeMaps and all lists have a fixed order, so serializing the
//! same project twice yields identical bytes.

use assetgraph_core::{Blocks, Diagnostic, SchemaInfo, TestDefinition};
use assetgraph_graph::{DependencyEdge, LineageGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Project-level manifest metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub asset_count: usize,

    /// Asset ids, each after all of its upstream assets
    pub build_order: Vec<String>,
}

/// Immediate neighbours of one asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetLineage {
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

/// One asset as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,

    /// Definition path relative to the project root
    pub path: String,

    #[serde(default)]
    pub description: String,

    pub blocks: Blocks,
    pub schema: SchemaInfo,
    pub tests: Vec<TestDefinition>,
    pub content_hash: String,

    #[serde(default)]
    pub columns_referenced: Vec<String>,

    #[serde(default)]
    pub lineage: AssetLineage,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

/// Consolidated project manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub project: ProjectInfo,

    /// Assets in build order
    pub assets: Vec<AssetRecord>,
}

impl Manifest {
    /// Find an asset by id
    pub fn get(&self, id: &str) -> Option<&AssetRecord> {
        self.assets.iter().find(|asset| asset.id == id)
    }

    /// All non-fatal findings across assets
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.assets.iter().flat_map(|asset| asset.warnings.iter())
    }
}

/// Project-wide dependency edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageArtifact {
    /// Sorted by (from, to)
    pub edges: Vec<DependencyEdge>,

    /// Referenced ids with no definition in the project
    #[serde(default)]
    pub external_sources: Vec<String>,
}

impl LineageArtifact {
    pub fn from_graph(graph: &LineageGraph) -> Self {
        Self {
            edges: graph.edges().cloned().collect(),
            external_sources: graph.external_sources().cloned().collect(),
        }
    }

    /// Rebuild a queryable graph over `assets` from the stored edges
    pub fn to_graph<'a>(&self, assets: impl IntoIterator<Item = &'a String>) -> LineageGraph {
        LineageGraph::new(
            assets.into_iter().cloned().collect(),
            self.external_sources.iter().cloned().collect(),
            self.edges.iter().cloned().collect::<BTreeSet<_>>(),
        )
    }
}

/// Per-asset schemas keyed by asset id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaIndex {
    pub schemas: BTreeMap<String, SchemaInfo>,
}

/// Declared tests of one asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetTests {
    pub tests: Vec<TestDefinition>,
    pub count: usize,
}

/// Per-asset tests keyed by asset id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestIndex {
    pub tests: BTreeMap<String, AssetTests>,
}

impl TestIndex {
    /// Total tests across all assets
    pub fn total(&self) -> usize {
        self.tests.values().map(|entry| entry.count).sum()
    }
}

/// All four artifacts of one compile pass
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub manifest: Manifest,
    pub lineage: LineageArtifact,
    pub schemas: SchemaIndex,
    pub tests: TestIndex,
}

impl Artifacts {
    /// Queryable lineage graph over the manifest's assets
    pub fn graph(&self) -> LineageGraph {
        self.lineage.to_graph(&self.manifest.project.build_order)
    }
}
