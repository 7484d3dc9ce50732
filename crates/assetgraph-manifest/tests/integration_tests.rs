//! Integration tests for cache-backed project compilation

use assetgraph_cache::{ArtifactKind, CacheStatus};
use assetgraph_core::LimitsConfig;
use assetgraph_graph::ResolveError;
use assetgraph_manifest::discovery::absolute_path;
use assetgraph_manifest::{CompileError, Project};
use assetgraph_parser::{AstGenerator, Extraction, LexicalExtractor, ReferenceExtractor};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = absolute_path(root, relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project_with(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, content) in files {
        write(dir.path(), relative, content);
    }
    dir
}

fn chain() -> TempDir {
    project_with(&[
        ("a.asset", "id: a\ningest:\n  columns: [id, value]\n"),
        ("b.asset", "id: b\ntransform: SELECT id, value FROM {{ ref('a') }}\n"),
        ("c.asset", "id: c\ntransform: SELECT id FROM {{ ref('b') }}\n"),
    ])
}

/// Lexical extraction that counts how many assets went through AST generation
#[derive(Default)]
struct CountingExtractor {
    calls: Arc<AtomicUsize>,
}

impl ReferenceExtractor for CountingExtractor {
    fn extract(&self, transform: &str) -> Extraction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LexicalExtractor.extract(transform)
    }
}

fn counted_project(dir: &TempDir) -> (Project, Arc<AtomicUsize>) {
    let extractor = CountingExtractor::default();
    let calls = Arc::clone(&extractor.calls);
    let ast_generator = AstGenerator::with_extractor(Box::new(extractor), LimitsConfig::default());
    (Project::open(dir.path()).unwrap().with_ast_generator(ast_generator), calls)
}

/// Cached payload with the volatile envelope fields removed
fn cached_payload(dir: &TempDir, kind: ArtifactKind) -> serde_json::Value {
    let path = dir.path().join(".assetgraph").join(kind.file_name());
    let entry: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    entry["payload"].clone()
}

#[test]
fn test_chain_builds_in_dependency_order() {
    let dir = chain();
    let outcome = Project::open(dir.path()).unwrap().compile(false).unwrap();

    assert_eq!(outcome.artifacts.manifest.project.build_order, vec!["a", "b", "c"]);
    assert_eq!(outcome.artifacts.manifest.project.name, dir.path().canonicalize().unwrap().file_name().unwrap().to_string_lossy());
}

#[test]
fn test_cycle_reports_path_and_writes_nothing() {
    let dir = project_with(&[
        ("a.asset", "id: a\ntransform: SELECT x FROM {{ ref('b') }}\n"),
        ("b.asset", "id: b\ntransform: SELECT x FROM {{ ref('a') }}\n"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    match project.compile(false) {
        Err(CompileError::Resolve(ResolveError::CyclicDependency { path })) => {
            assert_eq!(path, vec!["a", "b", "a"]);
        }
        other => panic!("expected cycle, got {:?}", other.map(|o| o.cache_hit)),
    }
    assert!(!dir.path().join(".assetgraph").exists());
}

#[test]
fn test_external_leaf_is_recorded_upstream_without_dependencies() {
    let dir = project_with(&[("x.asset", "id: x\ntransform: SELECT y FROM {{ ref('upstream_y') }}\n")]);
    let artifacts = Project::open(dir.path()).unwrap().compile(false).unwrap().artifacts;

    let x = artifacts.manifest.get("x").unwrap();
    assert_eq!(x.lineage.upstream, vec!["upstream_y"]);
    assert_eq!(artifacts.lineage.external_sources, vec!["upstream_y"]);
    assert_eq!(artifacts.manifest.project.build_order, vec!["x"]);

    assert!(artifacts.lineage.edges.iter().all(|edge| edge.to != "upstream_y"));

    let graph = artifacts.graph();
    assert!(graph.upstream("upstream_y").is_empty());
    assert_eq!(graph.downstream("upstream_y"), vec!["x"]);
}

#[test]
fn test_unchanged_files_hit_cache_without_parsing() {
    let dir = chain();
    let (project, calls) = counted_project(&dir);

    let first = project.compile(false).unwrap();
    assert!(!first.cache_hit);
    assert_eq!(first.assets_parsed, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let second = project.compile(false).unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.assets_parsed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(first.artifacts, second.artifacts);

    // A fresh handle on the same root sees the same cache
    let (reopened, reopened_calls) = counted_project(&dir);
    assert!(reopened.compile(false).unwrap().cache_hit);
    assert!(reopened.load_manifest().unwrap().is_some());
    assert_eq!(reopened_calls.load(Ordering::SeqCst), 0);

    // Any change sends every asset back through generation
    write(dir.path(), "a.asset", "id: a\ningest:\n  columns: [id]\n");
    assert!(!reopened.compile(false).unwrap().cache_hit);
    assert_eq!(reopened_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_wide_ingest_schema_is_truncated() {
    let columns: Vec<String> = (0..60).map(|i| format!("col_{}", i)).collect();
    let content = format!("id: wide\ningest:\n  columns: [{}]\n", columns.join(", "));
    let dir = project_with(&[("wide.asset", &content)]);

    let artifacts = Project::open(dir.path()).unwrap().compile(false).unwrap().artifacts;
    let schema = &artifacts.schemas.schemas["wide"];

    assert_eq!(schema.columns.len(), 50);
    assert!(schema.truncated);
    assert_eq!(schema.total_columns, 60);
    assert_eq!(artifacts.manifest.warnings().count(), 1);
}

#[test]
fn test_repeated_generation_is_identical() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();

    let first = project.compile(true).unwrap();
    let manifest_before = cached_payload(&dir, ArtifactKind::Manifest);
    let lineage_before = cached_payload(&dir, ArtifactKind::Lineage);

    let second = project.compile(true).unwrap();
    assert!(!second.cache_hit);
    assert_eq!(
        serde_json::to_string(&first.artifacts.manifest).unwrap(),
        serde_json::to_string(&second.artifacts.manifest).unwrap()
    );
    assert_eq!(manifest_before, cached_payload(&dir, ArtifactKind::Manifest));
    assert_eq!(lineage_before, cached_payload(&dir, ArtifactKind::Lineage));
}

#[test]
fn test_modifying_one_asset_invalidates_every_artifact() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();
    let before = project.compile(false).unwrap().artifacts.manifest;

    write(dir.path(), "c.asset", "id: c\ndescription: changed\ntransform: SELECT id FROM {{ ref('b') }}\n");

    assert!(project.load_manifest().unwrap().is_none());
    assert!(project.load_lineage().unwrap().is_none());
    assert!(project.load_schemas().unwrap().is_none());
    assert!(project.load_tests().unwrap().is_none());
    for (_, status) in project.cache_status().unwrap() {
        assert_eq!(status, CacheStatus::Stale);
    }

    let outcome = project.compile(false).unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(outcome.assets_parsed, 3);

    let after = outcome.artifacts.manifest;
    for id in ["a", "b"] {
        assert_eq!(before.get(id).unwrap().content_hash, after.get(id).unwrap().content_hash);
    }
    assert_ne!(before.get("c").unwrap().content_hash, after.get("c").unwrap().content_hash);
}

#[test]
fn test_adding_or_removing_assets_invalidates_cache() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();
    project.compile(false).unwrap();

    write(dir.path(), "d.asset", "id: d\n");
    assert!(project.load_manifest().unwrap().is_none());
    let added = project.compile(false).unwrap();
    assert_eq!(added.artifacts.manifest.project.asset_count, 4);

    std::fs::remove_file(dir.path().join("d.asset")).unwrap();
    assert!(project.load_manifest().unwrap().is_none());
    let removed = project.compile(false).unwrap();
    assert!(!removed.cache_hit);
    assert_eq!(removed.artifacts.manifest.project.asset_count, 3);
}

#[test]
fn test_failed_pass_leaves_previous_cache_untouched() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();
    project.compile(false).unwrap();
    let cached = cached_payload(&dir, ArtifactKind::Manifest);

    let original = std::fs::read_to_string(dir.path().join("b.asset")).unwrap();
    write(dir.path(), "b.asset", "transform: SELECT 1\n");

    let err = project.compile(false).unwrap_err();
    assert!(matches!(err, CompileError::Definition(_)));
    assert!(err.to_string().contains("b.asset"));
    assert_eq!(cached, cached_payload(&dir, ArtifactKind::Manifest));

    // Restoring the file makes the old cache valid again
    write(dir.path(), "b.asset", &original);
    let outcome = project.compile(false).unwrap();
    assert!(outcome.cache_hit);
}

#[test]
fn test_corrupt_cache_is_regenerated() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();
    project.compile(false).unwrap();

    std::fs::write(dir.path().join(".assetgraph/lineage.json"), b"\0\0 not json").unwrap();
    assert!(project.load_lineage().unwrap().is_none());
    assert!(project.load_manifest().unwrap().is_some());

    let outcome = project.compile(false).unwrap();
    assert!(!outcome.cache_hit);
    assert_eq!(outcome.artifacts.lineage.edges.len(), 2);
    assert!(project.load_lineage().unwrap().is_some());
}

#[test]
fn test_loaders_miss_before_first_compile() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();

    assert!(project.load_manifest().unwrap().is_none());
    assert!(project.load_tests().unwrap().is_none());
    for (_, status) in project.cache_status().unwrap() {
        assert_eq!(status, CacheStatus::Missing);
    }
}

#[test]
fn test_force_bypasses_cache() {
    let dir = chain();
    let project = Project::open(dir.path()).unwrap();
    project.compile(false).unwrap();

    let forced = project.compile(true).unwrap();
    assert!(!forced.cache_hit);
    assert_eq!(forced.assets_parsed, 3);
    assert_eq!(project.cache().clear().unwrap(), 4);
    assert!(project.load_manifest().unwrap().is_none());
}

#[test]
fn test_custom_cache_dir_from_config() {
    let dir = project_with(&[
        ("a.asset", "id: a\n"),
        ("assetgraph.toml", "[project]\nname = \"demo\"\ncache_dir = \"build/meta\"\n"),
    ]);
    let project = Project::open(dir.path()).unwrap();
    let outcome = project.compile(false).unwrap();

    assert_eq!(outcome.artifacts.manifest.project.name, "demo");
    assert!(dir.path().join("build/meta/manifest.json").exists());
    assert!(project.compile(false).unwrap().cache_hit);
}
