//! Benchmarks for dependency resolution on large asset graphs
//!
//! These benchmarks measure resolve (edge construction, cycle detection and
//! ordering) on long chains and wide fan-in graphs, plus reference extraction
//! on large transforms.

use assetgraph_graph::DependencyResolver;
use assetgraph_parser::{LexicalExtractor, ReferenceExtractor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeSet;

/// Generate N assets where each depends on the previous 2
fn generate_chain(num_assets: usize) -> Vec<(String, BTreeSet<String>)> {
    (0..num_assets)
        .map(|i| {
            let deps = (i.saturating_sub(2)..i)
                .map(|j| format!("asset_{:05}", j))
                .collect();
            (format!("asset_{:05}", i), deps)
        })
        .collect()
}

/// Generate N leaves all feeding into one sink, plus one external source per leaf
fn generate_fan_in(num_assets: usize) -> Vec<(String, BTreeSet<String>)> {
    let mut assets: Vec<(String, BTreeSet<String>)> = (0..num_assets)
        .map(|i| {
            let deps = [format!("external_{}", i)].into_iter().collect();
            (format!("leaf_{:05}", i), deps)
        })
        .collect();
    let sink_deps = assets.iter().map(|(id, _)| id.clone()).collect();
    assets.push(("sink".to_string(), sink_deps));
    assets
}

/// Generate a transform with N projected columns and J joins
fn generate_transform(num_columns: usize, num_joins: usize) -> String {
    let columns: Vec<String> = (0..num_columns)
        .map(|i| format!("    t0.col_{} AS col_{}", i, i))
        .collect();
    let joins: Vec<String> = (1..=num_joins)
        .map(|i| format!("LEFT JOIN {{{{ ref('asset_{}') }}}} t{} ON t0.id = t{}.id", i, i, i))
        .collect();

    format!(
        "SELECT\n{}\nFROM {{{{ ref('asset_0') }}}} t0\n{}",
        columns.join(",\n"),
        joins.join("\n")
    )
}

/// Benchmark: resolve long chains (100, 1000, 5000 assets)
fn bench_resolve_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_chain");
    let resolver = DependencyResolver::default();

    for num_assets in [100, 1000, 5000].iter() {
        let assets = generate_chain(*num_assets);

        group.bench_with_input(BenchmarkId::from_parameter(num_assets), num_assets, |b, _| {
            b.iter(|| {
                black_box(
                    resolver
                        .resolve_nodes(assets.iter().map(|(id, deps)| (id.as_str(), deps)))
                        .map(|resolution| resolution.order.len()),
                )
            });
        });
    }

    group.finish();
}

/// Benchmark: resolve a wide fan-in with external leaves
fn bench_resolve_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_fan_in");
    let resolver = DependencyResolver::default();

    for num_assets in [100, 1000].iter() {
        let assets = generate_fan_in(*num_assets);

        group.bench_with_input(BenchmarkId::from_parameter(num_assets), num_assets, |b, _| {
            b.iter(|| {
                black_box(
                    resolver
                        .resolve_nodes(assets.iter().map(|(id, deps)| (id.as_str(), deps)))
                        .map(|resolution| resolution.graph.edge_count()),
                )
            });
        });
    }

    group.finish();
}

/// Benchmark: lexical extraction on large transforms
fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_extraction");
    let extractor = LexicalExtractor::new();

    for num_columns in [10, 50, 200].iter() {
        let transform = generate_transform(*num_columns, 5);

        group.bench_with_input(BenchmarkId::from_parameter(num_columns), num_columns, |b, _| {
            b.iter(|| black_box(extractor.extract(&transform)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_chain, bench_resolve_fan_in, bench_extraction);
criterion_main!(benches);
