//! Benchmarks for ingestion and window queries against brute force.
//!
//! Run with: cargo bench --bench query_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use landmark_index::{
    BruteForceIndex, ClusterSpec, Dataset, DistanceMetric, EngineConfig, IngestItem,
    MetricRegistry, SpatialEngine,
};
use std::sync::Arc;

fn clustered(clusters: usize) -> Dataset {
    Dataset::generate_clustered(ClusterSpec {
        clusters,
        per_cluster: 10,
        queries: 100,
        dim: 128,
        spread: 0.001,
        seed: 17,
    })
}

fn build_engine(dataset: &Dataset) -> SpatialEngine {
    let engine = SpatialEngine::from_sample(
        EngineConfig::new(128).with_precision_bits(8),
        Arc::new(MetricRegistry::with_builtins()),
        &dataset.vectors,
        3,
    )
    .unwrap();
    let items: Vec<IngestItem> = dataset
        .vectors
        .iter()
        .map(|v| IngestItem::new(v.data.to_vec(), "embedding", ""))
        .collect();
    engine.ingest_batch(&items);
    engine
}

/// Window query against an exhaustive scan across dataset sizes.
fn benchmark_query(c: &mut Criterion) {
    for clusters in [100, 1_000] {
        let dataset = clustered(clusters);
        let engine = build_engine(&dataset);

        let mut exact = BruteForceIndex::new(Arc::new(DistanceMetric::Euclidean));
        for vector in &dataset.vectors {
            exact.add(vector.clone());
        }

        let query = &dataset.queries[0];
        let mut group = c.benchmark_group(format!("query_{}", dataset.vectors.len()));
        group.throughput(Throughput::Elements(1));

        group.bench_function("window", |b| {
            b.iter(|| engine.query(black_box(&query.data), black_box(10), "euclidean", 0))
        });

        group.bench_function("brute_force", |b| {
            b.iter(|| exact.search(black_box(&query.data), black_box(10)))
        });

        group.finish();
    }
}

/// Batch query throughput.
fn benchmark_batch_query(c: &mut Criterion) {
    let dataset = clustered(1_000);
    let engine = build_engine(&dataset);

    let mut group = c.benchmark_group("batch_query");
    group.throughput(Throughput::Elements(dataset.queries.len() as u64));

    group.bench_function("batch_100_queries", |b| {
        b.iter(|| engine.batch_query(black_box(&dataset.queries), black_box(10), "euclidean", 0))
    });

    group.finish();
}

/// Ingestion throughput, sequential and batched.
fn benchmark_ingest(c: &mut Criterion) {
    let dataset = clustered(100);
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(dataset.vectors.len() as u64));
    group.sample_size(20);

    for batched in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("vectors", if batched { "batch" } else { "sequential" }),
            &batched,
            |b, &batched| {
                b.iter(|| {
                    let engine = SpatialEngine::from_sample(
                        EngineConfig::new(128).with_precision_bits(8),
                        Arc::new(MetricRegistry::with_builtins()),
                        &dataset.vectors,
                        3,
                    )
                    .unwrap();
                    if batched {
                        let items: Vec<IngestItem> = dataset
                            .vectors
                            .iter()
                            .map(|v| IngestItem::new(v.data.to_vec(), "embedding", ""))
                            .collect();
                        engine.ingest_batch(&items);
                    } else {
                        for v in &dataset.vectors {
                            let _ = engine.ingest(&v.data, "embedding", "");
                        }
                    }
                    engine
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_query, benchmark_batch_query, benchmark_ingest);
criterion_main!(benches);
