//! Measure recall of window queries against exact brute-force search.
//!
//! Run with: cargo run --example measure_recall --release
//!
//! Set `RUST_LOG=landmark_index=debug` to watch windows expand.

use landmark_index::{
    ClusterSpec, Dataset, DistanceMetric, EngineConfig, IngestItem, MetricRegistry, SpatialEngine,
};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("landmark_index=info")),
        )
        .init();

    println!("Generating dataset...");
    let mut dataset = Dataset::generate_clustered(ClusterSpec {
        clusters: 1_000,
        per_cluster: 10,
        queries: 200,
        dim: 128,
        spread: 0.001,
        seed: 42,
    });

    println!("Computing ground truth by brute force...");
    dataset.compute_ground_truth(100, Arc::new(DistanceMetric::Euclidean));

    println!("Selecting landmarks and building the engine...");
    let engine = SpatialEngine::from_sample(
        EngineConfig::new(128).with_precision_bits(8),
        Arc::new(MetricRegistry::with_builtins()),
        &dataset.vectors,
        3,
    )
    .expect("engine construction");

    let items: Vec<IngestItem> = dataset
        .vectors
        .iter()
        .map(|v| IngestItem::new(v.data.to_vec(), "embedding", v.id.to_string()))
        .collect();
    let start = Instant::now();
    let failed = engine.ingest_batch(&items).iter().filter(|r| r.is_err()).count();
    println!(
        "Ingested {} vectors in {:.1} ms ({} failed)\n",
        engine.len(),
        start.elapsed().as_secs_f64() * 1000.0,
        failed
    );
    println!("{}\n", engine.statistics().summary());

    println!("Measuring recall...\n");
    for k in [1, 10, 50, 100] {
        let start = Instant::now();
        let outcomes = engine
            .batch_query(&dataset.queries, k, "euclidean", 0)
            .expect("batch query");
        let elapsed = start.elapsed();

        // Ingest ran in parallel, so map engine ids back to dataset ids.
        let predicted: Vec<Vec<u64>> = outcomes
            .iter()
            .map(|o| {
                o.results
                    .iter()
                    .filter_map(|r| engine.get_vector(r.id))
                    .filter_map(|record| record.external_id().parse().ok())
                    .collect()
            })
            .collect();
        let partial = outcomes.iter().filter(|o| o.is_partial()).count();

        println!(
            "Recall@{:<3} {:6.2}%   {:8.1} queries/s   {} partial",
            k,
            dataset.mean_recall(&predicted, k) * 100.0,
            dataset.queries.len() as f64 / elapsed.as_secs_f64(),
            partial
        );
    }

    let locality = engine
        .measure_locality_preservation(5_000)
        .expect("locality measurement");
    println!("\nLocality preservation: {locality:.3}");
}
