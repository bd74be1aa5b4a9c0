//! End-to-end behaviour of the spatial engine: ingestion, deduplication,
//! queries, reindexing and safe mode.
//!
//! Run with: cargo test

use landmark_index::{
    CancellationToken, CurveKey, EngineConfig, IndexError, IngestConfig, IngestItem, LandmarkSet,
    LandmarkVersion, MetricRegistry, PartialResultWarning, SortedRunStore, SpatialEngine,
    SpatialStore, StoreConfig, VectorId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn basis_engine() -> SpatialEngine {
    SpatialEngine::new(
        EngineConfig::new(4),
        Arc::new(MetricRegistry::with_builtins()),
        LandmarkSet::orthonormal_basis(3, 4, "euclidean").unwrap(),
    )
    .unwrap()
}

#[test]
fn test_exact_match_is_found_first() {
    let engine = basis_engine();
    let first = engine.ingest(&[1.0, 0.0, 0.0, 0.0], "text", "a").unwrap();
    let second = engine.ingest(&[0.0, 1.0, 0.0, 0.0], "text", "b").unwrap();
    let third = engine.ingest(&[0.0, 0.0, 1.0, 0.0], "text", "c").unwrap();
    assert_eq!(engine.len(), 3);
    assert!(first != second && second != third);

    let outcome = engine.query(&[1.0, 0.0, 0.0, 0.0], 1, "euclidean", 100).unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].id, first);
    assert_eq!(outcome.results[0].distance, 0.0);
    assert_eq!(outcome.results[0].rank, 1);
    assert_eq!(outcome.version, LandmarkVersion(1));
}

#[test]
fn test_results_are_ranked_by_distance() {
    let engine = basis_engine();
    for v in [
        [1.0, 0.0, 0.0, 0.0],
        [0.9, 0.1, 0.0, 0.0],
        [0.5, 0.5, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ] {
        engine.ingest(&v, "text", "").unwrap();
    }

    let outcome = engine.query(&[1.0, 0.0, 0.0, 0.0], 4, "euclidean", 0).unwrap();
    for (i, result) in outcome.results.iter().enumerate() {
        assert_eq!(result.rank, i + 1);
    }
    assert!(outcome
        .results
        .windows(2)
        .all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_concurrent_identical_ingest_is_deduplicated() {
    let engine = basis_engine();
    let vector = [0.25, 0.5, 0.75, 1.0];

    let ids: Vec<VectorId> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    (0..100)
                        .map(|_| engine.ingest(&vector, "image", "dup").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect()
    });

    assert_eq!(ids.len(), 200);
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.get_vector(ids[0]).unwrap().ref_count(), 200);
    assert_eq!(engine.current().store().len(), 1);

    let stats = engine.statistics();
    assert_eq!(stats.total_references, 200);
    assert_eq!(stats.index_entries, 1);
}

#[test]
fn test_modality_separates_identical_payloads() {
    let engine = basis_engine();
    let vector = [0.1, 0.2, 0.3, 0.4];
    let text = engine.ingest(&vector, "text", "t").unwrap();
    let audio = engine.ingest(&vector, "audio", "a").unwrap();
    assert_ne!(text, audio);
    assert_eq!(engine.len(), 2);
    assert_eq!(engine.get_raw(text).unwrap(), engine.get_raw(audio).unwrap());
}

#[test]
fn test_unknown_metric_leaves_index_untouched() {
    let engine = basis_engine();
    engine.ingest(&[1.0, 0.0, 0.0, 0.0], "text", "a").unwrap();
    let before = engine.statistics();

    let err = engine
        .query(&[1.0, 0.0, 0.0, 0.0], 1, "mahalanobis", 100)
        .unwrap_err();
    assert!(matches!(err, IndexError::UnknownMetric(ref name) if name == "mahalanobis"));

    let after = engine.statistics();
    assert_eq!(before.num_vectors, after.num_vectors);
    assert_eq!(before.index_entries, after.index_entries);
    assert_eq!(before.version, after.version);
}

#[test]
fn test_invalid_vectors_are_rejected() {
    let engine = basis_engine();
    assert!(matches!(
        engine.ingest(&[1.0, 0.0, 0.0], "text", "short"),
        Err(IndexError::InvalidVector(_))
    ));
    assert!(matches!(
        engine.ingest(&[1.0, f32::NAN, 0.0, 0.0], "text", "nan"),
        Err(IndexError::InvalidVector(_))
    ));
    assert!(matches!(
        engine.query(&[1.0, 0.0], 1, "euclidean", 100),
        Err(IndexError::InvalidVector(_))
    ));
    assert!(engine.is_empty());
}

#[test]
fn test_batch_ingest_and_batch_query() {
    let engine = basis_engine();
    let items: Vec<IngestItem> = (0..50)
        .map(|i| {
            let x = i as f32 / 50.0;
            IngestItem::new(vec![x, 1.0 - x, x * x, 0.5], "text", format!("doc-{i}"))
        })
        .collect();
    let results = engine.ingest_batch(&items);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(engine.len(), 50);

    let queries: Vec<Vec<f32>> = items.iter().take(5).map(|item| item.vector.clone()).collect();
    let outcomes = engine.batch_query(&queries, 1, "euclidean", 0).unwrap();
    assert_eq!(outcomes.len(), 5);
    for (outcome, result) in outcomes.iter().zip(&results) {
        assert_eq!(outcome.results[0].id, *result.as_ref().unwrap());
        assert_eq!(outcome.results[0].distance, 0.0);
    }
}

#[test]
fn test_reindex_isolates_held_versions() {
    let engine = basis_engine();
    for v in [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]] {
        engine.ingest(&v, "text", "").unwrap();
    }

    let held = engine.current();
    let held_entries = held.store().entries();
    assert_eq!(held.version(), LandmarkVersion(1));

    let landmarks = LandmarkSet::new(
        vec![
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0],
        ],
        "manhattan",
    )
    .unwrap();
    let next = engine.reindex(landmarks).unwrap();
    assert_eq!(next, LandmarkVersion(2));
    assert_eq!(engine.current_version(), next);

    // The held version is untouched by the reindex.
    assert_eq!(held.version(), LandmarkVersion(1));
    assert_eq!(held.store().entries(), held_entries);

    let err = engine
        .query_pinned(LandmarkVersion(1), &[1.0, 0.0, 0.0, 0.0], 1, "euclidean", 100)
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::LandmarkVersionMismatch { requested, current }
            if requested == LandmarkVersion(1) && current == LandmarkVersion(2)
    ));

    let outcome = engine
        .query_pinned(next, &[0.0, 1.0, 0.0, 0.0], 1, "euclidean", 100)
        .unwrap();
    assert_eq!(outcome.version, next);
    assert_eq!(outcome.results[0].distance, 0.0);

    // Retired versions are only collected once nothing holds them.
    assert_eq!(engine.collect_garbage(), 0);
    drop(held);
    assert_eq!(engine.collect_garbage(), 1);
    assert_eq!(engine.statistics().retired_versions, 0);
}

#[test]
fn test_ingest_during_reindex_indexes_each_record_once() {
    let engine = basis_engine();
    let landmark_sets = [
        vec![
            vec![1.0, 1.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0],
        ],
        vec![
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0, 1.0],
            vec![1.0, 0.0, 1.0, 0.0],
        ],
    ];
    let vector_for = |worker: usize, i: usize| {
        [
            worker as f32 * 0.5,
            i as f32 * 0.01,
            (i % 7) as f32 * 0.25,
            1.0,
        ]
    };
    let ingesting = AtomicUsize::new(4);

    let (ingested, versions_seen) = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let (engine, ingesting) = (&engine, &ingesting);
                s.spawn(move || {
                    let ids: Vec<(VectorId, [f32; 4])> = (0..200)
                        .map(|i| {
                            let vector = vector_for(worker, i);
                            (engine.ingest(&vector, "text", "").unwrap(), vector)
                        })
                        .collect();
                    ingesting.fetch_sub(1, Ordering::SeqCst);
                    ids
                })
            })
            .collect();

        let reader = s.spawn(|| {
            let mut seen = Vec::new();
            while ingesting.load(Ordering::SeqCst) > 0 {
                let outcome = engine.query(&[0.5, 0.5, 0.5, 1.0], 5, "euclidean", 0).unwrap();
                assert_eq!(outcome.stats.version, outcome.version);
                seen.push(outcome.version);
            }
            seen
        });

        let mut round = 0;
        while round < 2 || ingesting.load(Ordering::SeqCst) > 0 {
            let landmarks = LandmarkSet::new(landmark_sets[round % 2].clone(), "euclidean").unwrap();
            engine.reindex(landmarks).unwrap();
            round += 1;
        }

        let ingested: Vec<(VectorId, [f32; 4])> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        (ingested, reader.join().unwrap())
    });

    // A reader never steps back to an older version.
    assert!(versions_seen.windows(2).all(|w| w[0] <= w[1]));

    assert_eq!(ingested.len(), 800);
    assert_eq!(engine.len(), 800);
    let current = engine.current();
    let entries = current.store().entries();
    assert_eq!(entries.len(), 800);
    let unique: HashSet<VectorId> = entries.iter().map(|e| e.id).collect();
    assert_eq!(unique.len(), 800);

    for (id, vector) in &ingested {
        let key = current.store().key_of(*id);
        assert_eq!(key, Some(current.key_for(vector).unwrap()), "record {id} under {}", current.version());
    }
    engine.verify_integrity().unwrap();
}

#[test]
fn test_cancelled_query_returns_partial_result() {
    let engine = basis_engine();
    engine.ingest(&[1.0, 0.0, 0.0, 0.0], "text", "a").unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let outcome = engine
        .query_with_cancel(&[1.0, 0.0, 0.0, 0.0], 1, "euclidean", 0, &token)
        .unwrap();
    assert!(outcome.is_partial());
    assert_eq!(outcome.warning, Some(PartialResultWarning::Cancelled { found: 0 }));
    assert!(outcome.results.is_empty());

    let live = CancellationToken::new();
    let outcome = engine
        .query_with_cancel(&[1.0, 0.0, 0.0, 0.0], 1, "euclidean", 0, &live)
        .unwrap();
    assert!(!matches!(outcome.warning, Some(PartialResultWarning::Cancelled { .. })));
    assert_eq!(outcome.results.len(), 1);
}

#[test]
fn test_index_corruption_enters_safe_mode() {
    let store = SortedRunStore::new(
        LandmarkVersion(3),
        &StoreConfig::default(),
        &IngestConfig::default(),
    );
    assert!(store.insert(CurveKey(10), VectorId(1)).unwrap());
    // Same entry again is a no-op, not corruption.
    assert!(!store.insert(CurveKey(10), VectorId(1)).unwrap());

    let err = store.insert(CurveKey(99), VectorId(1)).unwrap_err();
    assert!(matches!(
        err,
        IndexError::IndexCorruption { version, .. } if version == LandmarkVersion(3)
    ));
    assert!(store.is_read_only());
    assert!(matches!(
        store.insert(CurveKey(20), VectorId(2)),
        Err(IndexError::ReadOnly(_))
    ));

    // Scans keep working in safe mode.
    let ids: Vec<VectorId> = store.range_scan(CurveKey(0), CurveKey(100)).map(|e| e.id).collect();
    assert_eq!(ids, vec![VectorId(1)]);
}

#[test]
fn test_health_reflects_read_only_mode() {
    let engine = basis_engine();
    engine.ingest(&[0.5, 0.5, 0.5, 0.5], "text", "").unwrap();
    engine.verify_integrity().unwrap();
    assert!(engine.health_check().is_healthy());

    engine.set_read_only(true);
    assert!(engine.health_check().is_warning());
    // Reads still work.
    let outcome = engine.query(&[0.5, 0.5, 0.5, 0.5], 1, "euclidean", 100).unwrap();
    assert_eq!(outcome.results[0].distance, 0.0);
    engine.set_read_only(false);
}

#[test]
fn test_config_from_toml_layers_over_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        dimension = 64
        precision_bits = 12
        projection_metric = "cosine"

        [query]
        base_radius = 128
        search_neighbor_cells = false
        "#,
    )
    .unwrap();
    assert_eq!(config.dimension, 64);
    assert_eq!(config.precision_bits, 12);
    assert_eq!(config.projection_metric, "cosine");
    assert_eq!(config.query.base_radius, 128);
    assert!(!config.query.search_neighbor_cells);
    assert_eq!(config.query.max_doublings, EngineConfig::default().query.max_doublings);

    let err = EngineConfig::from_toml_str("precision_bits = 50").unwrap_err();
    assert!(matches!(err, IndexError::InvalidParameter(_)));
    let err = EngineConfig::from_toml_str("dimension = \"wide\"").unwrap_err();
    assert!(matches!(err, IndexError::Config(_)));
}
