//! landmark-index: nearest-neighbour search through landmark projection and
//! a Hilbert-curve index.
//!
//! A high-dimensional vector is projected to a small coordinate, its tuple
//! of distances to a versioned set of landmark vectors. The coordinate is
//! snapped to a grid and linearized with a Hilbert curve into a sortable
//! key, and the keys live in an ordered index. A query projects the same
//! way, scans a window of keys around its own, and reranks the candidates by
//! exact distance in the original space.
//!
//! # Features
//!
//! - **Metric registry**: Euclidean, Cosine, Manhattan, Chebyshev, Minkowski,
//!   Hamming, Jaccard and Canberra built in; custom metrics by closure
//! - **Landmark selection**: farthest-point traversal and range calibration
//! - **N-dimensional Hilbert curve** with an exact inverse
//! - **Lock-free scans** over a sorted-run index that accepts concurrent inserts
//! - **Content deduplication** by SHA-256 fingerprint with reference counts
//! - **Versioned reindexing** with an atomically swapped current version
//! - **Parallel ingestion, reranking and batch queries** with Rayon
//!
//! # Example
//!
//! ```
//! use landmark_index::{EngineConfig, LandmarkSet, MetricRegistry, SpatialEngine};
//! use std::sync::Arc;
//!
//! let landmarks = LandmarkSet::orthonormal_basis(3, 4, "euclidean").unwrap();
//! let engine = SpatialEngine::new(
//!     EngineConfig::new(4),
//!     Arc::new(MetricRegistry::with_builtins()),
//!     landmarks,
//! )
//! .unwrap();
//!
//! let id = engine.ingest(&[1.0, 0.0, 0.0, 0.0], "text", "doc-1").unwrap();
//! engine.ingest(&[0.0, 1.0, 0.0, 0.0], "text", "doc-2").unwrap();
//!
//! let outcome = engine.query(&[1.0, 0.0, 0.0, 0.0], 1, "euclidean", 100).unwrap();
//! assert_eq!(outcome.results[0].id, id);
//! assert_eq!(outcome.results[0].distance, 0.0);
//! ```

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod curve;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod landmark;
pub mod metrics;
pub mod projection;
pub mod query;
pub mod store;
pub mod types;
pub mod vector;

// Re-export commonly used types at crate root
pub use aggregate::{aggregate, aggregate_parallel, Aggregate, AxisRange, Correlation};
pub use config::{EngineConfig, IngestConfig, QueryConfig, StoreConfig};
pub use curve::{CellCenter, CurveIndexer, GridPoint};
pub use dataset::{recall_at_k, ClusterSpec, Dataset};
pub use distance::{check_contract, DistanceMetric, Metric, MetricRegistry, ResolvedMetric};
pub use engine::SpatialEngine;
pub use error::{IndexError, Result};
pub use index::{BruteForceIndex, IndexVersion, VersionCatalog};
pub use ingest::{IngestItem, IngestionGate};
pub use landmark::{AffineTransform, LandmarkSet};
pub use metrics::{HealthStatus, IndexStatistics, SearchStatistics};
pub use projection::{project, Coordinate, ProjectedPoint};
pub use query::{
    CancellationToken, PartialResultWarning, QueryEngine, QueryOutcome, QueryRequest, QueryResult,
    QueryState,
};
pub use store::{IndexEntry, SortedRunStore, SpatialStore, VectorStore};
pub use types::{CurveKey, Fingerprint, LandmarkVersion, VectorId};
pub use vector::{fingerprint, Vector, VectorRecord};
