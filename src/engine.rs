//! `SpatialEngine`: the orchestrator.
//!
//! Owns the metric registry, the versioned index catalog, the ingestion gate
//! and the query engine, and is the only component that sequences a
//! reindex. Projection and the curve never reference each other; the engine
//! feeds one into the other.
//!
//! Reindexing drains ingestion through a readers-writer lock: every ingest
//! holds the read side for its duration, a reindex holds the write side
//! while it re-projects and swaps the current-version pointer. Queries take
//! no lock at all; they load the pointer once and keep their version alive.

use crate::aggregate::{aggregate_parallel, Correlation};
use crate::config::EngineConfig;
use crate::constants::diagnostics::LOCALITY_SAMPLE_SEED;
use crate::curve::CurveIndexer;
use crate::distance::{MetricRegistry, ResolvedMetric};
use crate::error::{IndexError, Result};
use crate::index::{IndexVersion, VersionCatalog};
use crate::ingest::{IngestItem, IngestionGate};
use crate::landmark::LandmarkSet;
use crate::metrics::{HealthStatus, IndexStatistics};
use crate::projection;
use crate::query::{CancellationToken, QueryEngine, QueryOutcome, QueryRequest};
use crate::store::{IndexEntry, SortedRunStore, SpatialStore, VectorStore};
use crate::types::{LandmarkVersion, VectorId};
use crate::vector::VectorRecord;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Projection, indexing and nearest-neighbour search over one vector space.
pub struct SpatialEngine {
    config: EngineConfig,
    registry: Arc<MetricRegistry>,
    catalog: VersionCatalog,
    gate: IngestionGate,
    queries: QueryEngine,
    reindex_lock: RwLock<()>,
}

impl SpatialEngine {
    /// Create an engine and activate `landmarks` as version 1.
    ///
    /// # Errors
    /// * [`IndexError::InvalidParameter`] for an invalid configuration, or
    ///   landmarks of the wrong dimensionality.
    /// * [`IndexError::UnknownMetric`] if the landmark set's metric is not
    ///   registered.
    pub fn new(config: EngineConfig, registry: Arc<MetricRegistry>, landmarks: LandmarkSet) -> Result<Self> {
        config.validate()?;
        let version = LandmarkVersion(1);
        let initial = assemble(&config, &registry, landmarks, version, Vec::new())?;
        info!(
            dimension = config.dimension,
            axes = initial.landmarks().axes(),
            precision_bits = config.precision_bits,
            metric = initial.metric().name(),
            %version,
            "spatial engine ready"
        );

        let vectors = Arc::new(VectorStore::new());
        Ok(Self {
            gate: IngestionGate::new(Arc::clone(&vectors), config.dimension),
            queries: QueryEngine::new(vectors, config.query.clone()),
            catalog: VersionCatalog::new(initial),
            registry,
            config,
            reindex_lock: RwLock::new(()),
        })
    }

    /// Create an engine whose landmarks are picked from `sample`.
    ///
    /// Selects `k` landmarks by farthest-point traversal under the configured
    /// projection metric, then calibrates their transform on the same sample.
    pub fn from_sample<S>(
        config: EngineConfig,
        registry: Arc<MetricRegistry>,
        sample: &[S],
        k: usize,
    ) -> Result<Self>
    where
        S: AsRef<[f32]> + Sync,
    {
        let metric = registry.resolve(&config.projection_metric)?;
        let landmarks =
            LandmarkSet::select_farthest_first(sample, k, &config.projection_metric, &registry)?
                .calibrate(sample, metric.as_ref())?;
        Self::new(config, registry, landmarks)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Number of the active landmark version.
    pub fn current_version(&self) -> LandmarkVersion {
        self.catalog.current_version()
    }

    /// The active version, held alive for as long as the `Arc` is.
    pub fn current(&self) -> Arc<IndexVersion> {
        self.catalog.current()
    }

    /// Ingest one vector.
    ///
    /// Returns the id of the stored vector: a new id for new content, the
    /// existing id for byte-identical content with the same modality.
    pub fn ingest(&self, raw: &[f32], modality: &str, external_id: &str) -> Result<VectorId> {
        let _ingesting = self.reindex_lock.read();
        let version = self.catalog.current();
        self.gate
            .ingest(&version, raw, modality, external_id)
            .map(|admission| admission.id())
    }

    /// Ingest many vectors in parallel. Results are in input order.
    pub fn ingest_batch(&self, items: &[IngestItem]) -> Vec<Result<VectorId>> {
        let _ingesting = self.reindex_lock.read();
        let version = self.catalog.current();
        let results = self.gate.ingest_batch(&version, items);
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(failed, total = items.len(), "batch ingestion had failures");
        }
        results
    }

    /// Top-`top_k` neighbours of `vector` under the active version.
    ///
    /// `metric_name` selects the rerank metric and is resolved before
    /// anything else, so an unknown name fails without touching the index.
    /// A `timeout_ms` of zero means no deadline.
    pub fn query(&self, vector: &[f32], top_k: usize, metric_name: &str, timeout_ms: u64) -> Result<QueryOutcome> {
        let metric = self.registry.resolve(metric_name)?;
        let version = self.catalog.current();
        self.run(&version, vector, top_k, &metric, timeout_ms, None)
    }

    /// Like [`SpatialEngine::query`], but only against `version`.
    ///
    /// # Errors
    /// Returns [`IndexError::LandmarkVersionMismatch`] if `version` is not the
    /// active version.
    pub fn query_pinned(
        &self,
        version: LandmarkVersion,
        vector: &[f32],
        top_k: usize,
        metric_name: &str,
        timeout_ms: u64,
    ) -> Result<QueryOutcome> {
        let metric = self.registry.resolve(metric_name)?;
        let pinned = self.catalog.pin(version)?;
        self.run(&pinned, vector, top_k, &metric, timeout_ms, None)
    }

    /// Like [`SpatialEngine::query`], stopping early once `token` is
    /// cancelled.
    pub fn query_with_cancel(
        &self,
        vector: &[f32],
        top_k: usize,
        metric_name: &str,
        timeout_ms: u64,
        token: &CancellationToken,
    ) -> Result<QueryOutcome> {
        let metric = self.registry.resolve(metric_name)?;
        let version = self.catalog.current();
        self.run(&version, vector, top_k, &metric, timeout_ms, Some(token))
    }

    /// Run several queries in parallel against one version.
    ///
    /// Fails as a whole if any single query fails.
    pub fn batch_query<V>(
        &self,
        vectors: &[V],
        top_k: usize,
        metric_name: &str,
        timeout_ms: u64,
    ) -> Result<Vec<QueryOutcome>>
    where
        V: AsRef<[f32]> + Sync,
    {
        let metric = self.registry.resolve(metric_name)?;
        let version = self.catalog.current();
        vectors
            .par_iter()
            .map(|v| self.run(&version, v.as_ref(), top_k, &metric, timeout_ms, None))
            .collect()
    }

    fn run(
        &self,
        version: &IndexVersion,
        vector: &[f32],
        top_k: usize,
        metric: &ResolvedMetric,
        timeout_ms: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<QueryOutcome> {
        let mut request = QueryRequest::new(vector, top_k, metric.as_ref());
        if timeout_ms > 0 {
            request = request.with_deadline(Instant::now() + Duration::from_millis(timeout_ms));
        }
        if let Some(token) = cancel {
            request = request.with_cancel(token);
        }
        self.queries.execute(version, request)
    }

    /// Re-project every stored vector under `landmarks` and activate the
    /// result as the next version.
    ///
    /// Ingestion waits while this runs. Queries keep running against the
    /// previous version until the pointer swap, and queries that loaded it
    /// before the swap finish on it.
    ///
    /// # Errors
    /// * [`IndexError::ReadOnly`] while the engine is read-only.
    /// * [`IndexError::InvalidParameter`] or [`IndexError::UnknownMetric`] for
    ///   an unusable landmark set; the active version is unchanged.
    pub fn reindex(&self, landmarks: LandmarkSet) -> Result<LandmarkVersion> {
        if self.gate.is_read_only() {
            return Err(IndexError::read_only("reindex rejected while read-only"));
        }
        let started = Instant::now();
        let _exclusive = self.reindex_lock.write();

        let next = self.catalog.current_version().next();
        let records = self.gate.vectors().records();
        let version = assemble(&self.config, &self.registry, landmarks, next, records)?;
        let entries = version.store().len();

        self.catalog.activate(version);
        info!(
            version = %next,
            entries,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reindex complete"
        );
        Ok(next)
    }

    /// Pearson correlation between original-space distance and
    /// `log2(1 + curve-key distance)` over `sample_size` random pairs of
    /// stored vectors.
    ///
    /// Positive values mean nearby vectors tend to get nearby keys. Pairs
    /// come from a fixed seed, so repeated calls on the same data agree.
    /// Returns `0.0` with fewer than two stored vectors.
    pub fn measure_locality_preservation(&self, sample_size: usize) -> Result<f64> {
        if sample_size == 0 {
            return Err(IndexError::invalid_parameter("sample_size must be at least 1"));
        }
        let version = self.catalog.current();
        let records = self.gate.vectors().records();
        if records.len() < 2 {
            return Ok(0.0);
        }

        let mut rng = StdRng::seed_from_u64(LOCALITY_SAMPLE_SEED);
        let picks: Vec<(usize, usize)> = (0..sample_size)
            .map(|_| {
                let a = rng.gen_range(0..records.len());
                let mut b = rng.gen_range(0..records.len() - 1);
                if b >= a {
                    b += 1;
                }
                (a, b)
            })
            .collect();

        let pairs: Vec<(f64, f64)> = picks
            .par_iter()
            .map(|&(a, b)| {
                let (ra, rb) = (&records[a], &records[b]);
                let ka = key_in(&version, ra)?;
                let kb = key_in(&version, rb)?;
                let original = version.metric().distance(ra.data(), rb.data()) as f64;
                let along_curve = (1.0 + ka.abs_diff(kb) as f64).log2();
                Ok((original, along_curve))
            })
            .collect::<Result<_>>()?;

        let score = aggregate_parallel(&Correlation, &pairs);
        debug!(version = %version.version(), sample_size, score, "measured locality preservation");
        Ok(score)
    }

    /// Check the active version's ordered index.
    ///
    /// A violation switches that version to read-only safe mode.
    pub fn verify_integrity(&self) -> Result<()> {
        let version = self.catalog.current();
        version.store().verify().inspect_err(|e| {
            error!(version = %version.version(), error = %e, "integrity check failed");
        })
    }

    /// Reject (or accept again) ingestion and reindexing.
    pub fn set_read_only(&self, read_only: bool) {
        if read_only != self.gate.is_read_only() {
            warn!(read_only, "engine read-only mode changed");
        }
        self.gate.set_read_only(read_only);
    }

    /// Whether writes are rejected, by the operator or by safe mode.
    pub fn is_read_only(&self) -> bool {
        self.gate.is_read_only() || self.catalog.current().is_read_only()
    }

    /// Drop retired versions no query holds anymore.
    pub fn collect_garbage(&self) -> usize {
        self.catalog.collect_garbage()
    }

    /// Stored record by id.
    pub fn get_vector(&self, id: VectorId) -> Option<Arc<VectorRecord>> {
        self.gate.vectors().get(id)
    }

    /// Raw little-endian bytes of a stored vector.
    pub fn get_raw(&self, id: VectorId) -> Result<Vec<u8>> {
        self.gate.vectors().get_raw_bytes(id)
    }

    /// Number of distinct stored vectors.
    pub fn len(&self) -> usize {
        self.gate.vectors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.gate.vectors().is_empty()
    }

    /// Snapshot of engine state.
    pub fn statistics(&self) -> IndexStatistics {
        let version = self.catalog.current();
        let vectors = self.gate.vectors();
        let num_vectors = vectors.len();
        let index_entries = version.store().len();
        let memory_bytes = num_vectors
            * (self.config.dimension * std::mem::size_of::<f32>() + std::mem::size_of::<VectorRecord>())
            + index_entries * std::mem::size_of::<IndexEntry>();

        IndexStatistics {
            version: version.version(),
            retired_versions: self.catalog.retired_versions().len(),
            dimension: self.config.dimension,
            axes: version.landmarks().axes(),
            precision_bits: version.curve().precision_bits(),
            projection_metric: version.metric().name().to_string(),
            num_vectors,
            total_references: vectors.total_references(),
            index_entries,
            pending_compaction: version.store().pending_compaction(),
            memory_bytes,
            read_only: self.is_read_only(),
        }
    }

    /// Summarize conditions an operator should know about.
    pub fn health_check(&self) -> HealthStatus {
        let version = self.catalog.current();
        let stats = self.statistics();
        let mut critical = Vec::new();
        let mut warnings = Vec::new();

        if version.is_read_only() {
            critical.push(format!(
                "index version {} is in read-only safe mode",
                version.version()
            ));
        }
        if self.gate.is_read_only() {
            warnings.push("ingestion is disabled by the operator".to_string());
        }
        if stats.index_entries < stats.num_vectors {
            warnings.push(format!(
                "{} stored vectors are not indexed under {}",
                stats.num_vectors - stats.index_entries,
                stats.version
            ));
        }
        if stats.retired_versions > 0 {
            warnings.push(format!(
                "{} retired versions awaiting garbage collection",
                stats.retired_versions
            ));
        }
        HealthStatus::from_issues(critical, warnings)
    }
}

impl std::fmt::Debug for SpatialEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialEngine")
            .field("catalog", &self.catalog)
            .field("vectors", &self.len())
            .field("read_only", &self.gate.is_read_only())
            .finish()
    }
}

/// Key of a record under `version`, from the store when it is indexed there.
fn key_in(version: &IndexVersion, record: &VectorRecord) -> Result<crate::types::CurveKey> {
    match version.store().key_of(record.id()) {
        Some(key) => Ok(key),
        None => version.key_for(record.data()),
    }
}

/// Build an index version for `landmarks`, indexing `records` under it.
fn assemble(
    config: &EngineConfig,
    registry: &MetricRegistry,
    landmarks: LandmarkSet,
    version: LandmarkVersion,
    records: Vec<Arc<VectorRecord>>,
) -> Result<IndexVersion> {
    if landmarks.dimension() != config.dimension {
        return Err(IndexError::invalid_parameter(format!(
            "landmarks have {} dimensions, engine expects {}",
            landmarks.dimension(),
            config.dimension
        )));
    }
    let metric_name = if landmarks.metric_name().is_empty() {
        config.projection_metric.as_str()
    } else {
        landmarks.metric_name()
    };
    let metric = registry.resolve(metric_name)?;
    let bounds = landmarks.bounds().unwrap_or(config.coordinate_bounds);
    let curve = CurveIndexer::new(landmarks.axes(), config.precision_bits, bounds)?;
    let landmarks = landmarks.into_version(version);

    let entries = records
        .par_iter()
        .map(|record| {
            let coordinate = projection::project(record.data(), &landmarks, metric.as_ref())?;
            Ok(IndexEntry::new(curve.to_key(&coordinate), record.id()))
        })
        .collect::<Result<Vec<_>>>()?;

    let store = SortedRunStore::bulk_load(version, entries, &config.store, &config.ingest)?;
    IndexVersion::new(landmarks, metric, curve, store)
}
