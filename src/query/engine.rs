use super::window;
use super::{PartialResultWarning, QueryOutcome, QueryResult, QueryState};
use super::CancellationToken;
use crate::config::QueryConfig;
use crate::distance::Metric;
use crate::error::{IndexError, Result};
use crate::index::brute_force::{into_sorted, push_bounded, ScoredVector};
use crate::index::IndexVersion;
use crate::metrics::SearchStatsBuilder;
use crate::projection::validate_vector;
use crate::store::{SpatialStore, VectorStore};
use crate::types::{CurveKey, VectorId};
use rayon::prelude::*;
use roaring::RoaringTreemap;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Candidates per Rayon task during rerank.
const RERANK_CHUNK: usize = 256;

/// Parameters of one query.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Query vector, in the original space.
    pub vector: &'a [f32],
    /// Results wanted.
    pub top_k: usize,
    /// Metric used to rerank candidates.
    pub metric: &'a dyn Metric,
    /// Stop expanding the window after this instant.
    pub deadline: Option<Instant>,
    /// Stop expanding the window once cancelled.
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> QueryRequest<'a> {
    pub fn new(vector: &'a [f32], top_k: usize, metric: &'a dyn Metric) -> Self {
        Self {
            vector,
            top_k,
            metric,
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn interrupted(&self, found: usize) -> Option<PartialResultWarning> {
        if self.cancel.is_some_and(|c| c.is_cancelled()) {
            return Some(PartialResultWarning::Cancelled { found });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(PartialResultWarning::TimedOut { found });
        }
        None
    }
}

/// Runs queries against one index version at a time.
///
/// The engine is stateless between queries; every query works on the
/// [`IndexVersion`] it is handed, so all of its candidates come from that
/// version's store.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    vectors: Arc<VectorStore>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(vectors: Arc<VectorStore>, config: QueryConfig) -> Self {
        Self { vectors, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Run a query to completion.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidVector`] for a malformed query vector and
    /// [`IndexError::InvalidParameter`] for `top_k == 0`. Running out of
    /// window budget, time or patience is not an error; see
    /// [`QueryOutcome::warning`].
    pub fn execute(&self, version: &IndexVersion, request: QueryRequest<'_>) -> Result<QueryOutcome> {
        let started = Instant::now();
        let mut stats = SearchStatsBuilder::new();
        stats.version(version.version());

        let top_k = request.top_k;
        let indexed = version.store().len();
        let target = top_k
            .saturating_mul(self.config.oversample_factor.max(1))
            .max(self.config.min_candidates.min(indexed));
        let max_candidates = self.config.max_candidates.max(top_k) as u64;
        let max_key = version.curve().max_key();
        let radius_limit = self
            .config
            .max_radius
            .map_or(max_key.as_u128(), |r| (r as u128).min(max_key.as_u128()));

        let mut state = QueryState::Init;
        let mut anchors: Vec<CurveKey> = Vec::new();
        let mut radius = 0u128;
        let mut doublings = 0u32;
        let mut candidates = RoaringTreemap::new();
        let mut warning = None;
        let mut results = Vec::new();

        loop {
            trace!(?state, candidates = candidates.len(), radius, "query state");
            state = match state {
                QueryState::Init => {
                    if top_k == 0 {
                        return Err(IndexError::invalid_parameter("top_k must be at least 1"));
                    }
                    validate_vector(request.vector, version.landmarks().dimension())?;
                    QueryState::WindowSelect
                }
                QueryState::WindowSelect => {
                    let coordinate = version.project(request.vector)?;
                    anchors = window::anchor_keys(
                        version.curve(),
                        &coordinate,
                        self.config.search_neighbor_cells,
                    );
                    radius = self.initial_radius(max_key, indexed, target).min(radius_limit);
                    QueryState::Scan
                }
                QueryState::Scan => {
                    if let Some(interruption) = request.interrupted(candidates.len() as usize) {
                        warn!(version = %version.version(), %interruption, "query interrupted");
                        warning = Some(interruption);
                        QueryState::Rerank
                    } else {
                        let plan = window::windows(&anchors, radius, max_key);
                        stats.scan_round(plan.len(), radius);
                        let mut scanned = 0usize;
                        'scan: for &(lo, hi) in &plan {
                            for entry in version.store().range_scan(lo, hi) {
                                scanned += 1;
                                candidates.insert(entry.id.as_u64());
                                if candidates.len() >= max_candidates {
                                    break 'scan;
                                }
                            }
                        }
                        stats.add_entries_scanned(scanned);

                        let found = candidates.len() as usize;
                        let whole_curve = window::covers_curve(&plan, max_key);
                        if found >= target || candidates.len() >= max_candidates || whole_curve {
                            QueryState::Rerank
                        } else if doublings < self.config.max_doublings && radius < radius_limit {
                            doublings += 1;
                            radius = radius.saturating_mul(2).min(radius_limit);
                            debug!(found, target, radius, doublings, "expanding query window");
                            QueryState::Scan
                        } else {
                            debug!(found, target, radius, "window budget exhausted");
                            warning = Some(PartialResultWarning::WindowExhausted { found, target });
                            QueryState::Rerank
                        }
                    }
                }
                QueryState::Rerank => {
                    stats.candidates_reranked(candidates.len() as usize);
                    results = self.rerank(&candidates, request.vector, request.metric, top_k);
                    QueryState::Done
                }
                QueryState::Done => break,
            };
        }

        stats.set_query_time(started.elapsed());
        Ok(QueryOutcome {
            results,
            warning,
            version: version.version(),
            stats: stats.build(),
        })
    }

    /// Starting window half-width.
    ///
    /// With density scaling on, this is at least the half-width that would
    /// hold `target` entries if the `indexed` keys were spread evenly over
    /// the curve.
    fn initial_radius(&self, max_key: CurveKey, indexed: usize, target: usize) -> u128 {
        let base = self.config.base_radius as u128;
        if !self.config.scale_radius_to_density || indexed == 0 {
            return base;
        }
        let keys_per_entry = max_key.as_u128() / indexed as u128;
        base.max(keys_per_entry.saturating_mul(target as u128) / 2)
    }

    /// Exact distances for every candidate, best `top_k` in order.
    ///
    /// Candidates whose record is not visible yet are skipped.
    fn rerank(
        &self,
        candidates: &RoaringTreemap,
        query: &[f32],
        metric: &dyn Metric,
        top_k: usize,
    ) -> Vec<QueryResult> {
        let ids: Vec<u64> = candidates.iter().collect();
        let best = ids
            .par_chunks(RERANK_CHUNK)
            .map(|chunk| {
                let mut heap: BinaryHeap<ScoredVector> = BinaryHeap::with_capacity(top_k + 1);
                for &raw_id in chunk {
                    let id = VectorId(raw_id);
                    if let Some(data) = self.vectors.get_raw(id) {
                        let distance = metric.distance(query, &data);
                        push_bounded(&mut heap, ScoredVector { id, distance }, top_k);
                    }
                }
                heap
            })
            .reduce(
                || BinaryHeap::with_capacity(top_k + 1),
                |mut a, b| {
                    for item in b {
                        push_bounded(&mut a, item, top_k);
                    }
                    a
                },
            );

        into_sorted(best)
            .into_iter()
            .enumerate()
            .map(|(i, scored)| QueryResult {
                id: scored.id,
                distance: scored.distance,
                rank: i + 1,
            })
            .collect()
    }
}
