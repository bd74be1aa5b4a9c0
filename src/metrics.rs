//! Metrics and statistics for index monitoring.
//!
//! Provides statistics about index state and search operations for
//! performance monitoring, capacity planning, and debugging.
//!
//! # Index Statistics
//!
//! ```ignore
//! let stats = engine.statistics();
//! println!("{}", stats.summary());
//! // IndexStatistics:
//! //   Version: v2 (1 retired)
//! //   Vectors: 1000 distinct, 1200 references, 1000 index entries
//! //   ...
//! ```
//!
//! # Search Statistics
//!
//! Every query outcome carries a [`SearchStatistics`]:
//!
//! ```ignore
//! let outcome = engine.query(&vector, 10, "euclidean", 50)?;
//! println!("{:.3}ms, {} candidates", outcome.stats.query_time_ms(), outcome.stats.candidates_reranked);
//! ```
//!
//! # Health Checks
//!
//! ```ignore
//! match engine.health_check() {
//!     HealthStatus::Healthy => println!("Index is healthy"),
//!     HealthStatus::Warning(issues) => println!("Warnings: {:?}", issues),
//!     HealthStatus::Unhealthy(issues) => println!("Critical: {:?}", issues),
//! }
//! ```

use crate::types::LandmarkVersion;
use std::time::Duration;

/// Health status of an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthStatus {
    /// Index is healthy and operating normally.
    Healthy,
    /// Index has warnings but is still functional.
    Warning(Vec<String>),
    /// Index has critical issues that may affect functionality.
    Unhealthy(Vec<String>),
}

impl HealthStatus {
    /// Check if the status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Check if the status has warnings (but is still functional).
    pub fn is_warning(&self) -> bool {
        matches!(self, HealthStatus::Warning(_))
    }

    /// Check if the status is unhealthy.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    /// Get the issues if any.
    pub fn issues(&self) -> Option<&[String]> {
        match self {
            HealthStatus::Healthy => None,
            HealthStatus::Warning(issues) | HealthStatus::Unhealthy(issues) => Some(issues),
        }
    }

    /// Classify a set of findings: any critical issue makes the status
    /// unhealthy, otherwise any warning makes it a warning.
    pub fn from_issues(critical: Vec<String>, warnings: Vec<String>) -> Self {
        if !critical.is_empty() {
            let mut issues = critical;
            issues.extend(warnings);
            HealthStatus::Unhealthy(issues)
        } else if !warnings.is_empty() {
            HealthStatus::Warning(warnings)
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Statistics about the current state of the engine.
#[derive(Clone, Debug, Default)]
pub struct IndexStatistics {
    /// Active landmark version.
    pub version: LandmarkVersion,
    /// Retired versions not yet collected.
    pub retired_versions: usize,
    /// Raw vector dimension.
    pub dimension: usize,
    /// Number of landmarks, i.e. projected axes.
    pub axes: usize,
    /// Grid precision per axis.
    pub precision_bits: u32,
    /// Metric bound to the active version.
    pub projection_metric: String,
    /// Distinct stored vectors.
    pub num_vectors: usize,
    /// Sum of reference counts (total ingestions).
    pub total_references: u64,
    /// Entries in the active version's ordered index.
    pub index_entries: usize,
    /// Entries waiting in the store's tail run.
    pub pending_compaction: usize,
    /// Estimated memory usage of raw vectors and index entries in bytes.
    pub memory_bytes: usize,
    /// Whether the active version or the ingestion gate rejects writes.
    pub read_only: bool,
}

impl IndexStatistics {
    /// Fraction of ingestions that were duplicates.
    pub fn duplicate_ratio(&self) -> f32 {
        if self.total_references == 0 {
            0.0
        } else {
            1.0 - self.num_vectors as f32 / self.total_references as f32
        }
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "IndexStatistics:\n  \
             Version: {} ({} retired)\n  \
             Vectors: {} distinct, {} references ({:.1}% duplicates), {} index entries\n  \
             Dimension: {}, Axes: {}, Precision: {} bits\n  \
             Projection metric: {}\n  \
             Memory: {:.2} MB, pending compaction: {}\n  \
             Read-only: {}",
            self.version,
            self.retired_versions,
            self.num_vectors,
            self.total_references,
            self.duplicate_ratio() * 100.0,
            self.index_entries,
            self.dimension,
            self.axes,
            self.precision_bits,
            self.projection_metric,
            self.memory_bytes as f64 / (1024.0 * 1024.0),
            self.pending_compaction,
            if self.read_only { "yes" } else { "no" }
        )
    }
}

/// Statistics about a single query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchStatistics {
    /// Total query execution time.
    pub query_time: Duration,
    /// Landmark version the query ran against.
    pub version: LandmarkVersion,
    /// Scan rounds run (1 plus the number of window doublings).
    pub scan_rounds: u32,
    /// Key windows scanned across all rounds, after merging overlaps.
    pub windows_scanned: usize,
    /// Half-width of the window in the last round.
    pub final_radius: u128,
    /// Index entries read by range scans.
    pub entries_scanned: usize,
    /// Distinct candidates passed to rerank.
    pub candidates_reranked: usize,
}

impl SearchStatistics {
    /// Get query time in milliseconds.
    pub fn query_time_ms(&self) -> f32 {
        self.query_time.as_secs_f32() * 1000.0
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "SearchStatistics:\n  \
             Time: {:.3}ms\n  \
             Version: {}\n  \
             Scan rounds: {} (final radius {})\n  \
             Windows scanned: {}\n  \
             Entries scanned: {}\n  \
             Candidates reranked: {}",
            self.query_time_ms(),
            self.version,
            self.scan_rounds,
            self.final_radius,
            self.windows_scanned,
            self.entries_scanned,
            self.candidates_reranked
        )
    }
}

/// Builder for collecting search statistics during a query.
#[derive(Default)]
pub struct SearchStatsBuilder {
    stats: SearchStatistics,
}

impl SearchStatsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the version being searched.
    pub fn version(&mut self, version: LandmarkVersion) {
        self.stats.version = version;
    }

    /// Record one scan round over `windows` windows of half-width `radius`.
    pub fn scan_round(&mut self, windows: usize, radius: u128) {
        self.stats.scan_rounds += 1;
        self.stats.windows_scanned += windows;
        self.stats.final_radius = radius;
    }

    /// Add to the count of index entries scanned.
    pub fn add_entries_scanned(&mut self, count: usize) {
        self.stats.entries_scanned += count;
    }

    /// Record the number of candidates reranked.
    pub fn candidates_reranked(&mut self, count: usize) {
        self.stats.candidates_reranked = count;
    }

    /// Set the query execution time.
    pub fn set_query_time(&mut self, duration: Duration) {
        self.stats.query_time = duration;
    }

    /// Build the final statistics.
    pub fn build(self) -> SearchStatistics {
        self.stats
    }
}
