//! Engine configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `LANDMARK_`. Nested keys use a double
//! underscore, so `LANDMARK_QUERY__OVERSAMPLE_FACTOR=4` sets
//! `query.oversample_factor`.

use crate::constants;
use crate::curve::CurveIndexer;
use crate::error::{IndexError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "LANDMARK_";

/// Top-level configuration for a [`crate::SpatialEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dimensionality D of every ingested vector.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Grid precision per projected axis (2^bits steps).
    #[serde(default = "default_precision_bits")]
    pub precision_bits: u32,

    /// Coordinate range mapped onto the grid. Values outside are clamped.
    #[serde(default = "default_bounds")]
    pub coordinate_bounds: (f32, f32),

    /// Metric used for projection when a landmark set does not name one.
    #[serde(default = "default_projection_metric")]
    pub projection_metric: String,

    /// Query window and rerank settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// Ingest retry settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Ordered store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Settings for the window-scan-then-rerank query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Initial half-width W0 of the key window.
    #[serde(default = "default_base_radius")]
    pub base_radius: u64,

    /// Maximum number of radius doublings.
    #[serde(default = "default_max_doublings")]
    pub max_doublings: u32,

    /// Optional ceiling on the window radius.
    #[serde(default)]
    pub max_radius: Option<u64>,

    /// Candidate target is `top_k * oversample_factor`.
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,

    /// Scan floor: a query keeps widening its window until it holds this
    /// many candidates, or every entry of a smaller index.
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Hard cap on collected candidates.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Start from the radius at which a window would hold the candidate
    /// target if keys were spread evenly, when that exceeds `base_radius`.
    #[serde(default = "default_true")]
    pub scale_radius_to_density: bool,

    /// Also scan windows around the keys of the query cell's grid neighbors.
    #[serde(default = "default_true")]
    pub search_neighbor_cells: bool,
}

/// Settings for the ingest path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Attempts to take the store write lock before reporting contention.
    #[serde(default = "default_insert_attempts")]
    pub insert_attempts: u32,

    /// First backoff wait in milliseconds; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

/// Settings for the sorted-run store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Tail size that triggers a merge into the base run.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,
}

fn default_dimension() -> usize {
    128
}

fn default_precision_bits() -> u32 {
    constants::curve::DEFAULT_PRECISION_BITS
}

fn default_bounds() -> (f32, f32) {
    constants::curve::DEFAULT_BOUNDS
}

fn default_projection_metric() -> String {
    "euclidean".to_string()
}

fn default_base_radius() -> u64 {
    constants::query::DEFAULT_BASE_RADIUS
}

fn default_max_doublings() -> u32 {
    constants::query::DEFAULT_MAX_DOUBLINGS
}

fn default_oversample_factor() -> usize {
    constants::query::DEFAULT_OVERSAMPLE_FACTOR
}

fn default_max_candidates() -> usize {
    constants::query::DEFAULT_MAX_CANDIDATES
}

fn default_true() -> bool {
    true
}

fn default_min_candidates() -> usize {
    constants::query::DEFAULT_MIN_CANDIDATES
}

fn default_insert_attempts() -> u32 {
    constants::ingest::DEFAULT_INSERT_ATTEMPTS
}

fn default_backoff_base_ms() -> u64 {
    constants::ingest::DEFAULT_BACKOFF_BASE_MS
}

fn default_compaction_threshold() -> usize {
    constants::store::DEFAULT_COMPACTION_THRESHOLD
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            precision_bits: default_precision_bits(),
            coordinate_bounds: default_bounds(),
            projection_metric: default_projection_metric(),
            query: QueryConfig::default(),
            ingest: IngestConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            base_radius: default_base_radius(),
            max_doublings: default_max_doublings(),
            max_radius: None,
            oversample_factor: default_oversample_factor(),
            min_candidates: default_min_candidates(),
            max_candidates: default_max_candidates(),
            scale_radius_to_density: true,
            search_neighbor_cells: true,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            insert_attempts: default_insert_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: default_compaction_threshold(),
        }
    }
}

impl EngineConfig {
    /// Default configuration for vectors of the given dimensionality.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Set the grid precision.
    pub fn with_precision_bits(mut self, bits: u32) -> Self {
        self.precision_bits = bits;
        self
    }

    /// Set the coordinate range mapped onto the grid.
    pub fn with_bounds(mut self, lo: f32, hi: f32) -> Self {
        self.coordinate_bounds = (lo, hi);
        self
    }

    /// Set the default projection metric name.
    pub fn with_projection_metric(mut self, name: impl Into<String>) -> Self {
        self.projection_metric = name.into();
        self
    }

    /// Replace the query settings.
    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    /// Load configuration from defaults, a TOML file, and the environment.
    ///
    /// A missing file is not an error; the remaining layers still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an inline TOML document layered over defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(IndexError::invalid_parameter("dimension must be at least 1"));
        }
        let bits = self.precision_bits;
        if bits == 0 || bits > constants::curve::MAX_PRECISION_BITS {
            return Err(IndexError::invalid_parameter(format!(
                "precision_bits must be in 1..={}, got {bits}",
                constants::curve::MAX_PRECISION_BITS
            )));
        }
        // A projection has at least three axes.
        if 3 * bits > constants::curve::KEY_BITS {
            return Err(IndexError::invalid_parameter(format!(
                "3 axes x {bits} bits does not fit in a {}-bit curve key",
                constants::curve::KEY_BITS
            )));
        }
        let (lo, hi) = self.coordinate_bounds;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(IndexError::invalid_parameter(format!(
                "coordinate_bounds must be finite with lo < hi, got ({lo}, {hi})"
            )));
        }
        // Narrow bounds far from zero cannot resolve every cell.
        CurveIndexer::new(3, bits, self.coordinate_bounds)?;
        if self.query.oversample_factor == 0 {
            return Err(IndexError::invalid_parameter("oversample_factor must be at least 1"));
        }
        if self.query.max_candidates == 0 {
            return Err(IndexError::invalid_parameter("max_candidates must be at least 1"));
        }
        if self.query.min_candidates > self.query.max_candidates {
            return Err(IndexError::invalid_parameter(format!(
                "min_candidates ({}) exceeds max_candidates ({})",
                self.query.min_candidates, self.query.max_candidates
            )));
        }
        if self.ingest.insert_attempts == 0 {
            return Err(IndexError::invalid_parameter("insert_attempts must be at least 1"));
        }
        if self.store.compaction_threshold == 0 {
            return Err(IndexError::invalid_parameter(
                "compaction_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}
