//! Error types for landmark-index operations.
//!
//! Validation failures (`InvalidVector`, `UnknownMetric`) are permanent and
//! never retried. `LockContention` is the only transient failure; the ingest
//! path retries it with bounded backoff before surfacing it. A partial query
//! result is not an error: see [`crate::query::PartialResultWarning`].

use crate::types::{LandmarkVersion, VectorId};
use thiserror::Error;

/// Result type alias using [`IndexError`].
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur during projection, indexing, and querying.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Vector has the wrong dimensionality or contains NaN/infinite components.
    #[error("invalid vector: {0}")]
    InvalidVector(String),

    /// Metric name is not present in the registry.
    #[error("unknown metric: '{0}'")]
    UnknownMetric(String),

    /// A metric with this name is already registered.
    #[error("metric already registered: '{0}'")]
    DuplicateMetric(String),

    /// Query pinned to a landmark version that is retired or was never active.
    #[error("landmark version mismatch: requested {requested}, current is {current}")]
    LandmarkVersionMismatch {
        /// Version the caller asked for.
        requested: LandmarkVersion,
        /// Version currently active.
        current: LandmarkVersion,
    },

    /// Structural invariant of an ordered index was violated.
    ///
    /// The affected version is switched to read-only safe mode when this is raised.
    #[error("index corruption in version {version}: {detail}")]
    IndexCorruption {
        /// Version whose index failed verification.
        version: LandmarkVersion,
        /// Description of the violated invariant.
        detail: String,
    },

    /// Writes are rejected because the index is in read-only mode.
    #[error("index is read-only: {0}")]
    ReadOnly(String),

    /// The store write lock could not be acquired within the retry budget.
    #[error("lock contention: gave up after {attempts} attempts")]
    LockContention {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Vector with the specified ID was not found.
    #[error("vector not found: {0}")]
    VectorNotFound(VectorId),

    /// Invalid parameter value provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be loaded or extracted.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// Creates a new `InvalidVector` error.
    pub fn invalid_vector(msg: impl Into<String>) -> Self {
        Self::InvalidVector(msg.into())
    }

    /// Creates a new `UnknownMetric` error.
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Self::UnknownMetric(name.into())
    }

    /// Creates a new `InvalidParameter` error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a new `IndexCorruption` error.
    pub fn index_corruption(version: LandmarkVersion, detail: impl Into<String>) -> Self {
        Self::IndexCorruption {
            version,
            detail: detail.into(),
        }
    }

    /// Creates a new `ReadOnly` error.
    pub fn read_only(msg: impl Into<String>) -> Self {
        Self::ReadOnly(msg.into())
    }

    /// Returns true if the operation may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention { .. })
    }
}

impl From<figment::Error> for IndexError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
