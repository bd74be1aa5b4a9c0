//! Named constants for configuration values.
//!
//! This module centralizes magic numbers and default values used throughout
//! the codebase, making them easier to find, document, and tune. The query
//! defaults are a starting configuration tuned against the recall tests, not
//! a contract.

/// Constants for the Hilbert curve transform.
pub mod curve {
    /// Default grid precision: 2^10 steps per axis.
    pub const DEFAULT_PRECISION_BITS: u32 = 10;

    /// Largest supported precision per axis.
    /// Grid coordinates are stored as `u32`.
    pub const MAX_PRECISION_BITS: u32 = 32;

    /// Width of a curve key in bits. `axes * precision_bits` must fit.
    pub const KEY_BITS: u32 = 128;

    /// Default coordinate range mapped onto the grid when no calibration is used.
    pub const DEFAULT_BOUNDS: (f32, f32) = (0.0, 2.0);
}

/// Constants for the query window search.
pub mod query {
    /// Initial half-width of the candidate window, in curve steps.
    pub const DEFAULT_BASE_RADIUS: u64 = 4096;

    /// Number of times the window radius may double before giving up.
    pub const DEFAULT_MAX_DOUBLINGS: u32 = 6;

    /// Candidates gathered per requested result before reranking.
    pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 3;

    /// Scan floor: candidates gathered before reranking regardless of `top_k`.
    ///
    /// An index with at most this many entries is reranked exhaustively.
    pub const DEFAULT_MIN_CANDIDATES: usize = 1024;

    /// Hard cap on candidates collected across all window scans.
    pub const DEFAULT_MAX_CANDIDATES: usize = 4096;

    /// Neighbor cells are searched only up to this many axes (3^axes windows).
    pub const MAX_NEIGHBOR_SEARCH_AXES: usize = 4;
}

/// Constants for the ingest path.
pub mod ingest {
    /// Attempts to acquire the store write lock before reporting contention.
    pub const DEFAULT_INSERT_ATTEMPTS: u32 = 3;

    /// Base wait for the first lock attempt; doubled on every retry.
    pub const DEFAULT_BACKOFF_BASE_MS: u64 = 5;
}

/// Constants for the sorted-run store.
pub mod store {
    /// Tail entries accumulated before they are merged into the base run.
    pub const DEFAULT_COMPACTION_THRESHOLD: usize = 1024;
}

/// Constants for diagnostics.
pub mod diagnostics {
    /// Seed used by locality measurement so repeated runs are comparable.
    pub const LOCALITY_SAMPLE_SEED: u64 = 0x5eed_1a7d;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_fits() {
        assert!(3 * curve::DEFAULT_PRECISION_BITS <= curve::KEY_BITS);
    }

    #[test]
    fn test_default_query_budget() {
        assert_eq!(query::DEFAULT_OVERSAMPLE_FACTOR, 3);
        assert_eq!(query::DEFAULT_MAX_DOUBLINGS, 6);
        assert!(query::DEFAULT_MAX_CANDIDATES >= 10 * query::DEFAULT_OVERSAMPLE_FACTOR);
        assert!(query::DEFAULT_MIN_CANDIDATES <= query::DEFAULT_MAX_CANDIDATES);
    }
}
