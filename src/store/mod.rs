//! SpatialStore: ordered curve-key index plus raw vector lookup.

pub mod sorted_run;
pub mod vectors;

pub use sorted_run::{RangeScan, SortedRunStore};
pub use vectors::VectorStore;

use crate::error::Result;
use crate::types::{CurveKey, VectorId};
use serde::{Deserialize, Serialize};

/// One `(curve key, vector id)` pair of the ordered index.
///
/// Entries order by key, then by id, so several vectors can share a grid
/// cell while the index stays strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Position on the curve.
    pub key: CurveKey,
    /// Vector stored at that position.
    pub id: VectorId,
}

impl IndexEntry {
    /// Create a new entry.
    #[inline]
    pub fn new(key: CurveKey, id: impl Into<VectorId>) -> Self {
        Self { key, id: id.into() }
    }
}

/// Ordered index over curve keys.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Scans run concurrently with
/// inserts and see a consistent snapshot: they may miss entries inserted
/// after the scan started, but never observe a partially written one.
pub trait SpatialStore: Send + Sync {
    /// Add an entry.
    ///
    /// Returns `Ok(false)` if the exact entry is already present. Indexing a
    /// vector that is already stored under a different key is a structural
    /// violation and fails with `IndexCorruption`.
    fn insert(&self, key: CurveKey, id: VectorId) -> Result<bool>;

    /// Entries with `lo <= key <= hi`, in index order.
    fn range_scan(&self, lo: CurveKey, hi: CurveKey) -> RangeScan;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Return true if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key a vector is indexed under, if any.
    fn key_of(&self, id: VectorId) -> Option<CurveKey>;

    /// Check the ordering and uniqueness invariants over the whole store.
    fn verify(&self) -> Result<()>;

    /// Whether writes are currently rejected.
    fn is_read_only(&self) -> bool;

    /// Enable or disable write rejection.
    fn set_read_only(&self, read_only: bool);
}
