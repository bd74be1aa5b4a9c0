//! Sorted-run ordered index.
//!
//! The index is an immutable sorted base run plus a small sorted tail that
//! absorbs inserts. Both live in a snapshot published through an
//! [`ArcSwap`]: a scan loads the snapshot once and iterates it without
//! locks, while writers serialize on a mutex, build the next snapshot and
//! swap it in. When the tail grows past the compaction threshold it is
//! merged into a new base run.

use super::{IndexEntry, SpatialStore};
use crate::config::{IngestConfig, StoreConfig};
use crate::error::{IndexError, Result};
use crate::types::{CurveKey, LandmarkVersion, VectorId};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
struct Snapshot {
    base: Arc<Vec<IndexEntry>>,
    tail: Vec<IndexEntry>,
}

impl Snapshot {
    fn len(&self) -> usize {
        self.base.len() + self.tail.len()
    }
}

/// Ordered index built from sorted runs.
pub struct SortedRunStore {
    version: LandmarkVersion,
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
    key_of: DashMap<VectorId, CurveKey>,
    read_only: AtomicBool,
    compaction_threshold: usize,
    insert_attempts: u32,
    backoff_base: Duration,
}

impl SortedRunStore {
    /// Create an empty store for one landmark-set version.
    pub fn new(version: LandmarkVersion, store: &StoreConfig, ingest: &IngestConfig) -> Self {
        Self {
            version,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            key_of: DashMap::new(),
            read_only: AtomicBool::new(false),
            compaction_threshold: store.compaction_threshold.max(1),
            insert_attempts: ingest.insert_attempts.max(1),
            backoff_base: Duration::from_millis(ingest.backoff_base_ms),
        }
    }

    /// Build a store directly from a batch of entries.
    ///
    /// The entries become the base run in one step, which is how a reindex
    /// fills a fresh version.
    ///
    /// # Errors
    /// Returns [`IndexError::IndexCorruption`] if a vector appears under two
    /// different keys.
    pub fn bulk_load(
        version: LandmarkVersion,
        mut entries: Vec<IndexEntry>,
        store: &StoreConfig,
        ingest: &IngestConfig,
    ) -> Result<Self> {
        let this = Self::new(version, store, ingest);
        entries.sort_unstable();
        entries.dedup();
        for entry in &entries {
            if let Some(existing) = this.key_of.insert(entry.id, entry.key) {
                return Err(IndexError::index_corruption(
                    version,
                    format!("{} loaded under {} and {}", entry.id, existing, entry.key),
                ));
            }
        }
        this.snapshot.store(Arc::new(Snapshot {
            base: Arc::new(entries),
            tail: Vec::new(),
        }));
        Ok(this)
    }

    /// Landmark-set version this store indexes.
    pub fn version(&self) -> LandmarkVersion {
        self.version
    }

    /// Entries waiting in the tail run.
    pub fn pending_compaction(&self) -> usize {
        self.snapshot.load().tail.len()
    }

    /// Merge the tail into the base run now.
    pub fn compact(&self) -> Result<()> {
        let _guard = self.acquire_writer()?;
        let current = self.snapshot.load_full();
        if !current.tail.is_empty() {
            self.snapshot.store(Arc::new(merge_runs(&current)));
        }
        Ok(())
    }

    /// Every entry in index order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        RangeScan::new(self.snapshot.load_full(), CurveKey::MIN, CurveKey(u128::MAX)).collect()
    }

    fn acquire_writer(&self) -> Result<parking_lot::MutexGuard<'_, ()>> {
        for attempt in 0..self.insert_attempts {
            let wait = self.backoff_base * 2u32.saturating_pow(attempt);
            if let Some(guard) = self.writer.try_lock_for(wait) {
                return Ok(guard);
            }
            warn!(
                version = %self.version,
                attempt = attempt + 1,
                "store write lock busy, backing off"
            );
        }
        Err(IndexError::LockContention {
            attempts: self.insert_attempts,
        })
    }

    fn corrupt(&self, detail: String) -> IndexError {
        self.read_only.store(true, Ordering::Release);
        error!(version = %self.version, %detail, "index corruption, version is now read-only");
        IndexError::index_corruption(self.version, detail)
    }
}

impl SpatialStore for SortedRunStore {
    fn insert(&self, key: CurveKey, id: VectorId) -> Result<bool> {
        if self.is_read_only() {
            return Err(IndexError::read_only(format!(
                "index version {} rejects writes",
                self.version
            )));
        }
        let _guard = self.acquire_writer()?;

        if let Some(existing) = self.key_of.get(&id).map(|k| *k) {
            if existing == key {
                return Ok(false);
            }
            return Err(self.corrupt(format!("{id} already indexed under {existing}, not {key}")));
        }

        let current = self.snapshot.load_full();
        let entry = IndexEntry::new(key, id);
        let mut tail = current.tail.clone();
        let at = tail.partition_point(|e| *e < entry);
        tail.insert(at, entry);

        let next = Snapshot {
            base: Arc::clone(&current.base),
            tail,
        };
        let next = if next.tail.len() > self.compaction_threshold {
            debug!(
                version = %self.version,
                base = next.base.len(),
                tail = next.tail.len(),
                "compacting sorted runs"
            );
            merge_runs(&next)
        } else {
            next
        };

        self.key_of.insert(id, key);
        self.snapshot.store(Arc::new(next));
        Ok(true)
    }

    fn range_scan(&self, lo: CurveKey, hi: CurveKey) -> RangeScan {
        RangeScan::new(self.snapshot.load_full(), lo, hi)
    }

    fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    fn key_of(&self, id: VectorId) -> Option<CurveKey> {
        self.key_of.get(&id).map(|k| *k)
    }

    fn verify(&self) -> Result<()> {
        let _guard = self.acquire_writer()?;
        let snapshot = self.snapshot.load_full();
        for run in [snapshot.base.as_slice(), snapshot.tail.as_slice()] {
            if let Some(pair) = run.windows(2).find(|w| w[0] >= w[1]) {
                return Err(self.corrupt(format!(
                    "run out of order: ({}, {}) before ({}, {})",
                    pair[0].key, pair[0].id, pair[1].key, pair[1].id
                )));
            }
        }

        let mut seen = 0usize;
        for entry in RangeScan::new(snapshot.clone(), CurveKey::MIN, CurveKey(u128::MAX)) {
            seen += 1;
            match self.key_of.get(&entry.id).map(|k| *k) {
                Some(key) if key == entry.key => {}
                Some(key) => {
                    return Err(self.corrupt(format!(
                        "{} found under {} but registered under {key}",
                        entry.id, entry.key
                    )))
                }
                None => {
                    return Err(self.corrupt(format!("{} has no key registration", entry.id)))
                }
            }
        }
        if seen != self.key_of.len() {
            return Err(self.corrupt(format!(
                "{seen} entries but {} registered vectors",
                self.key_of.len()
            )));
        }
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }
}

impl std::fmt::Debug for SortedRunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("SortedRunStore")
            .field("version", &self.version)
            .field("base", &snapshot.base.len())
            .field("tail", &snapshot.tail.len())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

fn merge_runs(snapshot: &Snapshot) -> Snapshot {
    let mut base = Vec::with_capacity(snapshot.len());
    let (mut a, mut b) = (snapshot.base.iter().peekable(), snapshot.tail.iter().peekable());
    loop {
        let next = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) if x <= y => a.next(),
            (Some(_), Some(_)) => b.next(),
            (Some(_), None) => a.next(),
            (None, Some(_)) => b.next(),
            (None, None) => break,
        };
        base.extend(next.copied());
    }
    Snapshot {
        base: Arc::new(base),
        tail: Vec::new(),
    }
}

/// Iterator over one snapshot of a [`SortedRunStore`], merging its runs.
///
/// Holds the snapshot alive, so later inserts never affect it.
pub struct RangeScan {
    snapshot: Arc<Snapshot>,
    base_pos: usize,
    tail_pos: usize,
    hi: CurveKey,
}

impl RangeScan {
    fn new(snapshot: Arc<Snapshot>, lo: CurveKey, hi: CurveKey) -> Self {
        let base_pos = snapshot.base.partition_point(|e| e.key < lo);
        let tail_pos = snapshot.tail.partition_point(|e| e.key < lo);
        Self {
            snapshot,
            base_pos,
            tail_pos,
            hi,
        }
    }
}

impl Iterator for RangeScan {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<IndexEntry> {
        let base = self.snapshot.base.get(self.base_pos).filter(|e| e.key <= self.hi);
        let tail = self.snapshot.tail.get(self.tail_pos).filter(|e| e.key <= self.hi);
        match (base, tail) {
            (Some(x), Some(y)) if x <= y => {
                self.base_pos += 1;
                Some(*x)
            }
            (_, Some(y)) => {
                self.tail_pos += 1;
                Some(*y)
            }
            (Some(x), None) => {
                self.base_pos += 1;
                Some(*x)
            }
            (None, None) => None,
        }
    }
}
