//! Versioned index catalog.
//!
//! Each activated landmark set owns an [`IndexVersion`]: the set itself, the
//! metric bound to it, the curve indexer and the ordered store filled under
//! it. The catalog publishes the current version through an [`ArcSwap`]
//! pointer with a single writer and many readers. A query loads the pointer
//! once and holds the `Arc` until it finishes, so it sees one consistent
//! version even if a reindex swaps the pointer meanwhile. Replaced versions
//! are retired and dropped by [`VersionCatalog::collect_garbage`] once no
//! query holds them.

use crate::curve::CurveIndexer;
use crate::distance::ResolvedMetric;
use crate::error::{IndexError, Result};
use crate::landmark::LandmarkSet;
use crate::projection::{self, Coordinate};
use crate::store::{SortedRunStore, SpatialStore};
use crate::types::{CurveKey, LandmarkVersion};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything indexed under one landmark-set version.
#[derive(Debug)]
pub struct IndexVersion {
    landmarks: LandmarkSet,
    metric: ResolvedMetric,
    curve: CurveIndexer,
    store: SortedRunStore,
    built_at: Instant,
}

impl IndexVersion {
    /// Bundle a versioned landmark set with its curve and store.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidParameter`] if the parts disagree on
    /// version or axis count.
    pub fn new(
        landmarks: LandmarkSet,
        metric: ResolvedMetric,
        curve: CurveIndexer,
        store: SortedRunStore,
    ) -> Result<Self> {
        if landmarks.version() != store.version() {
            return Err(IndexError::invalid_parameter(format!(
                "landmarks are {}, store is {}",
                landmarks.version(),
                store.version()
            )));
        }
        if landmarks.axes() != curve.axes() {
            return Err(IndexError::invalid_parameter(format!(
                "{} landmarks but the curve has {} axes",
                landmarks.axes(),
                curve.axes()
            )));
        }
        Ok(Self {
            landmarks,
            metric,
            curve,
            store,
            built_at: Instant::now(),
        })
    }

    pub fn version(&self) -> LandmarkVersion {
        self.landmarks.version()
    }

    pub fn landmarks(&self) -> &LandmarkSet {
        &self.landmarks
    }

    /// Metric used to project vectors under this version.
    pub fn metric(&self) -> &ResolvedMetric {
        &self.metric
    }

    pub fn curve(&self) -> &CurveIndexer {
        &self.curve
    }

    pub fn store(&self) -> &SortedRunStore {
        &self.store
    }

    /// When this version was built.
    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    /// Project a vector under this version.
    pub fn project(&self, vector: &[f32]) -> Result<Coordinate> {
        projection::project(vector, &self.landmarks, self.metric.as_ref())
    }

    /// Curve key of a vector under this version.
    pub fn key_for(&self, vector: &[f32]) -> Result<CurveKey> {
        Ok(self.curve.to_key(&self.project(vector)?))
    }

    /// Whether this version rejects writes.
    pub fn is_read_only(&self) -> bool {
        self.store.is_read_only()
    }
}

/// Current-version pointer plus the versions it replaced.
pub struct VersionCatalog {
    current: ArcSwap<IndexVersion>,
    retired: Mutex<Vec<Arc<IndexVersion>>>,
}

impl VersionCatalog {
    /// Start a catalog with an initial active version.
    pub fn new(initial: IndexVersion) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// The active version. Holding the returned `Arc` keeps it alive.
    pub fn current(&self) -> Arc<IndexVersion> {
        self.current.load_full()
    }

    /// Number of the active version.
    pub fn current_version(&self) -> LandmarkVersion {
        self.current.load().version()
    }

    /// The active version, provided it is `requested`.
    ///
    /// # Errors
    /// Returns [`IndexError::LandmarkVersionMismatch`] if `requested` is
    /// retired or was never activated.
    pub fn pin(&self, requested: LandmarkVersion) -> Result<Arc<IndexVersion>> {
        let current = self.current();
        if current.version() == requested {
            Ok(current)
        } else {
            Err(IndexError::LandmarkVersionMismatch {
                requested,
                current: current.version(),
            })
        }
    }

    /// Make `next` the active version and retire the previous one.
    ///
    /// Callers serialize activation; the catalog itself only guarantees that
    /// readers see either the old or the new version, never a mix.
    pub fn activate(&self, next: IndexVersion) -> LandmarkVersion {
        let version = next.version();
        let previous = self.current.swap(Arc::new(next));
        info!(
            previous = %previous.version(),
            current = %version,
            "activated landmark version"
        );
        self.retired.lock().push(previous);
        version
    }

    /// Versions retired but still held by at least one reader, or not yet
    /// collected.
    pub fn retired_versions(&self) -> Vec<LandmarkVersion> {
        self.retired.lock().iter().map(|v| v.version()).collect()
    }

    /// Drop retired versions no reader holds anymore. Returns how many were
    /// dropped.
    pub fn collect_garbage(&self) -> usize {
        let mut retired = self.retired.lock();
        let before = retired.len();
        retired.retain(|v| {
            let in_use = Arc::strong_count(v) > 1;
            if !in_use {
                debug!(version = %v.version(), entries = v.store().len(), "dropping retired version");
            }
            in_use
        });
        let dropped = before - retired.len();
        if dropped > 0 {
            info!(dropped, remaining = retired.len(), "collected retired versions");
        }
        dropped
    }
}

impl std::fmt::Debug for VersionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCatalog")
            .field("current", &self.current_version())
            .field("retired", &self.retired_versions())
            .finish()
    }
}
