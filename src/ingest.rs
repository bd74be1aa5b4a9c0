//! IngestionGate: fingerprint dedup in front of projection and indexing.

use crate::error::{IndexError, Result};
use crate::index::IndexVersion;
use crate::projection::validate_vector;
use crate::store::vectors::Admission;
use crate::store::{SpatialStore, VectorStore};
use crate::types::VectorId;
use crate::vector::{fingerprint, VectorRecord};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// One vector submitted for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestItem {
    /// Raw components.
    pub vector: Vec<f32>,
    /// Modality tag, part of the fingerprint.
    pub modality: String,
    /// Caller's identifier.
    pub external_id: String,
}

impl IngestItem {
    pub fn new(vector: Vec<f32>, modality: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            vector,
            modality: modality.into(),
            external_id: external_id.into(),
        }
    }
}

/// Deduplicates incoming vectors and indexes new content.
///
/// New content is validated, fingerprinted, recorded, projected under the
/// given version and inserted into that version's store while the
/// fingerprint is held exclusively. Known content only raises the record's
/// reference count.
#[derive(Debug)]
pub struct IngestionGate {
    vectors: Arc<VectorStore>,
    dimension: usize,
    read_only: AtomicBool,
}

impl IngestionGate {
    pub fn new(vectors: Arc<VectorStore>, dimension: usize) -> Self {
        Self {
            vectors,
            dimension,
            read_only: AtomicBool::new(false),
        }
    }

    /// Record store shared with the query path.
    pub fn vectors(&self) -> &Arc<VectorStore> {
        &self.vectors
    }

    /// Reject (or accept again) all ingestion up front.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    /// Ingest one vector under `version`.
    ///
    /// # Errors
    /// * [`IndexError::ReadOnly`] if the gate or the version rejects writes.
    /// * [`IndexError::InvalidVector`] for a wrong length or non-finite data.
    /// * [`IndexError::LockContention`] or [`IndexError::IndexCorruption`]
    ///   from the store; the record is not kept in either case.
    pub fn ingest(
        &self,
        version: &IndexVersion,
        raw: &[f32],
        modality: &str,
        external_id: &str,
    ) -> Result<Admission> {
        if self.is_read_only() {
            return Err(IndexError::read_only("ingestion is disabled"));
        }
        if version.is_read_only() {
            return Err(IndexError::read_only(format!(
                "index version {} is in safe mode",
                version.version()
            )));
        }
        validate_vector(raw, self.dimension)?;

        let fp = fingerprint(raw, modality);
        let admission = self.vectors.admit(
            fp,
            |id| VectorRecord::new(id, external_id, modality, fp, Arc::from(raw)),
            |record| {
                let key = version.key_for(record.data())?;
                trace!(id = %record.id(), %key, "indexing new vector");
                version.store().insert(key, record.id()).map(|_| ())
            },
        )?;

        if let Admission::Existing { id, ref_count } = admission {
            debug!(%id, ref_count, fingerprint = ?fp, external_id, "duplicate content");
        }
        Ok(admission)
    }

    /// Ingest many vectors across the Rayon pool.
    ///
    /// Items are independent: each result is that item's outcome, in input
    /// order.
    pub fn ingest_batch(&self, version: &IndexVersion, items: &[IngestItem]) -> Vec<Result<VectorId>> {
        items
            .par_iter()
            .map(|item| {
                self.ingest(version, &item.vector, &item.modality, &item.external_id)
                    .map(|admission| admission.id())
            })
            .collect()
    }
}
