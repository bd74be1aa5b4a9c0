//! Raw vector records, addressable by id and by content fingerprint.

use crate::error::{IndexError, Result};
use crate::types::{Fingerprint, VectorId};
use crate::vector::VectorRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of admitting content into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// New content; a record was created and indexed.
    Created(VectorId),
    /// Known content; the existing record's reference count was raised.
    Existing {
        /// Id of the existing record.
        id: VectorId,
        /// Reference count after this ingestion.
        ref_count: u64,
    },
}

impl Admission {
    /// Id of the record, new or existing.
    pub fn id(&self) -> VectorId {
        match *self {
            Admission::Created(id) | Admission::Existing { id, .. } => id,
        }
    }

    /// Whether this admission created a record.
    pub fn is_new(&self) -> bool {
        matches!(self, Admission::Created(_))
    }
}

/// Concurrent map of vector records with fingerprint deduplication.
#[derive(Debug, Default)]
pub struct VectorStore {
    by_fingerprint: DashMap<Fingerprint, VectorId>,
    records: DashMap<VectorId, Arc<VectorRecord>>,
    next_id: AtomicU64,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit content with the given fingerprint.
    ///
    /// The fingerprint's map entry stays locked for the whole call, so
    /// concurrent admissions of identical content serialize: exactly one
    /// runs `make_record` and `index`, every other one raises the reference
    /// count of the record it created.
    ///
    /// `index` runs after the record is visible by id. If it fails the record
    /// is removed again and nothing about the fingerprint is remembered.
    pub fn admit<M, I>(&self, fingerprint: Fingerprint, make_record: M, index: I) -> Result<Admission>
    where
        M: FnOnce(VectorId) -> VectorRecord,
        I: FnOnce(&VectorRecord) -> Result<()>,
    {
        match self.by_fingerprint.entry(fingerprint) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                let record = self.get(id).ok_or(IndexError::VectorNotFound(id))?;
                Ok(Admission::Existing {
                    id,
                    ref_count: record.add_ref(),
                })
            }
            Entry::Vacant(entry) => {
                let id = VectorId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let record = Arc::new(make_record(id));
                self.records.insert(id, Arc::clone(&record));
                if let Err(e) = index(&record) {
                    self.records.remove(&id);
                    return Err(e);
                }
                entry.insert(id);
                Ok(Admission::Created(id))
            }
        }
    }

    /// Record by id.
    pub fn get(&self, id: VectorId) -> Option<Arc<VectorRecord>> {
        self.records.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Raw components by id.
    pub fn get_raw(&self, id: VectorId) -> Option<Arc<[f32]>> {
        self.records.get(&id).map(|r| Arc::clone(r.data()))
    }

    /// Raw little-endian bytes by id.
    pub fn get_raw_bytes(&self, id: VectorId) -> Result<Vec<u8>> {
        self.records
            .get(&id)
            .map(|r| r.raw_bytes())
            .ok_or(IndexError::VectorNotFound(id))
    }

    /// Id of the record holding this content, if any.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<VectorId> {
        self.by_fingerprint.get(fingerprint).map(|id| *id)
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Vec<Arc<VectorRecord>> {
        let mut records: Vec<Arc<VectorRecord>> =
            self.records.iter().map(|r| Arc::clone(r.value())).collect();
        records.sort_unstable_by_key(|r| r.id());
        records
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of reference counts across all records.
    pub fn total_references(&self) -> u64 {
        self.records.iter().map(|r| r.ref_count()).sum()
    }
}
