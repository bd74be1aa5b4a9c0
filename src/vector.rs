use crate::types::{Fingerprint, VectorId};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A vector with an ID and floating-point data.
/// The data is stored in an Arc for cheap cloning.
#[derive(Clone, Debug)]
pub struct Vector {
    pub id: u64,
    pub data: Arc<[f32]>,
}

impl Vector {
    /// Create a new vector with the given ID and data.
    pub fn new(id: u64, data: Vec<f32>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Create a random vector with values uniformly distributed in [-1.0, 1.0].
    pub fn random(id: u64, dim: usize) -> Self {
        Self::random_with(&mut rand::thread_rng(), id, dim)
    }

    /// Like [`Vector::random`], drawing from the given generator.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, id: u64, dim: usize) -> Self {
        let data: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self::new(id, data)
    }

    /// Return the dimensionality of this vector.
    pub fn dim(&self) -> usize {
        self.data.len()
    }
}

impl AsRef<[f32]> for Vector {
    fn as_ref(&self) -> &[f32] {
        &self.data
    }
}

/// Content fingerprint over the raw little-endian bytes and the modality tag.
///
/// Both parts are length-prefixed so no two distinct inputs share a preimage.
pub fn fingerprint(raw: &[f32], modality: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((raw.len() as u64).to_le_bytes());
    for x in raw {
        hasher.update(x.to_le_bytes());
    }
    hasher.update((modality.len() as u64).to_le_bytes());
    hasher.update(modality.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Fingerprint(digest)
}

/// A stored vector. Immutable apart from its reference count.
#[derive(Debug)]
pub struct VectorRecord {
    id: VectorId,
    external_id: String,
    modality: String,
    fingerprint: Fingerprint,
    data: Arc<[f32]>,
    ref_count: AtomicU64,
}

impl VectorRecord {
    /// Create a record with a reference count of one.
    pub fn new(
        id: VectorId,
        external_id: impl Into<String>,
        modality: impl Into<String>,
        fingerprint: Fingerprint,
        data: Arc<[f32]>,
    ) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            modality: modality.into(),
            fingerprint,
            data,
            ref_count: AtomicU64::new(1),
        }
    }

    /// Internal id.
    pub fn id(&self) -> VectorId {
        self.id
    }

    /// Caller-supplied id from the first ingestion of this content.
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Modality tag, e.g. `"text"` or `"image"`.
    pub fn modality(&self) -> &str {
        &self.modality
    }

    /// Content fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Raw components.
    pub fn data(&self) -> &Arc<[f32]> {
        &self.data
    }

    /// Dimensionality D.
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// Components as little-endian bytes.
    pub fn raw_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    /// Number of times this content has been ingested.
    pub fn ref_count(&self) -> u64 {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Record one more ingestion; returns the new count.
    pub(crate) fn add_ref(&self) -> u64 {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }
}
