//! Core newtypes for type-safe indexing operations.
//!
//! These types provide compile-time guarantees that prevent mixing up
//! related but semantically different values (e.g., vector IDs vs curve keys).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a stored vector.
///
/// Using a newtype prevents accidentally passing a curve key where an ID is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VectorId(pub u64);

impl VectorId {
    /// Create a new VectorId.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorId({})", self.0)
    }
}

impl From<u64> for VectorId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<VectorId> for u64 {
    #[inline]
    fn from(id: VectorId) -> Self {
        id.0
    }
}

/// Monotonically increasing version number of a landmark set.
///
/// Version 0 marks a landmark set that has not been activated yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct LandmarkVersion(pub u64);

impl LandmarkVersion {
    /// Version carried by a landmark set before activation.
    pub const UNASSIGNED: LandmarkVersion = LandmarkVersion(0);

    /// Get the raw u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The version that follows this one.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LandmarkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Position of a grid cell along the Hilbert curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CurveKey(pub u128);

impl CurveKey {
    /// Smallest possible key.
    pub const MIN: CurveKey = CurveKey(0);

    /// Get the raw u128 value.
    #[inline]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Key `radius` steps before this one, stopping at zero.
    #[inline]
    pub const fn saturating_sub(self, radius: u128) -> Self {
        Self(self.0.saturating_sub(radius))
    }

    /// Key `radius` steps after this one, stopping at `max`.
    #[inline]
    pub fn saturating_add(self, radius: u128, max: CurveKey) -> Self {
        Self(self.0.saturating_add(radius).min(max.0))
    }

    /// Number of curve steps between two keys.
    #[inline]
    pub const fn abs_diff(self, other: CurveKey) -> u128 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// SHA-256 digest over raw vector bytes and modality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Borrow the digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough to tell fingerprints apart in logs.
        write!(f, "Fingerprint({}..)", &self.to_hex()[..12])
    }
}
