//! Versioned curve index and the exact baseline.

pub mod brute_force;
pub mod catalog;

pub use brute_force::BruteForceIndex;
pub use catalog::{IndexVersion, VersionCatalog};
