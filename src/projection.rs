//! Multilateration projection.
//!
//! A vector's coordinate is its tuple of distances to each landmark of a
//! [`LandmarkSet`], passed through the set's affine transform. The output is
//! a pure function of the vector, the landmark set, and the metric.

use crate::distance::Metric;
use crate::error::{IndexError, Result};
use crate::landmark::LandmarkSet;
use crate::types::{LandmarkVersion, VectorId};
use smallvec::SmallVec;

/// Projected coordinate; one value per landmark.
pub type Coordinate = SmallVec<[f32; 4]>;

/// A vector's coordinate under one landmark-set version.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPoint {
    /// Vector the coordinate belongs to.
    pub id: VectorId,
    /// Projected coordinate.
    pub coordinate: Coordinate,
    /// Landmark-set version the coordinate was computed under.
    pub version: LandmarkVersion,
}

/// Check that a vector has `dimension` finite components.
pub fn validate_vector(vector: &[f32], dimension: usize) -> Result<()> {
    if vector.len() != dimension {
        return Err(IndexError::invalid_vector(format!(
            "expected {dimension} components, got {}",
            vector.len()
        )));
    }
    if let Some(i) = vector.iter().position(|x| !x.is_finite()) {
        return Err(IndexError::invalid_vector(format!(
            "component {i} is {}",
            vector[i]
        )));
    }
    Ok(())
}

/// Project a vector against a landmark set.
///
/// # Errors
/// Returns [`IndexError::InvalidVector`] if the vector's length differs from
/// the landmark dimensionality or any component is NaN or infinite.
///
/// # Panics
/// In debug builds, panics if the metric returns a negative or NaN distance.
/// Release builds clamp such values to zero.
pub fn project(vector: &[f32], landmarks: &LandmarkSet, metric: &dyn Metric) -> Result<Coordinate> {
    validate_vector(vector, landmarks.dimension())?;

    let transform = landmarks.transform();
    let coordinate = landmarks
        .landmarks()
        .iter()
        .enumerate()
        .map(|(axis, landmark)| {
            let distance = metric.distance(vector, landmark);
            debug_assert!(
                distance >= 0.0,
                "metric '{}' returned {distance} for axis {axis}",
                metric.name()
            );
            // NaN fails the comparison and becomes zero too.
            let distance = if distance >= 0.0 { distance } else { 0.0 };
            transform.apply(axis, distance)
        })
        .collect();

    Ok(coordinate)
}

/// Project a vector and tag the result with its id and the set's version.
pub fn project_point(
    id: VectorId,
    vector: &[f32],
    landmarks: &LandmarkSet,
    metric: &dyn Metric,
) -> Result<ProjectedPoint> {
    Ok(ProjectedPoint {
        id,
        coordinate: project(vector, landmarks, metric)?,
        version: landmarks.version(),
    })
}
