//! Landmark sets: the reference vectors a projection measures against.
//!
//! A [`LandmarkSet`] holds K reference vectors of dimensionality D, one axis
//! label per landmark, the name of the metric the projection uses, and an
//! affine transform that normalizes the resulting distances. Sets are built
//! unversioned; the engine stamps a version when it activates one.

use crate::aggregate::{aggregate_parallel, AxisRange};
use crate::distance::{Metric, MetricRegistry};
use crate::error::{IndexError, Result};
use crate::projection::{self, Coordinate};
use crate::types::LandmarkVersion;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Minimum number of landmarks: a projection has at least three axes.
pub const MIN_LANDMARKS: usize = 3;

/// Per-axis affine normalization: `(distance - offset) * scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    offset: SmallVec<[f32; 4]>,
    scale: SmallVec<[f32; 4]>,
}

impl AffineTransform {
    /// Transform that leaves every axis unchanged.
    pub fn identity(axes: usize) -> Self {
        Self {
            offset: SmallVec::from_elem(0.0, axes),
            scale: SmallVec::from_elem(1.0, axes),
        }
    }

    /// Build a transform from per-axis offsets and scales.
    pub fn new(offset: &[f32], scale: &[f32]) -> Result<Self> {
        if offset.len() != scale.len() {
            return Err(IndexError::invalid_parameter(format!(
                "affine transform has {} offsets but {} scales",
                offset.len(),
                scale.len()
            )));
        }
        if offset.iter().any(|o| !o.is_finite()) {
            return Err(IndexError::invalid_parameter("affine offsets must be finite"));
        }
        if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(IndexError::invalid_parameter(
                "affine scales must be finite and non-zero",
            ));
        }
        Ok(Self {
            offset: SmallVec::from_slice(offset),
            scale: SmallVec::from_slice(scale),
        })
    }

    /// Number of axes this transform covers.
    pub fn axes(&self) -> usize {
        self.offset.len()
    }

    /// Apply the transform to one axis value.
    #[inline]
    pub fn apply(&self, axis: usize, value: f32) -> f32 {
        (value - self.offset[axis]) * self.scale[axis]
    }

    /// Whether this transform is the identity.
    pub fn is_identity(&self) -> bool {
        self.offset.iter().all(|&o| o == 0.0) && self.scale.iter().all(|&s| s == 1.0)
    }
}

/// An ordered, versioned collection of reference vectors.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    version: LandmarkVersion,
    dimension: usize,
    landmarks: Vec<Arc<[f32]>>,
    labels: Vec<String>,
    metric_name: String,
    transform: AffineTransform,
    bounds: Option<(f32, f32)>,
}

impl LandmarkSet {
    /// Create an unversioned landmark set.
    ///
    /// Labels default to `L0, L1, ...`; the transform defaults to identity.
    ///
    /// # Errors
    /// Fails if there are fewer than three landmarks, the landmarks disagree
    /// on dimensionality, or any component is NaN or infinite.
    pub fn new(landmarks: Vec<Vec<f32>>, metric_name: impl Into<String>) -> Result<Self> {
        if landmarks.len() < MIN_LANDMARKS {
            return Err(IndexError::invalid_parameter(format!(
                "a landmark set needs at least {MIN_LANDMARKS} landmarks, got {}",
                landmarks.len()
            )));
        }
        let dimension = landmarks[0].len();
        if dimension == 0 {
            return Err(IndexError::invalid_parameter("landmarks must not be empty vectors"));
        }
        for (i, landmark) in landmarks.iter().enumerate() {
            if landmark.len() != dimension {
                return Err(IndexError::invalid_parameter(format!(
                    "landmark {i} has {} components, expected {dimension}",
                    landmark.len()
                )));
            }
            if landmark.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::invalid_parameter(format!(
                    "landmark {i} has a non-finite component"
                )));
            }
        }

        let axes = landmarks.len();
        Ok(Self {
            version: LandmarkVersion::UNASSIGNED,
            dimension,
            labels: (0..axes).map(|i| format!("L{i}")).collect(),
            landmarks: landmarks.into_iter().map(Arc::from).collect(),
            metric_name: metric_name.into(),
            transform: AffineTransform::identity(axes),
            bounds: None,
        })
    }

    /// The first `k` standard basis vectors of a `dimension`-dimensional space.
    pub fn orthonormal_basis(
        k: usize,
        dimension: usize,
        metric_name: impl Into<String>,
    ) -> Result<Self> {
        if k > dimension {
            return Err(IndexError::invalid_parameter(format!(
                "cannot take {k} orthonormal vectors in {dimension} dimensions"
            )));
        }
        let landmarks = (0..k)
            .map(|i| {
                let mut v = vec![0.0f32; dimension];
                v[i] = 1.0;
                v
            })
            .collect();
        Self::new(landmarks, metric_name)
    }

    /// Pick `k` well-spread landmarks from a sample by farthest-point traversal.
    ///
    /// Starts from the first sample and repeatedly adds the sample whose
    /// distance to its nearest chosen landmark is largest (lowest index on
    /// ties). Deterministic for a given sample order.
    pub fn select_farthest_first<S>(
        sample: &[S],
        k: usize,
        metric_name: &str,
        registry: &MetricRegistry,
    ) -> Result<Self>
    where
        S: AsRef<[f32]> + Sync,
    {
        let metric = registry.resolve(metric_name)?;
        if k < MIN_LANDMARKS {
            return Err(IndexError::invalid_parameter(format!(
                "a landmark set needs at least {MIN_LANDMARKS} landmarks, got {k}"
            )));
        }
        if sample.len() < k {
            return Err(IndexError::invalid_parameter(format!(
                "need at least {k} samples to select {k} landmarks, got {}",
                sample.len()
            )));
        }

        let mut chosen = vec![0usize];
        let mut nearest: Vec<f32> = sample
            .par_iter()
            .map(|s| metric.distance(s.as_ref(), sample[0].as_ref()))
            .collect();

        while chosen.len() < k {
            let (best, best_distance) = nearest
                .iter()
                .copied()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |acc, (i, d)| {
                    if d > acc.1 {
                        (i, d)
                    } else {
                        acc
                    }
                });
            if best_distance <= 0.0 {
                return Err(IndexError::invalid_parameter(format!(
                    "sample has fewer than {k} distinct vectors"
                )));
            }
            chosen.push(best);

            let pick = sample[best].as_ref();
            nearest
                .par_iter_mut()
                .zip(sample.par_iter())
                .for_each(|(current, s)| {
                    *current = current.min(metric.distance(s.as_ref(), pick));
                });
        }

        let landmarks = chosen.iter().map(|&i| sample[i].as_ref().to_vec()).collect();
        Self::new(landmarks, metric_name)
    }

    /// Replace the axis labels.
    pub fn with_labels<L: Into<String>>(mut self, labels: Vec<L>) -> Result<Self> {
        if labels.len() != self.landmarks.len() {
            return Err(IndexError::invalid_parameter(format!(
                "{} labels given for {} landmarks",
                labels.len(),
                self.landmarks.len()
            )));
        }
        self.labels = labels.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Replace the affine transform.
    pub fn with_transform(mut self, transform: AffineTransform) -> Result<Self> {
        if transform.axes() != self.landmarks.len() {
            return Err(IndexError::invalid_parameter(format!(
                "transform covers {} axes but the set has {} landmarks",
                transform.axes(),
                self.landmarks.len()
            )));
        }
        self.transform = transform;
        Ok(self)
    }

    /// Override the coordinate range mapped onto the curve grid.
    pub fn with_bounds(mut self, lo: f32, hi: f32) -> Result<Self> {
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(IndexError::invalid_parameter(format!(
                "bounds must be finite with lo < hi, got ({lo}, {hi})"
            )));
        }
        self.bounds = Some((lo, hi));
        Ok(self)
    }

    /// Fit the affine transform so the sample's distance range maps onto `[0, 1]`.
    ///
    /// Sets the grid bounds to `[0, 1]`. Axes on which every sample has the
    /// same distance keep a unit scale.
    pub fn calibrate<S>(self, sample: &[S], metric: &dyn Metric) -> Result<Self>
    where
        S: AsRef<[f32]> + Sync,
    {
        let axes = self.axes();
        let raw = self.with_transform(AffineTransform::identity(axes))?;

        let coordinates: Vec<Coordinate> = sample
            .par_iter()
            .map(|s| projection::project(s.as_ref(), &raw, metric))
            .collect::<Result<_>>()?;

        let ranges = aggregate_parallel(&AxisRange { axes }, &coordinates)
            .ok_or_else(|| IndexError::invalid_parameter("calibration sample is empty"))?;

        let offset: Vec<f32> = ranges.iter().map(|&(lo, _)| lo).collect();
        let scale: Vec<f32> = ranges
            .iter()
            .map(|&(lo, hi)| if hi > lo { 1.0 / (hi - lo) } else { 1.0 })
            .collect();

        tracing::debug!(axes, samples = sample.len(), ?ranges, "calibrated landmark transform");

        raw.with_transform(AffineTransform::new(&offset, &scale)?)?
            .with_bounds(0.0, 1.0)
    }

    pub(crate) fn into_version(mut self, version: LandmarkVersion) -> Self {
        self.version = version;
        self
    }

    /// Version stamped at activation, or [`LandmarkVersion::UNASSIGNED`].
    pub fn version(&self) -> LandmarkVersion {
        self.version
    }

    /// Dimensionality D of each landmark.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of landmarks K, which is also the number of projected axes.
    pub fn axes(&self) -> usize {
        self.landmarks.len()
    }

    /// The landmark vectors in axis order.
    pub fn landmarks(&self) -> &[Arc<[f32]>] {
        &self.landmarks
    }

    /// Axis labels in axis order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Name of the metric projections under this set use.
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// The affine normalization.
    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Grid bounds carried by the set, if any.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        self.bounds
    }
}
