//! Distance metrics and the named metric registry.
//!
//! Built-in metrics are variants of [`DistanceMetric`]. Anything that
//! implements [`Metric`] can be registered under a name in a
//! [`MetricRegistry`]; names are resolved once, when a landmark set is
//! configured or a query starts, into a [`ResolvedMetric`] handle.

pub mod registry;
pub mod scalar;

pub use registry::{check_contract, MetricRegistry};
pub use scalar::{
    canberra_distance, chebyshev_distance, cosine_distance, euclidean_distance,
    hamming_distance, jaccard_distance, manhattan_distance, minkowski_distance,
};

use std::fmt;
use std::sync::Arc;

/// A distance function usable for projection and reranking.
///
/// Implementations must return a non-negative distance and satisfy
/// `distance(a, a) == 0`. A metric that is not symmetric must report so
/// through [`Metric::is_symmetric`].
pub trait Metric: Send + Sync + fmt::Debug {
    /// Stable name of this metric.
    fn name(&self) -> &str;

    /// Distance between two vectors of equal length.
    ///
    /// # Panics
    /// May panic if the slices have different lengths.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Whether `distance(a, b) == distance(b, a)` holds for all inputs.
    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Shared handle to a resolved metric.
pub type ResolvedMetric = Arc<dyn Metric>;

/// Supported built-in distance metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance: sqrt(sum((a[i] - b[i])^2))
    Euclidean,
    /// Cosine distance: 1 - cosine_similarity(a, b)
    /// Range [0, 2] where 0 means identical direction.
    Cosine,
    /// Manhattan (L1) distance: sum(|a[i] - b[i]|)
    Manhattan,
    /// Chebyshev (L-infinity) distance: max(|a[i] - b[i]|)
    Chebyshev,
    /// Minkowski distance of order p: (sum(|a[i] - b[i]|^p))^(1/p)
    Minkowski(f32),
    /// Number of differing components.
    Hamming,
    /// Jaccard distance over the sets of non-zero components.
    Jaccard,
    /// Canberra distance: sum(|a[i] - b[i]| / (|a[i]| + |b[i]|))
    Canberra,
}

impl DistanceMetric {
    /// Minkowski order registered under the plain `"minkowski"` name.
    pub const DEFAULT_MINKOWSKI_P: f32 = 3.0;

    /// Every built-in metric with its registry name.
    pub fn builtins() -> [(&'static str, DistanceMetric); 8] {
        [
            ("euclidean", DistanceMetric::Euclidean),
            ("cosine", DistanceMetric::Cosine),
            ("manhattan", DistanceMetric::Manhattan),
            ("chebyshev", DistanceMetric::Chebyshev),
            (
                "minkowski",
                DistanceMetric::Minkowski(Self::DEFAULT_MINKOWSKI_P),
            ),
            ("hamming", DistanceMetric::Hamming),
            ("jaccard", DistanceMetric::Jaccard),
            ("canberra", DistanceMetric::Canberra),
        ]
    }

    /// Compute the distance between two vectors using this metric.
    ///
    /// # Panics
    /// Panics if the vectors have different dimensions.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Manhattan => manhattan_distance(a, b),
            DistanceMetric::Chebyshev => chebyshev_distance(a, b),
            DistanceMetric::Minkowski(p) => minkowski_distance(a, b, *p),
            DistanceMetric::Hamming => hamming_distance(a, b),
            DistanceMetric::Jaccard => jaccard_distance(a, b),
            DistanceMetric::Canberra => canberra_distance(a, b),
        }
    }
}

impl Metric for DistanceMetric {
    fn name(&self) -> &str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Chebyshev => "chebyshev",
            DistanceMetric::Minkowski(_) => "minkowski",
            DistanceMetric::Hamming => "hamming",
            DistanceMetric::Jaccard => "jaccard",
            DistanceMetric::Canberra => "canberra",
        }
    }

    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.compute(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_metric_euclidean() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        let dist = DistanceMetric::Euclidean.compute(&a, &b);
        assert!((dist - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_distance_metric_manhattan() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        let dist = DistanceMetric::Manhattan.compute(&a, &b);
        assert!((dist - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_builtin_names_match_metric_names() {
        for (name, metric) in DistanceMetric::builtins() {
            assert_eq!(Metric::name(&metric), name);
            assert!(metric.is_symmetric());
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let metric: ResolvedMetric = Arc::new(DistanceMetric::Chebyshev);
        assert!((metric.distance(&[0.0, 5.0], &[1.0, 1.0]) - 4.0).abs() < 1e-6);
    }
}
