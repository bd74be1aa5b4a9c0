//! Named metric registry.
//!
//! The registry is closed over what has been registered: resolving an
//! unknown name fails with [`IndexError::UnknownMetric`] and registering a
//! name twice fails with [`IndexError::DuplicateMetric`].

use super::{DistanceMetric, Metric, ResolvedMetric};
use crate::error::{IndexError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type DistanceFn = dyn Fn(&[f32], &[f32]) -> f32 + Send + Sync;

/// A metric backed by a closure.
struct FnMetric {
    name: String,
    f: Box<DistanceFn>,
    symmetric: bool,
}

impl fmt::Debug for FnMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMetric")
            .field("name", &self.name)
            .field("symmetric", &self.symmetric)
            .finish()
    }
}

impl Metric for FnMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        (self.f)(a, b)
    }

    fn is_symmetric(&self) -> bool {
        self.symmetric
    }
}

/// Registry mapping metric names to implementations.
///
/// Safe to share between threads; lookups take a short read lock.
pub struct MetricRegistry {
    metrics: RwLock<HashMap<String, ResolvedMetric>>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl MetricRegistry {
    /// Create a registry with no metrics.
    pub fn empty() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry holding every [`DistanceMetric`] under its name.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        {
            let mut metrics = registry.metrics.write();
            for (name, metric) in DistanceMetric::builtins() {
                metrics.insert(name.to_string(), Arc::new(metric) as ResolvedMetric);
            }
        }
        registry
    }

    /// Register a metric under `name`.
    pub fn register(&self, name: impl Into<String>, metric: ResolvedMetric) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IndexError::invalid_parameter("metric name must not be empty"));
        }

        let mut metrics = self.metrics.write();
        if metrics.contains_key(&name) {
            return Err(IndexError::DuplicateMetric(name));
        }
        tracing::debug!(metric = %name, symmetric = metric.is_symmetric(), "registered metric");
        metrics.insert(name, metric);
        Ok(())
    }

    /// Register a symmetric metric given as a closure.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        self.register_closure(name.into(), f, true)
    }

    /// Register a metric given as a closure that is not symmetric.
    pub fn register_asymmetric_fn<F>(&self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        self.register_closure(name.into(), f, false)
    }

    fn register_closure<F>(&self, name: String, f: F, symmetric: bool) -> Result<()>
    where
        F: Fn(&[f32], &[f32]) -> f32 + Send + Sync + 'static,
    {
        let metric = FnMetric {
            name: name.clone(),
            f: Box::new(f),
            symmetric,
        };
        self.register(name, Arc::new(metric))
    }

    /// Look up a metric by name.
    pub fn resolve(&self, name: &str) -> Result<ResolvedMetric> {
        self.metrics
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::unknown_metric(name))
    }

    /// Whether a metric is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    /// Return true if no metrics are registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }
}

/// Check the metric contract on every pair drawn from `samples`.
///
/// Verifies `distance(a, a) == 0`, non-negativity, and, for symmetric
/// metrics, `distance(a, b) == distance(b, a)`. Returns a description of the
/// first violation found.
pub fn check_contract(metric: &dyn Metric, samples: &[Vec<f32>]) -> std::result::Result<(), String> {
    for (i, a) in samples.iter().enumerate() {
        let self_distance = metric.distance(a, a);
        if self_distance != 0.0 {
            return Err(format!(
                "{}: distance(s{i}, s{i}) = {self_distance}, expected 0",
                metric.name()
            ));
        }

        for (j, b) in samples.iter().enumerate().skip(i + 1) {
            let forward = metric.distance(a, b);
            if forward < 0.0 || forward.is_nan() {
                return Err(format!(
                    "{}: distance(s{i}, s{j}) = {forward} is not a non-negative number",
                    metric.name()
                ));
            }
            if metric.is_symmetric() {
                let backward = metric.distance(b, a);
                if forward != backward {
                    return Err(format!(
                        "{}: distance(s{i}, s{j}) = {forward} but distance(s{j}, s{i}) = {backward}",
                        metric.name()
                    ));
                }
            }
        }
    }
    Ok(())
}
