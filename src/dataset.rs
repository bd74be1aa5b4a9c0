//! Dataset utilities for generating and evaluating vector search.

use crate::distance::ResolvedMetric;
use crate::index::brute_force::BruteForceIndex;
use crate::vector::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// A dataset containing vectors, queries, and ground truth for evaluation.
pub struct Dataset {
    pub vectors: Vec<Vector>,
    pub queries: Vec<Vector>,
    pub ground_truth: Vec<Vec<u64>>,
}

/// Shape of a clustered synthetic dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSpec {
    /// Number of cluster centres, drawn uniformly from `[-1, 1]^dim`.
    pub clusters: usize,
    /// Vectors generated around each centre.
    pub per_cluster: usize,
    /// Queries, each drawn around a random centre.
    pub queries: usize,
    /// Dimensionality.
    pub dim: usize,
    /// Per-component offset bound: members are `centre + U(-spread, spread)`.
    pub spread: f32,
    /// RNG seed.
    pub seed: u64,
}

impl Dataset {
    /// Generate a random synthetic dataset.
    ///
    /// Creates `n_vectors` random vectors and `n_queries` random query vectors,
    /// all with the specified dimensionality, uniform in `[-1, 1]`.
    pub fn generate(n_vectors: usize, n_queries: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let vectors: Vec<Vector> = (0..n_vectors)
            .map(|i| Vector::random_with(&mut rng, i as u64, dim))
            .collect();

        let queries: Vec<Vector> = (0..n_queries)
            .map(|i| Vector::random_with(&mut rng, (n_vectors + i) as u64, dim))
            .collect();

        Self {
            vectors,
            queries,
            ground_truth: Vec::new(),
        }
    }

    /// Generate tight clusters around random centres.
    ///
    /// Vector ids run `0..clusters * per_cluster`, cluster by cluster. Query
    /// ids follow on from the last vector id.
    pub fn generate_clustered(spec: ClusterSpec) -> Self {
        let mut rng = StdRng::seed_from_u64(spec.seed);
        let centres: Vec<Vector> = (0..spec.clusters)
            .map(|c| Vector::random_with(&mut rng, c as u64, spec.dim))
            .collect();

        let jitter = |centre: &Vector, id: u64, rng: &mut StdRng| {
            let data = centre
                .data
                .iter()
                .map(|&x| x + rng.gen_range(-spec.spread..=spec.spread))
                .collect();
            Vector::new(id, data)
        };

        let mut vectors = Vec::with_capacity(spec.clusters * spec.per_cluster);
        for centre in &centres {
            for _ in 0..spec.per_cluster {
                let id = vectors.len() as u64;
                vectors.push(jitter(centre, id, &mut rng));
            }
        }

        let n_vectors = vectors.len();
        let queries = (0..spec.queries)
            .map(|i| {
                let centre = &centres[rng.gen_range(0..centres.len())];
                jitter(centre, (n_vectors + i) as u64, &mut rng)
            })
            .collect();

        Self {
            vectors,
            queries,
            ground_truth: Vec::new(),
        }
    }

    /// Compute ground truth nearest neighbors using brute force search.
    ///
    /// For each query, finds the k nearest neighbors and stores their IDs.
    pub fn compute_ground_truth(&mut self, k: usize, metric: ResolvedMetric) {
        let mut index = BruteForceIndex::new(metric);
        for vector in &self.vectors {
            index.add(vector.clone());
        }

        self.ground_truth = index
            .batch_search(&self.queries, k)
            .into_iter()
            .map(|results| results.into_iter().map(|(id, _)| id).collect())
            .collect();
    }

    /// Mean recall@k of per-query predictions against the ground truth.
    pub fn mean_recall(&self, predicted: &[Vec<u64>], k: usize) -> f32 {
        if predicted.is_empty() {
            return 0.0;
        }
        let total: f32 = predicted
            .iter()
            .zip(&self.ground_truth)
            .map(|(p, t)| recall_at_k(p, t, k))
            .sum();
        total / predicted.len() as f32
    }
}

/// Compute recall@k between predicted and ground truth results.
///
/// Recall is the fraction of true nearest neighbors that were found.
/// Returns a value between 0.0 and 1.0.
pub fn recall_at_k(predicted: &[u64], ground_truth: &[u64], k: usize) -> f32 {
    let pred_set: HashSet<u64> = predicted.iter().take(k).copied().collect();
    let truth_set: HashSet<u64> = ground_truth.iter().take(k).copied().collect();

    let intersection = pred_set.intersection(&truth_set).count();
    intersection as f32 / k as f32
}
