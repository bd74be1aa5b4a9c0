//! Brute force index for exact nearest neighbor search.
//!
//! This implementation serves as the ground truth baseline for the curve
//! index. It computes distances to all vectors and returns the k closest,
//! breaking distance ties by id so results are reproducible.

use crate::distance::ResolvedMetric;
use crate::types::VectorId;
use crate::vector::Vector;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A vector id with its computed distance, used for heap operations.
///
/// Ordered by distance, then id. `BinaryHeap` is a max-heap, so `peek()`
/// yields the current worst result when keeping the k best.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoredVector {
    pub(crate) id: VectorId,
    pub(crate) distance: f32,
}

impl PartialEq for ScoredVector {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredVector {}

impl PartialOrd for ScoredVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredVector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

/// Push into a heap holding at most `k` best results.
#[inline]
pub(crate) fn push_bounded(heap: &mut BinaryHeap<ScoredVector>, item: ScoredVector, k: usize) {
    if heap.len() < k {
        heap.push(item);
    } else if let Some(worst) = heap.peek() {
        if item < *worst {
            heap.pop();
            heap.push(item);
        }
    }
}

/// Drain a heap into ascending `(id, distance)` order.
pub(crate) fn into_sorted(heap: BinaryHeap<ScoredVector>) -> Vec<ScoredVector> {
    heap.into_sorted_vec()
}

/// Brute force index that performs exact nearest neighbor search.
///
/// This index computes distances to all stored vectors for each query,
/// guaranteeing 100% recall at the cost of O(n) search time.
pub struct BruteForceIndex {
    vectors: Vec<Vector>,
    metric: ResolvedMetric,
}

impl BruteForceIndex {
    /// Create a new empty brute force index with the given distance metric.
    pub fn new(metric: ResolvedMetric) -> Self {
        Self {
            vectors: Vec::new(),
            metric,
        }
    }

    /// Add a vector to the index.
    pub fn add(&mut self, vector: Vector) {
        self.vectors.push(vector);
    }

    /// Return the number of vectors in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Return true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Search for the k nearest neighbors using basic linear scan.
    ///
    /// Returns a vector of (id, distance) pairs sorted by distance, then id.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(u64, f32)> {
        let mut heap: BinaryHeap<ScoredVector> = BinaryHeap::with_capacity(k + 1);

        for vector in &self.vectors {
            let distance = self.metric.distance(query, &vector.data);
            push_bounded(
                &mut heap,
                ScoredVector {
                    id: VectorId(vector.id),
                    distance,
                },
                k,
            );
        }

        into_sorted(heap)
            .into_iter()
            .map(|sv| (sv.id.0, sv.distance))
            .collect()
    }

    /// Parallel search using Rayon for multi-core scaling.
    ///
    /// Divides the vector set into chunks, processes each chunk in parallel,
    /// then merges results.
    pub fn search_parallel(&self, query: &[f32], k: usize) -> Vec<(u64, f32)> {
        const CHUNK_SIZE: usize = 1000;

        let final_heap = self
            .vectors
            .par_chunks(CHUNK_SIZE)
            .map(|chunk| {
                let mut local_heap: BinaryHeap<ScoredVector> = BinaryHeap::with_capacity(k + 1);
                for vector in chunk {
                    let distance = self.metric.distance(query, &vector.data);
                    push_bounded(
                        &mut local_heap,
                        ScoredVector {
                            id: VectorId(vector.id),
                            distance,
                        },
                        k,
                    );
                }
                local_heap
            })
            .reduce(
                || BinaryHeap::with_capacity(k + 1),
                |mut a, b| {
                    for item in b {
                        push_bounded(&mut a, item, k);
                    }
                    a
                },
            );

        into_sorted(final_heap)
            .into_iter()
            .map(|sv| (sv.id.0, sv.distance))
            .collect()
    }

    /// Batch search for multiple queries in parallel.
    ///
    /// Returns results for each query in the same order as the input.
    pub fn batch_search(&self, queries: &[Vector], k: usize) -> Vec<Vec<(u64, f32)>> {
        queries
            .par_iter()
            .map(|query| self.search_parallel(&query.data, k))
            .collect()
    }
}
