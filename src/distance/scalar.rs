//! Scalar distance function implementations.
//!
//! Every function here is a pure function of two equal-length slices and
//! returns a non-negative distance with `f(a, a) == 0`. Accumulation order is
//! fixed, so repeated calls on identical inputs are bit-identical.

/// Cosine distances below this are snapped to zero.
/// Absorbs the one-ulp error of `sqrt(n) * sqrt(n) != n`.
const COSINE_SNAP: f64 = 1e-12;

/// Compute the Euclidean (L2) distance between two vectors.
///
/// Returns sqrt(sum((a[i] - b[i])^2))
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    euclidean_distance_squared(a, b).sqrt()
}

/// Compute the squared Euclidean distance between two vectors.
///
/// Returns sum((a[i] - b[i])^2)
#[inline]
pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Compute the cosine similarity between two vectors.
///
/// Returns dot(a, b) / (||a|| * ||b||), accumulated in f64.
///
/// Two zero vectors are treated as identical (similarity 1.0); a zero vector
/// against a non-zero one has similarity 0.0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity_f64(a, b) as f32
}

fn cosine_similarity_f64(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0),
    }
}

/// Compute the cosine distance between two vectors.
///
/// Returns 1.0 - cosine_similarity(a, b)
///
/// Range: [0.0, 2.0] where 0.0 means identical direction.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let distance = 1.0 - cosine_similarity_f64(a, b);
    if distance <= COSINE_SNAP {
        0.0
    } else {
        distance as f32
    }
}

/// Compute the Manhattan (L1) distance between two vectors.
///
/// Returns sum(|a[i] - b[i]|)
#[inline]
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Compute the Chebyshev (L-infinity) distance between two vectors.
///
/// Returns max(|a[i] - b[i]|)
#[inline]
pub fn chebyshev_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max)
}

/// Compute the Minkowski distance of order `p`.
///
/// Returns (sum(|a[i] - b[i]|^p))^(1/p). `p = 1` is Manhattan, `p = 2` is
/// Euclidean, and an infinite `p` is Chebyshev.
///
/// # Panics
/// Panics if `p` is not strictly positive.
#[inline]
pub fn minkowski_distance(a: &[f32], b: &[f32], p: f32) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");
    assert!(p > 0.0, "Minkowski order must be positive, got {p}");

    if p.is_infinite() {
        return chebyshev_distance(a, b);
    }

    let p = p as f64;
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| ((x as f64) - (y as f64)).abs().powf(p))
        .sum();
    sum.powf(1.0 / p) as f32
}

/// Compute the Hamming distance: the number of differing components.
#[inline]
pub fn hamming_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as f32
}

/// Compute the Jaccard distance over the sets of non-zero components.
///
/// Returns 1 - |A ∩ B| / |A ∪ B| where A and B hold the indices of non-zero
/// components. Two all-zero vectors have distance 0.
#[inline]
pub fn jaccard_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (in_a, in_b) = (x != 0.0, y != 0.0);
        if in_a && in_b {
            intersection += 1;
        }
        if in_a || in_b {
            union += 1;
        }
    }

    if union == 0 {
        0.0
    } else {
        1.0 - intersection as f32 / union as f32
    }
}

/// Compute the Canberra distance.
///
/// Returns sum(|a[i] - b[i]| / (|a[i]| + |b[i]|)), skipping components where
/// both values are zero.
#[inline]
pub fn canberra_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let denom = x.abs() + y.abs();
            if denom == 0.0 {
                0.0
            } else {
                (x - y).abs() / denom
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert_eq!(euclidean_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_euclidean_distance_simple() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_identical_is_exactly_zero() {
        let a = vec![0.3, -1.7, 2.9, 0.01];
        assert_eq!(cosine_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vectors() {
        let zero = vec![0.0, 0.0];
        let one = vec![1.0, 0.0];
        assert_eq!(cosine_distance(&zero, &zero), 0.0);
        assert!((cosine_distance(&zero, &one) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_manhattan_distance_negative() {
        let a = vec![1.0, -2.0, 3.0];
        let b = vec![-1.0, 2.0, -3.0];
        // |1-(-1)| + |-2-2| + |3-(-3)| = 2 + 4 + 6 = 12
        assert!((manhattan_distance(&a, &b) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = vec![1.0, -2.0, 3.0];
        let b = vec![-1.0, 2.0, 2.5];
        assert!((chebyshev_distance(&a, &b) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_minkowski_special_cases() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((minkowski_distance(&a, &b, 1.0) - 7.0).abs() < 1e-5);
        assert!((minkowski_distance(&a, &b, 2.0) - 5.0).abs() < 1e-5);
        assert!((minkowski_distance(&a, &b, f32::INFINITY) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_hamming_distance() {
        let a = vec![1.0, 0.0, 2.0, 5.0];
        let b = vec![1.0, 1.0, 2.0, 4.0];
        assert_eq!(hamming_distance(&a, &b), 2.0);
    }

    #[test]
    fn test_jaccard_distance() {
        let a = vec![1.0, 1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 1.0, 0.0];
        // intersection {0}, union {0, 1, 2}
        assert!((jaccard_distance(&a, &b) - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(jaccard_distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_canberra_distance() {
        let a = vec![1.0, 0.0, 2.0];
        let b = vec![3.0, 0.0, 2.0];
        // |1-3|/(1+3) = 0.5, zero pair skipped, identical pair 0
        assert!((canberra_distance(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "Vector dimensions must match")]
    fn test_mismatched_lengths_panic() {
        manhattan_distance(&[1.0], &[1.0, 2.0]);
    }
}
