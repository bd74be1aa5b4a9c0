//! Correctness tests for the building blocks: metrics, the curve, and
//! projection.
//!
//! Run with: cargo test

use landmark_index::distance::scalar;
use landmark_index::{
    check_contract, project, CurveIndexer, CurveKey, DistanceMetric, LandmarkSet, Metric,
    MetricRegistry, Vector,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn samples(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

#[test]
fn test_every_builtin_metric_honours_contract() {
    let registry = MetricRegistry::with_builtins();
    let mut data = samples(24, 16, 7);
    // Sparse and zero vectors exercise the set-based metrics.
    data.push(vec![0.0; 16]);
    let mut sparse = vec![0.0; 16];
    sparse[3] = 1.0;
    sparse[9] = -2.0;
    data.push(sparse);

    for name in registry.names() {
        let metric = registry.resolve(&name).unwrap();
        if let Err(violation) = check_contract(metric.as_ref(), &data) {
            panic!("metric {name} broke its contract: {violation}");
        }
    }
}

#[test]
fn test_metric_enum_matches_scalar_kernels() {
    let dims = vec![1, 7, 8, 15, 16, 64, 128, 256];

    for dim in dims {
        let v1 = Vector::random(1, dim);
        let v2 = Vector::random(2, dim);

        let pairs = [
            (
                DistanceMetric::Euclidean.distance(&v1.data, &v2.data),
                scalar::euclidean_distance(&v1.data, &v2.data),
            ),
            (
                DistanceMetric::Manhattan.distance(&v1.data, &v2.data),
                scalar::manhattan_distance(&v1.data, &v2.data),
            ),
            (
                DistanceMetric::Minkowski(2.0).distance(&v1.data, &v2.data),
                scalar::euclidean_distance(&v1.data, &v2.data),
            ),
            (
                DistanceMetric::Minkowski(1.0).distance(&v1.data, &v2.data),
                scalar::manhattan_distance(&v1.data, &v2.data),
            ),
        ];

        for (via_metric, via_kernel) in pairs {
            let diff = (via_metric - via_kernel).abs();
            assert!(
                diff < 1e-3 * via_kernel.max(1.0),
                "mismatch at dim {}: metric={}, kernel={}, diff={}",
                dim,
                via_metric,
                via_kernel,
                diff
            );
        }
    }
}

#[test]
fn test_custom_metric_is_usable_for_projection() {
    let registry = MetricRegistry::with_builtins();
    registry
        .register_fn("scaled_l1", |a, b| {
            2.0 * a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f32>()
        })
        .unwrap();
    let metric = registry.resolve("scaled_l1").unwrap();
    check_contract(metric.as_ref(), &samples(10, 4, 1)).unwrap();

    let landmarks = LandmarkSet::orthonormal_basis(3, 4, "scaled_l1").unwrap();
    let coordinate = project(&[0.0, 0.0, 0.0, 0.0], &landmarks, metric.as_ref()).unwrap();
    assert_eq!(coordinate.as_slice(), &[2.0, 2.0, 2.0]);
}

#[test]
fn test_asymmetric_metric_skips_symmetry_check() {
    let registry = MetricRegistry::empty();
    registry
        .register_asymmetric_fn("one_sided", |a, b| {
            a.iter().zip(b).map(|(x, y)| (x - y).max(0.0)).sum()
        })
        .unwrap();
    let metric = registry.resolve("one_sided").unwrap();
    assert!(!metric.is_symmetric());
    check_contract(metric.as_ref(), &samples(10, 4, 2)).unwrap();
}

#[test]
fn test_curve_round_trip_for_every_key() {
    let curve = CurveIndexer::new(3, 5, (0.0, 1.0)).unwrap();
    let max = curve.max_key().as_u128();
    assert_eq!(max, (1u128 << 15) - 1);

    for k in 0..=max {
        let key = CurveKey(k);
        let coordinate = curve.from_key(key);
        assert_eq!(curve.to_key(&coordinate), key, "round trip failed for key {key}");
    }
}

#[test]
fn test_curve_consecutive_keys_are_grid_neighbours() {
    for (axes, bits) in [(3usize, 4u32), (4, 3)] {
        let curve = CurveIndexer::new(axes, bits, (0.0, 1.0)).unwrap();
        let max = curve.max_key().as_u128();
        let mut previous = curve.decode_cell(CurveKey(0));
        for k in 1..=max {
            let cell = curve.decode_cell(CurveKey(k));
            let step: u32 = previous.iter().zip(&cell).map(|(a, b)| a.abs_diff(*b)).sum();
            assert_eq!(step, 1, "keys {} and {} are not adjacent cells", k - 1, k);
            previous = cell;
        }
    }
}

#[test]
fn test_curve_clamps_out_of_range_coordinates() {
    let curve = CurveIndexer::new(3, 6, (0.0, 1.0)).unwrap();
    let corner = curve.to_key(&[0.0, 0.0, 0.0]);
    assert_eq!(curve.to_key(&[-5.0, -0.1, f32::NEG_INFINITY]), corner);

    let top = curve.to_key(&[1.0, 1.0, 1.0]);
    assert_eq!(curve.to_key(&[7.0, 1.5, f32::INFINITY]), top);
}

#[test]
fn test_projection_is_deterministic() {
    let data = samples(200, 32, 11);
    let registry = MetricRegistry::with_builtins();
    let landmarks = LandmarkSet::select_farthest_first(&data, 4, "euclidean", &registry).unwrap();
    let metric = registry.resolve("euclidean").unwrap();
    let calibrated = landmarks.calibrate(&data, metric.as_ref()).unwrap();

    for v in data.iter().take(20) {
        let first = project(v, &calibrated, metric.as_ref()).unwrap();
        let second = project(v, &calibrated, metric.as_ref()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(
            first.iter().all(|c| (-1e-4..=1.0 + 1e-4).contains(c)),
            "calibrated coordinate {first:?} outside [0, 1]"
        );
    }
}
