//! Mergeable streaming aggregates.
//!
//! An [`Aggregate`] describes `init -> accumulate* -> merge* -> finalize`, so
//! the same statistic can be computed sequentially or split across Rayon
//! workers and merged, the way the brute-force index merges per-chunk heaps.

use crate::projection::Coordinate;
use rayon::prelude::*;

/// An accumulate-merge-finalize computation over a stream of items.
///
/// `merge` must be associative and `init()` must be its identity, so that the
/// result does not depend on how the stream was partitioned.
pub trait Aggregate {
    /// Input element.
    type Item;
    /// Partial result.
    type State: Send;
    /// Final result.
    type Output;

    /// Fresh, empty state.
    fn init(&self) -> Self::State;

    /// Fold one item into a state.
    fn accumulate(&self, state: Self::State, item: &Self::Item) -> Self::State;

    /// Combine two partial states.
    fn merge(&self, a: Self::State, b: Self::State) -> Self::State;

    /// Turn a state into the result.
    fn finalize(&self, state: Self::State) -> Self::Output;
}

/// Run an aggregate over a slice on the current thread.
pub fn aggregate<A: Aggregate>(agg: &A, items: &[A::Item]) -> A::Output {
    let state = items
        .iter()
        .fold(agg.init(), |state, item| agg.accumulate(state, item));
    agg.finalize(state)
}

/// Run an aggregate over a slice using the Rayon pool.
pub fn aggregate_parallel<A>(agg: &A, items: &[A::Item]) -> A::Output
where
    A: Aggregate + Sync,
    A::Item: Sync,
{
    let state = items
        .par_iter()
        .fold(|| agg.init(), |state, item| agg.accumulate(state, item))
        .reduce(|| agg.init(), |a, b| agg.merge(a, b));
    agg.finalize(state)
}

/// Per-axis minimum and maximum over a set of coordinates.
///
/// Output is `None` when no coordinates were seen.
#[derive(Debug, Clone, Copy)]
pub struct AxisRange {
    /// Number of axes in every coordinate.
    pub axes: usize,
}

impl Aggregate for AxisRange {
    type Item = Coordinate;
    type State = Option<Vec<(f32, f32)>>;
    type Output = Option<Vec<(f32, f32)>>;

    fn init(&self) -> Self::State {
        None
    }

    fn accumulate(&self, state: Self::State, item: &Coordinate) -> Self::State {
        debug_assert_eq!(item.len(), self.axes);
        let mut ranges = state.unwrap_or_else(|| vec![(f32::INFINITY, f32::NEG_INFINITY); self.axes]);
        for (range, &value) in ranges.iter_mut().zip(item.iter()) {
            range.0 = range.0.min(value);
            range.1 = range.1.max(value);
        }
        Some(ranges)
    }

    fn merge(&self, a: Self::State, b: Self::State) -> Self::State {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(mut a), Some(b)) => {
                for (left, right) in a.iter_mut().zip(b) {
                    left.0 = left.0.min(right.0);
                    left.1 = left.1.max(right.1);
                }
                Some(a)
            }
        }
    }

    fn finalize(&self, state: Self::State) -> Self::Output {
        state
    }
}

/// Running co-moments for Pearson correlation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrelationState {
    n: u64,
    mean_x: f64,
    mean_y: f64,
    m2_x: f64,
    m2_y: f64,
    c_xy: f64,
}

/// Pearson correlation of `(x, y)` pairs, computed with mergeable co-moments.
///
/// Output is in `[-1, 1]`; it is `0.0` when either variable is constant or
/// fewer than two pairs were seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct Correlation;

impl Aggregate for Correlation {
    type Item = (f64, f64);
    type State = CorrelationState;
    type Output = f64;

    fn init(&self) -> Self::State {
        CorrelationState::default()
    }

    fn accumulate(&self, mut s: Self::State, &(x, y): &(f64, f64)) -> Self::State {
        s.n += 1;
        let n = s.n as f64;
        let dx = x - s.mean_x;
        s.mean_x += dx / n;
        let dy = y - s.mean_y;
        s.mean_y += dy / n;
        s.m2_x += dx * (x - s.mean_x);
        s.m2_y += dy * (y - s.mean_y);
        s.c_xy += dx * (y - s.mean_y);
        s
    }

    fn merge(&self, a: Self::State, b: Self::State) -> Self::State {
        if a.n == 0 {
            return b;
        }
        if b.n == 0 {
            return a;
        }
        let (na, nb) = (a.n as f64, b.n as f64);
        let n = na + nb;
        let dx = b.mean_x - a.mean_x;
        let dy = b.mean_y - a.mean_y;
        let weight = na * nb / n;
        CorrelationState {
            n: a.n + b.n,
            mean_x: a.mean_x + dx * nb / n,
            mean_y: a.mean_y + dy * nb / n,
            m2_x: a.m2_x + b.m2_x + dx * dx * weight,
            m2_y: a.m2_y + b.m2_y + dy * dy * weight,
            c_xy: a.c_xy + b.c_xy + dx * dy * weight,
        }
    }

    fn finalize(&self, s: Self::State) -> f64 {
        if s.n < 2 || s.m2_x <= 0.0 || s.m2_y <= 0.0 {
            return 0.0;
        }
        (s.c_xy / (s.m2_x.sqrt() * s.m2_y.sqrt())).clamp(-1.0, 1.0)
    }
}
