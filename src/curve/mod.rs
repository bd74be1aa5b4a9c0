//! CurveIndexer: fixed-precision grid plus Hilbert linearization.
//!
//! Coordinates are discretized onto `2^precision_bits` cells per axis over a
//! closed bounding range. Values outside the range are clamped onto the edge
//! cells. A cell is represented in coordinate space by its center, so the
//! grid-aligned coordinates are exactly the values [`CurveIndexer::from_key`]
//! produces and `from_key(to_key(c)) == c` holds for all of them.
//!
//! Centers are `f64`: at 32 bits per axis a cell is narrower than the
//! spacing of `f32` values, so a single-precision center can land in the
//! neighbouring cell.

pub mod hilbert;

pub use hilbert::GridPoint;

use crate::constants::curve::{KEY_BITS, MAX_PRECISION_BITS};
use crate::constants::query::MAX_NEIGHBOR_SEARCH_AXES;
use crate::error::{IndexError, Result};
use crate::types::CurveKey;
use smallvec::SmallVec;

/// Grid-aligned coordinate: the center of a cell.
pub type CellCenter = SmallVec<[f64; 4]>;

/// Largest `max(|lo|, |hi|) / step` for which every cell center survives
/// the round trip through `f64`.
const MAX_MAGNITUDE_PER_STEP: f64 = (1u64 << 50) as f64;

/// Discretizes coordinates and maps them to curve keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveIndexer {
    axes: usize,
    precision_bits: u32,
    lo: f64,
    hi: f64,
    step: f64,
}

impl CurveIndexer {
    /// Create an indexer for `axes`-dimensional coordinates within `bounds`.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidParameter`] if the key would not fit in
    /// 128 bits, the precision is outside `1..=32`, or the bounds are not a
    /// finite, non-empty range wide enough to resolve every cell.
    pub fn new(axes: usize, precision_bits: u32, bounds: (f32, f32)) -> Result<Self> {
        if axes == 0 {
            return Err(IndexError::invalid_parameter("curve needs at least one axis"));
        }
        if precision_bits == 0 || precision_bits > MAX_PRECISION_BITS {
            return Err(IndexError::invalid_parameter(format!(
                "precision must be in 1..={MAX_PRECISION_BITS} bits, got {precision_bits}"
            )));
        }
        if axes as u64 * precision_bits as u64 > KEY_BITS as u64 {
            return Err(IndexError::invalid_parameter(format!(
                "{axes} axes x {precision_bits} bits exceeds the {KEY_BITS}-bit key"
            )));
        }
        let (lo, hi) = bounds;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(IndexError::invalid_parameter(format!(
                "invalid coordinate bounds [{lo}, {hi}]"
            )));
        }
        let (lo, hi) = (lo as f64, hi as f64);
        let step = (hi - lo) / (1u64 << precision_bits) as f64;
        if lo.abs().max(hi.abs()) / step >= MAX_MAGNITUDE_PER_STEP {
            return Err(IndexError::invalid_parameter(format!(
                "bounds [{lo}, {hi}] are too narrow for {precision_bits}-bit cells"
            )));
        }
        Ok(Self {
            axes,
            precision_bits,
            lo,
            hi,
            step,
        })
    }

    pub fn axes(&self) -> usize {
        self.axes
    }

    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.lo as f32, self.hi as f32)
    }

    /// Cells per axis, `2^precision_bits`.
    pub fn cells_per_axis(&self) -> u64 {
        1u64 << self.precision_bits
    }

    /// Largest key this indexer can produce.
    pub fn max_key(&self) -> CurveKey {
        let bits = self.axes as u32 * self.precision_bits;
        if bits == 128 {
            CurveKey(u128::MAX)
        } else {
            CurveKey((1u128 << bits) - 1)
        }
    }

    /// Grid cell containing a coordinate. Out-of-range and NaN components
    /// clamp to the nearest edge (NaN to the lower one).
    pub fn discretize<T: Copy + Into<f64>>(&self, coordinate: &[T]) -> GridPoint {
        assert_eq!(
            coordinate.len(),
            self.axes,
            "coordinate has {} axes, indexer expects {}",
            coordinate.len(),
            self.axes
        );
        let last = (self.cells_per_axis() - 1) as f64;
        coordinate
            .iter()
            .map(|&value| {
                let t = (value.into() - self.lo) / self.step;
                if t.is_nan() || t <= 0.0 {
                    0
                } else {
                    t.floor().min(last) as u32
                }
            })
            .collect()
    }

    /// Center of a grid cell in coordinate space.
    pub fn cell_center(&self, cell: &[u32]) -> CellCenter {
        cell.iter()
            .map(|&c| self.lo + (c as f64 + 0.5) * self.step)
            .collect()
    }

    /// Curve key of a grid cell.
    pub fn encode_cell(&self, cell: &[u32]) -> CurveKey {
        debug_assert_eq!(cell.len(), self.axes);
        CurveKey(hilbert::encode(cell, self.precision_bits))
    }

    /// Grid cell at a curve key.
    pub fn decode_cell(&self, key: CurveKey) -> GridPoint {
        debug_assert!(key <= self.max_key());
        hilbert::decode(key.as_u128(), self.axes, self.precision_bits)
    }

    /// Curve key of a coordinate.
    pub fn to_key<T: Copy + Into<f64>>(&self, coordinate: &[T]) -> CurveKey {
        self.encode_cell(&self.discretize(coordinate))
    }

    /// Grid-aligned coordinate at a curve key. Diagnostic inverse of
    /// [`CurveIndexer::to_key`].
    pub fn from_key(&self, key: CurveKey) -> CellCenter {
        self.cell_center(&self.decode_cell(key))
    }

    /// Cells sharing a face, edge or corner with `cell`, excluding `cell`
    /// itself and anything off the grid.
    ///
    /// Returns nothing for coordinates with more than four axes, where the
    /// `3^axes` neighbourhood gets too large to search.
    pub fn neighbor_cells(&self, cell: &[u32]) -> Vec<GridPoint> {
        if self.axes > MAX_NEIGHBOR_SEARCH_AXES {
            return Vec::new();
        }
        let last = self.cells_per_axis() - 1;
        let total = 3usize.pow(self.axes as u32);
        let mut neighbors = Vec::with_capacity(total - 1);

        'offsets: for code in 0..total {
            let mut rest = code;
            let mut neighbor: GridPoint = SmallVec::with_capacity(self.axes);
            let mut moved = false;
            for &c in cell {
                let delta = (rest % 3) as i64 - 1;
                rest /= 3;
                let shifted = c as i64 + delta;
                if shifted < 0 || shifted as u64 > last {
                    continue 'offsets;
                }
                moved |= delta != 0;
                neighbor.push(shifted as u32);
            }
            if moved {
                neighbors.push(neighbor);
            }
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(CurveIndexer::new(0, 10, (0.0, 1.0)).is_err());
        assert!(CurveIndexer::new(3, 0, (0.0, 1.0)).is_err());
        assert!(CurveIndexer::new(3, 33, (0.0, 1.0)).is_err());
        assert!(CurveIndexer::new(5, 26, (0.0, 1.0)).is_err());
        assert!(CurveIndexer::new(3, 10, (1.0, 1.0)).is_err());
        assert!(CurveIndexer::new(3, 10, (0.0, f32::INFINITY)).is_err());
        assert!(CurveIndexer::new(3, 32, (1.0e6, 1.0e6 + 1.0)).is_err());
        assert!(CurveIndexer::new(3, 10, (1.0e6, 1.0e6 + 1.0)).is_ok());
        assert!(CurveIndexer::new(4, 32, (0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_max_key() {
        let curve = CurveIndexer::new(3, 10, (0.0, 1.0)).unwrap();
        assert_eq!(curve.max_key(), CurveKey((1 << 30) - 1));
        let wide = CurveIndexer::new(4, 32, (0.0, 1.0)).unwrap();
        assert_eq!(wide.max_key(), CurveKey(u128::MAX));
    }

    #[test]
    fn test_discretize_clamps() {
        let curve = CurveIndexer::new(3, 4, (0.0, 2.0)).unwrap();
        let cell = curve.discretize(&[-5.0, 2.0, 100.0]);
        assert_eq!(cell.as_slice(), &[0, 15, 15]);
        let cell = curve.discretize(&[f32::NAN, 0.125, 0.13]);
        assert_eq!(cell.as_slice(), &[0, 1, 1]);
    }

    #[test]
    fn test_round_trip_grid_aligned() {
        let curve = CurveIndexer::new(3, 5, (0.0, 2.0)).unwrap();
        let side = curve.cells_per_axis() as u32;
        for x in 0..side {
            for y in (0..side).step_by(3) {
                for z in (0..side).step_by(7) {
                    let aligned = curve.cell_center(&[x, y, z]);
                    let key = curve.to_key(&aligned);
                    assert_eq!(curve.from_key(key), aligned);
                    assert_eq!(curve.to_key(&curve.from_key(key)), key);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_keys_with_offset_bounds() {
        let curve = CurveIndexer::new(4, 6, (-3.5, 7.25)).unwrap();
        for raw in (0..curve.max_key().as_u128()).step_by(977) {
            let key = CurveKey(raw);
            assert_eq!(curve.to_key(&curve.from_key(key)), key);
        }
    }

    #[test]
    fn test_round_trip_at_full_precision() {
        for (axes, bounds) in [(3usize, (0.0f32, 2.0f32)), (4, (0.0, 2.0)), (3, (-3.5, 7.25))] {
            let curve = CurveIndexer::new(axes, MAX_PRECISION_BITS, bounds).unwrap();
            let max = curve.max_key().as_u128();
            let stride = max / 997;
            let mut keys: Vec<u128> = (0..=997u128).map(|i| (i * stride).saturating_add(12345)).collect();
            keys.extend([0, 1, max - 1, max, (max >> 1) + 1 + 12345]);

            for raw in keys {
                let key = CurveKey(raw.min(max));
                let center = curve.from_key(key);
                assert_eq!(curve.to_key(&center), key, "{axes}x32 key {key}");
                assert_eq!(curve.from_key(curve.to_key(&center)), center);
            }
        }
    }

    #[test]
    fn test_nearby_coordinates_share_key() {
        let curve = CurveIndexer::new(3, 8, (0.0, 1.0)).unwrap();
        let a = curve.to_key(&[0.5001, 0.2501, 0.7501]);
        let b = curve.to_key(&[0.5002, 0.2502, 0.7502]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_neighbor_cells() {
        let curve = CurveIndexer::new(3, 4, (0.0, 1.0)).unwrap();
        assert_eq!(curve.neighbor_cells(&[5, 5, 5]).len(), 26);
        // A corner keeps only the in-grid half of each axis.
        let corner = curve.neighbor_cells(&[0, 0, 15]);
        assert_eq!(corner.len(), 7);
        assert!(corner.iter().all(|c| c[0] <= 1 && c[1] <= 1 && c[2] >= 14));
        assert!(!corner.contains(&smallvec![0, 0, 15]));

        let wide = CurveIndexer::new(5, 4, (0.0, 1.0)).unwrap();
        assert!(wide.neighbor_cells(&[1, 1, 1, 1, 1]).is_empty());
    }
}
