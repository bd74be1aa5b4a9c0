//! N-dimensional Hilbert curve transform.
//!
//! Uses Skilling's transpose formulation: a grid point is turned into the
//! "transposed" Hilbert index by walking the bit levels from the most
//! significant down, at each level either inverting the low bits of axis 0
//! or exchanging them with another axis (the rotation/reflection state of
//! the current sub-cube), followed by a Gray-code pass. Reading the
//! transposed bits level by level, axis 0 first, gives the scalar key.
//!
//! Reference: J. Skilling, "Programming the Hilbert curve", AIP Conf. Proc.
//! 707 (2004).

use smallvec::SmallVec;

/// Integer grid point; one cell index per axis.
pub type GridPoint = SmallVec<[u32; 4]>;

/// Map a grid point to its position along the Hilbert curve.
///
/// Every component must be below `2^bits`, and `point.len() * bits` must not
/// exceed 128.
pub fn encode(point: &[u32], bits: u32) -> u128 {
    debug_assert!(bits >= 1 && bits <= 32);
    debug_assert!(point.len() as u32 * bits <= 128);
    debug_assert!(point.iter().all(|&c| bits == 32 || c < (1u32 << bits)));

    let mut x: GridPoint = SmallVec::from_slice(point);
    axes_to_transpose(&mut x, bits);
    interleave(&x, bits)
}

/// Inverse of [`encode`].
pub fn decode(key: u128, axes: usize, bits: u32) -> GridPoint {
    debug_assert!(bits >= 1 && bits <= 32);
    debug_assert!(axes as u32 * bits <= 128);

    let mut x = deinterleave(key, axes, bits);
    transpose_to_axes(&mut x, bits);
    x
}

fn axes_to_transpose(x: &mut [u32], bits: u32) {
    let n = x.len();
    if n == 0 {
        return;
    }
    let m: u32 = 1 << (bits - 1);

    // Undo the excess work, top level first.
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode.
    for i in 1..n {
        x[i] ^= x[i - 1];
    }
    let mut t = 0u32;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for xi in x.iter_mut() {
        *xi ^= t;
    }
}

fn transpose_to_axes(x: &mut [u32], bits: u32) {
    let n = x.len();
    if n == 0 {
        return;
    }
    // 2^bits does not fit a u32 when bits == 32.
    let top: u64 = 1u64 << bits;

    // Gray decode.
    let t = x[n - 1] >> 1;
    for i in (1..n).rev() {
        x[i] ^= x[i - 1];
    }
    x[0] ^= t;

    // Redo the excess work, bottom level first.
    let mut q: u64 = 2;
    while q != top {
        let qq = q as u32;
        let p = qq - 1;
        for i in (0..n).rev() {
            if x[i] & qq != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q <<= 1;
    }
}

/// Read transposed bits level by level, axis 0 first.
fn interleave(x: &[u32], bits: u32) -> u128 {
    let mut key = 0u128;
    for level in (0..bits).rev() {
        for &xi in x {
            key = (key << 1) | ((xi >> level) & 1) as u128;
        }
    }
    key
}

fn deinterleave(key: u128, axes: usize, bits: u32) -> GridPoint {
    let mut x: GridPoint = SmallVec::from_elem(0, axes);
    let total = axes as u32 * bits;
    let mut consumed = 0u32;
    for level in (0..bits).rev() {
        for xi in x.iter_mut() {
            let position = total - 1 - consumed;
            *xi |= (((key >> position) & 1) as u32) << level;
            consumed += 1;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_points(axes: usize, bits: u32) -> Vec<GridPoint> {
        let side = 1u32 << bits;
        let total = (side as usize).pow(axes as u32);
        (0..total)
            .map(|mut n| {
                let mut p: GridPoint = SmallVec::from_elem(0, axes);
                for c in p.iter_mut() {
                    *c = (n % side as usize) as u32;
                    n /= side as usize;
                }
                p
            })
            .collect()
    }

    fn manhattan(a: &[u32], b: &[u32]) -> u32 {
        a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).sum()
    }

    #[test]
    fn test_origin_is_key_zero() {
        assert_eq!(encode(&[0, 0, 0], 5), 0);
        assert_eq!(decode(0, 3, 5).as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn test_round_trip_exhaustive_small_grids() {
        for (axes, bits) in [(2, 1), (2, 4), (3, 1), (3, 3), (4, 2), (5, 2)] {
            for point in all_points(axes, bits) {
                let key = encode(&point, bits);
                assert_eq!(decode(key, axes, bits), point, "axes={axes} bits={bits}");
            }
        }
    }

    #[test]
    fn test_keys_are_a_bijection() {
        for (axes, bits) in [(2, 3), (3, 2), (4, 2)] {
            let mut keys: Vec<u128> = all_points(axes, bits)
                .iter()
                .map(|p| encode(p, bits))
                .collect();
            keys.sort_unstable();
            let expected: Vec<u128> = (0..keys.len() as u128).collect();
            assert_eq!(keys, expected, "axes={axes} bits={bits}");
        }
    }

    #[test]
    fn test_consecutive_keys_are_grid_neighbors() {
        for (axes, bits) in [(2, 5), (3, 3), (4, 2)] {
            let count = 1u128 << (axes as u32 * bits);
            let mut previous = decode(0, axes, bits);
            for key in 1..count {
                let current = decode(key, axes, bits);
                assert_eq!(
                    manhattan(&previous, &current),
                    1,
                    "axes={axes} bits={bits} key={key}"
                );
                previous = current;
            }
        }
    }

    #[test]
    fn test_wide_keys_round_trip() {
        // 4 axes x 32 bits uses all 128 key bits.
        let point = [u32::MAX, 0, 0x8000_0001, 0x1234_5678];
        let key = encode(&point, 32);
        assert_eq!(decode(key, 4, 32).as_slice(), &point);

        let point = [1_000_000u32, 3, 999_999];
        let key = encode(&point, 20);
        assert!(key < 1u128 << 60);
        assert_eq!(decode(key, 3, 20).as_slice(), &point);
    }
}
