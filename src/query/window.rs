//! Candidate window planning.
//!
//! A Hilbert curve keeps most grid neighbours close along the key axis, but
//! cells on opposite sides of a high-level subdivision boundary can be far
//! apart. Besides the query cell's own key, the plan therefore anchors a
//! window at the key of every neighbouring cell (for up to four axes), then
//! merges overlapping windows so no key range is scanned twice per round.

use crate::curve::CurveIndexer;
use crate::types::CurveKey;

/// Keys the windows are centred on, ascending and deduplicated.
pub(crate) fn anchor_keys(curve: &CurveIndexer, coordinate: &[f32], include_neighbors: bool) -> Vec<CurveKey> {
    let cell = curve.discretize(coordinate);
    let mut anchors = vec![curve.encode_cell(&cell)];
    if include_neighbors {
        anchors.extend(curve.neighbor_cells(&cell).iter().map(|n| curve.encode_cell(n)));
    }
    anchors.sort_unstable();
    anchors.dedup();
    anchors
}

/// Inclusive key ranges `[anchor - radius, anchor + radius]`, clamped to the
/// curve and merged where they overlap or touch.
pub(crate) fn windows(anchors: &[CurveKey], radius: u128, max_key: CurveKey) -> Vec<(CurveKey, CurveKey)> {
    let mut merged: Vec<(CurveKey, CurveKey)> = Vec::with_capacity(anchors.len());
    for &anchor in anchors {
        let lo = anchor.saturating_sub(radius);
        let hi = anchor.saturating_add(radius, max_key);
        match merged.last_mut() {
            Some(last) if lo.as_u128() <= last.1.as_u128().saturating_add(1) => {
                last.1 = last.1.max(hi);
            }
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Whether a window plan covers every key.
pub(crate) fn covers_curve(windows: &[(CurveKey, CurveKey)], max_key: CurveKey) -> bool {
    matches!(windows, [(lo, hi)] if *lo == CurveKey::MIN && *hi == max_key)
}
