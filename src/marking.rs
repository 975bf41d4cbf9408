//! Selection of triangles for refinement.
use crate::Real;
use std::cmp::Ordering;

/// The number of triangles marked out of `num_cells` for the given fraction.
///
/// This is `max(1, floor(fraction * num_cells))`, capped at `num_cells`.
pub fn num_marked(num_cells: usize, fraction: f64) -> usize {
    let k = (fraction * num_cells as f64).floor() as usize;
    k.max(1).min(num_cells)
}

/// Marks the triangles with the largest error indicators.
///
/// Returns the indices of the `max(1, floor(fraction * M))` largest indicators, where `M` is
/// the number of indicators, in order of descending indicator. Equal indicators are ordered by
/// ascending index. NaN indicators rank below every number. An empty list of indicators marks
/// nothing.
///
/// # Panics
///
/// Panics if `fraction` is not in the interval `(0, 1]`.
pub fn mark_top_fraction<T: Real>(indicators: &[T], fraction: f64) -> Vec<usize> {
    assert!(
        fraction > 0.0 && fraction <= 1.0,
        "Refinement fraction must be in (0, 1], got {fraction}."
    );

    let mut order: Vec<usize> = (0..indicators.len()).collect();
    order.sort_unstable_by(|&i, &j| descending(indicators[i], indicators[j]).then(i.cmp(&j)));
    order.truncate(num_marked(indicators.len(), fraction));
    order
}

/// Total descending order on indicators, with NaN after every number.
fn descending<T: Real>(a: T, b: T) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| {
        let is_nan = |x: T| x.partial_cmp(&x).is_none();
        is_nan(a).cmp(&is_nan(b))
    })
}
