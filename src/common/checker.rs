//! This file defines some functions that checks some pre-conditions
//! E.g., Shape of the vectors handed to a boosting round.


/// Check that every slice of a boosting round has the same length.
#[inline(always)]
pub(crate) fn round_buffers(
    n_sample: usize,
    weights: &[f64],
    labels: &[f64],
    response: &[f64],
)
{
    assert_eq!(
        n_sample, weights.len(),
        "expected {n_sample} weights, got {}", weights.len()
    );
    assert_eq!(
        n_sample, labels.len(),
        "expected {n_sample} labels, got {}", labels.len()
    );
    assert_eq!(
        n_sample, response.len(),
        "expected {n_sample} responses, got {}", response.len()
    );
}


/// Check that the labels take values in `{-1, +1}`.
#[inline(always)]
pub(crate) fn binary_labels(labels: &[f64]) {
    assert!(
        labels.iter().all(|y| *y == 1f64 || *y == -1f64),
        "labels must be either `+1` or `-1`"
    );
}


/// Check the shrinkage factor.
#[inline(always)]
pub(crate) fn shrinkage(factor: f64) {
    assert!(
        factor > 0f64 && factor <= 1f64,
        "shrinkage factor must be in (0, 1]. got {factor}."
    );
}
