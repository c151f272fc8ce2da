//! This file provides some common functions
//! such as the exponential loss and the border replication.
use rayon::prelude::*;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView1, ArrayView2};


/// Returns the fraction of samples whose margin `y * f(x)` is negative.
///
/// Time complexity: `O(m)`, where `m` is the number of samples.
#[inline(always)]
pub fn misclassification_rate(labels: &[f64], response: &[f64]) -> f64 {
    let n_sample = labels.len();
    if n_sample == 0 { return 0f64; }

    let wrong = labels.par_iter()
        .zip(response)
        .filter(|(y, f)| *y * *f < 0f64)
        .count();

    wrong as f64 / n_sample as f64
}


/// Returns the mean exponential loss `mean(exp(-y * f(x)))`.
///
/// Time complexity: `O(m)`, where `m` is the number of samples.
#[inline(always)]
pub fn exp_loss(labels: &[f64], response: &[f64]) -> f64 {
    let n_sample = labels.len();
    if n_sample == 0 { return 0f64; }

    labels.iter()
        .zip(response)
        .map(|(y, f)| (-y * f).exp())
        .sum::<f64>()
        / n_sample as f64
}


/// Overwrite `weights` with the unnormalized exponential weights
/// `w[i] = exp(-y[i] * f[i])`.
#[inline(always)]
pub fn exp_weights(weights: &mut [f64], labels: &[f64], response: &[f64]) {
    weights.par_iter_mut()
        .zip(labels)
        .zip(response)
        .for_each(|((w, y), f)| { *w = (-y * f).exp(); });
}


/// Pad `src` with `border` replicated pixels on each side.
pub fn replicate_border(src: ArrayView2<'_, f64>, border: usize)
    -> Array2<f64>
{
    let (rows, cols) = src.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((rows + 2 * border, cols + 2 * border));
    }

    Array2::from_shape_fn(
        (rows + 2 * border, cols + 2 * border),
        |(r, c)| {
            let r = r.saturating_sub(border).min(rows - 1);
            let c = c.saturating_sub(border).min(cols - 1);
            src[[r, c]]
        }
    )
}


/// Overwrite the `border` outermost pixels of `dst`
/// with the nearest inner pixel.
pub fn fill_border(dst: &mut Array2<f64>, border: usize) {
    let (rows, cols) = dst.dim();
    if border == 0 || rows <= 2 * border || cols <= 2 * border {
        return;
    }
    let inner = dst.slice(
            ndarray::s![border..rows - border, border..cols - border]
        )
        .to_owned();
    *dst = replicate_border(inner.view(), border);
}


/// Solves `A x = b` for a symmetric positive definite `A`
/// by its Cholesky decomposition.
/// Returns `None` if `A` is not positive definite
/// or the solution is not finite.
///
/// Time complexity: `O(n^3)`.
pub fn cholesky_solve(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>)
    -> Option<Vec<f64>>
{
    let n = b.len();
    assert_eq!(a.dim(), (n, n));

    let a = DMatrix::from_fn(n, n, |i, j| a[[i, j]]);
    let b = DVector::from_iterator(n, b.iter().copied());
    let x = a.cholesky()?.solve(&b);

    x.iter()
        .all(|v| v.is_finite())
        .then(|| x.iter().copied().collect())
}
