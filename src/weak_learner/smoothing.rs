use ndarray::{Array2, ArrayView2};

use crate::common::SMOOTHING_EPS;


/// The smoothness regularizer of the learned filters.
///
/// For a filter of edge `f`, flattened row-major into `f * f` weights,
/// the regularizer is
/// `S = Dx^T Dx + Dy^T Dy + eps * I`,
/// where `Dx` (resp. `Dy`) takes the first-order differences
/// between horizontally (resp. vertically) adjacent weights.
/// Penalizing `w^T S w` favours smooth filters.
///
/// The matrix depends only on the filter size,
/// so it is built once and shared by every round.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingMatrices {
    filter_size: usize,
    matrix: Array2<f64>,
}


impl SmoothingMatrices {
    /// Build the regularizer for filters of edge `filter_size`.
    pub fn new(filter_size: usize) -> Self {
        let f = filter_size;
        let area = f * f;
        let mut matrix = Array2::<f64>::zeros((area, area));

        // Each difference `w_a - w_b` adds the outer product of
        // `e_a - e_b` with itself.
        let mut add_difference = |a: usize, b: usize| {
            matrix[[a, a]] += 1f64;
            matrix[[b, b]] += 1f64;
            matrix[[a, b]] -= 1f64;
            matrix[[b, a]] -= 1f64;
        };
        for r in 0..f {
            for c in 0..f {
                let idx = r * f + c;
                if c + 1 < f { add_difference(idx, idx + 1); }
                if r + 1 < f { add_difference(idx, idx + f); }
            }
        }

        matrix.diag_mut().mapv_inplace(|v| v + SMOOTHING_EPS);

        Self { filter_size, matrix }
    }


    /// Returns the filter edge this regularizer was built for.
    #[inline]
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }


    /// Returns the `f^2 x f^2` regularizer.
    #[inline]
    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }
}
