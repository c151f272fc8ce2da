use ndarray::ArrayView1;

use std::fmt;
use std::ops::Range;


const EPS: f64 = 0.001;


/// A struct that stores the first/second order derivative information.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct GradientHessian {
    pub(crate) grad: f64,
    pub(crate) hess: f64,
}


impl GradientHessian {
    #[inline(always)]
    pub(crate) fn new(grad: f64, hess: f64) -> Self {
        Self { grad, hess }
    }


    #[inline(always)]
    fn is_zero(&self) -> bool {
        self.grad == 0f64 && self.hess == 0f64
    }
}


/// Binning: A feature processing.
#[derive(Debug, Clone)]
pub(crate) struct Bin(pub(crate) Range<f64>);

impl Bin {
    /// Create a new instance of `Bin`.
    #[inline(always)]
    pub(crate) fn new(range: Range<f64>) -> Self {
        Self(range)
    }
}


/// Equal-width bins over the range of one feature column.
#[derive(Debug, Clone)]
pub(crate) struct Bins {
    min: f64,
    width: f64,
    bins: Vec<Bin>,
}


impl Bins {
    /// Returns the number of bins.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bins.len()
    }


    /// Cut the given feature column into `n_bin` bins of the same width.
    /// The left-most bin starts at `f64::MIN`
    /// and the right-most bin ends at `f64::MAX`.
    pub(crate) fn cut(feature: ArrayView1<'_, f64>, n_bin: usize) -> Self {
        let n_bin = n_bin.max(1);
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        feature.iter()
            .copied()
            .for_each(|val| {
                min = min.min(val);
                max = max.max(val);
            });

        // If the minimum value equals to the maximum one,
        // slightly perturb them.
        if min >= max {
            min -= EPS;
            max += EPS;
        }

        let width = (max - min) / n_bin as f64;
        let mut bins = (0..n_bin).map(|k| {
                let left = min + k as f64 * width;
                Bin::new(left..left + width)
            })
            .collect::<Vec<_>>();

        if let Some(first) = bins.first_mut() { first.0.start = f64::MIN; }
        if let Some(last) = bins.last_mut() { last.0.end = f64::MAX; }

        Self { min, width, bins }
    }


    /// Returns the index of the bin that contains `value`.
    #[inline(always)]
    fn position(&self, value: f64) -> usize {
        let pos = ((value - self.min) / self.width).floor();
        if pos <= 0f64 || pos.is_nan() {
            0
        } else {
            (pos as usize).min(self.bins.len() - 1)
        }
    }


    /// Accumulate the gradients and hessians of the samples `indices`
    /// per bin, and drop the empty bins.
    pub(crate) fn pack(
        &self,
        indices: &[usize],
        feature: ArrayView1<'_, f64>,
        gh: &[GradientHessian],
    ) -> Vec<(Bin, GradientHessian)>
    {
        let mut packed = vec![GradientHessian::default(); self.bins.len()];

        for &i in indices {
            let pos = self.position(feature[i]);
            packed[pos].grad += gh[i].grad;
            packed[pos].hess += gh[i].hess;
        }
        self.remove_zero_weight_pack(packed)
    }


    /// This method removes bins with zero weights.
    /// The bound between two consecutive non-empty bins is moved to
    /// the middle of the empty gap between them.
    /// ```text
    /// Bins       | [-Inf, 2.5), [2.5, 7.0), [7.0, 8.1), [8.1, +Inf)
    /// Grad       |     0.5,        0.0,        0.0,        0.2
    /// ```
    /// becomes
    /// ```text
    /// Bins       | [-Inf, 5.3), [5.3, +Inf)
    /// Grad       |     0.5,        0.2
    /// ```
    fn remove_zero_weight_pack(&self, pack: Vec<GradientHessian>)
        -> Vec<(Bin, GradientHessian)>
    {
        let mut iter = self.bins.iter()
            .zip(pack)
            .filter(|(_, gh)| !gh.is_zero());

        let (first_bin, mut prev_gh) = match iter.next() {
            Some(item) => item,
            None => { return Vec::new(); },
        };
        let mut prev_bin = Bin::new(f64::MIN..first_bin.0.end);

        let mut bin_and_gh = Vec::new();
        for (next_bin, next_gh) in iter {
            let start = prev_bin.0.start;
            let end = (prev_bin.0.end + next_bin.0.start) / 2f64;
            bin_and_gh.push((Bin::new(start..end), prev_gh));

            prev_bin = Bin::new(end..next_bin.0.end);
            prev_gh = next_gh;
        }
        prev_bin.0.end = f64::MAX;
        bin_and_gh.push((prev_bin, prev_gh));

        bin_and_gh
    }
}


impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |x: f64| {
            if x == f64::MIN {
                String::from("-Inf")
            } else if x == f64::MAX {
                String::from("+Inf")
            } else {
                format!("{x:+.2}")
            }
        };
        write!(f, "[{}, {})", bound(self.0.start), bound(self.0.end))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cut_01() {
        let feat = array![0.0, 1.0, 2.0, 3.0, 4.0];
        let bins = Bins::cut(feat.view(), 4);
        assert_eq!(4, bins.len());
        assert_eq!(0, bins.position(-10.0));
        assert_eq!(0, bins.position(0.5));
        assert_eq!(2, bins.position(2.0));
        assert_eq!(3, bins.position(4.0));
        assert_eq!(3, bins.position(10.0));
    }

    #[test]
    fn test_cut_constant_01() {
        let feat = array![1.0, 1.0, 1.0];
        let bins = Bins::cut(feat.view(), 8);
        assert_eq!(8, bins.len());
        let pos = bins.position(1.0);
        assert!(pos < 8);
    }

    #[test]
    fn test_pack_01() {
        let feat = array![0.0, 0.1, 3.9, 4.0];
        let bins = Bins::cut(feat.view(), 4);
        let gh = vec![
            GradientHessian::new(1.0, 1.0),
            GradientHessian::new(1.0, 1.0),
            GradientHessian::new(-1.0, 1.0),
            GradientHessian::new(-1.0, 1.0),
        ];
        let pack = bins.pack(&[0, 1, 2, 3], feat.view(), &gh);
        assert_eq!(2, pack.len(), "got {pack:?}.");
        assert_eq!(GradientHessian::new(2.0, 2.0), pack[0].1);
        assert_eq!(GradientHessian::new(-2.0, 2.0), pack[1].1);
        // The bound lies in the middle of the empty gap [1.0, 3.0).
        assert!((pack[0].0.0.end - 2.0).abs() < 1e-12, "got {pack:?}.");
    }
}
