use ndarray::{Array1, Array2};
use rand::Rng;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::{Error, Result, Parameters};
use crate::common::utils;
use crate::sample::{Dataset, PatchSource, SamplePosition};
use super::smoothing::SmoothingMatrices;


/// A learned linear filter.
/// Its response to a patch is the dot product between
/// its weights and the `size x size` sub-patch read at
/// `(row_offset, col_offset)` of `channel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Channel the filter reads.
    pub channel: usize,
    /// Row offset of the sub-patch inside the sample patch.
    pub row_offset: usize,
    /// Column offset of the sub-patch inside the sample patch.
    pub col_offset: usize,
    /// Edge of the filter.
    pub size: usize,
    /// Row-major weights, `size * size` of them.
    pub weights: Vec<f64>,
}


impl Filter {
    /// Evaluate the filter on every patch anchored at `positions`.
    pub fn evaluate<S>(&self, source: &S, positions: &[SamplePosition])
        -> Array1<f64>
        where S: PatchSource + ?Sized
    {
        let samples = source.patch_matrix(
            positions,
            self.channel,
            self.row_offset,
            self.col_offset,
            self.size,
        );
        samples.dot(&Array1::from(self.weights.clone()))
    }


    /// Check that the filter holds `size * size` weights and
    /// reads inside a patch of edge `sample_size` of one of
    /// the `n_channels` channels.
    pub fn validate(&self, sample_size: usize, n_channels: usize)
        -> Result<()>
    {
        let invalid = |msg: String| Err(Error::InvalidDescriptor(msg));

        let area = self.size.checked_mul(self.size);
        if self.size == 0 || area != Some(self.weights.len()) {
            return invalid(format!(
                "a filter of size {} holds {} weights",
                self.size, self.weights.len(),
            ));
        }
        if self.row_offset.saturating_add(self.size) > sample_size
            || self.col_offset.saturating_add(self.size) > sample_size
        {
            return invalid(format!(
                "a filter of size {} at ({}, {}) exceeds the sample size {}",
                self.size, self.row_offset, self.col_offset, sample_size,
            ));
        }
        if self.channel >= n_channels {
            return invalid(format!(
                "a filter reads channel {} of {}",
                self.channel, n_channels,
            ));
        }
        Ok(())
    }
}


/// An ordered set of learned filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterBank {
    filters: Vec<Filter>,
}


impl FilterBank {
    /// Learn `params.filters_no` filters on `channel`.
    ///
    /// Each filter reads a sub-patch of edge `params.filter_size`
    /// at a random offset inside the sample patch,
    /// and its weights solve the weighted ridge regression
    /// `(X^T W X + lambda S) w = X^T W y`,
    /// where `X` holds the sub-patches of `positions`,
    /// `W` the normalized sample weights and
    /// `S` the smoothness regularizer.
    ///
    /// A filter whose system is singular is skipped.
    /// If the sample weights sum to zero,
    /// the returned bank is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn learn<R: Rng>(
        params: &Parameters,
        sm: &SmoothingMatrices,
        dataset: &Dataset,
        channel: usize,
        positions: &[SamplePosition],
        labels: &[f64],
        weights: &[f64],
        rng: &mut R,
    ) -> Result<Self>
    {
        let size = params.filter_size;
        let sample_size = dataset.sample_size();
        if sm.filter_size() != size || size == 0 || size > sample_size {
            return Err(Error::InvalidParameter(format!(
                "filters of size {size} cannot be learned from \
                {sample_size} x {sample_size} patches with a {0} x {0} \
                regularizer",
                sm.filter_size(),
            )));
        }

        let total = weights.iter().sum::<f64>();
        if positions.is_empty() || total <= 0f64 {
            debug!("channel {channel}: no weighted sample, no filter learned");
            return Ok(Self::default());
        }
        let weights = weights.iter()
            .map(|w| w / total)
            .collect::<Vec<_>>();

        let lambda = params.smoothing_lambda;
        let s = sm.matrix();
        let max_offset = sample_size - size;

        let mut filters = Vec::with_capacity(params.filters_no);
        for _ in 0..params.filters_no {
            let row_offset = rng.gen_range(0..=max_offset);
            let col_offset = rng.gen_range(0..=max_offset);

            let x = dataset.sample_matrix(
                positions, channel, row_offset, col_offset, size
            )?;

            let (a, b) = normal_equations(&x, labels, &weights);
            let a = a + &(&s * lambda);

            match utils::cholesky_solve(a.view(), b.view()) {
                Some(w) => {
                    filters.push(Filter {
                        channel, row_offset, col_offset, size, weights: w,
                    });
                },
                None => {
                    debug!(
                        "channel {channel}: singular system at offset \
                        ({row_offset}, {col_offset}), filter skipped"
                    );
                },
            }
        }

        Ok(Self { filters })
    }


    /// Keep, in order, the filters of the concatenation of `banks`
    /// whose index appears in the sorted list `retained`.
    pub fn from_retained(banks: &[Self], retained: &[usize]) -> Self {
        let filters = banks.iter()
            .flat_map(|bank| bank.filters.iter())
            .enumerate()
            .filter(|(i, _)| retained.binary_search(i).is_ok())
            .map(|(_, filter)| filter.clone())
            .collect();
        Self { filters }
    }


    /// Returns the `positions.len() x self.len()` matrix of filter responses.
    pub fn evaluate_filters<S>(&self, source: &S, positions: &[SamplePosition])
        -> Array2<f64>
        where S: PatchSource + ?Sized
    {
        let columns = self.filters.par_iter()
            .map(|filter| filter.evaluate(source, positions))
            .collect::<Vec<_>>();

        let mut features = Array2::zeros((positions.len(), columns.len()));
        features.columns_mut()
            .into_iter()
            .zip(columns)
            .for_each(|(mut dst, src)| dst.assign(&src));
        features
    }


    /// Returns the number of filters.
    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }


    /// Returns `true` if the bank holds no filter.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }


    /// Returns the filters.
    #[inline]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }


    /// Check every filter, see [`Filter::validate`].
    pub fn validate(&self, sample_size: usize, n_channels: usize)
        -> Result<()>
    {
        self.filters.iter()
            .try_for_each(|filter| filter.validate(sample_size, n_channels))
    }


    /// Count the filters reading each of the `n_channels` channels.
    pub fn channel_counts(&self, n_channels: usize) -> Vec<usize> {
        let mut counts = vec![0; n_channels];
        self.filters.iter()
            .filter(|filter| filter.channel < n_channels)
            .for_each(|filter| { counts[filter.channel] += 1; });
        counts
    }
}


/// Returns `X^T W X` and `X^T W y`.
fn normal_equations(x: &Array2<f64>, y: &[f64], w: &[f64])
    -> (Array2<f64>, Array1<f64>)
{
    let wy = w.iter().zip(y).map(|(w, y)| w * y).collect::<Array1<f64>>();
    let mut wx = x.clone();
    wx.outer_iter_mut()
        .zip(w)
        .for_each(|(mut row, w)| row *= *w);

    let xt = x.t();
    (xt.dot(&wx), xt.dot(&wy))
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use crate::sample::ImageChannels;

    #[test]
    fn test_from_retained_01() {
        let filter = |channel, weight| Filter {
            channel,
            row_offset: 0,
            col_offset: 0,
            size: 1,
            weights: vec![weight],
        };
        let banks = vec![
            FilterBank { filters: vec![filter(0, 1.0), filter(0, 2.0)] },
            FilterBank { filters: vec![filter(1, 3.0), filter(1, 4.0)] },
        ];
        let bank = FilterBank::from_retained(&banks, &[1, 2]);
        let res = bank.filters().iter()
            .map(|f| f.weights[0])
            .collect::<Vec<_>>();
        assert_eq!(vec![2.0, 3.0], res, "got {res:?}.");
        assert_eq!(vec![1, 1], bank.channel_counts(2));
    }

    #[test]
    fn test_evaluate_filters_01() {
        let ch = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
        ];
        let source = ImageChannels::new(vec![ch.view()]);
        let bank = FilterBank {
            filters: vec![
                Filter {
                    channel: 0, row_offset: 0, col_offset: 0, size: 2,
                    weights: vec![1.0, 0.0, 0.0, 1.0],
                },
                Filter {
                    channel: 0, row_offset: 1, col_offset: 1, size: 1,
                    weights: vec![2.0],
                },
            ],
        };
        let positions = [
            SamplePosition::new(0, 0, 0),
            SamplePosition::new(0, 1, 1),
        ];
        let res = bank.evaluate_filters(&source, &positions);
        let exp = array![[6.0, 10.0], [14.0, 18.0]];
        assert_eq!(exp, res, "expected {exp:?}, got {res:?}.");
    }

    #[test]
    fn test_validate_01() {
        let filter = Filter {
            channel: 1, row_offset: 1, col_offset: 0, size: 2,
            weights: vec![1.0; 4],
        };
        assert!(filter.validate(3, 2).is_ok());
        // offset + size past the patch
        assert!(filter.validate(2, 2).is_err());
        // unknown channel
        assert!(filter.validate(3, 1).is_err());

        let short = Filter { weights: vec![1.0], ..filter.clone() };
        let res = short.validate(3, 2);
        assert!(matches!(res, Err(Error::InvalidDescriptor(_))), "got {res:?}.");

        let bank = FilterBank { filters: vec![filter, short] };
        assert!(bank.validate(3, 2).is_err());
    }

    #[test]
    fn test_normal_equations_01() {
        let x = array![[1.0, 0.0], [0.0, 2.0]];
        let (a, b) = normal_equations(&x, &[1.0, -1.0], &[0.25, 0.75]);
        assert_eq!(array![[0.25, 0.0], [0.0, 3.0]], a);
        assert_eq!(array![0.25, -1.5], b);
    }
}
