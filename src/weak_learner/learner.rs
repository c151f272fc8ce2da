use ndarray::{concatenate, Array2, Axis};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::{Error, Result, Parameters};
use crate::common::{checker, utils};
use crate::hypothesis::Classifier;
use crate::sample::{Dataset, PatchSource, SamplePosition};
use super::filter_bank::FilterBank;
use super::line_search::LineSearch;
use super::regression_tree::RegressionTree;
use super::smoothing::SmoothingMatrices;


/// Step size and diagnostics of a boosting round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct RoundParams {
    pub(crate) alpha: f64,
    #[serde(rename = "MR")]
    pub(crate) misclassification_rate: f64,
    pub(crate) loss: f64,
}


/// One boosting round:
/// a filter bank, a regression tree reading its responses,
/// and the step `alpha` of the round in the ensemble.
///
/// The diagnostics (misclassification rate and loss)
/// are those of the training samples right after the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakLearner {
    fb: FilterBank,
    rt: RegressionTree,
    params: RoundParams,
}


/// The descriptor form `{"WeakLearner": {"fb": .., "rt": .., "params": ..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum WeakLearnerEntry {
    WeakLearner(WeakLearner),
}


impl WeakLearner {
    /// Train one boosting round on `positions`.
    ///
    /// - `labels` are the `+1`/`-1` labels of the samples.
    /// - `response` is the current ensemble response;
    ///   it is updated to `response + alpha * h`.
    /// - `weights` is overwritten with `exp(-y * response)`.
    ///
    /// The samples are shuffled and split in thirds.
    /// The filters are learned on the first third,
    /// the tree on the second one,
    /// and the step on the whole set.
    #[allow(clippy::too_many_arguments)]
    pub fn train<R: Rng>(
        params: &Parameters,
        sm: &SmoothingMatrices,
        dataset: &Dataset,
        positions: &[SamplePosition],
        weights: &mut [f64],
        labels: &[f64],
        response: &mut [f64],
        rng: &mut R,
    ) -> Result<Self>
    {
        let n_sample = positions.len();
        checker::round_buffers(n_sample, weights, labels, response);
        checker::binary_labels(labels);
        checker::shrinkage(params.shrinkage_factor);

        // Split the samples: filters, tree, unused.
        let subset_size = n_sample / 3;
        let mut order = (0..n_sample).collect::<Vec<_>>();
        order.shuffle(rng);
        let fl = Subset::new(&order[..subset_size], positions, labels, weights);
        let mut tr = Subset::new(
            &order[subset_size..2 * subset_size], positions, labels, weights
        );
        unit_mean(&mut tr.weights);

        // Learn one filter bank per channel.
        let n_channels = dataset.channel_count();
        let seeds = (0..n_channels).map(|_| rng.gen::<u64>())
            .collect::<Vec<_>>();
        let banks = seeds.into_par_iter()
            .enumerate()
            .map(|(channel, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                FilterBank::learn(
                    params, sm, dataset, channel,
                    &fl.positions, &fl.labels, &fl.weights, &mut rng,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        // Evaluate every filter on the tree-learning samples.
        let blocks = banks.par_iter()
            .map(|bank| bank.evaluate_filters(dataset, &tr.positions))
            .collect::<Vec<_>>();
        let features = assemble(&blocks, tr.positions.len())?;
        debug!(
            "learning a regression tree on {} features, {} samples",
            features.ncols(), features.nrows(),
        );

        let (mut rt, retained) = RegressionTree::fit(
            features.view(),
            &tr.labels,
            &tr.weights,
            params.tree_depth,
            params.n_bins,
        );
        drop(features);

        let (fb, rt, weak) = if retained.is_empty() {
            warn!(
                "the regression tree retained no feature, \
                the round contributes nothing"
            );
            let weak = vec![0f64; n_sample];
            (FilterBank::default(), RegressionTree::constant(0f64), weak)
        } else {
            let fb = FilterBank::from_retained(&banks, &retained);
            rt.compact(&retained)?;
            let features = fb.evaluate_filters(dataset, positions);
            let weak = rt.predict(features.view());
            (fb, rt, weak)
        };

        let alpha = if fb.is_empty() {
            0f64
        } else {
            LineSearch::new(labels, response, &weak).run()
                * params.shrinkage_factor
        };

        response.iter_mut()
            .zip(&weak)
            .for_each(|(f, h)| { *f += alpha * h; });
        utils::exp_weights(weights, labels, response);

        let round = RoundParams {
            alpha,
            misclassification_rate: utils::misclassification_rate(
                labels, response
            ),
            loss: utils::exp_loss(labels, response),
        };
        debug!(
            "weak learner trained with {} filters, alpha = {alpha:.6}, \
            MR = {:.3}, loss = {:.3}",
            fb.len(), round.misclassification_rate, round.loss,
        );

        Ok(Self { fb, rt, params: round })
    }


    /// Parse a weak learner from its JSON descriptor.
    ///
    /// The filters must hold `size * size` weights and
    /// the tree must split on filter responses only.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let WeakLearnerEntry::WeakLearner(wl) = serde_json::from_str(descriptor)?;
        wl.validate(usize::MAX, usize::MAX)?;
        Ok(wl)
    }


    /// Check that the round reads patches of edge `sample_size`
    /// with `n_channels` channels.
    pub fn validate(&self, sample_size: usize, n_channels: usize)
        -> Result<()>
    {
        self.fb.validate(sample_size, n_channels)?;

        let bound = self.rt.feature_bound();
        if bound > self.fb.len() {
            return Err(Error::InvalidDescriptor(format!(
                "the tree splits on feature {} of {} filters",
                bound - 1, self.fb.len(),
            )));
        }
        if !self.params.alpha.is_finite() {
            return Err(Error::InvalidDescriptor(format!(
                "alpha is {}", self.params.alpha,
            )));
        }
        Ok(())
    }


    /// Returns the JSON descriptor of the weak learner.
    pub fn to_descriptor(&self) -> Result<String> {
        let entry = WeakLearnerEntry::WeakLearner(self.clone());
        Ok(serde_json::to_string(&entry)?)
    }


    /// Returns the step of the round.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.params.alpha
    }


    /// Returns the training misclassification rate after the round.
    #[inline]
    pub fn misclassification_rate(&self) -> f64 {
        self.params.misclassification_rate
    }


    /// Returns the mean exponential loss after the round.
    #[inline]
    pub fn loss(&self) -> f64 {
        self.params.loss
    }


    /// Returns the pruned filter bank.
    #[inline]
    pub fn filter_bank(&self) -> &FilterBank {
        &self.fb
    }


    /// Returns the regression tree.
    #[inline]
    pub fn tree(&self) -> &RegressionTree {
        &self.rt
    }
}


impl Classifier for WeakLearner {
    /// Returns the unscaled response `h` of the round.
    fn confidence_all<S>(&self, source: &S, positions: &[SamplePosition])
        -> Vec<f64>
        where S: PatchSource + ?Sized
    {
        let features = self.fb.evaluate_filters(source, positions);
        self.rt.predict(features.view())
    }
}


/// The positions, labels and weights of a subset of the samples.
struct Subset {
    positions: Vec<SamplePosition>,
    labels: Vec<f64>,
    weights: Vec<f64>,
}


impl Subset {
    fn new(
        indices: &[usize],
        positions: &[SamplePosition],
        labels: &[f64],
        weights: &[f64],
    ) -> Self
    {
        Self {
            positions: indices.iter().map(|&i| positions[i]).collect(),
            labels: indices.iter().map(|&i| labels[i]).collect(),
            weights: indices.iter().map(|&i| weights[i]).collect(),
        }
    }
}


/// Rescale `weights` to a unit mean.
fn unit_mean(weights: &mut [f64]) {
    let n_sample = weights.len() as f64;
    let total = weights.iter().sum::<f64>();
    if total > 0f64 && total.is_finite() {
        weights.iter_mut().for_each(|w| { *w *= n_sample / total; });
    }
}


/// Concatenate the per-channel feature blocks column-wise.
fn assemble(blocks: &[Array2<f64>], n_rows: usize) -> Result<Array2<f64>> {
    if blocks.is_empty() {
        return Ok(Array2::zeros((n_rows, 0)));
    }
    let views = blocks.iter().map(|b| b.view()).collect::<Vec<_>>();
    concatenate(Axis(1), &views)
        .map_err(|e| Error::InvalidParameter(e.to_string()))
}
