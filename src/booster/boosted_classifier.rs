use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use tracing::info;

use std::ops::ControlFlow;
use std::time::Instant;

use crate::{Error, Result, Parameters};
use crate::common::{utils, FEEDBACK_SAMPLE_WEIGHT};
use crate::hypothesis::Classifier;
use crate::research::{TrainingLog, RoundRecord};
use crate::sample::{
    Dataset,
    GtClass,
    ImageChannels,
    PatchSource,
    SamplePosition,
    SampleSet,
};
use crate::weak_learner::{SmoothingMatrices, WeakLearner, WeakLearnerEntry};
use super::core::Booster;


/// An ensemble of weak learners trained on one gt pair.
/// Its confidence is `sum_t alpha_t * h_t(x)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "BoostedClassifierDescriptor")]
#[serde(from = "BoostedClassifierDescriptor")]
pub struct BoostedClassifier {
    learners: Vec<WeakLearner>,
}


/// The descriptor form `{"WeakLearners": [{"WeakLearner": ..}, ..]}`.
#[derive(Serialize, Deserialize)]
struct BoostedClassifierDescriptor {
    #[serde(rename = "WeakLearners")]
    weak_learners: Vec<WeakLearnerEntry>,
}


impl From<BoostedClassifier> for BoostedClassifierDescriptor {
    fn from(classifier: BoostedClassifier) -> Self {
        let weak_learners = classifier.learners.into_iter()
            .map(WeakLearnerEntry::WeakLearner)
            .collect();
        Self { weak_learners }
    }
}


impl From<BoostedClassifierDescriptor> for BoostedClassifier {
    fn from(descriptor: BoostedClassifierDescriptor) -> Self {
        let learners = descriptor.weak_learners.into_iter()
            .map(|WeakLearnerEntry::WeakLearner(wl)| wl)
            .collect();
        Self { learners }
    }
}


impl BoostedClassifier {
    /// Construct an ensemble from trained weak learners.
    pub fn new(learners: Vec<WeakLearner>) -> Self {
        Self { learners }
    }


    /// Train the ensemble of `pair` on `dataset`.
    /// This is a shorthand for running a [`PairBooster`].
    pub fn train(
        params: &Parameters,
        sm: &SmoothingMatrices,
        dataset: &Dataset,
        pair: usize,
        rng: StdRng,
    ) -> Result<Self>
    {
        PairBooster::new(params, sm, dataset, pair, rng).run()
    }


    /// Returns the weak learners, in training order.
    pub fn weak_learners(&self) -> &[WeakLearner] {
        &self.learners
    }


    /// Returns the number of rounds.
    pub fn len(&self) -> usize {
        self.learners.len()
    }


    /// Returns `true` if the ensemble holds no round.
    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }


    /// Classify the evaluation points of `image`.
    ///
    /// Returns a matrix of the bordered image size holding
    /// the confidence at the centre of each evaluated patch
    /// and `0` elsewhere.
    pub fn classify_image(&self, dataset: &Dataset, image: usize)
        -> Array2<f64>
    {
        let dim = dataset.data(0, image).dim();
        let points = dataset.eval_points(image);
        let scores = self.confidence_all(dataset, points);

        let mut output = Array2::zeros(dim);
        paint(&mut output, points, &scores, dataset.sample_size() / 2);
        output
    }


    /// Classify every valid patch of the bordered `channels`.
    ///
    /// Returns a matrix of the bordered size holding
    /// the confidence at the centre of each patch,
    /// whose `border` outermost pixels replicate the inner ones.
    pub fn classify_full_image(
        &self,
        channels: Vec<ArrayView2<'_, f64>>,
        sample_size: usize,
        border: usize,
    ) -> Array2<f64>
    {
        let source = ImageChannels::new(channels);
        let (rows, cols) = source.dim();
        if rows < sample_size || cols < sample_size {
            return Array2::zeros((rows, cols));
        }

        let positions = (0..=rows - sample_size)
            .flat_map(|r| {
                (0..=cols - sample_size).map(move |c| {
                    SamplePosition::new(0, r, c)
                })
            })
            .collect::<SampleSet>();
        let scores = self.confidence_all(&source, &positions);

        let mut output = Array2::zeros((rows, cols));
        paint(&mut output, &positions, &scores, sample_size / 2);
        utils::fill_border(&mut output, border);
        output
    }


    /// Check every round, see [`WeakLearner::validate`].
    pub fn validate(&self, sample_size: usize, n_channels: usize)
        -> Result<()>
    {
        self.learners.iter()
            .enumerate()
            .try_for_each(|(t, wl)| {
                wl.validate(sample_size, n_channels).map_err(|e| match e {
                    Error::InvalidDescriptor(msg) => Error::InvalidDescriptor(
                        format!("round {t}: {msg}")
                    ),
                    e => e,
                })
            })
    }


    /// Count the retained filters reading each of the `n_channels` channels,
    /// over every round.
    pub fn channel_usage(&self, n_channels: usize) -> Vec<usize> {
        let mut usage = vec![0; n_channels];
        for wl in &self.learners {
            let counts = wl.filter_bank().channel_counts(n_channels);
            usage.iter_mut()
                .zip(counts)
                .for_each(|(u, c)| { *u += c; });
        }
        usage
    }
}


impl Classifier for BoostedClassifier {
    fn confidence_all<S>(&self, source: &S, positions: &[SamplePosition])
        -> Vec<f64>
        where S: PatchSource + ?Sized
    {
        let mut confidence = vec![0f64; positions.len()];
        for wl in &self.learners {
            let alpha = wl.alpha();
            if alpha == 0f64 { continue; }
            let h = wl.confidence_all(source, positions);
            confidence.iter_mut()
                .zip(h)
                .for_each(|(f, h)| { *f += alpha * h; });
        }
        confidence
    }
}


/// Write `scores[i]` at the centre of the patch anchored at `positions[i]`.
fn paint(
    output: &mut Array2<f64>,
    positions: &[SamplePosition],
    scores: &[f64],
    half: usize,
)
{
    positions.iter()
        .zip(scores)
        .for_each(|(pos, score)| {
            output[[pos.row + half, pos.col + half]] = *score;
        });
}


/// The booster that trains the [`BoostedClassifier`] of one gt pair.
///
/// - `preprocess` draws the positive and negative samples
///   and sets the prior weights
///   (`FEEDBACK_SAMPLE_WEIGHT` for feedback images, `1` otherwise).
/// - `boost` trains one [`WeakLearner`]
///   and multiplies the new weights by the priors.
/// - `postprocess` returns the ensemble.
pub struct PairBooster<'a> {
    params: &'a Parameters,
    sm: &'a SmoothingMatrices,
    dataset: &'a Dataset,
    pair: usize,
    rng: StdRng,

    positions: SampleSet,
    labels: Vec<f64>,
    priors: Vec<f64>,
    weights: Vec<f64>,
    response: Vec<f64>,

    learners: Vec<WeakLearner>,
    log: TrainingLog,
    time_acc: u128,
}


impl<'a> PairBooster<'a> {
    /// Construct a new booster for `pair` of `dataset`.
    pub fn new(
        params: &'a Parameters,
        sm: &'a SmoothingMatrices,
        dataset: &'a Dataset,
        pair: usize,
        rng: StdRng,
    ) -> Self
    {
        let label = match dataset.gt_pair_values(pair) {
            Some((neg, pos)) => format!("gt pair {pair} ({neg} vs {pos})"),
            None => format!("gt pair {pair}"),
        };
        Self {
            params,
            sm,
            dataset,
            pair,
            rng,

            positions: Vec::new(),
            labels: Vec::new(),
            priors: Vec::new(),
            weights: Vec::new(),
            response: Vec::new(),

            learners: Vec::with_capacity(params.rounds),
            log: TrainingLog::new(label, params.print_every),
            time_acc: 0,
        }
    }


    /// Returns the log of the rounds run so far.
    pub fn log(&self) -> &TrainingLog {
        &self.log
    }


    /// Returns the current ensemble response of every sample.
    pub fn response(&self) -> &[f64] {
        &self.response
    }


    /// Returns the `+1`/`-1` labels of the samples.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }


    /// Returns the current sample weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }


    fn draw(&mut self, class: GtClass, count: usize) -> Result<SampleSet> {
        let mut positions = SampleSet::new();
        let n = self.dataset.sample_positions(
            class, self.pair, count, &mut positions, &mut self.rng
        )?;
        if n == 0 {
            return Err(Error::NoSamples { class: class.raw(), pair: self.pair });
        }
        Ok(positions)
    }
}


impl Booster for PairBooster<'_> {
    type Output = BoostedClassifier;


    fn name(&self) -> &str {
        "KernelBoost"
    }


    fn info(&self) -> Option<Vec<(&str, String)>> {
        let info = Vec::from([
            ("# of rounds", format!("{}", self.params.rounds)),
            ("Tree depth", format!("{}", self.params.tree_depth)),
            ("Filters per channel", format!("{}", self.params.filters_no)),
            ("Shrinkage", format!("{}", self.params.shrinkage_factor)),
        ]);
        Some(info)
    }


    fn preprocess(&mut self) -> Result<()> {
        let pos = self.draw(GtClass::Pos, self.params.pos_samples_no)?;
        let neg = self.draw(GtClass::Neg, self.params.neg_samples_no)?;
        info!(
            "{}: {} positive and {} negative samples",
            self.log.label(), pos.len(), neg.len(),
        );

        self.labels = std::iter::repeat(1f64).take(pos.len())
            .chain(std::iter::repeat(-1f64).take(neg.len()))
            .collect();
        self.positions = pos;
        self.positions.extend(neg);

        let dataset = self.dataset;
        self.priors = self.positions.iter()
            .map(|p| {
                if dataset.is_feedback_image(p.image) {
                    FEEDBACK_SAMPLE_WEIGHT
                } else {
                    1f64
                }
            })
            .collect();
        self.weights = self.priors.clone();
        self.response = vec![0f64; self.positions.len()];

        self.learners.clear();
        self.time_acc = 0;
        self.log.print_header(self.name(), self.info());
        Ok(())
    }


    fn boost(&mut self, iteration: usize) -> Result<ControlFlow<usize>> {
        if self.params.rounds < iteration {
            return Ok(ControlFlow::Break(self.params.rounds));
        }

        let now = Instant::now();
        let wl = WeakLearner::train(
            self.params,
            self.sm,
            self.dataset,
            &self.positions,
            &mut self.weights,
            &self.labels,
            &mut self.response,
            &mut self.rng,
        )?;
        self.weights.iter_mut()
            .zip(&self.priors)
            .for_each(|(w, p)| { *w *= p; });
        self.time_acc += now.elapsed().as_millis();

        self.log.record(RoundRecord {
            round: iteration,
            alpha: wl.alpha(),
            misclassification_rate: wl.misclassification_rate(),
            loss: wl.loss(),
            time_acc: self.time_acc,
        });
        self.learners.push(wl);

        Ok(ControlFlow::Continue(()))
    }


    fn postprocess(&mut self) -> Result<Self::Output> {
        self.log.finish();
        Ok(BoostedClassifier::new(self.learners.clone()))
    }
}
