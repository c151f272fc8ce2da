use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand::seq::index;
use rayon::prelude::*;
use tracing::error;

use std::path::{Path, PathBuf};

use crate::{Error, Result};
use crate::common::MASK_INCLUDED;
use super::gt_class::GtClass;
use super::position::{PatchSource, SamplePosition, SampleSet};


/// The training-only part of a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GroundTruth {
    /// One labeled matrix per image, for each gt pair.
    pub(crate) pairs: Vec<Vec<Array2<GtClass>>>,
    /// The `(negative, positive)` raw values of each pair.
    pub(crate) pair_values: Vec<(i32, i32)>,
    /// The sorted, distinct raw values of the ground truth.
    pub(crate) values: Vec<i32>,
    /// The unmodified ground-truth images.
    pub(crate) original: Vec<Array2<i32>>,
}


/// A set of images decomposed into channels,
/// along with their masks and, for training, their ground truths.
///
/// - Channel matrices are padded by `border_size` replicated pixels.
/// - Masks and ground truths have the unbordered image size.
///
/// A `Dataset` is immutable once built.
/// The auto-context variant is a new `Dataset`
/// built from an existing one,
/// see [`Dataset::with_auto_context`].
///
/// Accessors given an index out of range log an error and
/// return an empty value instead of failing.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub(crate) data: Vec<Vec<Array2<f64>>>,
    pub(crate) channel_names: Vec<String>,
    pub(crate) image_names: Vec<String>,
    pub(crate) image_paths: Vec<PathBuf>,
    pub(crate) original_sizes: Vec<(usize, usize)>,
    pub(crate) feedback: Vec<bool>,
    pub(crate) sample_size: usize,
    pub(crate) border_size: usize,
    pub(crate) masks: Vec<Array2<u8>>,
    pub(crate) eval_points: Vec<SampleSet>,
    pub(crate) ground_truth: Option<GroundTruth>,
}


#[inline(always)]
fn empty_view<'a, T>() -> ArrayView2<'a, T> {
    let rows: &'a [[T; 0]] = &[];
    ArrayView2::from(rows)
}


impl Dataset {
    /// Returns the number of data channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }


    /// Returns the number of images.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.image_names.len()
    }


    /// Returns the edge length of a sampled patch.
    #[inline]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }


    /// Returns the width of the replicated border.
    #[inline]
    pub fn border_size(&self) -> usize {
        self.border_size
    }


    /// Returns the names of the channels.
    #[inline]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }


    /// Returns `true` if the dataset carries ground truths.
    #[inline]
    pub fn is_training(&self) -> bool {
        self.ground_truth.is_some()
    }


    /// Returns the bordered matrix of `channel` for `image`,
    /// or an empty view if either index is out of range.
    pub fn data(&self, channel: usize, image: usize) -> ArrayView2<'_, f64> {
        match self.data.get(channel).and_then(|ch| ch.get(image)) {
            Some(mat) => mat.view(),
            None => {
                error!(
                    "The requested image {image} does not exist in \
                    channel {channel} (limits: image = {}, channel = {})",
                    self.image_count(), self.channel_count(),
                );
                empty_view()
            },
        }
    }


    /// Returns every image of `channel`,
    /// or an empty slice if `channel` is out of range.
    pub fn data_vector(&self, channel: usize) -> &[Array2<f64>] {
        match self.data.get(channel) {
            Some(ch) => &ch[..],
            None => {
                error!(
                    "The requested data vector does not exist \
                    (channel = {channel}, limit = {})",
                    self.channel_count(),
                );
                &[]
            },
        }
    }


    /// Returns the bordered channels of `image`.
    pub fn channels_for_image(&self, image: usize) -> Vec<ArrayView2<'_, f64>> {
        if image >= self.image_count() {
            error!(
                "The requested image {image} does not exist (limit: {})",
                self.image_count(),
            );
            return Vec::new();
        }
        self.data.iter()
            .map(|ch| ch[image].view())
            .collect()
    }


    /// Returns the file name of `image`,
    /// or an empty string if `image` is out of range.
    pub fn image_name(&self, image: usize) -> &str {
        match self.image_names.get(image) {
            Some(name) => name,
            None => {
                error!("The requested image {image} does not exist");
                ""
            },
        }
    }


    /// Returns the path `image` was read from,
    /// or an empty path if `image` is out of range.
    pub fn image_path(&self, image: usize) -> &Path {
        match self.image_paths.get(image) {
            Some(path) => path,
            None => {
                error!("The requested image {image} does not exist");
                Path::new("")
            },
        }
    }


    /// Returns the `(rows, cols)` of `image` before rescaling,
    /// or `(0, 0)` if `image` is out of range.
    pub fn original_image_size(&self, image: usize) -> (usize, usize) {
        match self.original_sizes.get(image) {
            Some(size) => *size,
            None => {
                error!("The requested image {image} does not exist");
                (0, 0)
            },
        }
    }


    /// Returns the mask of `image`, or an empty view.
    pub fn mask(&self, image: usize) -> ArrayView2<'_, u8> {
        match self.masks.get(image) {
            Some(mask) => mask.view(),
            None => {
                error!(
                    "The requested image {image} does not exist \
                    (limit: image = {})",
                    self.image_count(),
                );
                empty_view()
            },
        }
    }


    /// Returns whether `image` has been returned by a technician
    /// as feedback. The samples of such images weigh more.
    pub fn is_feedback_image(&self, image: usize) -> bool {
        match self.feedback.get(image) {
            Some(flag) => *flag,
            None => {
                error!("The requested image {image} does not exist");
                false
            },
        }
    }


    /// Returns the evaluation points of `image`
    /// used by the fast classifier.
    pub fn eval_points(&self, image: usize) -> &[SamplePosition] {
        match self.eval_points.get(image) {
            Some(points) => &points[..],
            None => {
                error!("The requested image {image} does not exist");
                &[]
            },
        }
    }


    /// Returns the number of ground-truth pairs.
    #[inline]
    pub fn gt_pair_count(&self) -> usize {
        self.ground_truth.as_ref()
            .map_or(0, |gt| gt.pair_values.len())
    }


    /// Returns the number of distinct ground-truth values.
    #[inline]
    pub fn gt_values_count(&self) -> usize {
        self.ground_truth.as_ref()
            .map_or(0, |gt| gt.values.len())
    }


    /// Returns the distinct ground-truth values.
    pub fn gt_values(&self) -> &[i32] {
        self.ground_truth.as_ref()
            .map_or(&[], |gt| &gt.values[..])
    }


    /// Returns the `(negative, positive)` raw values of `pair`.
    pub fn gt_pair_values(&self, pair: usize) -> Option<(i32, i32)> {
        let values = self.ground_truth.as_ref()
            .and_then(|gt| gt.pair_values.get(pair).copied());
        if values.is_none() {
            error!("The desired gt pair ({pair}) does not exist");
        }
        values
    }


    /// Returns the raw value of the negative class of `pair`.
    pub fn gt_negative_pair_value(&self, pair: usize) -> Option<i32> {
        self.gt_pair_values(pair).map(|(neg, _)| neg)
    }


    /// Returns the raw value of the positive class of `pair`.
    pub fn gt_positive_pair_value(&self, pair: usize) -> Option<i32> {
        self.gt_pair_values(pair).map(|(_, pos)| pos)
    }


    /// Returns the labels of `image` for `pair`, or an empty view.
    pub fn gt(&self, pair: usize, image: usize) -> ArrayView2<'_, GtClass> {
        let gt = self.ground_truth.as_ref()
            .and_then(|gt| gt.pairs.get(pair))
            .and_then(|images| images.get(image));
        match gt {
            Some(gt) => gt.view(),
            None => {
                error!(
                    "The requested gt {image} does not exist in pair {pair} \
                    (limits: image = {}, pair = {})",
                    self.image_count(), self.gt_pair_count(),
                );
                empty_view()
            },
        }
    }


    /// Returns the labels of every image for `pair`, or an empty slice.
    pub fn gt_vector(&self, pair: usize) -> &[Array2<GtClass>] {
        let gts = self.ground_truth.as_ref()
            .and_then(|gt| gt.pairs.get(pair));
        match gts {
            Some(gts) => &gts[..],
            None => {
                error!(
                    "The requested gt vector does not exist \
                    (pair = {pair}, limit = {})",
                    self.gt_pair_count(),
                );
                &[]
            },
        }
    }


    /// Returns the unmodified ground truth of `image`, or an empty view.
    pub fn original_gt(&self, image: usize) -> ArrayView2<'_, i32> {
        let gt = self.ground_truth.as_ref()
            .and_then(|gt| gt.original.get(image));
        match gt {
            Some(gt) => gt.view(),
            None => {
                error!("The requested original gt ({image}) does not exist");
                empty_view()
            },
        }
    }


    /// Returns `true` if the patch anchored at `(row, col)` of `image`
    /// fits in the bordered image.
    #[inline]
    pub fn is_valid_position(&self, image: usize, row: usize, col: usize)
        -> bool
    {
        match self.masks.get(image) {
            Some(mask) => fits(mask.dim(), self.border_size, self.sample_size, row, col),
            None => false,
        }
    }


    /// Collect the positions of `pair` labeled `class`,
    /// restricted to valid, mask-included pixels.
    /// When more than `count` positions exist,
    /// `count` of them are drawn uniformly without replacement.
    ///
    /// On success, `positions` is replaced by the drawn positions and
    /// their number is returned.
    /// On failure (`class == GtClass::Ignore`, unknown pair,
    /// inference dataset), `positions` is left untouched.
    pub fn sample_positions<R: Rng>(
        &self,
        class: GtClass,
        pair: usize,
        count: usize,
        positions: &mut SampleSet,
        rng: &mut R,
    ) -> Result<usize>
    {
        if class == GtClass::Ignore {
            return Err(Error::InvalidClass(class.raw()));
        }
        let gt = self.ground_truth.as_ref()
            .ok_or(Error::MissingGroundTruth)?;
        let gts = gt.pairs.get(pair)
            .ok_or(Error::IndexOutOfRange {
                what: "gt pair", index: pair, limit: gt.pairs.len(),
            })?;

        let available = self.collect_all_sample_positions(gts, class);

        let n_available = available.len();
        *positions = if n_available <= count {
            available
        } else {
            let mut picked = index::sample(rng, n_available, count)
                .into_vec();
            picked.sort_unstable();
            picked.into_iter()
                .map(|i| available[i])
                .collect()
        };

        Ok(positions.len())
    }


    /// Collect every valid, mask-included position of class `class`,
    /// image by image.
    fn collect_all_sample_positions(
        &self,
        gts: &[Array2<GtClass>],
        class: GtClass,
    ) -> SampleSet
    {
        gts.par_iter()
            .zip(&self.masks[..])
            .enumerate()
            .map(|(image, (gt, mask))| {
                gt.indexed_iter()
                    .filter(|&((r, c), label)| {
                        *label == class
                            && mask[[r, c]] == MASK_INCLUDED
                            && fits(
                                mask.dim(),
                                self.border_size,
                                self.sample_size,
                                r, c,
                            )
                    })
                    .map(|((r, c), _)| SamplePosition::new(image, r, c))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }


    /// Drop samples from `positions` until `desired_size` remain.
    /// The kept samples are drawn uniformly without replacement.
    ///
    /// Requires `0 < desired_size <= positions.len()`.
    pub fn shrink_sample_positions<R: Rng>(
        positions: &mut SampleSet,
        desired_size: usize,
        rng: &mut R,
    ) -> Result<()>
    {
        let n_sample = positions.len();
        if desired_size == 0 || desired_size > n_sample {
            return Err(Error::InvalidParameter(format!(
                "cannot shrink {n_sample} sample positions \
                to {desired_size}"
            )));
        }

        let shrunk = index::sample(rng, n_sample, desired_size)
            .into_iter()
            .map(|i| positions[i])
            .collect();
        *positions = shrunk;
        Ok(())
    }


    /// Returns a matrix whose `i`-th row is the row-major flattening of
    /// the `size x size` patch of `channel` read at
    /// `positions[i] + (row_offset, col_offset)`.
    pub fn sample_matrix(
        &self,
        positions: &[SamplePosition],
        channel: usize,
        row_offset: usize,
        col_offset: usize,
        size: usize,
    ) -> Result<Array2<f64>>
    {
        if channel >= self.channel_count() {
            return Err(Error::IndexOutOfRange {
                what: "channel", index: channel, limit: self.channel_count(),
            });
        }
        if row_offset + size > self.sample_size
            || col_offset + size > self.sample_size
        {
            return Err(Error::InvalidParameter(format!(
                "a {size} x {size} block at offset ({row_offset}, \
                {col_offset}) exceeds the {0} x {0} patch",
                self.sample_size,
            )));
        }
        Ok(self.patch_matrix(positions, channel, row_offset, col_offset, size))
    }
}


impl PatchSource for Dataset {
    #[inline]
    fn channel_count(&self) -> usize {
        self.data.len()
    }


    #[inline]
    fn channel(&self, channel: usize, image: usize) -> ArrayView2<'_, f64> {
        self.data[channel][image].view()
    }
}


/// Returns `true` if a `size x size` patch anchored at `(row, col)`
/// fits an image of unbordered shape `dim` padded by `border`.
#[inline(always)]
pub(crate) fn fits(
    dim: (usize, usize),
    border: usize,
    size: usize,
    row: usize,
    col: usize,
) -> bool
{
    let (rows, cols) = dim;
    row + size <= rows + 2 * border && col + size <= cols + 2 * border
}
