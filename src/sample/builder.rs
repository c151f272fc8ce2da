use ndarray::Array2;
use tracing::debug;

use std::path::PathBuf;

use crate::{Error, Result};
use crate::common::MASK_INCLUDED;
use super::dataset::{fits, Dataset, GroundTruth};
use super::gt_class::GtClass;
use super::position::{SamplePosition, SampleSet};


/// One image handed to a [`DatasetBuilder`].
///
/// The channel matrices must already be padded by the builder's border,
/// the mask and the ground truth must not.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    name: String,
    path: PathBuf,
    original_size: Option<(usize, usize)>,
    channels: Vec<Array2<f64>>,
    mask: Array2<u8>,
    ground_truth: Option<Array2<i32>>,
    feedback: bool,
}


impl ImageRecord {
    /// Construct a new record from the bordered channels and the mask.
    pub fn new<S: Into<String>>(
        name: S,
        channels: Vec<Array2<f64>>,
        mask: Array2<u8>,
    ) -> Self
    {
        Self {
            name: name.into(),
            path: PathBuf::new(),
            original_size: None,
            channels,
            mask,
            ground_truth: None,
            feedback: false,
        }
    }


    /// Attach the raw ground truth of the image.
    pub fn ground_truth(mut self, gt: Array2<i32>) -> Self {
        self.ground_truth = Some(gt);
        self
    }


    /// Mark the image as technician feedback.
    pub fn feedback(mut self, flag: bool) -> Self {
        self.feedback = flag;
        self
    }


    /// Set the path the image was read from.
    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = path.into();
        self
    }


    /// Set the `(rows, cols)` of the image before any rescaling.
    /// Defaults to the mask size.
    pub fn original_size(mut self, rows: usize, cols: usize) -> Self {
        self.original_size = Some((rows, cols));
        self
    }
}


/// A builder that makes a [`Dataset`] from in-memory images.
///
/// ```
/// use kernelboost::prelude::*;
/// use ndarray::Array2;
///
/// let channel = Array2::<f64>::zeros((6, 6));
/// let mask = Array2::from_elem((4, 4), 255u8);
/// let gt = Array2::from_shape_fn((4, 4), |(r, _)| if r < 2 { -1 } else { 1 });
///
/// let dataset = DatasetBuilder::new(3, 1)
///     .channel_names(["gray"])
///     .image(ImageRecord::new("img0", vec![channel], mask).ground_truth(gt))
///     .build()
///     .unwrap();
///
/// assert_eq!(dataset.gt_pair_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    sample_size: usize,
    border_size: usize,
    eval_stride: usize,
    channel_names: Vec<String>,
    gt_values: Vec<i32>,
    records: Vec<ImageRecord>,
}


impl DatasetBuilder {
    /// Construct a new builder for patches of edge `sample_size`
    /// read from channels padded by `border_size` pixels.
    pub fn new(sample_size: usize, border_size: usize) -> Self {
        Self {
            sample_size,
            border_size,
            eval_stride: 1,
            channel_names: Vec::new(),
            gt_values: Vec::new(),
            records: Vec::new(),
        }
    }


    /// Set the grid step of the evaluation points.
    pub fn eval_stride(mut self, stride: usize) -> Self {
        self.eval_stride = stride;
        self
    }


    /// Set the channel names.
    /// When omitted, channels are named `ch0`, `ch1`, ...
    pub fn channel_names<I, S>(mut self, names: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>,
    {
        self.channel_names = names.into_iter().map(Into::into).collect();
        self
    }


    /// Set the ground-truth values that define the gt pairs.
    /// When omitted, the distinct values found in the ground truths
    /// are used.
    pub fn gt_values<I>(mut self, values: I) -> Self
        where I: IntoIterator<Item = i32>
    {
        self.gt_values = values.into_iter().collect();
        self
    }


    /// Append an image.
    pub fn image(mut self, record: ImageRecord) -> Self {
        self.push(record);
        self
    }


    /// Append an image.
    pub fn push(&mut self, record: ImageRecord) {
        self.records.push(record);
    }


    /// Validate the images and build the dataset.
    ///
    /// Fails on the first dimension mismatch,
    /// or if only some of the images carry a ground truth.
    pub fn build(self) -> Result<Dataset> {
        let Self {
            sample_size,
            border_size,
            eval_stride,
            mut channel_names,
            gt_values,
            records,
        } = self;

        if sample_size == 0 || eval_stride == 0 {
            return Err(Error::InvalidParameter(
                "sample size and evaluation stride must be positive".into()
            ));
        }
        // Patches are centred on their labeled pixel only for this border.
        if border_size != sample_size / 2 {
            return Err(Error::InvalidParameter(format!(
                "border size must be {} for sample size {sample_size}, got {border_size}",
                sample_size / 2,
            )));
        }
        let first = records.first()
            .ok_or_else(|| Error::InvalidParameter("no image given".into()))?;

        let n_channels = first.channels.len();
        if n_channels == 0 {
            return Err(Error::InvalidParameter("no channel given".into()));
        }
        if channel_names.is_empty() {
            channel_names = (0..n_channels).map(|c| format!("ch{c}"))
                .collect();
        }
        if channel_names.len() != n_channels {
            return Err(Error::InvalidParameter(format!(
                "{} channel names given for {n_channels} channels",
                channel_names.len(),
            )));
        }

        let dim = first.mask.dim();
        let bordered = (dim.0 + 2 * border_size, dim.1 + 2 * border_size);
        let is_training = first.ground_truth.is_some();

        for record in &records {
            check_dim(&record.name, "mask", dim, record.mask.dim())?;
            if record.channels.len() != n_channels {
                return Err(Error::InvalidParameter(format!(
                    "image `{}` has {} channels, expected {n_channels}",
                    record.name, record.channels.len(),
                )));
            }
            for (ch, name) in record.channels.iter().zip(&channel_names) {
                check_dim(&record.name, name, bordered, ch.dim())?;
            }
            match (&record.ground_truth, is_training) {
                (Some(gt), true) => {
                    check_dim(&record.name, "gt", dim, gt.dim())?;
                },
                (None, false) => {},
                _ => {
                    return Err(Error::MissingGroundTruth);
                },
            }
        }

        let n_images = records.len();
        let mut data = vec![Vec::with_capacity(n_images); n_channels];
        let mut image_names = Vec::with_capacity(n_images);
        let mut image_paths = Vec::with_capacity(n_images);
        let mut original_sizes = Vec::with_capacity(n_images);
        let mut feedback = Vec::with_capacity(n_images);
        let mut masks = Vec::with_capacity(n_images);
        let mut originals = Vec::with_capacity(n_images);

        for record in records {
            for (dst, ch) in data.iter_mut().zip(record.channels) {
                dst.push(ch);
            }
            original_sizes.push(record.original_size.unwrap_or(dim));
            image_names.push(record.name);
            image_paths.push(record.path);
            feedback.push(record.feedback);
            masks.push(record.mask);
            if let Some(gt) = record.ground_truth {
                originals.push(gt);
            }
        }

        let eval_points = masks.iter()
            .enumerate()
            .map(|(image, mask)| {
                eval_points(image, mask, border_size, sample_size, eval_stride)
            })
            .collect();

        let ground_truth = if is_training {
            Some(one_vs_one(gt_values, originals)?)
        } else {
            None
        };

        debug!(
            "built a dataset of {n_images} images, {n_channels} channels \
            ({} x {})",
            dim.0, dim.1,
        );

        Ok(Dataset {
            data,
            channel_names,
            image_names,
            image_paths,
            original_sizes,
            feedback,
            sample_size,
            border_size,
            masks,
            eval_points,
            ground_truth,
        })
    }
}


fn check_dim(
    image: &str,
    what: &str,
    expected: (usize, usize),
    got: (usize, usize),
) -> Result<()>
{
    if expected == got {
        return Ok(());
    }
    Err(Error::DimensionMismatch {
        what: format!("{what} of image `{image}`"),
        expected,
        got,
    })
}


/// Build the one-vs-one gt pairs over the sorted distinct `values`.
fn one_vs_one(mut values: Vec<i32>, original: Vec<Array2<i32>>)
    -> Result<GroundTruth>
{
    if values.is_empty() {
        values = original.iter()
            .flat_map(|gt| gt.iter().copied())
            .collect();
    }
    values.sort_unstable();
    values.dedup();

    if values.len() < 2 {
        return Err(Error::InvalidParameter(format!(
            "at least two ground-truth values are required, got {values:?}"
        )));
    }

    let pair_values = values.iter()
        .enumerate()
        .flat_map(|(i, &neg)| {
            values[i + 1..].iter().map(move |&pos| (neg, pos))
        })
        .collect::<Vec<_>>();

    let pairs = pair_values.iter()
        .map(|&pair| {
            original.iter()
                .map(|gt| label_pair(gt, |v| GtClass::from_pair(v, pair)))
                .collect()
        })
        .collect();

    Ok(GroundTruth { pairs, pair_values, values, original })
}


/// Label every pixel of `gt` with `labeler`.
pub(crate) fn label_pair<F>(gt: &Array2<i32>, labeler: F) -> Array2<GtClass>
    where F: Fn(i32) -> GtClass
{
    gt.mapv(labeler)
}


/// Returns the mask-included, valid positions of `image`
/// on a grid of step `stride`.
pub(crate) fn eval_points(
    image: usize,
    mask: &Array2<u8>,
    border: usize,
    size: usize,
    stride: usize,
) -> SampleSet
{
    let (rows, cols) = mask.dim();
    (0..rows).step_by(stride)
        .flat_map(|r| (0..cols).step_by(stride).map(move |c| (r, c)))
        .filter(|&(r, c)| {
            mask[[r, c]] == MASK_INCLUDED
                && fits((rows, cols), border, size, r, c)
        })
        .map(|(r, c)| SamplePosition::new(image, r, c))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, gt: Array2<i32>) -> ImageRecord {
        let ch = Array2::from_elem((6, 6), 0.5);
        let mask = Array2::from_elem((4, 4), MASK_INCLUDED);
        ImageRecord::new(name, vec![ch], mask).ground_truth(gt)
    }

    #[test]
    fn test_one_vs_one_01() {
        let gt = Array2::from_shape_fn((4, 4), |(r, _)| r as i32);
        let dataset = DatasetBuilder::new(3, 1)
            .image(record("a", gt))
            .build()
            .unwrap();

        assert_eq!(4, dataset.gt_values_count());
        assert_eq!(6, dataset.gt_pair_count());
        assert_eq!(Some((0, 1)), dataset.gt_pair_values(0));
        assert_eq!(Some((2, 3)), dataset.gt_pair_values(5));

        let labels = dataset.gt(5, 0);
        assert_eq!(GtClass::Ignore, labels[[0, 0]]);
        assert_eq!(GtClass::Neg, labels[[2, 0]]);
        assert_eq!(GtClass::Pos, labels[[3, 0]]);
    }

    #[test]
    fn test_dimension_mismatch_01() {
        let gt = Array2::zeros((4, 4));
        let bad = ImageRecord::new(
            "b",
            vec![Array2::zeros((5, 6))],
            Array2::from_elem((4, 4), MASK_INCLUDED),
        ).ground_truth(Array2::zeros((4, 4)));

        let res = DatasetBuilder::new(3, 1)
            .gt_values([0, 1])
            .image(record("a", gt))
            .image(bad)
            .build();
        assert!(matches!(res, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_border_size_01() {
        for border in [0, 2] {
            let ch = Array2::from_elem((4 + 2 * border, 4 + 2 * border), 0.5);
            let mask = Array2::from_elem((4, 4), MASK_INCLUDED);
            let res = DatasetBuilder::new(3, border)
                .image(ImageRecord::new("a", vec![ch], mask))
                .build();
            assert!(
                matches!(res, Err(Error::InvalidParameter(_))),
                "border {border} must be rejected, got {res:?}."
            );
        }
    }

    #[test]
    fn test_partial_gt_01() {
        let res = DatasetBuilder::new(3, 1)
            .gt_values([0, 1])
            .image(record("a", Array2::zeros((4, 4))))
            .image(ImageRecord::new(
                "b",
                vec![Array2::zeros((6, 6))],
                Array2::from_elem((4, 4), MASK_INCLUDED),
            ))
            .build();
        assert!(matches!(res, Err(Error::MissingGroundTruth)));
    }

    #[test]
    fn test_eval_points_01() {
        let mut mask = Array2::from_elem((4, 4), MASK_INCLUDED);
        mask[[0, 0]] = 0;
        // border 0, size 3: only rows/cols 0 and 1 are valid anchors.
        let points = eval_points(0, &mask, 0, 3, 1);
        let exp = vec![
            SamplePosition::new(0, 0, 1),
            SamplePosition::new(0, 1, 0),
            SamplePosition::new(0, 1, 1),
        ];
        assert_eq!(exp, points, "expected {exp:?}, got {points:?}.");
    }
}
