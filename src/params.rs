//! Defines the run configuration of KernelBoost.
use serde::{Serialize, Deserialize};

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};
use crate::common::DEFAULT_NBIN;


/// The default edge length of a sampled patch.
pub const DEFAULT_SAMPLE_SIZE: usize = 9;
/// The default edge length of a learned filter.
pub const DEFAULT_FILTER_SIZE: usize = 5;
/// The default number of candidate filters per channel and round.
pub const DEFAULT_FILTERS_NO: usize = 16;
/// The default depth of the regression trees.
pub const DEFAULT_TREE_DEPTH: usize = 2;
/// The default number of boosting rounds.
pub const DEFAULT_ROUNDS: usize = 50;
/// The default number of samples drawn per class.
pub const DEFAULT_SAMPLES_NO: usize = 2_000;


/// Parameters of the Hough circle detection.
/// They are carried through the descriptor but never consumed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Minimum distance between the centres of detected circles.
    pub min_dist: f64,
    /// Higher threshold of the Canny edge detector.
    pub h_thresh: f64,
    /// Accumulator threshold.
    pub l_thresh: f64,
    /// Minimum circle radius.
    pub min_rad: i64,
    /// Maximum circle radius.
    pub max_rad: i64,
}


impl Default for HoughParams {
    fn default() -> Self {
        Self {
            min_dist: 20.0,
            h_thresh: 100.0,
            l_thresh: 30.0,
            min_rad: 0,
            max_rad: 0,
        }
    }
}


/// A struct that keeps every parameter of a training or inference run.
///
/// Build it with the setters,
///
/// ```no_run
/// use kernelboost::prelude::*;
///
/// let params = Parameters::default()
///     .channel_list(["green", "gaussian", "sobel_x", "sobel_y"])
///     .gt_values([0, 255])
///     .sample_size(9)
///     .filter_size(5)
///     .tree_depth(2)
///     .rounds(100);
/// ```
///
/// or load it from a TOML file with [`Parameters::from_toml_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Root directory of the dataset.
    pub dataset_path: PathBuf,
    /// File (relative to `dataset_path`) listing the image paths.
    pub img_list: String,
    /// File (relative to `dataset_path`) listing the mask paths.
    pub mask_list: String,
    /// File (relative to `dataset_path`) listing the ground-truth paths.
    /// Leave it empty to load a dataset for inference.
    pub gt_list: String,
    /// Optional file listing the names of the feedback images.
    pub feedback_list: String,

    /// Ordered names of the channels to generate.
    pub channel_list: Vec<String>,
    /// Raw ground-truth values to classify.
    pub gt_values: Vec<i32>,

    /// Edge length of a sampled patch.
    pub sample_size: usize,
    /// Width of the replicated border around each image.
    pub border_size: usize,
    /// Edge length of a learned filter.
    pub filter_size: usize,
    /// Number of candidate filters learned per channel and round.
    pub filters_no: usize,
    /// Weight of the smoothness regularizer of the filters.
    pub smoothing_lambda: f64,

    /// Depth of the regression trees of the per-pair classifiers.
    pub tree_depth: usize,
    /// Depth of the regression trees of the auto-context classifier.
    pub final_tree_depth: usize,
    /// Number of histogram bins per feature in the regression trees.
    pub n_bins: usize,

    /// Number of positive samples drawn per pair.
    pub pos_samples_no: usize,
    /// Number of negative samples drawn per pair.
    pub neg_samples_no: usize,
    /// Number of samples per class for the auto-context classifier.
    pub final_samples_no: usize,

    /// Number of boosting rounds of the per-pair classifiers.
    pub rounds: usize,
    /// Number of boosting rounds of the auto-context classifier.
    pub final_rounds: usize,
    /// Factor applied to every line-search step.
    pub shrinkage_factor: f64,

    /// Train a second stage on the outputs of the per-pair classifiers.
    pub use_auto_context: bool,
    /// Classify only the evaluation points instead of the whole image.
    pub fast_classifier: bool,
    /// Threshold turning scores into a binary mask.
    pub threshold: f64,
    /// Whether red blood cell detection follows the classification.
    #[serde(rename = "RBCdetection")]
    pub rbc_detection: bool,
    /// Rescale factor applied to the images when they are loaded.
    pub img_rescale_factor: f64,
    /// Hough circle detection parameters.
    pub hough: HoughParams,

    /// Grid step of the evaluation points used by the fast classifier.
    pub eval_stride: usize,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Print the training log every `print_every` rounds.
    /// `usize::MAX` disables printing.
    pub print_every: usize,
    /// Optional CSV file that receives the per-round log.
    pub log_file: Option<PathBuf>,
}


impl Default for Parameters {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("."),
            img_list: String::from("images.txt"),
            mask_list: String::from("masks.txt"),
            gt_list: String::from("gts.txt"),
            feedback_list: String::new(),

            channel_list: vec![String::from("green")],
            gt_values: vec![0, 255],

            sample_size: DEFAULT_SAMPLE_SIZE,
            border_size: DEFAULT_SAMPLE_SIZE / 2,
            filter_size: DEFAULT_FILTER_SIZE,
            filters_no: DEFAULT_FILTERS_NO,
            smoothing_lambda: 1.0,

            tree_depth: DEFAULT_TREE_DEPTH,
            final_tree_depth: DEFAULT_TREE_DEPTH,
            n_bins: DEFAULT_NBIN,

            pos_samples_no: DEFAULT_SAMPLES_NO,
            neg_samples_no: DEFAULT_SAMPLES_NO,
            final_samples_no: DEFAULT_SAMPLES_NO,

            rounds: DEFAULT_ROUNDS,
            final_rounds: DEFAULT_ROUNDS,
            shrinkage_factor: 0.1,

            use_auto_context: false,
            fast_classifier: true,
            threshold: 0.0,
            rbc_detection: false,
            img_rescale_factor: 1.0,
            hough: HoughParams::default(),

            eval_stride: 1,
            seed: 1234,
            print_every: usize::MAX,
            log_file: None,
        }
    }
}


impl Parameters {
    /// Read the parameters from a TOML file.
    /// Missing keys take their default value.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }


    /// Parse the parameters from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let params: Self = toml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }


    /// Check the consistency of the parameters.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidParameter(msg));

        if self.sample_size == 0 {
            return invalid("`sample_size` must be positive".into());
        }
        if self.filter_size == 0 || self.filter_size > self.sample_size {
            return invalid(format!(
                "`filter_size` must be in [1, {}], got {}",
                self.sample_size, self.filter_size,
            ));
        }
        if self.border_size != self.sample_size / 2 {
            return invalid(format!(
                "`border_size` must be {}, got {}",
                self.sample_size / 2, self.border_size,
            ));
        }
        if !(self.shrinkage_factor > 0f64 && self.shrinkage_factor <= 1f64) {
            return invalid(format!(
                "`shrinkage_factor` must be in (0, 1], got {}",
                self.shrinkage_factor,
            ));
        }
        if self.channel_list.is_empty() {
            return invalid("`channel_list` is empty".into());
        }
        if self.filters_no == 0 || self.tree_depth == 0 {
            return invalid(
                "`filters_no` and `tree_depth` must be positive".into()
            );
        }
        if self.eval_stride == 0 {
            return invalid("`eval_stride` must be positive".into());
        }
        if self.img_rescale_factor <= 0f64 {
            return invalid(format!(
                "`img_rescale_factor` must be positive, got {}",
                self.img_rescale_factor,
            ));
        }
        Ok(())
    }


    /// Check the parameters that only matter for training.
    pub fn validate_training(&self) -> Result<()> {
        self.validate()?;
        let mut values = self.gt_values.clone();
        values.sort_unstable();
        values.dedup();
        if values.len() < 2 {
            return Err(Error::InvalidParameter(
                "at least two distinct `gt_values` are required".into()
            ));
        }
        if self.rounds == 0 {
            return Err(Error::InvalidParameter(
                "`rounds` must be positive".into()
            ));
        }
        Ok(())
    }


    /// Returns a copy of `self`
    /// whose sample counts, tree depth and rounds are
    /// those of the auto-context stage.
    pub fn final_stage(&self) -> Self {
        let mut params = self.clone();
        params.pos_samples_no = self.final_samples_no;
        params.neg_samples_no = self.final_samples_no;
        params.tree_depth = self.final_tree_depth;
        params.rounds = self.final_rounds;
        params
    }


    /// Set the dataset root directory.
    pub fn dataset_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dataset_path = path.as_ref().to_path_buf();
        self
    }


    /// Set the list of channels to generate.
    pub fn channel_list<I, S>(mut self, channels: I) -> Self
        where I: IntoIterator<Item = S>,
              S: AsRef<str>,
    {
        self.channel_list = channels.into_iter()
            .map(|ch| ch.as_ref().to_string())
            .collect();
        self
    }


    /// Set the ground-truth values to classify.
    pub fn gt_values<I>(mut self, values: I) -> Self
        where I: IntoIterator<Item = i32>,
    {
        self.gt_values = values.into_iter().collect();
        self
    }


    /// Set the patch size.
    /// The border size is set to `size / 2`.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self.border_size = size / 2;
        self
    }


    /// Set the border size.
    pub fn border_size(mut self, size: usize) -> Self {
        self.border_size = size;
        self
    }


    /// Set the edge length of the learned filters.
    pub fn filter_size(mut self, size: usize) -> Self {
        self.filter_size = size;
        self
    }


    /// Set the number of candidate filters per channel.
    pub fn filters_no(mut self, n_filters: usize) -> Self {
        self.filters_no = n_filters;
        self
    }


    /// Set the weight of the smoothness regularizer.
    pub fn smoothing_lambda(mut self, lambda: f64) -> Self {
        self.smoothing_lambda = lambda;
        self
    }


    /// Set the depth of the per-pair regression trees.
    pub fn tree_depth(mut self, depth: usize) -> Self {
        self.tree_depth = depth;
        self
    }


    /// Set the depth of the auto-context regression trees.
    pub fn final_tree_depth(mut self, depth: usize) -> Self {
        self.final_tree_depth = depth;
        self
    }


    /// Set the number of positive and negative samples per pair.
    pub fn samples_no(mut self, pos: usize, neg: usize) -> Self {
        self.pos_samples_no = pos;
        self.neg_samples_no = neg;
        self
    }


    /// Set the number of samples per class of the auto-context stage.
    pub fn final_samples_no(mut self, n_samples: usize) -> Self {
        self.final_samples_no = n_samples;
        self
    }


    /// Set the number of boosting rounds of the per-pair classifiers.
    pub fn rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }


    /// Set the number of boosting rounds of the auto-context classifier.
    pub fn final_rounds(mut self, rounds: usize) -> Self {
        self.final_rounds = rounds;
        self
    }


    /// Set the shrinkage factor.
    pub fn shrinkage_factor(mut self, factor: f64) -> Self {
        self.shrinkage_factor = factor;
        self
    }


    /// Enable or disable the auto-context stage.
    pub fn use_auto_context(mut self, flag: bool) -> Self {
        self.use_auto_context = flag;
        self
    }


    /// Enable or disable the fast (sparse) classification.
    pub fn fast_classifier(mut self, flag: bool) -> Self {
        self.fast_classifier = flag;
        self
    }


    /// Set the binary threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }


    /// Set the seed of the random number generator.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }


    /// Set the printing interval of the training log.
    pub fn print_every(mut self, round: usize) -> Self {
        self.print_every = round;
        self
    }


    /// Set the CSV file that receives the per-round log.
    pub fn log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let params = Parameters::default();
        assert!(params.validate_training().is_ok());
    }

    #[test]
    fn test_from_toml_str_01() {
        let text = r#"
            channel_list = ["green", "sobel_x"]
            gt_values = [0, 128, 255]
            sample_size = 7
            border_size = 3
            filter_size = 3
            use_auto_context = true
            RBCdetection = true

            [hough]
            min_rad = 4
            max_rad = 12
        "#;
        let params = Parameters::from_toml_str(text).unwrap();
        assert_eq!(params.channel_list, vec!["green", "sobel_x"]);
        assert_eq!(params.gt_values, vec![0, 128, 255]);
        assert_eq!(params.sample_size, 7);
        assert!(params.use_auto_context);
        assert!(params.rbc_detection);
        assert_eq!(params.hough.max_rad, 12);
        assert_eq!(params.tree_depth, DEFAULT_TREE_DEPTH);
    }

    #[test]
    fn test_from_toml_str_02() {
        let text = "filter_size = 11\nsample_size = 9\nborder_size = 4";
        let res = Parameters::from_toml_str(text);
        assert!(matches!(res, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_border_size_01() {
        let params = Parameters::default().sample_size(3).border_size(2);
        let res = params.validate();
        assert!(matches!(res, Err(Error::InvalidParameter(_))));

        let params = Parameters::default().sample_size(3).border_size(0);
        assert!(params.validate().is_err());

        let params = Parameters::default().sample_size(3).border_size(1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str_03() {
        let res = Parameters::from_toml_str("sample_size = \"nine\"");
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn test_final_stage_01() {
        let params = Parameters::default()
            .samples_no(10, 20)
            .final_samples_no(30)
            .tree_depth(2)
            .final_tree_depth(4)
            .rounds(5)
            .final_rounds(7);
        let fin = params.final_stage();
        assert_eq!(fin.pos_samples_no, 30);
        assert_eq!(fin.neg_samples_no, 30);
        assert_eq!(fin.tree_depth, 4);
        assert_eq!(fin.rounds, 7);
        assert_eq!(params.tree_depth, 2);
    }

    #[test]
    fn test_validate_training_01() {
        let params = Parameters::default().gt_values([3, 3]);
        assert!(params.validate_training().is_err());
    }
}
