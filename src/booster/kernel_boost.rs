//! Provides the top-level KernelBoost ensemble.
use ndarray::{Array2, ArrayView2};
use rand::prelude::*;
use rayon::prelude::*;
use tracing::{info, warn};

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result, Parameters, HoughParams};
use crate::common::{MASK_EXCLUDED, MASK_INCLUDED};
use crate::research::{TrainingLog, channel_usage_report};
use crate::sample::Dataset;
use crate::weak_learner::SmoothingMatrices;
use super::core::Booster;
use super::boosted_classifier::{BoostedClassifier, PairBooster};
use super::final_classifier::FinalClassifier;

mod descriptor;
use descriptor::{Descriptor, KernelBoostDescriptor};


/// The trained KernelBoost ensemble.
///
/// It owns one [`BoostedClassifier`] per gt pair
/// and a [`FinalClassifier`] that makes the final decision.
///
/// # Example
/// ```no_run
/// use kernelboost::prelude::*;
///
/// let params = Parameters::from_toml_file("kernelboost.toml").unwrap();
/// let train = DatasetReader::new(&params).read().unwrap();
/// let sm = SmoothingMatrices::new(params.filter_size);
/// let kb = KernelBoost::train(&params, &sm, &train).unwrap();
/// kb.save("kernelboost.json").unwrap();
///
/// let kb = KernelBoost::load("kernelboost.json").unwrap();
/// let scores = kb.classify(&train).unwrap();
/// let binary = kb.binarize(scores[0].view(), train.mask(0), train.border_size())
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KernelBoost {
    boosted_classifiers: Vec<BoostedClassifier>,
    final_classifier: FinalClassifier,
    binary_threshold: f64,
    fast_classifier: bool,
    rbc_detection: bool,
    use_auto_context: bool,
    sample_size: usize,
    img_rescale_factor: f64,
    hough: HoughParams,
    channels: Vec<String>,
}


impl KernelBoost {
    /// Train one [`BoostedClassifier`] per gt pair of `dataset`
    /// and, if `params.use_auto_context` is set,
    /// a final classifier on the augmented dataset.
    ///
    /// Without auto-context, `dataset` must define exactly one gt pair,
    /// whose classifier becomes the final one.
    pub fn train(
        params: &Parameters,
        sm: &SmoothingMatrices,
        dataset: &Dataset,
    ) -> Result<Self>
    {
        params.validate_training()?;
        if !dataset.is_training() {
            return Err(Error::MissingGroundTruth);
        }
        if sm.filter_size() != params.filter_size {
            return Err(Error::InvalidParameter(format!(
                "smoothing matrices are built for filters of size {}, \
                but `filter_size` is {}",
                sm.filter_size(), params.filter_size,
            )));
        }
        if dataset.sample_size() != params.sample_size {
            return Err(Error::InvalidParameter(format!(
                "the dataset samples patches of size {}, \
                but `sample_size` is {}",
                dataset.sample_size(), params.sample_size,
            )));
        }

        let n_pairs = dataset.gt_pair_count();
        if !params.use_auto_context && n_pairs != 1 {
            return Err(Error::InvalidParameter(format!(
                "exactly one gt pair is required without auto-context, \
                got {n_pairs}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut boosted_classifiers = Vec::with_capacity(n_pairs);
        for pair in 0..n_pairs {
            let seed = rng.gen::<u64>();
            let mut booster = PairBooster::new(
                params, sm, dataset, pair, StdRng::seed_from_u64(seed)
            );
            info!("training {} [{}]", booster.log().label(), booster.name());
            let classifier = booster.run()?;
            write_log(params, booster.log(), &format!("pair{pair}"))?;
            boosted_classifiers.push(classifier);
        }

        let final_classifier = if params.use_auto_context {
            let final_params = params.final_stage();
            let augmented = Dataset::with_auto_context(
                dataset, &boosted_classifiers
            )?;

            let seed = rng.gen::<u64>();
            let mut booster = PairBooster::new(
                &final_params, sm, &augmented, 0, StdRng::seed_from_u64(seed)
            );
            info!("training the auto-context classifier");
            let classifier = booster.run()?;
            write_log(params, booster.log(), "final")?;
            FinalClassifier::Owned(classifier)
        } else {
            FinalClassifier::AliasOf(0)
        };

        Ok(Self {
            boosted_classifiers,
            final_classifier,
            binary_threshold: params.threshold,
            fast_classifier: params.fast_classifier,
            rbc_detection: params.rbc_detection,
            use_auto_context: params.use_auto_context,
            sample_size: dataset.sample_size(),
            img_rescale_factor: params.img_rescale_factor,
            hough: params.hough,
            channels: dataset.channel_names().to_vec(),
        })
    }


    /// Parse an ensemble from its JSON descriptor.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let Descriptor { kernel_boost: desc } = serde_json::from_str(descriptor)?;

        if desc.boosted_classifiers.is_empty() {
            return Err(Error::InvalidDescriptor(
                "`BoostedClassifiers` is empty".into()
            ));
        }

        if desc.sample_size == 0 {
            return Err(Error::InvalidDescriptor(
                "`sampleSize` must be positive".into()
            ));
        }
        let n_channels = desc.channels.len();
        for (pair, classifier) in desc.boosted_classifiers.iter().enumerate() {
            classifier.validate(desc.sample_size, n_channels)
                .map_err(|e| in_classifier(e, &format!("pair {pair}")))?;
        }

        let final_classifier = match (desc.use_auto_context, desc.final_classifier) {
            (true, Some(classifier)) => {
                let n_channels = n_channels + desc.boosted_classifiers.len();
                classifier.validate(desc.sample_size, n_channels)
                    .map_err(|e| in_classifier(e, "final"))?;
                FinalClassifier::Owned(classifier)
            },
            (true, None) => {
                return Err(Error::InvalidDescriptor(
                    "`useAutoContext` is set but `FinalClassifier` is missing"
                        .into()
                ));
            },
            (false, final_classifier) => {
                if final_classifier.is_some() {
                    warn!("ignoring `FinalClassifier` since auto-context is off");
                }
                FinalClassifier::AliasOf(0)
            },
        };

        let hough = HoughParams {
            min_dist: desc.hough_min_dist,
            h_thresh: desc.hough_h_thresh,
            l_thresh: desc.hough_l_thresh,
            min_rad: desc.hough_min_rad,
            max_rad: desc.hough_max_rad,
        };

        Ok(Self {
            boosted_classifiers: desc.boosted_classifiers,
            final_classifier,
            binary_threshold: desc.binary_threshold,
            fast_classifier: desc.fast_classifier,
            rbc_detection: desc.rbc_detection,
            use_auto_context: desc.use_auto_context,
            sample_size: desc.sample_size,
            img_rescale_factor: desc.img_rescale_factor,
            hough,
            channels: desc.channels,
        })
    }


    /// Returns the JSON descriptor of the ensemble.
    pub fn to_descriptor(&self) -> Result<String> {
        let final_classifier = match &self.final_classifier {
            FinalClassifier::Owned(classifier) => Some(classifier.clone()),
            FinalClassifier::AliasOf(_) => None,
        };
        let kernel_boost = KernelBoostDescriptor {
            boosted_classifiers: self.boosted_classifiers.clone(),
            final_classifier,
            binary_threshold: self.binary_threshold,
            fast_classifier: self.fast_classifier,
            rbc_detection: self.rbc_detection,
            use_auto_context: self.use_auto_context,
            sample_size: self.sample_size,
            img_rescale_factor: self.img_rescale_factor,
            hough_min_dist: self.hough.min_dist,
            hough_h_thresh: self.hough.h_thresh,
            hough_l_thresh: self.hough.l_thresh,
            hough_min_rad: self.hough.min_rad,
            hough_max_rad: self.hough.max_rad,
            channels: self.channels.clone(),
        };
        Ok(serde_json::to_string_pretty(&Descriptor { kernel_boost })?)
    }


    /// Write the descriptor to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_descriptor()?)?;
        Ok(())
    }


    /// Read an ensemble from the descriptor stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        Self::from_descriptor(&fs::read_to_string(path)?)
    }


    /// Classify every image of `dataset`.
    ///
    /// Returns one score matrix of the bordered image size per image.
    /// In fast mode only the evaluation points are scored,
    /// the other pixels are `0`.
    /// If the ensemble was trained with auto-context,
    /// the augmented dataset is derived from `dataset` first.
    pub fn classify(&self, dataset: &Dataset) -> Result<Vec<Array2<f64>>> {
        if dataset.channel_count() != self.channels.len() {
            return Err(Error::InvalidParameter(format!(
                "the ensemble reads {} channels {:?}, the dataset has {}",
                self.channels.len(), self.channels, dataset.channel_count(),
            )));
        }
        if dataset.sample_size() != self.sample_size {
            return Err(Error::InvalidParameter(format!(
                "the ensemble reads patches of size {}, the dataset {}",
                self.sample_size, dataset.sample_size(),
            )));
        }
        let classifier = self.final_classifier()
            .ok_or_else(|| Error::InvalidDescriptor(
                "the final classifier is not available".into()
            ))?;

        let augmented;
        let source = if self.use_auto_context {
            augmented = Dataset::with_auto_context(
                dataset, &self.boosted_classifiers
            )?;
            &augmented
        } else {
            dataset
        };

        let scores = (0..source.image_count()).into_par_iter()
            .map(|image| {
                if self.fast_classifier {
                    classifier.classify_image(source, image)
                } else {
                    classifier.classify_full_image(
                        source.channels_for_image(image),
                        source.sample_size(),
                        source.border_size(),
                    )
                }
            })
            .collect::<Vec<_>>();
        Ok(scores)
    }


    /// Turn a bordered score matrix into a `0`/`255` mask
    /// of the unbordered size of `mask`.
    /// A pixel is set iff it is included in `mask`
    /// and its score is above the binary threshold.
    pub fn binarize(
        &self,
        score: ArrayView2<'_, f64>,
        mask: ArrayView2<'_, u8>,
        border: usize,
    ) -> Result<Array2<u8>>
    {
        let (rows, cols) = mask.dim();
        let expected = (rows + 2 * border, cols + 2 * border);
        if score.dim() != expected {
            return Err(Error::DimensionMismatch {
                what: "score matrix".into(),
                expected,
                got: score.dim(),
            });
        }

        let threshold = self.binary_threshold;
        let binary = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let included = mask[[r, c]] == MASK_INCLUDED;
            if included && score[[r + border, c + border]] > threshold {
                MASK_INCLUDED
            } else {
                MASK_EXCLUDED
            }
        });
        Ok(binary)
    }


    /// Write, for each classifier, how many retained filters
    /// read each channel.
    pub fn write_statistics<P: AsRef<Path>>(&self, path: P, dataset: &Dataset)
        -> Result<()>
    {
        let names = &self.channels;
        let mut report = String::new();
        for (pair, classifier) in self.boosted_classifiers.iter().enumerate() {
            let label = match dataset.gt_pair_values(pair) {
                Some((neg, pos)) => format!("gt pair {pair} ({neg} vs {pos})"),
                None => format!("gt pair {pair}"),
            };
            let counts = classifier.channel_usage(names.len());
            report.push_str(&channel_usage_report(&label, names, &counts));
            report.push('\n');
        }

        if let FinalClassifier::Owned(classifier) = &self.final_classifier {
            let names = names.iter()
                .cloned()
                .chain(
                    (0..self.boosted_classifiers.len())
                        .map(|k| format!("autocontext_{k}"))
                )
                .collect::<Vec<_>>();
            let counts = classifier.channel_usage(names.len());
            report.push_str(&channel_usage_report("final", &names, &counts));
        }

        fs::write(path, report)?;
        Ok(())
    }


    /// Returns the per-pair classifiers.
    pub fn boosted_classifiers(&self) -> &[BoostedClassifier] {
        &self.boosted_classifiers
    }


    /// Returns the classifier making the final decision.
    /// Without auto-context, this is the first per-pair classifier itself.
    pub fn final_classifier(&self) -> Option<&BoostedClassifier> {
        self.final_classifier.resolve(&self.boosted_classifiers)
    }


    /// Returns how the final classifier is held.
    pub fn final_classifier_kind(&self) -> &FinalClassifier {
        &self.final_classifier
    }


    /// Returns the threshold used by [`KernelBoost::binarize`].
    pub fn binary_threshold(&self) -> f64 {
        self.binary_threshold
    }


    /// Set the threshold used by [`KernelBoost::binarize`].
    pub fn set_binary_threshold(&mut self, threshold: f64) {
        self.binary_threshold = threshold;
    }


    /// Returns `true` if only the evaluation points are classified.
    pub fn is_fast_classifier(&self) -> bool {
        self.fast_classifier
    }


    /// Returns `true` if red blood cell detection follows.
    pub fn rbc_detection(&self) -> bool {
        self.rbc_detection
    }


    /// Returns `true` if the ensemble was trained with auto-context.
    pub fn uses_auto_context(&self) -> bool {
        self.use_auto_context
    }


    /// Returns the patch edge length.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }


    /// Returns the rescale factor of the input images.
    pub fn img_rescale_factor(&self) -> f64 {
        self.img_rescale_factor
    }


    /// Returns the Hough circle detection parameters.
    pub fn hough(&self) -> &HoughParams {
        &self.hough
    }


    /// Returns the ordered channel names.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }
}


/// Write the rounds of `log` next to `params.log_file`,
/// suffixed by `label`.
fn write_log(params: &Parameters, log: &TrainingLog, label: &str)
    -> Result<()>
{
    if let Some(path) = &params.log_file {
        log.write_csv(log_path(path, label))?;
    }
    Ok(())
}


/// `dir/log.csv` -> `dir/log_<label>.csv`
fn log_path(path: &Path, label: &str) -> PathBuf {
    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("log");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{label}.{ext}"),
        None => format!("{stem}_{label}"),
    };
    path.with_file_name(name)
}


/// Prefix a descriptor error with the classifier it comes from.
fn in_classifier(err: Error, label: &str) -> Error {
    match err {
        Error::InvalidDescriptor(msg) => {
            Error::InvalidDescriptor(format!("{label} classifier, {msg}"))
        },
        err => err,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn empty_ensemble() -> KernelBoost {
        KernelBoost {
            boosted_classifiers: vec![BoostedClassifier::default()],
            final_classifier: FinalClassifier::AliasOf(0),
            binary_threshold: 0.5,
            fast_classifier: true,
            rbc_detection: false,
            use_auto_context: false,
            sample_size: 3,
            img_rescale_factor: 1.0,
            hough: HoughParams::default(),
            channels: vec!["green".into()],
        }
    }


    #[test]
    fn test_log_path_01() {
        let res = log_path(Path::new("out/log.csv"), "pair0");
        assert_eq!(PathBuf::from("out/log_pair0.csv"), res);

        let res = log_path(Path::new("log"), "final");
        assert_eq!(PathBuf::from("log_final"), res);
    }


    #[test]
    fn test_binarize_01() {
        let kb = empty_ensemble();
        let score = array![
            [9.0, 9.0, 9.0, 9.0],
            [9.0, 1.0, 0.2, 9.0],
            [9.0, 0.7, 1.0, 9.0],
            [9.0, 9.0, 9.0, 9.0],
        ];
        let mask = array![[255, 255], [255, 0]];
        let res = kb.binarize(score.view(), mask.view(), 1).unwrap();
        let exp = array![[255, 0], [255, 0]];
        assert_eq!(exp, res, "expected {exp:?}, got {res:?}.");
    }


    #[test]
    fn test_binarize_02() {
        let kb = empty_ensemble();
        let score = Array2::<f64>::zeros((3, 3));
        let mask = Array2::from_elem((2, 2), 255u8);
        assert!(kb.binarize(score.view(), mask.view(), 1).is_err());
    }


    #[test]
    fn test_descriptor_01() {
        let kb = empty_ensemble();
        let text = kb.to_descriptor().unwrap();
        let json = serde_json::from_str::<serde_json::Value>(&text).unwrap();
        let body = &json["KernelBoost"];
        assert!(body["BoostedClassifiers"].is_array());
        assert!(body.get("FinalClassifier").is_none());
        assert_eq!(0.5, body["binaryThreshold"].as_f64().unwrap());
        assert_eq!("green", body["Channels"][0].as_str().unwrap());

        let res = KernelBoost::from_descriptor(&text).unwrap();
        assert_eq!(kb, res);
    }


    #[test]
    fn test_eq_01() {
        let kb = empty_ensemble();
        assert_eq!(kb, kb.clone());

        let mut owned = empty_ensemble();
        owned.final_classifier = FinalClassifier::Owned(
            BoostedClassifier::default()
        );
        owned.use_auto_context = true;
        assert_eq!(kb.final_classifier(), owned.final_classifier());
        assert_ne!(kb, owned);

        let mut gray = empty_ensemble();
        gray.channels = vec!["gray".into()];
        assert_ne!(kb, gray);

        let mut larger = empty_ensemble();
        larger.sample_size = 5;
        assert_ne!(kb, larger);
    }


    #[test]
    fn test_descriptor_02() {
        let text = r#"{"KernelBoost": {
            "BoostedClassifiers": [{"WeakLearners": []}],
            "binaryThreshold": 0.0,
            "fastClassifier": true,
            "RBCdetection": false,
            "useAutoContext": true,
            "sampleSize": 3,
            "imgRescaleFactor": 1.0,
            "houghMinDist": 20.0,
            "houghHThresh": 100.0,
            "houghLThresh": 30.0,
            "houghMinRad": 0,
            "houghMaxRad": 0,
            "Channels": ["green"]
        }}"#;
        let res = KernelBoost::from_descriptor(text);
        assert!(matches!(res, Err(Error::InvalidDescriptor(_))));

        let text = text.replace(r#"[{"WeakLearners": []}]"#, "[]");
        let res = KernelBoost::from_descriptor(&text);
        assert!(matches!(res, Err(Error::InvalidDescriptor(_))));
    }
}
