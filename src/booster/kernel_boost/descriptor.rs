//! The JSON form of a [`KernelBoost`](super::KernelBoost).
use serde::{Serialize, Deserialize};

use crate::booster::BoostedClassifier;


/// `{"KernelBoost": {..}}`
#[derive(Serialize, Deserialize)]
pub(super) struct Descriptor {
    #[serde(rename = "KernelBoost")]
    pub(super) kernel_boost: KernelBoostDescriptor,
}


#[derive(Serialize, Deserialize)]
pub(super) struct KernelBoostDescriptor {
    #[serde(rename = "BoostedClassifiers")]
    pub(super) boosted_classifiers: Vec<BoostedClassifier>,

    #[serde(rename = "FinalClassifier")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) final_classifier: Option<BoostedClassifier>,

    #[serde(rename = "binaryThreshold")]
    pub(super) binary_threshold: f64,

    #[serde(rename = "fastClassifier")]
    pub(super) fast_classifier: bool,

    #[serde(rename = "RBCdetection")]
    pub(super) rbc_detection: bool,

    #[serde(rename = "useAutoContext")]
    pub(super) use_auto_context: bool,

    #[serde(rename = "sampleSize")]
    pub(super) sample_size: usize,

    #[serde(rename = "imgRescaleFactor")]
    pub(super) img_rescale_factor: f64,

    #[serde(rename = "houghMinDist")]
    pub(super) hough_min_dist: f64,

    #[serde(rename = "houghHThresh")]
    pub(super) hough_h_thresh: f64,

    #[serde(rename = "houghLThresh")]
    pub(super) hough_l_thresh: f64,

    #[serde(rename = "houghMinRad")]
    pub(super) hough_min_rad: i64,

    #[serde(rename = "houghMaxRad")]
    pub(super) hough_max_rad: i64,

    #[serde(rename = "Channels")]
    pub(super) channels: Vec<String>,
}
