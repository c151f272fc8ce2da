#![warn(missing_docs)]

//!
//! A crate that trains and applies per-pixel image classifiers
//! with **KernelBoost**,
//! a boosting algorithm that learns its own convolution filters
//! instead of relying on hand-crafted features.
//!
//! The crate is organised around three layers.
//!
//! - Sampling
//!     [`Dataset`] owns the border-padded image channels, the masks
//!     and the ground-truth images.
//!     It turns labeled pixels into sample positions
//!     and extracts square patches around them.
//!
//! - Weak learning
//!     Each boosting round trains a [`WeakLearner`]:
//!     a per-channel [`FilterBank`] learned on one third of the samples,
//!     a [`RegressionTree`] fitted on the filter responses of another third,
//!     and a step size found by a [`LineSearch`] over the exponential loss.
//!
//! - Orchestration
//!     [`KernelBoost`] trains one [`BoostedClassifier`]
//!     per ground-truth pair and, optionally,
//!     a second *auto-context* stage that reads the outputs of the first one
//!     as additional channels.
//!
//! ```no_run
//! use kernelboost::prelude::*;
//!
//! let params = Parameters::from_toml_file("kernelboost.toml").unwrap();
//! let dataset = DatasetReader::new(&params).read().unwrap();
//! let sm = SmoothingMatrices::new(params.filter_size);
//!
//! let kb = KernelBoost::train(&params, &sm, &dataset).unwrap();
//! kb.save("classifier.json").unwrap();
//! ```

pub mod common;
pub mod error;
pub mod params;
pub mod sample;
pub mod hypothesis;
pub mod weak_learner;
pub mod booster;
pub mod research;
pub mod logging;

pub mod prelude;


pub use error::{Error, Result};
pub use params::{Parameters, HoughParams};

pub use sample::{
    GtClass,
    SamplePosition,
    SampleSet,
    PatchSource,
    ImageChannels,
    ChannelOp,
    Dataset,
    DatasetBuilder,
    ImageRecord,
    DatasetReader,
};

pub use hypothesis::Classifier;

pub use weak_learner::{
    Filter,
    FilterBank,
    SmoothingMatrices,
    RegressionTree,
    LineSearch,
    WeakLearner,
};

pub use booster::{
    Booster,
    BoostedClassifier,
    PairBooster,
    KernelBoost,
    FinalClassifier,
};
