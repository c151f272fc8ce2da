//! Exports the standard types and traits used to train and apply KernelBoost.
//!
pub use crate::{
    // Configuration and errors
    Parameters,
    HoughParams,
    Error,
    Result,


    // Sampling ---------------------------------
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


    // Weak learning ----------------------------
    Classifier,
    Filter,
    FilterBank,
    SmoothingMatrices,
    RegressionTree,
    LineSearch,
    WeakLearner,


    // Boosting ---------------------------------
    Booster,
    BoostedClassifier,
    PairBooster,
    KernelBoost,
    FinalClassifier,
};

pub use crate::research::{
    TrainingLog,
    RoundRecord,
};
