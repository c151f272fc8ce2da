//! The sampling layer.
//! [`Dataset`] owns the image channels, masks and ground truths,
//! and turns labeled pixels into [`SamplePosition`]s.

// Provides the ground-truth class enumeration.
pub(crate) mod gt_class;
// Provides sample positions and the patch extraction trait.
pub(crate) mod position;
// Provides the channel generation operations.
pub(crate) mod channel_op;
// Provides the dataset struct.
pub(crate) mod dataset;
// Provides a builder over in-memory images.
pub(crate) mod builder;
// Provides a struct that reads a dataset from list files.
pub(crate) mod reader;


pub use gt_class::GtClass;
pub use position::{
    SamplePosition,
    SampleSet,
    PatchSource,
    ImageChannels,
};
pub use channel_op::ChannelOp;
pub use dataset::Dataset;
pub use builder::{DatasetBuilder, ImageRecord};
pub use reader::DatasetReader;
