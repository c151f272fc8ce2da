//! Defines the error type returned by fallible operations of this crate.
use std::io;
use std::path::PathBuf;

use thiserror::Error as ThisError;


/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;


/// Errors that abort a KernelBoost operation.
///
/// Construction-time and descriptor errors are always returned,
/// never logged-and-ignored.
/// The caller is expected to abort the operation it was performing.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The JSON descriptor could not be parsed or is incomplete.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// An I/O error occurred while reading or writing a file.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An image could not be decoded.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A path listed in the configuration does not exist.
    #[error("invalid path `{}`", .0.display())]
    InvalidPath(PathBuf),

    /// Two matrices that must share a shape do not.
    #[error(
        "dimension mismatch for {what}: \
        expected {expected:?}, got {got:?}"
    )]
    DimensionMismatch {
        /// Description of the mismatching item.
        what: String,
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Actual `(rows, cols)`.
        got: (usize, usize),
    },

    /// A sample class other than `Pos` or `Neg` was requested.
    #[error("sample class must be either positive or negative, got {0}")]
    InvalidClass(i32),

    /// An index is outside of the valid range.
    #[error("{what} index {index} is out of range (limit: {limit})")]
    IndexOutOfRange {
        /// Kind of the index (channel, image, pair, ...).
        what: &'static str,
        /// The requested index.
        index: usize,
        /// The number of available items.
        limit: usize,
    },

    /// A parameter value violates a precondition.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A training-only operation was requested on an inference dataset.
    #[error("the dataset carries no ground truth")]
    MissingGroundTruth,

    /// No sample of the requested class is available.
    #[error("no sample available for class {class} of gt pair {pair}")]
    NoSamples {
        /// Raw value of the requested class.
        class: i32,
        /// The gt pair.
        pair: usize,
    },
}


impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDescriptor(err.to_string())
    }
}
