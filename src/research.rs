//! This directory provides some features for research.
//! Measure the followings of the boosting rounds
//! - Running time
//! - Misclassification rate
//! - Training loss
//! - Step size
//!
//! and report which channels the learned filters read.

/// Defines the per-round training log.
pub mod logger;

/// Defines the channel usage statistics.
pub mod statistics;


pub use logger::{TrainingLog, RoundRecord};
pub use statistics::channel_usage_report;
