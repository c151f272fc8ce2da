//! This file defines split rules for regression tree.
use ndarray::ArrayView1;
use serde::{Serialize, Deserialize};


/// The output of the function `split` of `Splitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LR {
    Left,
    Right,
}


/// Sends a sample to the left child
/// if its `feature`-th value is smaller than `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Splitter {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
}


impl Splitter {
    #[inline]
    pub(crate) fn new(feature: usize, threshold: f64) -> Self {
        Self { feature, threshold }
    }


    /// Defines the splitting.
    #[inline(always)]
    pub(crate) fn split(&self, row: ArrayView1<'_, f64>) -> LR {
        if row[self.feature] < self.threshold {
            LR::Left
        } else {
            LR::Right
        }
    }
}
