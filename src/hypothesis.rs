//! The core library for the `Classifier` trait.
use crate::sample::{PatchSource, SamplePosition};


/// A trait that defines the behavor of a per-pixel classifier.
/// You only need to implement `confidence_all` method.
///
/// A classifier reads the square patches anchored at the given positions
/// and returns one real-valued confidence per position.
/// Positive values vote for the positive class of the gt pair.
pub trait Classifier {
    /// Computes the confidence of every patch anchored at `positions`.
    fn confidence_all<S>(&self, source: &S, positions: &[SamplePosition])
        -> Vec<f64>
        where S: PatchSource + ?Sized;


    /// Computes the confidence of the patch anchored at `position`.
    fn confidence<S>(&self, source: &S, position: &SamplePosition) -> f64
        where S: PatchSource + ?Sized
    {
        self.confidence_all(source, std::slice::from_ref(position))[0]
    }


    /// Predicts the labels of the patches anchored at `positions`.
    fn predict_all<S>(&self, source: &S, positions: &[SamplePosition])
        -> Vec<i64>
        where S: PatchSource + ?Sized
    {
        self.confidence_all(source, positions)
            .into_iter()
            .map(|conf| if conf >= 0.0 { 1 } else { -1 })
            .collect()
    }
}
