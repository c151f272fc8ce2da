use super::boosted_classifier::BoostedClassifier;


/// The classifier that produces the final decision of a [`KernelBoost`].
///
/// With auto-context the final classifier is trained on its own
/// and owned here.
/// Without it, the final classifier *is* one of the per-pair classifiers,
/// referred to by its index, so that no second copy ever exists.
///
/// [`KernelBoost`]: super::KernelBoost
#[derive(Debug, Clone, PartialEq)]
pub enum FinalClassifier {
    /// An auto-context classifier owned by the ensemble.
    Owned(BoostedClassifier),
    /// The per-pair classifier at the given index.
    AliasOf(usize),
}


impl FinalClassifier {
    /// Resolve `self` against the per-pair classifiers.
    /// Returns `None` if an alias points past the end of `classifiers`.
    pub fn resolve<'a>(&'a self, classifiers: &'a [BoostedClassifier])
        -> Option<&'a BoostedClassifier>
    {
        match self {
            Self::Owned(classifier) => Some(classifier),
            Self::AliasOf(index) => classifiers.get(*index),
        }
    }


    /// Returns `true` if `self` owns its classifier.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}
