//! The files in `weak_learner/` directory define
//! a boosting round (`WeakLearner`) and its collaborators.

/// Defines the smoothness regularizer of the filters.
pub mod smoothing;

/// Defines the learned filters.
pub mod filter_bank;

/// Defines Regression Tree.
pub mod regression_tree;

/// Defines the step size search.
pub mod line_search;

/// Defines one boosting round.
pub mod learner;


pub use self::smoothing::SmoothingMatrices;
pub use self::filter_bank::{Filter, FilterBank};
pub use self::regression_tree::RegressionTree;
pub use self::line_search::LineSearch;
pub use self::learner::WeakLearner;

pub(crate) use self::learner::WeakLearnerEntry;
