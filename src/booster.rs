//! Provides the boosting layer of KernelBoost.

mod core;

// ------------------------------------------------
// Per-pair ensembles
mod boosted_classifier;

// ------------------------------------------------
// Cascade
mod final_classifier;
mod auto_context;
mod kernel_boost;


/// Booster trait
pub use self::core::Booster;

pub use self::boosted_classifier::{BoostedClassifier, PairBooster};

pub use self::final_classifier::FinalClassifier;
pub use self::kernel_boost::KernelBoost;
