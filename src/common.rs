//! Defines some common functions used in this library.

/// Defines the numeric constants shared by the modules.
pub mod constants;

/// Defines some useful functions such as the exponential loss.
pub mod utils;

/// Defines some checker functions.
pub(crate) mod checker;

pub use constants::*;
