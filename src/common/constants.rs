/// Tolerance of the bisection in [`LineSearch`](crate::LineSearch).
pub const BINARY_SEARCH_TOLERANCE: f64 = 1e-10;
/// Upper bound on the step size returned by the line search.
pub const MAX_ALPHA:               f64 = 1e3;
/// Tolerance used when comparing floating point values.
pub const NUMERIC_TOLERANCE:       f64 = 1e-9;

/// Prior weight of the samples drawn from a feedback image.
pub const FEEDBACK_SAMPLE_WEIGHT:  f64 = 10.0;

/// Mask value of a pixel that must not be sampled.
pub const MASK_EXCLUDED:            u8 = 0;
/// Mask value of a pixel that can be sampled.
pub const MASK_INCLUDED:            u8 = 255;

/// Default number of histogram bins per feature in the regression tree.
pub const DEFAULT_NBIN:          usize = 255;
/// Default L2 regularization on the regression tree leaves.
pub const DEFAULT_LAMBDA_L2:       f64 = 0.01;
/// Ridge term added to the smoothing regularizer of a filter.
pub const SMOOTHING_EPS:           f64 = 1e-6;
