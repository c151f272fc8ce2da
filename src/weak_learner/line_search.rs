use crate::common::{checker, BINARY_SEARCH_TOLERANCE, MAX_ALPHA};


const MAX_ITER: usize = 200;


/// Finds the step size `alpha` that minimizes the exponential loss
/// `sum_i exp(-y_i * (F_i + alpha * h_i))`
/// of the ensemble response `F` extended by the weak response `h`.
///
/// The loss is convex in `alpha`, so its derivative
/// `-sum_i y_i h_i exp(-y_i (F_i + alpha h_i))`
/// is non-decreasing and its root is bracketed, then found by bisection.
/// The bracket never grows past `[-MAX_ALPHA, MAX_ALPHA]`.
pub struct LineSearch<'a> {
    labels: &'a [f64],
    response: &'a [f64],
    weak: &'a [f64],
}


impl<'a> LineSearch<'a> {
    /// Construct a new line search.
    /// The three slices must have the same length.
    pub fn new(labels: &'a [f64], response: &'a [f64], weak: &'a [f64])
        -> Self
    {
        checker::round_buffers(labels.len(), weak, labels, response);
        Self { labels, response, weak }
    }


    /// Returns the loss-minimizing step.
    /// Returns `0` if the weak response is identically zero.
    pub fn run(&self) -> f64 {
        if self.weak.iter().all(|h| *h == 0f64) {
            return 0f64;
        }

        let d0 = self.derivative(0f64);
        if d0 == 0f64 { return 0f64; }

        // The root lies on the side where the derivative changes sign.
        let sign = if d0 < 0f64 { 1f64 } else { -1f64 };
        let mut lo = 0f64;
        let mut hi = sign;
        while hi.abs() < MAX_ALPHA && self.derivative(hi) * sign < 0f64 {
            lo = hi;
            hi *= 2f64;
        }
        let mut hi = hi.clamp(-MAX_ALPHA, MAX_ALPHA);
        if self.derivative(hi) * sign < 0f64 {
            return hi;
        }

        let mut iter = 0;
        while (hi - lo).abs() > BINARY_SEARCH_TOLERANCE && iter < MAX_ITER {
            let mid = (lo + hi) / 2f64;
            if self.derivative(mid) * sign < 0f64 {
                lo = mid;
            } else {
                hi = mid;
            }
            iter += 1;
        }

        (lo + hi) / 2f64
    }


    /// Returns the derivative of the loss at `alpha`.
    fn derivative(&self, alpha: f64) -> f64 {
        self.labels.iter()
            .zip(self.response)
            .zip(self.weak)
            .map(|((y, f), h)| -y * h * (-y * (f + alpha * h)).exp())
            .sum()
    }
}
