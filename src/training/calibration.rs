//! Platt scaling (sigmoid calibration) of raw ensemble margins

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Maps a raw score to `sigmoid(a * score + b)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattCalibrator {
    a: f64,
    b: f64,
}

impl PlattCalibrator {
    const MAX_ITER: usize = 100;
    const TOL: f64 = 1e-10;

    /// Plain logistic link, `sigmoid(score)`
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0 }
    }

    pub fn parameters(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    pub fn probability(&self, score: f64) -> f64 {
        sigmoid(self.a * score + self.b)
    }

    /// Fit on scores and boolean labels using Newton's method with backtracking.
    ///
    /// Targets use Platt's smoothing, `(n+ + 1)/(n+ + 2)` and `1/(n- + 2)`, so the
    /// optimum stays finite on separable scores. A non-increasing or non-finite fit
    /// falls back to the identity link.
    pub fn fit(scores: ArrayView1<f64>, labels: &[bool]) -> Self {
        let n = scores.len().min(labels.len());
        if n == 0 {
            return Self::identity();
        }

        let n_pos = labels[..n].iter().filter(|&&y| y).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels[..n]
            .iter()
            .map(|&y| if y { target_pos } else { target_neg })
            .collect();

        let objective = |a: f64, b: f64| -> f64 {
            let mut total = 0.0;
            for i in 0..n {
                let z = a * scores[i] + b;
                // log(1 + e^z) - t*z, computed stably
                let softplus = if z > 0.0 {
                    z + (-z).exp().ln_1p()
                } else {
                    z.exp().ln_1p()
                };
                total += softplus - targets[i] * z;
            }
            total
        };

        let mut a = 1.0;
        let mut b = 0.0;
        let mut current = objective(a, b);

        for _ in 0..Self::MAX_ITER {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            let mut hess_aa = 1e-12;
            let mut hess_ab = 0.0;
            let mut hess_bb = 1e-12;

            for i in 0..n {
                let f = scores[i];
                let p = sigmoid(a * f + b);
                let d1 = p - targets[i];
                let d2 = p * (1.0 - p);
                grad_a += f * d1;
                grad_b += d1;
                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            if grad_a.abs() < Self::TOL && grad_b.abs() < Self::TOL {
                break;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-18 {
                break;
            }
            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;

            let mut step = 1.0;
            let mut improved = false;
            while step >= 1e-10 {
                let next_a = a - step * delta_a;
                let next_b = b - step * delta_b;
                let value = objective(next_a, next_b);
                if value < current + 1e-4 * step * (grad_a * -delta_a + grad_b * -delta_b) {
                    a = next_a;
                    b = next_b;
                    current = value;
                    improved = true;
                    break;
                }
                step /= 2.0;
            }
            if !improved {
                break;
            }
        }

        if !a.is_finite() || !b.is_finite() || a <= 0.0 {
            warn!(a, b, "platt calibration did not converge to an increasing map, using identity");
            return Self::identity();
        }
        Self { a, b }
    }
}

impl Default for PlattCalibrator {
    fn default() -> Self {
        Self::identity()
    }
}
