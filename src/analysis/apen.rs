// Approximate entropy (ApEn) - signal regularity over a sliding window
//
// ApEn(m, r) compares the log-frequency of template matches at window
// lengths m and m+1. A regular signal repeats its templates, so the two
// frequencies agree and ApEn approaches 0; an unpredictable signal loses
// matches when the window grows, yielding larger values.
//
// Algorithm (for each k in {m, m+1}):
//   1. Build all contiguous subsequences x_i = U[i..i+k), i = 0..N-k
//   2. C_i(k) = count of x_j with Chebyshev distance to x_i <= r,
//      self-match (j == i) included
//   3. phi(k) = sum_i(ln(C_i(k))) / (N - k + 1)
//   4. ApEn = |phi(m) - phi(m+1)|
//
// Counts are floored at 1 before the log. With self-matches included,
// C_i >= 1 always holds for any r >= 0, so the floor is only reachable for
// a caller-supplied negative tolerance; it keeps ln(0) out of the sum in
// that degenerate case. A constant signal with the default tolerance
// (r = 0.2 * std = 0) matches every template against every other and
// yields exactly 0.
//
// Iteration order is fixed, so repeated evaluation over the same snapshot
// is bit-identical.

use crate::config::ApEnConfig;
use crate::error::PipelineError;

/// Approximate entropy estimator with fixed parameters
#[derive(Debug, Clone)]
pub struct ApEnEstimator {
    /// Embedding dimension m
    embedding_dim: usize,
    /// Multiplier applied to the population std-dev for the default tolerance
    tolerance_factor: f64,
}

impl Default for ApEnEstimator {
    fn default() -> Self {
        Self {
            embedding_dim: 2,
            tolerance_factor: 0.2,
        }
    }
}

impl ApEnEstimator {
    pub fn new(embedding_dim: usize, tolerance_factor: f64) -> Self {
        Self {
            embedding_dim,
            tolerance_factor,
        }
    }

    pub fn from_config(config: &ApEnConfig) -> Self {
        Self {
            embedding_dim: config.embedding_dim,
            tolerance_factor: config.tolerance_factor,
        }
    }

    /// Estimate ApEn with the default tolerance `factor * population_std(U)`
    pub fn estimate(&self, window: &[f64]) -> Result<f64, PipelineError> {
        let r = self.tolerance_factor * population_std_dev(window);
        self.estimate_with_tolerance(window, r)
    }

    /// Estimate ApEn with a caller-supplied tolerance, used unmodified
    pub fn estimate_with_tolerance(
        &self,
        window: &[f64],
        tolerance: f64,
    ) -> Result<f64, PipelineError> {
        let m = self.embedding_dim;
        // phi(m+1) needs at least one template of length m+1
        if window.len() <= m + 1 {
            return Err(PipelineError::InsufficientData {
                required: m + 2,
                available: window.len(),
            });
        }

        let phi_m = phi(window, m, tolerance);
        let phi_m1 = phi(window, m + 1, tolerance);
        Ok((phi_m - phi_m1).abs())
    }
}

/// phi(k): mean log template-match count at window length k
fn phi(u: &[f64], k: usize, r: f64) -> f64 {
    let template_count = u.len() - k + 1;
    let mut log_sum = 0.0_f64;

    for i in 0..template_count {
        let xi = &u[i..i + k];
        let mut matches = 0_usize;

        for j in 0..template_count {
            let xj = &u[j..j + k];
            if chebyshev(xi, xj) <= r {
                matches += 1;
            }
        }

        log_sum += (matches.max(1) as f64).ln();
    }

    log_sum / template_count as f64
}

/// Chebyshev distance: max absolute coordinate-wise difference
fn chebyshev(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}

/// Population standard deviation (divides by N, not N-1)
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
