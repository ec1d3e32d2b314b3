//! Running statistics merged batch-wise with Chan's parallel algorithm.
//!
//! Every update folds the moments of a whole batch into the accumulated
//! moments, so a stream of batches produces the same statistics as one
//! update over their concatenation (up to floating-point error).
//!
//! # Example
//! ```ignore
//! use amp_rl::core::RunningMeanStd;
//!
//! let mut stats = RunningMeanStd::new(2);
//! stats.update(&[1.0, 2.0, 3.0, 4.0])?; // two samples of dim 2
//! assert!((stats.mean()[0] - 2.0).abs() < 1e-3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AmpError, Result};

/// Pseudo-count the accumulator starts from.
pub const DEFAULT_COUNT_EPSILON: f64 = 1e-4;

/// Per-dimension running mean and population variance.
///
/// Starts at mean 0, variance 1 and a count of `epsilon`; the count only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningMeanStd {
    mean: Vec<f64>,
    var: Vec<f64>,
    count: f64,
}

impl RunningMeanStd {
    /// Create an accumulator for `dim`-dimensional samples.
    pub fn new(dim: usize) -> Self {
        Self::with_epsilon(dim, DEFAULT_COUNT_EPSILON)
    }

    /// Create with a custom initial pseudo-count.
    pub fn with_epsilon(dim: usize, epsilon: f64) -> Self {
        Self {
            mean: vec![0.0; dim],
            var: vec![1.0; dim],
            count: epsilon,
        }
    }

    /// Fold a flattened batch `[n * dim]` into the statistics.
    ///
    /// The batch variance is the population variance. An empty batch is a
    /// no-op.
    pub fn update(&mut self, batch: &[f32]) -> Result<()> {
        let dim = self.dim();
        if dim == 0 || batch.len() % dim != 0 {
            return Err(AmpError::ShapeMismatch {
                what: "running statistics batch",
                expected: vec![batch.len() / dim.max(1), dim],
                actual: vec![batch.len()],
            });
        }
        let n = batch.len() / dim;
        if n == 0 {
            return Ok(());
        }

        let mut batch_mean = vec![0.0f64; dim];
        for row in batch.chunks_exact(dim) {
            for (m, &x) in batch_mean.iter_mut().zip(row) {
                *m += x as f64;
            }
        }
        batch_mean.iter_mut().for_each(|m| *m /= n as f64);

        let mut batch_var = vec![0.0f64; dim];
        for row in batch.chunks_exact(dim) {
            for ((v, &x), m) in batch_var.iter_mut().zip(row).zip(&batch_mean) {
                let d = x as f64 - m;
                *v += d * d;
            }
        }
        batch_var.iter_mut().for_each(|v| *v /= n as f64);

        self.update_from_moments(&batch_mean, &batch_var, n as f64)
    }

    /// Merge precomputed batch moments.
    ///
    /// ```text
    /// delta    = m_b - m_a
    /// mean     = m_a + delta * n_b / (n_a + n_b)
    /// M2       = v_a * n_a + v_b * n_b + delta^2 * n_a * n_b / (n_a + n_b)
    /// var      = M2 / (n_a + n_b)
    /// ```
    pub fn update_from_moments(&mut self, batch_mean: &[f64], batch_var: &[f64], batch_count: f64) -> Result<()> {
        let dim = self.dim();
        if batch_mean.len() != dim || batch_var.len() != dim {
            return Err(AmpError::ShapeMismatch {
                what: "running statistics moments",
                expected: vec![dim],
                actual: vec![batch_mean.len(), batch_var.len()],
            });
        }
        if batch_count <= 0.0 {
            return Ok(());
        }

        let total = self.count + batch_count;
        for i in 0..dim {
            let delta = batch_mean[i] - self.mean[i];
            let m2 = self.var[i] * self.count
                + batch_var[i] * batch_count
                + delta * delta * self.count * batch_count / total;
            self.mean[i] += delta * batch_count / total;
            self.var[i] = m2 / total;
        }
        self.count = total;
        Ok(())
    }

    /// Get the mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Get the population variance vector.
    pub fn var(&self) -> &[f64] {
        &self.var
    }

    /// Get the (pseudo-)sample count.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Get the dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}
