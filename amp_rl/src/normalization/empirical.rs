//! Observation normalization from empirical statistics.
//!
//! Used for policy and critic observations when `empirical_normalization`
//! is enabled. Statistics are only updated in training mode and stop
//! updating once `until` samples have been seen.

use serde::{Deserialize, Serialize};

use crate::core::RunningMeanStd;
use crate::error::{AmpError, Result};

/// Added to the standard deviation before dividing.
pub const EMPIRICAL_EPSILON: f32 = 1e-2;

/// Default sample cap after which statistics freeze.
pub const DEFAULT_UNTIL: f64 = 1e8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalNormalizer {
    stats: RunningMeanStd,
    until: Option<f64>,
    #[serde(skip, default = "default_training")]
    training: bool,
}

fn default_training() -> bool {
    true
}

impl EmpiricalNormalizer {
    /// Create a normalizer in training mode with the default sample cap.
    pub fn new(dim: usize) -> Self {
        Self::with_until(dim, Some(DEFAULT_UNTIL))
    }

    /// Create with a custom sample cap; `None` never freezes.
    pub fn with_until(dim: usize, until: Option<f64>) -> Self {
        Self {
            stats: RunningMeanStd::with_epsilon(dim, 0.0),
            until,
            training: true,
        }
    }

    pub fn dim(&self) -> usize {
        self.stats.dim()
    }

    pub fn count(&self) -> f64 {
        self.stats.count()
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn train(&mut self) {
        self.training = true;
    }

    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Update the statistics if in training mode, then normalize.
    pub fn forward(&mut self, batch: &[f32]) -> Result<Vec<f32>> {
        if self.training {
            self.update(batch)?;
        }
        self.normalize(batch)
    }

    /// Fold a flattened batch in, unless the sample cap is reached.
    pub fn update(&mut self, batch: &[f32]) -> Result<()> {
        if let Some(until) = self.until {
            if self.stats.count() >= until {
                return Ok(());
            }
        }
        self.stats.update(batch)
    }

    /// `(x - mean) / (std + 1e-2)`, without updating.
    pub fn normalize(&self, batch: &[f32]) -> Result<Vec<f32>> {
        let dim = self.dim();
        if dim == 0 || batch.len() % dim != 0 {
            return Err(AmpError::ShapeMismatch {
                what: "empirical normalizer input",
                expected: vec![batch.len() / dim.max(1), dim],
                actual: vec![batch.len()],
            });
        }
        let mean: Vec<f32> = self.stats.mean().iter().map(|&m| m as f32).collect();
        let denom: Vec<f32> = self
            .stats
            .var()
            .iter()
            .map(|&v| v.sqrt() as f32 + EMPIRICAL_EPSILON)
            .collect();

        Ok(batch
            .chunks_exact(dim)
            .flat_map(|row| {
                row.iter()
                    .zip(mean.iter().zip(&denom))
                    .map(|(&x, (&m, &d))| (x - m) / d)
            })
            .collect())
    }
}
