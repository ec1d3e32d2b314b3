//! Clipped standardization for AMP discriminator inputs.
//!
//! The discriminator sees `(state, next_state)` pairs normalized by statistics
//! accumulated over both policy-generated and expert transitions:
//!
//! ```text
//! y = clamp((x - mean) / sqrt(var + epsilon), -clip, clip)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut normalizer = Normalizer::new(amp_obs_dim);
//!
//! // During the update: fold policy and expert batches into the statistics
//! normalizer.update_from_sources(&policy_states, &expert_states)?;
//!
//! // During reward relabeling: only normalize
//! let normalized = normalizer.normalize(&amp_obs)?;
//! ```

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{tensor_from_vec, RunningMeanStd};
use crate::error::{AmpError, Result};

/// Configuration for the clipped normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Added to the variance before taking the square root.
    pub epsilon: f64,
    /// Normalized values are clipped to `[-clip, clip]`.
    pub clip: f32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            clip: 10.0,
        }
    }
}

impl NormalizerConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set epsilon for numerical stability.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the clip bound.
    pub fn with_clip(mut self, clip: f32) -> Self {
        self.clip = clip;
        self
    }
}

/// Running-statistics normalizer with a symmetric clip.
///
/// Serialized as-is into checkpoints under `amp_normalizer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    stats: RunningMeanStd,
    config: NormalizerConfig,
}

impl Normalizer {
    /// Create a normalizer for inputs of the given dimensionality.
    pub fn new(input_dim: usize) -> Self {
        Self::with_config(input_dim, NormalizerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(input_dim: usize, config: NormalizerConfig) -> Self {
        Self {
            stats: RunningMeanStd::with_epsilon(input_dim, config.epsilon),
            config,
        }
    }

    /// Get the input dimensionality.
    pub fn input_dim(&self) -> usize {
        self.stats.dim()
    }

    /// Get the underlying statistics.
    pub fn stats(&self) -> &RunningMeanStd {
        &self.stats
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Fold a flattened batch `[n * input_dim]` into the statistics.
    pub fn update(&mut self, batch: &[f32]) -> Result<()> {
        self.stats.update(batch)
    }

    /// Fold policy-generated and expert samples in as one stacked batch.
    pub fn update_from_sources(&mut self, policy: &[f32], expert: &[f32]) -> Result<()> {
        let mut stacked = Vec::with_capacity(policy.len() + expert.len());
        stacked.extend_from_slice(policy);
        stacked.extend_from_slice(expert);
        self.update(&stacked)
    }

    /// Normalize a flattened batch without touching the statistics.
    pub fn normalize(&self, batch: &[f32]) -> Result<Vec<f32>> {
        let dim = self.input_dim();
        if dim == 0 || batch.len() % dim != 0 {
            return Err(AmpError::ShapeMismatch {
                what: "normalizer input",
                expected: vec![batch.len() / dim.max(1), dim],
                actual: vec![batch.len()],
            });
        }

        let (mean, std) = self.mean_std();
        let clip = self.config.clip;
        let mut out = Vec::with_capacity(batch.len());
        for row in batch.chunks_exact(dim) {
            out.extend(
                row.iter()
                    .zip(mean.iter().zip(&std))
                    .map(|(&x, (&m, &s))| ((x - m) / s).clamp(-clip, clip)),
            );
        }
        Ok(out)
    }

    /// Normalize a tensor of shape `[batch, input_dim]`.
    pub fn normalize_tensor<B: Backend>(&self, x: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let [_, dim] = x.dims();
        if dim != self.input_dim() {
            return Err(AmpError::ShapeMismatch {
                what: "normalizer tensor input",
                expected: vec![self.input_dim()],
                actual: x.dims().to_vec(),
            });
        }
        let device = x.device();
        let (mean, std) = self.mean_std();

        let mean_tensor = tensor_from_vec::<B, 2>(mean, [1, dim], &device);
        let std_tensor = tensor_from_vec::<B, 2>(std, [1, dim], &device);

        let clip = self.config.clip;
        Ok(((x - mean_tensor) / std_tensor).clamp(-clip, clip))
    }

    fn mean_std(&self) -> (Vec<f32>, Vec<f32>) {
        let mean = self.stats.mean().iter().map(|&m| m as f32).collect();
        let std = self
            .stats
            .var()
            .iter()
            .map(|&v| (v + self.config.epsilon).sqrt() as f32)
            .collect();
        (mean, std)
    }
}
