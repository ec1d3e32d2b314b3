//! Splitting dense rollouts into padded per-episode segments.
//!
//! Recurrent policies are trained on whole episode segments rather than on
//! the fixed `(T, E)` rollout grid. The segmenter cuts each environment's
//! column at its done flags and lays the pieces side by side:
//!
//! ```text
//!   rollout (T=6, E=2)           padded (max_len=4, S=4)
//!        env0 env1                 s0  s1  s2  s3
//!   t0    a0   b0             i0   a0  a2  b0  b4
//!   t1    a1*  b1             i1   a1  a3  b1  b5
//!   t2    a2   b2             i2   .   a4  b2  .
//!   t3    a3   b3*            i3   .   a5  b3  .
//!   t4    a4   b4
//!   t5    a5*  b5*            (* = done, last step always done)
//! ```
//!
//! Padding slots are zero and masked out.

use burn::prelude::*;
use burn::tensor::Bool;

use crate::core::{mask_from_vec, mask_to_vec, tensor_from_vec, tensor_to_vec};
use crate::error::{ensure_len, AmpError, Result};

/// Dimensions of a dense time-major rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutShape {
    pub steps: usize,
    pub num_envs: usize,
    pub feature_dim: usize,
}

impl RolloutShape {
    pub fn new(steps: usize, num_envs: usize, feature_dim: usize) -> Self {
        Self { steps, num_envs, feature_dim }
    }
}

/// Episode segments padded to a common length.
///
/// Layout is time-major: `data[(t * num_segments + s) * feature_dim + f]`,
/// `masks[t * num_segments + s]`. Segments are ordered by environment, then
/// by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedTrajectories {
    pub data: Vec<f32>,
    pub masks: Vec<bool>,
    pub lengths: Vec<usize>,
    pub max_len: usize,
    pub num_segments: usize,
    pub feature_dim: usize,
    /// Rollout length the segments were cut from.
    pub steps: usize,
    pub num_envs: usize,
}

impl PaddedTrajectories {
    /// Whether padded position `(t, s)` holds real data.
    pub fn is_valid(&self, t: usize, s: usize) -> bool {
        t < self.max_len && s < self.num_segments && self.masks[t * self.num_segments + s]
    }

    /// Valid rows of segment `s`, concatenated in time order.
    pub fn segment(&self, s: usize) -> Option<Vec<f32>> {
        let len = *self.lengths.get(s)?;
        let f = self.feature_dim;
        let mut out = Vec::with_capacity(len * f);
        for t in 0..len {
            let start = (t * self.num_segments + s) * f;
            out.extend_from_slice(&self.data[start..start + f]);
        }
        Some(out)
    }
}

/// Cut a `(T, E, F)` rollout at its done flags and zero-pad the pieces.
///
/// The last timestep is treated as done for every environment, so every
/// column ends a segment at `T - 1`. Segments are padded to the longest
/// segment.
pub fn split_and_pad_trajectories(
    x: &[f32],
    dones: &[bool],
    shape: RolloutShape,
) -> Result<PaddedTrajectories> {
    let RolloutShape { steps, num_envs, feature_dim } = shape;
    ensure_len("trajectory dones", dones, steps, num_envs)?;
    if x.len() != steps * num_envs * feature_dim {
        return Err(AmpError::ShapeMismatch {
            what: "trajectory observations",
            expected: vec![steps, num_envs, feature_dim],
            actual: vec![x.len()],
        });
    }

    // (env, start, len) in environment-major, time-minor order
    let mut segments = Vec::new();
    for env in 0..num_envs {
        let mut start = 0;
        for t in 0..steps {
            if dones[t * num_envs + env] || t + 1 == steps {
                segments.push((env, start, t + 1 - start));
                start = t + 1;
            }
        }
    }

    let num_segments = segments.len();
    let max_len = segments.iter().map(|&(_, _, len)| len).max().unwrap_or(0);
    let mut data = vec![0.0; max_len * num_segments * feature_dim];
    let mut masks = vec![false; max_len * num_segments];
    let mut lengths = Vec::with_capacity(num_segments);

    for (s, &(env, start, len)) in segments.iter().enumerate() {
        for i in 0..len {
            let src = ((start + i) * num_envs + env) * feature_dim;
            let dst = (i * num_segments + s) * feature_dim;
            data[dst..dst + feature_dim].copy_from_slice(&x[src..src + feature_dim]);
            masks[i * num_segments + s] = true;
        }
        lengths.push(len);
    }

    Ok(PaddedTrajectories {
        data,
        masks,
        lengths,
        max_len,
        num_segments,
        feature_dim,
        steps,
        num_envs,
    })
}

/// Inverse of [`split_and_pad_trajectories`]: back to a dense `(T, E, F)` buffer.
///
/// Valid entries are read segment by segment in mask order; their total must
/// be exactly `steps * num_envs`.
pub fn unpad_trajectories(padded: &PaddedTrajectories) -> Result<Vec<f32>> {
    let PaddedTrajectories {
        max_len,
        num_segments,
        feature_dim: f,
        steps,
        num_envs,
        ..
    } = *padded;
    ensure_len("padded masks", &padded.masks, max_len, num_segments)?;
    if padded.data.len() != max_len * num_segments * f {
        return Err(AmpError::ShapeMismatch {
            what: "padded trajectories",
            expected: vec![max_len, num_segments, f],
            actual: vec![padded.data.len()],
        });
    }

    // Environment-major rows: [E * T, F]
    let mut env_major = Vec::with_capacity(steps * num_envs * f);
    for s in 0..num_segments {
        for t in 0..max_len {
            if padded.masks[t * num_segments + s] {
                let start = (t * num_segments + s) * f;
                env_major.extend_from_slice(&padded.data[start..start + f]);
            }
        }
    }
    let valid = padded.masks.iter().filter(|&&m| m).count();
    if valid != steps * num_envs {
        return Err(AmpError::ShapeMismatch {
            what: "valid trajectory steps",
            expected: vec![steps, num_envs],
            actual: vec![valid],
        });
    }

    let mut out = vec![0.0; env_major.len()];
    for env in 0..num_envs {
        for t in 0..steps {
            let src = (env * steps + t) * f;
            let dst = (t * num_envs + env) * f;
            out[dst..dst + f].copy_from_slice(&env_major[src..src + f]);
        }
    }
    Ok(out)
}

/// Tensor form of [`split_and_pad_trajectories`].
///
/// Returns the padded `[max_len, S, F]` tensor and the `[max_len, S]` mask.
pub fn split_and_pad_tensor<B: Backend>(
    x: Tensor<B, 3>,
    dones: Tensor<B, 2, Bool>,
) -> Result<(Tensor<B, 3>, Tensor<B, 2, Bool>)> {
    let device = x.device();
    let (values, [steps, num_envs, feature_dim]) = tensor_to_vec(x);
    let (dones, done_dims) = mask_to_vec(dones);
    if done_dims != [steps, num_envs] {
        return Err(AmpError::ShapeMismatch {
            what: "trajectory dones tensor",
            expected: vec![steps, num_envs],
            actual: done_dims.to_vec(),
        });
    }

    let padded = split_and_pad_trajectories(
        &values,
        &dones,
        RolloutShape::new(steps, num_envs, feature_dim),
    )?;
    let shape = [padded.max_len, padded.num_segments, padded.feature_dim];
    let mask_shape = [padded.max_len, padded.num_segments];
    Ok((
        tensor_from_vec(padded.data, shape, &device),
        mask_from_vec(padded.masks, mask_shape, &device),
    ))
}

/// Tensor form of [`unpad_trajectories`] for a rollout of `steps` timesteps.
pub fn unpad_tensor<B: Backend>(
    trajectories: Tensor<B, 3>,
    masks: Tensor<B, 2, Bool>,
    steps: usize,
) -> Result<Tensor<B, 3>> {
    let device = trajectories.device();
    let (data, [max_len, num_segments, feature_dim]) = tensor_to_vec(trajectories);
    let (masks, mask_dims) = mask_to_vec(masks);
    if mask_dims != [max_len, num_segments] {
        return Err(AmpError::ShapeMismatch {
            what: "trajectory masks tensor",
            expected: vec![max_len, num_segments],
            actual: mask_dims.to_vec(),
        });
    }

    let valid = masks.iter().filter(|&&m| m).count();
    if steps == 0 || valid % steps != 0 {
        return Err(AmpError::ShapeMismatch {
            what: "valid trajectory steps",
            expected: vec![steps],
            actual: vec![valid],
        });
    }
    let lengths = (0..num_segments)
        .map(|s| (0..max_len).filter(|&t| masks[t * num_segments + s]).count())
        .collect();

    let padded = PaddedTrajectories {
        data,
        masks,
        lengths,
        max_len,
        num_segments,
        feature_dim,
        steps,
        num_envs: valid / steps,
    };
    let dense = unpad_trajectories(&padded)?;
    Ok(tensor_from_vec(dense, [steps, padded.num_envs, feature_dim], &device))
}
