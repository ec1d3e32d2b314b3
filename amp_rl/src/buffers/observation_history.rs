//! Fixed-length per-environment observation history.
//!
//! Each environment row holds its last `history_length` observations
//! concatenated oldest first:
//!
//! ```text
//! row = [ o(t-K+1) | o(t-K+2) | ... | o(t) ]     (K = history_length)
//! ```
//!
//! Slots older than the last reset are zero. `add` shifts every row left by
//! one frame and writes the newest frame into the trailing slot.

use burn::prelude::*;

use crate::core::{tensor_from_vec, tensor_to_vec};
use crate::error::{ensure_len, AmpError, ConfigError, Result};

/// Default number of frames kept per environment.
pub const DEFAULT_HISTORY_LENGTH: usize = 5;

#[derive(Debug, Clone)]
pub struct ObservationHistoryStorage {
    num_envs: usize,
    obs_dim: usize,
    history_length: usize,
    /// Row-major `[num_envs, obs_dim * history_length]`
    buffer: Vec<f32>,
}

impl ObservationHistoryStorage {
    /// Allocate a zeroed history.
    ///
    /// All three dimensions must be positive.
    pub fn new(num_envs: usize, obs_dim: usize, history_length: usize) -> Result<Self> {
        for (field, value) in [
            ("num_envs", num_envs),
            ("obs_dim", obs_dim),
            ("history_length", history_length),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value }.into());
            }
        }
        Ok(Self {
            num_envs,
            obs_dim,
            history_length,
            buffer: vec![0.0; num_envs * obs_dim * history_length],
        })
    }

    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Width of one history row: `obs_dim * history_length`.
    pub fn history_dim(&self) -> usize {
        self.obs_dim * self.history_length
    }

    /// Append one observation per environment, evicting the oldest frame.
    ///
    /// `observation` is row-major `[num_envs, obs_dim]`.
    pub fn add(&mut self, observation: &[f32]) -> Result<()> {
        ensure_len("history observation", observation, self.num_envs, self.obs_dim)?;

        let obs_dim = self.obs_dim;
        let row_len = self.history_dim();
        for (row, obs) in self
            .buffer
            .chunks_exact_mut(row_len)
            .zip(observation.chunks_exact(obs_dim))
        {
            row.copy_within(obs_dim.., 0);
            row[row_len - obs_dim..].copy_from_slice(obs);
        }
        Ok(())
    }

    /// Owned copy of the whole history `[num_envs, history_dim]`.
    pub fn get(&self) -> Vec<f32> {
        self.buffer.clone()
    }

    /// Borrow one environment's history row.
    pub fn row(&self, env: usize) -> Option<&[f32]> {
        let row_len = self.history_dim();
        self.buffer.get(env * row_len..(env + 1) * row_len)
    }

    /// Zero every row whose done flag is set.
    pub fn reset(&mut self, dones: &[bool]) -> Result<()> {
        if dones.len() != self.num_envs {
            return Err(AmpError::len_mismatch("history reset mask", self.num_envs, dones.len()));
        }
        let row_len = self.history_dim();
        for (row, &done) in self.buffer.chunks_exact_mut(row_len).zip(dones) {
            if done {
                row.fill(0.0);
            }
        }
        Ok(())
    }

    /// Zero the rows of the listed environments.
    pub fn reset_indices(&mut self, env_ids: &[usize]) -> Result<()> {
        let row_len = self.history_dim();
        for &env in env_ids {
            if env >= self.num_envs {
                return Err(AmpError::ShapeMismatch {
                    what: "history reset index",
                    expected: vec![self.num_envs],
                    actual: vec![env],
                });
            }
            self.buffer[env * row_len..(env + 1) * row_len].fill(0.0);
        }
        Ok(())
    }

    /// History as a tensor of shape `[num_envs, history_dim]`.
    pub fn get_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        tensor_from_vec(self.get(), [self.num_envs, self.history_dim()], device)
    }

    /// Append a `[num_envs, obs_dim]` observation tensor.
    pub fn add_tensor<B: Backend>(&mut self, observation: Tensor<B, 2>) -> Result<()> {
        let (values, dims) = tensor_to_vec(observation);
        if dims != [self.num_envs, self.obs_dim] {
            return Err(AmpError::ShapeMismatch {
                what: "history observation tensor",
                expected: vec![self.num_envs, self.obs_dim],
                actual: dims.to_vec(),
            });
        }
        self.add(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn frame(num_envs: usize, obs_dim: usize, step: usize) -> Vec<f32> {
        (0..num_envs * obs_dim)
            .map(|i| (step * 100 + i) as f32 + 1.0)
            .collect()
    }

    #[test]
    fn test_new_is_zeroed() {
        let history = ObservationHistoryStorage::new(4, 3, 5).unwrap();
        assert_eq!(history.history_dim(), 15);
        assert!(history.get().iter().all(|&x| x == 0.0));
        assert_eq!(history.get().len(), 60);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            ObservationHistoryStorage::new(4, 0, 5),
            Err(AmpError::Config(ConfigError::InvalidCount { field: "obs_dim", .. }))
        ));
    }

    #[test]
    fn test_single_add_fills_trailing_slot() {
        let mut history = ObservationHistoryStorage::new(2, 2, 3).unwrap();
        history.add(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(history.row(0).unwrap(), &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
        assert_eq!(history.row(1).unwrap(), &[0.0, 0.0, 0.0, 0.0, 3.0, 4.0]);
    }

    /// Test the full-history scenario with E=4, D=3, K=5.
    ///
    /// INTENT: After K adds the buffer is the oldest-first concatenation;
    /// resetting env 2 zeroes only its row; the next add fills only its
    /// trailing slot.
    #[test]
    fn test_history_scenario() {
        let (e, d, k) = (4, 3, 5);
        let mut history = ObservationHistoryStorage::new(e, d, k).unwrap();
        let frames: Vec<Vec<f32>> = (0..k).map(|s| frame(e, d, s)).collect();
        for f in &frames {
            history.add(f).unwrap();
        }

        for env in 0..e {
            let expected: Vec<f32> = frames
                .iter()
                .flat_map(|f| f[env * d..(env + 1) * d].to_vec())
                .collect();
            assert_eq!(history.row(env).unwrap(), expected.as_slice());
        }

        let before = history.get();
        history.reset(&[false, false, true, false]).unwrap();
        let after = history.get();
        let row_len = d * k;
        for env in 0..e {
            let row = &after[env * row_len..(env + 1) * row_len];
            if env == 2 {
                assert!(row.iter().all(|&x| x == 0.0));
            } else {
                assert_eq!(row, &before[env * row_len..(env + 1) * row_len]);
            }
        }

        let next = frame(e, d, k);
        history.add(&next).unwrap();
        let row2 = history.row(2).unwrap();
        assert!(row2[..row_len - d].iter().all(|&x| x == 0.0));
        assert_eq!(&row2[row_len - d..], &next[2 * d..3 * d]);
    }

    #[test]
    fn test_oldest_frames_evicted() {
        let mut history = ObservationHistoryStorage::new(1, 1, 3).unwrap();
        for x in 1..=5 {
            history.add(&[x as f32]).unwrap();
        }
        assert_eq!(history.get(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_get_returns_copy() {
        let mut history = ObservationHistoryStorage::new(1, 1, 2).unwrap();
        history.add(&[1.0]).unwrap();
        let snapshot = history.get();
        history.add(&[2.0]).unwrap();
        assert_eq!(snapshot, vec![0.0, 1.0]);
        assert_eq!(history.get(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_shape_errors() {
        let mut history = ObservationHistoryStorage::new(2, 3, 2).unwrap();
        assert!(matches!(
            history.add(&[0.0; 5]),
            Err(AmpError::ShapeMismatch { .. })
        ));
        assert!(history.reset(&[true]).is_err());
        assert!(history.reset_indices(&[2]).is_err());
    }

    #[test]
    fn test_reset_indices_matches_mask_reset() {
        let mut by_mask = ObservationHistoryStorage::new(3, 2, 2).unwrap();
        by_mask.add(&frame(3, 2, 0)).unwrap();
        let mut by_index = by_mask.clone();

        by_mask.reset(&[true, false, true]).unwrap();
        by_index.reset_indices(&[0, 2]).unwrap();
        assert_eq!(by_mask.get(), by_index.get());
    }

    #[test]
    fn test_tensor_views() {
        let device = Default::default();
        let mut history = ObservationHistoryStorage::new(2, 2, 2).unwrap();
        let obs = Tensor::<B, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device).reshape([2, 2]);
        history.add_tensor(obs).unwrap();

        let (values, dims) = tensor_to_vec(history.get_tensor::<B>(&device));
        assert_eq!(dims, [2, 4]);
        assert_eq!(values, vec![0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 3.0, 4.0]);

        let wrong = Tensor::<B, 2>::zeros([3, 2], &device);
        assert!(history.add_tensor(wrong).is_err());
    }
}
