//! Per-environment episode bookkeeping.

use std::collections::VecDeque;

use crate::environment::EpisodeInfo;
use crate::error::{ensure_len, Result};

/// Number of finished episodes averaged in the reward/length curves.
pub const EPISODE_WINDOW: usize = 100;

/// Tracks running episode returns and lengths.
///
/// Finished episodes go into trailing windows; environment-reported
/// [`EpisodeInfo`] payloads are collected per iteration and averaged on
/// request.
#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    cur_reward_sum: Vec<f32>,
    cur_episode_length: Vec<usize>,
    reward_window: VecDeque<f32>,
    length_window: VecDeque<usize>,
    capacity: usize,
    episode_infos: Vec<EpisodeInfo>,
    completed: usize,
}

impl EpisodeTracker {
    pub fn new(num_envs: usize) -> Self {
        Self::with_capacity(num_envs, EPISODE_WINDOW)
    }

    pub fn with_capacity(num_envs: usize, capacity: usize) -> Self {
        Self {
            cur_reward_sum: vec![0.0; num_envs],
            cur_episode_length: vec![0; num_envs],
            reward_window: VecDeque::with_capacity(capacity),
            length_window: VecDeque::with_capacity(capacity),
            capacity,
            episode_infos: Vec::new(),
            completed: 0,
        }
    }

    /// Accumulate one step; finished episodes move into the windows.
    pub fn record_step(&mut self, rewards: &[f32], dones: &[bool]) -> Result<()> {
        let num_envs = self.cur_reward_sum.len();
        ensure_len("episode rewards", rewards, num_envs, 1)?;
        ensure_len("episode dones", dones, num_envs, 1)?;

        for env in 0..num_envs {
            self.cur_reward_sum[env] += rewards[env];
            self.cur_episode_length[env] += 1;
            if dones[env] {
                push_bounded(&mut self.reward_window, self.cur_reward_sum[env], self.capacity);
                push_bounded(&mut self.length_window, self.cur_episode_length[env], self.capacity);
                self.cur_reward_sum[env] = 0.0;
                self.cur_episode_length[env] = 0;
                self.completed += 1;
            }
        }
        Ok(())
    }

    pub fn push_episode_info(&mut self, info: EpisodeInfo) {
        self.episode_infos.push(info);
    }

    /// Mean return over the window, `None` before the first episode ends.
    pub fn mean_reward(&self) -> Option<f32> {
        if self.reward_window.is_empty() {
            return None;
        }
        Some(self.reward_window.iter().sum::<f32>() / self.reward_window.len() as f32)
    }

    /// Mean length over the window, `None` before the first episode ends.
    pub fn mean_episode_length(&self) -> Option<f32> {
        if self.length_window.is_empty() {
            return None;
        }
        Some(self.length_window.iter().sum::<usize>() as f32 / self.length_window.len() as f32)
    }

    /// Total finished episodes since creation.
    pub fn completed_episodes(&self) -> usize {
        self.completed
    }

    /// Mean of each info key over this iteration's payloads.
    ///
    /// Keys come from the first payload; values of later payloads are
    /// pooled with it.
    pub fn episode_info_means(&self) -> Vec<(String, f64)> {
        let Some(first) = self.episode_infos.first() else {
            return Vec::new();
        };
        first
            .keys()
            .filter_map(|key| {
                let values: Vec<f32> = self
                    .episode_infos
                    .iter()
                    .filter_map(|info| info.get(key))
                    .flatten()
                    .copied()
                    .collect();
                if values.is_empty() {
                    return None;
                }
                let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
                Some((key.clone(), mean))
            })
            .collect()
    }

    /// Drop the collected info payloads.
    pub fn clear_episode_infos(&mut self) {
        self.episode_infos.clear();
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    if window.len() == capacity {
        window.pop_front();
    }
    window.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_returns_and_lengths() {
        let mut tracker = EpisodeTracker::new(2);
        tracker.record_step(&[1.0, 2.0], &[false, false]).unwrap();
        assert_eq!(tracker.mean_reward(), None);

        tracker.record_step(&[1.0, 2.0], &[true, false]).unwrap();
        tracker.record_step(&[5.0, 2.0], &[false, true]).unwrap();

        // env0: 2.0 over 2 steps; env1: 6.0 over 3 steps
        assert_eq!(tracker.mean_reward(), Some(4.0));
        assert_eq!(tracker.mean_episode_length(), Some(2.5));
        assert_eq!(tracker.completed_episodes(), 2);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut tracker = EpisodeTracker::with_capacity(1, 3);
        for r in 1..=5 {
            tracker.record_step(&[r as f32], &[true]).unwrap();
        }
        // window holds 3, 4, 5
        assert_eq!(tracker.mean_reward(), Some(4.0));
        assert_eq!(tracker.completed_episodes(), 5);
    }

    #[test]
    fn test_episode_info_means() {
        let mut tracker = EpisodeTracker::new(2);
        let mut a = EpisodeInfo::new();
        a.insert("rew_tracking".to_string(), vec![1.0, 3.0]);
        a.insert("Curriculum/level".to_string(), vec![2.0]);
        let mut b = EpisodeInfo::new();
        b.insert("rew_tracking".to_string(), vec![5.0]);
        tracker.push_episode_info(a);
        tracker.push_episode_info(b);

        let means = tracker.episode_info_means();
        assert_eq!(
            means,
            vec![
                ("Curriculum/level".to_string(), 2.0),
                ("rew_tracking".to_string(), 3.0),
            ]
        );

        tracker.clear_episode_infos();
        assert!(tracker.episode_info_means().is_empty());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut tracker = EpisodeTracker::new(3);
        assert!(tracker.record_step(&[0.0; 2], &[false; 3]).is_err());
    }
}
