//! Vectorized environment interface for AMP training.
//!
//! The simulator is an external collaborator: the runner only relies on the
//! [`VecEnv`] trait. All batched quantities are flat row-major buffers,
//! e.g. observations are `[num_envs * num_obs]`.

use std::collections::BTreeMap;

use crate::error::{ensure_len, AmpError, Result};

/// Per-key episode statistics reported by the environment on reset.
///
/// Values are either a single scalar or one value per environment; they are
/// averaged when logged.
pub type EpisodeInfo = BTreeMap<String, Vec<f32>>;

/// Observations returned outside of a step.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    /// Policy observations `[num_envs * num_obs]`
    pub policy: Vec<f32>,
    /// Privileged critic observations `[num_envs * num_critic_obs]`, if any
    pub critic: Option<Vec<f32>>,
}

/// Auxiliary step outputs.
#[derive(Debug, Clone, Default)]
pub struct StepInfos {
    /// Privileged critic observations for the next state, if any.
    pub critic_observations: Option<Vec<f32>>,
    /// Episode statistics for environments that just reset.
    pub episode: Option<EpisodeInfo>,
    /// Statistics some environments report instead of `episode`; only
    /// read when `episode` is absent.
    pub log: Option<EpisodeInfo>,
    /// Time-limit flags `[num_envs]`, for value bootstrapping.
    pub time_outs: Option<Vec<bool>>,
}

impl StepInfos {
    /// The statistics payload to log this step: `episode`, else `log`.
    pub fn episode_statistics(&self) -> Option<&EpisodeInfo> {
        self.episode.as_ref().or(self.log.as_ref())
    }
}

/// Result of stepping all environments once.
#[derive(Debug, Clone)]
pub struct EnvStep {
    /// Observations after the step `[num_envs * num_obs]`
    pub observations: Vec<f32>,
    /// Task rewards `[num_envs]`
    pub rewards: Vec<f32>,
    /// Done flags `[num_envs]`
    pub dones: Vec<bool>,
    pub infos: StepInfos,
    /// Environments that reset during this step.
    pub reset_env_ids: Vec<usize>,
    /// AMP observation of each reset environment before its reset,
    /// `[reset_env_ids.len() * amp_obs_dim]`, in `reset_env_ids` order.
    pub terminal_amp_states: Vec<f32>,
}

impl EnvStep {
    /// Check every buffer against the environment dimensions.
    ///
    /// Reset ids and terminal states are checked where they are consumed.
    pub fn validate(&self, num_envs: usize, num_obs: usize) -> Result<()> {
        ensure_len("step observations", &self.observations, num_envs, num_obs)?;
        ensure_len("step rewards", &self.rewards, num_envs, 1)?;
        ensure_len("step dones", &self.dones, num_envs, 1)?;
        if let Some(time_outs) = &self.infos.time_outs {
            ensure_len("step time_outs", time_outs, num_envs, 1)?;
        }
        if let Some(critic) = &self.infos.critic_observations {
            if num_envs == 0 || critic.len() % num_envs != 0 {
                return Err(AmpError::len_mismatch("step critic observations", num_envs, critic.len()));
            }
        }
        Ok(())
    }
}

/// A batch of simulated environments exposing AMP observations.
pub trait VecEnv {
    /// Number of parallel environments.
    fn num_envs(&self) -> usize;

    /// Size of a single policy observation.
    fn num_obs(&self) -> usize;

    /// Size of a single action.
    fn num_actions(&self) -> usize;

    /// Size of a single AMP observation.
    fn amp_obs_dim(&self) -> usize;

    /// Simulation time per environment step, in seconds.
    fn step_dt(&self) -> f32;

    /// Current observations without stepping.
    fn get_observations(&self) -> Observations;

    /// Reset all environments.
    fn reset(&mut self) -> Observations;

    /// Step every environment with `actions` `[num_envs * num_actions]`.
    ///
    /// Done environments are reset internally; their pre-reset AMP state is
    /// reported in [`EnvStep::terminal_amp_states`].
    fn step(&mut self, actions: &[f32]) -> EnvStep;

    /// Current AMP observations `[num_envs * amp_obs_dim]`.
    fn get_amp_observations(&self) -> Vec<f32>;

    /// Spread episode progress uniformly so resets do not happen in lockstep.
    fn randomize_episode_lengths(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(num_envs: usize, num_obs: usize) -> EnvStep {
        EnvStep {
            observations: vec![0.0; num_envs * num_obs],
            rewards: vec![0.0; num_envs],
            dones: vec![false; num_envs],
            infos: StepInfos::default(),
            reset_env_ids: Vec::new(),
            terminal_amp_states: Vec::new(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_step() {
        let mut s = step(3, 2);
        s.infos.critic_observations = Some(vec![0.0; 12]);
        assert!(s.validate(3, 2).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_buffers() {
        let mut s = step(3, 2);
        s.rewards.pop();
        assert!(s.validate(3, 2).is_err());

        let mut s = step(3, 2);
        s.infos.critic_observations = Some(vec![0.0; 7]);
        assert!(s.validate(3, 2).is_err());

        let mut s = step(3, 2);
        s.infos.time_outs = Some(vec![false; 2]);
        assert!(s.validate(3, 2).is_err());
    }

    #[test]
    fn test_episode_statistics_fall_back_to_log() {
        let mut episode = EpisodeInfo::new();
        episode.insert("rew_pose".to_string(), vec![1.0]);
        let mut log = EpisodeInfo::new();
        log.insert("terrain_level".to_string(), vec![2.0, 4.0]);

        let mut infos = StepInfos::default();
        assert!(infos.episode_statistics().is_none());

        infos.log = Some(log.clone());
        assert_eq!(infos.episode_statistics(), Some(&log));

        infos.episode = Some(episode.clone());
        assert_eq!(infos.episode_statistics(), Some(&episode));
    }
}
