//! Style reward relabeling.
//!
//! For each transition the discriminator scores the normalized pair
//! `(amp_obs, next_amp_obs)`; its output `d` is turned into a bounded
//! style reward
//!
//! ```text
//! r_style = coef * max(0, 1 - 0.25 * (d - 1)^2)
//! ```
//!
//! and blended with the task reward. Environments that reset during the step
//! report a fresh post-reset AMP observation, so their rows are replaced by
//! the terminal pre-reset state before scoring.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Discriminator;
use crate::error::{ensure_len, AmpError, ConfigError, Result};
use crate::normalization::Normalizer;

/// How the style reward is combined with the task reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RewardBlend {
    /// `(1 - w) * r_style + w * r_task`
    #[default]
    Lerp,
    /// `r_style + r_task`
    Additive,
}

impl RewardBlend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lerp => "lerp",
            Self::Additive => "additive",
        }
    }
}

impl fmt::Display for RewardBlend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardBlend {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lerp" => Ok(Self::Lerp),
            "additive" => Ok(Self::Additive),
            _ => Err(ConfigError::UnknownVariant {
                field: "reward_blend",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for RewardBlend {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RewardBlend> for String {
    fn from(blend: RewardBlend) -> Self {
        blend.as_str().to_string()
    }
}

/// Reward relabeling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmpRewardConfig {
    pub reward_coef: f32,
    /// Task weight `w` for [`RewardBlend::Lerp`].
    pub task_reward_lerp: f32,
    pub blend: RewardBlend,
}

impl Default for AmpRewardConfig {
    fn default() -> Self {
        Self {
            reward_coef: 2.0,
            task_reward_lerp: 0.0,
            blend: RewardBlend::Lerp,
        }
    }
}

/// Relabeled rewards for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct AmpReward {
    /// Blended rewards `[num_envs]`
    pub rewards: Vec<f32>,
    /// Style rewards before blending `[num_envs]`
    pub style_rewards: Vec<f32>,
}

/// Map a discriminator output to a style reward.
#[inline]
pub fn style_reward(d: f32, coef: f32) -> f32 {
    coef * (1.0 - 0.25 * (d - 1.0) * (d - 1.0)).max(0.0)
}

/// Combine a style and a task reward.
#[inline]
pub fn blend_reward(style: f32, task: f32, config: &AmpRewardConfig) -> f32 {
    match config.blend {
        RewardBlend::Lerp => {
            let w = config.task_reward_lerp;
            (1.0 - w) * style + w * task
        }
        RewardBlend::Additive => style + task,
    }
}

/// Copy `next_amp_obs` and overwrite the rows of reset environments with
/// their terminal states.
///
/// Every id must be `< num_envs` and unique, and `terminal_states` must hold
/// exactly one `amp_obs_dim` row per id.
pub fn substitute_terminal_states(
    next_amp_obs: &[f32],
    num_envs: usize,
    amp_obs_dim: usize,
    reset_env_ids: &[usize],
    terminal_states: &[f32],
) -> Result<Vec<f32>> {
    ensure_len("next AMP observations", next_amp_obs, num_envs, amp_obs_dim)?;
    ensure_len("terminal AMP states", terminal_states, reset_env_ids.len(), amp_obs_dim)?;

    let mut seen = vec![false; num_envs];
    let mut out = next_amp_obs.to_vec();
    for (&env, state) in reset_env_ids
        .iter()
        .zip(terminal_states.chunks_exact(amp_obs_dim.max(1)))
    {
        if env >= num_envs || seen[env] {
            return Err(AmpError::ShapeMismatch {
                what: "reset env id",
                expected: vec![num_envs],
                actual: vec![env],
            });
        }
        seen[env] = true;
        out[env * amp_obs_dim..(env + 1) * amp_obs_dim].copy_from_slice(state);
    }
    Ok(out)
}

/// Score `(state, next_state)` pairs and blend the style reward with the
/// task reward.
///
/// Both AMP buffers are normalized with `normalizer` before scoring.
pub fn predict_amp_reward<D: Discriminator + ?Sized>(
    discriminator: &D,
    normalizer: &Normalizer,
    state: &[f32],
    next_state: &[f32],
    task_rewards: &[f32],
    config: &AmpRewardConfig,
) -> Result<AmpReward> {
    let num_envs = task_rewards.len();
    let amp_obs_dim = normalizer.input_dim();
    ensure_len("AMP state", state, num_envs, amp_obs_dim)?;
    ensure_len("AMP next state", next_state, num_envs, amp_obs_dim)?;

    let state = normalizer.normalize(state)?;
    let next_state = normalizer.normalize(next_state)?;
    let d = discriminator.predict(&state, &next_state, num_envs);
    ensure_len("discriminator output", &d, num_envs, 1)?;

    let style_rewards: Vec<f32> = d.iter().map(|&d| style_reward(d, config.reward_coef)).collect();
    let rewards = style_rewards
        .iter()
        .zip(task_rewards)
        .map(|(&s, &t)| blend_reward(s, t, config))
        .collect();

    log::debug!(
        "AMP relabel: mean style reward {:.4}",
        style_rewards.iter().sum::<f32>() / num_envs.max(1) as f32
    );
    Ok(AmpReward { rewards, style_rewards })
}
