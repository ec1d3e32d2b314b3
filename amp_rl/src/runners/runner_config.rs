//! Configuration for the AMP on-policy runner.
//!
//! Loadable from JSON:
//!
//! ```json
//! {
//!   "num_steps_per_env": 24,
//!   "save_interval": 50,
//!   "amp_reward_coef": 2.0,
//!   "amp_task_reward_lerp": 0.3,
//!   "logger": "tensorboard",
//!   "policy": { "class_name": "ActorCritic" },
//!   "algorithm": { "class_name": "AMPPPO" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algorithms::{AlgorithmKind, PolicyKind};
use crate::amp::{AmpRewardConfig, RewardBlend};
use crate::buffers::DEFAULT_HISTORY_LENGTH;
use crate::error::{ConfigError, Result};
use crate::metrics::LoggerKind;
use crate::normalization::DEFAULT_UNTIL;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub class_name: PolicyKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    pub class_name: AlgorithmKind,
}

/// Configuration for [`AmpOnPolicyRunner`](super::AmpOnPolicyRunner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Environment steps per environment per iteration.
    pub num_steps_per_env: usize,
    /// Iterations between checkpoints.
    pub save_interval: usize,
    /// Style reward scale.
    pub amp_reward_coef: f32,
    /// Task weight in [`RewardBlend::Lerp`].
    #[serde(default)]
    pub amp_task_reward_lerp: f32,
    #[serde(default)]
    pub reward_blend: RewardBlend,
    /// Frames of policy observation history.
    #[serde(default = "default_history_length")]
    pub history_length: usize,
    /// Normalize policy/critic observations with running statistics.
    #[serde(default)]
    pub empirical_normalization: bool,
    /// Sample cap after which observation statistics freeze.
    #[serde(default = "default_until")]
    pub empirical_normalization_until: f64,
    #[serde(default)]
    pub logger: LoggerKind,
    /// Checkpoints retained by this run (0 = all).
    #[serde(default)]
    pub checkpoint_keep_last_n: usize,
    pub policy: PolicyConfig,
    pub algorithm: AlgorithmConfig,
}

fn default_history_length() -> usize {
    DEFAULT_HISTORY_LENGTH
}

fn default_until() -> f64 {
    DEFAULT_UNTIL
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            num_steps_per_env: 24,
            save_interval: 50,
            amp_reward_coef: 2.0,
            amp_task_reward_lerp: 0.0,
            reward_blend: RewardBlend::Lerp,
            history_length: DEFAULT_HISTORY_LENGTH,
            empirical_normalization: false,
            empirical_normalization_until: DEFAULT_UNTIL,
            logger: LoggerKind::Tensorboard,
            checkpoint_keep_last_n: 0,
            policy: PolicyConfig::default(),
            algorithm: AlgorithmConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }

    pub fn with_num_steps_per_env(mut self, steps: usize) -> Self {
        self.num_steps_per_env = steps;
        self
    }

    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_amp_reward_coef(mut self, coef: f32) -> Self {
        self.amp_reward_coef = coef;
        self
    }

    pub fn with_amp_task_reward_lerp(mut self, lerp: f32) -> Self {
        self.amp_task_reward_lerp = lerp;
        self
    }

    pub fn with_reward_blend(mut self, blend: RewardBlend) -> Self {
        self.reward_blend = blend;
        self
    }

    pub fn with_history_length(mut self, length: usize) -> Self {
        self.history_length = length;
        self
    }

    pub fn with_empirical_normalization(mut self, enabled: bool) -> Self {
        self.empirical_normalization = enabled;
        self
    }

    pub fn with_logger(mut self, logger: LoggerKind) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_checkpoint_keep_last_n(mut self, n: usize) -> Self {
        self.checkpoint_keep_last_n = n;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy.class_name = policy;
        self
    }

    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm.class_name = algorithm;
        self
    }

    /// Reward relabeling parameters.
    pub fn amp_reward(&self) -> AmpRewardConfig {
        AmpRewardConfig {
            reward_coef: self.amp_reward_coef,
            task_reward_lerp: self.amp_task_reward_lerp,
            blend: self.reward_blend,
        }
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// - `num_steps_per_env`, `save_interval`, `history_length` must be > 0
    /// - `amp_task_reward_lerp` must be in [0.0, 1.0]
    /// - `amp_reward_coef` must be >= 0.0
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("num_steps_per_env", self.num_steps_per_env),
            ("save_interval", self.save_interval),
            ("history_length", self.history_length),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidCount { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.amp_task_reward_lerp) {
            return Err(ConfigError::OutOfRange {
                field: "amp_task_reward_lerp",
                value: self.amp_task_reward_lerp,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.amp_reward_coef >= 0.0 && self.amp_reward_coef.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "amp_reward_coef",
                value: self.amp_reward_coef,
                min: 0.0,
                max: f32::INFINITY,
            });
        }
        if self.empirical_normalization_until.is_nan() || self.empirical_normalization_until <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "empirical_normalization_until",
                value: self.empirical_normalization_until as f32,
                min: 0.0,
                max: f32::INFINITY,
            });
        }

        Ok(())
    }
}
