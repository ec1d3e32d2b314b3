//! Algorithm interface driven by the AMP runner.
//!
//! Networks, optimizers and the PPO/AMP losses live behind [`AmpAlgorithm`];
//! the runner only feeds it transitions and asks for updates. The concrete
//! policy and algorithm are chosen from a closed set of kinds
//! ([`PolicyKind`] x [`AlgorithmKind`]) at config time and built by a
//! caller-supplied factory from a [`ModelSpec`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::amp::Discriminator;
use crate::environment::StepInfos;
use crate::error::{ConfigError, Result};
use crate::normalization::Normalizer;

// ============================================================================
// Model selection
// ============================================================================

/// Actor-critic architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyKind {
    #[default]
    ActorCritic,
    ActorCriticRecurrent,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActorCritic => "ActorCritic",
            Self::ActorCriticRecurrent => "ActorCriticRecurrent",
        }
    }

    /// Whether rollouts must be split into padded episode segments.
    pub fn is_recurrent(&self) -> bool {
        matches!(self, Self::ActorCriticRecurrent)
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ActorCritic" => Ok(Self::ActorCritic),
            "ActorCriticRecurrent" => Ok(Self::ActorCriticRecurrent),
            _ => Err(ConfigError::UnknownVariant {
                field: "policy.class_name",
                value: s.to_string(),
            }),
        }
    }
}

/// Update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlgorithmKind {
    Ppo,
    #[default]
    AmpPpo,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ppo => "PPO",
            Self::AmpPpo => "AMPPPO",
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PPO" => Ok(Self::Ppo),
            "AMPPPO" => Ok(Self::AmpPpo),
            _ => Err(ConfigError::UnknownVariant {
                field: "algorithm.class_name",
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! string_conversions {
    ($($kind:ty),*) => {$(
        impl fmt::Display for $kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $kind {
            type Error = ConfigError;

            fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$kind> for String {
            fn from(kind: $kind) -> Self {
                kind.as_str().to_string()
            }
        }
    )*};
}

string_conversions!(PolicyKind, AlgorithmKind);

/// Dimensions and kinds handed to the model factory.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub policy: PolicyKind,
    pub algorithm: AlgorithmKind,
    pub num_envs: usize,
    /// Actor input width: `num_obs * history_length`.
    pub num_actor_obs: usize,
    pub num_critic_obs: usize,
    pub num_actions: usize,
    pub amp_obs_dim: usize,
    /// Environment step duration, for discriminator time scaling.
    pub step_dt: f32,
}

// ============================================================================
// Algorithm trait
// ============================================================================

/// Scalars reported by one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateLosses {
    pub value_loss: f32,
    pub surrogate_loss: f32,
    pub amp_loss: f32,
    pub grad_pen_loss: f32,
    /// Mean discriminator output on policy transitions.
    pub policy_pred: f32,
    /// Mean discriminator output on expert transitions.
    pub expert_pred: f32,
}

/// Rollout storage dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSpec {
    pub num_envs: usize,
    pub num_steps_per_env: usize,
    pub actor_obs_shape: Vec<usize>,
    pub critic_obs_shape: Vec<usize>,
    pub action_shape: Vec<usize>,
}

/// Opaque parameter blobs for checkpointing.
///
/// For burn modules these are [`module_to_bytes`](crate::checkpoint::module_to_bytes)
/// records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmState {
    pub model: Vec<u8>,
    pub optimizer: Vec<u8>,
    pub discriminator: Vec<u8>,
}

/// PPO-style learner with an AMP discriminator.
pub trait AmpAlgorithm {
    type Discriminator: Discriminator;

    /// Allocate rollout storage.
    fn init_storage(&mut self, spec: &StorageSpec);

    /// Select actions `[num_envs * num_actions]` and record the pre-step
    /// transition data.
    fn act(&mut self, actor_obs: &[f32], critic_obs: &[f32], amp_obs: &[f32]) -> Vec<f32>;

    /// Record the step outcome. `terminal_amp_obs` is the next AMP
    /// observation with reset rows replaced by terminal states.
    fn process_env_step(&mut self, rewards: &[f32], dones: &[bool], infos: &StepInfos, terminal_amp_obs: &[f32]);

    /// Bootstrap returns from the last critic observation.
    fn compute_returns(&mut self, last_critic_obs: &[f32]);

    /// Run the optimization epochs and refresh the AMP normalizer.
    fn update(&mut self, amp_normalizer: &mut Normalizer) -> Result<UpdateLosses>;

    fn discriminator(&self) -> &Self::Discriminator;

    /// Deterministic actions for deployment.
    fn act_inference(&self, actor_obs: &[f32]) -> Vec<f32>;

    fn learning_rate(&self) -> f64;

    /// Mean action standard deviation, for logging.
    fn action_std_mean(&self) -> f32;

    fn train_mode(&mut self);

    fn eval_mode(&mut self);

    fn export_state(&self) -> Result<AlgorithmState>;

    /// Restore parameters; optimizer state only if `load_optimizer`.
    fn import_state(&mut self, state: &AlgorithmState, load_optimizer: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_kind_parse() {
        assert_eq!("ActorCritic".parse::<PolicyKind>().unwrap(), PolicyKind::ActorCritic);
        assert!("ActorCriticRecurrent".parse::<PolicyKind>().unwrap().is_recurrent());
        assert!(matches!(
            "ActorCriticTransformer".parse::<PolicyKind>(),
            Err(ConfigError::UnknownVariant { field: "policy.class_name", .. })
        ));
    }

    #[test]
    fn test_algorithm_kind_parse() {
        assert_eq!("PPO".parse::<AlgorithmKind>().unwrap(), AlgorithmKind::Ppo);
        assert_eq!("AMPPPO".parse::<AlgorithmKind>().unwrap(), AlgorithmKind::AmpPpo);
        assert!("SAC".parse::<AlgorithmKind>().is_err());
    }

    #[test]
    fn test_kinds_serialize_as_class_names() {
        assert_eq!(serde_json::to_string(&AlgorithmKind::AmpPpo).unwrap(), "\"AMPPPO\"");
        let kind: PolicyKind = serde_json::from_str("\"ActorCriticRecurrent\"").unwrap();
        assert_eq!(kind, PolicyKind::ActorCriticRecurrent);
        assert!(serde_json::from_str::<PolicyKind>("\"Mlp\"").is_err());
    }
}
