//! # AMP RL: On-Policy Training with Adversarial Motion Priors
//!
//! Training-loop core for PPO with AMP style rewards over a vectorized
//! environment.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       AmpOnPolicyRunner                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────┐  obs   ┌──────────────────┐  history  ┌──────────┐  │
//! │   │ VecEnv │───────►│ ObservationHistory│─────────►│ Algorithm│  │
//! │   │        │◄───────┴──────────────────┘  actions  │ (PPO)    │  │
//! │   └───┬────┘                                       └────▲─────┘  │
//! │       │ amp obs, terminal states                        │        │
//! │       ▼                                                 │        │
//! │   ┌────────────┐   ┌───────────────┐  relabeled reward  │        │
//! │   │ Normalizer │──►│ Discriminator │────────────────────┘        │
//! │   └────────────┘   └───────────────┘                             │
//! │                                                                  │
//! │   SummaryWriter (metrics)          Checkpointer (model_N.json)    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The environment, the policy/value networks and the discriminator are
//! supplied by the caller through [`VecEnv`] and [`AmpAlgorithm`].
//! Recurrent policies split their rollouts with
//! [`split_and_pad_trajectories`] / [`unpad_trajectories`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use amp_rl::{AmpOnPolicyRunner, RunnerConfig};
//!
//! let config = RunnerConfig::from_json_file("train.json")?;
//! let mut runner = AmpOnPolicyRunner::new(env, config, Some(log_dir), |spec| {
//!     MyAmpPpo::new(spec, &device)
//! })?;
//! runner.learn(1500, true)?;
//! ```

pub mod algorithms;
pub mod amp;
pub mod buffers;
pub mod checkpoint;
pub mod core;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod normalization;
pub mod runners;

pub use algorithms::{AlgorithmKind, AlgorithmState, AmpAlgorithm, ModelSpec, PolicyKind, StorageSpec, UpdateLosses};
pub use amp::{AmpReward, AmpRewardConfig, Discriminator, RewardBlend};
pub use buffers::{
    split_and_pad_trajectories, unpad_trajectories, ObservationHistoryStorage, PaddedTrajectories, RolloutShape,
};
pub use checkpoint::{Checkpoint, CheckpointError, Checkpointer, CheckpointerConfig};
pub use crate::core::RunningMeanStd;
pub use environment::{EnvStep, EpisodeInfo, Observations, StepInfos, VecEnv};
pub use error::{AmpError, ConfigError, Result};
pub use metrics::{LoggerKind, MultiWriter, ScalarFileWriter, SummaryWriter, TensorboardWriter};
pub use normalization::{EmpiricalNormalizer, Normalizer, NormalizerConfig};
pub use runners::{AmpOnPolicyRunner, InferencePolicy, RunnerConfig};
