//! AMP on-policy runner.
//!
//! - [`AmpOnPolicyRunner`]: rollout collection, AMP reward relabeling,
//!   updates, logging and checkpointing for one vectorized environment
//! - [`RunnerConfig`]: runner settings, loadable from JSON
//!
//! The policy/value learner and the discriminator are external
//! collaborators behind [`AmpAlgorithm`](crate::algorithms::AmpAlgorithm).

pub mod amp_runner;
pub mod runner_config;

#[cfg(test)]
pub mod tests;

pub use amp_runner::{AmpOnPolicyRunner, InferencePolicy};
pub use runner_config::{AlgorithmConfig, PolicyConfig, RunnerConfig};
