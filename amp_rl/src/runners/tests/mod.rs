//! Scenario tests for the AMP on-policy runner.
//!
//! The environment and the algorithm are in-crate mocks (`mocks`) that
//! record every call, so the tests can check what the runner hands to its
//! collaborators.
//!
//! # Test Organization
//!
//! - `config_tests`: defaults, builders, validation and JSON loading
//! - `amp_runner_tests`: rollout cadence, reward relabeling, observation
//!   history, checkpoints and logging
//!
//! # Critical Invariants Tested
//!
//! 1. **Cadence**
//!    - `num_steps_per_env` act/step calls and one update per iteration
//!    - checkpoints at iterations `0, save_interval, ...` and at the end
//!
//! 2. **Terminal AMP states**
//!    - reset rows of the next AMP observation carry the pre-reset state
//!    - the AMP observation for the next step is the post-reset one
//!
//! 3. **Restore**
//!    - loading a checkpoint restores normalizer statistics exactly

pub mod mocks;
