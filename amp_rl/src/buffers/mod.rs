//! Rollout-side buffers.
//!
//! - `ObservationHistoryStorage`: sliding per-environment observation window
//! - `trajectory`: splitting `(T, E, F)` rollouts into padded episode segments

pub mod observation_history;
pub mod trajectory;

pub use observation_history::{ObservationHistoryStorage, DEFAULT_HISTORY_LENGTH};
pub use trajectory::{
    split_and_pad_tensor, split_and_pad_trajectories, unpad_tensor, unpad_trajectories,
    PaddedTrajectories, RolloutShape,
};
