//! Adversarial Motion Prior reward shaping.

pub mod reward;

pub use reward::{
    blend_reward, predict_amp_reward, style_reward, substitute_terminal_states, AmpReward,
    AmpRewardConfig, RewardBlend,
};

/// Scores how expert-like AMP transitions look.
///
/// Implemented by the algorithm's discriminator network.
pub trait Discriminator {
    /// Score `batch` transitions.
    ///
    /// `state` and `next_state` are normalized `[batch * amp_obs_dim]`
    /// buffers; returns one score per transition.
    fn predict(&self, state: &[f32], next_state: &[f32], batch: usize) -> Vec<f32>;
}
