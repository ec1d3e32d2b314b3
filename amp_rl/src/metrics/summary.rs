//! Per-iteration training summary.

use std::fmt::Write as _;
use std::io;
use std::time::Duration;

use super::writer::SummaryWriter;
use crate::algorithms::UpdateLosses;

/// Everything reported after one learning iteration.
#[derive(Debug, Clone, Default)]
pub struct IterationSummary {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Iteration index the run stops before.
    pub final_iteration: usize,
    pub losses: UpdateLosses,
    pub learning_rate: f64,
    pub action_std: f32,
    pub collection_time: Duration,
    pub learn_time: Duration,
    /// Environment steps collected this iteration.
    pub steps_this_iteration: usize,
    pub total_timesteps: usize,
    pub total_time: Duration,
    /// Wall time of this run so far, for the ETA.
    pub run_time: Duration,
    /// Iterations finished in this run so far.
    pub run_iterations: usize,
    pub mean_reward: Option<f32>,
    pub mean_episode_length: Option<f32>,
    pub episode_info_means: Vec<(String, f64)>,
}

impl IterationSummary {
    /// Environment steps per second over collection and learning.
    pub fn fps(&self) -> f64 {
        let secs = (self.collection_time + self.learn_time).as_secs_f64();
        if secs > 0.0 {
            self.steps_this_iteration as f64 / secs
        } else {
            0.0
        }
    }

    /// Estimated time to finish the run.
    pub fn eta(&self) -> Duration {
        if self.run_iterations == 0 {
            return Duration::ZERO;
        }
        let remaining = self.final_iteration.saturating_sub(self.iteration + 1);
        self.run_time.div_f64(self.run_iterations as f64).mul_f64(remaining as f64)
    }

    /// Emit every scalar at x-axis position `iteration`.
    pub fn write_scalars(&self, writer: &mut dyn SummaryWriter) -> io::Result<()> {
        let step = self.iteration;
        for (key, value) in &self.episode_info_means {
            let tag = if key.contains('/') {
                key.clone()
            } else {
                format!("Episode/{}", key)
            };
            writer.add_scalar(&tag, *value, step)?;
        }

        let l = &self.losses;
        writer.add_scalar("Loss/value_function", l.value_loss as f64, step)?;
        writer.add_scalar("Loss/surrogate", l.surrogate_loss as f64, step)?;
        writer.add_scalar("Loss/amp", l.amp_loss as f64, step)?;
        writer.add_scalar("Loss/amp_grad_pen", l.grad_pen_loss as f64, step)?;
        writer.add_scalar("Loss/learning_rate", self.learning_rate, step)?;
        writer.add_scalar("AMP/mean_policy_pred", l.policy_pred as f64, step)?;
        writer.add_scalar("AMP/mean_expert_pred", l.expert_pred as f64, step)?;
        writer.add_scalar("Policy/mean_noise_std", self.action_std as f64, step)?;
        writer.add_scalar("Perf/total_fps", self.fps(), step)?;
        writer.add_scalar("Perf/collection_time", self.collection_time.as_secs_f64(), step)?;
        writer.add_scalar("Perf/learning_time", self.learn_time.as_secs_f64(), step)?;

        let time_step = self.total_time.as_secs() as usize;
        let time_axis = writer.wants_time_axis();
        if let Some(mean_reward) = self.mean_reward {
            writer.add_scalar("Train/mean_reward", mean_reward as f64, step)?;
            if time_axis {
                writer.add_scalar("Train/mean_reward/time", mean_reward as f64, time_step)?;
            }
        }
        if let Some(mean_length) = self.mean_episode_length {
            writer.add_scalar("Train/mean_episode_length", mean_length as f64, step)?;
            if time_axis {
                writer.add_scalar("Train/mean_episode_length/time", mean_length as f64, time_step)?;
            }
        }
        Ok(())
    }

    /// Console block for `log::info!`.
    pub fn render(&self) -> String {
        let title = format!(" Learning iteration {}/{} ", self.iteration, self.final_iteration);
        let mut out = String::new();
        let _ = writeln!(out, "{:#^80}", title);

        let mut row = |label: &str, value: String| {
            let _ = writeln!(out, "{:>35} {}", format!("{}:", label), value);
        };
        row(
            "Computation",
            format!(
                "{:.0} steps/s (collection: {:.3}s, learning {:.3}s)",
                self.fps(),
                self.collection_time.as_secs_f64(),
                self.learn_time.as_secs_f64()
            ),
        );
        row("Value function loss", format!("{:.4}", self.losses.value_loss));
        row("Surrogate loss", format!("{:.4}", self.losses.surrogate_loss));
        row("AMP loss", format!("{:.4}", self.losses.amp_loss));
        row("AMP grad pen loss", format!("{:.4}", self.losses.grad_pen_loss));
        row("AMP mean policy pred", format!("{:.4}", self.losses.policy_pred));
        row("AMP mean expert pred", format!("{:.4}", self.losses.expert_pred));
        row("Mean action noise std", format!("{:.2}", self.action_std));
        if let Some(r) = self.mean_reward {
            row("Mean reward", format!("{:.2}", r));
        }
        if let Some(l) = self.mean_episode_length {
            row("Mean episode length", format!("{:.2}", l));
        }
        for (key, value) in &self.episode_info_means {
            row(&format!("Mean episode {}", key), format!("{:.4}", value));
        }

        let _ = writeln!(out, "{}", "-".repeat(80));
        let mut row = |label: &str, value: String| {
            let _ = writeln!(out, "{:>35} {}", format!("{}:", label), value);
        };
        row("Total timesteps", self.total_timesteps.to_string());
        row("Iteration time", format!("{:.2}s", (self.collection_time + self.learn_time).as_secs_f64()));
        row("Total time", format!("{:.2}s", self.total_time.as_secs_f64()));
        row("ETA", format!("{:.1}s", self.eta().as_secs_f64()));
        out
    }
}
