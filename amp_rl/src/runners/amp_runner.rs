//! On-policy training loop with AMP reward relabeling.
//!
//! # Iteration
//!
//! ```text
//! for it in start..start + n:
//!     repeat num_steps_per_env:
//!         actions  = alg.act(history, critic_obs, amp_obs)
//!         step     = env.step(actions)
//!         next_amp = env.amp_obs, reset rows <- terminal amp states
//!         reward   = blend(style(D(norm(amp_obs), norm(next_amp))), task)
//!         amp_obs  = env.amp_obs
//!         history  <- reset done rows, append normalized obs
//!         alg.process_env_step(reward, dones, infos, next_amp)
//!     alg.compute_returns(critic_obs)
//!     alg.update(&mut amp_normalizer)
//!     log, checkpoint every save_interval
//! checkpoint
//! ```
//!
//! Everything runs on the caller's thread; collection and update strictly
//! alternate.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::algorithms::{AlgorithmState, AmpAlgorithm, ModelSpec, StorageSpec};
use crate::amp::{predict_amp_reward, substitute_terminal_states, AmpRewardConfig};
use crate::buffers::ObservationHistoryStorage;
use crate::checkpoint::{Checkpoint, CheckpointError, Checkpointer, CheckpointerConfig, CHECKPOINT_VERSION};
use crate::environment::VecEnv;
use crate::error::{ensure_len, AmpError, Result};
use crate::metrics::{create_writer, EpisodeTracker, IterationSummary, SummaryWriter};
use crate::normalization::{EmpiricalNormalizer, Normalizer};

use super::runner_config::RunnerConfig;

/// Drives rollouts, reward relabeling, updates, logging and checkpoints.
pub struct AmpOnPolicyRunner<E: VecEnv, A: AmpAlgorithm> {
    env: E,
    alg: A,
    config: RunnerConfig,
    reward_config: AmpRewardConfig,
    obs_history: ObservationHistoryStorage,
    amp_normalizer: Normalizer,
    obs_normalizer: Option<EmpiricalNormalizer>,
    critic_obs_normalizer: Option<EmpiricalNormalizer>,
    num_critic_obs: usize,
    log_dir: Option<PathBuf>,
    writer: Option<Box<dyn SummaryWriter>>,
    checkpointer: Option<Checkpointer>,
    current_learning_iteration: usize,
    total_timesteps: usize,
    total_time: Duration,
}

impl<E: VecEnv, A: AmpAlgorithm> AmpOnPolicyRunner<E, A> {
    /// Build the runner and its algorithm.
    ///
    /// `factory` receives the derived model dimensions. With a `log_dir`
    /// the configured logging backend and the checkpointer are created
    /// here; an unavailable backend fails before the algorithm is built.
    /// Without one, nothing is written to disk.
    pub fn new<F>(mut env: E, config: RunnerConfig, log_dir: Option<PathBuf>, factory: F) -> Result<Self>
    where
        F: FnOnce(&ModelSpec) -> Result<A>,
    {
        config.validate()?;

        let writer = match &log_dir {
            Some(dir) => Some(create_writer(config.logger, dir)?),
            None => None,
        };

        let num_envs = env.num_envs();
        let num_obs = env.num_obs();
        let observations = env.get_observations();
        ensure_len("policy observations", &observations.policy, num_envs, num_obs)?;

        let obs_history = ObservationHistoryStorage::new(num_envs, num_obs, config.history_length)?;
        let num_critic_obs = match &observations.critic {
            Some(critic) => {
                if critic.len() % num_envs != 0 {
                    return Err(AmpError::len_mismatch("critic observations", num_envs, critic.len()));
                }
                critic.len() / num_envs
            }
            None => obs_history.history_dim(),
        };

        let spec = ModelSpec {
            policy: config.policy.class_name,
            algorithm: config.algorithm.class_name,
            num_envs,
            num_actor_obs: obs_history.history_dim(),
            num_critic_obs,
            num_actions: env.num_actions(),
            amp_obs_dim: env.amp_obs_dim(),
            step_dt: env.step_dt(),
        };
        let mut alg = factory(&spec)?;

        let (obs_normalizer, critic_obs_normalizer) = if config.empirical_normalization {
            let until = Some(config.empirical_normalization_until);
            (
                Some(EmpiricalNormalizer::with_until(num_obs, until)),
                Some(EmpiricalNormalizer::with_until(num_critic_obs, until)),
            )
        } else {
            (None, None)
        };

        alg.init_storage(&StorageSpec {
            num_envs,
            num_steps_per_env: config.num_steps_per_env,
            actor_obs_shape: vec![spec.num_actor_obs],
            critic_obs_shape: vec![num_critic_obs],
            action_shape: vec![spec.num_actions],
        });

        let checkpointer = match &log_dir {
            Some(dir) => Some(Checkpointer::new(
                CheckpointerConfig::new(dir)
                    .with_save_interval(config.save_interval)
                    .with_keep_last_n(config.checkpoint_keep_last_n),
            )?),
            None => None,
        };

        env.reset();

        log::info!(
            "AMP runner: {} envs, policy {} ({} inputs), critic {} inputs, {} actions, algorithm {}",
            num_envs,
            spec.policy,
            spec.num_actor_obs,
            num_critic_obs,
            spec.num_actions,
            spec.algorithm
        );

        Ok(Self {
            env,
            alg,
            reward_config: config.amp_reward(),
            amp_normalizer: Normalizer::new(spec.amp_obs_dim),
            config,
            obs_history,
            obs_normalizer,
            critic_obs_normalizer,
            num_critic_obs,
            log_dir,
            writer,
            checkpointer,
            current_learning_iteration: 0,
            total_timesteps: 0,
            total_time: Duration::ZERO,
        })
    }

    /// Replace the summary sink chosen from the config.
    pub fn with_writer(mut self, writer: Box<dyn SummaryWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Run `num_learning_iterations` collect/update iterations.
    ///
    /// Continues from the current iteration counter, which a [`load`](Self::load)
    /// restores. With `init_at_random_ep_len` the environment spreads its
    /// episode progress before the first rollout.
    pub fn learn(&mut self, num_learning_iterations: usize, init_at_random_ep_len: bool) -> Result<()> {
        if self.writer.is_none() {
            log::warn!("No summary writer: metrics are not recorded");
        }
        if self.checkpointer.is_none() {
            log::warn!("No log directory: checkpoints are not written");
        }
        if init_at_random_ep_len {
            self.env.randomize_episode_lengths();
        }

        let num_envs = self.env.num_envs();
        let num_obs = self.env.num_obs();
        let num_actions = self.env.num_actions();
        let amp_obs_dim = self.env.amp_obs_dim();

        let observations = self.env.get_observations();
        let obs = self.normalize_obs(&observations.policy)?;
        self.obs_history.add(&obs)?;
        let mut actor_obs = self.obs_history.get();
        let mut critic_obs = self.critic_observations(observations.critic.as_deref(), &actor_obs)?;
        let mut amp_obs = self.env.get_amp_observations();
        ensure_len("AMP observations", &amp_obs, num_envs, amp_obs_dim)?;

        self.train_mode();

        let mut tracker = EpisodeTracker::new(num_envs);
        let start_iter = self.current_learning_iteration;
        let final_iter = start_iter + num_learning_iterations;
        let run_start = Instant::now();

        for it in start_iter..final_iter {
            let collection_start = Instant::now();
            for _ in 0..self.config.num_steps_per_env {
                let actions = self.alg.act(&actor_obs, &critic_obs, &amp_obs);
                ensure_len("actions", &actions, num_envs, num_actions)?;

                let step = self.env.step(&actions);
                step.validate(num_envs, num_obs)?;

                let next_amp_obs = self.env.get_amp_observations();
                let next_amp_obs_with_term = substitute_terminal_states(
                    &next_amp_obs,
                    num_envs,
                    amp_obs_dim,
                    &step.reset_env_ids,
                    &step.terminal_amp_states,
                )?;
                let reward = predict_amp_reward(
                    self.alg.discriminator(),
                    &self.amp_normalizer,
                    &amp_obs,
                    &next_amp_obs_with_term,
                    &step.rewards,
                    &self.reward_config,
                )?;
                amp_obs = next_amp_obs;

                let obs = self.normalize_obs(&step.observations)?;
                if step.dones.iter().any(|&done| done) {
                    self.obs_history.reset(&step.dones)?;
                }
                self.obs_history.add(&obs)?;
                actor_obs = self.obs_history.get();
                critic_obs = self.critic_observations(step.infos.critic_observations.as_deref(), &actor_obs)?;

                self.alg
                    .process_env_step(&reward.rewards, &step.dones, &step.infos, &next_amp_obs_with_term);

                if self.writer.is_some() {
                    tracker.record_step(&reward.rewards, &step.dones)?;
                    if let Some(info) = step.infos.episode_statistics() {
                        tracker.push_episode_info(info.clone());
                    }
                }
            }
            let collection_time = collection_start.elapsed();

            let learn_start = Instant::now();
            self.alg.compute_returns(&critic_obs);
            let losses = self.alg.update(&mut self.amp_normalizer)?;
            let learn_time = learn_start.elapsed();

            let steps_this_iteration = self.config.num_steps_per_env * num_envs;
            self.total_timesteps += steps_this_iteration;
            self.total_time += collection_time + learn_time;
            self.current_learning_iteration = it + 1;

            if self.writer.is_some() {
                let summary = IterationSummary {
                    iteration: it,
                    final_iteration: final_iter,
                    losses,
                    learning_rate: self.alg.learning_rate(),
                    action_std: self.alg.action_std_mean(),
                    collection_time,
                    learn_time,
                    steps_this_iteration,
                    total_timesteps: self.total_timesteps,
                    total_time: self.total_time,
                    run_time: run_start.elapsed(),
                    run_iterations: it + 1 - start_iter,
                    mean_reward: tracker.mean_reward(),
                    mean_episode_length: tracker.mean_episode_length(),
                    episode_info_means: tracker.episode_info_means(),
                };
                if let Some(writer) = self.writer.as_mut() {
                    summary.write_scalars(&mut **writer)?;
                }
                log::info!("\n{}", summary.render());
            }
            tracker.clear_episode_infos();

            if self.checkpointer.as_ref().is_some_and(|c| c.should_save(it)) {
                self.save_iteration(it)?;
            }
        }

        self.save_iteration(self.current_learning_iteration)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Write a checkpoint to `path`.
    pub fn save(&mut self, path: &Path, infos: Option<serde_json::Value>) -> Result<()> {
        let checkpoint = self.build_checkpoint(infos)?;
        checkpoint.save(path)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.save_model(path, self.current_learning_iteration)?;
        }
        Ok(())
    }

    /// Restore from a checkpoint written by [`save`](Self::save) or by `learn`.
    ///
    /// Optimizer state is restored only with `load_optimizer`. Returns the
    /// checkpoint's info payload. Nothing is modified if the checkpoint does
    /// not fit this runner.
    pub fn load(&mut self, path: &Path, load_optimizer: bool) -> Result<Option<serde_json::Value>> {
        let checkpoint = Checkpoint::load(path)?;

        if checkpoint.amp_normalizer.input_dim() != self.amp_normalizer.input_dim() {
            return Err(AmpError::ShapeMismatch {
                what: "checkpoint AMP normalizer",
                expected: vec![self.amp_normalizer.input_dim()],
                actual: vec![checkpoint.amp_normalizer.input_dim()],
            });
        }
        let normalizers = if self.config.empirical_normalization {
            let obs = restored_normalizer(
                checkpoint.obs_normalizer,
                self.obs_normalizer.as_ref(),
                "obs_norm_state_dict",
            )?;
            let critic = restored_normalizer(
                checkpoint.critic_obs_normalizer,
                self.critic_obs_normalizer.as_ref(),
                "critic_obs_norm_state_dict",
            )?;
            Some((obs, critic))
        } else {
            None
        };

        let state = AlgorithmState {
            model: checkpoint.model_state,
            optimizer: checkpoint.optimizer_state,
            discriminator: checkpoint.discriminator_state,
        };
        self.alg.import_state(&state, load_optimizer)?;

        self.amp_normalizer = checkpoint.amp_normalizer;
        if let Some((obs, critic)) = normalizers {
            self.obs_normalizer = Some(obs);
            self.critic_obs_normalizer = Some(critic);
        }
        self.current_learning_iteration = checkpoint.iter;
        log::info!("Loaded checkpoint {} (iteration {})", path.display(), checkpoint.iter);
        Ok(checkpoint.infos)
    }

    /// Switch to eval mode and return the deployment policy.
    ///
    /// The policy keeps its own observation history, starting empty.
    pub fn inference_policy(&mut self) -> Result<InferencePolicy<'_, A>> {
        self.eval_mode();
        let history = ObservationHistoryStorage::new(
            self.obs_history.num_envs(),
            self.obs_history.obs_dim(),
            self.obs_history.history_length(),
        )?;
        Ok(InferencePolicy {
            alg: &self.alg,
            obs_normalizer: self.obs_normalizer.as_ref(),
            history,
        })
    }

    pub fn train_mode(&mut self) {
        self.alg.train_mode();
        for normalizer in [&mut self.obs_normalizer, &mut self.critic_obs_normalizer]
            .into_iter()
            .flatten()
        {
            normalizer.train();
        }
    }

    pub fn eval_mode(&mut self) {
        self.alg.eval_mode();
        for normalizer in [&mut self.obs_normalizer, &mut self.critic_obs_normalizer]
            .into_iter()
            .flatten()
        {
            normalizer.eval();
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn algorithm(&self) -> &A {
        &self.alg
    }

    pub fn algorithm_mut(&mut self) -> &mut A {
        &mut self.alg
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn amp_normalizer(&self) -> &Normalizer {
        &self.amp_normalizer
    }

    pub fn obs_normalizer(&self) -> Option<&EmpiricalNormalizer> {
        self.obs_normalizer.as_ref()
    }

    pub fn critic_obs_normalizer(&self) -> Option<&EmpiricalNormalizer> {
        self.critic_obs_normalizer.as_ref()
    }

    pub fn obs_history(&self) -> &ObservationHistoryStorage {
        &self.obs_history
    }

    /// Index of the next learning iteration.
    pub fn current_learning_iteration(&self) -> usize {
        self.current_learning_iteration
    }

    pub fn total_timesteps(&self) -> usize {
        self.total_timesteps
    }

    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    fn normalize_obs(&mut self, obs: &[f32]) -> Result<Vec<f32>> {
        match self.obs_normalizer.as_mut() {
            Some(normalizer) => normalizer.forward(obs),
            None => Ok(obs.to_vec()),
        }
    }

    /// Privileged critic observations if the environment provides them,
    /// otherwise the actor's history.
    fn critic_observations(&mut self, critic: Option<&[f32]>, actor_obs: &[f32]) -> Result<Vec<f32>> {
        let Some(critic) = critic else {
            return Ok(actor_obs.to_vec());
        };
        ensure_len("critic observations", critic, self.env.num_envs(), self.num_critic_obs)?;
        match self.critic_obs_normalizer.as_mut() {
            Some(normalizer) => normalizer.forward(critic),
            None => Ok(critic.to_vec()),
        }
    }

    fn build_checkpoint(&self, infos: Option<serde_json::Value>) -> Result<Checkpoint> {
        let state = self.alg.export_state()?;
        Ok(Checkpoint {
            version: CHECKPOINT_VERSION,
            model_state: state.model,
            optimizer_state: state.optimizer,
            discriminator_state: state.discriminator,
            amp_normalizer: self.amp_normalizer.clone(),
            iter: self.current_learning_iteration,
            obs_normalizer: self.obs_normalizer.clone(),
            critic_obs_normalizer: self.critic_obs_normalizer.clone(),
            infos,
        })
    }

    /// Save `model_{iteration}.json` into the log directory, if any.
    fn save_iteration(&mut self, iteration: usize) -> Result<()> {
        if self.checkpointer.is_none() {
            return Ok(());
        }
        let checkpoint = self.build_checkpoint(None)?;
        if let Some(checkpointer) = self.checkpointer.as_mut() {
            let path = checkpointer.save(&checkpoint, iteration)?;
            if let Some(writer) = self.writer.as_mut() {
                writer.save_model(&path, self.current_learning_iteration)?;
            }
        }
        Ok(())
    }
}

/// Check a checkpointed observation normalizer against the live one and
/// carry over the live train/eval mode.
fn restored_normalizer(
    stored: Option<EmpiricalNormalizer>,
    current: Option<&EmpiricalNormalizer>,
    key: &'static str,
) -> Result<EmpiricalNormalizer> {
    let mut stored = stored.ok_or(CheckpointError::MissingEntry(key))?;
    if let Some(current) = current {
        if stored.dim() != current.dim() {
            return Err(AmpError::ShapeMismatch {
                what: key,
                expected: vec![current.dim()],
                actual: vec![stored.dim()],
            });
        }
        if !current.is_training() {
            stored.eval();
        }
    }
    Ok(stored)
}

/// Deterministic policy for deployment.
///
/// Takes single-frame policy observations `[num_envs * num_obs]` as the
/// environment reports them and builds the actor input the way `learn`
/// does: normalize the frame (without updating statistics), clear the
/// history of environments that just finished, append.
pub struct InferencePolicy<'a, A: AmpAlgorithm> {
    alg: &'a A,
    obs_normalizer: Option<&'a EmpiricalNormalizer>,
    history: ObservationHistoryStorage,
}

impl<'a, A: AmpAlgorithm> InferencePolicy<'a, A> {
    /// Act on the latest observations.
    ///
    /// `dones` are the done flags of the step that produced `observations`;
    /// pass `None` for the first frame after a reset.
    pub fn act(&mut self, observations: &[f32], dones: Option<&[bool]>) -> Result<Vec<f32>> {
        let obs = match self.obs_normalizer {
            Some(normalizer) => normalizer.normalize(observations)?,
            None => observations.to_vec(),
        };
        if let Some(dones) = dones {
            if dones.iter().any(|&done| done) {
                self.history.reset(dones)?;
            }
        }
        self.history.add(&obs)?;
        Ok(self.alg.act_inference(&self.history.get()))
    }

    /// Forget every environment's history.
    pub fn reset(&mut self) -> Result<()> {
        self.history.reset(&vec![true; self.history.num_envs()])
    }

    pub fn history(&self) -> &ObservationHistoryStorage {
        &self.history
    }
}
