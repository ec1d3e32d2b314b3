//! Recording mock environment and algorithm.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::algorithms::{AlgorithmState, AmpAlgorithm, ModelSpec, StorageSpec, UpdateLosses};
use crate::amp::Discriminator;
use crate::environment::{EnvStep, Observations, StepInfos, VecEnv};
use crate::error::Result;
use crate::normalization::Normalizer;

pub const NUM_ENVS: usize = 4;
pub const NUM_OBS: usize = 3;
pub const NUM_ACTIONS: usize = 2;
pub const AMP_DIM: usize = 2;

/// Environment `i` finishes an episode every `i + 2` steps.
///
/// Policy observation of env `i` is `[t, i, 1]` with `t` the global step
/// count; its AMP observation is `[i, steps into the episode]`.
pub struct MockEnv {
    pub periods: Vec<usize>,
    pub ep_steps: Vec<usize>,
    pub t: usize,
    pub step_calls: usize,
    pub reset_calls: usize,
    pub randomized: bool,
    /// Width of privileged critic observations, if provided.
    pub critic_dim: Option<usize>,
    /// Emit one extra terminal-state value per step.
    pub corrupt_terminal_states: bool,
    /// Report episode statistics under `log` instead of `episode`.
    pub statistics_in_log: bool,
}

impl MockEnv {
    pub fn new() -> Self {
        Self {
            periods: (0..NUM_ENVS).map(|i| i + 2).collect(),
            ep_steps: vec![0; NUM_ENVS],
            t: 0,
            step_calls: 0,
            reset_calls: 0,
            randomized: false,
            critic_dim: None,
            corrupt_terminal_states: false,
            statistics_in_log: false,
        }
    }

    pub fn with_critic(mut self, dim: usize) -> Self {
        self.critic_dim = Some(dim);
        self
    }

    pub fn policy_obs(&self) -> Vec<f32> {
        (0..NUM_ENVS)
            .flat_map(|env| [self.t as f32, env as f32, 1.0])
            .collect()
    }

    pub fn critic_obs(&self) -> Option<Vec<f32>> {
        self.critic_dim
            .map(|dim| (0..NUM_ENVS * dim).map(|i| (self.t * 100 + i) as f32).collect())
    }
}

impl VecEnv for MockEnv {
    fn num_envs(&self) -> usize {
        NUM_ENVS
    }

    fn num_obs(&self) -> usize {
        NUM_OBS
    }

    fn num_actions(&self) -> usize {
        NUM_ACTIONS
    }

    fn amp_obs_dim(&self) -> usize {
        AMP_DIM
    }

    fn step_dt(&self) -> f32 {
        0.02
    }

    fn get_observations(&self) -> Observations {
        Observations {
            policy: self.policy_obs(),
            critic: self.critic_obs(),
        }
    }

    fn reset(&mut self) -> Observations {
        self.reset_calls += 1;
        self.ep_steps = vec![0; NUM_ENVS];
        self.get_observations()
    }

    fn step(&mut self, actions: &[f32]) -> EnvStep {
        assert_eq!(actions.len(), NUM_ENVS * NUM_ACTIONS);
        self.step_calls += 1;
        self.t += 1;

        let mut dones = vec![false; NUM_ENVS];
        let mut reset_env_ids = Vec::new();
        let mut terminal_amp_states = Vec::new();
        for env in 0..NUM_ENVS {
            self.ep_steps[env] += 1;
            if self.ep_steps[env] == self.periods[env] {
                dones[env] = true;
                reset_env_ids.push(env);
                terminal_amp_states.extend([env as f32, self.ep_steps[env] as f32]);
                self.ep_steps[env] = 0;
            }
        }
        if self.corrupt_terminal_states {
            terminal_amp_states.push(0.0);
        }

        let statistics = if reset_env_ids.is_empty() {
            None
        } else {
            let mut info = BTreeMap::new();
            info.insert("rew_style".to_string(), vec![0.5]);
            Some(info)
        };
        let (episode, log) = if self.statistics_in_log {
            (None, statistics)
        } else {
            (statistics, None)
        };

        EnvStep {
            observations: self.policy_obs(),
            rewards: vec![1.0; NUM_ENVS],
            dones,
            infos: StepInfos {
                critic_observations: self.critic_obs(),
                episode,
                log,
                time_outs: None,
            },
            reset_env_ids,
            terminal_amp_states,
        }
    }

    fn get_amp_observations(&self) -> Vec<f32> {
        (0..NUM_ENVS)
            .flat_map(|env| [env as f32, self.ep_steps[env] as f32])
            .collect()
    }

    fn randomize_episode_lengths(&mut self) {
        self.randomized = true;
    }
}

/// Scores every transition the same.
pub struct ConstDiscriminator {
    pub score: f32,
}

impl Discriminator for ConstDiscriminator {
    fn predict(&self, _state: &[f32], _next_state: &[f32], batch: usize) -> Vec<f32> {
        vec![self.score; batch]
    }
}

/// Algorithm that records its inputs and returns fixed outputs.
///
/// `update` feeds the AMP observations seen by `act` into the normalizer,
/// paired with a constant expert batch.
pub struct MockAlgorithm {
    pub spec: ModelSpec,
    pub storage: Option<StorageSpec>,
    pub discriminator: ConstDiscriminator,
    pub act_calls: usize,
    pub actor_obs_seen: Vec<Vec<f32>>,
    pub critic_obs_seen: Vec<Vec<f32>>,
    pub amp_obs_seen: Vec<Vec<f32>>,
    pub rewards_seen: Vec<Vec<f32>>,
    pub terminal_amp_obs_seen: Vec<Vec<f32>>,
    pub inference_obs_seen: RefCell<Vec<Vec<f32>>>,
    pub compute_returns_calls: usize,
    pub update_calls: usize,
    pub pending_amp: Vec<f32>,
    pub training: bool,
    pub imported: Option<(AlgorithmState, bool)>,
}

impl MockAlgorithm {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            spec: spec.clone(),
            storage: None,
            discriminator: ConstDiscriminator { score: 1.0 },
            act_calls: 0,
            actor_obs_seen: Vec::new(),
            critic_obs_seen: Vec::new(),
            amp_obs_seen: Vec::new(),
            rewards_seen: Vec::new(),
            terminal_amp_obs_seen: Vec::new(),
            inference_obs_seen: RefCell::new(Vec::new()),
            compute_returns_calls: 0,
            update_calls: 0,
            pending_amp: Vec::new(),
            training: false,
            imported: None,
        }
    }
}

impl AmpAlgorithm for MockAlgorithm {
    type Discriminator = ConstDiscriminator;

    fn init_storage(&mut self, spec: &StorageSpec) {
        self.storage = Some(spec.clone());
    }

    fn act(&mut self, actor_obs: &[f32], critic_obs: &[f32], amp_obs: &[f32]) -> Vec<f32> {
        self.act_calls += 1;
        self.actor_obs_seen.push(actor_obs.to_vec());
        self.critic_obs_seen.push(critic_obs.to_vec());
        self.amp_obs_seen.push(amp_obs.to_vec());
        self.pending_amp.extend_from_slice(amp_obs);
        vec![0.0; self.spec.num_envs * self.spec.num_actions]
    }

    fn process_env_step(&mut self, rewards: &[f32], _dones: &[bool], _infos: &StepInfos, terminal_amp_obs: &[f32]) {
        self.rewards_seen.push(rewards.to_vec());
        self.terminal_amp_obs_seen.push(terminal_amp_obs.to_vec());
    }

    fn compute_returns(&mut self, _last_critic_obs: &[f32]) {
        self.compute_returns_calls += 1;
    }

    fn update(&mut self, amp_normalizer: &mut Normalizer) -> Result<UpdateLosses> {
        let expert = vec![0.5; self.pending_amp.len()];
        amp_normalizer.update_from_sources(&self.pending_amp, &expert)?;
        self.pending_amp.clear();
        self.update_calls += 1;
        Ok(UpdateLosses {
            value_loss: 0.1,
            surrogate_loss: -0.02,
            amp_loss: 0.7,
            grad_pen_loss: 0.01,
            policy_pred: -0.5,
            expert_pred: 0.5,
        })
    }

    fn discriminator(&self) -> &ConstDiscriminator {
        &self.discriminator
    }

    /// Last input of each row, repeated per action.
    fn act_inference(&self, actor_obs: &[f32]) -> Vec<f32> {
        self.inference_obs_seen.borrow_mut().push(actor_obs.to_vec());
        actor_obs
            .chunks(self.spec.num_actor_obs)
            .flat_map(|row| vec![row[row.len() - 1]; self.spec.num_actions])
            .collect()
    }

    fn learning_rate(&self) -> f64 {
        1e-3
    }

    fn action_std_mean(&self) -> f32 {
        1.0
    }

    fn train_mode(&mut self) {
        self.training = true;
    }

    fn eval_mode(&mut self) {
        self.training = false;
    }

    fn export_state(&self) -> Result<AlgorithmState> {
        Ok(AlgorithmState {
            model: vec![self.update_calls as u8],
            optimizer: vec![1, 2],
            discriminator: vec![3],
        })
    }

    fn import_state(&mut self, state: &AlgorithmState, load_optimizer: bool) -> Result<()> {
        self.imported = Some((state.clone(), load_optimizer));
        Ok(())
    }
}
