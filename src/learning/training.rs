use std::path::PathBuf;

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::config::Config;
use crate::error::Result;
use crate::learning::policy::{Policy, PolicyType};
use crate::learning::q_table::QTable;
use crate::learning::reward::RewardModel;
use crate::learning::sarsa::{self, Transition};
use crate::learning::state_space::StateSpace;
use crate::learning::Status;
use crate::lidar::LidarFrame;
use crate::{Int, N_STATES, UInt};

/// What the collaborator reports after executing an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub frame: LidarFrame,
    pub crash: bool,
}

/// The perception/actuation side of the loop.
pub trait Environment {
    /// Starts a new episode and returns the first frame. `None` means no
    /// sensor data is available yet, in which case the episode starts from a
    /// random state.
    fn reset(&mut self, rng: &mut StdRng) -> Option<LidarFrame>;

    /// Executes `action` and blocks until the resulting frame is available.
    fn step(&mut self, action: Action) -> Observation;
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Init,
    SelectAction { state: Int },
    AwaitTransition { state: Int, action: Action },
    Update(Transition),
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: UInt,
    pub steps: UInt,
    pub total_reward: f64,
    pub crashed: bool,
    pub epsilon: Option<f64>,
    /// Updates skipped because a state id was out of range.
    pub invalid_updates: UInt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub episodes: Vec<EpisodeSummary>,
}

impl TrainingSummary {
    pub fn crashes(&self) -> usize {
        self.episodes.iter().filter(|e| e.crashed).count()
    }

    pub fn mean_reward(&self) -> f64 {
        mean(self.episodes.iter().map(|e| e.total_reward))
    }

    pub fn mean_steps(&self) -> f64 {
        mean(self.episodes.iter().map(|e| e.steps as f64))
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Runs SARSA episodes against an [`Environment`], owning the Q table for the
/// duration of the run.
pub struct Trainer {
    table: QTable,
    policy: PolicyType,
    reward_model: RewardModel,
    state_space: StateSpace,
    alpha: f64,
    gamma: f64,
    episodes: UInt,
    max_steps: UInt,
    checkpoint: Option<(PathBuf, UInt)>,
    rng: StdRng,
}

impl Trainer {
    pub fn new(config: &Config, table: QTable) -> Result<Self> {
        config.validate()?;
        let rng = match config.training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let checkpoint = config
            .training
            .checkpoint_every
            .zip(config.training.q_table_path.clone())
            .map(|(every, path)| (path, every));
        Ok(Trainer {
            table,
            policy: PolicyType::from_config(&config.rl)?,
            reward_model: RewardModel::new(config.sensing.horizon_width),
            state_space: StateSpace::new(config.sensing.clone()),
            alpha: config.rl.alpha,
            gamma: config.rl.gamma,
            episodes: config.training.episodes,
            max_steps: config.training.max_steps_per_episode,
            checkpoint,
            rng,
        })
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn into_table(self) -> QTable {
        self.table
    }

    pub fn policy(&self) -> &PolicyType {
        &self.policy
    }

    /// Runs the configured number of episodes, checkpointing the table as
    /// configured. Only persistence failures abort training.
    pub fn train<E: Environment>(&mut self, env: &mut E) -> Result<TrainingSummary> {
        let mut summary = TrainingSummary::default();
        let log_every = (self.episodes / 10).max(1);
        for episode in 0..self.episodes {
            let result = self.run_episode(env, episode);
            debug!(
                "Episode: {} | Steps: {} | Reward: {:.2} | Crashed: {}",
                result.episode, result.steps, result.total_reward, result.crashed
            );
            summary.episodes.push(result);

            if let Some((path, every)) = &self.checkpoint {
                if (episode + 1) % every == 0 {
                    self.table.save(path)?;
                    info!("Checkpoint after episode {} saved to {}", episode + 1, path.display());
                }
            }
            if (episode + 1) % log_every == 0 {
                let window = &summary.episodes[summary.episodes.len() - log_every as usize..];
                info!(
                    "Episode: {}, Avg. Reward: {:.3}, Avg. Steps: {:.1}, Crashes: {}",
                    episode + 1,
                    mean(window.iter().map(|e| e.total_reward)),
                    mean(window.iter().map(|e| e.steps as f64)),
                    window.iter().filter(|e| e.crashed).count()
                );
            }
        }
        Ok(summary)
    }

    /// Runs one episode until a terminal reward or the step budget.
    pub fn run_episode<E: Environment>(&mut self, env: &mut E, episode: UInt) -> EpisodeSummary {
        let mut result = EpisodeSummary {
            episode,
            steps: 0,
            total_reward: 0.0,
            crashed: false,
            epsilon: self.policy.epsilon(),
            invalid_updates: 0,
        };
        let mut prev_frame: Option<LidarFrame> = None;
        let mut prev_action: Option<Action> = None;
        let mut phase = Phase::Init;

        loop {
            trace!("{phase:?}");
            phase = match phase {
                Phase::Init => {
                    prev_frame = env.reset(&mut self.rng);
                    let state = match &prev_frame {
                        Some(frame) => self.state_space.to_index(frame) as Int,
                        None => self.rng.random_range(0..N_STATES) as Int,
                    };
                    Phase::SelectAction { state }
                }
                Phase::SelectAction { state } => {
                    let (action, _) = self.policy.select(&self.table, state, &mut self.rng);
                    Phase::AwaitTransition { state, action }
                }
                Phase::AwaitTransition { state, action } => {
                    let obs = env.step(action);
                    // Without an initial frame the first delta is measured
                    // against the new frame itself.
                    let reward = self.reward_model.reward(
                        action,
                        prev_action,
                        &obs.frame,
                        prev_frame.as_ref().unwrap_or(&obs.frame),
                        obs.crash,
                    );
                    let next_state = self.state_space.to_index(&obs.frame) as Int;
                    let (next_action, _) =
                        self.policy.select(&self.table, next_state, &mut self.rng);
                    prev_frame = Some(obs.frame);
                    result.steps += 1;
                    Phase::Update(Transition {
                        state,
                        action,
                        reward: reward.val,
                        next_state,
                        next_action,
                        terminal: reward.terminal,
                    })
                }
                Phase::Update(transition) => {
                    let status = sarsa::apply(&mut self.table, &transition, self.alpha, self.gamma);
                    if status == Status::InvalidStateIndex {
                        result.invalid_updates += 1;
                    }
                    result.total_reward += transition.reward;
                    prev_action = Some(transition.action);
                    if transition.terminal {
                        result.crashed = true;
                        Phase::Terminal
                    } else if result.steps >= self.max_steps {
                        Phase::Terminal
                    } else {
                        Phase::AwaitTransition {
                            state: transition.next_state,
                            action: transition.next_action,
                        }
                    }
                }
                Phase::Terminal => break,
            };
        }

        self.policy.end_episode();
        result
    }
}
