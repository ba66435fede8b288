use enum_dispatch::enum_dispatch;
use log::trace;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::Int;
use crate::actions::Action;
use crate::config::{PolicyKind, RlConfig};
use crate::error::{Error, Result};
use crate::learning::Status;
use crate::learning::q_table::QTable;

/// Lowest temperature the softmax policy will divide by.
pub const T_MIN: f64 = 0.001;

#[enum_dispatch]
pub trait Policy {
    /// Chooses the action to take in `state`. An out-of-range state is never
    /// an error for a policy; it explores instead.
    fn select(&self, table: &QTable, state: Int, rng: &mut StdRng) -> (Action, Status);

    /// Called once at the end of every episode.
    fn end_episode(&mut self) {}

    /// Current exploration rate, if the policy has one.
    fn epsilon(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    epsilon: f64,
    decay: f64,
    min_epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Result<Self> {
        EpsilonGreedy::with_decay(epsilon, 1.0, 0.0)
    }

    /// Epsilon is multiplied by `decay` after each episode but never drops
    /// below `min_epsilon`.
    pub fn with_decay(epsilon: f64, decay: f64, min_epsilon: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(Error::invalid_config(format!(
                "epsilon must lie in [0, 1], got {epsilon}"
            )));
        }
        if !(decay > 0.0 && decay <= 1.0) || !(0.0..=1.0).contains(&min_epsilon) {
            return Err(Error::invalid_config(format!(
                "invalid epsilon schedule: decay {decay}, min_epsilon {min_epsilon}"
            )));
        }
        Ok(EpsilonGreedy {
            epsilon,
            decay,
            min_epsilon,
        })
    }
}

impl Policy for EpsilonGreedy {
    fn select(&self, table: &QTable, state: Int, rng: &mut StdRng) -> (Action, Status) {
        let u: f64 = rng.random();
        match table.state_index(state) {
            Some(state) if u > self.epsilon => (table.greedy_action(state), Status::Ok),
            _ => {
                trace!("Exploring in state {state}");
                (Action::random(rng), Status::Ok)
            }
        }
    }

    fn end_episode(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.min_epsilon);
    }

    fn epsilon(&self) -> Option<f64> {
        Some(self.epsilon)
    }
}

/// Always exploits; used to run a trained table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Greedy;

impl Policy for Greedy {
    fn select(&self, table: &QTable, state: Int, rng: &mut StdRng) -> (Action, Status) {
        let (action, _) = table.best_action(state, rng);
        (action, Status::Ok)
    }
}

/// Boltzmann exploration over the row of action values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Softmax {
    temperature: f64,
}

impl Softmax {
    pub fn new(temperature: f64) -> Self {
        Softmax {
            temperature: temperature.max(T_MIN),
        }
    }

    pub fn probabilities(&self, row: &[f64]) -> Vec<f64> {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = row
            .iter()
            .map(|q| ((q - max) / self.temperature).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }
}

impl Policy for Softmax {
    fn select(&self, table: &QTable, state: Int, rng: &mut StdRng) -> (Action, Status) {
        let Some(state) = table.state_index(state) else {
            return (Action::random(rng), Status::Ok);
        };
        let action = WeightedIndex::new(self.probabilities(table.row(state)))
            .ok()
            .and_then(|dist| Action::from_id(dist.sample(rng)))
            .unwrap_or_else(|| table.greedy_action(state));
        (action, Status::Ok)
    }
}

#[enum_dispatch(Policy)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyType {
    EpsilonGreedy(EpsilonGreedy),
    Greedy(Greedy),
    Softmax(Softmax),
}

impl PolicyType {
    pub fn from_config(rl: &RlConfig) -> Result<Self> {
        Ok(match rl.policy {
            PolicyKind::EpsilonGreedy => {
                EpsilonGreedy::with_decay(rl.epsilon, rl.epsilon_decay, rl.min_epsilon)?.into()
            }
            PolicyKind::Greedy => Greedy.into(),
            PolicyKind::Softmax => Softmax::new(rl.temperature).into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::N_ACTIONS;
    use rand::SeedableRng;

    fn table_preferring_left() -> QTable {
        let mut table = QTable::default();
        for state in 0..table.n_states() {
            table.set(state, Action::TurnLeft, 1.0);
        }
        table
    }

    #[test]
    fn test_zero_epsilon_always_exploits() {
        let mut rng = StdRng::seed_from_u64(42);
        let table = table_preferring_left();
        let policy = EpsilonGreedy::new(0.0).unwrap();
        for i in 0..1000 {
            let state = i % 144;
            assert_eq!(
                policy.select(&table, state, &mut rng),
                (Action::TurnLeft, Status::Ok)
            );
        }
    }

    #[test]
    fn test_full_epsilon_always_explores() {
        let mut rng = StdRng::seed_from_u64(42);
        let table = table_preferring_left();
        let policy = EpsilonGreedy::new(1.0).unwrap();
        let mut counts = [0usize; N_ACTIONS];
        for _ in 0..3000 {
            let (action, status) = policy.select(&table, 10, &mut rng);
            assert_eq!(status, Status::Ok);
            counts[action.id()] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "{counts:?}");
        }
    }

    #[test]
    fn test_invalid_state_explores_without_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = table_preferring_left();
        let policy = EpsilonGreedy::new(0.0).unwrap();
        let mut seen = [false; N_ACTIONS];
        for _ in 0..200 {
            let (action, status) = policy.select(&table, 144, &mut rng);
            assert_eq!(status, Status::Ok);
            seen[action.id()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_small_table_explores_past_its_rows() {
        let mut rng = StdRng::seed_from_u64(5);
        let table = QTable::new(10);
        let policies: [PolicyType; 2] = [
            EpsilonGreedy::new(0.0).unwrap().into(),
            Softmax::new(1.0).into(),
        ];
        for policy in policies {
            for state in [10, 50, 143] {
                let (action, status) = policy.select(&table, state, &mut rng);
                assert_eq!(status, Status::Ok);
                assert!(action.id() < N_ACTIONS);
            }
        }
    }

    #[test]
    fn test_epsilon_out_of_range_is_rejected() {
        assert!(EpsilonGreedy::new(-0.1).is_err());
        assert!(EpsilonGreedy::new(1.1).is_err());
        assert!(EpsilonGreedy::with_decay(0.5, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_epsilon_decay_respects_floor() {
        let mut policy: PolicyType = EpsilonGreedy::with_decay(0.5, 0.5, 0.1).unwrap().into();
        policy.end_episode();
        assert_eq!(policy.epsilon(), Some(0.25));
        policy.end_episode();
        policy.end_episode();
        assert_eq!(policy.epsilon(), Some(0.1));
    }

    #[test]
    fn test_greedy_policy() {
        let mut rng = StdRng::seed_from_u64(3);
        let policy: PolicyType = Greedy.into();
        assert_eq!(
            policy.select(&table_preferring_left(), 7, &mut rng),
            (Action::TurnLeft, Status::Ok)
        );
        assert_eq!(policy.epsilon(), None);
    }

    #[test]
    fn test_softmax_probabilities() {
        let policy = Softmax::new(1.0);
        let p = policy.probabilities(&[0.0, 0.0, 0.0]);
        for x in &p {
            assert!((x - 1.0 / 3.0).abs() < 1e-12);
        }
        let p = Softmax::new(0.0).probabilities(&[0.0, 1.0, 0.5]);
        assert!(p[1] > 0.999);
    }

    #[test]
    fn test_softmax_prefers_high_values() {
        let mut rng = StdRng::seed_from_u64(9);
        let policy = Softmax::new(0.1);
        let table = table_preferring_left();
        let lefts = (0..500)
            .filter(|_| policy.select(&table, 0, &mut rng).0 == Action::TurnLeft)
            .count();
        assert!(lefts > 490);
    }

    #[test]
    fn test_from_config() {
        let rl = RlConfig {
            policy: PolicyKind::Softmax,
            ..RlConfig::default()
        };
        assert!(matches!(
            PolicyType::from_config(&rl).unwrap(),
            PolicyType::Softmax(_)
        ));
        let rl = RlConfig {
            epsilon: 2.0,
            ..RlConfig::default()
        };
        assert!(PolicyType::from_config(&rl).is_err());
    }
}
