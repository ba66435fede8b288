use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::simulation::SimulationConfig;
use crate::{N_BEARINGS, UInt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rl: RlConfig,
    pub training: TrainingConfig,
    pub sensing: SensingConfig,
    pub simulation: SimulationConfig,
}

/// Which action selection rule the trainer follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    EpsilonGreedy,
    Greedy,
    Softmax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RlConfig {
    pub policy: PolicyKind,
    /// Exploration rate for epsilon-greedy selection.
    pub epsilon: f64,
    /// Multiplicative decay applied to epsilon after every episode.
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    /// Boltzmann temperature, only used by the softmax policy.
    pub temperature: f64,
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: UInt,
    pub max_steps_per_episode: UInt,
    pub seed: Option<u64>,
    /// Where the Q table is loaded from and checkpointed to.
    pub q_table_path: Option<PathBuf>,
    /// Save the table every this many episodes (requires `q_table_path`).
    pub checkpoint_every: Option<UInt>,
}

/// Geometry of the forward horizon and the distance thresholds used to
/// discretise it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensingConfig {
    /// Half-width of the forward horizon in degrees.
    pub horizon_width: usize,
    /// Zone readings at or below this are "near".
    pub zone_0_length: f64,
    /// Zone readings below this (and above `zone_0_length`) are "mid".
    pub zone_1_length: f64,
    /// A sector is occupied when its closest reading is below this.
    pub sector_length: f64,
}

impl Default for RlConfig {
    fn default() -> Self {
        RlConfig {
            policy: PolicyKind::EpsilonGreedy,
            epsilon: 0.1,
            epsilon_decay: 1.0,
            min_epsilon: 0.0,
            temperature: 1.0,
            alpha: 0.1,
            gamma: 0.9,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            episodes: 1000,
            max_steps_per_episode: 500,
            seed: None,
            q_table_path: None,
            checkpoint_every: None,
        }
    }
}

impl Default for SensingConfig {
    fn default() -> Self {
        SensingConfig {
            horizon_width: 75,
            zone_0_length: 0.4,
            zone_1_length: 0.7,
            sector_length: 1.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rl: RlConfig::default(),
            training: TrainingConfig::default(),
            sensing: SensingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

fn check_unit(name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if lower_ok && value <= 1.0 {
        Ok(())
    } else {
        let interval = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        Err(Error::invalid_config(format!(
            "{name} must lie in {interval}, got {value}"
        )))
    }
}

impl RlConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit("epsilon", self.epsilon, true)?;
        check_unit("min_epsilon", self.min_epsilon, true)?;
        check_unit("epsilon_decay", self.epsilon_decay, false)?;
        check_unit("alpha", self.alpha, false)?;
        check_unit("gamma", self.gamma, false)?;
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(Error::invalid_config(format!(
                "temperature must be positive and finite, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.episodes == 0 {
            return Err(Error::invalid_config("episodes must be positive"));
        }
        if self.max_steps_per_episode == 0 {
            return Err(Error::invalid_config(
                "max_steps_per_episode must be positive",
            ));
        }
        match (self.checkpoint_every, &self.q_table_path) {
            (Some(0), _) => Err(Error::invalid_config("checkpoint_every must be positive")),
            (Some(_), None) => Err(Error::invalid_config(
                "checkpoint_every requires q_table_path",
            )),
            _ => Ok(()),
        }
    }
}

impl SensingConfig {
    pub fn validate(&self) -> Result<()> {
        // Each side is split into three sectors, and a horizon wider than half
        // a turn would count the rear bearing twice.
        if !(3..=N_BEARINGS / 2).contains(&self.horizon_width) {
            return Err(Error::invalid_config(format!(
                "horizon_width must lie in [3, 180], got {}",
                self.horizon_width
            )));
        }
        if !(self.zone_0_length > 0.0 && self.zone_0_length < self.zone_1_length) {
            return Err(Error::invalid_config(format!(
                "zone lengths must satisfy 0 < zone_0_length < zone_1_length, got {} and {}",
                self.zone_0_length, self.zone_1_length
            )));
        }
        if !(self.sector_length > 0.0) {
            return Err(Error::invalid_config("sector_length must be positive"));
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.rl.validate()?;
        self.training.validate()?;
        self.sensing.validate()?;
        self.simulation.validate()
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read config {}", path.display()), e))?;
        Config::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml("[rl]\nepsilon = 0.3\n").unwrap();
        assert_eq!(config.rl.epsilon, 0.3);
        assert_eq!(config.rl.alpha, 0.1);
        assert_eq!(config.sensing.horizon_width, 75);
        assert_eq!(config.training.max_steps_per_episode, 500);
    }

    #[test]
    fn test_policy_kind_names() {
        let config = Config::from_toml("[rl]\npolicy = \"softmax\"\n").unwrap();
        assert_eq!(config.rl.policy, PolicyKind::Softmax);
    }

    #[test]
    fn test_out_of_range_parameters_fail_fast() {
        for text in [
            "[rl]\nepsilon = 1.5\n",
            "[rl]\nalpha = 0.0\n",
            "[rl]\ngamma = -0.1\n",
            "[sensing]\nhorizon_width = 181\n",
            "[sensing]\nzone_0_length = 0.9\n",
            "[training]\nepisodes = 0\n",
            "[training]\ncheckpoint_every = 10\n",
        ] {
            assert!(
                matches!(Config::from_toml(text), Err(Error::InvalidConfig { .. })),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Config::from_toml("[rl\n"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_read_from_file() {
        let config = Config::from_file("./sarsa_nav.toml").expect("Failed to read the file");
        assert_eq!(config.sensing.horizon_width, 75);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::from_file("./does-not-exist.toml"),
            Err(Error::Io { .. })
        ));
    }
}
