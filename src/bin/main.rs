use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, warn};
use sarsa_nav::{
    Result,
    config::Config,
    learning::{q_table::QTable, training::Trainer},
    simulation::Simulation,
};

const DEFAULT_CONFIG: &str = "sarsa_nav.toml";

fn load_config() -> Result<Config> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    if path.exists() {
        info!("Reading configuration from {}", path.display());
        Config::from_file(&path)
    } else {
        warn!("{} not found, using default configuration", path.display());
        Ok(Config::default())
    }
}

fn run() -> Result<()> {
    let config = load_config()?;

    let table = match &config.training.q_table_path {
        Some(path) if path.exists() => {
            info!("Resuming from Q table {}", path.display());
            QTable::load(path)?
        }
        _ => QTable::default(),
    };

    let mut sim = Simulation::new(config.simulation.clone());
    let mut trainer = Trainer::new(&config, table)?;
    info!(
        "Training for {} episodes of at most {} steps",
        config.training.episodes, config.training.max_steps_per_episode
    );
    let summary = trainer.train(&mut sim)?;
    info!(
        "Done. Avg. Reward: {:.3}, Avg. Steps: {:.1}, Crashes: {}/{}",
        summary.mean_reward(),
        summary.mean_steps(),
        summary.crashes(),
        summary.episodes.len()
    );

    if let Some(path) = &config.training.q_table_path {
        trainer.table().save(path)?;
        info!("Q table written to {}", path.display());
    }

    // Write the per-episode summary to stdout.
    match serde_json::to_string(&summary) {
        Ok(s) => println!("{s}"),
        Err(e) => warn!("Could not serialise the training summary: {e}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
