mod config;
mod logging;

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use engine_logging::{engine_error, engine_info};
use relay_engine::{RelayEngine, Scheduler, StdinCodeSource};

use crate::config::{RelayConfig, DEFAULT_CONFIG_PATH};

fn main() -> ExitCode {
    let config_path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    // Loaded before logging so the configured level applies from the start.
    let config = match RelayConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("table_relay: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let level = match config.log_level() {
        Ok(level) => level,
        Err(err) => {
            eprintln!("table_relay: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::initialize(level, Path::new(logging::LOG_FILE));

    if config_path.exists() {
        engine_info!("loaded config from {:?}", config_path);
    } else {
        engine_info!("no config at {:?}; using built-in defaults", config_path);
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("relay stopped: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: RelayConfig) -> Result<()> {
    engine_info!("table_relay starting");
    let engine_config = config.into_engine_config()?;
    let engine = RelayEngine::new(engine_config, Arc::new(StdinCodeSource))
        .context("failed to set up the relay")?;

    let summary = engine.run_blocking(Scheduler::default())?;
    bail!(
        "scheduler returned after {} cycle(s) without a failure",
        summary.cycles_attempted
    )
}
