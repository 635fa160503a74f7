mod backtest;
mod common;
mod paper;
mod validate;

use std::path::PathBuf;
use zpair_core::config::{load_run_config, RunMode};

pub enum Command {
    Backtest {
        config: PathBuf,
        pair: Option<String>,
        out: Option<PathBuf>,
        json: bool,
    },
    Paper {
        config: PathBuf,
        max_cycles: Option<u64>,
    },
    Validate {
        config: PathBuf,
    },
    Run {
        config: PathBuf,
        mode: Option<RunMode>,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest {
            config,
            pair,
            out,
            json,
        } => backtest::run_backtest(config, pair, out, json),
        Command::Paper { config, max_cycles } => paper::run_paper(config, max_cycles),
        Command::Validate { config } => validate::run_validate(config),
        Command::Run { config, mode } => run_configured(config, mode),
    }
}

fn run_configured(config_path: PathBuf, mode: Option<RunMode>) -> Result<(), String> {
    let config = load_run_config(&config_path).map_err(|err| err.to_string())?;
    match mode.unwrap_or(config.mode) {
        RunMode::Backtest => backtest::run_backtest(config_path, None, None, false),
        RunMode::Paper => paper::run_paper(config_path, None),
        RunMode::Live => Err("live mode is not supported: no broker venue is configured".to_string()),
    }
}
