mod commands;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;
use zpair_core::config::RunMode;

#[derive(Parser)]
#[command(name = "zpair")]
#[command(about = "Pairs mean-reversion trading CLI", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  zpair backtest --config configs/sample.toml --out runs/\n  zpair paper --config configs/sample.toml --max-cycles 100\n  zpair validate --config configs/sample.toml\n  zpair run --config configs/sample.toml --mode backtest\n"
)]
struct Cli {
    /// Log filter used when ZPAIR_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Log output format: pretty or json.
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,
    /// Serve Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Replay CSV bars through one or every configured pair.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        /// Only backtest the pair with this name.
        #[arg(long)]
        pair: Option<String>,
        /// Directory for trades.csv, equity.csv and summary.json.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print results as JSON instead of human output.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Poll the paper venue, replaying configured CSV bars one per cycle.
    Paper {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Check the config and the quality of its CSV data.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Dispatch on the configured (or overridden) run mode.
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_mode)]
        mode: Option<RunMode>,
    },
}

fn parse_mode(raw: &str) -> Result<RunMode, String> {
    match raw.trim().to_lowercase().as_str() {
        "backtest" => Ok(RunMode::Backtest),
        "paper" => Ok(RunMode::Paper),
        "live" => Ok(RunMode::Live),
        other => Err(format!("unknown mode {other}: expected backtest, paper or live")),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Backtest {
            config,
            pair,
            out,
            json,
        } => Command::Backtest {
            config,
            pair,
            out,
            json,
        },
        CliCommand::Paper { config, max_cycles } => Command::Paper { config, max_cycles },
        CliCommand::Validate { config } => Command::Validate { config },
        CliCommand::Run { config, mode } => Command::Run { config, mode },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
