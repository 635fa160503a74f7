use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use zpair_core::backtest::{run_pairs_backtest, BacktestResult};
use zpair_core::config::{load_run_config, PairConfig};
use zpair_core::data::load_bars_for_symbols;
use zpair_core::engine_name;
use zpair_core::report::write_run_artifacts;
use zpair_core::types::Bar;

pub(super) fn run_backtest(
    config_path: PathBuf,
    pair: Option<String>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<(), String> {
    let config = load_run_config(&config_path).map_err(|err| err.to_string())?;
    if !json {
        super::common::print_config_summary("backtest", &config);
    }

    let csv_paths = config.csv_paths();
    if csv_paths.is_empty() {
        return Err(format!(
            "{} has no [data.csv] section: backtests need OHLCV CSV files",
            config_path.display()
        ));
    }

    let pairs: Vec<&PairConfig> = match pair.as_deref() {
        Some(name) => vec![config
            .pair(name)
            .ok_or_else(|| format!("pair {name} is not configured"))?],
        None => config.pairs.iter().collect(),
    };

    let overall_start = Instant::now();
    let bars = load_bars_for_symbols(&csv_paths).map_err(|err| err.to_string())?;
    let snapshot = serde_json::to_value(&config)
        .map_err(|err| format!("failed to snapshot config: {err}"))?;

    let mut results = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let result = run_pairs_backtest(
            pair,
            &config.risk,
            legs_for(pair, &bars),
            config.starting_cash,
        )
        .map_err(|err| format!("pair {}: {}", pair.name, err))?;

        if let Some(out_dir) = &out {
            let run_dir = out_dir.join(&pair.name);
            write_run_artifacts(&run_dir, &result, Some(&snapshot))
                .map_err(|err| err.to_string())?;
            if !json {
                println!("run output: {}", run_dir.display());
            }
        }
        results.push(result);
    }

    if json {
        let summaries: Vec<serde_json::Value> = results.iter().map(summary_json).collect();
        let line = serde_json::to_string(&summaries)
            .map_err(|err| format!("failed to serialize results: {err}"))?;
        println!("{line}");
    } else {
        for result in &results {
            print_result(result);
        }
        println!(
            "{} cli: backtest total_ms={}",
            engine_name(),
            overall_start.elapsed().as_millis()
        );
    }
    Ok(())
}

fn legs_for(pair: &PairConfig, bars: &HashMap<String, Vec<Bar>>) -> HashMap<String, Vec<Bar>> {
    [&pair.symbol_long, &pair.symbol_short]
        .into_iter()
        .filter_map(|symbol| {
            bars.get(symbol)
                .map(|series| (symbol.clone(), series.clone()))
        })
        .collect()
}

fn summary_json(result: &BacktestResult) -> serde_json::Value {
    serde_json::json!({
        "pair": result.pair,
        "starting_equity": result.starting_equity,
        "ending_equity": result.ending_equity,
        "total_return_pct": result.total_return_pct,
        "max_drawdown_pct": result.max_drawdown_pct,
        "trades": result.trades.len(),
        "bars_processed": result.bars_processed,
    })
}

fn print_result(result: &BacktestResult) {
    println!("pair: {}", result.pair);
    println!("  starting equity: {:.2}", result.starting_equity);
    println!("  ending equity: {:.2}", result.ending_equity);
    println!("  total return: {:.2}%", result.total_return_pct);
    println!("  max drawdown: {:.2}%", result.max_drawdown_pct);
    println!("  trades: {}", result.trades.len());
    println!("  bars processed: {}", result.bars_processed);
}
