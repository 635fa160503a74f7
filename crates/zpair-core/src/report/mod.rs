//! Backtest run artifacts: `trades.csv`, `equity.csv` and `summary.json`.

use crate::engine::BacktestResult;
use crate::error::{Error, Result};
use crate::types::{EquityPoint, Order};
use std::fs;
use std::path::Path;

pub fn write_trades_csv(path: &Path, trades: &[Order]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|err| {
        Error::Data(format!("failed to create trades {}: {}", path.display(), err))
    })?;
    writer
        .write_record(["order_id", "timestamp_utc", "symbol", "side", "qty", "price"])
        .map_err(|err| Error::Data(format!("failed to write trades header: {}", err)))?;
    for order in trades {
        let price = order.price.map(|price| price.to_string()).unwrap_or_default();
        writer
            .write_record([
                order.id.clone(),
                order.timestamp.to_string(),
                order.symbol.clone(),
                order.side.to_string(),
                order.quantity.to_string(),
                price,
            ])
            .map_err(|err| Error::Data(format!("failed to write trade row: {}", err)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<()> {
    let mut output = String::from("timestamp_utc,equity,cash\n");
    for point in points {
        output.push_str(&format!(
            "{},{},{}\n",
            point.timestamp, point.equity, point.cash
        ));
    }
    fs::write(path, output).map_err(|err| {
        Error::Data(format!("failed to write equity {}: {}", path.display(), err))
    })
}

/// Headline figures of the run plus an optional copy of the config it ran
/// with. Trades and the equity curve go to their own files.
pub fn write_summary_json(
    path: &Path,
    result: &BacktestResult,
    config_snapshot: Option<&serde_json::Value>,
) -> Result<()> {
    let json = serde_json::json!({
        "pair": result.pair,
        "config_snapshot": config_snapshot,
        "bars_processed": result.bars_processed,
        "trades": result.trades.len(),
        "starting_equity": result.starting_equity,
        "ending_equity": result.ending_equity,
        "total_return_pct": result.total_return_pct,
        "max_drawdown_pct": result.max_drawdown_pct,
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| Error::Data(format!("failed to serialize summary: {}", err)))?;
    fs::write(path, json).map_err(|err| {
        Error::Data(format!("failed to write summary {}: {}", path.display(), err))
    })
}

/// Creates `dir` if needed and writes all three artifacts into it.
pub fn write_run_artifacts(
    dir: &Path,
    result: &BacktestResult,
    config_snapshot: Option<&serde_json::Value>,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_trades_csv(&dir.join("trades.csv"), &result.trades)?;
    write_equity_csv(&dir.join("equity.csv"), &result.equity_curve)?;
    write_summary_json(&dir.join("summary.json"), result, config_snapshot)
}
