use crate::config::{PairConfig, RiskConfig};
use crate::error::{Error, Result};
use crate::metrics::MetricsState;
use crate::strategy::{PairState, PairsMeanReversion, Signal, Strategy};
use crate::types::{Bar, EquityPoint, Order};
use crate::venue::{BacktestVenue, Venue};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, info_span};

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub pair: String,
    pub starting_equity: f64,
    pub ending_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub trades: Vec<Order>,
    pub equity_curve: Vec<EquityPoint>,
    pub bars_processed: usize,
}

/// Replays one pair over its bar history.
///
/// Only the two legs of `pair` are replayed, so unrelated symbols in
/// `bars_by_symbol` never shorten the run. Bars before the lookback window
/// fills keep equity flat at the starting cash.
pub fn run_pairs_backtest(
    pair: &PairConfig,
    risk: &RiskConfig,
    mut bars_by_symbol: HashMap<String, Vec<Bar>>,
    starting_cash: f64,
) -> Result<BacktestResult> {
    let _span = info_span!(
        "run_pairs_backtest",
        pair = %pair.name,
        long = %pair.symbol_long,
        short = %pair.symbol_short,
        max_pairs_open = risk.max_pairs_open
    )
    .entered();

    let mut legs = HashMap::with_capacity(2);
    let mut missing = Vec::new();
    for symbol in [&pair.symbol_long, &pair.symbol_short] {
        match bars_by_symbol.remove(symbol) {
            Some(bars) => {
                legs.insert(symbol.clone(), bars);
            }
            None => missing.push(symbol.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(Error::MissingSymbolData(missing));
    }

    let stage_start = Instant::now();
    let mut venue = BacktestVenue::new(legs, starting_cash)?;
    let strategy = PairsMeanReversion::new(pair.clone());
    let mut state = PairState::default();
    let mut metrics = MetricsState::new(starting_cash);

    loop {
        let index = match venue.step() {
            Ok(index) => index,
            Err(err) if err.is_out_of_data() => break,
            Err(err) => return Err(err),
        };

        if index + 1 >= pair.lookback_bars {
            let signal = strategy.generate_signal(&venue, &mut state)?;
            if signal != Signal::Hold {
                strategy.execute(&mut venue, signal, &mut state)?;
            }
        }

        let timestamp = venue.latest_bar(&pair.symbol_long)?.timestamp;
        metrics.record_equity(EquityPoint {
            timestamp,
            equity: venue.equity(),
            cash: venue.cash(),
        });
    }

    let trades = venue.order_history();
    let (equity_curve, summary) = metrics.into_parts();
    metrics::histogram!("zpair.backtest.engine_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("zpair.backtest.bars_processed").set(summary.bars_processed as f64);
    info!(
        bars = summary.bars_processed,
        trades = trades.len(),
        ending_equity = summary.ending_equity,
        max_drawdown_pct = summary.max_drawdown_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        pair: pair.name.clone(),
        starting_equity: summary.starting_equity,
        ending_equity: summary.ending_equity,
        total_return_pct: summary.total_return_pct,
        max_drawdown_pct: summary.max_drawdown_pct,
        trades,
        equity_curve,
        bars_processed: summary.bars_processed,
    })
}
