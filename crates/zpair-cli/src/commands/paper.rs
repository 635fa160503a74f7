use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use zpair_core::config::load_run_config;
use zpair_core::data::load_bars_for_symbols;
use zpair_core::runner::TradingRunner;
use zpair_core::types::Bar;
use zpair_core::venue::{PaperVenue, Venue};

pub(super) fn run_paper(config_path: PathBuf, max_cycles: Option<u64>) -> Result<(), String> {
    let config = load_run_config(&config_path).map_err(|err| err.to_string())?;
    super::common::print_config_summary("paper", &config);

    let max_cycles =
        max_cycles.or_else(|| config.paper.as_ref().and_then(|paper| paper.max_cycles));
    let venue = PaperVenue::new(config.starting_cash);
    let csv_paths = config.csv_paths();

    let cycles = if csv_paths.is_empty() {
        info!(
            poll_interval_seconds = config.poll_interval_seconds,
            "no CSV data configured; polling with available prices"
        );
        let mut runner = TradingRunner::new(&config, venue);
        let cycles = runner.run_cycles(max_cycles, |_| true);
        print_account(runner.venue());
        cycles
    } else {
        let bars = load_bars_for_symbols(&csv_paths).map_err(|err| err.to_string())?;
        let mut replay = replay_batches(bars.into_values().flatten()).into_values();
        let mut runner = TradingRunner::new(&config, venue).with_poll_interval(Duration::ZERO);
        let cycles = runner.run_cycles(max_cycles, |venue| match replay.next() {
            Some(batch) => {
                for bar in batch {
                    venue.push_bar(bar);
                }
                true
            }
            None => false,
        });
        print_account(runner.venue());
        cycles
    };

    println!("paper cycles: {cycles}");
    Ok(())
}

/// Groups bars by timestamp so each poll cycle sees one new bar per symbol.
fn replay_batches(bars: impl Iterator<Item = Bar>) -> BTreeMap<i64, Vec<Bar>> {
    let mut batches: BTreeMap<i64, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        batches.entry(bar.timestamp).or_default().push(bar);
    }
    batches
}

fn print_account(venue: &PaperVenue) {
    println!("cash: {:.2}", venue.cash());
    println!("realized pnl: {:.2}", venue.realized_pnl());
    for position in venue.positions() {
        println!(
            "position {}: qty={:.4} avg_price={:.4} unrealized_pnl={}",
            position.symbol,
            position.quantity,
            position.avg_price,
            position
                .unrealized_pnl
                .map(|pnl| format!("{pnl:.2}"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }
    println!("orders: {}", venue.order_history().len());
}

#[cfg(test)]
mod tests {
    use super::replay_batches;
    use zpair_core::types::Bar;

    #[test]
    fn replay_groups_bars_by_timestamp_in_order() {
        let bars = vec![
            Bar::flat("KO", 120, 3.0),
            Bar::flat("PEP", 60, 2.0),
            Bar::flat("KO", 60, 1.0),
        ];
        let batches = replay_batches(bars.into_iter());
        let keys: Vec<i64> = batches.keys().copied().collect();
        assert_eq!(keys, vec![60, 120]);
        assert_eq!(batches[&60].len(), 2);
        assert_eq!(batches[&120][0].symbol, "KO");
    }
}
