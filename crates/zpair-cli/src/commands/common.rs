use zpair_core::config::RunConfig;
use zpair_core::engine_name;

pub(super) fn print_config_summary(command: &str, config: &RunConfig) {
    println!(
        "{} cli: {} (mode={}, pairs={}, starting_cash={}, poll_interval_seconds={})",
        engine_name(),
        command,
        config.mode,
        config.pairs.len(),
        config.starting_cash,
        config.poll_interval_seconds
    );
    for pair in &config.pairs {
        println!(
            "pair {}: long={} short={} lookback={} entry_z={} exit_z={} max_holding={} notional_per_leg={}",
            pair.name,
            pair.symbol_long,
            pair.symbol_short,
            pair.lookback_bars,
            pair.entry_zscore,
            pair.exit_zscore,
            pair.max_holding_bars,
            pair.notional_per_leg
        );
    }
    println!(
        "risk: max_total_notional={}, max_pairs_open={}, max_daily_loss={}, max_position_per_symbol={}",
        config.risk.max_total_notional,
        config.risk.max_pairs_open,
        config.risk.max_daily_loss,
        config.risk.max_position_per_symbol
    );
    let csv = config.csv_paths();
    if csv.is_empty() {
        println!("data: none");
    } else {
        let listing: Vec<String> = csv
            .iter()
            .map(|(symbol, path)| format!("{symbol}={path}"))
            .collect();
        println!("data: {}", listing.join(", "));
    }
}
