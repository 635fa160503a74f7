use std::path::{Path, PathBuf};
use zpair_core::config::load_run_config;
use zpair_core::data::load_csv;
use zpair_core::Error;

pub(super) fn run_validate(config_path: PathBuf) -> Result<(), String> {
    let config = load_run_config(&config_path).map_err(|err| err.to_string())?;
    super::common::print_config_summary("validate", &config);

    let csv_paths = config.csv_paths();
    if csv_paths.is_empty() {
        println!("config ok (no CSV data configured)");
        return Ok(());
    }

    let mut missing: Vec<String> = config
        .pairs
        .iter()
        .flat_map(|pair| [&pair.symbol_long, &pair.symbol_short])
        .filter(|symbol| !csv_paths.contains_key(*symbol))
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    if !missing.is_empty() {
        return Err(Error::MissingSymbolData(missing).to_string());
    }

    for (symbol, path) in &csv_paths {
        let (_, report) = load_csv(Path::new(path), symbol).map_err(|err| err.to_string())?;
        println!(
            "ohlcv {}: rows={}, duplicates={}, out_of_order={}, invalid_close={}, first={}, last={}",
            symbol,
            report.rows,
            report.duplicates,
            report.out_of_order,
            report.invalid_close,
            report
                .first_timestamp
                .map_or_else(|| "n/a".to_string(), |ts| ts.to_string()),
            report
                .last_timestamp
                .map_or_else(|| "n/a".to_string(), |ts| ts.to_string())
        );
    }

    println!("config ok");
    Ok(())
}
