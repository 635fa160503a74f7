use crate::error::{Error, Result};
use crate::types::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.out_of_order == 0 && self.invalid_close == 0
    }
}

#[derive(Debug, Deserialize)]
struct OhlcvRecord {
    #[serde(alias = "timestamp")]
    timestamp_utc: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Reads `timestamp_utc,open,high,low,close,volume` rows for one symbol.
///
/// Rows with a non-finite or non-positive close are dropped. A row repeating
/// the previous timestamp replaces it, and a row older than the previous one
/// is dropped, so the returned bars are strictly increasing in time.
pub fn load_csv(path: &Path, symbol: &str) -> Result<(Vec<Bar>, DataQualityReport)> {
    let file = File::open(path).map_err(|err| {
        Error::Data(format!("failed to open OHLCV CSV {}: {}", path.display(), err))
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars: Vec<Bar> = Vec::new();
    let mut report = DataQualityReport::default();

    for result in reader.deserialize::<OhlcvRecord>() {
        let record = result.map_err(|err| {
            Error::Data(format!("failed to parse CSV row in {}: {}", path.display(), err))
        })?;
        let timestamp = parse_timestamp(&record.timestamp_utc)?;

        if !record.close.is_finite() || record.close <= 0.0 {
            report.invalid_close += 1;
            report.first_invalid_close.get_or_insert(timestamp);
            continue;
        }

        let bar = Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        };

        match bars.last().map(|last| last.timestamp) {
            Some(prev) if timestamp == prev => {
                report.duplicates += 1;
                report.first_duplicate.get_or_insert(timestamp);
                if let Some(last) = bars.last_mut() {
                    *last = bar;
                }
            }
            Some(prev) if timestamp < prev => {
                report.out_of_order += 1;
                report.first_out_of_order.get_or_insert(timestamp);
            }
            _ => bars.push(bar),
        }
    }

    report.rows = bars.len();
    report.first_timestamp = bars.first().map(|bar| bar.timestamp);
    report.last_timestamp = bars.last().map(|bar| bar.timestamp);
    Ok((bars, report))
}

/// Loads every symbol's CSV. Data-quality findings are logged, not fatal.
pub fn load_bars_for_symbols(
    paths: &BTreeMap<String, String>,
) -> Result<HashMap<String, Vec<Bar>>> {
    let mut bars_by_symbol = HashMap::with_capacity(paths.len());
    for (symbol, path) in paths {
        let (bars, report) = load_csv(Path::new(path), symbol)?;
        if report.is_clean() {
            debug!(symbol = %symbol, rows = report.rows, "loaded OHLCV");
        } else {
            warn!(
                symbol = %symbol,
                rows = report.rows,
                duplicates = report.duplicates,
                out_of_order = report.out_of_order,
                invalid_close = report.invalid_close,
                "OHLCV data quality issues"
            );
        }
        bars_by_symbol.insert(symbol.clone(), bars);
    }
    Ok(bars_by_symbol)
}

fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }

    Err(Error::Data(format!("unsupported timestamp format: {}", value)))
}
