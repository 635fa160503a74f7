pub mod ohlcv;

pub use ohlcv::{load_bars_for_symbols, load_csv, DataQualityReport};
