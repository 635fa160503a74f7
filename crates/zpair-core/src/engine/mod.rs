//! Drivers that feed bars and polls through the strategy.

pub mod backtest;
pub mod runner;

pub use backtest::{run_pairs_backtest, BacktestResult};
pub use runner::{CycleReport, TradingRunner};
