pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod report;
pub mod stats;
pub mod strategy;
pub mod types;
pub mod venue;

pub use engine::backtest;
pub use engine::runner;
pub use error::{Error, Result};

pub fn engine_name() -> &'static str {
    "zpair"
}
