//! Execution venues: where prices come from and where orders fill.
//!
//! Both variants fill market orders immediately and fully, so nothing stays
//! open after `place_order` returns. Venues are not thread-safe; callers
//! serialize access.

pub mod backtest;
pub mod paper;

pub use backtest::BacktestVenue;
pub use paper::PaperVenue;

use crate::error::Result;
use crate::types::{Bar, Order, OrderRequest, Position, Quote};

pub trait Venue {
    fn name(&self) -> &str;

    /// The most recent `limit` bars for `symbol`, oldest first. Never
    /// truncates: fewer than `limit` bars is an `InsufficientHistory` error.
    fn historical_series(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>>;

    fn latest_bar(&self, symbol: &str) -> Result<Bar>;

    fn quote(&self, symbol: &str) -> Result<Quote>;

    fn position(&self, symbol: &str) -> Option<Position>;

    fn positions(&self) -> Vec<Position>;

    /// Cash balance of the account.
    fn cash(&self) -> f64;

    /// Fills the order and books it against cash and positions in one step.
    fn place_order(&mut self, request: OrderRequest) -> Result<Order>;

    fn cancel_order(&mut self, order_id: &str) -> Result<()>;

    fn open_orders(&self) -> Vec<Order>;

    fn order_history(&self) -> Vec<Order>;
}
