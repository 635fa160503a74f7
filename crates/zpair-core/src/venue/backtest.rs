use super::Venue;
use crate::error::{Error, Result};
use crate::portfolio::Portfolio;
use crate::types::{Bar, Order, OrderRequest, OrderStatus, OrderType, Position, Quote};
use std::collections::HashMap;
use tracing::debug;

/// Replays pre-loaded bars, one step at a time, for every symbol in lockstep.
///
/// Orders fill at the current bar's close, or at the limit price when one is
/// given. There is no slippage model.
#[derive(Debug)]
pub struct BacktestVenue {
    bars_by_symbol: HashMap<String, Vec<Bar>>,
    portfolio: Portfolio,
    current_index: Option<usize>,
    max_bars: usize,
    orders: Vec<Order>,
}

impl BacktestVenue {
    pub fn new(bars_by_symbol: HashMap<String, Vec<Bar>>, starting_cash: f64) -> Result<Self> {
        if bars_by_symbol.is_empty() {
            return Err(Error::Data(
                "no bar data provided to backtest venue".to_string(),
            ));
        }
        let max_bars = bars_by_symbol.values().map(Vec::len).min().unwrap_or(0);
        if max_bars == 0 {
            return Err(Error::Data(
                "bar data is empty for provided symbols".to_string(),
            ));
        }

        Ok(Self {
            bars_by_symbol,
            portfolio: Portfolio::new_with_cash(starting_cash),
            current_index: None,
            max_bars,
            orders: Vec::new(),
        })
    }

    /// Advances every symbol to its next bar and returns the new index.
    pub fn step(&mut self) -> Result<usize> {
        let next = self.current_index.map_or(0, |idx| idx + 1);
        if next >= self.max_bars {
            return Err(Error::OutOfData);
        }
        self.current_index = Some(next);
        Ok(next)
    }

    /// Number of replayable steps: the length of the shortest series.
    pub fn len(&self) -> usize {
        self.max_bars
    }

    pub fn is_empty(&self) -> bool {
        self.max_bars == 0
    }

    /// Cash plus every position marked at its symbol's current close.
    pub fn equity(&self) -> f64 {
        self.portfolio
            .equity(|symbol| self.latest_bar(symbol).ok().map(|bar| bar.close))
    }

    fn started_index(&self) -> Result<usize> {
        self.current_index.ok_or(Error::NotStarted)
    }

    fn series(&self, symbol: &str) -> Result<&[Bar]> {
        self.bars_by_symbol
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingSymbolData(vec![symbol.to_string()]))
    }

    fn mark(&self, position: &Position) -> Position {
        match self.latest_bar(&position.symbol) {
            Ok(bar) => position.marked(bar.close),
            Err(_) => position.clone(),
        }
    }
}

impl Venue for BacktestVenue {
    fn name(&self) -> &str {
        "backtest"
    }

    fn historical_series(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        let end = self.started_index()? + 1;
        let series = self.series(symbol)?;
        if end < limit {
            return Err(Error::InsufficientHistory {
                symbol: symbol.to_string(),
                required: limit,
                available: end,
            });
        }
        Ok(series[end - limit..end].to_vec())
    }

    fn latest_bar(&self, symbol: &str) -> Result<Bar> {
        let index = self.started_index()?;
        self.series(symbol)?
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Data(format!("bar index {index} out of range for {symbol}")))
    }

    fn quote(&self, symbol: &str) -> Result<Quote> {
        let bar = self.latest_bar(symbol)?;
        Ok(Quote {
            symbol: symbol.to_string(),
            bid: None,
            ask: None,
            last: bar.close,
            timestamp: bar.timestamp,
        })
    }

    fn position(&self, symbol: &str) -> Option<Position> {
        self.portfolio.position(symbol).map(|pos| self.mark(pos))
    }

    fn positions(&self) -> Vec<Position> {
        self.portfolio.positions().map(|pos| self.mark(pos)).collect()
    }

    fn cash(&self) -> f64 {
        self.portfolio.cash()
    }

    fn place_order(&mut self, request: OrderRequest) -> Result<Order> {
        if !request.quantity.is_finite() || request.quantity <= 0.0 {
            return Err(Error::InvalidQuantity(request.quantity));
        }
        let bar = self.latest_bar(&request.symbol)?;
        let fill_price = match (request.order_type, request.limit_price) {
            (OrderType::Limit, Some(limit_price)) => limit_price,
            _ => bar.close,
        };

        self.portfolio
            .apply_fill(&request.symbol, request.side, request.quantity, fill_price);

        let order = Order {
            id: format!("order-{}", self.orders.len() + 1),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: Some(fill_price),
            timestamp: bar.timestamp,
            status: OrderStatus::Filled,
        };
        self.orders.push(order.clone());

        metrics::counter!("zpair.orders.filled", "venue" => "backtest").increment(1);
        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            qty = order.quantity,
            price = fill_price,
            timestamp = bar.timestamp,
            "backtest order filled"
        );
        Ok(order)
    }

    fn cancel_order(&mut self, order_id: &str) -> Result<()> {
        let order = self
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;
        order.canceled().map(|_| ())
    }

    fn open_orders(&self) -> Vec<Order> {
        Vec::new()
    }

    fn order_history(&self) -> Vec<Order> {
        self.orders.clone()
    }
}
