use super::Venue;
use crate::error::{Error, Result};
use crate::portfolio::Portfolio;
use crate::types::{Bar, Order, OrderRequest, OrderStatus, OrderType, Position, Quote};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tracing::info;

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;
const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

pub type PriceFeed = Box<dyn Fn(&str) -> Option<f64>>;

/// In-memory venue that fills market orders at the last known price.
///
/// Prices come from the injected feed when one is set, otherwise from the
/// table maintained by [`PaperVenue::set_price`] and [`PaperVenue::push_bar`].
/// Only `push_bar` extends the bar history used for lookback windows;
/// `set_price` moves the reference price that `quote` and `latest_bar` report.
pub struct PaperVenue {
    portfolio: Portfolio,
    price_feed: Option<PriceFeed>,
    last_price: HashMap<String, f64>,
    history: HashMap<String, VecDeque<Bar>>,
    history_capacity: usize,
    orders: Vec<Order>,
    next_order_id: u64,
}

impl PaperVenue {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            portfolio: Portfolio::new_with_cash(starting_cash),
            price_feed: None,
            last_price: HashMap::new(),
            history: HashMap::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            orders: Vec::new(),
            next_order_id: 1,
        }
    }

    pub fn with_price_feed(mut self, feed: impl Fn(&str) -> Option<f64> + 'static) -> Self {
        self.price_feed = Some(Box::new(feed));
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    pub fn set_price(&mut self, symbol: &str, price: f64) {
        self.last_price.insert(symbol.to_string(), price);
    }

    /// Appends a bar to the symbol's history and moves its price to the close.
    pub fn push_bar(&mut self, bar: Bar) {
        self.last_price.insert(bar.symbol.clone(), bar.close);
        let series = self.history.entry(bar.symbol.clone()).or_default();
        series.push_back(bar);
        while series.len() > self.history_capacity {
            series.pop_front();
        }
    }

    pub fn realized_pnl(&self) -> f64 {
        self.portfolio.realized_pnl()
    }

    fn resolve_price(&self, symbol: &str) -> Result<f64> {
        let price = match &self.price_feed {
            Some(feed) => feed(symbol),
            None => self.last_price.get(symbol).copied(),
        };
        price.ok_or_else(|| Error::PriceUnavailable(symbol.to_string()))
    }

    fn mark(&self, position: &Position) -> Position {
        match self.resolve_price(&position.symbol) {
            Ok(price) => position.marked(price),
            Err(_) => position.clone(),
        }
    }
}

impl Default for PaperVenue {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CASH)
    }
}

impl Venue for PaperVenue {
    fn name(&self) -> &str {
        "paper"
    }

    fn historical_series(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        let series = self.history.get(symbol);
        let available = series.map_or(0, VecDeque::len);
        if available < limit {
            return Err(Error::InsufficientHistory {
                symbol: symbol.to_string(),
                required: limit,
                available,
            });
        }
        Ok(series
            .map(|bars| bars.iter().skip(available - limit).cloned().collect())
            .unwrap_or_default())
    }

    /// The last pushed bar, unless the reference price has moved off its
    /// close since; then a flat bar at the price `quote` would report.
    fn latest_bar(&self, symbol: &str) -> Result<Bar> {
        let last = self.history.get(symbol).and_then(VecDeque::back);
        match (last, self.resolve_price(symbol)) {
            (Some(bar), Ok(price)) if price != bar.close => {
                Ok(Bar::flat(symbol, Utc::now().timestamp(), price))
            }
            (Some(bar), _) => Ok(bar.clone()),
            (None, price) => Ok(Bar::flat(symbol, Utc::now().timestamp(), price?)),
        }
    }

    fn quote(&self, symbol: &str) -> Result<Quote> {
        let price = self.resolve_price(symbol)?;
        Ok(Quote {
            symbol: symbol.to_string(),
            bid: None,
            ask: None,
            last: price,
            timestamp: Utc::now().timestamp(),
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
        if request.order_type == OrderType::Limit {
            return Err(Error::NotSupported(
                "limit orders are not supported by the paper venue".to_string(),
            ));
        }
        if !request.quantity.is_finite() || request.quantity <= 0.0 {
            return Err(Error::InvalidQuantity(request.quantity));
        }

        let price = self.resolve_price(&request.symbol)?;
        self.portfolio
            .apply_fill(&request.symbol, request.side, request.quantity, price);

        let order = Order {
            id: format!("paper-{}", self.next_order_id),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: Some(price),
            timestamp: Utc::now().timestamp(),
            status: OrderStatus::Filled,
        };
        self.next_order_id += 1;
        self.orders.push(order.clone());

        metrics::counter!("zpair.orders.filled", "venue" => "paper").increment(1);
        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            qty = order.quantity,
            price,
            cash = self.portfolio.cash(),
            "paper order filled"
        );
        Ok(order)
    }

    fn cancel_order(&mut self, order_id: &str) -> Result<()> {
        let order = self
            .orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;
        *order = order.canceled()?;
        Ok(())
    }

    fn open_orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|order| order.is_open())
            .cloned()
            .collect()
    }

    fn order_history(&self) -> Vec<Order> {
        self.orders.clone()
    }
}
