use crate::types::{Position, Side};
use std::collections::BTreeMap;

/// Quantities this close to zero are treated as flat.
const QTY_EPSILON: f64 = 1e-9;

/// Position after applying a signed fill to `existing`, or `None` when the
/// fill flattens it.
///
/// Adding to a position re-weights the average price; reducing it keeps the
/// average; opening from flat or flipping through zero resets the average to
/// the fill price.
pub fn next_position(
    existing: Option<&Position>,
    symbol: &str,
    signed_qty: f64,
    price: f64,
) -> Option<Position> {
    let (old_qty, old_avg) = existing
        .map(|pos| (pos.quantity, pos.avg_price))
        .unwrap_or((0.0, 0.0));
    let new_qty = old_qty + signed_qty;
    if new_qty.abs() <= QTY_EPSILON {
        return None;
    }

    let avg_price = if old_qty == 0.0 || old_qty.signum() != new_qty.signum() {
        price
    } else if old_qty.signum() == signed_qty.signum() {
        (old_qty * old_avg + signed_qty * price) / new_qty
    } else {
        old_avg
    };

    Some(Position {
        symbol: symbol.to_string(),
        quantity: new_qty,
        avg_price,
        unrealized_pnl: None,
    })
}

/// Cash and positions of one venue account.
#[derive(Debug, Default, Clone)]
pub struct Portfolio {
    positions: BTreeMap<String, Position>,
    cash: f64,
    realized_pnl: f64,
}

impl Portfolio {
    pub fn new_with_cash(initial_cash: f64) -> Self {
        Self {
            positions: BTreeMap::new(),
            cash: initial_cash,
            realized_pnl: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Books a fill. Cash moves by `-signed_qty * price`; shorting is allowed.
    pub fn apply_fill(&mut self, symbol: &str, side: Side, quantity: f64, price: f64) {
        let signed_qty = side.signed(quantity);
        let existing = self.positions.get(symbol);

        if let Some(pos) = existing {
            if pos.quantity.signum() != signed_qty.signum() {
                let closed = signed_qty.abs().min(pos.quantity.abs());
                self.realized_pnl += (price - pos.avg_price) * closed * pos.quantity.signum();
            }
        }

        match next_position(existing, symbol, signed_qty, price) {
            Some(pos) => {
                self.positions.insert(symbol.to_string(), pos);
            }
            None => {
                self.positions.remove(symbol);
            }
        }
        self.cash -= signed_qty * price;
    }

    /// Cash plus every position marked at `price_of(symbol)`. Symbols without
    /// a price contribute nothing.
    pub fn equity<F>(&self, price_of: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.cash
            + self
                .positions
                .values()
                .map(|pos| price_of(&pos.symbol).map_or(0.0, |price| pos.quantity * price))
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::{next_position, Portfolio};
    use crate::types::Side;

    #[test]
    fn buying_more_reweights_average_price() {
        let mut portfolio = Portfolio::new_with_cash(100_000.0);
        portfolio.apply_fill("AAPL", Side::Buy, 10.0, 100.0);
        portfolio.apply_fill("AAPL", Side::Buy, 5.0, 120.0);

        let pos = portfolio.position("AAPL").expect("position");
        assert_eq!(pos.quantity, 15.0);
        assert!((pos.avg_price - 106.666_666_67).abs() < 1e-6);
    }

    #[test]
    fn partial_sell_keeps_average_price() {
        let mut portfolio = Portfolio::new_with_cash(100_000.0);
        portfolio.apply_fill("AAPL", Side::Buy, 10.0, 100.0);
        portfolio.apply_fill("AAPL", Side::Sell, 4.0, 130.0);

        let pos = portfolio.position("AAPL").expect("position");
        assert_eq!(pos.quantity, 6.0);
        assert_eq!(pos.avg_price, 100.0);
        assert_eq!(portfolio.realized_pnl(), 120.0);
    }

    #[test]
    fn closing_fill_removes_the_position() {
        let mut portfolio = Portfolio::new_with_cash(100_000.0);
        portfolio.apply_fill("AAPL", Side::Sell, 10.0, 100.0);
        assert_eq!(portfolio.cash(), 101_000.0);
        portfolio.apply_fill("AAPL", Side::Buy, 10.0, 100.0);

        assert!(portfolio.position("AAPL").is_none());
        assert_eq!(portfolio.positions().count(), 0);
        assert_eq!(portfolio.cash(), 100_000.0);
    }

    #[test]
    fn flip_resets_average_to_fill_price() {
        let long = next_position(None, "AAPL", 10.0, 100.0);
        let flipped = next_position(long.as_ref(), "AAPL", -15.0, 90.0).expect("position");
        assert_eq!(flipped.quantity, -5.0);
        assert_eq!(flipped.avg_price, 90.0);
    }

    #[test]
    fn equity_marks_positions_with_known_prices() {
        let mut portfolio = Portfolio::new_with_cash(1_000.0);
        portfolio.apply_fill("AAA", Side::Buy, 2.0, 100.0);
        portfolio.apply_fill("BBB", Side::Sell, 1.0, 50.0);

        let equity = portfolio.equity(|symbol| match symbol {
            "AAA" => Some(110.0),
            "BBB" => Some(40.0),
            _ => None,
        });
        assert_eq!(equity, 850.0 + 220.0 - 40.0);
    }
}
