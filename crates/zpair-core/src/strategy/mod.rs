//! Pairs mean-reversion on the z-score of the close-price spread.

use crate::config::PairConfig;
use crate::error::{Error, Result};
use crate::stats::{rolling_mean, rolling_std, zscore};
use crate::types::{Order, OrderRequest, Position, Side};
use crate::venue::Venue;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Long the long leg, short the short leg.
    EnterLongShort,
    /// Short the long leg, long the short leg.
    EnterShortLong,
    Exit,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::EnterLongShort => "enter_long_short",
            Signal::EnterShortLong => "enter_short_long",
            Signal::Exit => "exit",
            Signal::Hold => "hold",
        };
        f.write_str(label)
    }
}

/// Runtime state of one pair. Owned by whoever drives the strategy and
/// mutated only through [`Strategy::generate_signal`] and [`Strategy::execute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairState {
    pub is_open: bool,
    pub entry_zscore: Option<f64>,
    pub bars_held: u32,
    pub last_zscore: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadSnapshot {
    pub spread: f64,
    pub mean: f64,
    pub std: f64,
    pub zscore: f64,
}

pub trait Strategy {
    fn name(&self) -> &str;

    fn generate_signal(&self, venue: &dyn Venue, state: &mut PairState) -> Result<Signal>;

    /// Places the orders for `signal` and returns them. `Hold` places nothing.
    fn execute(
        &self,
        venue: &mut dyn Venue,
        signal: Signal,
        state: &mut PairState,
    ) -> Result<Vec<Order>>;
}

#[derive(Debug, Clone)]
pub struct PairsMeanReversion {
    config: PairConfig,
}

impl PairsMeanReversion {
    pub fn new(config: PairConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    /// Spread of the latest closes, scored against the whole lookback window
    /// including the latest point itself.
    pub fn compute_spread_and_zscore(&self, venue: &dyn Venue) -> Result<SpreadSnapshot> {
        let lookback = self.config.lookback_bars;
        let closes_long = closes(venue, &self.config.symbol_long, lookback)?;
        let closes_short = closes(venue, &self.config.symbol_short, lookback)?;
        if closes_long.len() != closes_short.len() {
            return Err(Error::SeriesLengthMismatch {
                long: closes_long.len(),
                short: closes_short.len(),
            });
        }

        let spreads: Vec<f64> = closes_long
            .iter()
            .zip(&closes_short)
            .map(|(long, short)| long - short)
            .collect();
        let spread = *spreads.last().ok_or(Error::EmptyInput("spread series"))?;
        let mean = rolling_mean(&spreads)?;
        let std = rolling_std(&spreads)?;

        Ok(SpreadSnapshot {
            spread,
            mean,
            std,
            zscore: zscore(spread, mean, std),
        })
    }

    fn leg_quantity(&self, venue: &dyn Venue, symbol: &str) -> Result<f64> {
        let quote = venue.quote(symbol)?;
        if quote.last == 0.0 {
            return Err(Error::ZeroPrice(symbol.to_string()));
        }
        Ok(self.config.notional_per_leg / quote.last)
    }

    fn enter(&self, venue: &mut dyn Venue, long_leg_side: Side) -> Result<Vec<Order>> {
        let qty_long = self.leg_quantity(venue, &self.config.symbol_long)?;
        let qty_short = self.leg_quantity(venue, &self.config.symbol_short)?;

        let long_order = venue.place_order(OrderRequest::market(
            &self.config.symbol_long,
            long_leg_side,
            qty_long,
        ))?;
        let short_order = venue.place_order(OrderRequest::market(
            &self.config.symbol_short,
            long_leg_side.opposite(),
            qty_short,
        ))?;
        Ok(vec![long_order, short_order])
    }

    fn close_position(venue: &mut dyn Venue, position: &Position) -> Result<Order> {
        let side = if position.quantity < 0.0 {
            Side::Buy
        } else {
            Side::Sell
        };
        venue.place_order(OrderRequest::market(
            &position.symbol,
            side,
            position.quantity.abs(),
        ))
    }
}

fn closes(venue: &dyn Venue, symbol: &str, lookback: usize) -> Result<Vec<f64>> {
    let bars = venue.historical_series(symbol, lookback)?;
    if bars.len() < lookback {
        return Err(Error::InsufficientHistory {
            symbol: symbol.to_string(),
            required: lookback,
            available: bars.len(),
        });
    }
    Ok(bars.iter().map(|bar| bar.close).collect())
}

impl Strategy for PairsMeanReversion {
    fn name(&self) -> &str {
        "pairs_mean_reversion"
    }

    fn generate_signal(&self, venue: &dyn Venue, state: &mut PairState) -> Result<Signal> {
        let snapshot = self.compute_spread_and_zscore(venue)?;
        let z = snapshot.zscore;
        state.last_zscore = Some(z);
        debug!(
            pair = %self.config.name,
            spread = snapshot.spread,
            mean = snapshot.mean,
            std = snapshot.std,
            zscore = z,
            "spread computed"
        );

        let signal = if state.is_open {
            state.bars_held += 1;
            if z.abs() < self.config.exit_zscore || state.bars_held >= self.config.max_holding_bars
            {
                Signal::Exit
            } else {
                Signal::Hold
            }
        } else if z > self.config.entry_zscore {
            Signal::EnterShortLong
        } else if z < -self.config.entry_zscore {
            Signal::EnterLongShort
        } else {
            Signal::Hold
        };
        Ok(signal)
    }

    fn execute(
        &self,
        venue: &mut dyn Venue,
        signal: Signal,
        state: &mut PairState,
    ) -> Result<Vec<Order>> {
        let orders = match signal {
            Signal::Hold => return Ok(Vec::new()),
            Signal::EnterLongShort | Signal::EnterShortLong => {
                let long_leg_side = if signal == Signal::EnterLongShort {
                    Side::Buy
                } else {
                    Side::Sell
                };
                let orders = self.enter(venue, long_leg_side)?;
                state.is_open = true;
                state.entry_zscore = state.last_zscore;
                state.bars_held = 0;
                orders
            }
            Signal::Exit => {
                let mut orders = Vec::with_capacity(2);
                for symbol in [&self.config.symbol_long, &self.config.symbol_short] {
                    if let Some(position) = venue.position(symbol) {
                        orders.push(Self::close_position(venue, &position)?);
                    }
                }
                state.is_open = false;
                state.entry_zscore = None;
                state.bars_held = 0;
                orders
            }
        };

        info!(
            pair = %self.config.name,
            signal = %signal,
            zscore = state.last_zscore,
            orders = orders.len(),
            "signal executed"
        );
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::{PairState, PairsMeanReversion, Signal, Strategy};
    use crate::config::PairConfig;
    use crate::error::Error;
    use crate::types::Bar;
    use crate::venue::{PaperVenue, Venue};

    fn pair_config() -> PairConfig {
        PairConfig {
            name: "TEST".to_string(),
            symbol_long: "AAA".to_string(),
            symbol_short: "BBB".to_string(),
            lookback_bars: 3,
            entry_zscore: 1.0,
            exit_zscore: 0.5,
            max_holding_bars: 5,
            notional_per_leg: 1000.0,
        }
    }

    fn venue_with(long: &[f64], short: &[f64]) -> PaperVenue {
        let mut venue = PaperVenue::default();
        for (idx, (l, s)) in long.iter().zip(short).enumerate() {
            venue.push_bar(Bar::flat("AAA", idx as i64, *l));
            venue.push_bar(Bar::flat("BBB", idx as i64, *s));
        }
        venue
    }

    #[test]
    fn in_sample_zscore_of_rising_spread() {
        let strategy = PairsMeanReversion::new(pair_config());
        let venue = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);

        let snapshot = strategy.compute_spread_and_zscore(&venue).expect("snapshot");
        assert_eq!(snapshot.spread, 3.0);
        assert_eq!(snapshot.mean, 2.0);
        assert!(snapshot.zscore > 1.0);
    }

    #[test]
    fn flat_state_signals_follow_zscore_sign() {
        let strategy = PairsMeanReversion::new(pair_config());
        let mut state = PairState::default();

        let rich = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);
        assert_eq!(
            strategy.generate_signal(&rich, &mut state).unwrap(),
            Signal::EnterShortLong
        );

        let cheap = venue_with(&[9.0, 8.5, 7.0], &[10.0, 10.0, 10.0]);
        assert_eq!(
            strategy.generate_signal(&cheap, &mut state).unwrap(),
            Signal::EnterLongShort
        );

        let flat = venue_with(&[10.0, 10.0, 10.0], &[10.0, 10.0, 10.0]);
        assert_eq!(
            strategy.generate_signal(&flat, &mut state).unwrap(),
            Signal::Hold
        );
        assert_eq!(state.last_zscore, Some(0.0));
    }

    #[test]
    fn holding_period_forces_exit() {
        let strategy = PairsMeanReversion::new(pair_config());
        let venue = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);
        let mut state = PairState {
            is_open: true,
            bars_held: 4,
            ..PairState::default()
        };

        assert_eq!(
            strategy.generate_signal(&venue, &mut state).unwrap(),
            Signal::Exit
        );
        assert_eq!(state.bars_held, 5);
    }

    #[test]
    fn open_state_holds_while_spread_stays_wide() {
        let strategy = PairsMeanReversion::new(pair_config());
        let venue = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);
        let mut state = PairState {
            is_open: true,
            ..PairState::default()
        };

        assert_eq!(
            strategy.generate_signal(&venue, &mut state).unwrap(),
            Signal::Hold
        );
        assert_eq!(state.bars_held, 1);
    }

    #[test]
    fn short_history_is_an_error() {
        let mut config = pair_config();
        config.lookback_bars = 5;
        let strategy = PairsMeanReversion::new(config);
        let venue = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);
        let mut state = PairState::default();

        let err = strategy
            .generate_signal(&venue, &mut state)
            .expect_err("insufficient history");
        assert!(matches!(err, Error::InsufficientHistory { required: 5, .. }));
        assert_eq!(state.last_zscore, None);
    }

    #[test]
    fn enter_then_exit_round_trip() {
        let strategy = PairsMeanReversion::new(pair_config());
        let mut venue = venue_with(&[12.0, 11.0, 9.0], &[10.0, 10.0, 10.0]);
        venue.set_price("AAA", 100.0);
        venue.set_price("BBB", 50.0);
        let mut state = PairState::default();

        let signal = strategy.generate_signal(&venue, &mut state).unwrap();
        assert_eq!(signal, Signal::EnterLongShort);
        let orders = strategy.execute(&mut venue, signal, &mut state).unwrap();
        assert_eq!(orders.len(), 2);
        assert!(state.is_open);
        assert_eq!(state.entry_zscore, state.last_zscore);

        let long = venue.position("AAA").expect("long leg");
        let short = venue.position("BBB").expect("short leg");
        assert_eq!(long.quantity, 10.0);
        assert_eq!(short.quantity, -20.0);

        strategy
            .execute(&mut venue, Signal::Exit, &mut state)
            .unwrap();
        assert!(venue.position("AAA").is_none());
        assert!(venue.position("BBB").is_none());
        assert!(!state.is_open);
        assert_eq!(state.entry_zscore, None);
        assert_eq!(venue.cash(), 100_000.0);
    }

    #[test]
    fn zero_quote_blocks_entry_before_any_order() {
        let strategy = PairsMeanReversion::new(pair_config());
        let mut venue = venue_with(&[11.0, 12.0, 13.0], &[10.0, 10.0, 10.0]);
        venue.set_price("AAA", 100.0);
        venue.set_price("BBB", 0.0);
        let mut state = PairState::default();

        let err = strategy
            .execute(&mut venue, Signal::EnterShortLong, &mut state)
            .expect_err("zero price");
        assert!(matches!(err, Error::ZeroPrice(symbol) if symbol == "BBB"));
        assert!(venue.order_history().is_empty());
        assert!(!state.is_open);
    }

    #[test]
    fn exit_skips_missing_legs() {
        let strategy = PairsMeanReversion::new(pair_config());
        let mut venue = PaperVenue::default();
        let mut state = PairState {
            is_open: true,
            bars_held: 2,
            entry_zscore: Some(1.5),
            last_zscore: Some(0.1),
        };

        let orders = strategy
            .execute(&mut venue, Signal::Exit, &mut state)
            .unwrap();
        assert!(orders.is_empty());
        assert_eq!(state, PairState {
            last_zscore: Some(0.1),
            ..PairState::default()
        });
    }
}
