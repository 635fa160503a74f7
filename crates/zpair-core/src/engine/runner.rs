use crate::config::RunConfig;
use crate::error::Result;
use crate::strategy::{PairState, PairsMeanReversion, Signal, Strategy};
use crate::venue::Venue;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use tracing::{info, info_span, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Signal produced for every pair that completed the cycle.
    pub signals: Vec<(String, Signal)>,
    pub failures: usize,
}

/// Polls every configured pair against one venue.
///
/// Pairs are processed sequentially in config order. Each pair's state lives
/// in the runner's registry, keyed by pair name.
pub struct TradingRunner<V: Venue> {
    venue: V,
    strategies: Vec<PairsMeanReversion>,
    states: HashMap<String, PairState>,
    poll_interval: Duration,
    cycles: u64,
}

impl<V: Venue> TradingRunner<V> {
    pub fn new(config: &RunConfig, venue: V) -> Self {
        let strategies: Vec<PairsMeanReversion> = config
            .pairs
            .iter()
            .cloned()
            .map(PairsMeanReversion::new)
            .collect();
        let states = config
            .pairs
            .iter()
            .map(|pair| (pair.name.clone(), PairState::default()))
            .collect();
        Self {
            venue,
            strategies,
            states,
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            cycles: 0,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn venue(&self) -> &V {
        &self.venue
    }

    pub fn venue_mut(&mut self) -> &mut V {
        &mut self.venue
    }

    pub fn state(&self, pair: &str) -> Option<&PairState> {
        self.states.get(pair)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// One signal/execute pass over every pair. Per-pair failures are logged
    /// and counted, never propagated.
    pub fn run_once(&mut self) -> CycleReport {
        self.cycles += 1;
        let _span = info_span!("runner_cycle", cycle = self.cycles).entered();

        let mut report = CycleReport::default();
        for strategy in &self.strategies {
            let name = strategy.config().name.clone();
            let state = self.states.entry(name.clone()).or_default();
            match process_pair(strategy, &mut self.venue, state) {
                Ok(signal) => report.signals.push((name, signal)),
                Err(err) => {
                    report.failures += 1;
                    metrics::counter!("zpair.runner.pair_failures").increment(1);
                    warn!(pair = %name, error = %err, "pair cycle failed");
                }
            }
        }
        report
    }

    /// Runs cycles until `max_cycles` is reached or `before_cycle` returns
    /// false. `before_cycle` gets the venue first, to feed prices or bars.
    /// The poll interval is slept only between cycles, never after the last
    /// allowed one. Returns the number of cycles run.
    pub fn run_cycles<F>(&mut self, max_cycles: Option<u64>, mut before_cycle: F) -> u64
    where
        F: FnMut(&mut V) -> bool,
    {
        let limit_reached = |completed: u64| max_cycles.is_some_and(|max| completed >= max);
        let mut completed = 0u64;
        loop {
            if limit_reached(completed) {
                break;
            }
            if !before_cycle(&mut self.venue) {
                break;
            }
            let report = self.run_once();
            completed += 1;
            info!(
                cycle = self.cycles,
                signals = report.signals.len(),
                failures = report.failures,
                "cycle complete"
            );
            if limit_reached(completed) {
                break;
            }
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }
        completed
    }

    /// Polls forever at the configured interval. Only process termination
    /// stops it.
    pub fn run_forever(&mut self) {
        self.run_cycles(None, |_| true);
    }
}

fn process_pair(
    strategy: &PairsMeanReversion,
    venue: &mut dyn Venue,
    state: &mut PairState,
) -> Result<Signal> {
    let signal = strategy.generate_signal(venue, state)?;
    if signal != Signal::Hold {
        strategy.execute(venue, signal, state)?;
    }
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::TradingRunner;
    use crate::config::{PairConfig, RiskConfig, RunConfig, RunMode};
    use crate::strategy::Signal;
    use crate::types::Bar;
    use crate::venue::{PaperVenue, Venue};
    use std::time::{Duration, Instant};

    fn pair(name: &str, long: &str, short: &str) -> PairConfig {
        PairConfig {
            name: name.to_string(),
            symbol_long: long.to_string(),
            symbol_short: short.to_string(),
            lookback_bars: 3,
            entry_zscore: 1.0,
            exit_zscore: 0.5,
            max_holding_bars: 5,
            notional_per_leg: 1_000.0,
        }
    }

    fn config(pairs: Vec<PairConfig>) -> RunConfig {
        RunConfig {
            mode: RunMode::Paper,
            poll_interval_seconds: 60,
            starting_cash: 100_000.0,
            pairs,
            risk: RiskConfig {
                max_total_notional: 50_000.0,
                max_pairs_open: 2,
                max_daily_loss: 1_000.0,
                max_position_per_symbol: 10_000.0,
            },
            data: None,
            paper: None,
        }
    }

    fn seeded_venue() -> PaperVenue {
        let mut venue = PaperVenue::default();
        for (idx, (long, short)) in [(11.0, 10.0), (12.0, 10.0), (13.0, 10.0)]
            .into_iter()
            .enumerate()
        {
            venue.push_bar(Bar::flat("AAA", idx as i64, long));
            venue.push_bar(Bar::flat("BBB", idx as i64, short));
        }
        venue.set_price("AAA", 110.0);
        venue.set_price("BBB", 90.0);
        venue
    }

    #[test]
    fn run_once_enters_then_holds() {
        let config = config(vec![pair("AAA_BBB", "AAA", "BBB")]);
        let mut runner = TradingRunner::new(&config, seeded_venue());

        let report = runner.run_once();
        assert_eq!(report.failures, 0);
        assert_eq!(
            report.signals,
            vec![("AAA_BBB".to_string(), Signal::EnterShortLong)]
        );
        assert!(runner.state("AAA_BBB").expect("state").is_open);

        let report = runner.run_once();
        assert_eq!(report.signals[0].1, Signal::Hold);
        let state = runner.state("AAA_BBB").expect("state");
        assert!(state.is_open);
        assert_eq!(state.bars_held, 1);
        assert!(runner.venue().position("AAA").expect("short leg").quantity < 0.0);
        assert!(runner.venue().position("BBB").expect("long leg").quantity > 0.0);
    }

    #[test]
    fn failing_pair_does_not_block_others() {
        let config = config(vec![
            pair("MISSING", "XXX", "YYY"),
            pair("AAA_BBB", "AAA", "BBB"),
        ]);
        let mut runner = TradingRunner::new(&config, seeded_venue());

        let report = runner.run_once();
        assert_eq!(report.failures, 1);
        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].0, "AAA_BBB");
        assert_eq!(runner.state("MISSING"), Some(&Default::default()));
    }

    #[test]
    fn run_cycles_stops_on_feed_exhaustion_or_limit() {
        let config = config(vec![pair("AAA_BBB", "AAA", "BBB")]);
        let mut runner =
            TradingRunner::new(&config, PaperVenue::default()).with_poll_interval(Duration::ZERO);

        let mut closes = [10.0, 10.0, 10.0, 10.0].into_iter().enumerate();
        let ran = runner.run_cycles(None, |venue| match closes.next() {
            Some((ts, close)) => {
                venue.push_bar(Bar::flat("AAA", ts as i64, close));
                venue.push_bar(Bar::flat("BBB", ts as i64, close));
                true
            }
            None => false,
        });
        assert_eq!(ran, 4);
        assert_eq!(runner.cycles(), 4);

        let ran = runner.run_cycles(Some(2), |_| true);
        assert_eq!(ran, 2);
        assert_eq!(runner.cycles(), 6);
    }

    #[test]
    fn bounded_run_does_not_sleep_after_last_cycle() {
        let config = config(vec![pair("AAA_BBB", "AAA", "BBB")]);
        let mut runner = TradingRunner::new(&config, seeded_venue())
            .with_poll_interval(Duration::from_secs(5));

        let started = Instant::now();
        assert_eq!(runner.run_cycles(Some(1), |_| true), 1);
        assert_eq!(runner.run_cycles(Some(0), |_| true), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.cycles(), 1);
    }
}
