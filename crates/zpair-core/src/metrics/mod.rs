use crate::types::EquityPoint;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub bars_processed: usize,
    pub starting_equity: f64,
    pub ending_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
}

/// Running equity curve with peak-to-trough drawdown tracking.
///
/// The starting equity seeds the running peak, so a loss on the very first
/// bar already counts as drawdown.
#[derive(Debug, Clone)]
pub struct MetricsState {
    starting_equity: f64,
    equity_curve: Vec<EquityPoint>,
    peak_equity: f64,
    max_drawdown: f64,
}

impl MetricsState {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            starting_equity,
            equity_curve: Vec::new(),
            peak_equity: starting_equity,
            max_drawdown: 0.0,
        }
    }

    pub fn record_equity(&mut self, point: EquityPoint) {
        if point.equity > self.peak_equity {
            self.peak_equity = point.equity;
        } else if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - point.equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        self.equity_curve.push(point);
    }

    pub fn ending_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.starting_equity, |point| point.equity)
    }

    /// Largest drawdown seen so far as a percentage of the running peak.
    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown * 100.0
    }

    pub fn total_return_pct(&self) -> f64 {
        if self.starting_equity == 0.0 {
            return 0.0;
        }
        (self.ending_equity() / self.starting_equity - 1.0) * 100.0
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            bars_processed: self.equity_curve.len(),
            starting_equity: self.starting_equity,
            ending_equity: self.ending_equity(),
            total_return_pct: self.total_return_pct(),
            max_drawdown_pct: self.max_drawdown_pct(),
        }
    }

    pub fn into_parts(self) -> (Vec<EquityPoint>, MetricsSummary) {
        let summary = self.summary();
        (self.equity_curve, summary)
    }
}

/// Peak-to-trough drawdown of a raw equity series, in percent of the
/// running peak. Empty input has no drawdown.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let Some((first, rest)) = equity.split_first() else {
        return 0.0;
    };
    let mut peak = *first;
    let mut max_drawdown = 0.0f64;
    for value in rest {
        if *value > peak {
            peak = *value;
        } else if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - value) / peak);
        }
    }
    max_drawdown * 100.0
}
