//! Window statistics used by the spread z-score.

use crate::error::{Error, Result};

pub fn rolling_mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput("rolling_mean"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N).
pub fn rolling_std(values: &[f64]) -> Result<f64> {
    let Some(first) = values.first() else {
        return Err(Error::EmptyInput("rolling_std"));
    };
    // A flat window must give exactly zero, not rounding noise from the mean.
    if values.iter().all(|value| value == first) {
        return Ok(0.0);
    }

    let mean = rolling_mean(values)?;
    let var = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Ok(var.sqrt())
}

/// Standard score of `value`. A zero `std` yields the neutral score 0.0.
pub fn zscore(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        return 0.0;
    }
    (value - mean) / std
}
