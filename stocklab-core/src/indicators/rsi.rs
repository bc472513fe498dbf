//! Relative Strength Index (RSI).
//!
//! Uses simple rolling means of gains and losses with a minimum of one period,
//! so the oscillator is defined from the first position onward.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: 0.
//!
//! Edge cases: avg_loss == 0 and avg_gain > 0 → 100; no movement at all → 0.
//! Position 0 has no delta and counts as a zero gain and a zero loss, as does
//! any delta touching a missing value.

use super::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Rsi {
    window: usize,
    name: String,
}

impl Rsi {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RSI window must be >= 1");
        Self {
            window,
            name: format!("rsi_{window}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        rsi_of_series(values, self.window)
    }
}

/// Compute RSI values from a raw f64 slice.
pub fn rsi_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window == 0 {
        return vec![f64::NAN; n];
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = values[i] - values[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else if delta < 0.0 {
            losses[i] = -delta;
        }
    }

    (0..n)
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let count = (i + 1 - start) as f64;
            // Summing the window directly keeps an all-zero window at exactly zero.
            let avg_gain = gains[start..=i].iter().sum::<f64>() / count;
            let avg_loss = losses[start..=i].iter().sum::<f64>() / count;
            compute_rsi(avg_gain, avg_loss)
        })
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
