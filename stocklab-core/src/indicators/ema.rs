//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * value[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (window + 1).
//! Seed: EMA[0] = value[0]; no warm-up window.
//! Lookback: 0.
//!
//! Leading missing values stay undefined until the first observed value seeds
//! the recursion. A missing value after the seed carries the previous EMA.

use super::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    window: usize,
    name: String,
}

impl Ema {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "EMA window must be >= 1");
        Self {
            window,
            name: format!("ema_{window}"),
        }
    }

    /// Smoothing factor for this window.
    pub fn alpha(&self) -> f64 {
        smoothing_factor(self.window)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        ema_of_series(values, self.window)
    }
}

/// alpha = 2 / (window + 1)
pub fn smoothing_factor(window: usize) -> f64 {
    2.0 / (window as f64 + 1.0)
}

/// Compute EMA values from a raw f64 slice.
pub fn ema_of_series(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 {
        return result;
    }

    let alpha = smoothing_factor(window);
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        let ema = match (prev, v.is_nan()) {
            (None, true) => continue,
            (None, false) => v,
            (Some(p), true) => p,
            (Some(p), false) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = ema;
        prev = Some(ema);
    }

    result
}
