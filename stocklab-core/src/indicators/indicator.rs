//! Indicator trait and the named-series container the pipeline fills per ticker.
//!
//! Indicators are pure functions: one ordered numeric series in, one series of
//! the same length out. Undefined positions are `f64::NAN`.

use std::collections::HashMap;

/// Trait for indicators over a single numeric series.
///
/// # Look-ahead contamination guard
/// No output value at position t may depend on input at position t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading positions that are undefined on a gap-free series.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series.
    ///
    /// Returns a `Vec<f64>` of the same length as `values`.
    fn compute(&self, values: &[f64]) -> Vec<f64>;
}

/// Container for computed indicator series of one ticker.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute `indicator` over `values` and store it under the indicator's name.
    pub fn compute_into(&mut self, indicator: &dyn Indicator, values: &[f64]) {
        self.insert(indicator.name(), indicator.compute(values));
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Get the indicator value at a position.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(index).copied())
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
