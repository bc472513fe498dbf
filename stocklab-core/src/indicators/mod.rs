//! Indicator implementations over a single numeric series.
//!
//! All indicators implement the `Indicator` trait. The pipeline computes them
//! once per ticker over the cleaned close series and collects the outputs in
//! `IndicatorValues`.
//!
//! Bollinger Bands are exposed as separate named instances per band, keeping
//! the single-series `Indicator` trait unchanged.

pub mod bollinger;
pub mod ema;
pub mod indicator;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{bollinger_bands, Bollinger, BollingerBand, BollingerBands};
pub use ema::{ema_of_series, Ema};
pub use indicator::{Indicator, IndicatorValues};
pub use rsi::{rsi_of_series, Rsi};
pub use sma::{sma_of_series, Sma};
pub use stddev::rolling_std;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
