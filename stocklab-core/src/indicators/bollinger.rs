//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, window)
//! - Upper: middle + k * stddev(close, window)
//! - Lower: middle - k * stddev(close, window)
//!
//! Uses the sample stddev (divide by N - 1), so a window of 1 never yields bands.
//! Lookback: window - 1.

use super::indicator::Indicator;
use super::sma::sma_of_series;
use super::stddev::{rolling_std, SAMPLE_DDOF};

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn upper(window: usize, multiplier: f64) -> Self {
        Self::with_band(window, multiplier, BollingerBand::Upper)
    }

    pub fn middle(window: usize, multiplier: f64) -> Self {
        Self::with_band(window, multiplier, BollingerBand::Middle)
    }

    pub fn lower(window: usize, multiplier: f64) -> Self {
        Self::with_band(window, multiplier, BollingerBand::Lower)
    }

    fn with_band(window: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(window >= 1, "Bollinger window must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            window,
            multiplier,
            band,
            name: format!("bollinger_{label}_{window}_{multiplier}"),
        }
    }

    pub fn band(&self) -> BollingerBand {
        self.band
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, values: &[f64]) -> Vec<f64> {
        let bands = bollinger_bands(values, self.window, self.multiplier);
        match self.band {
            BollingerBand::Upper => bands.upper,
            BollingerBand::Middle => bands.middle,
            BollingerBand::Lower => bands.lower,
        }
    }
}

/// All three bands computed together.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Compute the bands from a raw f64 slice.
///
/// Upper and lower are undefined wherever either the SMA or the stddev is.
pub fn bollinger_bands(values: &[f64], window: usize, multiplier: f64) -> BollingerBands {
    let middle = sma_of_series(values, window);
    let std = rolling_std(values, window, SAMPLE_DDOF);

    let (upper, lower) = middle
        .iter()
        .zip(&std)
        .map(|(&m, &s)| {
            if m.is_nan() || s.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (m + multiplier * s, m - multiplier * s)
            }
        })
        .unzip();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let result = Bollinger::middle(3, 2.0).compute(&[10.0, 11.0, 12.0, 13.0, 14.0]);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_known_width() {
        // Window [10,11,12]: mean 11, sample std 1 → bands 13 / 9
        let values = [10.0, 11.0, 12.0];
        let upper = Bollinger::upper(3, 2.0).compute(&values);
        let lower = Bollinger::lower(3, 2.0).compute(&values);
        assert_approx(upper[2], 13.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let values = [10.0, 11.5, 12.0, 13.25, 14.0];
        let bands = bollinger_bands(&values, 3, 2.0);

        for i in 2..5 {
            let half_width = bands.upper[i] - bands.middle[i];
            assert_approx(bands.middle[i] - bands.lower[i], half_width, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let bands = bollinger_bands(&[100.0, 100.0, 100.0, 100.0], 3, 2.0);
        assert_approx(bands.upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(bands.lower[2], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_undefined_before_window() {
        let bands = bollinger_bands(&[1.0, 2.0, 3.0, 4.0], 20, 2.0);
        assert!(bands.upper.iter().all(|v| v.is_nan()));
        assert!(bands.lower.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn bollinger_nan_propagation() {
        let result = Bollinger::upper(3, 2.0).compute(&[10.0, 11.0, f64::NAN, 13.0]);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn bollinger_lookback_and_name() {
        let bb = Bollinger::upper(20, 2.0);
        assert_eq!(bb.lookback(), 19);
        assert_eq!(bb.band(), BollingerBand::Upper);
        assert_eq!(bb.name(), "bollinger_upper_20_2");
    }
}
