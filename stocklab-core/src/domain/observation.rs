//! Observation: one ticker's OHLCV values on one trading day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV observation for a single ticker.
///
/// Prices use `f64::NAN` for missing values. Volume is nullable because the
/// outlier filter can leave a leading gap with nothing to forward-fill from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: Option<u64>,
}

impl Observation {
    /// Key under which the observation is stored.
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.ticker, self.date)
    }
}

/// Indicator columns attached to an observation by the pipeline.
///
/// `None` means undefined: not enough history yet, or a missing input in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub rsi: Option<f64>,
}

/// A cleaned observation with its derived indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedObservation {
    pub observation: Observation,
    pub derived: DerivedFields,
}

impl TransformedObservation {
    pub fn ticker(&self) -> &str {
        &self.observation.ticker
    }

    pub fn date(&self) -> NaiveDate {
        self.observation.date
    }
}

/// Convert an indicator output value into a nullable field.
///
/// Indicators signal "undefined" with NaN; anything non-finite maps to `None`.
pub fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Observation {
        Observation {
            ticker: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            open: 130.28,
            high: 130.90,
            low: 124.17,
            close: 125.07,
            adj_close: 124.22,
            volume: Some(112_117_500),
        }
    }

    #[test]
    fn key_is_ticker_and_date() {
        let obs = sample();
        assert_eq!(obs.key(), ("AAPL", NaiveDate::from_ymd_opt(2023, 1, 3).unwrap()));
    }

    #[test]
    fn defined_maps_non_finite_to_none() {
        assert_eq!(defined(1.5), Some(1.5));
        assert_eq!(defined(f64::NAN), None);
        assert_eq!(defined(f64::INFINITY), None);
    }

    #[test]
    fn observation_serialization_roundtrip() {
        let obs = sample();
        let json = serde_json::to_string(&obs).unwrap();
        let deser: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs, deser);
    }
}
