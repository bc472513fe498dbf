//! Z-score outlier masking with forward-fill repair.
//!
//! For every numeric column of one ticker: score each value against the
//! column's mean and sample standard deviation, mask values with |z| above
//! the threshold, then forward-fill masked and missing values from the most
//! recent valid prior value. Leading gaps have nothing to fill from and stay
//! missing.
//!
//! A column with zero variance has no outliers. Missing values are excluded
//! from the statistics.
//!
//! The default basis, [`ZScoreBasis::LeaveOneOut`], scores each value against
//! the rest of its column and so masks more readily on short, near-flat
//! columns: one differing value among five or more equal ones is masked.
//! [`ZScoreBasis::Column`] reproduces the classic whole-column z-score
//! (pandas `(x - x.mean()) / x.std()`) exactly.
//!
//! Callers must hand in a date-ascending series; the forward-fill depends on it.

use crate::domain::{Observation, TickerSeries};
use serde::{Deserialize, Serialize};

/// Default masking threshold in standard deviations.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Fewest observed values a column needs before leave-one-out scores are computed.
///
/// Below this the remaining values are too few for a stable deviation.
pub const LEAVE_ONE_OUT_MIN_VALUES: usize = 5;

/// Which statistics a value is scored against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZScoreBasis {
    /// Mean and standard deviation of the whole column, the value included.
    ///
    /// |z| can never exceed (n - 1) / sqrt(n) here, so short series never mask at 3.
    Column,
    /// Mean and standard deviation of the column with the scored value left out.
    #[default]
    LeaveOneOut,
}

/// The numeric columns of an observation that the filter cleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 6] = [
        NumericColumn::Open,
        NumericColumn::High,
        NumericColumn::Low,
        NumericColumn::Close,
        NumericColumn::AdjClose,
        NumericColumn::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Open => "open",
            NumericColumn::High => "high",
            NumericColumn::Low => "low",
            NumericColumn::Close => "close",
            NumericColumn::AdjClose => "adj_close",
            NumericColumn::Volume => "volume",
        }
    }

    /// Read the column from an observation. Missing volume reads as NaN.
    pub fn get(self, obs: &Observation) -> f64 {
        match self {
            NumericColumn::Open => obs.open,
            NumericColumn::High => obs.high,
            NumericColumn::Low => obs.low,
            NumericColumn::Close => obs.close,
            NumericColumn::AdjClose => obs.adj_close,
            NumericColumn::Volume => obs.volume.map_or(f64::NAN, |v| v as f64),
        }
    }

    /// Write the column back. NaN volume becomes `None`.
    pub fn set(self, obs: &mut Observation, value: f64) {
        match self {
            NumericColumn::Open => obs.open = value,
            NumericColumn::High => obs.high = value,
            NumericColumn::Low => obs.low = value,
            NumericColumn::Close => obs.close = value,
            NumericColumn::AdjClose => obs.adj_close = value,
            NumericColumn::Volume => {
                obs.volume = (!value.is_nan()).then(|| value.round().max(0.0) as u64)
            }
        }
    }
}

/// Masking and repair counts for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub column: NumericColumn,
    /// Values replaced because |z| exceeded the threshold.
    pub masked: usize,
    /// Values still missing after the forward-fill.
    pub unfilled: usize,
}

/// Outcome of cleaning one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub ticker: String,
    pub columns: Vec<ColumnReport>,
}

impl OutlierReport {
    pub fn total_masked(&self) -> usize {
        self.columns.iter().map(|c| c.masked).sum()
    }

    pub fn total_unfilled(&self) -> usize {
        self.columns.iter().map(|c| c.unfilled).sum()
    }

    pub fn masked_in(&self, column: NumericColumn) -> usize {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map_or(0, |c| c.masked)
    }
}

/// Per-ticker z-score outlier filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    threshold: f64,
    basis: ZScoreBasis,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, ZScoreBasis::default())
    }
}

impl OutlierFilter {
    pub fn new(threshold: f64, basis: ZScoreBasis) -> Self {
        assert!(
            threshold.is_finite() && threshold > 0.0,
            "outlier threshold must be finite and positive"
        );
        Self { threshold, basis }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn basis(&self) -> ZScoreBasis {
        self.basis
    }

    /// True where |z| exceeds the threshold. Undefined scores never mask.
    pub fn outlier_mask(&self, values: &[f64]) -> Vec<bool> {
        z_scores(values, self.basis)
            .into_iter()
            .map(|z| !z.is_nan() && z.abs() > self.threshold)
            .collect()
    }

    /// Mask outliers in one column and forward-fill the gaps.
    ///
    /// Returns the cleaned column, the number of masked values and the
    /// number of values still missing afterwards.
    pub fn clean_column(&self, values: &[f64]) -> (Vec<f64>, usize, usize) {
        let mask = self.outlier_mask(values);
        let masked = mask.iter().filter(|&&m| m).count();

        let with_gaps: Vec<f64> = values
            .iter()
            .zip(&mask)
            .map(|(&v, &m)| if m { f64::NAN } else { v })
            .collect();

        let filled = forward_fill(&with_gaps);
        let unfilled = filled.iter().filter(|v| v.is_nan()).count();
        (filled, masked, unfilled)
    }

    /// Clean every numeric column of one ticker's series.
    pub fn apply(&self, series: TickerSeries) -> (TickerSeries, OutlierReport) {
        let ticker = series.ticker().to_string();
        let mut rows = series.into_rows();
        let mut columns = Vec::with_capacity(NumericColumn::ALL.len());

        for column in NumericColumn::ALL {
            let values: Vec<f64> = rows.iter().map(|r| column.get(r)).collect();
            let (cleaned, masked, unfilled) = self.clean_column(&values);
            for (row, value) in rows.iter_mut().zip(cleaned) {
                column.set(row, value);
            }
            columns.push(ColumnReport {
                column,
                masked,
                unfilled,
            });
        }

        let report = OutlierReport {
            ticker: ticker.clone(),
            columns,
        };
        (TickerSeries::new(ticker, rows), report)
    }
}

/// Replace each NaN with the most recent prior non-NaN value.
pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut last = f64::NAN;
    for &v in values {
        if v.is_nan() {
            out.push(last);
        } else {
            last = v;
            out.push(v);
        }
    }
    out
}

/// Z-score of every value. Missing values and undefined scores are NaN.
pub fn z_scores(values: &[f64], basis: ZScoreBasis) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];

    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    let min_count = match basis {
        ZScoreBasis::Column => 2,
        ZScoreBasis::LeaveOneOut => LEAVE_ONE_OUT_MIN_VALUES,
    };
    if n < min_count {
        return result;
    }

    // Zero variance: nothing can be an outlier.
    let first = finite[0];
    if finite.iter().all(|&v| v == first) {
        return result;
    }

    let nf = n as f64;
    let mean = finite.iter().sum::<f64>() / nf;
    let sum_sq: f64 = finite.iter().map(|v| (v - mean) * (v - mean)).sum();

    for (z, &v) in result.iter_mut().zip(values) {
        if !v.is_finite() {
            continue;
        }
        let dev = v - mean;
        *z = match basis {
            ZScoreBasis::Column => dev / (sum_sq / (nf - 1.0)).sqrt(),
            ZScoreBasis::LeaveOneOut => {
                // Mean and variance of the other n-1 values, derived from the full-column sums.
                let rest_var = ((sum_sq - dev * dev * nf / (nf - 1.0)) / (nf - 2.0)).max(0.0);
                let rest_dev = dev * nf / (nf - 1.0);
                rest_dev / rest_var.sqrt()
            }
        };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> TickerSeries {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Observation {
                ticker: "TEST".into(),
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                adj_close: c,
                volume: Some(1_000),
            })
            .collect();
        TickerSeries::new("TEST", rows)
    }

    #[test]
    fn spike_is_masked_and_forward_filled() {
        let filter = OutlierFilter::default();
        let (cleaned, masked, unfilled) =
            filter.clean_column(&[10.0, 10.0, 10.0, 1000.0, 10.0, 10.0]);
        assert_eq!(masked, 1);
        assert_eq!(unfilled, 0);
        assert_eq!(cleaned, vec![10.0; 6]);
    }

    #[test]
    fn column_basis_cannot_reach_three_sigma_on_short_series() {
        let filter = OutlierFilter::new(3.0, ZScoreBasis::Column);
        let mask = filter.outlier_mask(&[10.0, 10.0, 10.0, 1000.0, 10.0, 10.0]);
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn column_basis_masks_on_long_series() {
        let mut values = vec![10.0; 30];
        values[15] = 1000.0;
        let filter = OutlierFilter::new(3.0, ZScoreBasis::Column);
        let (cleaned, masked, _) = filter.clean_column(&values);
        assert_eq!(masked, 1);
        assert_eq!(cleaned[15], 10.0);
    }

    #[test]
    fn near_flat_column_masks_only_under_leave_one_out() {
        let values = [10.0, 10.0, 10.0, 10.0, 10.0, 10.01];

        let loo = OutlierFilter::default().outlier_mask(&values);
        assert_eq!(loo, vec![false, false, false, false, false, true]);

        let column = OutlierFilter::new(3.0, ZScoreBasis::Column).outlier_mask(&values);
        assert!(column.iter().all(|&m| !m));
    }

    #[test]
    fn zero_variance_column_is_untouched() {
        let values = [42.0; 8];
        for basis in [ZScoreBasis::Column, ZScoreBasis::LeaveOneOut] {
            assert!(z_scores(&values, basis).iter().all(|z| z.is_nan()));
            let (cleaned, masked, _) = OutlierFilter::new(3.0, basis).clean_column(&values);
            assert_eq!(masked, 0);
            assert_eq!(cleaned, values.to_vec());
        }
    }

    #[test]
    fn column_z_scores_match_definition() {
        // mean 3, sample std sqrt(2.5)
        let z = z_scores(&[1.0, 2.0, 3.0, 4.0, 5.0], ZScoreBasis::Column);
        let s = 2.5f64.sqrt();
        assert!((z[0] + 2.0 / s).abs() < 1e-12);
        assert!(z[2].abs() < 1e-12);
        assert!((z[4] - 2.0 / s).abs() < 1e-12);
    }

    #[test]
    fn leave_one_out_matches_direct_computation() {
        let values = [3.0, 7.0, 1.0, 9.0, 4.0, 6.0];
        let z = z_scores(&values, ZScoreBasis::LeaveOneOut);
        for i in 0..values.len() {
            let rest: Vec<f64> = values
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &v)| v)
                .collect();
            let m = rest.iter().sum::<f64>() / rest.len() as f64;
            let var = rest.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (rest.len() - 1) as f64;
            let expected = (values[i] - m) / var.sqrt();
            assert!((z[i] - expected).abs() < 1e-9, "index {i}: {} vs {expected}", z[i]);
        }
    }

    #[test]
    fn missing_values_are_excluded_and_filled() {
        let filter = OutlierFilter::default();
        let (cleaned, masked, unfilled) = filter.clean_column(&[5.0, f64::NAN, 6.0, 5.5]);
        assert_eq!(masked, 0);
        assert_eq!(unfilled, 0);
        assert_eq!(cleaned, vec![5.0, 5.0, 6.0, 5.5]);
    }

    #[test]
    fn leading_gaps_stay_missing() {
        let filled = forward_fill(&[f64::NAN, f64::NAN, 3.0, f64::NAN]);
        assert!(filled[0].is_nan());
        assert!(filled[1].is_nan());
        assert_eq!(filled[2], 3.0);
        assert_eq!(filled[3], 3.0);
    }

    #[test]
    fn too_few_values_have_no_scores() {
        assert!(z_scores(&[1.0], ZScoreBasis::Column)[0].is_nan());
        assert!(z_scores(&[1.0, 2.0, 3.0, 100.0], ZScoreBasis::LeaveOneOut)
            .iter()
            .all(|z| z.is_nan()));
        assert!(z_scores(&[], ZScoreBasis::Column).is_empty());
    }

    #[test]
    fn apply_cleans_every_column() {
        let mut rows = series(&[10.0, 10.0, 10.0, 1000.0, 10.0, 10.0]).into_rows();
        rows[2].volume = Some(9_000_000);
        let input = TickerSeries::new("TEST", rows);

        let (cleaned, report) = OutlierFilter::default().apply(input);

        assert_eq!(report.ticker, "TEST");
        assert_eq!(report.masked_in(NumericColumn::Close), 1);
        assert_eq!(report.masked_in(NumericColumn::Volume), 1);
        assert_eq!(report.total_unfilled(), 0);

        let rows = cleaned.rows();
        assert_eq!(rows[3].close, 10.0);
        assert_eq!(rows[3].open, 10.0);
        assert_eq!(rows[2].volume, Some(1_000));
    }

    #[test]
    fn missing_volume_roundtrips_through_column() {
        let mut obs = series(&[1.0]).into_rows().remove(0);
        NumericColumn::Volume.set(&mut obs, f64::NAN);
        assert_eq!(obs.volume, None);
        assert!(NumericColumn::Volume.get(&obs).is_nan());
        NumericColumn::Volume.set(&mut obs, 1234.0);
        assert_eq!(obs.volume, Some(1234));
    }
}
