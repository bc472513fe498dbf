//! Data cleaning applied to each ticker before indicators are derived.

pub mod outlier;

pub use outlier::{
    forward_fill, z_scores, ColumnReport, NumericColumn, OutlierFilter, OutlierReport,
    ZScoreBasis, DEFAULT_THRESHOLD, LEAVE_ONE_OUT_MIN_VALUES,
};
