//! StockLab Core: cleaning and indicator pipeline for daily OHLCV panels.
//!
//! This crate contains:
//! - Domain types (observations, derived fields, panels, per-ticker series)
//! - Z-score outlier filter with forward-fill repair
//! - Rolling indicators (SMA, EMA, Bollinger Bands, RSI)
//! - Per-ticker pipeline orchestration with a run report
//! - CSV panel I/O and an append-only Parquet observation store

pub mod cleaning;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod pipeline;

pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput, PipelineReport};
