//! Batch pipeline: configuration, per-ticker orchestration and run reports.

pub mod config;
pub mod orchestrator;
pub mod report;

pub use config::{ConfigError, IndicatorConfig, OrderPolicy, OutlierConfig, PipelineConfig};
pub use orchestrator::{Pipeline, PipelineOutput, TickerOutput};
pub use report::{PipelineReport, TickerError, TickerFailure, TickerSummary};
