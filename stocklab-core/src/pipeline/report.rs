//! Per-run report: what happened to each ticker.

use crate::cleaning::OutlierReport;
use crate::domain::OrderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a ticker was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("{ticker}: no observations")]
    Empty { ticker: String },

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Summary of one successfully transformed ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub input_rows: usize,
    pub output_rows: usize,
    /// Rows dropped because their date repeated an earlier row.
    pub dropped_duplicates: usize,
    pub outliers: OutlierReport,
}

/// A ticker that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: TickerError,
}

/// Report for a whole pipeline run, in partition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub tickers: Vec<TickerSummary>,
    pub failures: Vec<TickerFailure>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> usize {
        self.tickers.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.tickers.iter().map(|t| t.output_rows).sum()
    }

    pub fn total_masked(&self) -> usize {
        self.tickers.iter().map(|t| t.outliers.total_masked()).sum()
    }

    pub fn summary(&self, ticker: &str) -> Option<&TickerSummary> {
        self.tickers.iter().find(|t| t.ticker == ticker)
    }
}
