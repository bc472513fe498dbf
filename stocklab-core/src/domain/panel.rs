//! Panel: a flat multi-ticker table of observations, and its per-ticker partitions.
//!
//! The pipeline never mutates a shared table. A `Panel` is split into owned
//! `TickerSeries` values, each transformed in isolation, and the results are
//! concatenated back in partition order.

use super::observation::Observation;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Date-ordering violation inside a single ticker's series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("{ticker}: date {date} at row {index} is earlier than the previous row")]
    OutOfOrder {
        ticker: String,
        index: usize,
        date: NaiveDate,
    },

    #[error("{ticker}: duplicate date {date}")]
    DuplicateDate { ticker: String, date: NaiveDate },
}

/// Multi-ticker table keyed by (ticker, date).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    rows: Vec<Observation>,
}

impl Panel {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct tickers in order of first appearance.
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut tickers = Vec::new();
        for row in &self.rows {
            if seen.insert(row.ticker.as_str()) {
                tickers.push(row.ticker.as_str());
            }
        }
        tickers
    }

    /// Split the panel into one series per ticker.
    ///
    /// Partitions come out in order of first appearance; rows inside a
    /// partition keep their original relative order.
    pub fn partition(self) -> Vec<TickerSeries> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut partitions: Vec<TickerSeries> = Vec::new();

        for row in self.rows {
            match index.get(&row.ticker) {
                Some(&i) => partitions[i].rows.push(row),
                None => {
                    index.insert(row.ticker.clone(), partitions.len());
                    partitions.push(TickerSeries {
                        ticker: row.ticker.clone(),
                        rows: vec![row],
                    });
                }
            }
        }

        partitions
    }
}

/// All observations of one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    ticker: String,
    rows: Vec<Observation>,
}

impl TickerSeries {
    /// Build a series. Rows are expected to carry `ticker`.
    pub fn new(ticker: impl Into<String>, rows: Vec<Observation>) -> Self {
        let ticker = ticker.into();
        debug_assert!(rows.iter().all(|r| r.ticker == ticker));
        Self { ticker, rows }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The close column.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Check that dates are strictly increasing.
    pub fn check_date_order(&self) -> Result<(), OrderError> {
        for (i, pair) in self.rows.windows(2).enumerate() {
            let (prev, curr) = (&pair[0], &pair[1]);
            if curr.date == prev.date {
                return Err(OrderError::DuplicateDate {
                    ticker: self.ticker.clone(),
                    date: curr.date,
                });
            }
            if curr.date < prev.date {
                return Err(OrderError::OutOfOrder {
                    ticker: self.ticker.clone(),
                    index: i + 1,
                    date: curr.date,
                });
            }
        }
        Ok(())
    }

    /// Sort by date and drop repeated dates, keeping the first occurrence.
    ///
    /// Returns the normalized series and the number of dropped rows.
    pub fn sort_and_dedup(mut self) -> (Self, usize) {
        let before = self.rows.len();
        // Stable sort keeps the first occurrence of a repeated date in front.
        self.rows.sort_by_key(|r| r.date);
        self.rows.dedup_by_key(|r| r.date);
        let dropped = before - self.rows.len();
        (self, dropped)
    }
}
