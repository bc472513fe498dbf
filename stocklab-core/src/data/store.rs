//! Append-only Parquet store of transformed observations.
//!
//! Layout: `{root}/ticker={TICKER}/observations.parquet` with a `meta.json`
//! sidecar per ticker (date range, row count, content hash, config hash).
//!
//! Rows are unique on (ticker, date). An insert is validated in full before
//! any file is written, so a rejected batch leaves the store untouched.
//! Files are replaced atomically (write to `.tmp`, rename into place).

use super::frame::{dataframe_to_transformed, transformed_to_dataframe};
use super::ingest::DataError;
use crate::domain::TransformedObservation;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DATA_FILE: &str = "observations.parquet";
const META_FILE: &str = "meta.json";
const TICKER_DIR_PREFIX: &str = "ticker=";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid ticker {0:?}: must be non-empty without path separators or `..`")]
    InvalidTicker(String),

    #[error("duplicate key: {ticker} on {date} is already stored")]
    DuplicateKey { ticker: String, date: NaiveDate },

    #[error("store I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt store file {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<PolarsError> for StoreError {
    fn from(e: PolarsError) -> Self {
        StoreError::Data(DataError::Polars(e))
    }
}

/// Metadata sidecar for one stored ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    /// Hash of the pipeline config that produced the most recent insert.
    pub config_hash: Option<String>,
    pub written_at: NaiveDateTime,
}

/// Outcome of a successful insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub tickers: Vec<String>,
}

/// The observation store.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    root: PathBuf,
}

impl ObservationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.root.join(format!("{TICKER_DIR_PREFIX}{ticker}"))
    }

    fn data_path(&self, ticker: &str) -> PathBuf {
        self.ticker_dir(ticker).join(DATA_FILE)
    }

    fn meta_path(&self, ticker: &str) -> PathBuf {
        self.ticker_dir(ticker).join(META_FILE)
    }

    /// Append rows to the store.
    ///
    /// Fails with [`StoreError::DuplicateKey`] if any (ticker, date) repeats
    /// within the batch or is already stored; nothing is written in that case.
    pub fn insert(
        &self,
        rows: &[TransformedObservation],
        config_hash: Option<&str>,
    ) -> Result<InsertSummary, StoreError> {
        let mut by_ticker: BTreeMap<&str, Vec<&TransformedObservation>> = BTreeMap::new();
        let mut seen: HashSet<(&str, NaiveDate)> = HashSet::with_capacity(rows.len());
        for row in rows {
            validate_ticker(row.ticker())?;
            if !seen.insert(row.observation.key()) {
                return Err(duplicate(row));
            }
            by_ticker.entry(row.ticker()).or_default().push(row);
        }

        // Validate every ticker against its stored rows before writing anything.
        let mut merged: Vec<(&str, Vec<TransformedObservation>)> =
            Vec::with_capacity(by_ticker.len());
        for (ticker, new_rows) in &by_ticker {
            let existing = self.query(ticker)?;
            let stored: HashSet<NaiveDate> = existing.iter().map(|r| r.date()).collect();
            if let Some(row) = new_rows.iter().find(|r| stored.contains(&r.date())) {
                return Err(duplicate(row));
            }
            let mut all = existing;
            all.extend(new_rows.iter().map(|r| (*r).clone()));
            all.sort_by_key(|r| r.date());
            merged.push((*ticker, all));
        }

        for (ticker, all) in &merged {
            self.write_ticker(ticker, all, config_hash)?;
            debug!(ticker = %ticker, rows = all.len(), "ticker committed");
        }

        let summary = InsertSummary {
            inserted: rows.len(),
            tickers: by_ticker.keys().map(|t| t.to_string()).collect(),
        };
        info!(
            rows = summary.inserted,
            tickers = summary.tickers.len(),
            root = %self.root.display(),
            "rows inserted"
        );
        Ok(summary)
    }

    /// All stored rows for `ticker`, date-ascending. Unknown tickers yield no rows.
    pub fn query(&self, ticker: &str) -> Result<Vec<TransformedObservation>, StoreError> {
        validate_ticker(ticker)?;
        let path = self.data_path(ticker);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        let mut rows = dataframe_to_transformed(&df).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        rows.sort_by_key(|r| r.date());
        Ok(rows)
    }

    /// Tickers present in the store, sorted.
    pub fn tickers(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(ticker) = name.to_str().and_then(|n| n.strip_prefix(TICKER_DIR_PREFIX)) {
                if entry.path().join(DATA_FILE).exists() {
                    tickers.push(ticker.to_string());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    /// Metadata sidecar for a ticker, if stored.
    pub fn meta(&self, ticker: &str) -> Option<StoreMeta> {
        validate_ticker(ticker).ok()?;
        let content = fs::read_to_string(self.meta_path(ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata for every stored ticker.
    pub fn status(&self) -> Result<Vec<StoreMeta>, StoreError> {
        Ok(self
            .tickers()?
            .iter()
            .filter_map(|t| self.meta(t))
            .collect())
    }

    fn write_ticker(
        &self,
        ticker: &str,
        rows: &[TransformedObservation],
        config_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(());
        };

        let dir = self.ticker_dir(ticker);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut df = transformed_to_dataframe(rows)?;
        let path = self.data_path(ticker);
        atomic_write(&path, |file| {
            ParquetWriter::new(file).finish(&mut df)?;
            Ok(())
        })?;

        let meta = StoreMeta {
            ticker: ticker.to_string(),
            start_date: first.date(),
            end_date: last.date(),
            row_count: rows.len(),
            data_hash: blake3::hash(&serde_json::to_vec(rows)?)
                .to_hex()
                .to_string(),
            config_hash: config_hash.map(str::to_string),
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;
        atomic_write(&self.meta_path(ticker), |file| {
            use std::io::Write;
            file.write_all(&meta_json).map_err(|source| StoreError::Io {
                path: self.meta_path(ticker),
                source,
            })
        })
    }
}

/// A ticker becomes one directory name under the root; it must not reach outside it.
fn validate_ticker(ticker: &str) -> Result<(), StoreError> {
    if ticker.is_empty() || ticker.contains(['/', '\\', '\0']) || ticker.contains("..") {
        return Err(StoreError::InvalidTicker(ticker.to_string()));
    }
    Ok(())
}

fn duplicate(row: &TransformedObservation) -> StoreError {
    StoreError::DuplicateKey {
        ticker: row.ticker().to_string(),
        date: row.date(),
    }
}

/// Write through `.tmp` and rename into place.
fn atomic_write(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    if let Err(e) = write(&mut file) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
