//! CSV ingest of raw panels and CSV export of transformed panels.

use super::frame::{dataframe_to_observations, date_to_days, transformed_to_dataframe};
use super::schema::{columns, SchemaError};
use crate::domain::{Panel, TransformedObservation};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Read a raw multi-ticker panel from CSV.
///
/// Expects a header row with `Ticker`, `Date`, `Open`, `High`, `Low`,
/// `Close`, an adjusted close column (`Adj Close`, `Adj_Close` or
/// `AdjClose`) and `Volume`. Dates are `YYYY-MM-DD`; a trailing time
/// component is ignored. Empty price cells become NaN, empty volumes null.
pub fn read_panel_csv(path: &Path) -> Result<Panel, DataError> {
    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!(path = %path.display(), rows = raw.height(), "csv parsed");

    let df = normalize_raw_frame(&raw)?;
    let panel = Panel::new(dataframe_to_observations(&df)?);
    info!(
        path = %path.display(),
        rows = panel.len(),
        tickers = panel.tickers().len(),
        "panel loaded"
    );
    Ok(panel)
}

/// Write a transformed table to CSV, one row per (ticker, date).
///
/// Undefined indicator values are written as empty cells.
pub fn write_transformed_csv(path: &Path, rows: &[TransformedObservation]) -> Result<(), DataError> {
    let mut df = transformed_to_dataframe(rows)?;
    let mut file = File::create(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    info!(path = %path.display(), rows = rows.len(), "transformed panel written");
    Ok(())
}

/// Coerce a freshly parsed CSV frame into the raw panel schema.
fn normalize_raw_frame(df: &DataFrame) -> Result<DataFrame, DataError> {
    let ticker = require(df, &[columns::TICKER])?.cast(&DataType::String)?;
    let date = date_column(require(df, &[columns::DATE])?)?;

    let mut cols = vec![ticker, date];
    for name in [columns::OPEN, columns::HIGH, columns::LOW, columns::CLOSE] {
        cols.push(price_column(require(df, &[name])?, name)?);
    }
    cols.push(price_column(
        require(df, &columns::ADJ_CLOSE_ALIASES)?,
        columns::ADJ_CLOSE,
    )?);
    cols.push(volume_column(require(df, &[columns::VOLUME])?)?);

    Ok(DataFrame::new(cols)?)
}

/// First column present under any of `names`.
fn require<'a>(df: &'a DataFrame, names: &[&str]) -> Result<&'a Column, SchemaError> {
    names
        .iter()
        .find_map(|name| df.column(name).ok())
        .ok_or_else(|| SchemaError::MissingColumn(names[0].to_string()))
}

fn price_column(col: &Column, name: &str) -> Result<Column, DataError> {
    let values: Vec<f64> = col
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(Column::new(name.into(), values))
}

fn volume_column(col: &Column) -> Result<Column, DataError> {
    let values: Vec<Option<u64>> = col
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u64))
        .collect();
    Ok(Column::new(columns::VOLUME.into(), values))
}

fn date_column(col: &Column) -> Result<Column, DataError> {
    match col.dtype() {
        DataType::Date => Ok(col.clone()),
        DataType::Datetime(_, _) => Ok(col.cast(&DataType::Date)?),
        DataType::String => {
            let days = col
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, text)| {
                    let text = text.ok_or_else(|| DataError::InvalidRow {
                        row,
                        message: "missing date".into(),
                    })?;
                    parse_date(text)
                        .map(date_to_days)
                        .ok_or_else(|| DataError::InvalidRow {
                            row,
                            message: format!("unparseable date '{text}'"),
                        })
                })
                .collect::<Result<Vec<i32>, DataError>>()?;
            Ok(Column::new(columns::DATE.into(), days).cast(&DataType::Date)?)
        }
        other => Err(SchemaError::TypeMismatch {
            column: columns::DATE.to_string(),
            expected: DataType::Date,
            actual: other.clone(),
        }
        .into()),
    }
}

/// Parse `YYYY-MM-DD`, dropping any time component.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
