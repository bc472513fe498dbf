//! CSV ingest and export over files on disk.

use chrono::NaiveDate;
use std::fs;
use stocklab_core::data::{read_panel_csv, write_transformed_csv, DataError, SchemaError};
use stocklab_core::pipeline::{Pipeline, PipelineConfig};

const RAW_CSV: &str = "\
Ticker,Date,Open,High,Low,Close,Adj Close,Volume
AAPL,2023-01-03,130.28,130.90,124.17,125.07,124.22,112117500
AAPL,2023-01-04,126.89,128.66,125.08,126.36,125.50,89113600
MSFT,2023-01-03 00:00:00,243.08,245.75,237.40,239.58,237.04,25740000
AAPL,2023-01-05,127.13,127.77,124.76,125.02,124.17,80962700
MSFT,2023-01-04 00:00:00,232.28,232.87,225.96,229.10,226.67,
";

#[test]
fn reads_panel_with_aliases_and_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    fs::write(&path, RAW_CSV).unwrap();

    let panel = read_panel_csv(&path).unwrap();
    assert_eq!(panel.len(), 5);
    assert_eq!(panel.tickers(), vec!["AAPL", "MSFT"]);

    let rows = panel.rows();
    assert_eq!(rows[0].adj_close, 124.22);
    assert_eq!(rows[0].volume, Some(112_117_500));
    assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
    assert_eq!(rows[4].volume, None);
}

#[test]
fn missing_column_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "Ticker,Date,Open\nAAPL,2023-01-03,1.0\n").unwrap();

    let err = read_panel_csv(&path).unwrap_err();
    assert!(matches!(
        err,
        DataError::Schema(SchemaError::MissingColumn(_))
    ));
}

#[test]
fn transformed_csv_has_derived_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    let output = dir.path().join("out.csv");
    fs::write(&input, RAW_CSV).unwrap();

    let panel = read_panel_csv(&input).unwrap();
    let result = Pipeline::new(PipelineConfig::default()).unwrap().run(panel);
    write_transformed_csv(&output, &result.rows).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Ticker,Date,Open,High,Low,Close,Adj_Close,Volume,SMA_20,EMA_20,Bollinger_Upper,Bollinger_Lower,RSI_14"
    );
    let first: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(first[0], "AAPL");
    assert_eq!(first[1], "2023-01-03");
    assert_eq!(first[8], "", "SMA_20 should be empty before 20 rows");
    assert_eq!(first[9].parse::<f64>().unwrap(), 125.07);
    assert_eq!(first[12].parse::<f64>().unwrap(), 0.0);
    assert_eq!(text.lines().count(), 6);
}
