//! Conversions between domain rows and Polars DataFrames.
//!
//! Dates are stored as Polars `Date` (days since 1970-01-01). Missing prices
//! stay NaN; missing volumes and undefined indicator values become nulls.

use super::ingest::DataError;
use super::schema::{columns, PanelSchema};
use crate::domain::{DerivedFields, Observation, TransformedObservation};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn observation_columns<'a>(
    rows: impl Iterator<Item = &'a Observation> + Clone,
) -> PolarsResult<Vec<Column>> {
    let tickers: Vec<&str> = rows.clone().map(|o| o.ticker.as_str()).collect();
    let dates: Vec<i32> = rows.clone().map(|o| date_to_days(o.date)).collect();
    let price = |name: &str, get: fn(&Observation) -> f64| {
        Column::new(name.into(), rows.clone().map(get).collect::<Vec<f64>>())
    };
    let volumes: Vec<Option<u64>> = rows.clone().map(|o| o.volume).collect();

    Ok(vec![
        Column::new(columns::TICKER.into(), tickers),
        Column::new(columns::DATE.into(), dates).cast(&DataType::Date)?,
        price(columns::OPEN, |o| o.open),
        price(columns::HIGH, |o| o.high),
        price(columns::LOW, |o| o.low),
        price(columns::CLOSE, |o| o.close),
        price(columns::ADJ_CLOSE, |o| o.adj_close),
        Column::new(columns::VOLUME.into(), volumes),
    ])
}

/// Convert observations to a DataFrame with the raw panel schema.
pub fn observations_to_dataframe(rows: &[Observation]) -> PolarsResult<DataFrame> {
    DataFrame::new(observation_columns(rows.iter())?)
}

/// Convert transformed rows to a DataFrame with the transformed panel schema.
pub fn transformed_to_dataframe(rows: &[TransformedObservation]) -> PolarsResult<DataFrame> {
    let mut cols = observation_columns(rows.iter().map(|r| &r.observation))?;
    let derived = |name: &str, get: fn(&DerivedFields) -> Option<f64>| {
        Column::new(
            name.into(),
            rows.iter()
                .map(|r| get(&r.derived))
                .collect::<Vec<Option<f64>>>(),
        )
    };
    cols.extend([
        derived(columns::SMA, |d| d.sma),
        derived(columns::EMA, |d| d.ema),
        derived(columns::BOLLINGER_UPPER, |d| d.bollinger_upper),
        derived(columns::BOLLINGER_LOWER, |d| d.bollinger_lower),
        derived(columns::RSI, |d| d.rsi),
    ]);
    DataFrame::new(cols)
}

/// Convert a DataFrame with the raw panel schema back to observations.
pub fn dataframe_to_observations(df: &DataFrame) -> Result<Vec<Observation>, DataError> {
    PanelSchema::validate(df, &PanelSchema::observations())?;

    let tickers = df.column(columns::TICKER)?.str()?;
    let dates = df.column(columns::DATE)?.date()?;
    let open = df.column(columns::OPEN)?.f64()?;
    let high = df.column(columns::HIGH)?.f64()?;
    let low = df.column(columns::LOW)?.f64()?;
    let close = df.column(columns::CLOSE)?.f64()?;
    let adj_close = df.column(columns::ADJ_CLOSE)?.f64()?;
    let volume = df.column(columns::VOLUME)?.u64()?;

    (0..df.height())
        .map(|i| {
            let ticker = tickers.get(i).ok_or_else(|| DataError::InvalidRow {
                row: i,
                message: "null ticker".into(),
            })?;
            let date = dates
                .get(i)
                .and_then(days_to_date)
                .ok_or_else(|| DataError::InvalidRow {
                    row: i,
                    message: "null or out-of-range date".into(),
                })?;
            Ok(Observation {
                ticker: ticker.to_string(),
                date,
                open: open.get(i).unwrap_or(f64::NAN),
                high: high.get(i).unwrap_or(f64::NAN),
                low: low.get(i).unwrap_or(f64::NAN),
                close: close.get(i).unwrap_or(f64::NAN),
                adj_close: adj_close.get(i).unwrap_or(f64::NAN),
                volume: volume.get(i),
            })
        })
        .collect()
}

/// Convert a DataFrame with the transformed panel schema back to rows.
pub fn dataframe_to_transformed(df: &DataFrame) -> Result<Vec<TransformedObservation>, DataError> {
    PanelSchema::validate(df, &PanelSchema::transformed())?;
    let observations = dataframe_to_observations(df)?;

    let sma = df.column(columns::SMA)?.f64()?;
    let ema = df.column(columns::EMA)?.f64()?;
    let upper = df.column(columns::BOLLINGER_UPPER)?.f64()?;
    let lower = df.column(columns::BOLLINGER_LOWER)?.f64()?;
    let rsi = df.column(columns::RSI)?.f64()?;

    Ok(observations
        .into_iter()
        .enumerate()
        .map(|(i, observation)| TransformedObservation {
            observation,
            derived: DerivedFields {
                sma: sma.get(i),
                ema: ema.get(i),
                bollinger_upper: upper.get(i),
                bollinger_lower: lower.get(i),
                rsi: rsi.get(i),
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<TransformedObservation> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        vec![
            TransformedObservation {
                observation: Observation {
                    ticker: "MSFT".into(),
                    date,
                    open: 410.0,
                    high: 415.5,
                    low: 408.2,
                    close: 415.5,
                    adj_close: 414.0,
                    volume: Some(22_000_000),
                },
                derived: DerivedFields {
                    ema: Some(415.5),
                    rsi: Some(0.0),
                    ..Default::default()
                },
            },
            TransformedObservation {
                observation: Observation {
                    ticker: "MSFT".into(),
                    date: date.succ_opt().unwrap(),
                    open: f64::NAN,
                    high: 416.0,
                    low: 409.0,
                    close: 412.0,
                    adj_close: 411.0,
                    volume: None,
                },
                derived: DerivedFields::default(),
            },
        ]
    }

    #[test]
    fn epoch_day_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        assert_eq!(days_to_date(0), Some(epoch));
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_to_date(date_to_days(d)), Some(d));
    }

    #[test]
    fn transformed_frame_has_schema_and_nulls() {
        let df = transformed_to_dataframe(&rows()).unwrap();
        assert_eq!(df.height(), 2);
        assert!(PanelSchema::validate(&df, &PanelSchema::transformed()).is_ok());
        assert_eq!(df.column(columns::SMA).unwrap().null_count(), 2);
        assert_eq!(df.column(columns::VOLUME).unwrap().null_count(), 1);
    }

    #[test]
    fn transformed_frame_converts_back() {
        let original = rows();
        let back = dataframe_to_transformed(&transformed_to_dataframe(&original).unwrap()).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0], original[0]);
        assert!(back[1].observation.open.is_nan());
        assert_eq!(back[1].observation.volume, None);
        assert_eq!(back[1].date(), original[1].date());
    }

    #[test]
    fn observation_frame_rejects_transformed_conversion() {
        let obs: Vec<Observation> = rows().into_iter().map(|r| r.observation).collect();
        let df = observations_to_dataframe(&obs).unwrap();
        assert!(dataframe_to_observations(&df).is_ok());
        assert!(matches!(
            dataframe_to_transformed(&df),
            Err(DataError::Schema(_))
        ));
    }
}
