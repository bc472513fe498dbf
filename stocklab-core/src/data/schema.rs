use polars::prelude::*;

/// Column names of the raw and transformed panel tables.
pub mod columns {
    pub const TICKER: &str = "Ticker";
    pub const DATE: &str = "Date";
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const CLOSE: &str = "Close";
    pub const ADJ_CLOSE: &str = "Adj_Close";
    pub const VOLUME: &str = "Volume";

    pub const SMA: &str = "SMA_20";
    pub const EMA: &str = "EMA_20";
    pub const BOLLINGER_UPPER: &str = "Bollinger_Upper";
    pub const BOLLINGER_LOWER: &str = "Bollinger_Lower";
    pub const RSI: &str = "RSI_14";

    /// Spellings of the adjusted close header accepted on ingest.
    pub const ADJ_CLOSE_ALIASES: [&str; 3] = [ADJ_CLOSE, "Adj Close", "AdjClose"];

    pub const PRICES: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, ADJ_CLOSE];
    pub const DERIVED: [&str; 5] = [SMA, EMA, BOLLINGER_UPPER, BOLLINGER_LOWER, RSI];
}

/// Expected schemas for panel data.
pub struct PanelSchema;

impl PanelSchema {
    /// Schema of a raw observation table.
    pub fn observations() -> Schema {
        let mut fields = vec![
            Field::new(columns::TICKER.into(), DataType::String),
            Field::new(columns::DATE.into(), DataType::Date),
        ];
        fields.extend(
            columns::PRICES
                .iter()
                .map(|name| Field::new((*name).into(), DataType::Float64)),
        );
        fields.push(Field::new(columns::VOLUME.into(), DataType::UInt64));
        Schema::from_iter(fields)
    }

    /// Schema of a transformed table: observations plus the indicator columns.
    pub fn transformed() -> Schema {
        let mut schema = Self::observations();
        for name in columns::DERIVED {
            schema.with_column(name.into(), DataType::Float64);
        }
        schema
    }

    /// Validate that `df` has every column of `expected` with the expected type.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(columns::TICKER.into(), &["AAPL"]),
            Column::new(columns::DATE.into(), &[19_360i32])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new(columns::OPEN.into(), &[130.0]),
            Column::new(columns::HIGH.into(), &[131.0]),
            Column::new(columns::LOW.into(), &[124.0]),
            Column::new(columns::CLOSE.into(), &[125.0]),
            Column::new(columns::ADJ_CLOSE.into(), &[124.2]),
            Column::new(columns::VOLUME.into(), &[1_000u64]),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_has_all_required_columns() {
        let schema = PanelSchema::observations();
        for name in [columns::TICKER, columns::DATE, columns::VOLUME]
            .iter()
            .chain(columns::PRICES.iter())
        {
            assert!(schema.contains(name), "missing {name}");
        }
        assert_eq!(schema.len(), 8);
    }

    #[test]
    fn test_transformed_schema_adds_derived_columns() {
        let schema = PanelSchema::transformed();
        assert_eq!(schema.len(), 13);
        for name in columns::DERIVED {
            assert_eq!(schema.get(name), Some(&DataType::Float64));
        }
    }

    #[test]
    fn test_validate_accepts_valid_dataframe() {
        let df = observation_frame();
        assert!(PanelSchema::validate(&df, &PanelSchema::observations()).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_column() {
        let df = observation_frame().drop(columns::CLOSE).unwrap();
        let result = PanelSchema::validate(&df, &PanelSchema::observations());
        assert!(matches!(result, Err(SchemaError::MissingColumn(c)) if c == columns::CLOSE));
    }

    #[test]
    fn test_validate_rejects_wrong_type() {
        let mut df = observation_frame();
        df.with_column(Column::new(columns::OPEN.into(), &["not_a_number"]))
            .unwrap();
        let result = PanelSchema::validate(&df, &PanelSchema::observations());
        assert!(matches!(result, Err(SchemaError::TypeMismatch { .. })));
    }
}
