//! Per-ticker orchestration: partition, clean, derive, reassemble.
//!
//! Each ticker is an owned `TickerSeries` transformed in isolation; no window
//! state crosses tickers. Partitions run on the rayon pool when the config
//! asks for it, and the output keeps partition order either way.

use super::config::{ConfigError, OrderPolicy, PipelineConfig};
use super::report::{PipelineReport, TickerError, TickerFailure, TickerSummary};
use crate::cleaning::OutlierFilter;
use crate::domain::{defined, DerivedFields, Panel, TickerSeries, TransformedObservation};
use crate::indicators::{Bollinger, Ema, Indicator, IndicatorValues, Rsi, Sma};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// The five indicators attached to every row.
#[derive(Debug, Clone)]
struct IndicatorSet {
    sma: Sma,
    ema: Ema,
    bollinger_upper: Bollinger,
    bollinger_lower: Bollinger,
    rsi: Rsi,
}

impl IndicatorSet {
    fn from_config(config: &PipelineConfig) -> Self {
        let ind = &config.indicators;
        Self {
            sma: Sma::new(ind.sma_window),
            ema: Ema::new(ind.ema_window),
            bollinger_upper: Bollinger::upper(ind.bollinger_window, ind.bollinger_k),
            bollinger_lower: Bollinger::lower(ind.bollinger_window, ind.bollinger_k),
            rsi: Rsi::new(ind.rsi_window),
        }
    }

    fn all(&self) -> [&dyn Indicator; 5] {
        [
            &self.sma,
            &self.ema,
            &self.bollinger_upper,
            &self.bollinger_lower,
            &self.rsi,
        ]
    }

    fn derive(&self, closes: &[f64]) -> Vec<DerivedFields> {
        let mut values = IndicatorValues::new();
        for indicator in self.all() {
            values.compute_into(indicator, closes);
        }

        let at = |name: &str, i: usize| values.get(name, i).and_then(defined);

        (0..closes.len())
            .map(|i| DerivedFields {
                sma: at(self.sma.name(), i),
                ema: at(self.ema.name(), i),
                bollinger_upper: at(self.bollinger_upper.name(), i),
                bollinger_lower: at(self.bollinger_lower.name(), i),
                rsi: at(self.rsi.name(), i),
            })
            .collect()
    }
}

/// Rows and summary for one transformed ticker.
#[derive(Debug, Clone)]
pub struct TickerOutput {
    pub rows: Vec<TransformedObservation>,
    pub summary: TickerSummary,
}

/// Result of a pipeline run: the flat transformed table plus the report.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub rows: Vec<TransformedObservation>,
    pub report: PipelineReport,
}

impl PipelineOutput {
    /// Rows of one ticker, in date order.
    pub fn rows_for<'a>(
        &'a self,
        ticker: &'a str,
    ) -> impl Iterator<Item = &'a TransformedObservation> + 'a {
        self.rows.iter().filter(move |r| r.ticker() == ticker)
    }
}

/// The cleaning and indicator pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    filter: OutlierFilter,
    indicators: IndicatorSet,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = OutlierFilter::new(config.outlier.threshold, config.outlier.basis);
        let indicators = IndicatorSet::from_config(&config);
        Ok(Self {
            config,
            filter,
            indicators,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transform a multi-ticker panel.
    pub fn run(&self, panel: Panel) -> PipelineOutput {
        self.run_series(panel.partition())
    }

    /// Transform per-ticker series as delivered by an acquisition source.
    ///
    /// A failing ticker is logged and reported; the rest still run.
    pub fn run_series(&self, partitions: Vec<TickerSeries>) -> PipelineOutput {
        let total_rows: usize = partitions.iter().map(|p| p.len()).sum();
        info!(
            tickers = partitions.len(),
            rows = total_rows,
            parallel = self.config.parallel,
            "pipeline started"
        );

        let process = |series: TickerSeries| {
            let ticker = series.ticker().to_string();
            (ticker, self.process_ticker(series))
        };

        let results: Vec<(String, Result<TickerOutput, TickerError>)> = if self.config.parallel {
            partitions.into_par_iter().map(process).collect()
        } else {
            partitions.into_iter().map(process).collect()
        };

        let mut output = PipelineOutput::default();
        for (ticker, result) in results {
            match result {
                Ok(ticker_output) => {
                    output.rows.extend(ticker_output.rows);
                    output.report.tickers.push(ticker_output.summary);
                }
                Err(error) => {
                    warn!(ticker = %ticker, error = %error, "skipping ticker");
                    output.report.failures.push(TickerFailure { ticker, error });
                }
            }
        }

        info!(
            succeeded = output.report.succeeded(),
            failed = output.report.failed(),
            rows = output.rows.len(),
            masked = output.report.total_masked(),
            "pipeline finished"
        );
        output
    }

    /// Transform one ticker: enforce date order, clean, derive indicators.
    pub fn process_ticker(&self, series: TickerSeries) -> Result<TickerOutput, TickerError> {
        let ticker = series.ticker().to_string();
        let input_rows = series.len();
        if series.is_empty() {
            return Err(TickerError::Empty { ticker });
        }

        let (ordered, dropped_duplicates) = match self.config.order_policy {
            OrderPolicy::Reject => {
                series.check_date_order()?;
                (series, 0)
            }
            OrderPolicy::Sort => series.sort_and_dedup(),
        };
        if dropped_duplicates > 0 {
            warn!(ticker = %ticker, dropped = dropped_duplicates, "dropped rows with repeated dates");
        }

        let (cleaned, outliers) = self.filter.apply(ordered);
        if outliers.total_unfilled() > 0 {
            warn!(
                ticker = %ticker,
                unfilled = outliers.total_unfilled(),
                "leading gaps left unfilled"
            );
        }

        let derived = self.derive(&cleaned);
        let rows: Vec<TransformedObservation> = cleaned
            .into_rows()
            .into_iter()
            .zip(derived)
            .map(|(observation, derived)| TransformedObservation {
                observation,
                derived,
            })
            .collect();

        debug!(
            ticker = %ticker,
            rows = rows.len(),
            masked = outliers.total_masked(),
            "ticker transformed"
        );

        let summary = TickerSummary {
            ticker,
            input_rows,
            output_rows: rows.len(),
            dropped_duplicates,
            outliers,
        };
        Ok(TickerOutput { rows, summary })
    }

    /// Derive indicator columns from a series' close column, one entry per row.
    pub fn derive(&self, series: &TickerSeries) -> Vec<DerivedFields> {
        self.indicators.derive(&series.closes())
    }
}
