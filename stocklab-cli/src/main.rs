//! StockLab CLI: transform, query and store management commands.
//!
//! Commands:
//! - `transform`: clean a raw CSV panel, derive indicators, store and/or export
//! - `query`: print the stored rows of one ticker
//! - `store status`: report store size, ticker count, date ranges
//! - `config init` / `config show`: write or inspect a pipeline config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stocklab_core::data::{read_panel_csv, write_transformed_csv, ObservationStore};
use stocklab_core::domain::TransformedObservation;
use stocklab_core::pipeline::{Pipeline, PipelineConfig, PipelineReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stocklab",
    about = "StockLab CLI: OHLCV cleaning and technical indicator pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw panel, derive indicators, and store or export the result.
    Transform {
        /// Raw panel CSV (Ticker, Date, Open, High, Low, Close, Adj Close, Volume).
        #[arg(long)]
        input: PathBuf,

        /// Pipeline config TOML. Defaults to the built-in settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Store directory to insert the transformed rows into.
        #[arg(long)]
        store: Option<PathBuf>,

        /// CSV file to write the transformed table to.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Process tickers one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Print stored rows for a ticker.
    Query {
        /// Ticker to look up.
        ticker: String,

        /// Store directory. Defaults to ./store.
        #[arg(long, default_value = "store")]
        store: PathBuf,

        /// First date to include (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Last date to include (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Emit JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Store management commands.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Pipeline config commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Report store size, ticker count, and date ranges.
    Status {
        /// Store directory. Defaults to ./store.
        #[arg(long, default_value = "store")]
        store: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config as TOML.
    Init {
        /// File to write. Prints to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a config file and print it with its hash.
    Show {
        /// Config TOML to check.
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transform {
            input,
            config,
            store,
            output,
            sequential,
        } => run_transform(
            &input,
            config.as_deref(),
            store.as_deref(),
            output.as_deref(),
            sequential,
        ),
        Commands::Query {
            ticker,
            store,
            start,
            end,
            json,
        } => run_query(&ticker, &store, start.as_deref(), end.as_deref(), json),
        Commands::Store { action } => match action {
            StoreAction::Status { store } => run_store_status(&store),
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { output } => run_config_init(output.as_deref()),
            ConfigAction::Show { config } => run_config_show(&config),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::from_file(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_transform(
    input: &Path,
    config_path: Option<&Path>,
    store_dir: Option<&Path>,
    output: Option<&Path>,
    sequential: bool,
) -> Result<()> {
    if store_dir.is_none() && output.is_none() {
        bail!("nothing to do: pass --store, --output, or both");
    }

    let mut config = load_config(config_path)?;
    if sequential {
        config.parallel = false;
    }
    let config_hash = config.config_hash()?;

    let panel = read_panel_csv(input)
        .with_context(|| format!("failed to read panel {}", input.display()))?;
    let pipeline = Pipeline::new(config)?;
    let result = pipeline.run(panel);

    print_report(&result.report);

    if let Some(dir) = store_dir {
        let store = ObservationStore::new(dir);
        let summary = store.insert(&result.rows, Some(&config_hash))?;
        println!(
            "Stored {} rows for {} ticker(s) in {}",
            summary.inserted,
            summary.tickers.len(),
            dir.display()
        );
    }

    if let Some(path) = output {
        write_transformed_csv(path, &result.rows)?;
        println!("Transformed table written to: {}", path.display());
    }

    if !result.report.all_succeeded() {
        bail!("{} ticker(s) failed", result.report.failed());
    }
    info!(config_hash = %config_hash, "transform complete");
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!();
    println!("=== Pipeline Report ===");
    println!("Tickers:        {}", report.succeeded() + report.failed());
    println!("Rows:           {}", report.total_rows());
    println!("Masked values:  {}", report.total_masked());
    println!();
    println!(
        "{:<8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Ticker", "In", "Out", "Dupes", "Masked", "Unfilled"
    );
    println!("{}", "-".repeat(53));
    for t in &report.tickers {
        println!(
            "{:<8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            t.ticker,
            t.input_rows,
            t.output_rows,
            t.dropped_duplicates,
            t.outliers.total_masked(),
            t.outliers.total_unfilled()
        );
    }
    for failure in &report.failures {
        println!("FAILED: {}: {}", failure.ticker, failure.error);
    }
    println!();
}

fn parse_date(arg: Option<&str>) -> Result<Option<NaiveDate>> {
    arg.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("dates must be YYYY-MM-DD")
}

fn run_query(
    ticker: &str,
    store_dir: &Path,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let store = ObservationStore::new(store_dir);
    let rows: Vec<TransformedObservation> = store
        .query(ticker)?
        .into_iter()
        .filter(|r| start.map_or(true, |s| r.date() >= s))
        .filter(|r| end.map_or(true, |e| r.date() <= e))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No stored rows for {ticker}");
        return Ok(());
    }

    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>7}",
        "Date", "Close", "SMA", "EMA", "BB Upper", "BB Lower", "RSI"
    );
    println!("{}", "-".repeat(73));
    for row in &rows {
        let d = &row.derived;
        println!(
            "{:<10} {:>10.2} {:>10} {:>10} {:>10} {:>10} {:>7}",
            row.date(),
            row.observation.close,
            fmt_opt(d.sma, 2),
            fmt_opt(d.ema, 2),
            fmt_opt(d.bollinger_upper, 2),
            fmt_opt(d.bollinger_lower, 2),
            fmt_opt(d.rsi, 1)
        );
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn run_store_status(store_dir: &Path) -> Result<()> {
    if !store_dir.exists() {
        println!("Store directory does not exist: {}", store_dir.display());
        return Ok(());
    }

    let store = ObservationStore::new(store_dir);
    let metas = store.status()?;
    if metas.is_empty() {
        println!("Store is empty: {}", store_dir.display());
        return Ok(());
    }

    let sizes: Vec<u64> = metas
        .iter()
        .map(|m| dir_size(&store.root().join(format!("ticker={}", m.ticker))))
        .collect();
    let total_size: u64 = sizes.iter().sum();

    println!("Store: {}", store.root().display());
    println!("Tickers: {}", metas.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<25} {:<12} {:<10} {:>10}",
        "Ticker", "Date Range", "Rows", "Config", "Size"
    );
    println!("{}", "-".repeat(69));
    for (meta, size) in metas.iter().zip(&sizes) {
        let config = meta
            .config_hash
            .as_deref()
            .map(|h| &h[..h.len().min(8)])
            .unwrap_or("-");
        println!(
            "{:<8} {:<25} {:<12} {:<10} {:>10}",
            meta.ticker,
            format!("{} to {}", meta.start_date, meta.end_date),
            format!("{} rows", meta.row_count),
            config,
            format_size(*size)
        );
    }

    Ok(())
}

fn run_config_init(output: Option<&Path>) -> Result<()> {
    let toml = PipelineConfig::default().to_toml()?;
    match output {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            std::fs::write(path, toml)?;
            println!("Default config written to: {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}

fn run_config_show(path: &Path) -> Result<()> {
    let config = PipelineConfig::from_file(path)?;
    println!("# config hash: {}", config.config_hash()?);
    print!("{}", config.to_toml()?);
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn fmt_opt_renders_missing_as_dash() {
        assert_eq!(fmt_opt(None, 2), "-");
        assert_eq!(fmt_opt(Some(12.346), 2), "12.35");
        assert_eq!(fmt_opt(Some(70.0), 1), "70.0");
    }

    #[test]
    fn parse_date_rejects_bad_format() {
        assert_eq!(
            parse_date(Some("2024-02-29")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_date(Some("29/02/2024")).is_err());
        assert_eq!(parse_date(None).unwrap(), None);
    }
}
