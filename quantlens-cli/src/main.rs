//! QuantLens CLI: every command prints JSON to stdout.
//!
//! Commands:
//! - `data`: normalized OHLCV series, optionally with instrument metadata
//! - `indicators`: technical indicator lines for one symbol
//! - `test`: normality, correlation or mean-comparison test over returns
//! - `chart`: price, returns or correlation chart payload
//! - `summary`: plain-text data summary for the analyst collaborator
//!
//! Provider failures exit non-zero with the error on stderr. Soft failures
//! (unknown test type, wrong symbol count, ...) exit 0 with an `error` field.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use quantlens_analysis::{
    build_chart, multi_symbol_summary, run_hypothesis_test, technical_analysis, ChartRequest, HypothesisRequest,
    IndicatorRequest, ProviderSource, QuantLensConfig,
};
use quantlens_core::data::{fetch_info, fetch_series, DataProvider, SeriesRequest};
use quantlens_core::domain::{Interval, Period, Series, StockInfo};
use quantlens_core::indicators::FillPolicy;

#[derive(Parser)]
#[command(name = "quantlens", about = "QuantLens: stock data, indicators and statistical tests")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data source: yahoo, csv or synthetic. Overrides the config file.
    #[arg(long, global = true)]
    source: Option<ProviderSource>,

    /// Directory of `{SYMBOL}.csv` files for the csv source.
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a normalized OHLCV series.
    Data {
        symbol: String,

        /// Look-back period (1d, 5d, 1mo, ..., ytd, max).
        #[arg(long)]
        period: Option<Period>,

        /// Bar interval (1m, ..., 1d, 1wk, 1mo, 3mo).
        #[arg(long)]
        interval: Option<Interval>,

        /// Include instrument metadata.
        #[arg(long, default_value_t = false)]
        info: bool,
    },
    /// Compute technical indicators for one symbol.
    Indicators {
        symbol: String,

        #[arg(long)]
        period: Option<Period>,

        #[arg(long)]
        interval: Option<Interval>,

        /// Indicator families: sma, ema, rsi, macd, bollinger. Defaults to sma,ema,rsi,macd.
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,

        /// Emit null instead of 0 where an indicator is undefined.
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Also emit one record per timestamp.
        #[arg(long, default_value_t = false)]
        rows: bool,
    },
    /// Run a hypothesis test over daily returns.
    Test {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// normality, correlation or mean_comparison.
        #[arg(long)]
        test_type: String,

        #[arg(long)]
        period: Option<Period>,

        /// Significance level.
        #[arg(long)]
        alpha: Option<f64>,
    },
    /// Build a chart payload.
    Chart {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// price, returns or correlation.
        #[arg(long)]
        chart_type: String,

        #[arg(long)]
        period: Option<Period>,

        #[arg(long)]
        interval: Option<Interval>,

        /// Indicator families to overlay on a price chart.
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,
    },
    /// Print the plain-text data summary for one or more symbols.
    Summary {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long)]
        period: Option<Period>,
    },
}

#[derive(Serialize)]
struct DataOutput<'a> {
    symbol: &'a str,
    data: &'a Series,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<StockInfo>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let provider = config.build_provider().context("failed to set up data provider")?;
    let defaults = &config.defaults;
    debug!(source = %config.provider.source, "configuration loaded");

    match cli.command {
        Commands::Data {
            symbol,
            period,
            interval,
            info,
        } => {
            let request = SeriesRequest::new(
                symbol.as_str(),
                period.unwrap_or(defaults.period),
                interval.unwrap_or(defaults.interval),
            );
            run_data(provider.as_ref(), &request, info, cli.pretty)
        }
        Commands::Indicators {
            symbol,
            period,
            interval,
            indicators,
            strict,
            rows,
        } => {
            let mut request = IndicatorRequest::new(
                symbol,
                period.unwrap_or(defaults.period),
                interval.unwrap_or(defaults.interval),
            );
            request.indicators = indicators;
            request.policy = if strict { FillPolicy::Strict } else { FillPolicy::ZeroFill };
            request.include_rows = rows;
            let report = technical_analysis(provider.as_ref(), &request)?;
            print_json(&report, cli.pretty)
        }
        Commands::Test {
            symbols,
            test_type,
            period,
            alpha,
        } => {
            let request = HypothesisRequest::new(
                symbols,
                test_type,
                period.unwrap_or(defaults.period),
                alpha.unwrap_or(defaults.alpha),
            );
            let report = run_hypothesis_test(provider.as_ref(), &request)?;
            print_json(&report, cli.pretty)
        }
        Commands::Chart {
            symbols,
            chart_type,
            period,
            interval,
            indicators,
        } => {
            let request = ChartRequest::new(
                symbols,
                chart_type,
                period.unwrap_or(defaults.period),
                interval.unwrap_or(defaults.interval),
            )
            .with_indicators(indicators);
            let payload = build_chart(provider.as_ref(), &request)?;
            print_json(&payload, cli.pretty)
        }
        Commands::Summary { symbols, period } => {
            let text = multi_symbol_summary(provider.as_ref(), &symbols, period.unwrap_or(defaults.period))?;
            print!("{text}");
            Ok(())
        }
    }
}

/// Config file (or defaults), then command-line overrides.
fn load_config(cli: &Cli) -> Result<QuantLensConfig> {
    let mut config = match &cli.config {
        Some(path) => QuantLensConfig::from_file(path)?,
        None => QuantLensConfig::default(),
    };
    if let Some(source) = cli.source {
        config.provider.source = source;
    }
    if let Some(dir) = &cli.csv_dir {
        config.provider.csv_dir = Some(dir.clone());
    }
    Ok(config)
}

fn run_data(provider: &dyn DataProvider, request: &SeriesRequest, with_info: bool, pretty: bool) -> Result<()> {
    let series = fetch_series(provider, request)?;
    let info = if with_info {
        Some(fetch_info(provider, &request.symbol)?)
    } else {
        None
    };
    print_json(
        &DataOutput {
            symbol: &request.symbol,
            data: &series,
            info,
        },
        pretty,
    )
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
