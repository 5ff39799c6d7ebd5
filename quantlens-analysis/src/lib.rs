//! QuantLens Analysis: statistics, hypothesis tests, charts, summaries.
//!
//! This crate builds on `quantlens-core` to provide:
//! - Special functions and statistical tests (Shapiro–Wilk, Pearson, Welch)
//! - Hypothesis engine with soft-failure result objects
//! - Chart aggregator (price, returns, correlation matrix)
//! - Single-symbol technical analysis
//! - Plain-text data summaries for the analyst collaborator
//! - TOML configuration and provider construction

pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hypothesis;
pub mod stats;
pub mod summary;
pub mod technical;

pub use chart::{build_chart, ChartData, ChartOutcome, ChartPayload, ChartRequest, ChartType, CorrelationCell, PriceEntry, ReturnsEntry};
pub use config::{ConfigError, ProviderConfig, ProviderSource, QuantLensConfig, RequestDefaults, MAX_RETRIES};
pub use error::AnalysisError;
pub use fetch::fetch_many;
pub use hypothesis::{
    run_hypothesis_test, Finding, HypothesisReport, HypothesisRequest, TestOutcome, TestType, TestVerdict,
    DEFAULT_ALPHA,
};
pub use stats::{pearson, shapiro_wilk, welch_t_test, Correlation, ShapiroWilk, StatsError, WelchTTest};
pub use summary::{data_summary, multi_symbol_summary, AnalysisRequest};
pub use technical::{technical_analysis, IndicatorReport, IndicatorRequest, DEFAULT_INDICATORS};
