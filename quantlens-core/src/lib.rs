//! QuantLens Core: market data, normalization, indicators, returns.
//!
//! This crate contains the pure computational leaves of QuantLens:
//! - Domain types (bars, series, request vocabulary, instrument metadata)
//! - Provider boundary (Yahoo Finance, CSV files, synthetic walks, TTL cache)
//! - Series normalizer shared by every operation
//! - Indicator engine (SMA, EMA, RSI, MACD, Bollinger)
//! - Return calculator and multi-symbol alignment

pub mod data;
pub mod domain;
pub mod indicators;
pub mod returns;

pub use data::{fetch_info, fetch_series, DataError, DataProvider, SeriesRequest};
pub use domain::{Bar, Interval, Period, Series, StockInfo};
pub use indicators::{compute_indicators, compute_indicators_with, FillPolicy, IndicatorKind, IndicatorSet};
pub use returns::{cumulative_returns, simple_returns, ReturnSeries};
