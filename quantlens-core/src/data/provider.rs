//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV
//! files, synthetic walks) so the analytical core never talks to a network
//! client directly and tests can run fully offline.

use crate::domain::{Interval, Period, StockInfo};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw OHLCV row from a data provider, before normalization.
///
/// Providers report gaps as missing values; the normalizer decides what to do
/// with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawBar {
    /// Fully populated row.
    pub fn complete(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }
}

/// What to fetch: one instrument over a period at an interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesRequest {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

impl SeriesRequest {
    pub fn new(symbol: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            interval,
        }
    }
}

/// Hard failures at the provider boundary.
///
/// These always propagate to the request layer; they are never folded into a
/// result object.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data found for {symbol} ({context}); symbol may be delisted or mistyped")]
    DataUnavailable { symbol: String, context: String },

    #[error("upstream provider error for {symbol}: {reason}")]
    Upstream { symbol: String, reason: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),
}

impl DataError {
    pub fn unavailable(request: &SeriesRequest) -> Self {
        DataError::DataUnavailable {
            symbol: request.symbol.clone(),
            context: format!("period={}, interval={}", request.period, request.interval),
        }
    }

    pub fn upstream(symbol: &str, reason: impl Into<String>) -> Self {
        DataError::Upstream {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the "nothing to return" class, as opposed to a failed call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DataError::DataUnavailable { .. } | DataError::InvalidSymbol(_))
    }
}

/// Trait for data providers.
///
/// Implementations are stateless from the caller's perspective: construct one
/// per call site or inject a shared reference, no global client exists.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch raw OHLCV rows for `request`. An empty vector is a valid answer;
    /// the normalizer turns it into `DataUnavailable`.
    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError>;

    /// Fetch descriptive metadata for `symbol`.
    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError> {
        (**self).fetch_bars(request)
    }

    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError> {
        (**self).fetch_info(symbol)
    }
}
