//! Series normalization: raw provider rows → canonical `Series`.
//!
//! Rows are sorted (stable) ascending by timestamp with the first occurrence
//! of a duplicate timestamp kept. Rows missing any OHLC value are dropped, a
//! missing volume becomes 0, and every price is rounded to 2 decimals.

use super::provider::{DataError, DataProvider, RawBar, SeriesRequest};
use crate::domain::{round_to, Bar, Series, StockInfo};
use tracing::{debug, warn};

/// Decimal places kept on normalized prices.
pub const PRICE_DECIMALS: i32 = 2;

/// Reject symbols that cannot name an instrument on any provider.
pub fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() || trimmed.len() != symbol.len() || symbol.contains(['/', '\\']) {
        return Err(DataError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

/// Turn raw rows into a canonical series.
///
/// Fails with `DataUnavailable` when nothing usable remains.
pub fn normalize(request: &SeriesRequest, raw: Vec<RawBar>) -> Result<Series, DataError> {
    let total = raw.len();
    let bars: Vec<Bar> = raw
        .into_iter()
        .filter_map(|row| {
            let (open, high, low, close) = match (row.open, row.high, row.low, row.close) {
                (Some(o), Some(h), Some(l), Some(c)) if [o, h, l, c].iter().all(|v| v.is_finite()) => {
                    (o, h, l, c)
                }
                _ => return None,
            };
            Some(Bar {
                timestamp: row.timestamp,
                open: round_to(open, PRICE_DECIMALS),
                high: round_to(high, PRICE_DECIMALS),
                low: round_to(low, PRICE_DECIMALS),
                close: round_to(close, PRICE_DECIMALS),
                volume: row.volume.unwrap_or(0),
            })
        })
        .collect();

    let dropped = total - bars.len();
    if dropped > 0 {
        warn!(symbol = %request.symbol, dropped, total, "dropped rows with missing prices");
    }

    let series = Series::new(request.symbol.clone(), bars);
    if series.is_empty() {
        return Err(DataError::unavailable(request));
    }

    debug!(
        symbol = %request.symbol,
        bars = series.len(),
        first = %series.first().map(|b| b.date_string()).unwrap_or_default(),
        last = %series.last().map(|b| b.date_string()).unwrap_or_default(),
        "series normalized"
    );
    Ok(series)
}

/// Fetch and normalize one series. The single entry point every operation
/// uses to obtain price data.
pub fn fetch_series(provider: &dyn DataProvider, request: &SeriesRequest) -> Result<Series, DataError> {
    validate_symbol(&request.symbol)?;
    debug!(
        provider = provider.name(),
        symbol = %request.symbol,
        period = %request.period,
        interval = %request.interval,
        "fetching series"
    );
    let raw = provider.fetch_bars(request)?;
    normalize(request, raw)
}

/// Fetch descriptive metadata for one symbol.
pub fn fetch_info(provider: &dyn DataProvider, symbol: &str) -> Result<StockInfo, DataError> {
    validate_symbol(symbol)?;
    provider.fetch_info(symbol)
}
