//! Multi-symbol fetch on the rayon pool.

use quantlens_core::data::{fetch_series, DataError, DataProvider, SeriesRequest};
use quantlens_core::domain::{Interval, Period, Series};
use rayon::prelude::*;
use tracing::debug;

/// Fetch every symbol concurrently, preserving request order.
///
/// The first provider failure fails the whole call; partial results are
/// never returned.
pub fn fetch_many(
    provider: &dyn DataProvider,
    symbols: &[String],
    period: Period,
    interval: Interval,
) -> Result<Vec<Series>, DataError> {
    debug!(provider = provider.name(), count = symbols.len(), %period, %interval, "fetching symbols");
    symbols
        .par_iter()
        .map(|symbol| fetch_series(provider, &SeriesRequest::new(symbol.as_str(), period, interval)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantlens_core::data::SyntheticProvider;

    #[test]
    fn keeps_request_order() {
        let provider = SyntheticProvider::new();
        let symbols = vec!["MSFT".to_string(), "AAPL".to_string(), "MSFT".to_string()];
        let series = fetch_many(&provider, &symbols, Period::OneMonth, Interval::OneDay).unwrap();
        let names: Vec<&str> = series.iter().map(Series::symbol).collect();
        assert_eq!(names, vec!["MSFT", "AAPL", "MSFT"]);
        assert_eq!(series[0], series[2]);
    }

    #[test]
    fn one_failure_fails_all() {
        let provider = SyntheticProvider::new();
        let symbols = vec!["MSFT".to_string(), String::new()];
        let err = fetch_many(&provider, &symbols, Period::OneMonth, Interval::OneDay).unwrap_err();
        assert!(matches!(err, DataError::InvalidSymbol(_)));
    }

    #[test]
    fn empty_request_fetches_nothing() {
        let provider = SyntheticProvider::new();
        assert!(fetch_many(&provider, &[], Period::OneYear, Interval::OneDay)
            .unwrap()
            .is_empty());
    }
}
