//! Single-symbol technical analysis: fetch, then run the indicator engine.

use serde::{Deserialize, Serialize};
use tracing::debug;

use quantlens_core::data::{fetch_series, DataError, DataProvider, SeriesRequest};
use quantlens_core::domain::{Interval, Period};
use quantlens_core::indicators::{compute_indicators_with, FillPolicy, IndicatorKind, IndicatorRow, IndicatorSet};

/// Indicator families computed when the caller names none.
pub const DEFAULT_INDICATORS: [IndicatorKind; 4] = [
    IndicatorKind::Sma,
    IndicatorKind::Ema,
    IndicatorKind::Rsi,
    IndicatorKind::Macd,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    pub symbol: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub interval: Interval,
    /// Family names; unknown ones are ignored, empty means the defaults.
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub policy: FillPolicy,
    /// Also emit the per-timestamp record view.
    #[serde(default)]
    pub include_rows: bool,
}

impl IndicatorRequest {
    pub fn new(symbol: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            period,
            interval,
            indicators: Vec::new(),
            policy: FillPolicy::default(),
            include_rows: false,
        }
    }

    /// Families to compute, in canonical order.
    pub fn kinds(&self) -> Vec<IndicatorKind> {
        if self.indicators.is_empty() {
            DEFAULT_INDICATORS.to_vec()
        } else {
            IndicatorKind::parse_list(&self.indicators)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub indicators: IndicatorSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<IndicatorRow>>,
}

/// Fetch the series and compute the requested indicators on it.
pub fn technical_analysis(
    provider: &dyn DataProvider,
    request: &IndicatorRequest,
) -> Result<IndicatorReport, DataError> {
    let series = fetch_series(
        provider,
        &SeriesRequest::new(request.symbol.as_str(), request.period, request.interval),
    )?;
    let indicators = compute_indicators_with(&series, &request.kinds(), request.policy);
    debug!(symbol = %request.symbol, lines = indicators.len(), bars = series.len(), "indicators computed");

    let rows = request.include_rows.then(|| indicators.rows(&series));
    Ok(IndicatorReport {
        symbol: request.symbol.clone(),
        indicators,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantlens_core::data::SyntheticProvider;

    #[test]
    fn empty_list_means_defaults() {
        let req = IndicatorRequest::new("SPY", Period::OneYear, Interval::OneDay);
        assert_eq!(req.kinds(), DEFAULT_INDICATORS.to_vec());
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut req = IndicatorRequest::new("SPY", Period::OneYear, Interval::OneDay);
        req.indicators = vec!["bollinger".into(), "vwap".into(), "sma".into()];
        assert_eq!(req.kinds(), vec![IndicatorKind::Sma, IndicatorKind::Bollinger]);

        req.indicators = vec!["vwap".into()];
        assert!(req.kinds().is_empty());
    }

    #[test]
    fn report_lines_match_series_length() {
        let provider = SyntheticProvider::new();
        let req = IndicatorRequest::new("SPY", Period::OneYear, Interval::OneDay);
        let report = technical_analysis(&provider, &req).unwrap();
        assert_eq!(
            report.indicators.names(),
            vec![
                "sma_20",
                "sma_50",
                "sma_200",
                "ema_20",
                "ema_50",
                "rsi_14",
                "macd_line",
                "macd_signal",
                "macd_histogram"
            ]
        );
        for line in report.indicators.lines() {
            assert_eq!(line.len(), 252);
        }
        assert!(report.rows.is_none());
    }

    #[test]
    fn strict_rows_carry_nulls() {
        let provider = SyntheticProvider::new();
        let mut req = IndicatorRequest::new("SPY", Period::OneMonth, Interval::OneDay);
        req.indicators = vec!["sma".into()];
        req.policy = FillPolicy::Strict;
        req.include_rows = true;
        let report = technical_analysis(&provider, &req).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["indicators"]["sma_200"][0].is_null());
        let rows = report.rows.unwrap();
        assert_eq!(rows[0].get("sma_20"), None);
        assert!(json["rows"][0]["Date"].is_string());
    }

    #[test]
    fn fetch_failure_is_hard() {
        let provider = SyntheticProvider::new();
        let req = IndicatorRequest::new("", Period::OneMonth, Interval::OneDay);
        assert!(technical_analysis(&provider, &req).is_err());
    }
}
