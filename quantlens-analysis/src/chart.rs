//! Chart aggregator: price, returns and correlation-matrix payloads.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use quantlens_core::data::{DataError, DataProvider};
use quantlens_core::domain::{round_to, Interval, Period, Series};
use quantlens_core::indicators::{compute_indicators, IndicatorKind, IndicatorSet};
use quantlens_core::returns::{align_returns, cumulative_returns, simple_returns, ReturnSeries};

use crate::error::AnalysisError;
use crate::fetch::fetch_many;
use crate::stats::pearson;

/// Decimal places on chart returns.
pub const RETURN_DECIMALS: i32 = 4;
/// Decimal places on correlation cells.
pub const CORRELATION_DECIMALS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Price,
    Returns,
    Correlation,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [ChartType::Price, ChartType::Returns, ChartType::Correlation];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Price => "price",
            ChartType::Returns => "returns",
            ChartType::Correlation => "correlation",
        }
    }
}

impl FromStr for ChartType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AnalysisError::UnknownChartType(s.to_string()))
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound chart request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub symbols: Vec<String>,
    pub chart_type: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub interval: Interval,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl ChartRequest {
    pub fn new(symbols: Vec<String>, chart_type: impl Into<String>, period: Period, interval: Interval) -> Self {
        Self {
            symbols,
            chart_type: chart_type.into(),
            period,
            interval,
            indicators: Vec::new(),
        }
    }

    pub fn with_indicators(mut self, indicators: Vec<String>) -> Self {
        self.indicators = indicators;
        self
    }
}

/// One symbol's price chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEntry {
    pub symbol: String,
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub volumes: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<IndicatorSet>,
}

/// One symbol's return chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsEntry {
    pub symbol: String,
    pub dates: Vec<String>,
    pub daily_returns: Vec<f64>,
    pub cumulative_returns: Vec<f64>,
}

/// One cell of the correlation heat-map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationCell {
    pub x: String,
    pub y: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Price(Vec<PriceEntry>),
    Returns(Vec<ReturnsEntry>),
    Correlation(Vec<CorrelationCell>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ready(ChartData),
    Failed(AnalysisError),
}

/// Request echo plus data, or `data: []` and `error` on a soft failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    pub chart_type: String,
    pub symbols: Vec<String>,
    pub period: Period,
    pub interval: Interval,
    pub outcome: ChartOutcome,
}

impl ChartPayload {
    pub fn data(&self) -> Option<&ChartData> {
        match &self.outcome {
            ChartOutcome::Ready(data) => Some(data),
            ChartOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match &self.outcome {
            ChartOutcome::Ready(_) => None,
            ChartOutcome::Failed(error) => Some(error),
        }
    }
}

impl Serialize for ChartPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let failed = matches!(self.outcome, ChartOutcome::Failed(_));
        let mut map = serializer.serialize_map(Some(if failed { 6 } else { 5 }))?;
        map.serialize_entry("chart_type", &self.chart_type)?;
        map.serialize_entry("symbols", &self.symbols)?;
        map.serialize_entry("period", &self.period)?;
        map.serialize_entry("interval", &self.interval)?;
        match &self.outcome {
            ChartOutcome::Ready(data) => map.serialize_entry("data", data)?,
            ChartOutcome::Failed(error) => {
                map.serialize_entry("data", &[(); 0])?;
                map.serialize_entry("error", &error.to_string())?;
            }
        }
        map.end()
    }
}

/// Build a chart payload.
///
/// An unknown chart type fails softly before anything is fetched; provider
/// failures propagate.
pub fn build_chart(provider: &dyn DataProvider, request: &ChartRequest) -> Result<ChartPayload, DataError> {
    let outcome = match request.chart_type.parse::<ChartType>() {
        Ok(chart) => {
            let series = fetch_many(provider, &request.symbols, request.period, request.interval)?;
            let data = match chart {
                ChartType::Price => ChartData::Price(price_entries(&series, &request.indicators)),
                ChartType::Returns => ChartData::Returns(returns_entries(&series)),
                ChartType::Correlation => ChartData::Correlation(correlation_cells(&series)),
            };
            debug!(chart = %chart, symbols = series.len(), "chart built");
            ChartOutcome::Ready(data)
        }
        Err(error) => {
            warn!(chart = %request.chart_type, %error, "chart request failed");
            ChartOutcome::Failed(error)
        }
    };

    Ok(ChartPayload {
        chart_type: request.chart_type.clone(),
        symbols: request.symbols.clone(),
        period: request.period,
        interval: request.interval,
        outcome,
    })
}

fn price_entries(series: &[Series], indicators: &[String]) -> Vec<PriceEntry> {
    let kinds = IndicatorKind::parse_list(indicators);
    series
        .iter()
        .map(|s| PriceEntry {
            symbol: s.symbol().to_string(),
            dates: s.date_strings(),
            prices: s.closes(),
            volumes: s.volumes(),
            indicators: (!indicators.is_empty()).then(|| compute_indicators(s, &kinds)),
        })
        .collect()
}

fn returns_entries(series: &[Series]) -> Vec<ReturnsEntry> {
    series
        .iter()
        .map(|s| {
            let daily = simple_returns(s);
            let cumulative = cumulative_returns(&daily);
            ReturnsEntry {
                symbol: s.symbol().to_string(),
                dates: daily.date_strings(),
                daily_returns: daily.rounded(RETURN_DECIMALS).values(),
                cumulative_returns: cumulative.rounded(RETURN_DECIMALS).values(),
            }
        })
        .collect()
}

/// Full n×n matrix over the common date index, row-major.
fn correlation_cells(series: &[Series]) -> Vec<CorrelationCell> {
    let returns: Vec<ReturnSeries> = series.iter().map(simple_returns).collect();
    let aligned = align_returns(&returns);
    let n = aligned.symbols.len();

    let mut matrix = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let value = match pearson(&aligned.columns[i], &aligned.columns[j]) {
                Ok(c) => round_to(c.r, CORRELATION_DECIMALS),
                Err(error) => {
                    debug!(x = %aligned.symbols[i], y = %aligned.symbols[j], %error, "undefined correlation");
                    0.0
                }
            };
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    let mut cells = Vec::with_capacity(n * n);
    for (i, x) in aligned.symbols.iter().enumerate() {
        for (j, y) in aligned.symbols.iter().enumerate() {
            cells.push(CorrelationCell {
                x: x.clone(),
                y: y.clone(),
                value: matrix[i][j],
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantlens_core::domain::Bar;

    fn series(symbol: &str, closes: &[f64], start_day: u32) -> Series {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, start_day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 100 * (i as u64 + 1),
            })
            .collect();
        Series::new(symbol, bars)
    }

    #[test]
    fn chart_tokens() {
        assert_eq!("returns".parse::<ChartType>().unwrap(), ChartType::Returns);
        assert_eq!(
            "pie".parse::<ChartType>(),
            Err(AnalysisError::UnknownChartType("pie".into()))
        );
    }

    #[test]
    fn returns_entry_rounds_to_four_places() {
        let entries = returns_entries(&[series("A", &[10.0, 11.0, 9.0, 12.0, 12.0], 1)]);
        assert_eq!(entries[0].daily_returns, vec![0.0, 0.1, -0.1818, 0.3333, 0.0]);
        assert_eq!(entries[0].cumulative_returns, vec![0.0, 0.1, -0.1, 0.2, 0.2]);
        assert_eq!(entries[0].dates[0], "2024-01-01 00:00:00");
    }

    #[test]
    fn returns_entry_rounds_exact_halves_to_even() {
        // 32 -> 33 is exactly 0.03125
        let entries = returns_entries(&[series("A", &[32.0, 33.0], 1)]);
        assert_eq!(entries[0].daily_returns, vec![0.0, 0.0312]);
        assert_eq!(entries[0].cumulative_returns, vec![0.0, 0.0312]);
    }

    #[test]
    fn price_entry_omits_indicators_unless_requested() {
        let s = series("A", &[10.0, 11.0, 12.0], 1);
        let bare = price_entries(std::slice::from_ref(&s), &[]);
        assert!(bare[0].indicators.is_none());
        let json = serde_json::to_value(&bare[0]).unwrap();
        assert!(json.get("indicators").is_none());
        assert_eq!(json["volumes"], serde_json::json!([100, 200, 300]));

        let with = price_entries(&[s], &["rsi".to_string(), "bogus".to_string()]);
        let set = with[0].indicators.as_ref().unwrap();
        assert_eq!(set.names(), vec!["rsi_14"]);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let a = series("A", &[10.0, 11.0, 9.0, 12.0, 12.0, 13.0], 1);
        let b = series("B", &[20.0, 21.0, 19.5, 22.0, 23.0, 22.0], 1);
        let c = series("C", &[5.0, 5.0, 5.0, 5.0, 5.0, 5.0], 1);
        let cells = correlation_cells(&[a, b, c]);
        assert_eq!(cells.len(), 9);
        let at = |x: &str, y: &str| {
            cells
                .iter()
                .find(|cell| cell.x == x && cell.y == y)
                .map(|cell| cell.value)
                .unwrap()
        };
        for s in ["A", "B", "C"] {
            assert_eq!(at(s, s), 1.0);
        }
        assert_eq!(at("A", "B"), at("B", "A"));
        assert!(at("A", "B") > 0.5);
        // Constant prices have no defined correlation
        assert_eq!(at("A", "C"), 0.0);
    }

    #[test]
    fn correlation_uses_common_dates() {
        // B starts two days later; only the overlap is correlated
        let a = series("A", &[10.0, 12.0, 11.0, 13.0, 12.5, 14.0], 1);
        let b = series("B", &[11.0, 13.0, 12.5, 14.0], 3);
        let cells = correlation_cells(&[a, b]);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], CorrelationCell { x: "A".into(), y: "A".into(), value: 1.0 });
        assert!(cells[1].value.abs() <= 1.0);
    }

    #[test]
    fn failed_payload_has_empty_data() {
        let payload = ChartPayload {
            chart_type: "pie".into(),
            symbols: vec!["A".into()],
            period: Period::OneMonth,
            interval: Interval::OneDay,
            outcome: ChartOutcome::Failed(AnalysisError::UnknownChartType("pie".into())),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["data"], serde_json::json!([]));
        assert_eq!(json["error"], "unknown chart type: pie");
        assert_eq!(json["period"], "1mo");
        assert_eq!(json["interval"], "1d");
    }
}
