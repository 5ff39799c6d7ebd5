//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API and instrument metadata from
//! the v10 quote-summary API. Handles retries with exponential backoff,
//! request timeouts and response parsing.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; the CSV provider is the fallback when it is unavailable.

use super::provider::{DataError, DataProvider, RawBar, SeriesRequest};
use crate::domain::StockInfo;
use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const QUOTE_SUMMARY_MODULES: &str = "price,summaryDetail,assetProfile";

// ── Chart API ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

// ── Quote-summary API ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryModules {
    price: PriceModule,
    summary_detail: SummaryDetailModule,
    asset_profile: AssetProfileModule,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Default, Deserialize)]
struct RawNumber {
    raw: Option<f64>,
}

fn raw(value: &Option<RawNumber>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PriceModule {
    short_name: Option<String>,
    long_name: Option<String>,
    market_cap: Option<RawNumber>,
    regular_market_price: Option<RawNumber>,
    regular_market_change: Option<RawNumber>,
    regular_market_change_percent: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryDetailModule {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawNumber>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawNumber>,
    #[serde(rename = "dividendYield")]
    dividend_yield: Option<RawNumber>,
    #[serde(rename = "fiftyTwoWeekHigh")]
    fifty_two_week_high: Option<RawNumber>,
    #[serde(rename = "fiftyTwoWeekLow")]
    fifty_two_week_low: Option<RawNumber>,
    #[serde(rename = "averageVolume")]
    average_volume: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetProfileModule {
    sector: Option<String>,
    industry: Option<String>,
    website: Option<String>,
}

// ── Provider ─────────────────────────────────────────────────────────

/// Upper bound on any single retry sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connection settings for [`YahooProvider`].
#[derive(Debug, Clone)]
pub struct YahooSettings {
    pub base_url: String,
    /// Whole-request timeout; a hung fetch surfaces as `DataError::Upstream`.
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Sleep before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped at
/// [`MAX_BACKOFF`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    settings: YahooSettings,
}

impl YahooProvider {
    pub fn new(settings: YahooSettings) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::upstream("*", format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    fn chart_url(&self, request: &SeriesRequest) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&includePrePost=false",
            self.settings.base_url, request.symbol, request.period, request.interval
        )
    }

    fn summary_url(&self, symbol: &str) -> String {
        format!(
            "{}/v10/finance/quoteSummary/{symbol}?modules={QUOTE_SUMMARY_MODULES}",
            self.settings.base_url
        )
    }

    /// GET `url` and decode the JSON body, retrying transient failures.
    ///
    /// 404 maps to `not_found`; 401/403 are terminal; 429, 5xx, connect
    /// errors and timeouts are retried with exponential backoff.
    fn get_json<T: DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
        not_found: impl Fn() -> DataError,
    ) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.settings.base_delay, attempt);
                warn!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying provider request");
                std::thread::sleep(delay);
            }

            debug!(symbol, url, "provider request");
            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => {
                    last_error = Some(DataError::upstream(
                        symbol,
                        format!("request timed out after {}s", self.settings.timeout.as_secs()),
                    ));
                    continue;
                }
                Err(e) if e.is_connect() => {
                    last_error = Some(DataError::upstream(symbol, format!("network unreachable: {e}")));
                    continue;
                }
                Err(e) => return Err(DataError::upstream(symbol, e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(not_found());
            }

            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(DataError::upstream(
                    symbol,
                    format!("provider refused the request (HTTP {status})"),
                ));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::upstream(
                    symbol,
                    format!("rate limited by provider (retry after {retry_after}s)"),
                ));
                continue;
            }

            if status.is_server_error() {
                last_error = Some(DataError::upstream(symbol, format!("HTTP {status}")));
                continue;
            }

            if !status.is_success() {
                return Err(DataError::upstream(symbol, format!("HTTP {status}")));
            }

            return resp.json::<T>().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            });
        }

        Err(last_error.unwrap_or_else(|| DataError::upstream(symbol, "max retries exceeded")))
    }

    /// Parse the chart API response into raw rows.
    fn parse_chart(request: &SeriesRequest, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::unavailable(request));
            }
            (None, Some(err)) => {
                return Err(DataError::upstream(
                    &request.symbol,
                    format!("{}: {}", err.code, err.description),
                ));
            }
            (None, None) => return Ok(Vec::new()),
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(Vec::new());
        };

        // A valid symbol with nothing in range comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let gmt_offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let timestamp = exchange_local(ts, gmt_offset, request.interval.is_intraday())
                .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

            let mut open = quote.open.get(i).copied().flatten();
            let mut high = quote.high.get(i).copied().flatten();
            let mut low = quote.low.get(i).copied().flatten();
            let mut close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Auto-adjust for splits and dividends when an adjusted close is reported.
            let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());
            if let (Some(adj), Some(c)) = (adj_close, close) {
                if c != 0.0 {
                    let ratio = adj / c;
                    open = open.map(|v| v * ratio);
                    high = high.map(|v| v * ratio);
                    low = low.map(|v| v * ratio);
                    close = Some(adj);
                }
            }

            bars.push(RawBar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(bars)
    }

    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<StockInfo, DataError> {
        let modules = match (resp.quote_summary.result, resp.quote_summary.error) {
            (Some(result), _) => result.into_iter().next().unwrap_or_default(),
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::DataUnavailable {
                    symbol: symbol.to_string(),
                    context: "metadata".into(),
                });
            }
            (None, Some(err)) => {
                return Err(DataError::upstream(symbol, format!("{}: {}", err.code, err.description)));
            }
            (None, None) => SummaryModules::default(),
        };

        let SummaryModules {
            price,
            summary_detail: detail,
            asset_profile: profile,
        } = modules;

        Ok(StockInfo {
            short_name: price.short_name,
            long_name: price.long_name,
            sector: profile.sector,
            industry: profile.industry,
            website: profile.website,
            market_cap: raw(&price.market_cap),
            trailing_pe: raw(&detail.trailing_pe),
            forward_pe: raw(&detail.forward_pe),
            dividend_yield: raw(&detail.dividend_yield).map(|y| y * 100.0),
            fifty_two_week_high: raw(&detail.fifty_two_week_high),
            fifty_two_week_low: raw(&detail.fifty_two_week_low),
            average_volume: raw(&detail.average_volume),
            regular_market_price: raw(&price.regular_market_price),
            regular_market_change: raw(&price.regular_market_change),
            regular_market_change_percent: raw(&price.regular_market_change_percent),
        })
    }
}

/// Convert a UTC epoch to exchange-local naive time. Daily and longer bars
/// are pinned to local midnight.
fn exchange_local(epoch: i64, gmt_offset: i64, intraday: bool) -> Option<NaiveDateTime> {
    let local = DateTime::from_timestamp(epoch + gmt_offset, 0)?.naive_utc();
    if intraday {
        Some(local)
    } else {
        local.date().and_hms_opt(0, 0, 0)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError> {
        let url = self.chart_url(request);
        let chart: ChartResponse =
            self.get_json(&request.symbol, &url, || DataError::unavailable(request))?;
        let bars = Self::parse_chart(request, chart)?;
        debug!(symbol = %request.symbol, rows = bars.len(), "chart response parsed");
        Ok(bars)
    }

    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError> {
        let url = self.summary_url(symbol);
        let summary: SummaryResponse = self.get_json(symbol, &url, || DataError::DataUnavailable {
            symbol: symbol.to_string(),
            context: "metadata".into(),
        })?;
        Self::parse_summary(symbol, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, Period};

    fn request(interval: Interval) -> SeriesRequest {
        SeriesRequest::new("SPY", Period::FiveDays, interval)
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 7), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, 33), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn chart_url_uses_range_tokens() {
        let provider = YahooProvider::new(YahooSettings::default()).unwrap();
        let url = provider.chart_url(&SeriesRequest::new("AAPL", Period::SixMonths, Interval::OneHour));
        assert!(url.ends_with("/v8/finance/chart/AAPL?range=6mo&interval=1h&includePrePost=false"));
    }

    #[test]
    fn parses_daily_chart_with_adjustment() {
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{
                "quote":[{"open":[100.0,null,102.0],"high":[105.0,null,106.0],
                          "low":[99.0,null,101.0],"close":[104.0,null,105.0],
                          "volume":[1000,null,3000]}],
                "adjclose":[{"adjclose":[52.0,null,52.5]}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let bars = YahooProvider::parse_chart(&request(Interval::OneDay), resp).unwrap();

        assert_eq!(bars.len(), 3);
        // 2024-01-02 14:30 UTC is 09:30 New York; daily bars pin to midnight.
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-02 00:00:00");
        assert_eq!(bars[0].close, Some(52.0));
        assert_eq!(bars[0].open, Some(50.0));
        assert!(bars[1].close.is_none());
        assert_eq!(bars[2].volume, Some(3000));
    }

    #[test]
    fn intraday_timestamps_keep_time_of_day() {
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800],
            "indicators":{"quote":[{"open":[1.0],"high":[1.0],"low":[1.0],"close":[1.0],"volume":[1]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let bars = YahooProvider::parse_chart(&request(Interval::FiveMinutes), resp).unwrap();
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-02 09:30:00");
    }

    #[test]
    fn not_found_maps_to_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let err = YahooProvider::parse_chart(&request(Interval::OneDay), resp).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn missing_timestamps_yield_no_rows() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let bars = YahooProvider::parse_chart(&request(Interval::OneDay), resp).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn parses_quote_summary() {
        let body = r#"{"quoteSummary":{"result":[{
            "price":{"shortName":"Apple Inc.","longName":"Apple Inc.",
                     "marketCap":{"raw":3.0e12,"fmt":"3T"},
                     "regularMarketPrice":{"raw":190.5},"regularMarketChange":{"raw":-1.25},
                     "regularMarketChangePercent":{"raw":-0.0065}},
            "summaryDetail":{"trailingPE":{"raw":31.2},"dividendYield":{"raw":0.0051},
                             "fiftyTwoWeekHigh":{"raw":199.62},"fiftyTwoWeekLow":{"raw":164.08},
                             "averageVolume":{"raw":52000000}},
            "assetProfile":{"sector":"Technology","industry":"Consumer Electronics"}}],
            "error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(body).unwrap();
        let info = YahooProvider::parse_summary("AAPL", resp).unwrap();

        assert_eq!(info.short_name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.sector.as_deref(), Some("Technology"));
        assert_eq!(info.market_cap, Some(3.0e12));
        assert!((info.dividend_yield.unwrap() - 0.51).abs() < 1e-9);
        assert!(info.forward_pe.is_none());
        assert!(info.website.is_none());
    }
}
