//! CSV file provider.
//!
//! Reads `{dir}/{SYMBOL}.csv` with the header `Date,Open,High,Low,Close,Volume`.
//! `Date` is either `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`. Empty cells are
//! reported as gaps. Period and interval are ignored: the whole file is
//! returned.

use super::provider::{DataError, DataProvider, RawBar, SeriesRequest};
use crate::domain::{StockInfo, TIMESTAMP_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: Option<f64>,
    /// Some exporters write volume as a float (`1234.0`).
    #[serde(rename = "Volume")]
    volume: Option<f64>,
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError> {
        let path = self.path_for(&request.symbol);
        if !path.exists() {
            return Err(DataError::DataUnavailable {
                symbol: request.symbol.clone(),
                context: format!("no file at {}", path.display()),
            });
        }

        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            DataError::upstream(&request.symbol, format!("cannot open {}: {e}", path.display()))
        })?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| {
                DataError::ResponseFormatChanged(format!("{} row {}: {e}", path.display(), line + 2))
            })?;
            let timestamp = parse_timestamp(&row.date).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!(
                    "{} row {}: unparseable date '{}'",
                    path.display(),
                    line + 2,
                    row.date
                ))
            })?;
            bars.push(RawBar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.map(|v| v.max(0.0).round() as u64),
            });
        }

        debug!(symbol = %request.symbol, rows = bars.len(), path = %path.display(), "csv loaded");
        Ok(bars)
    }

    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError> {
        if !self.path_for(symbol).exists() {
            return Err(DataError::DataUnavailable {
                symbol: symbol.to_string(),
                context: "metadata".into(),
            });
        }
        Ok(StockInfo {
            short_name: Some(symbol.to_string()),
            ..StockInfo::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, Period};
    use std::fs;

    fn request(symbol: &str) -> SeriesRequest {
        SeriesRequest::new(symbol, Period::OneYear, Interval::OneDay)
    }

    #[test]
    fn reads_dates_and_gaps() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("SPY.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,100.0,101.0,99.0,100.5,1000\n\
             2024-01-03 00:00:00,,102.0,100.0,101.5,1100.0\n\
             2024-01-04,101.5,103.0,101.0,102.5,\n",
        )
        .unwrap();

        let provider = CsvProvider::new(dir.path());
        let bars = provider.fetch_bars(&request("SPY")).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp.to_string(), "2024-01-02 00:00:00");
        assert!(bars[1].open.is_none());
        assert_eq!(bars[1].volume, Some(1100));
        assert!(bars[2].volume.is_none());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        let err = provider.fetch_bars(&request("NOPE")).unwrap_err();
        assert!(err.is_unavailable());
        assert!(provider.fetch_info("NOPE").unwrap_err().is_unavailable());
    }

    #[test]
    fn bad_date_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "Date,Open,High,Low,Close,Volume\nyesterday,1,1,1,1,1\n",
        )
        .unwrap();
        let err = CsvProvider::new(dir.path()).fetch_bars(&request("BAD")).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
