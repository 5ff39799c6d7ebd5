//! Simple and cumulative returns over a series.
//!
//! `r[0]` is 0 by convention; a zero prior close also yields 0 rather than
//! an infinite return. Cumulative returns compound the unrounded simple
//! returns: `cum[i] = prod(1 + r[j], j <= i) - 1`.

pub mod align;

pub use align::{align_returns, common_timestamps, AlignedReturns};

use crate::domain::{round_to, Series, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use serde::Serialize;

/// One (timestamp, return) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPoint {
    #[serde(rename = "Date", with = "crate::domain::bar::canonical_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Return")]
    pub value: f64,
}

/// Returns aligned 1:1 with the bars of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    symbol: String,
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<ReturnPoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Every return except the conventional leading zero.
    pub fn values_after_first(&self) -> Vec<f64> {
        self.points.iter().skip(1).map(|p| p.value).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn date_strings(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| p.timestamp.format(TIMESTAMP_FORMAT).to_string())
            .collect()
    }

    /// Same series with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> Self {
        Self {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .map(|p| ReturnPoint {
                    timestamp: p.timestamp,
                    value: round_to(p.value, decimals),
                })
                .collect(),
        }
    }
}

/// Simple returns of the close prices.
pub fn simple_returns(series: &Series) -> ReturnSeries {
    let bars = series.bars();
    let points = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let value = match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev) if prev != 0.0 => {
                    let r = (bar.close - prev) / prev;
                    if r.is_finite() {
                        r
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            };
            ReturnPoint {
                timestamp: bar.timestamp,
                value,
            }
        })
        .collect();
    ReturnSeries::new(series.symbol(), points)
}

/// Compounded returns since the first bar.
pub fn cumulative_returns(returns: &ReturnSeries) -> ReturnSeries {
    let mut growth = 1.0;
    let points = returns
        .points()
        .iter()
        .map(|p| {
            growth *= 1.0 + p.value;
            ReturnPoint {
                timestamp: p.timestamp,
                value: growth - 1.0,
            }
        })
        .collect();
    ReturnSeries::new(returns.symbol(), points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn series(closes: &[f64]) -> Series {
        Series::new("TEST", make_bars(closes))
    }

    #[test]
    fn reference_closes() {
        let r = simple_returns(&series(&[10.0, 11.0, 9.0, 12.0, 12.0]));
        let expected = [0.0, 0.10, -0.181818, 0.333333, 0.0];
        for (got, want) in r.values().iter().zip(expected) {
            assert_approx(*got, want, 1e-6);
        }

        let cum = cumulative_returns(&r);
        let expected = [0.0, 0.10, -0.10, 0.20, 0.20];
        for (got, want) in cum.values().iter().zip(expected) {
            assert_approx(*got, want, 1e-12);
        }
    }

    #[test]
    fn rounded_to_four_places() {
        let r = simple_returns(&series(&[10.0, 11.0, 9.0])).rounded(4);
        assert_eq!(r.values(), vec![0.0, 0.1, -0.1818]);
    }

    #[test]
    fn zero_prior_close_yields_zero() {
        let r = simple_returns(&series(&[0.0, 5.0, 10.0]));
        assert_eq!(r.values(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn single_bar_and_empty() {
        assert_eq!(simple_returns(&series(&[42.0])).values(), vec![0.0]);
        assert!(simple_returns(&series(&[])).is_empty());
        assert!(simple_returns(&series(&[42.0])).values_after_first().is_empty());
    }

    #[test]
    fn serializes_as_dated_records() {
        let r = simple_returns(&series(&[10.0, 11.0]));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["points"][1]["Date"], "2024-01-03 00:00:00");
    }
}
