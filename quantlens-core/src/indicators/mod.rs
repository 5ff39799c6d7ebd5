//! Technical indicator engine.
//!
//! Every indicator implements [`Indicator`]: a full bar slice in, one value
//! per bar out, with `f64::NAN` marking warm-up. The engine rounds the raw
//! output to 2 decimals and records where each line becomes valid; the
//! [`FillPolicy`] then decides whether warm-up is emitted as `0` or `null`.
//!
//! Multi-line indicators (MACD, Bollinger) are exposed as one named instance
//! per component so the single-series trait stays unchanged.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::{ema_of_series, Ema};
pub use macd::{Macd, MacdComponent};
pub use rsi::Rsi;
pub use sma::{sma_of_series, Sma};

use crate::domain::{round_to, Bar, Series, TokenError, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Decimal places kept on indicator output.
pub const INDICATOR_DECIMALS: i32 = 2;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. Positions without enough history are `f64::NAN`.
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Output name on the wire (e.g. "sma_20", "macd_signal").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Requestable indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
}

impl IndicatorKind {
    /// Also the output order of an indicator set.
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Bollinger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Bollinger => "bollinger",
        }
    }

    /// The concrete lines this family emits.
    pub fn indicators(self) -> Vec<Box<dyn Indicator>> {
        match self {
            IndicatorKind::Sma => vec![
                Box::new(Sma::new(20)),
                Box::new(Sma::new(50)),
                Box::new(Sma::new(200)),
            ],
            IndicatorKind::Ema => vec![Box::new(Ema::new(20)), Box::new(Ema::new(50))],
            IndicatorKind::Rsi => vec![Box::new(Rsi::new(14))],
            IndicatorKind::Macd => vec![
                Box::new(Macd::standard(MacdComponent::Line)),
                Box::new(Macd::standard(MacdComponent::Signal)),
                Box::new(Macd::standard(MacdComponent::Histogram)),
            ],
            IndicatorKind::Bollinger => vec![
                Box::new(Bollinger::standard(BollingerBand::High)),
                Box::new(Bollinger::standard(BollingerBand::Mid)),
                Box::new(Bollinger::standard(BollingerBand::Low)),
            ],
        }
    }

    /// Parse a free-form name list. Unknown names are dropped, duplicates
    /// collapse, and the result is in canonical output order.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<IndicatorKind> {
        let requested: Vec<IndicatorKind> = names
            .iter()
            .filter_map(|n| n.as_ref().trim().parse().ok())
            .collect();
        IndicatorKind::ALL
            .into_iter()
            .filter(|k| requested.contains(k))
            .collect()
    }
}

impl FromStr for IndicatorKind {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TokenError {
                kind: "indicator",
                token: s.to_string(),
                expected: "sma,ema,rsi,macd,bollinger".into(),
            })
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How warm-up positions are emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Warm-up emitted as `0`.
    #[default]
    ZeroFill,
    /// Warm-up emitted as `null`.
    Strict,
}

/// One computed indicator line, rounded, with NaN where no value exists.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorLine {
    name: String,
    values: Vec<f64>,
    valid_from: usize,
}

impl IndicatorLine {
    /// Run `indicator` over `bars`. Everything before its lookback is
    /// undefined.
    pub fn compute(indicator: &dyn Indicator, bars: &[Bar]) -> Self {
        let valid_from = indicator.lookback().min(bars.len());
        let values: Vec<f64> = indicator
            .compute(bars)
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                if i >= valid_from && v.is_finite() {
                    round_to(v, INDICATOR_DECIMALS)
                } else {
                    f64::NAN
                }
            })
            .collect();
        Self {
            name: indicator.name().to_string(),
            values,
            valid_from,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the first defined value; equals `len()` if there is none.
    pub fn valid_from(&self) -> usize {
        self.valid_from
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rounded values with `NaN` at undefined positions.
    pub fn raw(&self) -> &[f64] {
        &self.values
    }

    pub fn value(&self, index: usize, policy: FillPolicy) -> Option<f64> {
        let v = *self.values.get(index)?;
        match (v.is_finite(), policy) {
            (true, _) => Some(v),
            (false, FillPolicy::ZeroFill) => Some(0.0),
            (false, FillPolicy::Strict) => None,
        }
    }

    pub fn zero_filled(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| if v.is_finite() { *v } else { 0.0 })
            .collect()
    }

    pub fn strict(&self) -> Vec<Option<f64>> {
        self.values.iter().map(|v| v.is_finite().then_some(*v)).collect()
    }
}

/// Indicator name → values, index-aligned with the source series.
///
/// Serializes as a JSON object in canonical family order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorSet {
    policy: FillPolicy,
    lines: Vec<IndicatorLine>,
}

impl IndicatorSet {
    pub fn new(policy: FillPolicy, lines: Vec<IndicatorLine>) -> Self {
        Self { policy, lines }
    }

    pub fn policy(&self) -> FillPolicy {
        self.policy
    }

    pub fn with_policy(mut self, policy: FillPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn lines(&self) -> &[IndicatorLine] {
        &self.lines
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorLine> {
        self.lines.iter().find(|l| l.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// One record per bar: the timestamp plus every line's value there.
    pub fn rows(&self, series: &Series) -> Vec<IndicatorRow> {
        series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                timestamp: bar.timestamp,
                values: self
                    .lines
                    .iter()
                    .map(|l| (l.name.clone(), l.value(i, self.policy)))
                    .collect(),
            })
            .collect()
    }
}

impl Serialize for IndicatorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.lines.len()))?;
        for line in &self.lines {
            match self.policy {
                FillPolicy::ZeroFill => map.serialize_entry(&line.name, &line.zero_filled())?,
                FillPolicy::Strict => map.serialize_entry(&line.name, &line.strict())?,
            }
        }
        map.end()
    }
}

/// Indicator values at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<(String, Option<f64>)>,
}

impl IndicatorRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).and_then(|(_, v)| *v)
    }
}

impl Serialize for IndicatorRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("Date", &self.timestamp.format(TIMESTAMP_FORMAT).to_string())?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Compute the requested families with zero-filled warm-up.
pub fn compute_indicators(series: &Series, kinds: &[IndicatorKind]) -> IndicatorSet {
    compute_indicators_with(series, kinds, FillPolicy::ZeroFill)
}

/// Compute the requested families under an explicit fill policy.
///
/// Output order is canonical regardless of request order; duplicates are
/// computed once.
pub fn compute_indicators_with(series: &Series, kinds: &[IndicatorKind], policy: FillPolicy) -> IndicatorSet {
    let lines = IndicatorKind::ALL
        .into_iter()
        .filter(|k| kinds.contains(k))
        .flat_map(IndicatorKind::indicators)
        .map(|ind| IndicatorLine::compute(ind.as_ref(), series.bars()))
        .collect();
    IndicatorSet::new(policy, lines)
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high/low = ±1 around the
/// body, volume = 1000, one bar per calendar day from 2024-01-02.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
