//! Request vocabulary: look-back periods and sampling intervals.
//!
//! Both are closed sets of provider tokens. Whether an interval is actually
//! offered for a given period is the provider's business; nothing here
//! checks the combination.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A token that is not part of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{token}' (expected one of: {expected})")]
pub struct TokenError {
    pub kind: &'static str,
    pub token: String,
    pub expected: String,
}

/// Look-back window of a series request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Approximate number of trading days covered.
    ///
    /// `ytd` needs a calendar anchor, so it is resolved by the caller and
    /// returns `None` here.
    pub fn trading_days(self) -> Option<u32> {
        match self {
            Period::OneDay => Some(1),
            Period::FiveDays => Some(5),
            Period::OneMonth => Some(21),
            Period::ThreeMonths => Some(63),
            Period::SixMonths => Some(126),
            Period::OneYear => Some(252),
            Period::TwoYears => Some(504),
            Period::FiveYears => Some(1_260),
            Period::TenYears => Some(2_520),
            Period::Max => Some(5_040),
            Period::YearToDate => None,
        }
    }
}

/// Regular session length, 09:30 to 16:00 exchange time.
pub const SESSION_MINUTES: i64 = 390;

/// Sampling interval of a series request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Nominal wall-clock spacing between two bars.
    pub fn step(self) -> Duration {
        match self {
            Interval::OneMinute => Duration::minutes(1),
            Interval::TwoMinutes => Duration::minutes(2),
            Interval::FiveMinutes => Duration::minutes(5),
            Interval::FifteenMinutes => Duration::minutes(15),
            Interval::ThirtyMinutes => Duration::minutes(30),
            Interval::SixtyMinutes | Interval::OneHour => Duration::hours(1),
            Interval::NinetyMinutes => Duration::minutes(90),
            Interval::OneDay => Duration::days(1),
            Interval::FiveDays => Duration::days(5),
            Interval::OneWeek => Duration::weeks(1),
            Interval::OneMonth => Duration::days(30),
            Interval::ThreeMonths => Duration::days(91),
        }
    }

    /// Bars starting inside one regular session, counting a trailing
    /// partial bar (60m opens at 09:30..15:30, so 7). `None` for daily and
    /// longer intervals.
    pub fn session_bars(self) -> Option<usize> {
        if !self.is_intraday() {
            return None;
        }
        let step = self.step().num_minutes().max(1);
        Some(((SESSION_MINUTES + step - 1) / step) as usize)
    }

    /// Bars produced per trading day (fractional for multi-day intervals).
    pub fn bars_per_trading_day(self) -> f64 {
        match self {
            Interval::OneDay => 1.0,
            Interval::FiveDays | Interval::OneWeek => 1.0 / 5.0,
            Interval::OneMonth => 1.0 / 21.0,
            Interval::ThreeMonths => 1.0 / 63.0,
            intraday => intraday.session_bars().unwrap_or(1) as f64,
        }
    }

    pub fn is_intraday(self) -> bool {
        self.step() < Duration::days(1)
    }
}

fn expected_tokens<T: Copy>(all: &[T], as_str: fn(T) -> &'static str) -> String {
    all.iter().map(|t| as_str(*t)).collect::<Vec<_>>().join(",")
}

impl FromStr for Period {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TokenError {
                kind: "period",
                token: s.to_string(),
                expected: expected_tokens(&Period::ALL, Period::as_str),
            })
    }
}

impl FromStr for Interval {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| TokenError {
                kind: "interval",
                token: s.to_string(),
                expected: expected_tokens(&Interval::ALL, Interval::as_str),
            })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_period_token_roundtrips() {
        for period in Period::ALL {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
            let json = serde_json::to_string(&period).unwrap();
            assert_eq!(json, format!("\"{}\"", period.as_str()));
        }
    }

    #[test]
    fn every_interval_token_roundtrips() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn unknown_token_lists_vocabulary() {
        let err = "7y".parse::<Period>().unwrap_err();
        assert_eq!(err.token, "7y");
        assert!(err.to_string().contains("1y"));
        assert!("1s".parse::<Interval>().is_err());
    }

    #[test]
    fn session_bars_count_partial_final_bar() {
        assert_eq!(Interval::OneMinute.session_bars(), Some(390));
        assert_eq!(Interval::FifteenMinutes.session_bars(), Some(26));
        assert_eq!(Interval::OneHour.session_bars(), Some(7));
        assert_eq!(Interval::NinetyMinutes.session_bars(), Some(5));
        assert_eq!(Interval::OneDay.session_bars(), None);
        assert_eq!(Interval::OneHour.bars_per_trading_day(), 7.0);
        assert_eq!(Interval::OneWeek.bars_per_trading_day(), 0.2);
    }

    #[test]
    fn intraday_classification() {
        assert!(Interval::FiveMinutes.is_intraday());
        assert!(!Interval::OneDay.is_intraday());
        assert!(!Interval::OneWeek.is_intraday());
    }
}
