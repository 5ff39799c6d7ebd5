//! Deterministic synthetic data provider.
//!
//! Produces a random walk seeded from a BLAKE3 hash of `"{symbol}:{interval}"`,
//! so the same request always yields the same bars and no network is touched.
//! The walk ends at a fixed anchor date rather than "now" to keep output
//! reproducible across days.

use super::provider::{DataError, DataProvider, RawBar, SeriesRequest};
use crate::domain::{Interval, Period, StockInfo};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hard cap on generated bars per request.
pub const MAX_SYNTHETIC_BARS: usize = 20_000;

pub struct SyntheticProvider {
    anchor: NaiveDate,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            anchor: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose series end on `anchor`.
    pub fn with_anchor(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    fn trading_days(&self, period: Period) -> u32 {
        match period.trading_days() {
            Some(days) => days,
            None => {
                // ytd: weekdays from Jan 1 of the anchor year through the anchor.
                let start = NaiveDate::from_ymd_opt(self.anchor.year(), 1, 1).unwrap_or(self.anchor);
                start
                    .iter_days()
                    .take_while(|d| *d <= self.anchor)
                    .filter(|d| is_weekday(*d))
                    .count()
                    .max(1) as u32
            }
        }
    }

    fn bar_count(&self, request: &SeriesRequest) -> usize {
        let days = self.trading_days(request.period) as f64;
        let count = (days * request.interval.bars_per_trading_day()).ceil() as usize;
        count.clamp(1, MAX_SYNTHETIC_BARS)
    }

    /// Timestamps of the last `count` bars ending at the anchor, ascending.
    fn timestamps(&self, interval: Interval, count: usize) -> Vec<NaiveDateTime> {
        let mut out = Vec::with_capacity(count);

        if interval.is_intraday() {
            let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
            let step = interval.step();
            let slots = interval.session_bars().unwrap_or(1);
            let mut day = self.anchor;
            'days: loop {
                if is_weekday(day) {
                    let session_open = day.and_time(open);
                    for slot in (0..slots).rev() {
                        out.push(session_open + step * slot as i32);
                        if out.len() == count {
                            break 'days;
                        }
                    }
                }
                day = match day.pred_opt() {
                    Some(d) => d,
                    None => break,
                };
            }
        } else {
            // Only the daily walk skips weekends; longer bars step on the calendar.
            let step = interval.step();
            let mut day = Some(self.anchor);
            while let Some(d) = day {
                if out.len() == count {
                    break;
                }
                if interval != Interval::OneDay || is_weekday(d) {
                    out.push(d.and_time(NaiveTime::MIN));
                }
                day = d.checked_sub_signed(step);
            }
        }

        out.reverse();
        out
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn seeded_rng(symbol: &str, interval: Interval) -> StdRng {
    let seed_bytes = blake3::hash(format!("{symbol}:{interval}").as_bytes());
    StdRng::from_seed(*seed_bytes.as_bytes())
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_bars(&self, request: &SeriesRequest) -> Result<Vec<RawBar>, DataError> {
        let timestamps = self.timestamps(request.interval, self.bar_count(request));
        let mut rng = seeded_rng(&request.symbol, request.interval);

        // Per-bar volatility scaled so that a day's worth of bars moves about
        // as much as one daily bar.
        let scale = (1.0 / request.interval.bars_per_trading_day()).sqrt().min(4.0);
        let max_move = 0.03 * scale;
        let mut price: f64 = rng.gen_range(20.0..500.0);

        let mut bars = Vec::with_capacity(timestamps.len());
        for timestamp in timestamps {
            let bar_return: f64 = rng.gen_range(-max_move..max_move);
            let open = price;
            let close = (price * (1.0 + bar_return)).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);

            bars.push(RawBar::complete(timestamp, open, high, low, close, volume));
            price = close;
        }

        Ok(bars)
    }

    fn fetch_info(&self, symbol: &str) -> Result<StockInfo, DataError> {
        Ok(StockInfo {
            short_name: Some(format!("{symbol} (synthetic)")),
            long_name: Some(format!("{symbol} synthetic random walk")),
            ..StockInfo::default()
        })
    }
}
