//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[0] = close[0]. Values exist once `period` observations are in.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA of an arbitrary series (used by MACD for the signal line).
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm_of_series(values, 2.0 / (period as f64 + 1.0), period)
}

/// Exponentially weighted mean with a fixed smoothing factor.
///
/// Seeded with the first finite value. Non-finite inputs are skipped: their
/// position is NaN and the running mean carries over unchanged. A value is
/// emitted once `min_periods` finite observations have been seen.
pub fn ewm_of_series(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        let next = match state {
            None => v,
            Some(prev) => alpha * v + (1.0 - alpha) * prev,
        };
        state = Some(next);
        seen += 1;
        if seen >= min_periods {
            result[i] = next;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let result = Ema::new(1).compute(&make_bars(&[10.0, 20.0, 30.0]));
        assert_eq!(result, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_3_seeded_with_first_close() {
        let result = Ema::new(3).compute(&make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // alpha = 0.5: 1 → 1.5 → 2.25 → 3.125 → 4.0625
        assert_approx(result[2], 2.25, DEFAULT_EPSILON);
        assert_approx(result[3], 3.125, DEFAULT_EPSILON);
        assert_approx(result[4], 4.0625, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_input_is_constant() {
        let result = Ema::new(20).compute(&make_bars(&[42.0; 30]));
        for v in &result[19..] {
            assert_approx(*v, 42.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn leading_nan_delays_seed() {
        let values = [f64::NAN, f64::NAN, 4.0, 6.0, 8.0];
        let result = ema_of_series(&values, 3);
        assert!(result[..4].iter().all(|v| v.is_nan()));
        // seed 4 → 5 → 6.5
        assert_approx(result[4], 6.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_lookback() {
        assert_eq!(Ema::new(20).lookback(), 19);
        assert_eq!(Ema::new(50).name(), "ema_50");
    }
}
