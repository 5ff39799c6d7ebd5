//! Relative Strength Index (RSI).
//!
//! Gains and losses from close-to-close differences, each smoothed with
//! Wilder's factor alpha = 1 / period. The undefined first difference counts
//! as a zero gain and a zero loss, so smoothing starts at bar 0.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period - 1.
//! Edge cases: avg_loss == 0 with gains → 100; flat prices → 50.

use super::ema::ewm_of_series;
use super::Indicator;
use crate::domain::Bar;

/// RSI of a window with neither gains nor losses.
pub const NEUTRAL_RSI: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n == 0 {
            return Vec::new();
        }

        let mut gains = vec![0.0; n];
        let mut losses = vec![0.0; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if !change.is_finite() {
                gains[i] = f64::NAN;
                losses[i] = f64::NAN;
            } else if change > 0.0 {
                gains[i] = change;
            } else {
                losses[i] = -change;
            }
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm_of_series(&gains, alpha, self.period);
        let avg_loss = ewm_of_series(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    compute_rsi(g, l)
                }
            })
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            NEUTRAL_RSI
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn first_value_at_period_minus_one() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert_eq!(result.len(), 20);
        assert!(result[..13].iter().all(|v| v.is_nan()));
        assert!(result[13..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn only_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert_approx(result[19], 100.0, 1e-9);
    }

    #[test]
    fn only_losses_is_0() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert_approx(result[19], 0.0, 1e-9);
    }

    #[test]
    fn flat_prices_are_neutral() {
        let result = Rsi::new(14).compute(&make_bars(&[50.0; 30]));
        assert!(result[13..].iter().all(|v| *v == NEUTRAL_RSI));
    }

    #[test]
    fn wilder_smoothing_small_period() {
        // period 2, alpha 0.5; changes: [0, +2, -1, +1]
        // gains  ewm: 0 → 1 → 0.5 → 0.75
        // losses ewm: 0 → 0 → 0.5 → 0.25
        let result = Rsi::new(2).compute(&make_bars(&[10.0, 12.0, 11.0, 12.0]));
        assert!(result[0].is_nan());
        assert_approx(result[1], 100.0, 1e-12);
        assert_approx(result[2], 50.0, 1e-12);
        assert_approx(result[3], 75.0, 1e-12);
    }

    #[test]
    fn stays_in_range() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + ((i * 7919) % 23) as f64 - 11.0).collect();
        for v in Rsi::new(14).compute(&make_bars(&closes)).into_iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
