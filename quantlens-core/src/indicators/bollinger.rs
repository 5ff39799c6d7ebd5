//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - High: mid + mult * stddev(close, period)
//! - Mid: SMA(close, period)
//! - Low: mid - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    High,
    Mid,
    Low,
}

impl BollingerBand {
    fn name(self) -> &'static str {
        match self {
            BollingerBand::High => "bollinger_high",
            BollingerBand::Mid => "bollinger_mid",
            BollingerBand::Low => "bollinger_low",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        Self {
            period: period.max(1),
            multiplier,
            band,
        }
    }

    /// 20-period, 2-sigma bands.
    pub fn standard(band: BollingerBand) -> Self {
        Self::new(20, 2.0, band)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        self.band.name()
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let mid = sma_of_series(&closes, self.period);
        if self.band == BollingerBand::Mid {
            return mid;
        }

        let sign = if self.band == BollingerBand::High { 1.0 } else { -1.0 };
        mid.iter()
            .enumerate()
            .map(|(i, &mean)| {
                if mean.is_nan() {
                    return f64::NAN;
                }
                let window = &closes[i + 1 - self.period..=i];
                let variance = window.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / self.period as f64;
                mean + sign * self.multiplier * variance.sqrt()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn band(period: usize, band: BollingerBand, closes: &[f64]) -> Vec<f64> {
        Bollinger::new(period, 2.0, band).compute(&make_bars(closes))
    }

    #[test]
    fn mid_is_sma() {
        let result = band(3, BollingerBand::Mid, &[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn population_stddev_width() {
        // window [10, 11, 12]: variance 2/3
        let high = band(3, BollingerBand::High, &[10.0, 11.0, 12.0]);
        let low = band(3, BollingerBand::Low, &[10.0, 11.0, 12.0]);
        let sd = (2.0f64 / 3.0).sqrt();
        assert_approx(high[2], 11.0 + 2.0 * sd, 1e-12);
        assert_approx(low[2], 11.0 - 2.0 * sd, 1e-12);
    }

    #[test]
    fn constant_price_zero_width() {
        let closes = [100.0; 4];
        assert_approx(band(3, BollingerBand::High, &closes)[3], 100.0, DEFAULT_EPSILON);
        assert_approx(band(3, BollingerBand::Low, &closes)[3], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_in_window() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[2].close = f64::NAN;
        let result = Bollinger::new(3, 2.0, BollingerBand::High).compute(&bars);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn names_and_lookback() {
        assert_eq!(Bollinger::standard(BollingerBand::High).name(), "bollinger_high");
        assert_eq!(Bollinger::standard(BollingerBand::Low).lookback(), 19);
    }
}
