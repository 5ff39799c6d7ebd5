//! Moving Average Convergence/Divergence (MACD).
//!
//! Three lines (separate Indicator instances):
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal), seeded at the first defined line value
//! - Histogram: line - signal
//!
//! Lookback: slow - 1 for the line, slow + signal - 2 for signal and histogram.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdComponent {
    Line,
    Signal,
    Histogram,
}

impl MacdComponent {
    fn name(self) -> &'static str {
        match self {
            MacdComponent::Line => "macd_line",
            MacdComponent::Signal => "macd_signal",
            MacdComponent::Histogram => "macd_histogram",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    component: MacdComponent,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, component: MacdComponent) -> Self {
        Self {
            fast: fast.max(1),
            slow: slow.max(1),
            signal: signal.max(1),
            component,
        }
    }

    /// The canonical 12/26/9 configuration.
    pub fn standard(component: MacdComponent) -> Self {
        Self::new(12, 26, 9, component)
    }

    fn line(&self, closes: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(closes, self.fast);
        let slow = ema_of_series(closes, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        self.component.name()
    }

    fn lookback(&self) -> usize {
        let line = self.fast.max(self.slow) - 1;
        match self.component {
            MacdComponent::Line => line,
            MacdComponent::Signal | MacdComponent::Histogram => line + self.signal - 1,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let line = self.line(&closes);
        if self.component == MacdComponent::Line {
            return line;
        }

        let signal = ema_of_series(&line, self.signal);
        match self.component {
            MacdComponent::Signal => signal,
            _ => line.iter().zip(&signal).map(|(l, s)| l - s).collect(),
        }
    }
}
