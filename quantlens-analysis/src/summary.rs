//! Plain-text data summaries handed to the analyst text generator.

use serde::{Deserialize, Serialize};

use quantlens_core::data::{DataError, DataProvider};
use quantlens_core::domain::{Interval, Period, Series};

use crate::fetch::fetch_many;

/// What the analyst collaborator receives from a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub query: String,
    pub symbols: Vec<String>,
    #[serde(default)]
    pub period: Period,
}

impl AnalysisRequest {
    /// Data summary for every requested symbol.
    pub fn summary(&self, provider: &dyn DataProvider) -> Result<String, DataError> {
        multi_symbol_summary(provider, &self.symbols, self.period)
    }
}

/// One symbol's block, terminated by a blank line. Empty series give an
/// empty string.
pub fn data_summary(symbol: &str, series: &Series) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return String::new();
    };
    let bars = series.bars();
    let change_pct = if first.close == 0.0 {
        0.0
    } else {
        (last.close - first.close) / first.close * 100.0
    };
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let avg_volume = bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64;

    format!(
        "Symbol: {symbol}\n\
         Period: {} to {}\n\
         Starting price: ${:.2}\n\
         Ending price: ${:.2}\n\
         Change: {change_pct:.2}%\n\
         Highest price: ${high:.2}\n\
         Lowest price: ${low:.2}\n\
         Average volume: {avg_volume:.0}\n\n",
        first.date_string(),
        last.date_string(),
        first.close,
        last.close,
    )
}

/// Fetch daily bars for each symbol and join their summaries in request
/// order.
pub fn multi_symbol_summary(
    provider: &dyn DataProvider,
    symbols: &[String],
    period: Period,
) -> Result<String, DataError> {
    let series = fetch_many(provider, symbols, period, Interval::OneDay)?;
    Ok(symbols
        .iter()
        .zip(&series)
        .map(|(symbol, s)| data_summary(symbol, s))
        .collect())
}
