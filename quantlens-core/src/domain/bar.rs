//! Bar and Series: the fundamental market data units.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

/// Canonical textual timestamp format used on every output boundary.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// OHLCV bar for a single instrument at a single sampling point.
///
/// Field names on the wire follow the provider's record layout
/// (`Date`, `Open`, `High`, `Low`, `Close`, `Volume`).
///
/// `high >= max(open, close)` and `low <= min(open, close)` are expected but
/// never enforced: bars are provider data and downstream math tolerates
/// violations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(rename = "Date", with = "canonical_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
}

impl Bar {
    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn date_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Ordered bars for one instrument.
///
/// Invariant: timestamps are strictly increasing. The constructor sorts and
/// drops duplicate timestamps (first occurrence wins), so every `Series`
/// upholds it regardless of where the bars came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps provider order among equal timestamps.
        bars.sort_by_key(|bar| bar.timestamp);
        bars.dedup_by_key(|bar| bar.timestamp);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<u64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn date_strings(&self) -> Vec<String> {
        self.bars.iter().map(Bar::date_string).collect()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

/// A series serializes as its list of bar records.
impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.bars)
    }
}

/// Serde adapter for `YYYY-MM-DD HH:MM:SS` timestamps.
pub mod canonical_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
