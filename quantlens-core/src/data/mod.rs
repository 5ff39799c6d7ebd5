//! Data providers and series normalization

pub mod cache;
pub mod csv_file;
pub mod normalize;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use cache::CachedProvider;
pub use csv_file::CsvProvider;
pub use normalize::{fetch_info, fetch_series, normalize, validate_symbol, PRICE_DECIMALS};
pub use provider::{DataError, DataProvider, RawBar, SeriesRequest};
pub use synthetic::SyntheticProvider;
pub use yahoo::{backoff_delay, YahooProvider, YahooSettings, MAX_BACKOFF};
