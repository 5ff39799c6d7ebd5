//! Domain types for QuantLens

pub mod bar;
pub mod info;
pub mod vocab;

pub use bar::{Bar, Series, TIMESTAMP_FORMAT};
pub use info::StockInfo;
pub use vocab::{Interval, Period, TokenError};

/// Round to `decimals` places, exact halves to even. NaN and infinities pass
/// through untouched.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
