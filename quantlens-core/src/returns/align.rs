//! Multi-symbol time alignment.
//!
//! Return series for several symbols are restricted to the timestamps every
//! one of them has (the intersection). Nothing is filled in for missing
//! bars.

use super::ReturnSeries;
use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};

/// Return columns on a shared, ascending time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    pub timestamps: Vec<NaiveDateTime>,
    pub symbols: Vec<String>,
    /// One column per symbol, each `timestamps.len()` long.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedReturns {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Timestamps present on every axis, ascending.
pub fn common_timestamps<'a, I>(axes: I) -> Vec<NaiveDateTime>
where
    I: IntoIterator<Item = &'a [NaiveDateTime]>,
{
    let mut axes = axes.into_iter();
    let Some(first) = axes.next() else {
        return Vec::new();
    };
    let mut common: BTreeSet<NaiveDateTime> = first.iter().copied().collect();
    for axis in axes {
        let other: BTreeSet<NaiveDateTime> = axis.iter().copied().collect();
        common = common.intersection(&other).copied().collect();
    }
    common.into_iter().collect()
}

/// Restrict each return series to the common timestamps.
///
/// Returns are computed on each full series before alignment, so a bar
/// missing from one symbol does not change another symbol's returns.
pub fn align_returns(series: &[ReturnSeries]) -> AlignedReturns {
    let axes: Vec<Vec<NaiveDateTime>> = series.iter().map(ReturnSeries::timestamps).collect();
    let timestamps = common_timestamps(axes.iter().map(Vec::as_slice));

    let columns = series
        .iter()
        .map(|s| {
            let by_time: HashMap<NaiveDateTime, f64> =
                s.points().iter().map(|p| (p.timestamp, p.value)).collect();
            timestamps
                .iter()
                .filter_map(|t| by_time.get(t).copied())
                .collect()
        })
        .collect();

    AlignedReturns {
        timestamps,
        symbols: series.iter().map(|s| s.symbol().to_string()).collect(),
        columns,
    }
}
