//! Soft failures of the analysis layer.
//!
//! These never abort a request: they are folded into the result object's
//! `error` field. Provider failures (`DataError`) are the hard class and
//! propagate through `Result` instead.

use crate::stats::StatsError;
use serde::Serializer;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("a {test} test requires {expected} symbol(s), got {got}")]
    InvalidArity {
        test: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("unknown test type: {0}")]
    UnknownTestType(String),

    #[error("unknown chart type: {0}")]
    UnknownChartType(String),

    #[error("significance level must lie strictly between 0 and 1, got {0}")]
    InvalidAlpha(f64),

    #[error(transparent)]
    Numerical(#[from] StatsError),
}

/// Serialize any error through its `Display` text.
pub(crate) fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = AnalysisError::InvalidArity {
            test: "normality",
            expected: 1,
            got: 2,
        };
        assert_eq!(err.to_string(), "a normality test requires 1 symbol(s), got 2");
        assert_eq!(
            AnalysisError::UnknownChartType("pie".into()).to_string(),
            "unknown chart type: pie"
        );
    }

    #[test]
    fn numerical_errors_are_transparent() {
        let err: AnalysisError = StatsError::ZeroVariance.into();
        assert_eq!(err.to_string(), StatsError::ZeroVariance.to_string());
    }
}
