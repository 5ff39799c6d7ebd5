//! Hypothesis engine: normality, correlation and mean-comparison tests over
//! daily returns.
//!
//! Every symbol is fetched first (hard failures propagate); arity, test-type,
//! alpha and numerical problems afterwards become a [`TestOutcome::Failed`]
//! carried inside an otherwise well-formed [`HypothesisReport`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use quantlens_core::data::{DataError, DataProvider};
use quantlens_core::domain::{Interval, Period};
use quantlens_core::returns::{align_returns, simple_returns, ReturnSeries};

use crate::error::{serialize_display, AnalysisError};
use crate::fetch::fetch_many;
use crate::stats::{pearson, shapiro_wilk, welch_t_test};

/// Conventional significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Tests always run on daily bars.
pub const TEST_INTERVAL: Interval = Interval::OneDay;

/// Supported tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Normality,
    Correlation,
    MeanComparison,
}

impl TestType {
    pub const ALL: [TestType; 3] = [TestType::Normality, TestType::Correlation, TestType::MeanComparison];

    pub fn as_str(self) -> &'static str {
        match self {
            TestType::Normality => "normality",
            TestType::Correlation => "correlation",
            TestType::MeanComparison => "mean_comparison",
        }
    }

    /// Number of symbols the test consumes.
    pub fn arity(self) -> usize {
        match self {
            TestType::Normality => 1,
            TestType::Correlation | TestType::MeanComparison => 2,
        }
    }
}

impl FromStr for TestType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AnalysisError::UnknownTestType(s.to_string()))
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

/// Inbound hypothesis request. The test type stays a raw token so an
/// unknown one can be reported in the result instead of rejected up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisRequest {
    pub symbols: Vec<String>,
    pub test_type: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl HypothesisRequest {
    pub fn new(symbols: Vec<String>, test_type: impl Into<String>, period: Period, alpha: f64) -> Self {
        Self {
            symbols,
            test_type: test_type.into(),
            period,
            alpha,
        }
    }
}

/// Categorical or numeric headline of a completed test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Finding {
    Category(&'static str),
    Coefficient(f64),
}

/// Numbers and wording of a completed test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestVerdict {
    pub result: Finding,
    pub statistic: f64,
    pub p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean2: Option<f64>,
    pub conclusion: String,
}

/// Either a verdict or the soft failure that prevented one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TestOutcome {
    Verdict(TestVerdict),
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: AnalysisError,
    },
}

/// Request echo plus outcome, flattened into one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisReport {
    pub test_type: String,
    pub symbols: Vec<String>,
    pub period: Period,
    pub alpha: f64,
    #[serde(flatten)]
    pub outcome: TestOutcome,
}

impl HypothesisReport {
    pub fn verdict(&self) -> Option<&TestVerdict> {
        match &self.outcome {
            TestOutcome::Verdict(v) => Some(v),
            TestOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match &self.outcome {
            TestOutcome::Verdict(_) => None,
            TestOutcome::Failed { error } => Some(error),
        }
    }
}

/// Fetch daily series for every symbol and run the requested test.
pub fn run_hypothesis_test(
    provider: &dyn DataProvider,
    request: &HypothesisRequest,
) -> Result<HypothesisReport, DataError> {
    let series = fetch_many(provider, &request.symbols, request.period, TEST_INTERVAL)?;
    let returns: Vec<ReturnSeries> = series.iter().map(simple_returns).collect();

    let outcome = match evaluate(request, &returns) {
        Ok(verdict) => {
            debug!(test = %request.test_type, p_value = verdict.p_value, "hypothesis test completed");
            TestOutcome::Verdict(verdict)
        }
        Err(error) => {
            warn!(test = %request.test_type, symbols = ?request.symbols, %error, "hypothesis test failed");
            TestOutcome::Failed { error }
        }
    };

    Ok(HypothesisReport {
        test_type: request.test_type.clone(),
        symbols: request.symbols.clone(),
        period: request.period,
        alpha: request.alpha,
        outcome,
    })
}

/// Soft phase: dispatch on the token, check arity and alpha, run the test.
fn evaluate(request: &HypothesisRequest, returns: &[ReturnSeries]) -> Result<TestVerdict, AnalysisError> {
    let test: TestType = request.test_type.parse()?;
    if returns.len() != test.arity() {
        return Err(AnalysisError::InvalidArity {
            test: test.as_str(),
            expected: test.arity(),
            got: returns.len(),
        });
    }
    let alpha = request.alpha;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(AnalysisError::InvalidAlpha(alpha));
    }

    match test {
        TestType::Normality => normality(&returns[0], alpha),
        TestType::Correlation => correlation(&returns[0], &returns[1], alpha),
        TestType::MeanComparison => mean_comparison(&returns[0], &returns[1], alpha),
    }
}

fn normality(returns: &ReturnSeries, alpha: f64) -> Result<TestVerdict, AnalysisError> {
    let sw = shapiro_wilk(&returns.values_after_first())?;
    let normal = sw.p_value > alpha;
    Ok(TestVerdict {
        result: Finding::Category(if normal { "normal" } else { "not_normal" }),
        statistic: sw.statistic,
        p_value: sw.p_value,
        mean1: None,
        mean2: None,
        conclusion: format!(
            "Return distribution of {} {} at significance level {}.",
            returns.symbol(),
            if normal { "is normal" } else { "is not normal" },
            alpha
        ),
    })
}

fn correlation(a: &ReturnSeries, b: &ReturnSeries, alpha: f64) -> Result<TestVerdict, AnalysisError> {
    let aligned = align_returns(&[a.clone(), b.clone()]);
    let c = pearson(&aligned.columns[0], &aligned.columns[1])?;
    let significant = c.p_value < alpha;
    Ok(TestVerdict {
        result: Finding::Coefficient(c.r),
        statistic: c.r,
        p_value: c.p_value,
        mean1: None,
        mean2: None,
        conclusion: format!(
            "Correlation between returns of {} and {} is {:.4}. This correlation is {} at significance level {}.",
            a.symbol(),
            b.symbol(),
            c.r,
            if significant {
                "statistically significant"
            } else {
                "not statistically significant"
            },
            alpha
        ),
    })
}

fn mean_comparison(a: &ReturnSeries, b: &ReturnSeries, alpha: f64) -> Result<TestVerdict, AnalysisError> {
    let t = welch_t_test(&a.values_after_first(), &b.values_after_first())?;
    let different = t.p_value < alpha;
    Ok(TestVerdict {
        result: Finding::Category(if different { "different" } else { "not_different" }),
        statistic: t.statistic,
        p_value: t.p_value,
        mean1: Some(t.mean1),
        mean2: Some(t.mean2),
        conclusion: format!(
            "The mean return of {} ({:.4}) and {} ({:.4}) {} at significance level {}.",
            a.symbol(),
            t.mean1,
            b.symbol(),
            t.mean2,
            if different {
                "differs significantly"
            } else {
                "does not differ significantly"
            },
            alpha
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsError;
    use quantlens_core::data::SyntheticProvider;
    use quantlens_core::domain::{Bar, Series};

    fn returns_of(symbol: &str, closes: &[f64]) -> ReturnSeries {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0,
            })
            .collect();
        simple_returns(&Series::new(symbol, bars))
    }

    fn request(symbols: &[&str], test: &str) -> HypothesisRequest {
        HypothesisRequest::new(
            symbols.iter().map(|s| s.to_string()).collect(),
            test,
            Period::OneYear,
            DEFAULT_ALPHA,
        )
    }

    #[test]
    fn test_type_tokens() {
        assert_eq!("mean_comparison".parse::<TestType>().unwrap(), TestType::MeanComparison);
        assert_eq!(
            "anova".parse::<TestType>(),
            Err(AnalysisError::UnknownTestType("anova".into()))
        );
        assert_eq!(TestType::Correlation.arity(), 2);
    }

    #[test]
    fn arity_is_checked_before_the_math() {
        let r = returns_of("A", &[1.0, 2.0, 3.0, 4.0]);
        let err = evaluate(&request(&["A", "A"], "normality"), &[r.clone(), r]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidArity {
                test: "normality",
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn alpha_out_of_range_is_soft() {
        let r = returns_of("A", &[1.0, 2.0, 3.0, 4.0]);
        let mut req = request(&["A"], "normality");
        req.alpha = 1.5;
        assert_eq!(evaluate(&req, &[r]).unwrap_err(), AnalysisError::InvalidAlpha(1.5));
    }

    #[test]
    fn normality_excludes_leading_zero() {
        // Three prices give two returns after the leading zero: too few
        let r = returns_of("A", &[10.0, 11.0, 12.0]);
        let err = evaluate(&request(&["A"], "normality"), &[r]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Numerical(StatsError::TooFewObservations { needed: 3, got: 2 })
        );
    }

    #[test]
    fn self_correlation_is_one() {
        let r = returns_of("A", &[10.0, 11.0, 9.0, 12.0, 12.0, 13.0]);
        let verdict = evaluate(&request(&["A", "A"], "correlation"), &[r.clone(), r]).unwrap();
        assert!((verdict.statistic - 1.0).abs() < 1e-12);
        assert!(verdict.p_value < 1e-6);
        assert_eq!(
            verdict.conclusion,
            "Correlation between returns of A and A is 1.0000. This correlation is statistically significant at significance level 0.05."
        );
    }

    #[test]
    fn mean_comparison_reports_means() {
        let a = returns_of("A", &[10.0, 11.0, 9.0, 12.0, 12.0]);
        let b = returns_of("B", &[20.0, 20.5, 20.2, 20.9, 21.0]);
        let verdict = evaluate(&request(&["A", "B"], "mean_comparison"), &[a, b]).unwrap();
        let m1 = verdict.mean1.unwrap();
        assert!((m1 - (0.1 - 0.181818 + 0.333333 + 0.0) / 4.0).abs() < 1e-5);
        assert!(verdict.mean2.is_some());
        assert_eq!(verdict.result, Finding::Category("not_different"));
        assert!(verdict.conclusion.contains("does not differ significantly"));
    }

    #[test]
    fn failed_report_serializes_error_field() {
        let provider = SyntheticProvider::new();
        let report = run_hypothesis_test(&provider, &request(&["SPY"], "anova")).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["test_type"], "anova");
        assert_eq!(json["symbols"][0], "SPY");
        assert_eq!(json["period"], "1y");
        assert_eq!(json["alpha"], 0.05);
        assert_eq!(json["error"], "unknown test type: anova");
        assert!(json.get("p_value").is_none());
    }

    #[test]
    fn verdict_report_flattens_fields() {
        let provider = SyntheticProvider::new();
        let report = run_hypothesis_test(&provider, &request(&["SPY"], "normality")).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("error").is_none());
        let result = json["result"].as_str().unwrap();
        assert!(result == "normal" || result == "not_normal");
        assert!(json["p_value"].is_f64());
        assert!(json["statistic"].is_f64());
        assert!(json.get("mean1").is_none());
        assert!(json["conclusion"]
            .as_str()
            .unwrap()
            .starts_with("Return distribution of SPY"));
    }
}
