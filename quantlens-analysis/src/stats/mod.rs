//! Statistical tests over return samples.
//!
//! - Shapiro–Wilk normality
//! - Pearson correlation with a two-sided t-based p-value
//! - Welch's unequal-variance t-test (two-sided)

pub mod shapiro_wilk;
pub mod special;

pub use shapiro_wilk::{shapiro_wilk, ShapiroWilk};

use special::{regularized_incomplete_beta, t_two_sided_p};
use thiserror::Error;

/// Reasons a statistic cannot be computed on a given sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("too few observations: need at least {needed}, got {got}")]
    TooFewObservations { needed: usize, got: usize },

    #[error("sample has zero variance")]
    ZeroVariance,

    #[error("samples differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("sample contains non-finite values")]
    NonFinite,
}

// ─── Descriptive ─────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1).
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

fn require(values: &[f64], needed: usize) -> Result<(), StatsError> {
    if values.len() < needed {
        return Err(StatsError::TooFewObservations {
            needed,
            got: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }
    Ok(())
}

// ─── Pearson ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// Coefficient in [-1, 1].
    pub r: f64,
    /// Two-sided p-value for H0: r = 0.
    pub p_value: f64,
}

/// Pearson product-moment correlation of two equal-length samples.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    require(x, 2)?;
    require(y, 2)?;

    let (mx, my) = (mean(x), mean(y));
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let r = (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0);
    let n = x.len();
    // Two points always lie on a line; nothing to test
    let p_value = if n == 2 {
        1.0
    } else {
        // Two-sided t-test of r with n-2 dof, folded into the beta function
        let df = (n - 2) as f64;
        regularized_incomplete_beta(df / 2.0, 0.5, 1.0 - r * r).clamp(0.0, 1.0)
    };
    Ok(Correlation { r, p_value })
}

// ─── Welch ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTTest {
    pub statistic: f64,
    pub p_value: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub df: f64,
    pub mean1: f64,
    pub mean2: f64,
}

/// Two-sided Welch t-test for a difference in means, variances not
/// assumed equal.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<WelchTTest, StatsError> {
    require(a, 2)?;
    require(b, 2)?;

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mean1, mean2) = (mean(a), mean(b));
    let q1 = sample_variance(a) / n1;
    let q2 = sample_variance(b) / n2;
    let se2 = q1 + q2;
    if se2 == 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let statistic = (mean1 - mean2) / se2.sqrt();
    let df = se2 * se2 / (q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0));
    Ok(WelchTTest {
        statistic,
        p_value: t_two_sided_p(statistic, df),
        df,
        mean1,
        mean2,
    })
}
