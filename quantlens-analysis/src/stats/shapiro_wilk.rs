//! Shapiro–Wilk normality test (Royston's algorithm AS R94).
//!
//! Coefficients come from Royston's polynomial approximations to the
//! expected normal order statistics, and the p-value from his normalizing
//! transformation of W (exact for n = 3, two regimes around n = 11).

use super::special::{normal_quantile, normal_sf, polynomial};
use super::StatsError;

/// Smallest sample the test accepts.
pub const MIN_OBSERVATIONS: usize = 3;

#[allow(clippy::excessive_precision)]
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
#[allow(clippy::excessive_precision)]
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Test statistic and p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub statistic: f64,
    pub p_value: f64,
}

/// Run the test on `sample` (any order).
pub fn shapiro_wilk(sample: &[f64]) -> Result<ShapiroWilk, StatsError> {
    let n = sample.len();
    if n < MIN_OBSERVATIONS {
        return Err(StatsError::TooFewObservations {
            needed: MIN_OBSERVATIONS,
            got: n,
        });
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);
    if x[n - 1] - x[0] <= 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let a = coefficients(n);
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let statistic = (numerator * numerator / ssq).min(1.0);

    Ok(ShapiroWilk {
        statistic,
        p_value: p_value(statistic, n),
    })
}

/// Antisymmetric weights for the upper half of the order statistics,
/// normalized so the full weight vector has unit length.
fn coefficients(n: usize) -> Vec<f64> {
    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an = n as f64;
    let m: Vec<f64> = (1..=half)
        .map(|i| normal_quantile((i as f64 - 0.375) / (an + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / an.sqrt();

    let a1 = polynomial(&C1, rsn) - m[0] / ssumm2;
    let mut a: Vec<f64> = Vec::with_capacity(half);
    let (fac, fixed) = if n > 5 {
        let a2 = -m[1] / ssumm2 + polynomial(&C2, rsn);
        let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1]) / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2)).sqrt();
        a.push(a1);
        a.push(a2);
        (fac, 2)
    } else {
        let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
        a.push(a1);
        (fac, 1)
    };
    a.extend(m[fixed..].iter().map(|mi| -mi / fac));
    a
}

fn p_value(w: f64, n: usize) -> f64 {
    let an = n as f64;
    if n == 3 {
        let exact = (6.0 / std::f64::consts::PI) * (w.sqrt().asin() - std::f64::consts::FRAC_PI_3);
        return exact.max(0.0);
    }

    let mut y = (1.0 - w).ln();
    let (m, s) = if n <= 11 {
        let gamma = polynomial(&G, an);
        if y >= gamma {
            return 1e-99;
        }
        y = -(gamma - y).ln();
        (polynomial(&C3, an), polynomial(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (polynomial(&C5, ln_n), polynomial(&C6, ln_n).exp())
    };
    normal_sf((y - m) / s)
}
