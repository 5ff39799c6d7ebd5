//! Special functions behind the test statistics.
//!
//! Implements from first principles:
//! - Lanczos approximation for ln(Gamma)
//! - Regularized incomplete beta function
//! - Student's t-distribution CDF and two-sided tail
//! - Standard normal survival function and quantile (AS 241)

// ─── Gamma / Beta ────────────────────────────────────────────────────

/// Lanczos approximation for ln(Gamma(x)), g=7, n=9.
pub fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    const G: f64 = 7.0;

    if x < 0.5 {
        // Reflection: Gamma(x) * Gamma(1-x) = pi / sin(pi*x)
        let sin_val = (std::f64::consts::PI * x).sin();
        if sin_val.abs() < 1e-300 {
            return f64::INFINITY;
        }
        return std::f64::consts::PI.ln() - sin_val.abs().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let sum = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, &c)| acc + c / (x + i as f64));

    let t = x + G + 0.5;
    let log_sqrt_2pi = (2.0 * std::f64::consts::PI).sqrt().ln();
    log_sqrt_2pi + t.ln() * (x + 0.5) - t + sum.ln()
}

/// Regularized incomplete beta function I_x(a, b), modified Lentz continued
/// fraction.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return 0.0;
    }
    if x == 1.0 {
        return 1.0;
    }

    // The fraction converges fast only below the mean
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_incomplete_beta(b, a, 1.0 - x);
    }

    let ln_prefix = a * x.ln() + b * (1.0 - x).ln() - ln_gamma(a) - ln_gamma(b) + ln_gamma(a + b) - a.ln();
    let prefix = ln_prefix.exp();

    const MAX_ITER: usize = 300;
    const EPSILON: f64 = 1e-14;
    const TINY: f64 = 1e-30;

    let clamp = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0_f64;
    let mut d = 1.0 / clamp(1.0 - (a + b) * x / (a + 1.0));
    let mut f = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;

        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 / clamp(1.0 + even * d);
        c = clamp(1.0 + even / c);
        f *= c * d;

        let odd = -((a + m) * (a + b + m) * x) / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 / clamp(1.0 + odd * d);
        c = clamp(1.0 + odd / c);
        let delta = c * d;
        f *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    prefix * f
}

// ─── Student's t ─────────────────────────────────────────────────────

/// Two-sided Student's t p-value P(|T| >= |t|) for `df` degrees of freedom.
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    if df <= 0.0 || t.is_nan() {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

// ─── Normal ──────────────────────────────────────────────────────────

/// Complementary error function, Chebyshev fit with fractional error below
/// 1.2e-7 everywhere.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = if z.is_infinite() { 0.0 } else { t * (-z * z + poly).exp() };
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Upper tail of the standard normal: P(Z > z).
pub fn normal_sf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Inverse of the standard normal CDF (Wichura's AS 241, PPND16).
///
/// Returns -inf / +inf at 0 / 1 and NaN outside [0, 1].
#[allow(clippy::excessive_precision)]
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 8] = [
        3.387132872796366608,
        133.14166789178437745,
        1971.5909503065514427,
        13731.693765509461125,
        45921.953931549871457,
        67265.770927008700853,
        33430.575583588128105,
        2509.0809287301226727,
    ];
    const B: [f64; 8] = [
        1.0,
        42.313330701600911252,
        687.1870074920579083,
        5394.1960214247511077,
        21213.794301586595867,
        39307.89580009271061,
        28729.085735721942674,
        5226.495278852545925,
    ];
    const C: [f64; 8] = [
        1.42343711074968357734,
        4.6303378461565452959,
        5.7694972214606914055,
        3.64784832476320460504,
        1.27045825245236838258,
        0.24178072517745061177,
        0.0227238449892691845833,
        7.7454501427834140764e-4,
    ];
    const D: [f64; 8] = [
        1.0,
        2.05319162663775882187,
        1.6763848301838038494,
        0.68976733498510000455,
        0.14810397642748007459,
        0.0151986665636164571966,
        5.475938084995344946e-4,
        1.05075007164441684324e-9,
    ];
    const E: [f64; 8] = [
        6.6579046435011037772,
        5.4637849111641143699,
        1.7848265399172913358,
        0.29656057182850489123,
        0.026532189526576123093,
        0.0012426609473880784386,
        2.71155556874348757815e-5,
        2.01033439929228813265e-7,
    ];
    const F: [f64; 8] = [
        1.0,
        0.59983220655588793769,
        0.13692988092273580531,
        0.0148753612908506148525,
        7.868691311456132591e-4,
        1.8463183175100546818e-5,
        1.4215117583164458887e-7,
        2.04426310338993978564e-15,
    ];

    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let q = p - 0.5;
    if q.abs() <= 0.425 {
        let r = 0.180625 - q * q;
        return q * polynomial(&A, r) / polynomial(&B, r);
    }

    let tail = if q < 0.0 { p } else { 1.0 - p };
    let mut r = (-tail.ln()).sqrt();
    let value = if r <= 5.0 {
        r -= 1.6;
        polynomial(&C, r) / polynomial(&D, r)
    } else {
        r -= 5.0;
        polynomial(&E, r) / polynomial(&F, r)
    };
    if q < 0.0 {
        -value
    } else {
        value
    }
}

/// Evaluate `c[0] + c[1]*x + ... + c[n-1]*x^(n-1)` by Horner's rule.
pub fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── ln_gamma ────────────────────────────────────────────────

    #[test]
    fn ln_gamma_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-10);
        assert!(ln_gamma(2.0).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    // ─── incomplete beta ─────────────────────────────────────────

    #[test]
    fn incomplete_beta_bounds_and_symmetry() {
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0);
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0);
        // I_x(a, b) = 1 - I_{1-x}(b, a)
        let lhs = regularized_incomplete_beta(2.5, 4.0, 0.3);
        let rhs = 1.0 - regularized_incomplete_beta(4.0, 2.5, 0.7);
        assert!((lhs - rhs).abs() < 1e-12);
        // I_x(1, 1) is the uniform CDF
        assert!((regularized_incomplete_beta(1.0, 1.0, 0.37) - 0.37).abs() < 1e-12);
    }

    // ─── t distribution ──────────────────────────────────────────

    #[test]
    fn two_sided_t_cauchy_case() {
        // df = 1 is Cauchy: P(|T| >= 1) = 1/2
        assert!((t_two_sided_p(1.0, 1.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn two_sided_t_reference_values() {
        // t = 1, df = 8
        assert!((t_two_sided_p(1.0, 8.0) - 0.346594).abs() < 1e-5);
        assert!((t_two_sided_p(-1.0, 8.0) - 0.346594).abs() < 1e-5);
        // t = 2.228, df = 10 is the 97.5% quantile
        assert!((t_two_sided_p(2.228139, 10.0) - 0.05).abs() < 1e-5);
        assert_eq!(t_two_sided_p(f64::INFINITY, 4.0), 0.0);
        assert!((t_two_sided_p(0.0, 4.0) - 1.0).abs() < 1e-12);
    }

    // ─── normal ──────────────────────────────────────────────────

    #[test]
    fn normal_tail_reference_values() {
        assert!((normal_sf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_sf(1.959964) - 0.025).abs() < 1e-7);
        assert!((normal_sf(-1.0) - 0.841345).abs() < 1e-6);
        assert_eq!(normal_sf(f64::NEG_INFINITY), 1.0);
        assert_eq!(normal_sf(f64::INFINITY), 0.0);
    }

    #[test]
    fn normal_quantile_reference_values() {
        assert_eq!(normal_quantile(0.5), 0.0);
        assert!((normal_quantile(0.975) - 1.959963984540054).abs() < 1e-12);
        assert!((normal_quantile(0.025) + 1.959963984540054).abs() < 1e-12);
        assert!((normal_quantile(1e-10) + 6.361340902404056).abs() < 1e-9);
        assert!(normal_quantile(1.5).is_nan());
        assert_eq!(normal_quantile(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn quantile_inverts_tail() {
        for &p in &[0.01, 0.1, 0.3, 0.6, 0.9, 0.99] {
            let z = normal_quantile(p);
            assert!((1.0 - normal_sf(z) - p).abs() < 1e-6, "p={p}");
        }
    }

    #[test]
    fn polynomial_is_ascending_order() {
        // 1 + 2x + 3x^2 at x = 2
        assert_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(polynomial(&[4.0], 9.0), 4.0);
    }
}
