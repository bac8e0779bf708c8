//! Correlation statistics.
//!
//! Pearson and Spearman correlation coefficients with two-tailed
//! p-values for the null hypothesis of no correlation. The p-values
//! follow Student's t distribution with *n - 2* degrees of freedom.

use std::cmp::Ordering;
use std::f64;

use crate::error::{Error, Result};

/// A correlation coefficient with its two-tailed p-value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correlation {
    pub coefficient: f64,
    pub p_value: f64,
}

/// Pearson correlation of two paired samples.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<Correlation> {
    let coefficient = pearson_coefficient(xs, ys)?;
    Ok(Correlation {
        coefficient,
        p_value: correlation_p_value(coefficient, xs.len()),
    })
}

/// Spearman rank correlation of two paired samples.
///
/// Tied values are assigned the average of their ranks.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Result<Correlation> {
    check_samples(xs, ys)?;
    pearson(&ranks(xs), &ranks(ys))
}

fn check_samples(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(Error::InsufficientData(format!(
            "samples have different lengths: {} and {}",
            xs.len(),
            ys.len()
        )));
    }

    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(Error::InsufficientData(String::from(
            "samples contain non-finite values",
        )));
    }

    if xs.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "at least 2 pairs are required, got {}",
            xs.len()
        )));
    }

    Ok(())
}

fn pearson_coefficient(xs: &[f64], ys: &[f64]) -> Result<f64> {
    check_samples(xs, ys)?;

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.;
    let mut var_x = 0.;
    let mut var_y = 0.;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0. || var_y == 0. {
        return Err(Error::InsufficientData(String::from(
            "sample has zero variance",
        )));
    }

    Ok((cov / (var_x * var_y).sqrt()).max(-1.).min(1.))
}

/// Two-tailed p-value of a correlation coefficient over `n` pairs.
fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.;
    }

    if r.abs() >= 1. {
        return 0.;
    }

    let df = (n - 2) as f64;
    let t_squared = r * r * df / (1. - r * r);

    // P(|T| > t) = I_{df / (df + t^2)}(df / 2, 1 / 2)
    regularized_incomplete_beta(df / (df + t_squared), df / 2., 0.5)
}

/// Average ranks (starting at 1) of the values in `xs`.
fn ranks(xs: &[f64]) -> Vec<f64> {
    let mut order = (0..xs.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| xs[a].partial_cmp(&xs[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.; xs.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && xs[order[end]] == xs[order[start]] {
            end += 1;
        }

        // Positions start..end share the mean of ranks start+1..=end.
        let rank = (start + end + 1) as f64 / 2.;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }

        start = end;
    }

    ranks
}

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, g = 7, n = 9.
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula.
        return (f64::consts::PI / (f64::consts::PI * x).sin()).ln() - ln_gamma(1. - x);
    }

    let x = x - 1.;
    let mut sum = COEFFICIENTS[0];
    for (i, &c) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + 7.5;

    0.5 * (2. * f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta function *I_x(a, b)*.
fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0. {
        return 0.;
    }
    if x >= 1. {
        return 1.;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1. - x).ln();

    // The continued fraction converges quickly for x < (a + 1) / (a + b + 2).
    if x < (a + 1.) / (a + b + 2.) {
        ln_front.exp() * beta_continued_fraction(x, a, b) / a
    } else {
        1. - ln_front.exp() * beta_continued_fraction(1. - x, b, a) / b
    }
}

/// Continued fraction for the incomplete beta function (modified Lentz).
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let clamp_tiny = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.;
    let mut d = 1. / clamp_tiny(1. - (a + b) * x / (a + 1.));
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2. * m;

        // Even step.
        let aa = m * (b - m) * x / ((a + m2 - 1.) * (a + m2));
        d = 1. / clamp_tiny(1. + aa * d);
        c = clamp_tiny(1. + aa / c);
        h *= d * c;

        // Odd step.
        let aa = -(a + m) * (a + b + m) * x / ((a + m2) * (a + m2 + 1.));
        d = 1. / clamp_tiny(1. + aa * d);
        c = clamp_tiny(1. + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.).abs() < EPSILON {
            break;
        }
    }

    h
}
