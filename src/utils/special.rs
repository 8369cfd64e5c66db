use crate::utils::fit::mean_std;
use crate::Errors;
use anyhow::Result;
use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
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

/// Natural logarithm of the gamma function (Lanczos approximation)
///
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // reflection
        (PI / (PI * x).sin()).abs().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut a = LANCZOS[0];
        let t = x + LANCZOS_G + 0.5;
        for (i, c) in LANCZOS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

/// Logarithmic derivative of the gamma function for `x > 0`
///
pub fn digamma(mut x: f64) -> f64 {
    let mut acc = 0.0;
    while x < 6.0 {
        acc -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    acc + x.ln() - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

/// Derivative of [`digamma`] for `x > 0`
///
pub fn trigamma(mut x: f64) -> f64 {
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    acc + 1.0 / x
        + f / 2.0
        + f / x * (1.0 / 6.0 - f * (1.0 / 30.0 - f * (1.0 / 42.0 - f / 30.0)))
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const TINY: f64 = 1e-300;
    const TOL: f64 = 3e-16;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < TOL {
            break;
        }
    }
    h
}

/// Regularised incomplete beta function `I_x(a, b)`
///
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Two-sided tail probability of Student's t distribution with `df` degrees of freedom
///
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// Result of an independent two-sample t-test
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Student t-test of two independent samples with equal variances (two-sided).
///
pub fn ttest_ind(a: &[f64], b: &[f64]) -> Result<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(Errors::NotEnoughData("t-test needs two samples per group".into()).into());
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, sa) = mean_std(a);
    let (mb, sb) = mean_std(b);
    // population deviations back to sums of squares
    let ss = sa * sa * na + sb * sb * nb;
    let df = na + nb - 2.0;
    let pooled = ss / df;
    let denom = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    if denom == 0.0 {
        return Err(Errors::DegenerateFit("both samples are constant".into()).into());
    }
    let statistic = (ma - mb) / denom;
    Ok(TTest {
        statistic,
        p_value: student_t_two_sided(statistic, df),
    })
}

#[cfg(test)]
mod tests {
    use crate::utils::special::{
        digamma, incomplete_beta, ln_gamma, student_t_two_sided, trigamma, ttest_ind,
    };
    use std::f64::consts::PI;

    #[test]
    fn gamma() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn polygamma() {
        // -Euler–Mascheroni
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        assert!((trigamma(1.0) - PI * PI / 6.0).abs() < 1e-10);
        assert!((digamma(3.5) - digamma(2.5) - 1.0 / 2.5).abs() < 1e-12);
    }

    #[test]
    fn beta() {
        assert!((incomplete_beta(1.0, 1.0, 0.3) - 0.3).abs() < 1e-12);
        assert!((incomplete_beta(2.0, 3.0, 0.4) - 0.5248).abs() < 1e-10);
        assert_eq!(incomplete_beta(2.0, 3.0, 0.0), 0.0);
    }

    #[test]
    fn t_distribution() {
        assert!((student_t_two_sided(0.0, 10.0) - 1.0).abs() < 1e-12);
        // t = 2.228 is the 97.5 % quantile at df = 10
        assert!((student_t_two_sided(2.228, 10.0) - 0.05).abs() < 1e-3);
    }

    #[test]
    fn two_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0];
        let t = ttest_ind(&a, &b).unwrap();
        assert!(t.statistic.abs() < 1e-12);
        assert!((t.p_value - 1.0).abs() < 1e-9);

        let c = [11.0, 12.0, 13.0, 14.0, 15.0];
        let t = ttest_ind(&a, &c).unwrap();
        assert!((t.statistic + 10.0).abs() < 1e-9);
        assert!(t.p_value < 1e-4);

        assert!(ttest_ind(&[1.0], &c).is_err());
    }
}
