use crate::utils::fit::mean_std;
use crate::utils::histogram::Histogram;
use crate::utils::special::{digamma, ln_gamma, trigamma};
use crate::Errors;
use anyhow::Result;
use log::debug;
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Exp1, Gamma};
use std::f64::consts::PI;

const MAX_REJECTIONS: usize = 100_000;

/// Draws from `dist` until the value does not exceed `max`.
///
/// Fails with [`Errors::TruncationLimit`] when no acceptable value shows up after many
/// attempts, i.e. the limit leaves almost no probability mass.
///
pub fn sample_truncated<D, R>(dist: &D, rng: &mut R, max: f64) -> Result<f64>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    for _ in 0..MAX_REJECTIONS {
        let v = dist.sample(rng);
        if v <= max {
            return Ok(v);
        }
    }
    Err(Errors::TruncationLimit {
        max,
        attempts: MAX_REJECTIONS,
    }
    .into())
}

/// Shifted exponential distribution
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    pub loc: f64,
    pub scale: f64,
}

impl Exponential {
    pub fn new(loc: f64, scale: f64) -> Self {
        assert!(scale > 0.0, "Scale must be a positive number");
        Self { loc, scale }
    }

    /// Maximum likelihood fit: `loc` is the sample minimum, `scale` the mean excess over it
    ///
    pub fn fit(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(Errors::NotEnoughData("no samples for an exponential fit".into()).into());
        }
        let loc = data.iter().copied().fold(f64::INFINITY, f64::min);
        let (mean, _) = mean_std(data);
        let scale = mean - loc;
        if scale <= 0.0 {
            return Err(Errors::DegenerateFit("all samples are equal".into()).into());
        }
        Ok(Self { loc, scale })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        if x < self.loc {
            0.0
        } else {
            (-(x - self.loc) / self.scale).exp() / self.scale
        }
    }
}

impl Distribution<f64> for Exponential {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let e: f64 = Exp1.sample(rng);
        self.loc + self.scale * e
    }
}

/// Shifted inverse-gamma distribution
///
#[derive(Debug, Clone, Copy)]
pub struct InverseGamma {
    pub shape: f64,
    pub loc: f64,
    pub scale: f64,
    gamma: Gamma<f64>,
}

impl InverseGamma {
    pub fn new(shape: f64, loc: f64, scale: f64) -> Result<Self> {
        if !(shape > 0.0 && scale > 0.0) {
            return Err(Errors::DegenerateFit(format!(
                "invalid inverse gamma parameters a={} scale={}",
                shape, scale
            ))
            .into());
        }
        let gamma = Gamma::new(shape, 1.0).map_err(|e| Errors::DegenerateFit(e.to_string()))?;
        Ok(Self {
            shape,
            loc,
            scale,
            gamma,
        })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.loc) / self.scale;
        if z <= 0.0 {
            return 0.0;
        }
        ((-self.shape - 1.0) * z.ln() - 1.0 / z - ln_gamma(self.shape)).exp() / self.scale
    }

    pub fn log_likelihood(&self, data: &[f64]) -> f64 {
        data.iter()
            .map(|&x| {
                let z = (x - self.loc) / self.scale;
                if z <= 0.0 {
                    f64::NEG_INFINITY
                } else {
                    (-self.shape - 1.0) * z.ln() - 1.0 / z - ln_gamma(self.shape) - self.scale.ln()
                }
            })
            .sum()
    }

    /// Maximum likelihood shape and scale for a fixed `loc`.
    ///
    /// `1 / (x - loc)` is gamma distributed with the same shape and rate `scale`; the shape
    /// is found by Newton iteration on `ln a - ψ(a) = ln mean(y) - mean(ln y)`.
    ///
    pub fn fit_with_loc(data: &[f64], loc: f64) -> Result<Self> {
        if data.len() < 2 {
            return Err(Errors::NotEnoughData("inverse gamma fit needs two samples".into()).into());
        }
        if data.iter().any(|&x| x <= loc) {
            return Err(Errors::DegenerateFit(format!("samples must exceed loc {}", loc)).into());
        }

        let y = data.iter().map(|&x| 1.0 / (x - loc)).collect::<Vec<_>>();
        let n = y.len() as f64;
        let mean = y.iter().sum::<f64>() / n;
        let mean_ln = y.iter().map(|v| v.ln()).sum::<f64>() / n;
        let s = mean.ln() - mean_ln;
        if s <= 0.0 {
            return Err(Errors::DegenerateFit("all samples are equal".into()).into());
        }

        let mut a = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
        for _ in 0..100 {
            let f = a.ln() - digamma(a) - s;
            let df = 1.0 / a - trigamma(a);
            let next = (a - f / df).max(a / 10.0);
            if (next - a).abs() < 1e-12 * a {
                a = next;
                break;
            }
            a = next;
        }

        Self::new(a, loc, a / mean)
    }

    /// Maximum likelihood fit including `loc`, searched on the profile likelihood
    /// below the sample minimum.
    ///
    pub fn fit(data: &[f64]) -> Result<Self> {
        if data.len() < 3 {
            return Err(Errors::NotEnoughData("inverse gamma fit needs three samples".into()).into());
        }
        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spread = (max - min).max(1e-6);

        let profile = |loc: f64| {
            Self::fit_with_loc(data, loc)
                .map(|d| d.log_likelihood(data))
                .unwrap_or(f64::NEG_INFINITY)
        };

        // coarse grid, then golden section around the best node
        let (lo, hi) = (min - 10.0 * spread, min - spread * 1e-6);
        let steps = 200;
        let h = (hi - lo) / steps as f64;
        let best = (0..=steps)
            .map(|i| lo + h * i as f64)
            .map(|loc| (loc, profile(loc)))
            .fold((lo, f64::NEG_INFINITY), |acc, v| if v.1 > acc.1 { v } else { acc });

        let g = (5f64.sqrt() - 1.0) / 2.0;
        let (mut a, mut b) = ((best.0 - h).max(lo), (best.0 + h).min(hi));
        for _ in 0..60 {
            let c = b - g * (b - a);
            let d = a + g * (b - a);
            if profile(c) > profile(d) {
                b = d;
            } else {
                a = c;
            }
        }
        let loc = (a + b) / 2.0;
        debug!("Inverse gamma profile likelihood peaks at loc={:.4}", loc);
        Self::fit_with_loc(data, loc)
    }
}

impl Distribution<f64> for InverseGamma {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let g = self.gamma.sample(rng);
        self.loc + self.scale / g
    }
}

/// Heading distribution
///
#[derive(Debug, Clone)]
pub enum AngleDistribution {
    /// Uniform on `[-π, π)`
    Uniform,
    /// Histogram weights, uniform inside each bin
    Empirical {
        edges: Vec<f64>,
        index: WeightedIndex<f64>,
    },
}

impl AngleDistribution {
    pub fn from_histogram(h: &Histogram) -> Result<Self> {
        let index = WeightedIndex::new(h.counts.iter().map(|&c| c as f64))
            .map_err(|e| Errors::NotEnoughData(format!("angle histogram: {}", e)))?;
        Ok(AngleDistribution::Empirical {
            edges: h.edges.clone(),
            index,
        })
    }

    /// Empirical distribution of `angles` (radians) binned on `[0, 2π)`
    ///
    pub fn from_angles(angles: &[f64], bins: usize) -> Result<Self> {
        Self::from_histogram(&Histogram::new(angles, bins, Some((0.0, 2.0 * PI))))
    }
}

impl Distribution<f64> for AngleDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            AngleDistribution::Uniform => rng.gen_range(-PI..PI),
            AngleDistribution::Empirical { edges, index } => {
                let bin = index.sample(rng);
                rng.gen_range(edges[bin]..edges[bin + 1])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::stats::distributions::{
        sample_truncated, AngleDistribution, Exponential, InverseGamma,
    };
    use crate::utils::histogram::Histogram;
    use crate::Errors;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::Distribution;
    use std::f64::consts::PI;

    #[test]
    fn exponential_fit() {
        let e = Exponential::fit(&[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(e.loc, 1.0);
        assert_eq!(e.scale, 2.0);
        assert_eq!(e.pdf(0.5), 0.0);
        assert!((e.pdf(1.0) - 0.5).abs() < 1e-12);
        assert!(Exponential::fit(&[]).is_err());
        assert!(Exponential::fit(&[2.0, 2.0]).is_err());
    }

    #[test]
    fn exponential_sampling() {
        let mut rng = StdRng::seed_from_u64(1);
        let e = Exponential::new(0.1, 0.2556);
        let samples = (0..20_000).map(|_| e.sample(&mut rng)).collect::<Vec<_>>();
        let fitted = Exponential::fit(&samples).unwrap();
        assert!((fitted.loc - 0.1).abs() < 0.01);
        assert!((fitted.scale - 0.2556).abs() < 0.01);

        let t = (0..1000)
            .map(|_| sample_truncated(&e, &mut rng, 0.3).unwrap())
            .fold(0.0, f64::max);
        assert!(t <= 0.3);

        // nothing of the distribution lies under its location
        let err = sample_truncated(&e, &mut rng, 0.05).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::TruncationLimit { .. })
        ));
    }

    #[test]
    fn inverse_gamma_pdf_integrates() {
        let d = InverseGamma::new(1.7239, -0.0667, 3.5195).unwrap();
        let h = 0.001;
        let area: f64 = (0..200_000).map(|i| d.pdf(-0.0667 + h * (i as f64 + 0.5)) * h).sum();
        // heavy tail beyond 200
        assert!(area > 0.95 && area < 1.0);
        assert_eq!(d.pdf(-1.0), 0.0);
    }

    #[test]
    fn inverse_gamma_recovers_parameters() {
        let mut rng = StdRng::seed_from_u64(7);
        let d = InverseGamma::new(3.0, 0.0, 2.0).unwrap();
        let samples = (0..20_000).map(|_| d.sample(&mut rng)).collect::<Vec<_>>();
        let fitted = InverseGamma::fit_with_loc(&samples, 0.0).unwrap();
        assert!((fitted.shape - 3.0).abs() < 0.15);
        assert!((fitted.scale - 2.0).abs() < 0.1);
        assert!(InverseGamma::fit_with_loc(&samples, 1e9).is_err());
    }

    #[test]
    fn inverse_gamma_loc_search() {
        let mut rng = StdRng::seed_from_u64(11);
        let d = InverseGamma::new(4.0, -1.0, 6.0).unwrap();
        let samples = (0..5_000).map(|_| d.sample(&mut rng)).collect::<Vec<_>>();
        let fitted = InverseGamma::fit(&samples).unwrap();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(fitted.loc < min);
        assert!(fitted.log_likelihood(&samples) >= d.log_likelihood(&samples) - 5.0);
    }

    #[test]
    fn angles() {
        let mut rng = StdRng::seed_from_u64(3);
        let u = AngleDistribution::Uniform;
        assert!((0..1000).map(|_| u.sample(&mut rng)).all(|a| (-PI..PI).contains(&a)));

        let h = Histogram::new(&[0.1, 0.2, 0.3], 4, Some((0.0, 2.0 * PI)));
        let e = AngleDistribution::from_histogram(&h).unwrap();
        assert!((0..1000)
            .map(|_| e.sample(&mut rng))
            .all(|a| (0.0..PI / 2.0).contains(&a)));

        assert!(AngleDistribution::from_angles(&[], 4).is_err());
    }
}
