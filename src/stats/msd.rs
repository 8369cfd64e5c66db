use crate::position::TrackedObject;
use crate::stats::displacement::distance;
use crate::utils::fit::{fit_through_origin, linear_fit, LinearFit};
use crate::Errors;
use anyhow::Result;
use rayon::prelude::*;

/// Squared displacements between frames `tau` apart
///
pub fn squared_displacements(x: &[f64], y: &[f64], tau: usize) -> Vec<f64> {
    let n = x.len().min(y.len());
    (0..n.saturating_sub(tau))
        .map(|i| distance((x[i], y[i]), (x[i + tau], y[i + tau])).powi(2))
        .collect()
}

/// Mean squared displacement as a function of the lag.
///
/// `tau` is in frames until [`MsdCurve::to_seconds`] is applied.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsdCurve {
    pub tau: Vec<f64>,
    pub msd: Vec<f64>,
}

/// Lags `1 ..< len / 2` of a series of `len` frames
///
fn lags(len: usize) -> std::ops::Range<usize> {
    1..(len / 2).max(1)
}

/// MSD of a single series for lags `1 ..< len / 2`
///
pub fn msd(x: &[f64], y: &[f64]) -> MsdCurve {
    let n = x.len().min(y.len());
    let points = lags(n)
        .into_par_iter()
        .map(|t| {
            let sd = squared_displacements(x, y, t);
            (t as f64, sd.iter().sum::<f64>() / sd.len() as f64)
        })
        .collect::<Vec<_>>();
    let (tau, msd) = points.into_iter().unzip();
    MsdCurve { tau, msd }
}

/// MSD of several series pooled per lag.
///
/// Every series contributes its squared displacements for lags `1 ..< len / 2`; the pooled
/// curve covers lags `1 ..< max_lag` where `max_lag` is the largest contributed lag.
///
pub fn pooled_msd(objects: &[&TrackedObject]) -> MsdCurve {
    let max_lag = objects
        .iter()
        .filter_map(|o| lags(o.len()).last())
        .max()
        .unwrap_or(0);

    let points = (1..max_lag)
        .into_par_iter()
        .filter_map(|t| {
            let (sum, count) = objects
                .iter()
                .filter(|o| lags(o.len()).contains(&t))
                .map(|o| squared_displacements(&o.x, &o.y, t))
                .fold((0.0, 0usize), |(s, c), sd| {
                    (s + sd.iter().sum::<f64>(), c + sd.len())
                });
            (count > 0).then(|| (t as f64, sum / count as f64))
        })
        .collect::<Vec<_>>();
    let (tau, msd) = points.into_iter().unzip();
    MsdCurve { tau, msd }
}

impl MsdCurve {
    pub fn len(&self) -> usize {
        self.tau.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tau.is_empty()
    }

    /// Lags converted from frames to seconds
    ///
    pub fn to_seconds(&self, fps: f64) -> Self {
        Self {
            tau: self.tau.iter().map(|t| t / fps).collect(),
            msd: self.msd.clone(),
        }
    }

    /// Splits the curve at `tau_limit`: points with `tau <= tau_limit` and the rest.
    ///
    /// A limit `<= 0` keeps every point in the first part.
    ///
    pub fn limit(&self, tau_limit: f64) -> (Self, Self) {
        if tau_limit <= 0.0 {
            return (self.clone(), Self::default());
        }
        let mut kept = Self::default();
        let mut rest = Self::default();
        for (t, m) in self.tau.iter().zip(self.msd.iter()) {
            let target = if *t <= tau_limit { &mut kept } else { &mut rest };
            target.tau.push(*t);
            target.msd.push(*m);
        }
        (kept, rest)
    }

    /// Least squares line through `(log10 tau, log10 msd)`; non-positive points are skipped.
    ///
    /// The slope is the anomalous diffusion exponent.
    ///
    pub fn log_fit(&self) -> Result<LinearFit> {
        let (lt, lm): (Vec<f64>, Vec<f64>) = self
            .tau
            .iter()
            .zip(self.msd.iter())
            .filter(|(t, m)| **t > 0.0 && **m > 0.0)
            .map(|(t, m)| (t.log10(), m.log10()))
            .unzip();
        if lt.len() < 2 {
            return Err(Errors::NotEnoughData("MSD curve has fewer than 2 points".into()).into());
        }
        linear_fit(&lt, &lm)
    }

    pub fn linear_fit(&self) -> Result<LinearFit> {
        linear_fit(&self.tau, &self.msd)
    }

    /// Slope of the MSD line forced through the origin
    ///
    pub fn origin_fit(&self) -> Result<f64> {
        fit_through_origin(&self.tau, &self.msd)
    }
}

/// Diffusion constant of 2-D Brownian motion, `MSD = 4 D tau`
///
pub fn diffusion_constant(slope: f64) -> f64 {
    slope / 4.0
}

#[cfg(test)]
mod tests {
    use crate::position::TrackedObject;
    use crate::stats::msd::{diffusion_constant, msd, pooled_msd, squared_displacements, MsdCurve};

    fn line(n: usize) -> TrackedObject {
        TrackedObject::new((0..n).map(|i| i as f64).collect(), vec![0.0; n])
    }

    #[test]
    fn ballistic_motion() {
        let o = line(10);
        assert_eq!(squared_displacements(&o.x, &o.y, 3).len(), 7);
        let c = msd(&o.x, &o.y);
        assert_eq!(c.tau, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(c.msd, vec![1.0, 4.0, 9.0, 16.0]);
        let f = c.log_fit().unwrap();
        assert!((f.slope - 2.0).abs() < 1e-9);
    }

    #[test]
    fn short_series() {
        let o = line(3);
        assert!(msd(&o.x, &o.y).is_empty());
        assert!(msd(&o.x, &o.y).log_fit().is_err());
    }

    #[test]
    fn pooling() {
        let a = line(10);
        let b = line(6);
        let c = pooled_msd(&[&a, &b]);
        // max contributed lag is 4, pooled lags stop before it
        assert_eq!(c.tau, vec![1.0, 2.0, 3.0]);
        assert_eq!(c.msd, vec![1.0, 4.0, 9.0]);

        let mut stationary = line(6);
        stationary.x = vec![0.0; 6];
        let c = pooled_msd(&[&a, &stationary]);
        // lag 1: 9 ones and 5 zeros
        assert!((c.msd[0] - 9.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn seconds_and_limit() {
        let c = MsdCurve {
            tau: vec![1.0, 2.0, 3.0, 4.0],
            msd: vec![4.0, 8.0, 12.0, 16.0],
        }
        .to_seconds(2.0);
        assert_eq!(c.tau, vec![0.5, 1.0, 1.5, 2.0]);
        let (kept, rest) = c.limit(1.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(rest.tau, vec![1.5, 2.0]);
        assert_eq!(c.limit(0.0).0.len(), 4);

        assert!((c.linear_fit().unwrap().slope - 8.0).abs() < 1e-9);
        assert!((c.origin_fit().unwrap() - 8.0).abs() < 1e-9);
        assert_eq!(diffusion_constant(8.0), 2.0);
    }
}
