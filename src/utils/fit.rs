use crate::utils::special::student_t_two_sided;
use crate::Errors;
use anyhow::Result;
use nalgebra::{DMatrix, DVector};

/// Straight line `y = slope * x + intercept`
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares regression with the usual goodness statistics
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub fit: LinearFit,
    /// Pearson correlation coefficient
    pub r: f64,
    /// Two-sided p-value of the zero-slope hypothesis
    pub p: f64,
    /// Standard error of the slope
    pub stderr: f64,
}

/// Least squares polynomial fit solved with SVD.
///
/// Returns the coefficients from the constant term upwards.
///
/// # Parameters
/// * `x`, `y` - samples, the shorter slice bounds the sample count;
/// * `degree` - polynomial degree.
///
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>> {
    let n = x.len().min(y.len());
    if n < degree + 1 {
        return Err(Errors::NotEnoughData(format!(
            "{} points for a polynomial of degree {}",
            n, degree
        ))
        .into());
    }

    let a = DMatrix::from_fn(n, degree + 1, |r, c| x[r].powi(c as i32));
    let b = DVector::from_iterator(n, y.iter().take(n).copied());
    let coefficients = a
        .svd(true, true)
        .solve(&b, f64::EPSILON)
        .map_err(|e| Errors::DegenerateFit(e.to_string()))?;

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(Errors::DegenerateFit("non-finite coefficients".into()).into());
    }
    Ok(coefficients.iter().copied().collect())
}

/// Degree one [`polyfit`]
///
pub fn linear_fit(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    let c = polyfit(x, y, 1)?;
    Ok(LinearFit {
        slope: c[1],
        intercept: c[0],
    })
}

/// Least squares slope of a line constrained to pass through the origin
///
pub fn fit_through_origin(x: &[f64], y: &[f64]) -> Result<f64> {
    let sxx: f64 = x.iter().map(|v| v * v).sum();
    if sxx == 0.0 {
        return Err(Errors::DegenerateFit("all abscissae are zero".into()).into());
    }
    let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    Ok(sxy / sxx)
}

/// Simple linear regression of `y` against `x`.
///
pub fn linregress(x: &[f64], y: &[f64]) -> Result<Regression> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(Errors::NotEnoughData(format!("{} points for a regression", n)).into());
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, _) = mean_std(x);
    let (my, _) = mean_std(y);

    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    let syy: f64 = y.iter().map(|v| (v - my).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    if sxx == 0.0 {
        return Err(Errors::DegenerateFit("constant abscissae".into()).into());
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let df = (n - 2) as f64;
    let (p, stderr) = if n > 2 {
        let stderr = ((1.0 - r * r).max(0.0) * syy / sxx / df).sqrt();
        let t = if stderr == 0.0 {
            f64::INFINITY
        } else {
            slope / stderr
        };
        (student_t_two_sided(t, df), stderr)
    } else {
        (1.0, 0.0)
    };

    Ok(Regression {
        fit: LinearFit { slope, intercept },
        r,
        p,
        stderr,
    })
}

/// Mean and population standard deviation; `(NaN, NaN)` for an empty slice
///
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use crate::utils::fit::{fit_through_origin, linear_fit, linregress, mean_std, polyfit};

    #[test]
    fn line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let f = linear_fit(&x, &y).unwrap();
        assert!((f.slope - 2.0).abs() < 1e-9);
        assert!((f.intercept - 1.0).abs() < 1e-9);
        assert!((f.eval(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn quadratic() {
        let x = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let y = x.map(|v: f64| 3.0 * v * v - v + 0.5);
        let c = polyfit(&x, &y, 2).unwrap();
        assert!((c[0] - 0.5).abs() < 1e-9);
        assert!((c[1] + 1.0).abs() < 1e-9);
        assert!((c[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_points() {
        assert!(polyfit(&[1.0], &[1.0], 1).is_err());
        assert!(linregress(&[1.0], &[1.0]).is_err());
    }

    #[test]
    fn origin() {
        let s = fit_through_origin(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
        assert!(fit_through_origin(&[0.0], &[1.0]).is_err());
    }

    #[test]
    fn regression_statistics() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1];
        let r = linregress(&x, &y).unwrap();
        assert!((r.fit.slope - 1.99).abs() < 1e-9);
        assert!(r.r > 0.99);
        assert!(r.p < 0.001);
        assert!(r.stderr > 0.0);
    }

    #[test]
    fn moments() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((m - 5.0).abs() < 1e-12);
        assert!((s - 2.0).abs() < 1e-12);
        assert!(mean_std(&[]).0.is_nan());
    }
}
