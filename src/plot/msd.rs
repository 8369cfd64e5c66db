use crate::plot::{log_range, padded_range, series_color, Figure};
use crate::stats::msd::MsdCurve;
use crate::utils::fit::LinearFit;
use anyhow::Result;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

/// One data set of an MSD figure
///
#[derive(Debug, Clone)]
pub struct MsdSeries {
    pub label: String,
    pub curve: MsdCurve,
    pub fit: LinearFit,
}

impl MsdSeries {
    /// Fitted line evaluated at the curve lags.
    ///
    /// With `logged` the fit is a `log10`-`log10` line, so the result is a power law.
    ///
    pub fn fitted(&self, logged: bool) -> Vec<(f64, f64)> {
        self.curve
            .tau
            .iter()
            .filter(|t| !logged || **t > 0.0)
            .map(|&t| {
                if logged {
                    (t, 10f64.powf(self.fit.eval(t.log10())))
                } else {
                    (t, self.fit.eval(t))
                }
            })
            .collect()
    }
}

/// MSD against the lag for several sets, scattered points plus fitted lines
///
#[derive(Debug, Clone)]
pub struct MsdFigure {
    pub series: Vec<MsdSeries>,
    pub logged: bool,
    pub scatter: bool,
    pub legend: bool,
    pub units: String,
}

impl MsdFigure {
    pub fn new(units: &str, logged: bool) -> Self {
        Self {
            series: Vec::new(),
            logged,
            scatter: true,
            legend: true,
            units: units.to_string(),
        }
    }

    pub fn series(mut self, label: &str, curve: MsdCurve, fit: LinearFit) -> Self {
        self.series.push(MsdSeries {
            label: label.to_string(),
            curve,
            fit,
        });
        self
    }

    pub fn scatter(mut self, scatter: bool) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn legend(mut self, legend: bool) -> Self {
        self.legend = legend;
        self
    }

    fn draw_curves<'a, DB, X, Y>(&self, chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>) -> Result<()>
    where
        DB: DrawingBackend + 'a,
        DB::ErrorType: 'static,
        X: Ranged<ValueType = f64>,
        Y: Ranged<ValueType = f64>,
    {
        for (i, s) in self.series.iter().enumerate() {
            let color = series_color(i);
            if self.scatter {
                chart.draw_series(
                    s.curve
                        .tau
                        .iter()
                        .zip(s.curve.msd.iter())
                        .filter(|(t, m)| !self.logged || (**t > 0.0 && **m > 0.0))
                        .map(|(t, m)| Circle::new((*t, *m), 2, color.filled())),
                )?;
            }
            chart
                .draw_series(LineSeries::new(s.fitted(self.logged), color.stroke_width(2)))?
                .label(format!("{} : Slope {:.2}", s.label, s.fit.slope))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
        if self.legend && !self.series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}

impl Figure for MsdFigure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let taus = || self.series.iter().flat_map(|s| s.curve.tau.clone());
        let msds = || self.series.iter().flat_map(|s| s.curve.msd.clone());
        let y_desc = format!("MSD ({}²)", self.units);

        let mut builder = ChartBuilder::on(root);
        builder
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70);

        if self.logged {
            let mut chart = builder.build_cartesian_2d(
                log_range(taus(), 1.2).log_scale(),
                log_range(msds(), 1.5).log_scale(),
            )?;
            chart
                .configure_mesh()
                .x_desc("τ (sec)")
                .y_desc(y_desc.as_str())
                .draw()?;
            self.draw_curves(&mut chart)
        } else {
            let x: RangedCoordf64 = padded_range(taus(), 0.05).into();
            let y: RangedCoordf64 = padded_range(msds(), 0.05).into();
            let mut chart = builder.build_cartesian_2d(x, y)?;
            chart
                .configure_mesh()
                .x_desc("τ (sec)")
                .y_desc(y_desc.as_str())
                .draw()?;
            self.draw_curves(&mut chart)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::plot::msd::MsdSeries;
    use crate::stats::msd::MsdCurve;
    use crate::utils::fit::LinearFit;

    #[test]
    fn power_law_line() {
        let s = MsdSeries {
            label: "set".into(),
            curve: MsdCurve {
                tau: vec![1.0, 10.0, 100.0],
                msd: vec![0.0; 3],
            },
            fit: LinearFit {
                slope: 1.0,
                intercept: -1.0,
            },
        };
        let logged = s.fitted(true);
        assert!((logged[1].1 - 1.0).abs() < 1e-12);
        assert!((logged[2].1 - 10.0).abs() < 1e-9);
        let linear = s.fitted(false);
        assert_eq!(linear[1], (10.0, 9.0));
    }
}
