use crate::plot::{padded_range, Figure};
use crate::stats::compare::GroupSummary;
use crate::utils::fit::LinearFit;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Black scatter with an optional red regression line over the data range
///
#[derive(Debug, Clone, Default)]
pub struct ScatterFigure {
    pub points: Vec<(f64, f64)>,
    pub fit: Option<LinearFit>,
    pub x_desc: String,
    pub y_desc: String,
}

impl ScatterFigure {
    pub fn new(x_desc: &str, y_desc: &str, points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            fit: None,
            x_desc: x_desc.to_string(),
            y_desc: y_desc.to_string(),
        }
    }

    pub fn fit(mut self, fit: LinearFit) -> Self {
        self.fit = Some(fit);
        self
    }

    /// End points of the fit line over the x extent of the data; `None` when the extent is empty
    ///
    pub fn fit_line(&self) -> Option<[(f64, f64); 2]> {
        let fit = self.fit?;
        let (lo, hi) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
                (lo.min(*x), hi.max(*x))
            });
        (hi > lo).then(|| [(lo, fit.eval(lo)), (hi, fit.eval(hi))])
    }
}

impl Figure for ScatterFigure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let line = self.fit_line();
        let xs = self.points.iter().map(|p| p.0);
        let ys = self
            .points
            .iter()
            .map(|p| p.1)
            .chain(line.iter().flat_map(|l| [l[0].1, l[1].1]));

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(padded_range(xs, 0.05), padded_range(ys, 0.05))?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()?;

        chart.draw_series(
            self.points
                .iter()
                .map(|p| Circle::new(*p, 4, BLACK.filled())),
        )?;
        if let Some(l) = line {
            chart.draw_series(LineSeries::new(l, RED.stroke_width(2)))?;
        }
        Ok(())
    }
}

/// Mean of each group as a bar with a ±std error bar
///
#[derive(Debug, Clone, Default)]
pub struct BarFigure {
    pub groups: Vec<GroupSummary>,
    pub y_desc: String,
}

impl BarFigure {
    pub fn new(y_desc: &str, groups: Vec<GroupSummary>) -> Self {
        Self {
            groups,
            y_desc: y_desc.to_string(),
        }
    }
}

impl Figure for BarFigure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let top = self
            .groups
            .iter()
            .map(|g| g.mean + g.std)
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
            .max(f64::EPSILON)
            * 1.15;
        let names = self.groups.iter().map(|g| g.name.clone()).collect::<Vec<_>>();

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d((0..self.groups.len()).into_segmented(), 0.0..top)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => names.get(*i).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .y_desc(self.y_desc.as_str())
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.5).filled())
                .margin(40)
                .data(self.groups.iter().enumerate().map(|(i, g)| (i, g.mean))),
        )?;
        for (i, g) in self.groups.iter().enumerate() {
            let x = SegmentValue::CenterOf(i);
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x.clone(), (g.mean - g.std).max(0.0)), (x, g.mean + g.std)],
                BLACK.stroke_width(2),
            )))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::plot::scatter::ScatterFigure;
    use crate::utils::fit::LinearFit;

    #[test]
    fn line_spans_data() {
        let f = ScatterFigure::new("x", "y", vec![(3.0, 1.0), (1.0, 0.0), (2.0, 5.0)]).fit(
            LinearFit {
                slope: 2.0,
                intercept: 1.0,
            },
        );
        assert_eq!(f.fit_line(), Some([(1.0, 3.0), (3.0, 7.0)]));
        assert_eq!(ScatterFigure::new("x", "y", vec![]).fit_line(), None);
        assert_eq!(
            ScatterFigure::new("x", "y", vec![(1.0, 1.0)]).fit_line(),
            None
        );
    }
}
