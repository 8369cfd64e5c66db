use crate::plot::{series_color, Figure};
use crate::utils::histogram::Histogram as Binned;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;

const ARC_STEPS: usize = 8;

const TICKS: [&str; 8] = [
    "0° (Forwards)",
    "45°",
    "90°",
    "135°",
    "180° (Backwards)",
    "225°",
    "270°",
    "315°",
];

/// Polar point with 0 at the top and angles growing counter-clockwise
///
pub fn polar(theta: f64, r: f64) -> (f64, f64) {
    (-r * theta.sin(), r * theta.cos())
}

/// Closed outline of a circular sector between `from` and `to` with radius `r`
///
pub fn wedge(from: f64, to: f64, r: f64) -> Vec<(f64, f64)> {
    let mut points = vec![(0.0, 0.0)];
    points.extend((0..=ARC_STEPS).map(|i| {
        let theta = from + (to - from) * i as f64 / ARC_STEPS as f64;
        polar(theta, r)
    }));
    points
}

/// Rose diagram: one wedge per histogram bin, radius proportional to the count
///
#[derive(Debug, Clone, Default)]
pub struct RoseFigure {
    pub series: Vec<(String, Binned)>,
    pub legend: bool,
}

impl RoseFigure {
    pub fn series(mut self, label: &str, histogram: Binned) -> Self {
        self.series.push((label.to_string(), histogram));
        self
    }

    pub fn legend(mut self, legend: bool) -> Self {
        self.legend = legend;
        self
    }
}

impl Figure for RoseFigure {
    fn size(&self) -> (u32, u32) {
        (900, 900)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let max = self
            .series
            .iter()
            .flat_map(|(_, h)| h.counts.iter().copied())
            .max()
            .unwrap_or(0)
            .max(1) as f64;

        let mut chart = ChartBuilder::on(root)
            .margin(60)
            .build_cartesian_2d(-1.1f64..1.1f64, -1.1f64..1.1f64)?;

        for r in [0.25, 0.5, 0.75, 1.0] {
            chart.draw_series(std::iter::once(PathElement::new(
                wedge(0.0, 2.0 * PI, r).into_iter().skip(1).collect::<Vec<_>>(),
                BLACK.mix(0.2),
            )))?;
        }
        for (i, label) in TICKS.iter().enumerate() {
            let theta = i as f64 * PI / 4.0;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(0.0, 0.0), polar(theta, 1.0)],
                BLACK.mix(0.2),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                label.to_string(),
                polar(theta, 1.07),
                ("sans-serif", 16).into_font().color(&BLACK),
            )))?;
        }

        for (i, (label, h)) in self.series.iter().enumerate() {
            let color = series_color(i);
            let anno = chart.draw_series((0..h.bins()).filter(|b| h.counts[*b] > 0).map(|b| {
                Polygon::new(
                    wedge(h.edges[b], h.edges[b + 1], h.counts[b] as f64 / max),
                    color.mix(0.6).filled(),
                )
            }))?;
            anno.label(label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
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

#[cfg(test)]
mod tests {
    use crate::plot::rose::{polar, wedge};
    use std::f64::consts::PI;

    #[test]
    fn orientation() {
        let (x, y) = polar(0.0, 1.0);
        assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
        // a quarter turn counter-clockwise points left
        let (x, y) = polar(PI / 2.0, 2.0);
        assert!((x + 2.0).abs() < 1e-12 && y.abs() < 1e-12);
    }

    #[test]
    fn sector() {
        let w = wedge(0.0, PI / 2.0, 0.5);
        assert_eq!(w.len(), 10);
        assert_eq!(w[0], (0.0, 0.0));
        assert!(w.iter().skip(1).all(|(x, y)| (x.hypot(*y) - 0.5).abs() < 1e-12));
    }
}
