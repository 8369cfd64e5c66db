use crate::plot::{padded_range, series_color, Figure};
use crate::utils::histogram::Histogram as Binned;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Outline of histogram bars: `(edge, height)` corners from the first to the last edge
///
pub fn step_points(edges: &[f64], heights: &[f64]) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(heights.len() * 2 + 2);
    if let Some(first) = edges.first() {
        points.push((*first, 0.0));
    }
    for (i, h) in heights.iter().enumerate() {
        if i + 1 >= edges.len() {
            break;
        }
        points.push((edges[i], *h));
        points.push((edges[i + 1], *h));
    }
    if let Some(last) = edges.get(heights.len().min(edges.len().saturating_sub(1))) {
        points.push((*last, 0.0));
    }
    points
}

/// Step histograms of one or more series with an optional fitted density.
///
#[derive(Debug, Clone, Default)]
pub struct HistogramFigure {
    pub title: Option<String>,
    pub x_desc: String,
    pub series: Vec<(String, Binned)>,
    /// Heights are probability densities instead of counts
    pub density: bool,
    pub x_range: Option<(f64, f64)>,
    /// Curve drawn in red over the histograms
    pub fitted: Option<Vec<(f64, f64)>>,
}

impl HistogramFigure {
    pub fn new(x_desc: &str) -> Self {
        Self {
            x_desc: x_desc.to_string(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn series(mut self, label: &str, histogram: Binned) -> Self {
        self.series.push((label.to_string(), histogram));
        self
    }

    pub fn density(mut self, density: bool) -> Self {
        self.density = density;
        self
    }

    pub fn x_range(mut self, lo: f64, hi: f64) -> Self {
        assert!(hi > lo, "Empty x range");
        self.x_range = Some((lo, hi));
        self
    }

    pub fn fitted(mut self, curve: Vec<(f64, f64)>) -> Self {
        self.fitted = Some(curve);
        self
    }

    fn heights(&self, h: &Binned) -> Vec<f64> {
        if self.density {
            h.density()
        } else {
            h.counts.iter().map(|c| *c as f64).collect()
        }
    }
}

impl Figure for HistogramFigure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let x_range = match self.x_range {
            Some((lo, hi)) => lo..hi,
            None => padded_range(self.series.iter().flat_map(|(_, h)| h.edges.clone()), 0.02),
        };
        let y_max = self
            .series
            .iter()
            .flat_map(|(_, h)| self.heights(h))
            .chain(self.fitted.iter().flatten().map(|(_, y)| *y))
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
            .max(f64::EPSILON)
            * 1.1;

        let mut builder = ChartBuilder::on(root);
        if let Some(title) = &self.title {
            builder.caption(title, ("sans-serif", 22));
        }
        let mut chart = builder
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0.0..y_max)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(self.x_desc.as_str())
            .y_desc("Frequency")
            .draw()?;

        let single = self.series.len() == 1;
        for (i, (label, h)) in self.series.iter().enumerate() {
            let color = if single { BLACK.to_rgba() } else { series_color(i) };
            let anno = chart.draw_series(LineSeries::new(
                step_points(&h.edges, &self.heights(h)),
                color.stroke_width(2),
            ))?;
            if !single {
                anno.label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }

        if let Some(curve) = &self.fitted {
            chart.draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(2)))?;
        }

        if self.series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}
