use crate::plot::{padded_range, series_color, Figure};
use crate::position::PositionData;
use crate::stats::activity::Activity;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

/// Activity of several objects against the frame number
///
#[derive(Debug, Clone)]
pub struct ActivityFigure {
    pub interval: usize,
    pub series: Vec<(String, Activity)>,
}

impl ActivityFigure {
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            series: Vec::new(),
        }
    }

    pub fn series(mut self, label: &str, activity: Activity) -> Self {
        self.series.push((label.to_string(), activity));
        self
    }
}

impl Figure for ActivityFigure {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let t_max = self
            .series
            .iter()
            .flat_map(|(_, a)| a.t.iter().copied())
            .max()
            .unwrap_or(0)
            .max(1) as f64;
        let a_range = padded_range(
            self.series
                .iter()
                .flat_map(|(_, a)| a.activity.iter().copied())
                .chain(std::iter::once(0.0)),
            0.05,
        );

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("Activity over Time ({} frame interval)", self.interval),
                ("sans-serif", 22),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..t_max, a_range)?;
        chart
            .configure_mesh()
            .x_desc("Time (frames)")
            .y_desc("Activity")
            .draw()?;

        for (i, (label, a)) in self.series.iter().enumerate() {
            let color = series_color(i);
            chart
                .draw_series(LineSeries::new(
                    a.t.iter().map(|t| *t as f64).zip(a.activity.iter().copied()),
                    &color,
                ))?
                .label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
        if !self.series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }
}

/// Paths of the tracked objects on the canvas, with the origin at the top left
///
#[derive(Debug, Clone)]
pub struct TrajectoryFigure {
    pub data: PositionData,
    /// Draw only the frames up to this 1-based frame
    pub until: Option<usize>,
}

impl TrajectoryFigure {
    pub fn new(data: PositionData) -> Self {
        Self { data, until: None }
    }

    pub fn until(mut self, frame: usize) -> Self {
        self.until = Some(frame);
        self
    }

    /// Flips `y` so that image rows grow downwards on the chart
    ///
    pub fn to_chart(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x, self.data.canvas.height - y)
    }
}

impl Figure for TrajectoryFigure {
    fn size(&self) -> (u32, u32) {
        let c = &self.data.canvas;
        let ratio = if c.width > 0.0 { c.height / c.width } else { 0.75 };
        (1024, (1024.0 * ratio).round().max(200.0) as u32 + 80)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let canvas = &self.data.canvas;
        let frame = self
            .until
            .map(|f| format!(", Frame {}", f))
            .unwrap_or_default();
        let height = canvas.height;

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("Jumping Bean Coordinates ({}){}", canvas.units, frame),
                ("sans-serif", 22),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..canvas.width, 0.0..height)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(format!("X position ({})", canvas.units))
            .y_desc(format!("Y position ({})", canvas.units))
            .y_label_formatter(&|v| format!("{:.1}", height - v))
            .draw()?;

        let end = self.until.unwrap_or(usize::MAX);
        for (i, o) in self.data.objects.iter().enumerate() {
            let color = series_color(i);
            let path = o
                .x
                .iter()
                .zip(o.y.iter())
                .take(end)
                .map(|(x, y)| self.to_chart((*x, *y)))
                .collect::<Vec<_>>();
            if let Some(last) = path.last().copied() {
                chart.draw_series(LineSeries::new(path, color.mix(0.5)))?;
                chart
                    .draw_series(std::iter::once(Circle::new(last, 5, color.filled())))?
                    .label(format!("Object {}", i))
                    .legend(move |(x, y)| Circle::new((x + 10, y), 5, color.filled()));
            }
        }
        if !self.data.objects.is_empty() {
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
    use crate::plot::series::TrajectoryFigure;
    use crate::plot::Figure;
    use crate::test_stuff::{position_data, random_walk};

    #[test]
    fn flipped_axis() {
        let f = TrajectoryFigure::new(position_data(vec![random_walk(5, 0.1, 1)], 1.0));
        assert_eq!(f.to_chart((1.0, 0.0)), (1.0, 21.59));
        assert_eq!(f.to_chart((0.0, 21.59)), (0.0, 0.0));
        let (w, h) = f.size();
        assert_eq!(w, 1024);
        assert!(h > 800 && h < 1024);
    }
}
