/// Step histograms with fitted densities
pub mod histogram;
/// MSD curves and their fits
pub mod msd;
/// Polar histograms of angles
pub mod rose;
/// Bars, scatter plots and regression lines
pub mod scatter;
/// Time series and trajectories
pub mod series;

use crate::Errors;
use anyhow::Result;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const DEFAULT_SIZE: (u32, u32) = (1024, 768);

/// Image format of an exported figure
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(Errors::WrongExtension {
                path: path.display().to_string(),
                expected: "png|svg".into(),
            }
            .into()),
        }
    }
}

/// Appends `.png` to paths given without an extension
///
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("png")
    }
}

/// Chart that can be drawn on any plotters backend
///
pub trait Figure {
    fn size(&self) -> (u32, u32) {
        DEFAULT_SIZE
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static;
}

/// Renders `figure` to `path`; the format follows the extension (PNG when there is none).
///
/// Returns the path actually written.
///
pub fn save<F: Figure, P: AsRef<Path>>(figure: &F, path: P) -> Result<PathBuf> {
    let path = with_default_extension(path.as_ref());
    match OutputFormat::from_path(&path)? {
        OutputFormat::Png => {
            let root = BitMapBackend::new(&path, figure.size()).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(&path, figure.size()).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
    }
    info!("Saved figure to '{}'.", path.display());
    Ok(path)
}

/// Range covering `values` with a relative margin; `0..1` when there is nothing to cover
///
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I, margin: f64) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo {
        (hi - lo) * margin
    } else {
        lo.abs().max(1.0) * margin.max(0.05)
    };
    (lo - pad)..(hi + pad)
}

/// Range of the positive `values` widened by `factor` on both ends, for log axes
///
pub fn log_range<I: IntoIterator<Item = f64>>(values: I, factor: f64) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.1..1.0;
    }
    let factor = factor.max(1.0 + f64::EPSILON);
    (lo / factor)..(hi * factor)
}

/// Distinct colour of the `i`-th series
///
pub fn series_color(i: usize) -> RGBAColor {
    Palette99::pick(i).to_rgba()
}

#[cfg(test)]
mod tests {
    use crate::plot::{log_range, padded_range, with_default_extension, OutputFormat};
    use std::path::Path;

    #[test]
    fn formats() {
        assert_eq!(
            OutputFormat::from_path(Path::new("fig.SVG")).unwrap(),
            OutputFormat::Svg
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("a/figure.png")).unwrap(),
            OutputFormat::Png
        );
        assert!(OutputFormat::from_path(Path::new("figure.pdf")).is_err());
        assert_eq!(
            with_default_extension(Path::new("figure-msd")),
            Path::new("figure-msd.png")
        );
        assert_eq!(
            with_default_extension(Path::new("figure.svg")),
            Path::new("figure.svg")
        );
    }

    #[test]
    fn ranges() {
        assert_eq!(padded_range([0.0, 10.0], 0.1), -1.0..11.0);
        assert_eq!(padded_range(Vec::<f64>::new(), 0.1), 0.0..1.0);
        let r = padded_range([2.0, 2.0], 0.0);
        assert!(r.start < 2.0 && r.end > 2.0);

        let r = log_range([0.0, 0.5, 20.0, f64::NAN], 2.0);
        assert_eq!(r, 0.25..40.0);
        assert_eq!(log_range([-1.0], 2.0), 0.1..1.0);
    }
}
