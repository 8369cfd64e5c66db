use crate::plot::histogram::HistogramFigure;
use crate::plot::save;
use crate::position::manifest::{Manifest, SetInfo};
use crate::position::{PositionData, TrackedObject};
use crate::simulation::{DELAY_LOC, DELAY_SCALE, DELAY_SHAPE, DISP_LOC, DISP_SCALE};
use crate::stats::delay::{delay_seconds, jumps, min_delay_frames, DEFAULT_MIN_DELAY, DEFAULT_THRESHOLD};
use crate::stats::distributions::{Exponential, InverseGamma};
use crate::stats::msd::{pooled_msd, MsdCurve};
use crate::utils::fit::{mean_std, LinearFit};
use crate::utils::histogram::Histogram;
use crate::Errors;
use anyhow::Result;
use log::{debug, info};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

pub const SAVED_DELAYS_DIR: &str = "saved-delays";
pub const SAVED_DISPS_DIR: &str = "saved-disps";

/// Longest delay (s) kept for the inverse-gamma fit
pub const MAX_FIT_DELAY: f64 = 25.0;
pub const DISPLACEMENT_BINS: usize = 40;
pub const ANGLE_BINS: usize = 30;

/// Axes of the MSD regression
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MsdScale {
    /// `log10 MSD` against `log10 tau`
    #[default]
    Log,
    Linear,
}

#[derive(Debug, Clone)]
pub struct SetMsd {
    pub info: SetInfo,
    /// Points within the lag limit, lags in seconds
    pub curve: MsdCurve,
    /// Points beyond the lag limit
    pub excluded: MsdCurve,
    pub fit: LinearFit,
}

#[derive(Debug, Clone)]
pub struct MsdReport {
    pub sets: Vec<SetMsd>,
    /// Position units of the first loaded file
    pub units: String,
    pub slope_mean: f64,
    pub slope_std: f64,
}

/// Pooled MSD of every set in the manifest.
///
/// Lags are converted with the fps of the first file of each set and limited to its
/// `tau_limit`; the slope of each fitted line is the set's diffusion exponent (log scale) or
/// `4 D` (linear scale).
///
/// # Parameters
/// * `object` - index of the object taken from every file.
///
pub fn msd_by_set(manifest: &Manifest, object: usize, scale: MsdScale) -> Result<MsdReport> {
    let mut sets = Vec::new();
    let mut units = None;
    for name in manifest.sets() {
        info!("Processing set '{}'...", name);
        let info = manifest
            .set_info(&name)
            .ok_or_else(|| Errors::NotEnoughData(format!("set '{}' has no files", name)))?;
        let data = manifest.load_set(&name)?;
        if units.is_none() {
            units = data.first().map(|d| d.canvas.units.clone());
        }
        let objects = data
            .iter()
            .map(|d| d.object(object))
            .collect::<Result<Vec<&TrackedObject>>>()?;

        let pooled = pooled_msd(&objects).to_seconds(info.fps);
        let (curve, excluded) = pooled.limit(info.tau_limit);
        let fit = match scale {
            MsdScale::Log => curve.log_fit()?,
            MsdScale::Linear => curve.linear_fit()?,
        };
        debug!(
            "Set '{}': {} lags fitted, {} beyond the limit, slope {:.3}",
            name,
            curve.len(),
            excluded.len(),
            fit.slope
        );
        sets.push(SetMsd {
            info,
            curve,
            excluded,
            fit,
        });
    }

    let slopes = sets.iter().map(|s| s.fit.slope).collect::<Vec<_>>();
    let (slope_mean, slope_std) = mean_std(&slopes);
    info!("MSD Slope: {:.3} ± {:.3}", slope_mean, slope_std);
    Ok(MsdReport {
        sets,
        units: units.unwrap_or_default(),
        slope_mean,
        slope_std,
    })
}

/// Parameters of the delay and displacement extraction
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistsOptions {
    /// Displacement under which a frame counts as resting
    pub threshold: f64,
    /// Minimal rest in seconds before a jump is recorded
    pub min_delay: f64,
    /// Use the published fit instead of fitting the data
    pub hardcoded: bool,
}

impl Default for DistsOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_delay: DEFAULT_MIN_DELAY,
            hardcoded: false,
        }
    }
}

/// Jump statistics of one set or one file
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JumpSamples {
    pub name: String,
    /// Rest before each jump, whole seconds
    pub delays: Vec<f64>,
    pub displacements: Vec<f64>,
    pub turn_angles: Vec<f64>,
}

impl JumpSamples {
    fn extend(&mut self, other: JumpSamples) {
        self.delays.extend(other.delays);
        self.displacements.extend(other.displacements);
        self.turn_angles.extend(other.turn_angles);
    }
}

/// Jumps of the first object of `data`
///
pub fn file_samples(data: &PositionData, opts: &DistsOptions) -> Result<JumpSamples> {
    let o = data.object(0)?;
    let fps = data.canvas.fps;
    let js = jumps(&o.x, &o.y, opts.threshold, min_delay_frames(opts.min_delay, fps));
    Ok(JumpSamples {
        name: String::new(),
        delays: js.iter().map(|j| delay_seconds(j.delay_frames, fps)).collect(),
        displacements: js.iter().map(|j| j.displacement).collect(),
        turn_angles: js.iter().filter_map(|j| j.turn_angle).collect(),
    })
}

#[derive(Debug, Clone)]
pub struct DistsReport {
    pub units: String,
    pub sets: Vec<JumpSamples>,
    pub total: JumpSamples,
    /// Total delays within `min_delay ..= MAX_FIT_DELAY`
    pub fit_delays: Vec<f64>,
    pub delay_fit: InverseGamma,
    pub displacement_fit: Exponential,
}

/// Delay bins of one second: as many bins as the longest delay
///
pub fn delay_histogram(delays: &[f64]) -> Histogram {
    let max = delays.iter().copied().fold(0.0, f64::max);
    Histogram::new(delays, max as usize, None)
}

pub fn displacement_histogram(displacements: &[f64]) -> Histogram {
    Histogram::new(displacements, DISPLACEMENT_BINS, None)
}

pub fn angle_histogram(angles: &[f64]) -> Histogram {
    Histogram::new(angles, ANGLE_BINS, Some((0.0, 2.0 * PI)))
}

impl DistsReport {
    /// Inverse-gamma density on `0, 0.1, ..., 24.9`
    ///
    pub fn delay_curve(&self) -> Vec<(f64, f64)> {
        (0..250)
            .map(|i| i as f64 / 10.0)
            .map(|x| (x, self.delay_fit.pdf(x)))
            .collect()
    }

    /// Exponential density from the smallest displacement (in hundredths) up to 0.99
    ///
    pub fn displacement_curve(&self) -> Vec<(f64, f64)> {
        let min = self
            .total
            .displacements
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let start = if min.is_finite() {
            (min * 100.0).ceil().max(0.0) as usize
        } else {
            0
        };
        (start..100)
            .map(|i| i as f64 / 100.0)
            .map(|x| (x, self.displacement_fit.pdf(x)))
            .collect()
    }

    pub fn delay_figure(&self) -> HistogramFigure {
        HistogramFigure::new("t_D (seconds)")
            .series("delays", delay_histogram(&self.fit_delays))
            .density(true)
            .x_range(0.0, MAX_FIT_DELAY)
            .fitted(self.delay_curve())
    }

    pub fn displacement_figure(&self) -> HistogramFigure {
        HistogramFigure::new(&format!("δ ({})", self.units))
            .series("displacements", displacement_histogram(&self.total.displacements))
            .density(true)
            .x_range(0.0, 1.0)
            .fitted(self.displacement_curve())
    }

    /// One delay and one displacement figure per set under `saved-delays/` and `saved-disps/`
    ///
    pub fn save_individual<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let delays_dir = dir.as_ref().join(SAVED_DELAYS_DIR);
        let disps_dir = dir.as_ref().join(SAVED_DISPS_DIR);
        fs::create_dir_all(&delays_dir)?;
        fs::create_dir_all(&disps_dir)?;

        for set in &self.sets {
            let name = set.name.replace('/', "_");
            save(
                &HistogramFigure::new("t_D (seconds)")
                    .series(&set.name, delay_histogram(&set.delays))
                    .density(true)
                    .x_range(0.0, MAX_FIT_DELAY),
                delays_dir.join(format!("{}_delays.png", name)),
            )?;
            save(
                &HistogramFigure::new(&format!("δ ({})", self.units))
                    .series(&set.name, displacement_histogram(&set.displacements))
                    .density(true)
                    .x_range(0.0, 1.0),
                disps_dir.join(format!("{}_disps.png", name)),
            )?;
        }
        Ok(())
    }
}

/// Delays, displacements and turn angles of every set in the manifest, with the fitted
/// delay and displacement distributions of the whole manifest.
///
/// The inverse gamma is fitted on the delays between `min_delay` and [`MAX_FIT_DELAY`]
/// seconds plus a single zero, which keeps its location below zero.
///
pub fn dists_by_set(manifest: &Manifest, opts: &DistsOptions) -> Result<DistsReport> {
    let mut units = None;
    let mut sets = Vec::new();
    let mut total = JumpSamples {
        name: "total".into(),
        ..Default::default()
    };

    for name in manifest.sets() {
        info!("Processing set '{}'...", name);
        let mut set = JumpSamples {
            name: name.clone(),
            ..Default::default()
        };
        for data in manifest.load_set(&name)? {
            units.get_or_insert_with(|| data.canvas.units.clone());
            set.extend(file_samples(&data, opts)?);
        }
        debug!("Set '{}': {} jumps", name, set.delays.len());
        total.extend(set.clone());
        sets.push(set);
    }

    let fit_delays = total
        .delays
        .iter()
        .copied()
        .filter(|d| *d >= opts.min_delay && *d <= MAX_FIT_DELAY)
        .collect::<Vec<_>>();
    debug!("Total delays: {}", total.delays.len());
    debug!("Total displacements: {}", total.displacements.len());

    let (delay_fit, displacement_fit) = if opts.hardcoded {
        (
            InverseGamma::new(DELAY_SHAPE, DELAY_LOC, DELAY_SCALE)?,
            Exponential::new(DISP_LOC, DISP_SCALE),
        )
    } else {
        let mut with_zero = fit_delays.clone();
        with_zero.push(0.0);
        (
            InverseGamma::fit(&with_zero)?,
            Exponential::fit(&total.displacements)?,
        )
    };
    info!(
        "Delay fit parameters: a={:.4} loc={:.4} scale={:.4}",
        delay_fit.shape, delay_fit.loc, delay_fit.scale
    );
    info!(
        "Displacement fit parameters: loc={:.4} scale={:.4}",
        displacement_fit.loc, displacement_fit.scale
    );

    Ok(DistsReport {
        units: units.unwrap_or_default(),
        sets,
        total,
        fit_delays,
        delay_fit,
        displacement_fit,
    })
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{
        angle_histogram, delay_histogram, dists_by_set, file_samples, msd_by_set, DistsOptions,
        MsdScale,
    };
    use crate::position::manifest::{Manifest, ManifestEntry};
    use crate::position::TrackedObject;
    use crate::simulation::{simulate, BeanModel, DEFAULT_CANVAS};
    use crate::test_stuff::{position_data, stepped_series};
    use std::path::Path;

    fn straight_line(frames: usize) -> TrackedObject {
        let x = (0..frames).map(|i| i as f64).collect();
        TrackedObject::new(x, vec![0.0; frames])
    }

    fn write_manifest(dir: &Path, files: &[(&str, &str, f64, f64, TrackedObject)]) -> Manifest {
        let entries = files
            .iter()
            .map(|(file, set, fps, tau_limit, o)| {
                position_data(vec![o.clone()], *fps)
                    .save(dir.join(file))
                    .unwrap();
                ManifestEntry {
                    path: file.to_string(),
                    set: set.to_string(),
                    fps: *fps,
                    tau_limit: *tau_limit,
                }
            })
            .collect::<Vec<_>>();
        let path = dir.join("manifest.json");
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn ballistic_sets() {
        let dir = tempfile::tempdir().unwrap();
        let m = write_manifest(
            dir.path(),
            &[
                ("a.json", "fast", 2.0, 0.0, straight_line(40)),
                ("b.json", "fast", 2.0, 0.0, straight_line(30)),
                ("c.json", "slow", 1.0, 5.0, straight_line(40)),
            ],
        );
        let r = msd_by_set(&m, 0, MsdScale::Log).unwrap();
        assert_eq!(r.sets.len(), 2);
        // MSD = v² tau², slope 2 in log-log space
        for s in &r.sets {
            assert!((s.fit.slope - 2.0).abs() < 1e-6);
        }
        assert!((r.slope_mean - 2.0).abs() < 1e-6);
        assert!(r.slope_std < 1e-6);
        assert_eq!(r.units, "cm");

        let slow = &r.sets[1];
        assert_eq!(slow.info.name, "slow");
        assert_eq!(slow.curve.tau, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(!slow.excluded.is_empty());

        // the fast set is sampled at 2 fps: lags are halves of a second
        assert_eq!(r.sets[0].curve.tau[0], 0.5);
        assert!(msd_by_set(&m, 1, MsdScale::Log).is_err());
    }

    #[test]
    fn units_come_from_the_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = position_data(vec![straight_line(20)], 1.0);
        data.canvas.units = "px".to_string();
        data.save(dir.path().join("a.json")).unwrap();
        let entries = vec![ManifestEntry {
            path: "a.json".to_string(),
            set: "pixels".to_string(),
            fps: 1.0,
            tau_limit: 0.0,
        }];
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let r = msd_by_set(&Manifest::load(&path).unwrap(), 0, MsdScale::Linear).unwrap();
        assert_eq!(r.units, "px");
    }

    #[test]
    fn file_jumps() {
        let data = position_data(
            vec![stepped_series(&[(3, 0.5, 0.0), (0, 0.5, 0.0), (4, 0.0, 0.3)])],
            2.0,
        );
        let s = file_samples(&data, &DistsOptions::default()).unwrap();
        // rests shorter than 2 frames do not count at 2 fps
        assert_eq!(s.delays, vec![2.0, 2.0]);
        assert_eq!(s.displacements.len(), 2);
        assert_eq!(s.turn_angles.len(), 1);
    }

    #[test]
    fn simulated_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let model = BeanModel::paper().unwrap();
        let sim = simulate(2, 3000.0, &DEFAULT_CANVAS, &model, 5).unwrap();
        let m = write_manifest(
            dir.path(),
            &[
                ("s1.json", "sim/one", 1.0, 0.0, sim.objects[0].clone()),
                ("s2.json", "sim/two", 1.0, 0.0, sim.objects[1].clone()),
            ],
        );
        let opts = DistsOptions::default();
        let r = dists_by_set(&m, &opts).unwrap();
        assert_eq!(r.units, "cm");
        assert_eq!(r.sets.len(), 2);
        assert!(r.fit_delays.iter().all(|d| *d >= 1.0 && *d <= 25.0));
        assert!(r.delay_fit.loc < 0.0);
        assert!(r.displacement_fit.loc >= 0.1 - 1e-9);
        assert!((r.displacement_fit.scale - 0.2556).abs() < 0.08);
        assert_eq!(r.delay_curve().len(), 250);
        assert!(r.displacement_curve().iter().all(|(x, _)| *x < 1.0));

        let hard = dists_by_set(&m, &DistsOptions { hardcoded: true, ..opts }).unwrap();
        assert_eq!(hard.delay_fit.shape, 1.7239);
        assert_eq!(hard.sets, r.sets);
    }

    #[test]
    fn binning_rules() {
        let h = delay_histogram(&[1.0, 2.0, 2.0, 7.0]);
        assert_eq!(h.bins(), 7);
        assert_eq!(h.total(), 4);
        assert_eq!(angle_histogram(&[0.1, 6.0]).bins(), 30);
    }
}
