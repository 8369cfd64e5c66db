/// One-dimensional shade finding simulation
pub mod shade;

use crate::position::{Canvas, PositionData, TrackedObject};
use crate::stats::distributions::{sample_truncated, AngleDistribution, Exponential, InverseGamma};
use crate::Errors;
use anyhow::Result;
use log::{debug, info};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;
use rayon::prelude::*;

pub const DELAY_SHAPE: f64 = 1.7239;
pub const DELAY_LOC: f64 = -0.0667;
pub const DELAY_SCALE: f64 = 3.5195;
pub const DISP_LOC: f64 = 0.1;
pub const DISP_SCALE: f64 = 0.2556;
pub const MAX_DELAY: f64 = 25.0;
pub const MAX_DISP: f64 = 1.0;

/// Letter-size sheet at one frame per second
pub static DEFAULT_CANVAS: Lazy<Canvas> = Lazy::new(|| Canvas::new(27.94, 21.59, "cm", 1.0));

/// How a sampled angle changes the heading
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeadingMode {
    /// The angle is the new heading
    #[default]
    Absolute,
    /// The angle is added to the previous heading
    Relative,
}

/// Distributions driving the beans
///
#[derive(Debug, Clone)]
pub struct BeanModel {
    delay: InverseGamma,
    max_delay: f64,
    displacement: Exponential,
    max_displacement: f64,
    angle: AngleDistribution,
    heading: HeadingMode,
}

impl BeanModel {
    /// Model fitted on the recorded beans: inverse gamma delays up to 25 s,
    /// exponential displacements up to 1 cm and uniform headings.
    ///
    pub fn paper() -> Result<Self> {
        Ok(Self {
            delay: InverseGamma::new(DELAY_SHAPE, DELAY_LOC, DELAY_SCALE)?,
            max_delay: MAX_DELAY,
            displacement: Exponential::new(DISP_LOC, DISP_SCALE),
            max_displacement: MAX_DISP,
            angle: AngleDistribution::Uniform,
            heading: HeadingMode::Absolute,
        })
    }

    pub fn delay(mut self, delay: InverseGamma, max_delay: f64) -> Self {
        assert!(max_delay > delay.loc, "Delay limit must exceed the distribution location");
        self.delay = delay;
        self.max_delay = max_delay;
        self
    }

    pub fn displacement(mut self, displacement: Exponential, max_displacement: f64) -> Self {
        assert!(
            max_displacement > displacement.loc,
            "Displacement limit must exceed the distribution location"
        );
        self.displacement = displacement;
        self.max_displacement = max_displacement;
        self
    }

    pub fn angle(mut self, angle: AngleDistribution, heading: HeadingMode) -> Self {
        self.angle = angle;
        self.heading = heading;
        self
    }

    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        sample_truncated(&self.delay, rng, self.max_delay)
    }

    pub fn sample_displacement<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        sample_truncated(&self.displacement, rng, self.max_displacement)
    }

    pub fn sample_angle<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.angle.sample(rng)
    }
}

/// Simulated bean state
///
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    pub position: (f64, f64),
    /// Seconds left before the next jump
    pub delay: f64,
    /// Direction of the last jump, radians
    pub heading: f64,
}

impl Bean {
    pub fn new<R: Rng + ?Sized>(
        position: (f64, f64),
        model: &BeanModel,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self {
            position,
            delay: model.sample_delay(rng)?,
            heading: model.sample_angle(rng),
        })
    }

    /// Advances the bean by one frame; returns `true` when it jumped
    ///
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        model: &BeanModel,
        fps: f64,
        rng: &mut R,
    ) -> Result<bool> {
        if self.delay > 0.0 {
            self.delay -= 1.0 / fps;
        }
        if self.delay > 0.0 {
            return Ok(false);
        }

        self.delay = model.sample_delay(rng)?;
        let angle = model.sample_angle(rng);
        self.heading = match model.heading {
            HeadingMode::Absolute => angle,
            HeadingMode::Relative => self.heading + angle,
        };
        let disp = model.sample_displacement(rng)?;
        self.position.0 += disp * self.heading.cos();
        self.position.1 += disp * self.heading.sin();
        Ok(true)
    }
}

/// Parses durations such as `2h30m`, `45m`, `90s` or `1h5m10s` into seconds.
///
/// A bare number is taken as seconds.
///
pub fn parse_duration(s: &str) -> Result<f64> {
    let invalid = || Errors::InvalidDuration(s.to_string());
    let s = s.trim();
    if s.is_empty() {
        return Err(invalid().into());
    }
    if let Ok(v) = s.parse::<f64>() {
        return if v > 0.0 { Ok(v) } else { Err(invalid().into()) };
    }

    let mut total = 0.0;
    let mut number = String::new();
    let mut last_unit = 0;
    for c in s.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let (rank, factor) = match c.to_ascii_lowercase() {
            'h' => (1, 3600.0),
            'm' => (2, 60.0),
            's' => (3, 1.0),
            _ => return Err(invalid().into()),
        };
        // units must appear once, in h-m-s order
        if rank <= last_unit || number.is_empty() {
            return Err(invalid().into());
        }
        let v: f64 = number.parse().map_err(|_| invalid())?;
        total += v * factor;
        number.clear();
        last_unit = rank;
    }
    if !number.is_empty() || total <= 0.0 {
        return Err(invalid().into());
    }
    Ok(total)
}

/// Simulates `n_beans` beans for `duration` seconds starting at the origin.
///
/// Every bean draws from its own generator seeded with `seed + index`, so the result does not
/// depend on the number of worker threads.
///
pub fn simulate(
    n_beans: usize,
    duration: f64,
    canvas: &Canvas,
    model: &BeanModel,
    seed: u64,
) -> Result<PositionData> {
    let frames = (duration * canvas.fps).round() as usize;
    info!(
        "Simulating {} beans over {} frames ({} s at {} fps)",
        n_beans, frames, duration, canvas.fps
    );

    let objects = (0..n_beans)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let mut bean = Bean::new((0.0, 0.0), model, &mut rng)?;
            let mut track = TrackedObject::default();
            let mut jumps = 0;
            for _ in 0..frames {
                track.push(bean.position.0, bean.position.1);
                if bean.step(model, canvas.fps, &mut rng)? {
                    jumps += 1;
                }
            }
            debug!("Bean {} jumped {} times", i, jumps);
            Ok(track)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PositionData::new(canvas.clone(), objects))
}

#[cfg(test)]
mod tests {
    use crate::simulation::{parse_duration, simulate, Bean, BeanModel, HeadingMode, DEFAULT_CANVAS};
    use crate::stats::delay::delays;
    use crate::stats::displacement::displacements;
    use crate::stats::distributions::{AngleDistribution, Exponential};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("2h30m").unwrap(), 9000.0);
        assert_eq!(parse_duration("45m").unwrap(), 2700.0);
        assert_eq!(parse_duration("90s").unwrap(), 90.0);
        assert_eq!(parse_duration("1h5m10s").unwrap(), 3910.0);
        assert_eq!(parse_duration("120").unwrap(), 120.0);
        for bad in ["", "h", "10x", "5m2h", "3m3m", "10m5", "0s", "-4"] {
            assert!(parse_duration(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn deterministic_and_bounded() {
        let model = BeanModel::paper().unwrap();
        let a = simulate(4, 600.0, &DEFAULT_CANVAS, &model, 42).unwrap();
        let b = simulate(4, 600.0, &DEFAULT_CANVAS, &model, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.objects.len(), 4);
        assert_eq!(a.frame_count(), 600);
        assert_eq!((a.objects[0].x[0], a.objects[0].y[0]), (0.0, 0.0));

        for o in &a.objects {
            let d = displacements(&o.x, &o.y);
            assert!(d.iter().all(|v| *v <= 1.0 + 1e-12));
            assert!(d.iter().filter(|v| **v > 0.0).all(|v| *v >= 0.1 - 1e-12));
            // rests of at most 25 s at 1 fps, and the beans do move
            assert!(delays(&o.x, &o.y, 0.05).iter().all(|r| *r <= 27));
            assert!(d.iter().any(|v| *v > 0.0));
        }
    }

    #[test]
    fn relative_heading() {
        let mut rng = StdRng::seed_from_u64(5);
        let model = BeanModel::paper()
            .unwrap()
            .displacement(Exponential::new(0.5, 0.01), 0.6)
            .angle(
                AngleDistribution::from_angles(&[0.1], 30).unwrap(),
                HeadingMode::Relative,
            );
        let mut bean = Bean::new((0.0, 0.0), &model, &mut rng).unwrap();
        bean.delay = 0.0;
        let start = bean.heading;
        assert!(bean.step(&model, 1.0, &mut rng).unwrap());
        // the only non-empty bin is [0, 2π/30)
        let turn = bean.heading - start;
        assert!((0.0..std::f64::consts::PI / 15.0).contains(&turn));
    }
}
