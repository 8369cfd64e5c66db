use crate::position::{Canvas, PositionData, TrackedObject};
use crate::video::FrameSource;
use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Seeded random walk of a single point
///
pub struct PosGen {
    x: f64,
    y: f64,
    gen: StdRng,
    dist: Uniform<f64>,
}

impl PosGen {
    pub fn new(x: f64, y: f64, drift: f64, seed: u64) -> Self {
        Self {
            x,
            y,
            gen: StdRng::seed_from_u64(seed),
            dist: Uniform::new(-drift, drift),
        }
    }
}

impl Iterator for PosGen {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let p = (self.x, self.y);
        self.x += self.gen.sample(self.dist);
        self.y += self.gen.sample(self.dist);
        Some(p)
    }
}

pub fn random_walk(frames: usize, drift: f64, seed: u64) -> TrackedObject {
    let (x, y) = PosGen::new(0.0, 0.0, drift, seed).take(frames).unzip();
    TrackedObject::new(x, y)
}

/// Rest-and-jump series: each `(rest, dx, dy)` keeps the point still for `rest` frames
/// and then moves it by `(dx, dy)`.
///
pub fn stepped_series(steps: &[(usize, f64, f64)]) -> TrackedObject {
    let mut o = TrackedObject::default();
    let (mut x, mut y) = (0.0, 0.0);
    o.push(x, y);
    for &(rest, dx, dy) in steps {
        for _ in 0..rest {
            o.push(x, y);
        }
        x += dx;
        y += dy;
        o.push(x, y);
    }
    o
}

pub fn position_data(objects: Vec<TrackedObject>, fps: f64) -> PositionData {
    PositionData::new(Canvas::new(27.94, 21.59, "cm", fps), objects)
}

pub fn blank_frame(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

pub fn draw_disc(frame: &mut RgbImage, center: (i32, i32), radius: i32, value: u8) {
    draw_filled_circle_mut(frame, center, radius, Rgb([value, value, value]));
}

/// Frames with white discs (radius 8) on black moving with constant velocities.
///
/// # Parameters
/// * `discs` - `(start, velocity)` pairs in pixels and pixels per frame;
/// * `frames` - number of frames to render.
///
pub fn moving_discs(
    width: u32,
    height: u32,
    discs: &[((i32, i32), (i32, i32))],
    frames: usize,
) -> Vec<RgbImage> {
    (0..frames as i32)
        .map(|f| {
            let mut frame = blank_frame(width, height, 0);
            for ((x, y), (vx, vy)) in discs {
                draw_disc(&mut frame, (x + vx * f, y + vy * f), 8, 255);
            }
            frame
        })
        .collect()
}

/// In-memory frame source
///
pub struct ScriptedSource {
    frames: VecDeque<RgbImage>,
    fps: f64,
    dimensions: (u32, u32),
    total: usize,
}

impl ScriptedSource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        let dimensions = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let total = frames.len();
        Self {
            frames: frames.into(),
            fps,
            dimensions,
            total,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_stuff::{random_walk, stepped_series};

    #[test]
    fn seeded_walk_repeats() {
        assert_eq!(random_walk(20, 1.0, 7), random_walk(20, 1.0, 7));
        assert_eq!(random_walk(20, 1.0, 7).len(), 20);
    }

    #[test]
    fn steps() {
        let o = stepped_series(&[(2, 1.0, 0.0), (0, 0.0, 2.0)]);
        assert_eq!(o.x, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(o.y, vec![0.0, 0.0, 0.0, 0.0, 2.0]);
    }
}
