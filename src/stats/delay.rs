use crate::stats::angles::turn_angle;
use crate::stats::displacement::distance;
use anyhow::Result;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Default displacement under which a frame counts as resting
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Default minimal rest before a jump, in seconds
pub const DEFAULT_MIN_DELAY: f64 = 1.0;

/// Output file of [`append_jump_times`]
pub const JUMP_TIMES_FILE: &str = "delay-disp-vidtime-output.csv";

/// Lengths of the rests preceding each jump.
///
/// The counter starts at 1 and grows on every step shorter than `threshold`; a step of at
/// least `threshold` records the counter and resets it to 1.
///
pub fn delays(x: &[f64], y: &[f64], threshold: f64) -> Vec<usize> {
    let n = x.len().min(y.len());
    let mut d = 1;
    let mut result = Vec::new();
    for i in 0..n.saturating_sub(1) {
        if distance((x[i], y[i]), (x[i + 1], y[i + 1])) < threshold {
            d += 1;
        } else {
            result.push(d);
            d = 1;
        }
    }
    result
}

/// Number of resting steps between jumps.
///
/// Unlike [`delays`], the counter starts at 0 and steps equal to `threshold` still count
/// as resting.
///
pub fn rest_runs(x: &[f64], y: &[f64], threshold: f64) -> Vec<usize> {
    let n = x.len().min(y.len());
    let mut d = 0;
    let mut result = Vec::new();
    for i in 0..n.saturating_sub(1) {
        if distance((x[i], y[i]), (x[i + 1], y[i + 1])) <= threshold {
            d += 1;
        } else {
            result.push(d);
            d = 0;
        }
    }
    result
}

/// A jump preceded by a long enough rest
///
#[derive(Debug, Clone, PartialEq)]
pub struct Jump {
    /// Rest length before the jump, in frames, counted from 1
    pub delay_frames: usize,
    pub displacement: f64,
    /// 0-based index of the frame the jump starts from
    pub frame: usize,
    /// Heading change relative to the previous recorded jump, `[0, 2π)`
    pub turn_angle: Option<f64>,
}

/// `int(coefficient * fps)`
///
pub fn min_delay_frames(coefficient: f64, fps: f64) -> usize {
    (coefficient * fps).max(0.0) as usize
}

/// Whole seconds of a rest of `frames` frames
///
pub fn delay_seconds(frames: usize, fps: f64) -> f64 {
    (frames as f64 / fps).trunc()
}

/// Jumps whose preceding rest lasts at least `min_frames`.
///
/// A jump after a shorter rest is not recorded and does not reset the rest counter.
///
pub fn jumps(x: &[f64], y: &[f64], threshold: f64, min_frames: usize) -> Vec<Jump> {
    let n = x.len().min(y.len());
    let mut d = 1;
    let mut last_v: Option<(f64, f64)> = None;
    let mut result = Vec::new();

    for i in 0..n.saturating_sub(1) {
        let disp = distance((x[i], y[i]), (x[i + 1], y[i + 1]));
        if disp < threshold {
            d += 1;
            continue;
        }
        if d < min_frames {
            continue;
        }
        let v = (x[i + 1] - x[i], y[i + 1] - y[i]);
        let turn = last_v.map(|prev| turn_angle(prev, v));
        last_v = Some(v);
        result.push(Jump {
            delay_frames: d,
            displacement: disp,
            frame: i,
            turn_angle: turn,
        });
        d = 1;
    }
    result
}

/// One row of the jump-time table
///
#[derive(Debug, Clone, PartialEq)]
pub struct JumpTime {
    pub delay: f64,
    pub displacement: f64,
    pub video_time: f64,
}

/// Rest length (whole seconds), displacement and video time of every jump.
///
/// # Parameters
/// * `offset` - video time in seconds of the first frame.
///
pub fn jump_times(jumps: &[Jump], fps: f64, offset: f64) -> Vec<JumpTime> {
    jumps
        .iter()
        .map(|j| JumpTime {
            delay: delay_seconds(j.delay_frames, fps),
            displacement: j.displacement,
            video_time: offset + j.frame as f64 / fps,
        })
        .collect()
}

/// Appends `delay,displacement,video_time` lines to a CSV file
///
pub fn append_jump_times<P: AsRef<Path>>(path: P, rows: &[JumpTime]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    for r in rows {
        writeln!(file, "{},{},{}", r.delay, r.displacement, r.video_time)?;
    }
    info!("Appended {} rows to '{}'.", rows.len(), path.as_ref().display());
    Ok(())
}
