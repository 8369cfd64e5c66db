use crate::position::{Canvas, PositionData, TrackedObject};
use crate::tracking::contours::detect;
use crate::tracking::options::TrackerOptions;
use crate::utils::merge::merge;
use crate::utils::point_2d::Point2D;
use crate::video::FrameSource;
use crate::Errors;
use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use log::{debug, info};

/// Centroids found in one processed frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// 1-based number of the frame in the source
    pub frame: usize,
    /// Centroids as detected
    pub detected: Vec<Point2D>,
    /// Centroids after the proximity merge
    pub merged: Vec<Point2D>,
    /// Object positions after assignment, indexed by object
    pub positions: Vec<Point2D>,
}

/// Contour based tracker that follows a fixed set of objects through the frames.
///
/// The first processed frame defines the objects; every later frame assigns its centroids
/// to them. A centroid or an object left unassigned stops the run.
///
pub struct CentroidTracker {
    opts: TrackerOptions,
    tracks: Vec<Vec<Point2D>>,
    frames_seen: usize,
    dimensions: Option<(u32, u32)>,
}

impl CentroidTracker {
    pub fn new(opts: TrackerOptions) -> Self {
        Self {
            opts,
            tracks: Vec::new(),
            frames_seen: 0,
            dimensions: None,
        }
    }

    pub fn object_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of frames that contributed positions
    ///
    pub fn processed_frames(&self) -> usize {
        self.tracks.first().map(|t| t.len()).unwrap_or(0)
    }

    fn last_positions(&self) -> Vec<Point2D> {
        self.tracks
            .iter()
            .filter_map(|t| t.last().cloned())
            .collect()
    }

    /// Feeds the next frame of the source.
    ///
    /// Returns `None` for frames skipped by the stride.
    ///
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<Option<FrameReport>> {
        self.frames_seen += 1;
        let number = self.frames_seen;
        if (number - 1) % self.opts.stride != 0 {
            return Ok(None);
        }
        let (width, height) = frame.dimensions();
        self.dimensions.get_or_insert((width, height));

        let detected = detect(frame, &self.opts.detection);
        let merged = if self.opts.merge {
            merge(&detected, self.opts.merge_radius * width as f32)
        } else {
            detected.clone()
        };
        debug!(
            "Frame {}: {} centroids, {} after merge",
            number,
            detected.len(),
            merged.len()
        );

        if self.tracks.is_empty() {
            self.seed(number, &merged)?;
        } else {
            self.assign(number, &merged)?;
        }

        Ok(Some(FrameReport {
            frame: number,
            detected,
            merged,
            positions: self.last_positions(),
        }))
    }

    fn seed(&mut self, frame: usize, centroids: &[Point2D]) -> Result<()> {
        if let Some(expected) = self.opts.expected_objects {
            if expected != centroids.len() {
                return Err(Errors::ObjectCountMismatch {
                    expected,
                    found: centroids.len(),
                }
                .into());
            }
        }
        if centroids.is_empty() {
            return Err(Errors::NotEnoughData(format!("no objects found in frame {}", frame)).into());
        }
        info!("Tracking {} objects from frame {}", centroids.len(), frame);
        self.tracks = centroids.iter().map(|c| vec![c.clone()]).collect();
        Ok(())
    }

    fn assign(&mut self, frame: usize, centroids: &[Point2D]) -> Result<()> {
        let previous = self.last_positions();
        let pairs = self.opts.assignment.assign(&previous, centroids);

        let mut matched_centroids = vec![false; centroids.len()];
        let mut next: Vec<Option<Point2D>> = vec![None; previous.len()];
        for (object, centroid) in pairs {
            let dist = previous[object].distance(&centroids[centroid]);
            if let Some(limit) = &self.opts.motion_limit {
                if !limit.allows(self.opts.stride, dist) {
                    debug!(
                        "Frame {}: centroid {} is {:.1}px away from object {}",
                        frame, centroid, dist, object
                    );
                    return Err(Errors::UnmatchedCentroid { frame, centroid }.into());
                }
            }
            matched_centroids[centroid] = true;
            next[object] = Some(centroids[centroid].clone());
        }

        if let Some(centroid) = matched_centroids.iter().position(|m| !m) {
            return Err(Errors::UnmatchedCentroid { frame, centroid }.into());
        }

        for (object, (track, position)) in self.tracks.iter_mut().zip(next).enumerate() {
            match position {
                Some(p) => track.push(p),
                None => return Err(Errors::UnmatchedObject { frame, object }.into()),
            }
        }
        Ok(())
    }

    /// Converts the pixel tracks into position data.
    ///
    /// # Parameters
    /// * `canvas` - physical size and units of the recorded area; its `fps` must be the source
    ///   frame rate, the stride is applied here. When `None`, pixel units are kept.
    ///
    pub fn into_position_data(self, canvas: Option<Canvas>, source_fps: f64) -> PositionData {
        let (fw, fh) = self.dimensions.unwrap_or((1, 1));
        let fps = source_fps / self.opts.stride as f64;
        let canvas = match canvas {
            Some(c) => Canvas { fps, ..c },
            None => Canvas::new(fw as f64, fh as f64, "px", fps),
        };
        let (sx, sy) = (canvas.width / fw as f64, canvas.height / fh as f64);

        let objects = self
            .tracks
            .into_iter()
            .map(|t| {
                TrackedObject::new(
                    t.iter().map(|p| p.x() as f64 * sx).collect(),
                    t.iter().map(|p| p.y() as f64 * sy).collect(),
                )
            })
            .collect();
        PositionData::new(canvas, objects)
    }
}

/// Draws the detected centroids (yellow), merged centroids (red rings) and
/// the object positions (blue) onto a copy of the frame.
///
pub fn annotate(frame: &RgbImage, report: &FrameReport) -> RgbImage {
    let mut out = frame.clone();
    for c in &report.detected {
        draw_filled_circle_mut(&mut out, (c.x() as i32, c.y() as i32), 3, Rgb([255, 255, 0]));
    }
    for c in &report.merged {
        draw_hollow_circle_mut(&mut out, (c.x() as i32, c.y() as i32), 8, Rgb([255, 0, 0]));
    }
    for c in &report.positions {
        draw_filled_circle_mut(&mut out, (c.x() as i32, c.y() as i32), 5, Rgb([0, 0, 255]));
    }
    out
}

/// Runs the tracker over a whole frame source.
///
/// # Parameters
/// * `source` - frames to track;
/// * `opts` - tracker configuration;
/// * `canvas` - physical canvas, pixel units when `None`;
/// * `on_frame` - called with every processed frame and its report, e.g. to write debug frames.
///
pub fn track_source<S, F>(
    source: &mut S,
    opts: TrackerOptions,
    canvas: Option<Canvas>,
    mut on_frame: F,
) -> Result<PositionData>
where
    S: FrameSource + ?Sized,
    F: FnMut(&RgbImage, &FrameReport) -> Result<()>,
{
    let fps = source.fps();
    let mut tracker = CentroidTracker::new(opts);
    while let Some(frame) = source.next_frame()? {
        if let Some(report) = tracker.process_frame(&frame)? {
            on_frame(&frame, &report)?;
        }
    }
    if tracker.processed_frames() == 0 {
        return Err(Errors::NoFrames("frame source".into()).into());
    }
    info!(
        "Tracked {} objects over {} frames",
        tracker.object_count(),
        tracker.processed_frames()
    );
    Ok(tracker.into_position_data(canvas, fps))
}
