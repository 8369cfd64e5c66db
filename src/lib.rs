/// Position-data files, manifests and the operations on them
pub mod position;

/// Contour detection, centroid computation and frame-to-object assignment
pub mod tracking;

/// Motion statistics computed from position series
pub mod stats;

/// Manifest-driven batch statistics
pub mod pipeline;

/// Monte-Carlo motion models
pub mod simulation;

/// Frame sources and sinks (image sequences, ffmpeg pipes)
pub mod video;

/// Frame filters and perspective correction
pub mod preprocess;

/// Figure export
pub mod plot;

/// Numeric helpers
pub mod utils;

/// Commonly used types
pub mod prelude;

/// Synthetic data generators used by tests and demos
pub mod test_stuff;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Given path '{0}' does not exist.")]
    MissingPath(String),
    #[error("Given path '{path}' does not point to a .{expected} file.")]
    WrongExtension { path: String, expected: String },
    #[error("Given path '{0}' does not point to an existing folder.")]
    NotADirectory(String),
    #[error("No frames found at '{0}'.")]
    NoFrames(String),
    #[error("Position data files have different dimensions or units.")]
    CanvasMismatch,
    #[error("Object count mismatch: expected {expected}, found {found}.")]
    ObjectCountMismatch { expected: usize, found: usize },
    #[error("Object {0} has series of different lengths.")]
    InconsistentFrames(usize),
    #[error("Object index {index} is out of range ({count} objects).")]
    ObjectOutOfRange { index: usize, count: usize },
    #[error("Invalid frame range: {0}")]
    InvalidFrameRange(String),
    #[error("Centroid {centroid} cannot be matched to a tracked object at frame {frame}.")]
    UnmatchedCentroid { frame: usize, centroid: usize },
    #[error("Object {object} received no centroid at frame {frame}.")]
    UnmatchedObject { frame: usize, object: usize },
    #[error("Invalid duration string '{0}'.")]
    InvalidDuration(String),
    #[error("Not enough data: {0}")]
    NotEnoughData(String),
    #[error("Fit did not converge: {0}")]
    DegenerateFit(String),
    #[error("Frame decoding failed: {0}")]
    Decode(String),
    #[error("Exactly four corner points are required, got {0}.")]
    CornerCount(usize),
    #[error("No sample under the limit {max} after {attempts} draws.")]
    TruncationLimit { max: f64, attempts: usize },
}

pub(crate) const EPS: f32 = 0.00001;
