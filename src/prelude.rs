pub use crate::position::manifest::{Manifest, ManifestEntry};
pub use crate::position::{Canvas, PositionData, TrackedObject};

pub use crate::tracking::assignment::AssignmentKind;
pub use crate::tracking::options::TrackerOptions;
pub use crate::tracking::tracker::{track_source, CentroidTracker, FrameReport};

pub use crate::stats::distributions::{AngleDistribution, Exponential, InverseGamma};
pub use crate::stats::msd::MsdCurve;

pub use crate::simulation::{simulate, BeanModel, HeadingMode};

pub use crate::plot::{save, Figure};
pub use crate::video::{open_source, FrameSink, FrameSource};
