use crate::tracking::assignment::AssignmentKind;
use crate::tracking::constraints::MotionLimit;
use crate::tracking::contours::DetectionOptions;

/// Class that is used to configure the centroid tracker
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub(crate) detection: DetectionOptions,
    pub(crate) merge: bool,
    pub(crate) merge_radius: f32,
    pub(crate) expected_objects: Option<usize>,
    pub(crate) assignment: AssignmentKind,
    pub(crate) motion_limit: Option<MotionLimit>,
    pub(crate) stride: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            detection: DetectionOptions::default(),
            merge: true,
            merge_radius: 0.05,
            expected_objects: None,
            assignment: AssignmentKind::Greedy,
            motion_limit: None,
            stride: 1,
        }
    }
}

impl TrackerOptions {
    /// Gray level above which a pixel belongs to a blob (default `127`)
    ///
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.detection.threshold = threshold;
        self
    }

    /// Fraction of the frame dimensions along the edges where centroids are ignored (default `0.01`)
    ///
    pub fn border_margin(mut self, margin: f32) -> Self {
        assert!(
            (0.0..0.5).contains(&margin),
            "Border margin must be within [0.0, 0.5)"
        );
        self.detection.border_margin = margin;
        self
    }

    /// Use only outer contours, ignoring dark blobs enclosed by bright areas
    ///
    pub fn outer_only(mut self, outer_only: bool) -> Self {
        self.detection.outer_only = outer_only;
        self
    }

    /// Disables the proximity merge of nearby centroids
    ///
    pub fn disable_merge(mut self) -> Self {
        self.merge = false;
        self
    }

    /// Merge radius as a fraction of the frame width (default `0.05`)
    ///
    pub fn merge_radius(mut self, fraction: f32) -> Self {
        assert!(fraction > 0.0, "Merge radius must be a positive number");
        self.merge_radius = fraction;
        self
    }

    /// The number of objects the first processed frame must contain
    ///
    pub fn expected_objects(mut self, n: usize) -> Self {
        assert!(n > 0, "Expected object count must be a positive number");
        self.expected_objects = Some(n);
        self
    }

    pub fn assignment(mut self, kind: AssignmentKind) -> Self {
        self.assignment = kind;
        self
    }

    /// Largest travel in pixels per source frame; a farther match fails the frame
    ///
    pub fn max_step(mut self, per_frame: f32) -> Self {
        self.motion_limit = Some(MotionLimit::new(per_frame));
        self
    }

    /// Process every `n`-th frame only
    ///
    pub fn stride(mut self, n: usize) -> Self {
        assert!(n > 0, "Stride must be a positive number");
        self.stride = n;
        self
    }

    pub fn detection(&self) -> &DetectionOptions {
        &self.detection
    }
}

#[cfg(test)]
mod tests {
    use crate::tracking::assignment::AssignmentKind;
    use crate::tracking::options::TrackerOptions;

    #[test]
    fn builder() {
        let opts = TrackerOptions::default()
            .threshold(100)
            .disable_merge()
            .expected_objects(3)
            .assignment(AssignmentKind::Optimal)
            .max_step(10.0)
            .stride(2);
        assert_eq!(opts.detection.threshold, 100);
        assert!(!opts.merge);
        assert_eq!(opts.expected_objects, Some(3));
        assert_eq!(opts.stride, 2);
        let limit = opts.motion_limit.unwrap();
        assert_eq!(limit.max_distance(opts.stride), 20.0);
    }

    #[test]
    #[should_panic]
    fn zero_stride() {
        let _ = TrackerOptions::default().stride(0);
    }
}
