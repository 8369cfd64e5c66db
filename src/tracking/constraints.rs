/// Largest distance in pixels an object may travel from one source frame to the next.
///
/// Processed frames are `stride` source frames apart, so the travel allowed between two
/// processed frames grows linearly with the stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimit {
    per_frame: f32,
}

impl MotionLimit {
    /// # Parameters
    /// * `per_frame` - largest travel between consecutive source frames, pixels
    ///
    pub fn new(per_frame: f32) -> Self {
        assert!(
            per_frame > 0.0,
            "The distance is expected to be a positive float"
        );
        Self { per_frame }
    }

    pub fn per_frame(&self) -> f32 {
        self.per_frame
    }

    /// Travel allowed between processed frames `stride` source frames apart
    pub fn max_distance(&self, stride: usize) -> f32 {
        self.per_frame * stride as f32
    }

    pub fn allows(&self, stride: usize, dist: f32) -> bool {
        dist <= self.max_distance(stride)
    }
}

#[cfg(test)]
mod tests {
    use crate::tracking::constraints::MotionLimit;

    #[test]
    fn scales_with_stride() {
        let limit = MotionLimit::new(5.0);
        assert_eq!(limit.per_frame(), 5.0);
        assert!(limit.allows(1, 5.0));
        assert!(!limit.allows(1, 5.5));
        assert!(limit.allows(3, 15.0));
        assert!(!limit.allows(3, 15.5));
    }

    #[test]
    #[should_panic]
    fn zero_distance() {
        let _ = MotionLimit::new(0.0);
    }
}
