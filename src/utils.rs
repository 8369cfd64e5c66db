/// Points with an attached contour area
pub mod point_2d;

/// Proximity merge of centroids detected within the same frame
pub mod merge;

/// Least squares fitting
pub mod fit;

/// Gamma family special functions and the Student t-test
pub mod special;

/// Fixed-width histograms
pub mod histogram;

/// Frame file naming helpers
pub mod frames;
