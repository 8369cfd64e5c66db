/// Threshold, contour search and contour centroids
pub mod contours;

/// Matching of frame centroids to tracked objects
pub mod assignment;

/// Travel distance limits between processed frames
pub mod constraints;

/// Tracker configuration
pub mod options;

/// Centroid tracker
pub mod tracker;
