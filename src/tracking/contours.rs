use crate::utils::point_2d::Point2D;
use geo::{Area, BoundingRect, Centroid, LineString, Polygon};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};

/// Contour detection settings
///
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOptions {
    /// Pixels brighter than this become foreground
    pub threshold: u8,
    /// Fraction of the frame size near the edges where centroids are discarded
    pub border_margin: f32,
    /// Keep only outer borders; hole borders (dark blobs on a bright background) are dropped
    pub outer_only: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            threshold: 127,
            border_margin: 0.01,
            outer_only: false,
        }
    }
}

/// Binary threshold: pixels strictly above `threshold` become 255, the rest 0
///
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
    out
}

fn contour_polygon(contour: &Contour<i32>) -> Polygon<f64> {
    let ring = contour
        .points
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect::<Vec<_>>();
    Polygon::new(LineString::from(ring), vec![])
}

fn spans_frame(polygon: &Polygon<f64>, width: u32, height: u32) -> bool {
    polygon
        .bounding_rect()
        .map(|r| {
            r.min().x <= 0.0
                && r.min().y <= 0.0
                && r.max().x >= width.saturating_sub(1) as f64
                && r.max().y >= height.saturating_sub(1) as f64
        })
        .unwrap_or(false)
}

/// Whether `c` lies within `margin` (fraction of the dimension) of a frame edge
///
pub fn near_border(c: &Point2D, margin: f32, width: u32, height: u32) -> bool {
    let (w, h) = (width as f32, height as f32);
    c.x() <= margin * w || c.x() >= (1.0 - margin) * w || c.y() <= margin * h || c.y() >= (1.0 - margin) * h
}

/// Centroid of one contour computed from its polygon moments; `None` for zero-area contours
///
pub fn contour_centroid(contour: &Contour<i32>) -> Option<Point2D> {
    let polygon = contour_polygon(contour);
    let area = polygon.unsigned_area();
    if area <= 0.0 {
        return None;
    }
    polygon
        .centroid()
        .map(|c| Point2D::with_area(c.x() as f32, c.y() as f32, area as f32))
}

/// Finds centroids of the blobs of a binary frame.
///
/// Zero-area contours, the contour running along the frame border and centroids close to
/// the frame edges are dropped.
///
pub fn find_centroids(binary: &GrayImage, opts: &DetectionOptions) -> Vec<Point2D> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| !opts.outer_only || c.border_type == BorderType::Outer)
        .filter(|c| !spans_frame(&contour_polygon(c), width, height))
        .filter_map(|c| contour_centroid(&c))
        .filter(|c| !near_border(c, opts.border_margin, width, height))
        .collect()
}

/// Grayscale conversion, threshold and centroid search in one step
///
pub fn detect(frame: &image::RgbImage, opts: &DetectionOptions) -> Vec<Point2D> {
    let gray = image::imageops::grayscale(frame);
    find_centroids(&binarize(&gray, opts.threshold), opts)
}

#[cfg(test)]
mod tests {
    use crate::test_stuff::{blank_frame, draw_disc};
    use crate::tracking::contours::{
        binarize, find_centroids, near_border, spans_frame, DetectionOptions,
    };
    use crate::utils::point_2d::Point2D;
    use geo::{LineString, Polygon};
    use image::{GrayImage, Luma};

    #[test]
    fn threshold_is_strict() {
        let mut g = GrayImage::new(2, 1);
        g.put_pixel(0, 0, Luma([127]));
        g.put_pixel(1, 0, Luma([128]));
        let b = binarize(&g, 127);
        assert_eq!(b.get_pixel(0, 0).0[0], 0);
        assert_eq!(b.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn empty_frame() {
        let g = GrayImage::new(0, 0);
        assert!(find_centroids(&g, &DetectionOptions::default()).is_empty());
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]),
            vec![],
        );
        assert!(spans_frame(&square, 0, 0));
        assert!(spans_frame(&square, 3, 3));
        assert!(!spans_frame(&square, 4, 3));
    }

    #[test]
    fn border_filter_uses_each_dimension() {
        // 1 % of 1000 x 100
        assert!(near_border(&Point2D::new(5.0, 50.0), 0.01, 1000, 100));
        assert!(near_border(&Point2D::new(500.0, 0.5), 0.01, 1000, 100));
        assert!(!near_border(&Point2D::new(500.0, 50.0), 0.01, 1000, 100));
        assert!(!near_border(&Point2D::new(500.0, 98.0), 0.01, 1000, 100));
    }

    #[test]
    fn bright_blobs_on_dark() {
        let mut frame = blank_frame(200, 100, 0);
        draw_disc(&mut frame, (50, 50), 8, 255);
        draw_disc(&mut frame, (150, 40), 6, 255);
        let gray = image::imageops::grayscale(&frame);
        let centroids = find_centroids(&binarize(&gray, 127), &DetectionOptions::default());
        assert_eq!(centroids.len(), 2);
        let mut xs = centroids.iter().map(|c| c.x().round() as i32).collect::<Vec<_>>();
        xs.sort();
        assert_eq!(xs, vec![50, 150]);
        assert!(centroids.iter().all(|c| c.area > 50.0));
    }

    #[test]
    fn dark_blobs_on_bright() {
        let mut frame = blank_frame(200, 100, 255);
        draw_disc(&mut frame, (60, 50), 8, 0);
        let gray = image::imageops::grayscale(&frame);
        let opts = DetectionOptions::default();
        let centroids = find_centroids(&binarize(&gray, 127), &opts);
        assert_eq!(centroids.len(), 1);
        assert!((centroids[0].x() - 60.0).abs() < 1.0);
        assert!((centroids[0].y() - 50.0).abs() < 1.0);

        let outer = DetectionOptions {
            outer_only: true,
            ..opts
        };
        assert!(find_centroids(&binarize(&gray, 127), &outer).is_empty());
    }
}
