use nalgebra::Point2;

/// Centroid of a detected contour in pixel coordinates.
///
/// `area` is the zero-order moment of the contour and serves as the weight when nearby
/// centroids are merged.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Point2D {
    pub p: Point2<f32>,
    pub area: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            p: Point2::from([x, y]),
            area: 1.0,
        }
    }

    pub fn area(mut self, area: f32) -> Self {
        assert!(area >= 0.0, "Area must be a non-negative number");
        self.area = area;
        self
    }

    pub fn with_area(x: f32, y: f32, area: f32) -> Self {
        Self::new(x, y).area(area)
    }

    pub fn x(&self) -> f32 {
        self.p.x
    }

    pub fn y(&self) -> f32 {
        self.p.y
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        nalgebra::distance(&self.p, &other.p)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::point_2d::Point2D;
    use crate::EPS;

    #[test]
    fn distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::with_area(3.0, 4.0, 10.0);
        assert!((a.distance(&b) - 5.0).abs() < EPS);
        assert_eq!(b.area, 10.0);
    }

    #[test]
    #[should_panic]
    fn negative_area() {
        let _ = Point2D::new(0.0, 0.0).area(-1.0);
    }
}
