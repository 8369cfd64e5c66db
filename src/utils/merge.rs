use crate::utils::point_2d::Point2D;
use crate::EPS;
use log::debug;

/// Area-weighted mean of a group of centroids; the areas are summed
///
pub fn weighted_average(group: &[&Point2D]) -> Point2D {
    let area: f32 = group.iter().map(|c| c.area).sum();
    if area < EPS {
        let n = group.len().max(1) as f32;
        let x = group.iter().map(|c| c.x()).sum::<f32>() / n;
        let y = group.iter().map(|c| c.y()).sum::<f32>() / n;
        return Point2D::with_area(x, y, 0.0);
    }
    let x = group.iter().map(|c| c.x() * c.area).sum::<f32>() / area;
    let y = group.iter().map(|c| c.y() * c.area).sum::<f32>() / area;
    Point2D::with_area(x, y, area)
}

/// Proximity merge of the centroids found within one frame.
///
/// The first remaining centroid collects every remaining centroid not farther than `radius`
/// from it (itself included), the group is replaced by its area-weighted average. The pass
/// repeats until no centroid is left.
///
/// # Parameters
/// * `centroids` - detected centroids in detection order;
/// * `radius` - merge radius in pixels.
///
pub fn merge(centroids: &[Point2D], radius: f32) -> Vec<Point2D> {
    let mut remaining = centroids.iter().collect::<Vec<_>>();
    let mut merged = Vec::new();

    while let Some(&head) = remaining.first() {
        let (near, far): (Vec<&Point2D>, Vec<&Point2D>) = remaining
            .into_iter()
            .partition(|c| head.distance(c) <= radius);

        if near.len() > 1 {
            debug!("Merging {} centroids around {:?}", near.len(), head.p);
        }
        merged.push(weighted_average(&near));
        remaining = far;
    }

    merged
}
