use geo::{Centroid, Geometry, LineString, Point};

/// Straight line through `points`, in order.
pub fn polyline(points: &[Point]) -> LineString {
    LineString::from(points.to_vec())
}

/// Representative point of a shape. Points are returned as-is, footprints
/// collapse to their centroid. `None` for empty geometries.
pub fn centroid(shape: &Geometry) -> Option<Point> {
    match shape {
        Geometry::Point(x) => Some(*x),
        x => x.centroid(),
    }
}
