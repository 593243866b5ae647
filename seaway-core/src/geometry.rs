//! Planar and geodesic helpers shared by the network algorithms.
//!
//! Distances and lengths are measured in the projected `x/y` frame of the
//! waypoint and trajectory tables. Bearings are initial compass bearings
//! computed on `lon/lat`.

use geo::{Bearing, Coord, Distance, Euclidean, Haversine, Line, LineString, Point, Polygon};
use geo::SimplifyIdx;

/// Initial compass bearing in degrees `[0, 360)` from `from` to `to`.
///
/// Both points are `(lon, lat)`.
pub fn bearing(from: Point<f64>, to: Point<f64>) -> f64 {
    Haversine.bearing(from, to).rem_euclid(360.0)
}

/// Signed circular difference `a - b` in degrees, normalized to `[-180, 180)`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

/// Absolute circular distance between two compass directions in degrees `[0, 180]`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    angle_difference(a, b).abs()
}

/// Circular mean of a set of compass directions in degrees.
///
/// Returns `None` for an empty set or when the directions cancel out.
pub fn circular_mean(bearings: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (mut sin_sum, mut cos_sum, mut count) = (0.0, 0.0, 0usize);
    for b in bearings {
        let rad = b.to_radians();
        sin_sum += rad.sin();
        cos_sum += rad.cos();
        count += 1;
    }
    if count == 0 || (sin_sum.abs() < 1e-12 && cos_sum.abs() < 1e-12) {
        return None;
    }
    Some(sin_sum.atan2(cos_sum).to_degrees().rem_euclid(360.0))
}

/// Total planar length of a curve.
pub fn curve_length(curve: &LineString<f64>) -> f64 {
    curve.lines().map(|line| line.dx().hypot(line.dy())).sum()
}

/// A curve with fewer than two coordinates or zero length is treated as a point.
pub fn is_degenerate(curve: &LineString<f64>) -> bool {
    curve.0.len() < 2 || curve_length(curve) <= f64::EPSILON
}

/// Minimum distance from a point to a continuous curve.
pub fn point_to_curve_distance(point: &Point<f64>, curve: &LineString<f64>) -> f64 {
    match curve.0.first() {
        None => f64::INFINITY,
        Some(first) if is_degenerate(curve) => Euclidean.distance(*point, Point::from(*first)),
        Some(_) => Euclidean.distance(point, curve),
    }
}

/// Distance between a trajectory segment and a waypoint convex hull.
///
/// Falls back to the segment-to-centroid distance when the hull has no area
/// (clusters of fewer than three distinct members).
pub fn segment_to_hull_distance(
    segment: &Line<f64>,
    hull: &Polygon<f64>,
    centroid: Point<f64>,
) -> f64 {
    if hull.exterior().0.len() < 4 {
        return Euclidean.distance(&centroid, segment);
    }
    Euclidean.distance(segment, hull)
}

/// Point at `distance` along the curve, clamped to its endpoints.
pub fn point_at_distance(curve: &LineString<f64>, distance: f64) -> Option<Point<f64>> {
    let first = *curve.0.first()?;
    if distance <= 0.0 {
        return Some(first.into());
    }
    let mut travelled = 0.0;
    for line in curve.lines() {
        let seg_len = line.dx().hypot(line.dy());
        if travelled + seg_len >= distance && seg_len > 0.0 {
            let ratio = (distance - travelled) / seg_len;
            return Some(Point::new(
                line.start.x + ratio * line.dx(),
                line.start.y + ratio * line.dy(),
            ));
        }
        travelled += seg_len;
    }
    curve.0.last().map(|c| Point::from(*c))
}

/// Sample `count` points evenly spaced by distance along a curve, endpoints included.
pub fn interpolate_points(curve: &LineString<f64>, count: usize) -> Vec<Point<f64>> {
    let Some(first) = curve.0.first() else {
        return Vec::new();
    };
    match count {
        0 => Vec::new(),
        1 => vec![Point::from(*first)],
        _ => {
            let total = curve_length(curve);
            let step = total / (count - 1) as f64;
            (0..count)
                .filter_map(|i| point_at_distance(curve, step * i as f64))
                .collect()
        }
    }
}

/// Concatenates consecutive edge geometries into a single curve.
///
/// Coordinates shared by the end of one edge and the start of the next are kept once.
pub fn merge_lines<'a>(lines: impl IntoIterator<Item = &'a LineString<f64>>) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for line in lines {
        for coord in &line.0 {
            if coords.last() != Some(coord) {
                coords.push(*coord);
            }
        }
    }
    LineString::new(coords)
}

/// Signed perpendicular distance from `point` to the straight line through the
/// first and last coordinate of `line`.
///
/// Positive values lie to starboard (right of the direction of travel).
pub fn signed_distance_to_line(line: &LineString<f64>, point: &Point<f64>) -> f64 {
    let (Some(start), Some(end)) = (line.0.first(), line.0.last()) else {
        return f64::NAN;
    };
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let norm = dx.hypot(dy);
    if norm <= f64::EPSILON {
        return Euclidean.distance(*point, Point::from(*start));
    }
    let cross = dx * (point.y() - start.y) - dy * (point.x() - start.x);
    -cross / norm
}

/// Douglas-Peucker simplification returning the indices of the retained vertices.
pub fn simplify_indices(curve: &LineString<f64>, tolerance: f64) -> Vec<usize> {
    if curve.0.len() < 3 {
        return (0..curve.0.len()).collect();
    }
    curve.simplify_idx(tolerance)
}
