//! Polyline geometry the builder and LRP encoder need: great-circle
//! distance, point-to-polyline projection, and bearing sampling.
//!
//! Projection and side-of-road use a local equirectangular approximation
//! around each segment rather than exact geodesics: edges are short enough
//! (a handful of shape points on a road network) that the flattening error
//! is well below the OpenLR coordinate grid's own resolution.

use geo::{Bearing as GeoBearing, Distance, Haversine, Point};
use ordered_float::OrderedFloat;

use crate::model::{Bearing, Coordinate, Length};

const METERS_PER_DEGREE: f64 = 111_320.0;

fn to_point(coord: Coordinate) -> Point<f64> {
    Point::new(coord.lon, coord.lat)
}

/// Great-circle distance between two coordinates.
pub fn distance(a: Coordinate, b: Coordinate) -> Length {
    Length::from_meters(Haversine.distance(to_point(a), to_point(b)))
}

/// Total length of the polyline through `coords`, which must hold at least
/// two points.
pub fn polyline_length(coords: &[Coordinate]) -> Length {
    coords.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

fn interpolate(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate::new(a.lon + (b.lon - a.lon) * t, a.lat + (b.lat - a.lat) * t)
}

struct SegmentProjection {
    t: f64,
    cross_track: Length,
    left: bool,
}

/// Projects `query` onto the segment `a -> b`, in a planar frame centered on
/// `a` and scaled so longitude and latitude are locally comparable.
fn project_onto_segment(a: Coordinate, b: Coordinate, query: Coordinate) -> SegmentProjection {
    let scale = a.lat.to_radians().cos();

    let bx = (b.lon - a.lon) * scale;
    let by = b.lat - a.lat;
    let px = (query.lon - a.lon) * scale;
    let py = query.lat - a.lat;

    let length_sq = bx * bx + by * by;
    let t = if length_sq <= f64::EPSILON {
        0.0
    } else {
        ((px * bx + py * by) / length_sq).clamp(0.0, 1.0)
    };

    let proj_x = t * bx;
    let proj_y = t * by;
    let cross_track_degrees = (px - proj_x).hypot(py - proj_y);
    let cross_z = bx * py - by * px;

    SegmentProjection {
        t,
        cross_track: Length::from_meters(cross_track_degrees * METERS_PER_DEGREE),
        left: cross_z > 0.0,
    }
}

/// The result of projecting a query coordinate onto a polyline.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub point: Coordinate,
    /// Distance, in meters, from the start of the polyline to the
    /// projected point.
    pub offset: Length,
    /// Total length, in meters, of the polyline projected onto.
    pub total_length: Length,
    /// Perpendicular distance, in meters, from `query` to the polyline.
    pub distance_to_line: Length,
    /// Whether `query` lies to the left of the polyline's direction of
    /// travel, at the point it was closest to.
    pub left: bool,
}

/// Projects `query` onto the polyline through `coords` (>= 2 points),
/// returning the closest point across every segment.
pub fn project_onto_polyline(coords: &[Coordinate], query: Coordinate) -> Option<Projection> {
    if coords.len() < 2 {
        return None;
    }

    let mut offset_before = Length::ZERO;
    let mut best: Option<(Length, Coordinate, SegmentProjection)> = None;
    let mut best_cross_track = OrderedFloat(f64::INFINITY);

    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg_len = distance(a, b);
        let projection = project_onto_segment(a, b, query);
        let cross_track = OrderedFloat(projection.cross_track.meters());

        if cross_track < best_cross_track {
            let point = interpolate(a, b, projection.t);
            let offset = offset_before + seg_len * projection.t;
            best_cross_track = cross_track;
            best = Some((offset, point, projection));
        }

        offset_before += seg_len;
    }

    best.map(|(offset, point, projection)| Projection {
        point,
        offset,
        total_length: offset_before,
        distance_to_line: projection.cross_track,
        left: projection.left,
    })
}

/// The compass bearing from `coords[0]` towards the point reached by
/// walking `sample_distance` along the polyline, or towards the polyline's
/// far end if it's shorter than `sample_distance`.
pub fn bearing_along(coords: &[Coordinate], sample_distance: Length) -> Bearing {
    debug_assert!(coords.len() >= 2, "bearing needs a polyline of >= 2 points");

    let anchor = coords[0];
    let mut remaining = sample_distance;

    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let seg_len = distance(a, b);

        if seg_len >= remaining {
            let t = if seg_len.meters() > 0.0 {
                (remaining.meters() / seg_len.meters()).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let sample = interpolate(a, b, t);
            return Bearing::from_degrees(Haversine.bearing(to_point(anchor), to_point(sample)));
        }

        remaining -= seg_len;
    }

    let far_end = *coords.last().expect("polyline has >= 2 points");
    Bearing::from_degrees(Haversine.bearing(to_point(anchor), to_point(far_end)))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn projects_onto_nearest_segment_midpoint() {
        let coords = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.002)];
        let query = Coordinate::new(0.0001, 0.001);

        let projection = project_onto_polyline(&coords, query).unwrap();

        assert_abs_diff_eq!(projection.point.lat, 0.001, epsilon = 1e-6);
        assert!(!projection.left); // east of a north-heading line is to the right
    }

    #[test]
    fn point_on_the_line_has_near_zero_cross_track() {
        let coords = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.002)];
        let query = Coordinate::new(0.0, 0.001);

        let projection = project_onto_polyline(&coords, query).unwrap();

        assert!(projection.distance_to_line.meters() < 0.01);
    }

    #[test]
    fn bearing_samples_short_edges_at_the_far_end() {
        let coords = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.00005)];
        let bearing = bearing_along(&coords, Length::from_meters(20.0));
        assert_eq!(bearing.degrees(), 0); // due north, edge shorter than the sample distance
    }

    #[test]
    fn total_length_sums_segments() {
        let coords = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.001),
            Coordinate::new(0.0, 0.002),
        ];
        let single = distance(coords[0], coords[2]);
        assert_abs_diff_eq!(polyline_length(&coords).meters(), single.meters(), epsilon = 0.5);
    }
}
