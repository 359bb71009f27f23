use geo::{
    Bearing, Closest, ClosestPoint, Coord, Destination, Distance, Haversine, Line, LineString,
    Point,
};

use super::Side;

/// Angular band, in degrees, within which a turn counts as straight or degenerate.
pub const TURN_TOLERANCE_DEG: f64 = 1.0;

/// Great-circle distance in metres.
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Folds any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Initial bearing from `from` to `to`, clockwise from north.
pub fn bearing(from: Coord<f64>, to: Coord<f64>) -> f64 {
    normalize_degrees(Haversine.bearing(Point::from(from), Point::from(to)))
}

/// Clockwise angle needed to rotate the heading of `first` onto the heading of `second`.
pub fn turn_angle(first: Line<f64>, second: Line<f64>) -> f64 {
    normalize_degrees(bearing(second.start, second.end) - bearing(first.start, first.end))
}

/// Classification of the wedge between two outward stubs meeting at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Outer corner, wider than a straight angle: the stubs diverge.
    Convex,
    /// Inner corner: the stubs overlap near the node.
    Concave,
    Straight,
    /// Both stubs leave in the same direction.
    Degenerate,
}

impl TurnKind {
    pub fn classify(angle: f64) -> TurnKind {
        if angle <= TURN_TOLERANCE_DEG || angle >= 360.0 - TURN_TOLERANCE_DEG {
            TurnKind::Degenerate
        } else if (angle - 180.0).abs() <= TURN_TOLERANCE_DEG {
            TurnKind::Straight
        } else if angle > 180.0 {
            TurnKind::Convex
        } else {
            TurnKind::Concave
        }
    }
}

/// Point `distance_m` away from `origin`, perpendicular to the heading towards `towards`.
pub fn offset_point(
    origin: Coord<f64>,
    towards: Coord<f64>,
    distance_m: f64,
    side: Side,
) -> Coord<f64> {
    let heading = bearing(origin, towards);
    let perpendicular = match side {
        Side::Left => heading - 90.0,
        Side::Right => heading + 90.0,
    };
    Haversine
        .destination(
            Point::from(origin),
            normalize_degrees(perpendicular),
            distance_m,
        )
        .0
}

/// Two-point polyline running alongside `from -> to` on the given side.
pub fn parallel_line(
    from: Coord<f64>,
    to: Coord<f64>,
    distance_m: f64,
    side: Side,
) -> LineString<f64> {
    LineString::new(vec![
        offset_point(from, to, distance_m, side),
        offset_point(to, from, distance_m, side.opposite()),
    ])
}

/// Segment centred on `at`, perpendicular to the heading towards `towards`,
/// running from its left end to its right end.
pub fn orthogonal_line(at: Coord<f64>, towards: Coord<f64>, half_length_m: f64) -> Line<f64> {
    Line::new(
        offset_point(at, towards, half_length_m, Side::Left),
        offset_point(at, towards, half_length_m, Side::Right),
    )
}

pub fn interpolate(from: Coord<f64>, to: Coord<f64>, fraction: f64) -> Coord<f64> {
    from + (to - from) * fraction
}

pub fn midpoint(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    interpolate(a, b, 0.5)
}

/// Points every `step_m` metres along `from -> to`, excluding both endpoints.
#[allow(clippy::cast_precision_loss)]
pub fn segmentize(from: Coord<f64>, to: Coord<f64>, step_m: f64) -> Vec<Coord<f64>> {
    let length = distance(from, to);
    if step_m <= 0.0 || !step_m.is_finite() || length <= step_m {
        return Vec::new();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (length / step_m).ceil() as usize;
    (1..count)
        .map(|i| i as f64 * step_m / length)
        .filter(|fraction| *fraction < 1.0)
        .map(|fraction| interpolate(from, to, fraction))
        .collect()
}

/// Sample points along every segment of `line` that is at least `min_span_m` long.
pub fn sample_along(line: &LineString<f64>, step_m: f64, min_span_m: f64) -> Vec<Coord<f64>> {
    line.lines()
        .filter(|segment| distance(segment.start, segment.end) >= min_span_m)
        .flat_map(|segment| segmentize(segment.start, segment.end, step_m))
        .collect()
}

/// Length of a polyline in metres.
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| distance(segment.start, segment.end))
        .sum()
}

/// First non-degenerate segment of `line`, oriented away from its near end.
///
/// The near end is the last coordinate when `near_at_end` is set.
pub fn outward_segment(line: &LineString<f64>, near_at_end: bool) -> Option<Line<f64>> {
    let coords = &line.0;
    if near_at_end {
        let near = *coords.last()?;
        coords
            .iter()
            .rev()
            .find(|c| **c != near)
            .map(|far| Line::new(near, *far))
    } else {
        let near = *coords.first()?;
        coords
            .iter()
            .find(|c| **c != near)
            .map(|far| Line::new(near, *far))
    }
}

/// Distance in metres from `point` to the closest point of `line`.
pub fn distance_to_line(point: Coord<f64>, line: &LineString<f64>) -> f64 {
    match line.closest_point(&Point::from(point)) {
        Closest::Intersection(closest) | Closest::SinglePoint(closest) => {
            distance(point, closest.0)
        }
        Closest::Indeterminate => f64::INFINITY,
    }
}
