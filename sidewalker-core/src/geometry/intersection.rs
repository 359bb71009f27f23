use geo::line_intersection::line_intersection;
use geo::{BoundingRect, Coord, Intersects, Line, LineIntersection, LineString};

use super::measure::{distance, turn_angle};
use super::polyline::VERTEX_SNAP_M;

/// Intersection of two polylines.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    Empty,
    Point(Coord<f64>),
    MultiPoint(Vec<Coord<f64>>),
    /// Collinear stretches, with any isolated crossing points alongside.
    Overlap {
        points: Vec<Coord<f64>>,
        segments: Vec<Line<f64>>,
    },
}

impl Intersection {
    /// Isolated crossing points, ignoring collinear stretches.
    pub fn points(&self) -> &[Coord<f64>] {
        match self {
            Intersection::Empty => &[],
            Intersection::Point(point) => std::slice::from_ref(point),
            Intersection::MultiPoint(points) | Intersection::Overlap { points, .. } => points,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Intersection::Empty)
    }
}

fn push_unique(points: &mut Vec<Coord<f64>>, point: Coord<f64>) {
    if !points.iter().any(|p| distance(*p, point) <= VERTEX_SNAP_M) {
        points.push(point);
    }
}

pub fn intersections(a: &LineString<f64>, b: &LineString<f64>) -> Intersection {
    if let (Some(rect_a), Some(rect_b)) = (a.bounding_rect(), b.bounding_rect())
        && !rect_a.intersects(&rect_b)
    {
        return Intersection::Empty;
    }

    let mut points = Vec::new();
    let mut segments = Vec::new();
    for segment_a in a.lines() {
        for segment_b in b.lines() {
            match line_intersection(segment_a, segment_b) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    push_unique(&mut points, intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    if intersection.start == intersection.end {
                        push_unique(&mut points, intersection.start);
                    } else {
                        segments.push(intersection);
                    }
                }
                None => {}
            }
        }
    }

    if !segments.is_empty() {
        return Intersection::Overlap { points, segments };
    }
    match points.len() {
        0 => Intersection::Empty,
        1 => Intersection::Point(points[0]),
        _ => Intersection::MultiPoint(points),
    }
}

/// Angle in `[0, 180)` between `probe` and the first segment of `line` it crosses.
pub fn crossing_angle(line: &LineString<f64>, probe: Line<f64>) -> Option<f64> {
    line.lines().find_map(|segment| {
        match line_intersection(segment, probe) {
            Some(LineIntersection::SinglePoint { .. }) => {
                Some(turn_angle(segment, probe) % 180.0)
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;
    use crate::test_utils::m;

    #[test]
    fn test_single_crossing() {
        let a = LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]);
        let b = LineString::new(vec![m(50.0, -10.0), m(50.0, 10.0)]);
        match intersections(&a, &b) {
            Intersection::Point(point) => assert!(distance(point, m(50.0, 0.0)) < 1e-3),
            other => panic!("Expected a point, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_vertex_is_reported_once() {
        let a = LineString::new(vec![m(0.0, 0.0), m(50.0, 0.0), m(100.0, 0.0)]);
        let b = LineString::new(vec![m(50.0, -10.0), m(50.0, 0.0), m(60.0, 10.0)]);
        assert_eq!(intersections(&a, &b).points().len(), 1);
    }

    #[test]
    fn test_multiple_crossings() {
        let a = LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]);
        let b = LineString::new(vec![
            m(20.0, -10.0),
            m(20.0, 10.0),
            m(80.0, 10.0),
            m(80.0, -10.0),
        ]);
        let result = intersections(&a, &b);
        assert!(matches!(result, Intersection::MultiPoint(_)));
        assert_eq!(result.points().len(), 2);
    }

    #[test]
    fn test_overlap_and_empty() {
        let a = LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]);
        let b = LineString::new(vec![m(50.0, 0.0), m(150.0, 0.0)]);
        assert!(matches!(
            intersections(&a, &b),
            Intersection::Overlap { .. }
        ));

        let c = LineString::new(vec![m(0.0, 10.0), m(100.0, 10.0)]);
        assert!(intersections(&a, &c).is_empty());
    }

    #[test]
    fn test_crossing_angle() {
        let line = LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]);
        let probe = Line::new(m(50.0, 10.0), m(50.0, -10.0));
        let angle = crossing_angle(&line, probe).unwrap();
        assert!((angle - 90.0).abs() < 1e-6);

        let missed = Line::new(m(150.0, 10.0), m(150.0, -10.0));
        assert!(crossing_angle(&line, missed).is_none());
    }
}
