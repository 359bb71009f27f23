use std::collections::VecDeque;

use geo::{Coord, Line, LineString};
use hashbrown::HashMap;

use super::GeometryError;
use super::measure::{distance, interpolate};

/// Maximum distance, in metres, between a split point and the polyline it cuts.
pub const SPLIT_TOLERANCE_M: f64 = 0.05;
/// Points closer than this to a vertex, in metres, are treated as that vertex.
pub const VERTEX_SNAP_M: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct Location {
    segment: usize,
    fraction: f64,
    distance_m: f64,
}

fn project(segment: Line<f64>, point: Coord<f64>) -> f64 {
    let delta = segment.end - segment.start;
    let squared = delta.x * delta.x + delta.y * delta.y;
    if squared == 0.0 {
        return 0.0;
    }
    let offset = point - segment.start;
    ((offset.x * delta.x + offset.y * delta.y) / squared).clamp(0.0, 1.0)
}

/// Nearest segment of `line` to `point`; ties resolve to the lowest segment index.
fn locate(line: &LineString<f64>, point: Coord<f64>) -> Option<Location> {
    line.lines()
        .enumerate()
        .map(|(segment, l)| {
            let fraction = project(l, point);
            Location {
                segment,
                fraction,
                distance_m: distance(point, interpolate(l.start, l.end, fraction)),
            }
        })
        .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
}

fn locate_within_tolerance(
    line: &LineString<f64>,
    point: Coord<f64>,
) -> Result<Location, GeometryError> {
    locate(line, point)
        .filter(|location| location.distance_m <= SPLIT_TOLERANCE_M)
        .ok_or(GeometryError::Unassociated {
            x: point.x,
            y: point.y,
        })
}

/// Cuts `line` at `point` into a prefix and a suffix sharing that point.
///
/// A point on an existing vertex cuts there; a point between vertices
/// becomes the last coordinate of the prefix and the first of the suffix.
///
/// # Errors
///
/// Fails when `point` is farther than [`SPLIT_TOLERANCE_M`] from the polyline
/// or coincides with one of its endpoints.
pub fn split_at(
    line: &LineString<f64>,
    point: Coord<f64>,
) -> Result<(LineString<f64>, LineString<f64>), GeometryError> {
    let coords = &line.0;
    if coords.len() < 2 {
        return Err(GeometryError::TooFewCoordinates(coords.len()));
    }

    let location = locate_within_tolerance(line, point)?;
    let segment = location.segment;
    let last = coords.len() - 1;

    let vertex = if distance(point, coords[segment]) <= VERTEX_SNAP_M {
        Some(segment)
    } else if distance(point, coords[segment + 1]) <= VERTEX_SNAP_M {
        Some(segment + 1)
    } else {
        None
    };

    match vertex {
        Some(index) if index == 0 || index == last => Err(GeometryError::SplitAtEndpoint {
            x: point.x,
            y: point.y,
        }),
        Some(index) => Ok((
            LineString::new(coords[..=index].to_vec()),
            LineString::new(coords[index..].to_vec()),
        )),
        None => {
            let mut prefix = coords[..=segment].to_vec();
            prefix.push(point);
            let mut suffix = vec![point];
            suffix.extend_from_slice(&coords[segment + 1..]);
            Ok((LineString::new(prefix), LineString::new(suffix)))
        }
    }
}

/// Cuts `line` at every point in `points`, returning the pieces in order.
///
/// Points are ordered along the line first. Points on an endpoint and
/// repeated points do not cut.
///
/// # Errors
///
/// Fails when any point is farther than [`SPLIT_TOLERANCE_M`] from the polyline.
pub fn split_many(
    line: &LineString<f64>,
    points: &[Coord<f64>],
) -> Result<Vec<LineString<f64>>, GeometryError> {
    if line.0.len() < 2 {
        return Err(GeometryError::TooFewCoordinates(line.0.len()));
    }

    let mut located = points
        .iter()
        .map(|&point| locate_within_tolerance(line, point).map(|location| (location, point)))
        .collect::<Result<Vec<_>, _>>()?;
    located.sort_by(|(a, _), (b, _)| {
        a.segment
            .cmp(&b.segment)
            .then(a.fraction.total_cmp(&b.fraction))
    });

    let mut pieces = Vec::with_capacity(located.len() + 1);
    let mut remainder = line.clone();
    let mut previous: Option<Coord<f64>> = None;
    for (_, point) in located {
        if previous.is_some_and(|p| distance(p, point) <= VERTEX_SNAP_M) {
            continue;
        }
        match split_at(&remainder, point) {
            Ok((head, tail)) => {
                pieces.push(head);
                remainder = tail;
                previous = Some(point);
            }
            Err(GeometryError::SplitAtEndpoint { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    pieces.push(remainder);
    Ok(pieces)
}

/// Concatenates two polylines, dropping the duplicated joint coordinate.
pub fn join(prefix: &LineString<f64>, suffix: &LineString<f64>) -> LineString<f64> {
    let mut coords = prefix.0.clone();
    let skip = usize::from(coords.last() == suffix.0.first());
    coords.extend(suffix.0.iter().skip(skip));
    LineString::new(coords)
}

pub fn endpoint(line: &LineString<f64>, at_end: bool) -> Option<Coord<f64>> {
    if at_end {
        line.0.last().copied()
    } else {
        line.0.first().copied()
    }
}

/// Moves the first (or last) coordinate of `line` onto `point`.
pub fn set_endpoint(line: &mut LineString<f64>, point: Coord<f64>, at_end: bool) {
    let target = if at_end {
        line.0.last_mut()
    } else {
        line.0.first_mut()
    };
    if let Some(coord) = target {
        *coord = point;
    }
}

/// Prepends (or appends) `point` to `line`.
pub fn insert_endpoint(line: &mut LineString<f64>, point: Coord<f64>, at_end: bool) {
    if at_end {
        line.0.push(point);
    } else {
        line.0.insert(0, point);
    }
}

type EndpointKey = (u64, u64);

fn endpoint_key(coord: Coord<f64>) -> EndpointKey {
    (coord.x.to_bits(), coord.y.to_bits())
}

fn take_attached(
    by_endpoint: &HashMap<EndpointKey, Vec<usize>>,
    used: &mut [bool],
    point: Coord<f64>,
) -> Option<usize> {
    let candidates = by_endpoint.get(&endpoint_key(point))?;
    // only pass-through points are merged, junctions stay
    if candidates.len() != 2 {
        return None;
    }
    let next = candidates.iter().copied().find(|i| !used[*i])?;
    used[next] = true;
    Some(next)
}

/// Chains polylines sharing exact endpoints into maximal runs.
///
/// Runs continue only through points shared by exactly two polylines.
pub fn merge_lines(lines: &[LineString<f64>]) -> Vec<LineString<f64>> {
    let mut by_endpoint: HashMap<EndpointKey, Vec<usize>> = HashMap::new();
    for (i, line) in lines.iter().enumerate() {
        if let (Some(first), Some(last)) = (line.0.first(), line.0.last()) {
            by_endpoint.entry(endpoint_key(*first)).or_default().push(i);
            by_endpoint.entry(endpoint_key(*last)).or_default().push(i);
        }
    }

    let mut used = vec![false; lines.len()];
    let mut merged = Vec::new();
    for start in 0..lines.len() {
        if used[start] || lines[start].0.is_empty() {
            continue;
        }
        used[start] = true;
        let mut chain: VecDeque<Coord<f64>> = lines[start].0.iter().copied().collect();

        while let Some(back) = chain.back().copied()
            && let Some(next) = take_attached(&by_endpoint, &mut used, back)
        {
            let coords = &lines[next].0;
            if coords.first() == Some(&back) {
                chain.extend(coords.iter().skip(1));
            } else {
                chain.extend(coords.iter().rev().skip(1));
            }
        }

        while let Some(front) = chain.front().copied()
            && let Some(previous) = take_attached(&by_endpoint, &mut used, front)
        {
            let coords = &lines[previous].0;
            if coords.last() == Some(&front) {
                for coord in coords.iter().rev().skip(1) {
                    chain.push_front(*coord);
                }
            } else {
                for coord in coords.iter().skip(1) {
                    chain.push_front(*coord);
                }
            }
        }

        merged.push(LineString::new(Vec::from(chain)));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::m;

    fn sample() -> LineString<f64> {
        LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0), m(100.0, 100.0)])
    }

    #[test]
    fn test_split_at_vertex_rejoins() {
        let line = sample();
        let (prefix, suffix) = split_at(&line, m(100.0, 0.0)).unwrap();
        assert_eq!(prefix.0.len(), 2);
        assert_eq!(suffix.0.len(), 2);
        assert_eq!(join(&prefix, &suffix), line);
    }

    #[test]
    fn test_split_between_vertices_rejoins() {
        let line = sample();
        let point = m(40.0, 0.0);
        let (prefix, suffix) = split_at(&line, point).unwrap();
        assert_eq!(prefix.0.last(), Some(&point));
        assert_eq!(suffix.0.first(), Some(&point));

        let rejoined = join(&prefix, &suffix);
        assert_eq!(rejoined.0.len(), 4);
        assert_eq!(rejoined.0[0], line.0[0]);
        assert_eq!(rejoined.0[2], line.0[1]);
        assert_eq!(rejoined.0[3], line.0[2]);
    }

    #[test]
    fn test_split_at_endpoint_fails() {
        let result = split_at(&sample(), m(0.0, 0.0));
        assert!(matches!(result, Err(GeometryError::SplitAtEndpoint { .. })));
        let result = split_at(&sample(), m(100.0, 100.0));
        assert!(matches!(result, Err(GeometryError::SplitAtEndpoint { .. })));
    }

    #[test]
    fn test_split_far_point_is_unassociated() {
        let result = split_at(&sample(), m(50.0, 1.0));
        assert!(matches!(result, Err(GeometryError::Unassociated { .. })));
        assert!(split_at(&sample(), m(50.0, 0.01)).is_ok());
    }

    #[test]
    fn test_split_many_orders_and_ignores_endpoints() {
        let line = sample();
        let pieces = split_many(
            &line,
            &[m(100.0, 50.0), m(0.0, 0.0), m(50.0, 0.0), m(50.0, 0.0)],
        )
        .unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].0.last(), Some(&m(50.0, 0.0)));
        assert_eq!(pieces[1].0.first(), Some(&m(50.0, 0.0)));
        assert_eq!(pieces[1].0.last(), Some(&m(100.0, 50.0)));
        assert_eq!(pieces[2].0.last(), Some(&m(100.0, 100.0)));
    }

    #[test]
    fn test_split_many_without_cuts_returns_line() {
        let line = sample();
        assert_eq!(split_many(&line, &[]).unwrap(), vec![line.clone()]);
        assert_eq!(
            split_many(&line, &[m(100.0, 100.0)]).unwrap(),
            vec![line.clone()]
        );
    }

    #[test]
    fn test_endpoint_mutation() {
        let mut line = sample();
        insert_endpoint(&mut line, m(-10.0, 0.0), false);
        assert_eq!(endpoint(&line, false), Some(m(-10.0, 0.0)));
        set_endpoint(&mut line, m(100.0, 90.0), true);
        assert_eq!(endpoint(&line, true), Some(m(100.0, 90.0)));
        assert_eq!(line.0.len(), 4);
    }

    #[test]
    fn test_merge_lines_stops_at_junctions() {
        let a = LineString::new(vec![m(0.0, 0.0), m(10.0, 0.0)]);
        // stored backwards on purpose
        let b = LineString::new(vec![m(20.0, 0.0), m(10.0, 0.0)]);
        let c = LineString::new(vec![m(20.0, 0.0), m(30.0, 0.0)]);
        let branch_1 = LineString::new(vec![m(30.0, 0.0), m(30.0, 10.0)]);
        let branch_2 = LineString::new(vec![m(30.0, 0.0), m(40.0, 0.0)]);

        let merged = merge_lines(&[b, a, c, branch_1, branch_2]);
        assert_eq!(merged.len(), 3);
        let main = merged.iter().find(|l| l.0.len() == 4).unwrap();
        let ends = [main.0[0], main.0[3]];
        assert!(ends.contains(&m(0.0, 0.0)));
        assert!(ends.contains(&m(30.0, 0.0)));
    }
}
