//! Geometry kernel over lon/lat coordinates.
//!
//! Distances are metres on the haversine sphere, bearings are degrees
//! clockwise from north in `[0, 360)`. Interpolation along a segment is
//! planar in lon/lat, which is accurate enough at street scale.

mod intersection;
mod measure;
mod polyline;

use thiserror::Error;

pub use intersection::{Intersection, crossing_angle, intersections};
pub use measure::{
    TURN_TOLERANCE_DEG, TurnKind, bearing, distance, distance_to_line, interpolate, line_length,
    midpoint, normalize_degrees, offset_point, orthogonal_line, outward_segment, parallel_line,
    sample_along, segmentize, turn_angle,
};
pub use polyline::{
    SPLIT_TOLERANCE_M, VERTEX_SNAP_M, endpoint, insert_endpoint, join, merge_lines, set_endpoint,
    split_at, split_many,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Polyline needs at least two coordinates, got {0}")]
    TooFewCoordinates(usize),
    #[error("Point ({x}, {y}) is not on the polyline")]
    Unassociated { x: f64, y: f64 },
    #[error("Point ({x}, {y}) is an endpoint of the polyline")]
    SplitAtEndpoint { x: f64, y: f64 },
}

/// Side of a directed segment, looking from its start towards its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}
