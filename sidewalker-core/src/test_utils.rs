use geo::Coord;

/// Metres per degree on the haversine sphere at the equator.
pub(crate) const METRES_PER_DEGREE: f64 = std::f64::consts::PI * 6_371_008.8 / 180.0;

/// Coordinate `x` metres east and `y` metres north of (0, 0).
pub(crate) fn m(x: f64, y: f64) -> Coord<f64> {
    Coord {
        x: x / METRES_PER_DEGREE,
        y: y / METRES_PER_DEGREE,
    }
}
