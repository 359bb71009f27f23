use geo::Coord;
use sidewalker_core::NodeId;
use sidewalker_core::loading::RawNetwork;
use sidewalker_core::model::SidewalkPlacement;

pub const METRES_PER_DEGREE: f64 = std::f64::consts::PI * 6_371_008.8 / 180.0;

/// Coordinate `x` meters east and `y` meters north of (0, 0).
pub fn m(x: f64, y: f64) -> Coord<f64> {
    Coord {
        x: x / METRES_PER_DEGREE,
        y: y / METRES_PER_DEGREE,
    }
}

/// Adds the nodes at their metric positions and one road through them.
pub fn add_road(
    raw: &mut RawNetwork,
    source: u64,
    class: &str,
    placement: SidewalkPlacement,
    nodes: &[(NodeId, f64, f64)],
) {
    for &(node, x, y) in nodes {
        raw.add_node(node, m(x, y));
    }
    let ids: Vec<NodeId> = nodes.iter().map(|(node, _, _)| *node).collect();
    raw.add_road_through(source, "", class, placement, &ids)
        .unwrap();
}
