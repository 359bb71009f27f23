use super::{EdgeId, RoadIdx};
use crate::NodeId;
use crate::model::CrossingType;

/// One traversal of an incident edge, as seen from the node that owns the list
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyEntry {
    pub neighbour: NodeId,
    /// Vehicle road the edge belongs to
    pub road: RoadIdx,
    /// Whether the edge is walked along the road's geometry
    pub forward: bool,
    /// Shared by both traversals of the same node pair
    pub edge: EdgeId,
    /// Bearing from the owning node to the neighbour
    pub bearing: f64,
    /// Subtype when the neighbour is a tagged crossing node
    pub neighbour_crossing: Option<CrossingType>,
}

/// Appends `entry` and bubbles it back until the list is ordered by bearing
/// again. Degrees are small, so this stays cheap.
pub(crate) fn insert_clockwise(entries: &mut Vec<AdjacencyEntry>, entry: AdjacencyEntry) {
    entries.push(entry);
    let mut position = entries.len() - 1;
    while position > 0 && entries[position - 1].bearing > entries[position].bearing {
        entries.swap(position - 1, position);
        position -= 1;
    }
}
