//! Topology store: clockwise adjacency per node, the per-edge connection
//! memo, the entity collections and their spatial indices.

mod adjacency;
mod index;
mod memo;
mod store;

pub use adjacency::AdjacencyEntry;
pub use index::SpatialIndex;
pub use memo::{ConnectionMemo, Stub, StubPair};
pub use store::TopologyStore;

/// Index of a vehicle road in the store
pub type RoadIdx = usize;
/// Identifier shared by both traversals of one node pair
pub type EdgeId = usize;
