// Re-export key components
pub use crate::algo::{DuplicateDetector, ReconcileStats, Reconciler};
pub use crate::build::{CrossingBuilder, SidewalkBuilder};
pub use crate::loading::geojson::{read_network, read_network_str};
pub use crate::loading::{
    ErrorPolicy, NetworkConfig, RawNetwork, create_pedestrian_network,
    create_pedestrian_network_from_geojson,
};
pub use crate::model::{
    Crossing, CrossingId, CrossingType, DuplicateReport, NetworkStats, PedestrianId,
    PedestrianNetwork, PedestrianRoad, Sidewalk, SidewalkId, SidewalkPlacement,
};
pub use crate::topology::TopologyStore;

// Core identifier types of the source street network
pub use crate::NodeId;
pub use crate::WayId;
