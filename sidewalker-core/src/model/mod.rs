//! Entities of the pedestrian network and their identifiers.

pub mod ids;
mod network;
pub mod roads;
mod to_geojson;

pub use ids::{
    CrossingId, CrossingKind, CrossingStem, IdStem, PedestrianId, SidewalkId, SidewalkStem,
    VehicleId,
};
pub use network::{DuplicateReport, NetworkStats, PedestrianNetwork};
pub use roads::{
    Crossing, CrossingType, PedestrianRoad, RoadSegment, Sidewalk, SidewalkPlacement, Splittable,
    VehicleRoad,
};
