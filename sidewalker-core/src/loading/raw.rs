use geo::{Coord, LineString};
use hashbrown::HashMap;

use crate::model::{
    CrossingType, PedestrianId, PedestrianRoad, RoadSegment, SidewalkPlacement, VehicleId,
    VehicleRoad,
};
use crate::{Error, NodeId, WayId};

/// Vehicle road together with the source nodes along its geometry
#[derive(Debug, Clone)]
pub struct RawVehicleWay {
    pub road: VehicleRoad,
    pub nodes: Vec<NodeId>,
}

/// Classified street network as handed over by ingestion
#[derive(Debug, Clone, Default)]
pub struct RawNetwork {
    pub locations: HashMap<NodeId, Coord<f64>>,
    pub vehicle_ways: Vec<RawVehicleWay>,
    pub pedestrian_roads: Vec<PedestrianRoad>,
    /// Tagged crossing nodes and their subtype
    pub crossing_nodes: HashMap<NodeId, CrossingType>,
}

impl RawNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeId, location: Coord<f64>) {
        self.locations.insert(node, location);
    }

    pub fn tag_crossing(&mut self, node: NodeId, subtype: impl Into<String>) {
        self.crossing_nodes
            .insert(node, CrossingType::Tagged(subtype.into()));
    }

    pub fn add_vehicle_way(&mut self, road: VehicleRoad, nodes: Vec<NodeId>) {
        self.vehicle_ways.push(RawVehicleWay { road, nodes });
    }

    /// Adds a vehicle road running through `nodes`, taking its geometry from
    /// the node locations.
    ///
    /// # Errors
    ///
    /// Fails when a node has no location or fewer than two nodes are given.
    pub fn add_road_through(
        &mut self,
        source: WayId,
        name: &str,
        class: &str,
        placement: SidewalkPlacement,
        nodes: &[NodeId],
    ) -> Result<VehicleId, Error> {
        let coords = nodes
            .iter()
            .map(|node| {
                self.locations
                    .get(node)
                    .copied()
                    .ok_or(Error::MissingLocation(*node))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let id = VehicleId { source, part: 0 };
        let road = VehicleRoad {
            id,
            segment: RoadSegment::new(name, class, LineString::new(coords))?,
            placement,
            lanes: 0,
        };
        self.add_vehicle_way(road, nodes.to_vec());
        Ok(id)
    }

    /// Adds an unsplit pedestrian road over `coords`.
    ///
    /// # Errors
    ///
    /// Fails for fewer than two coordinates.
    pub fn add_pedestrian_path(
        &mut self,
        source: WayId,
        name: &str,
        class: &str,
        coords: Vec<Coord<f64>>,
    ) -> Result<PedestrianId, Error> {
        let id = PedestrianId::new(source);
        self.pedestrian_roads.push(PedestrianRoad {
            id,
            segment: RoadSegment::new(name, class, LineString::new(coords))?,
        });
        Ok(id)
    }
}
