use std::collections::BTreeMap;

use geo::{BoundingRect, Coord, LineString, Rect};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, warn};

use super::adjacency::{AdjacencyEntry, insert_clockwise};
use super::index::SpatialIndex;
use super::memo::{ConnectionMemo, Stub};
use super::{EdgeId, RoadIdx};
use crate::geometry::{bearing, split_many};
use crate::loading::{ErrorPolicy, RawNetwork, RawVehicleWay};
use crate::model::ids::SplitCounters;
use crate::model::{
    Crossing, CrossingId, CrossingType, IdStem, PedestrianId, PedestrianRoad, Sidewalk,
    SidewalkId, Splittable, VehicleRoad,
};
use crate::{Error, NodeId};

/// Owns every entity of a run together with the bookkeeping that ties them
/// to the street topology.
///
/// Builders borrow the store mutably one stage at a time.
#[derive(Debug, Default)]
pub struct TopologyStore {
    locations: HashMap<NodeId, Coord<f64>>,
    adjacency: HashMap<NodeId, Vec<AdjacencyEntry>>,
    memo: HashMap<EdgeId, ConnectionMemo>,
    edge_count: usize,
    vehicle_roads: Vec<VehicleRoad>,
    pedestrian_roads: BTreeMap<PedestrianId, PedestrianRoad>,
    sidewalks: BTreeMap<SidewalkId, Sidewalk>,
    crossings: BTreeMap<CrossingId, Crossing>,
    split_counters: SplitCounters,
    sidewalk_index: SpatialIndex<SidewalkId>,
    crossing_index: SpatialIndex<CrossingId>,
    probe_index: SpatialIndex<usize>,
}

fn insert_entity<T: Splittable>(
    entities: &mut BTreeMap<T::Id, T>,
    counters: &mut SplitCounters,
    entity: T,
) -> Option<T> {
    counters.register(entity.stem(), entity.split());
    entities.insert(entity.id(), entity)
}

fn split_entity<T: Splittable>(
    entities: &mut BTreeMap<T::Id, T>,
    counters: &mut SplitCounters,
    id: T::Id,
    points: &[Coord<f64>],
) -> Result<Vec<T::Id>, Error> {
    let parent = entities
        .get(&id)
        .ok_or_else(|| Error::Topology(format!("Cannot split unknown entity {id}")))?;
    let pieces = split_many(parent.segment().geometry(), points)?;
    if pieces.len() < 2 {
        return Ok(vec![id]);
    }

    let stem = parent.stem();
    if counters.remaining(stem) < pieces.len() {
        warn!(
            "No split indices left under {stem} for {} pieces, keeping {id} whole",
            pieces.len()
        );
        return Ok(vec![id]);
    }
    let children = pieces
        .into_iter()
        .map(|geometry| {
            let split = counters.allocate(stem)?;
            Ok(parent.child(split, geometry)?)
        })
        .collect::<Result<Vec<T>, Error>>()?;

    entities.remove(&id);
    let ids = children.iter().map(Splittable::id).collect();
    entities.extend(children.into_iter().map(|child| (child.id(), child)));
    Ok(ids)
}

fn envelopes<'a, K: Copy + 'a, T: Splittable + 'a>(
    entities: impl Iterator<Item = (&'a K, &'a T)>,
) -> Vec<(K, Rect<f64>)> {
    entities
        .filter_map(|(id, entity)| {
            entity
                .segment()
                .geometry()
                .bounding_rect()
                .map(|rect| (*id, rect))
        })
        .collect()
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the store from an ingested network, recording one edge per
    /// consecutive node pair of every vehicle way.
    ///
    /// # Errors
    ///
    /// Fails on the first bad edge under [`ErrorPolicy::FailFast`].
    pub fn from_raw(raw: RawNetwork, policy: ErrorPolicy) -> Result<Self, Error> {
        let RawNetwork {
            locations,
            vehicle_ways,
            pedestrian_roads,
            crossing_nodes,
        } = raw;

        let mut store = TopologyStore {
            locations,
            ..TopologyStore::default()
        };

        for RawVehicleWay { road, nodes } in vehicle_ways {
            let id = road.id;
            let road_idx = store.add_vehicle_road(road);
            for (&from, &to) in nodes.iter().tuple_windows() {
                let recorded = store.record_edge(
                    from,
                    to,
                    road_idx,
                    crossing_nodes.get(&from).cloned(),
                    crossing_nodes.get(&to).cloned(),
                );
                policy.absorb(recorded, format_args!("vehicle road {id}"))?;
            }
        }

        for road in pedestrian_roads {
            if let Some(previous) = store.insert_pedestrian_road(road) {
                debug!("Pedestrian road {} was given twice", previous.id);
            }
        }

        Ok(store)
    }

    pub fn set_location(&mut self, node: NodeId, location: Coord<f64>) {
        self.locations.insert(node, location);
    }

    pub fn location_of(&self, node: NodeId) -> Result<Coord<f64>, Error> {
        self.locations
            .get(&node)
            .copied()
            .ok_or(Error::MissingLocation(node))
    }

    pub fn add_vehicle_road(&mut self, road: VehicleRoad) -> RoadIdx {
        self.vehicle_roads.push(road);
        self.vehicle_roads.len() - 1
    }

    pub fn vehicle_road(&self, idx: RoadIdx) -> Result<&VehicleRoad, Error> {
        self.vehicle_roads
            .get(idx)
            .ok_or_else(|| Error::Topology(format!("Unknown vehicle road index {idx}")))
    }

    pub fn vehicle_roads(&self) -> &[VehicleRoad] {
        &self.vehicle_roads
    }

    /// Records the edge `n1 - n2` of `road` in the adjacency of both nodes,
    /// keeping each list in clockwise order.
    ///
    /// The crossing arguments carry the tagged subtype when the respective
    /// node is an official crossing. Returns the shared edge id, or `None`
    /// when the edge is degenerate. A node pair that is already connected
    /// keeps its first edge.
    ///
    /// # Errors
    ///
    /// Fails when either node has no known location.
    pub fn record_edge(
        &mut self,
        n1: NodeId,
        n2: NodeId,
        road: RoadIdx,
        n1_crossing: Option<CrossingType>,
        n2_crossing: Option<CrossingType>,
    ) -> Result<Option<EdgeId>, Error> {
        let p1 = self.location_of(n1)?;
        let p2 = self.location_of(n2)?;
        if n1 == n2 || p1 == p2 {
            debug!("Skipping zero-length edge {n1} - {n2}");
            return Ok(None);
        }

        if let Some(existing) = self
            .neighbours(n1)
            .iter()
            .find(|entry| entry.neighbour == n2)
        {
            debug!("Nodes {n1} and {n2} are already connected, keeping the first edge");
            return Ok(Some(existing.edge));
        }

        let edge = self.edge_count;
        self.edge_count += 1;

        insert_clockwise(
            self.adjacency.entry(n1).or_default(),
            AdjacencyEntry {
                neighbour: n2,
                road,
                forward: true,
                edge,
                bearing: bearing(p1, p2),
                neighbour_crossing: n2_crossing,
            },
        );
        insert_clockwise(
            self.adjacency.entry(n2).or_default(),
            AdjacencyEntry {
                neighbour: n1,
                road,
                forward: false,
                edge,
                bearing: bearing(p2, p1),
                neighbour_crossing: n1_crossing,
            },
        );
        Ok(Some(edge))
    }

    /// Incident edges of `node` in clockwise order.
    pub fn neighbours(&self, node: NodeId) -> &[AdjacencyEntry] {
        self.adjacency
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every node with at least one incident edge, in ascending order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.adjacency.keys().copied().sorted_unstable().collect()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn memo_for(&self, edge: EdgeId) -> Option<&ConnectionMemo> {
        self.memo.get(&edge)
    }

    pub fn remember_memo(&mut self, edge: EdgeId, memo: ConnectionMemo) {
        self.memo.insert(edge, memo);
    }

    /// Left and right stub of every incident edge of `node`, in clockwise
    /// edge order.
    ///
    /// # Errors
    ///
    /// Fails when an incident edge has no memo yet.
    pub fn stubs_at(&self, node: NodeId) -> Result<Vec<Option<Stub>>, Error> {
        let entries = self.neighbours(node);
        let mut stubs = Vec::with_capacity(2 * entries.len());
        for entry in entries {
            let memo = self.memo_for(entry.edge).ok_or_else(|| {
                Error::Topology(format!(
                    "No sidewalks recorded for edge {node} - {}",
                    entry.neighbour
                ))
            })?;
            let pair = memo.resolve(node);
            stubs.push(pair.left);
            stubs.push(pair.right);
        }
        Ok(stubs)
    }

    pub fn allocate_split(&mut self, stem: IdStem) -> Result<u8, Error> {
        self.split_counters.allocate(stem)
    }

    /// Number of split indices still free under `stem`.
    pub fn remaining_splits(&self, stem: IdStem) -> usize {
        self.split_counters.remaining(stem)
    }

    // Pedestrian roads

    pub fn insert_pedestrian_road(&mut self, road: PedestrianRoad) -> Option<PedestrianRoad> {
        insert_entity(&mut self.pedestrian_roads, &mut self.split_counters, road)
    }

    pub fn pedestrian_road(&self, id: PedestrianId) -> Option<&PedestrianRoad> {
        self.pedestrian_roads.get(&id)
    }

    pub fn remove_pedestrian_road(&mut self, id: PedestrianId) -> Option<PedestrianRoad> {
        self.pedestrian_roads.remove(&id)
    }

    pub fn pedestrian_roads(&self) -> impl Iterator<Item = &PedestrianRoad> {
        self.pedestrian_roads.values()
    }

    pub fn pedestrian_road_count(&self) -> usize {
        self.pedestrian_roads.len()
    }

    /// Replaces the road by its pieces cut at `points`.
    pub fn split_pedestrian_road(
        &mut self,
        id: PedestrianId,
        points: &[Coord<f64>],
    ) -> Result<Vec<PedestrianId>, Error> {
        split_entity(
            &mut self.pedestrian_roads,
            &mut self.split_counters,
            id,
            points,
        )
    }

    // Sidewalks

    pub fn insert_sidewalk(&mut self, sidewalk: Sidewalk) -> Option<Sidewalk> {
        insert_entity(&mut self.sidewalks, &mut self.split_counters, sidewalk)
    }

    pub fn sidewalk(&self, id: SidewalkId) -> Option<&Sidewalk> {
        self.sidewalks.get(&id)
    }

    pub fn require_sidewalk(&self, id: SidewalkId) -> Result<&Sidewalk, Error> {
        self.sidewalk(id)
            .ok_or_else(|| Error::Topology(format!("Missing sidewalk {id}")))
    }

    pub fn remove_sidewalk(&mut self, id: SidewalkId) -> Option<Sidewalk> {
        self.sidewalks.remove(&id)
    }

    pub fn sidewalks(&self) -> impl Iterator<Item = &Sidewalk> {
        self.sidewalks.values()
    }

    pub fn sidewalk_ids(&self) -> Vec<SidewalkId> {
        self.sidewalks.keys().copied().collect()
    }

    pub fn sidewalk_count(&self) -> usize {
        self.sidewalks.len()
    }

    /// Mutates a sidewalk geometry in place.
    pub fn update_sidewalk(
        &mut self,
        id: SidewalkId,
        update: impl FnOnce(&mut LineString<f64>),
    ) -> Result<(), Error> {
        let sidewalk = self
            .sidewalks
            .get_mut(&id)
            .ok_or_else(|| Error::Topology(format!("Missing sidewalk {id}")))?;
        sidewalk.segment.update_geometry(update)?;
        Ok(())
    }

    pub fn split_sidewalk(
        &mut self,
        id: SidewalkId,
        points: &[Coord<f64>],
    ) -> Result<Vec<SidewalkId>, Error> {
        split_entity(&mut self.sidewalks, &mut self.split_counters, id, points)
    }

    // Crossings

    pub fn insert_crossing(&mut self, crossing: Crossing) -> Option<Crossing> {
        insert_entity(&mut self.crossings, &mut self.split_counters, crossing)
    }

    pub fn crossing(&self, id: CrossingId) -> Option<&Crossing> {
        self.crossings.get(&id)
    }

    pub fn remove_crossing(&mut self, id: CrossingId) -> Option<Crossing> {
        self.crossings.remove(&id)
    }

    pub fn crossings(&self) -> impl Iterator<Item = &Crossing> {
        self.crossings.values()
    }

    pub fn crossing_count(&self) -> usize {
        self.crossings.len()
    }

    pub fn split_crossing(
        &mut self,
        id: CrossingId,
        points: &[Coord<f64>],
    ) -> Result<Vec<CrossingId>, Error> {
        split_entity(&mut self.crossings, &mut self.split_counters, id, points)
    }

    // Spatial indices

    /// Rebuilds the sidewalk index from the current collection.
    pub fn index_sidewalks(&mut self) {
        self.sidewalk_index = SpatialIndex::new(envelopes(self.sidewalks.iter()));
    }

    pub fn index_crossings(&mut self) {
        self.crossing_index = SpatialIndex::new(envelopes(self.crossings.iter()));
    }

    /// Replaces the probe index with the given probe envelopes.
    pub fn index_probes(&mut self, probes: impl IntoIterator<Item = (usize, Rect<f64>)>) {
        self.probe_index = SpatialIndex::new(probes);
    }

    pub fn clear_probe_index(&mut self) {
        self.probe_index = SpatialIndex::default();
    }

    pub fn sidewalks_near(&self, rect: Rect<f64>) -> impl Iterator<Item = &SidewalkId> {
        self.sidewalk_index.query(rect)
    }

    pub fn crossings_near(&self, rect: Rect<f64>) -> impl Iterator<Item = &CrossingId> {
        self.crossing_index.query(rect)
    }

    pub fn probes_near(&self, rect: Rect<f64>) -> impl Iterator<Item = &usize> {
        self.probe_index.query(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Side;
    use crate::model::{RoadSegment, SidewalkPlacement, VehicleId};
    use crate::test_utils::m;

    fn road(source: u64) -> VehicleRoad {
        VehicleRoad {
            id: VehicleId { source, part: 0 },
            segment: RoadSegment::new(
                "",
                "residential",
                LineString::new(vec![m(0.0, 0.0), m(1.0, 0.0)]),
            )
            .unwrap(),
            placement: SidewalkPlacement::Both,
            lanes: 0,
        }
    }

    fn star() -> TopologyStore {
        let mut store = TopologyStore::new();
        store.set_location(1, m(0.0, 0.0));
        store.set_location(2, m(0.0, 100.0));
        store.set_location(3, m(100.0, 0.0));
        store.set_location(4, m(0.0, -100.0));
        store.set_location(5, m(-100.0, 0.0));
        store.set_location(6, m(-70.0, 70.0));
        store
    }

    #[test]
    fn test_adjacency_is_clockwise() {
        let mut store = star();
        let idx = store.add_vehicle_road(road(1));
        for neighbour in [5, 3, 6, 2, 4] {
            store.record_edge(1, neighbour, idx, None, None).unwrap();
        }
        let bearings: Vec<f64> = store.neighbours(1).iter().map(|e| e.bearing).collect();
        assert!(bearings.windows(2).all(|w| w[0] <= w[1]));
        let order: Vec<NodeId> = store.neighbours(1).iter().map(|e| e.neighbour).collect();
        assert_eq!(order, vec![2, 3, 4, 5, 6]);
        assert!(!store.neighbours(3)[0].forward);
    }

    #[test]
    fn test_record_edge_shares_edge_id_and_rejects_duplicates() {
        let mut store = star();
        let idx = store.add_vehicle_road(road(1));
        let edge = store.record_edge(1, 2, idx, None, None).unwrap();
        assert_eq!(store.neighbours(1)[0].edge, store.neighbours(2)[0].edge);

        let again = store.record_edge(2, 1, idx, None, None).unwrap();
        assert_eq!(again, edge);
        assert_eq!(store.neighbours(1).len(), 1);
        assert_eq!(store.edge_count(), 1);

        assert!(store.record_edge(1, 1, idx, None, None).unwrap().is_none());
        assert!(matches!(
            store.record_edge(1, 99, idx, None, None),
            Err(Error::MissingLocation(99))
        ));
    }

    #[test]
    fn test_crossing_flags_belong_to_neighbour() {
        let mut store = star();
        let idx = store.add_vehicle_road(road(1));
        store
            .record_edge(1, 2, idx, Some(CrossingType::Tagged("zebra".into())), None)
            .unwrap();
        assert_eq!(store.neighbours(1)[0].neighbour_crossing, None);
        assert_eq!(
            store.neighbours(2)[0].neighbour_crossing,
            Some(CrossingType::Tagged("zebra".into()))
        );
    }

    #[test]
    fn test_split_sidewalk_allocates_fresh_indices() {
        let mut store = TopologyStore::new();
        let id = SidewalkId::new(1, 2, Side::Left);
        store.insert_sidewalk(Sidewalk {
            id,
            segment: RoadSegment::new(
                "",
                "residential",
                LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]),
            )
            .unwrap(),
            source: 1,
        });

        let children = store
            .split_sidewalk(id, &[m(30.0, 0.0), m(60.0, 0.0)])
            .unwrap();
        assert_eq!(children.len(), 3);
        assert!(store.sidewalk(id).is_none());
        let splits: Vec<u8> = children.iter().map(|c| c.split).collect();
        assert_eq!(splits, vec![1, 2, 3]);

        // cutting at an endpoint keeps the sidewalk as it is
        let last = children[2];
        assert_eq!(store.split_sidewalk(last, &[m(100.0, 0.0)]).unwrap(), vec![last]);
        assert_eq!(store.sidewalk_count(), 3);
    }

    #[test]
    fn test_split_without_free_indices_keeps_entity_whole() {
        let mut store = TopologyStore::new();
        let id = SidewalkId {
            split: 97,
            ..SidewalkId::new(1, 2, Side::Left)
        };
        store.insert_sidewalk(Sidewalk {
            id,
            segment: RoadSegment::new(
                "",
                "residential",
                LineString::new(vec![m(0.0, 0.0), m(100.0, 0.0)]),
            )
            .unwrap(),
            source: 1,
        });
        assert_eq!(store.remaining_splits(IdStem::Sidewalk(id.stem)), 2);

        let kept = store
            .split_sidewalk(id, &[m(30.0, 0.0), m(60.0, 0.0)])
            .unwrap();
        assert_eq!(kept, vec![id]);
        assert_eq!(store.remaining_splits(IdStem::Sidewalk(id.stem)), 2);

        let children = store.split_sidewalk(id, &[m(50.0, 0.0)]).unwrap();
        let splits: Vec<u8> = children.iter().map(|c| c.split).collect();
        assert_eq!(splits, vec![98, 99]);
        assert_eq!(store.remaining_splits(IdStem::Sidewalk(id.stem)), 0);
    }

    #[test]
    fn test_stubs_require_memo() {
        let mut store = star();
        let idx = store.add_vehicle_road(road(1));
        store.record_edge(1, 2, idx, None, None).unwrap();
        assert!(matches!(store.stubs_at(1), Err(Error::Topology(_))));

        let left = SidewalkId::new(1, 2, Side::Left);
        store.remember_memo(
            0,
            ConnectionMemo {
                origin: 1,
                left: Some(left),
                right: None,
            },
        );
        let stubs = store.stubs_at(2).unwrap();
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0], None);
        assert_eq!(
            stubs[1],
            Some(Stub {
                id: left,
                reversed: true
            })
        );
    }
}
