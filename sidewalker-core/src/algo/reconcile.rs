//! Split-and-merge of pedestrian roads against the constructed network.
//!
//! Every pedestrian road is matched against the sidewalks and crossings its
//! envelope touches. Both sides of each real intersection are cut there, so
//! the final network is connected through shared vertices.
//!
//! Matching is a read-only sweep; cut points are buffered per entity and
//! applied once the sweep is over, so an entity cut by several partners is
//! split a single time at all of its points.

use std::collections::BTreeMap;
use std::fmt;

use geo::{BoundingRect, Coord, LineString};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::Error;
use crate::geometry::intersections;
use crate::loading::{ErrorPolicy, NetworkConfig};
use crate::model::{CrossingId, PedestrianId, PedestrianRoad, SidewalkId};
use crate::topology::TopologyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Target {
    Pedestrian(PedestrianId),
    Sidewalk(SidewalkId),
    Crossing(CrossingId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Pedestrian(id) => write!(f, "pedestrian road {id}"),
            Target::Sidewalk(id) => write!(f, "sidewalk {id}"),
            Target::Crossing(id) => write!(f, "crossing {id}"),
        }
    }
}

/// Number of entities replaced by their pieces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub pedestrian_roads: usize,
    pub sidewalks: usize,
    pub crossings: usize,
}

type Cuts = BTreeMap<Target, Vec<Coord<f64>>>;

/// Partners of one pedestrian road together with the points they cross it at.
fn matches(store: &TopologyStore, road: &PedestrianRoad) -> Vec<(Target, Vec<Coord<f64>>)> {
    let geometry = road.segment.geometry();
    let Some(envelope) = geometry.bounding_rect() else {
        return Vec::new();
    };

    let sidewalks = store.sidewalks_near(envelope).filter_map(|&id| {
        store
            .sidewalk(id)
            .map(|sidewalk| (Target::Sidewalk(id), sidewalk.segment.geometry()))
    });
    let crossings = store.crossings_near(envelope).filter_map(|&id| {
        store
            .crossing(id)
            .map(|crossing| (Target::Crossing(id), crossing.segment.geometry()))
    });

    sidewalks
        .chain(crossings)
        .filter_map(|(target, other): (Target, &LineString<f64>)| {
            let points = intersections(geometry, other).points().to_vec();
            (!points.is_empty()).then_some((target, points))
        })
        .collect()
}

pub struct Reconciler<'a> {
    store: &'a mut TopologyStore,
    policy: ErrorPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a mut TopologyStore, config: &NetworkConfig) -> Self {
        Reconciler {
            store,
            policy: config.error_policy,
        }
    }

    /// Cuts pedestrian roads, sidewalks and crossings at their mutual
    /// intersections and refreshes the spatial indices.
    ///
    /// # Errors
    ///
    /// Fails on broken topology, and under fail fast on the first entity that
    /// cannot be split.
    pub fn run(mut self) -> Result<ReconcileStats, Error> {
        self.store.index_sidewalks();
        self.store.index_crossings();

        let cuts = self.sweep();
        debug!("{} entities to split", cuts.len());
        let stats = self.apply(cuts)?;

        self.store.index_sidewalks();
        self.store.index_crossings();
        info!(
            "Reconciled network: split {} pedestrian roads, {} sidewalks, {} crossings",
            stats.pedestrian_roads, stats.sidewalks, stats.crossings
        );
        Ok(stats)
    }

    fn sweep(&self) -> Cuts {
        let store: &TopologyStore = &*self.store;
        let roads: Vec<&PedestrianRoad> = store.pedestrian_roads().collect();
        let found: Vec<(PedestrianId, Target, Vec<Coord<f64>>)> = roads
            .par_iter()
            .flat_map_iter(|road| {
                let id = road.id;
                matches(store, road)
                    .into_iter()
                    .map(move |(target, points)| (id, target, points))
            })
            .collect();

        let mut cuts = Cuts::new();
        for (pedestrian, target, points) in found {
            cuts.entry(Target::Pedestrian(pedestrian))
                .or_default()
                .extend_from_slice(&points);
            cuts.entry(target).or_default().extend(points);
        }
        cuts
    }

    fn apply(&mut self, cuts: Cuts) -> Result<ReconcileStats, Error> {
        let mut stats = ReconcileStats::default();
        for (target, points) in cuts {
            let outcome = match target {
                Target::Pedestrian(id) => self
                    .store
                    .split_pedestrian_road(id, &points)
                    .map(|pieces| pieces.len()),
                Target::Sidewalk(id) => self
                    .store
                    .split_sidewalk(id, &points)
                    .map(|pieces| pieces.len()),
                Target::Crossing(id) => self
                    .store
                    .split_crossing(id, &points)
                    .map(|pieces| pieces.len()),
            };
            let Some(pieces) = self.policy.absorb(outcome, &target)? else {
                continue;
            };
            if pieces < 2 {
                continue;
            }
            match target {
                Target::Pedestrian(_) => stats.pedestrian_roads += 1,
                Target::Sidewalk(_) => stats.sidewalks += 1,
                Target::Crossing(_) => stats.crossings += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Side, distance, endpoint};
    use crate::model::{
        Crossing, CrossingKind, CrossingStem, CrossingType, RoadSegment, Sidewalk,
    };
    use crate::test_utils::m;

    fn segment(class: &str, coords: Vec<Coord<f64>>) -> RoadSegment {
        RoadSegment::new("", class, LineString::new(coords)).unwrap()
    }

    fn store_with_sidewalk() -> TopologyStore {
        let mut store = TopologyStore::new();
        store.insert_sidewalk(Sidewalk {
            id: SidewalkId::new(1, 2, Side::Left),
            segment: segment("residential", vec![m(0.0, 3.0), m(100.0, 3.0)]),
            source: 10,
        });
        store
    }

    fn footway(source: u64, coords: Vec<Coord<f64>>) -> PedestrianRoad {
        PedestrianRoad {
            id: PedestrianId::new(source),
            segment: segment("footway", coords),
        }
    }

    #[test]
    fn test_single_intersection_splits_both() {
        let mut store = store_with_sidewalk();
        store.insert_pedestrian_road(footway(7, vec![m(50.0, -20.0), m(50.0, 20.0)]));

        let stats = Reconciler::new(&mut store, &NetworkConfig::default())
            .run()
            .unwrap();
        assert_eq!(
            stats,
            ReconcileStats {
                pedestrian_roads: 1,
                sidewalks: 1,
                crossings: 0
            }
        );

        let paths: Vec<String> = store.pedestrian_roads().map(|r| r.id.to_string()).collect();
        assert_eq!(paths, vec!["701", "702"]);
        let sidewalks: Vec<String> = store.sidewalks().map(|s| s.id.to_string()).collect();
        assert_eq!(sidewalks, vec!["000001000002001", "000001000002002"]);

        for road in store.pedestrian_roads() {
            let line = road.segment.geometry();
            let touches = [endpoint(line, false), endpoint(line, true)]
                .into_iter()
                .flatten()
                .any(|c| distance(c, m(50.0, 3.0)) < 1e-3);
            assert!(touches);
        }
    }

    #[test]
    fn test_several_partners_cut_once() {
        let mut store = store_with_sidewalk();
        store.insert_pedestrian_road(footway(7, vec![m(30.0, -20.0), m(30.0, 20.0)]));
        store.insert_pedestrian_road(footway(8, vec![m(70.0, -20.0), m(70.0, 20.0)]));

        let stats = Reconciler::new(&mut store, &NetworkConfig::default())
            .run()
            .unwrap();
        assert_eq!(stats.sidewalks, 1);
        assert_eq!(stats.pedestrian_roads, 2);
        assert_eq!(store.sidewalk_count(), 3);
        assert_eq!(store.pedestrian_road_count(), 4);
        let envelope = geo::Rect::new(m(0.0, 0.0), m(100.0, 5.0));
        assert_eq!(store.sidewalks_near(envelope).count(), 3);
    }

    #[test]
    fn test_endpoint_contact_keeps_entity() {
        let mut store = store_with_sidewalk();
        store.insert_pedestrian_road(footway(7, vec![m(100.0, 3.0), m(100.0, 40.0)]));

        let stats = Reconciler::new(&mut store, &NetworkConfig::default())
            .run()
            .unwrap();
        assert_eq!(stats, ReconcileStats::default());
        assert!(store.sidewalk(SidewalkId::new(1, 2, Side::Left)).is_some());
        assert!(store.pedestrian_road(PedestrianId::new(7)).is_some());
    }

    #[test]
    fn test_crossings_are_cut() {
        let mut store = TopologyStore::new();
        let stem = CrossingStem {
            owner: SidewalkId::new(1, 2, Side::Left).stem,
            kind: CrossingKind::Regular,
        };
        store.insert_crossing(Crossing {
            id: CrossingId { stem, split: 0 },
            segment: segment("residential", vec![m(50.0, 3.0), m(50.0, -3.0)]),
            crossing_type: CrossingType::Frequent,
        });
        store.insert_pedestrian_road(footway(7, vec![m(0.0, 0.0), m(100.0, 0.0)]));

        let stats = Reconciler::new(&mut store, &NetworkConfig::default())
            .run()
            .unwrap();
        assert_eq!(stats.crossings, 1);
        assert_eq!(store.crossing_count(), 2);
        let splits: Vec<u8> = store.crossings().map(|c| c.id.split).collect();
        assert_eq!(splits, vec![1, 2]);
    }
}
