//! Crossing construction.
//!
//! Official crossings link the two sidewalks at a tagged crossing node.
//! Regular crossings link a sidewalk with its companion on the other side of
//! the road at fixed intervals.

use std::collections::BTreeMap;

use geo::{Coord, LineString};
use hashbrown::HashSet;
use log::{debug, info, warn};

use crate::geometry::{endpoint, sample_along};
use crate::loading::{CrossingConfig, ErrorPolicy, NetworkConfig};
use crate::model::{
    Crossing, CrossingId, CrossingKind, CrossingStem, CrossingType, IdStem, RoadSegment,
    SidewalkId,
};
use crate::topology::{Stub, TopologyStore};
use crate::{Error, NodeId};

pub struct CrossingBuilder<'a> {
    store: &'a mut TopologyStore,
    config: &'a CrossingConfig,
    policy: ErrorPolicy,
}

impl<'a> CrossingBuilder<'a> {
    pub fn new(store: &'a mut TopologyStore, config: &'a NetworkConfig) -> Self {
        CrossingBuilder {
            store,
            config: &config.crossings,
            policy: config.error_policy,
        }
    }

    /// Builds one crossing at every tagged crossing node lying between
    /// exactly two edges.
    ///
    /// Must run after the sidewalks are stitched and before any sidewalk is
    /// split, since stubs are resolved through the edge memo.
    ///
    /// # Errors
    ///
    /// Fails on broken topology, and under fail fast on the first malformed
    /// crossing.
    pub fn build_official(&mut self) -> Result<usize, Error> {
        // crossing flags are stored on the adjacency entries pointing at the node
        let mut tagged: BTreeMap<NodeId, CrossingType> = BTreeMap::new();
        for node in self.store.nodes() {
            for entry in self.store.neighbours(node) {
                if let Some(subtype) = &entry.neighbour_crossing {
                    tagged
                        .entry(entry.neighbour)
                        .or_insert_with(|| subtype.clone());
                }
            }
        }

        let mut built = 0;
        for (node, subtype) in tagged {
            let degree = self.store.neighbours(node).len();
            if degree != 2 {
                debug!("Crossing node {node} joins {degree} edges, skipping");
                continue;
            }
            let stubs = self.store.stubs_at(node)?;
            let (Some(left), Some(right)) = (stubs[0], stubs[1]) else {
                debug!("Crossing node {node} lacks a sidewalk on one side, skipping");
                continue;
            };

            let outcome = self.link_stubs(left, right, subtype);
            if let Some(Some(_)) = self
                .policy
                .absorb(outcome, format_args!("official crossing at node {node}"))?
            {
                built += 1;
            }
        }

        info!("Built {built} official crossings");
        Ok(built)
    }

    fn link_stubs(
        &mut self,
        left: Stub,
        right: Stub,
        subtype: CrossingType,
    ) -> Result<Option<CrossingId>, Error> {
        let near_end = |store: &TopologyStore, stub: Stub| -> Result<Coord<f64>, Error> {
            let line = store.require_sidewalk(stub.id)?.segment.geometry();
            endpoint(line, stub.reversed)
                .ok_or_else(|| Error::Topology(format!("Sidewalk {} is empty", stub.id)))
        };
        let start = near_end(&*self.store, left)?;
        let end = near_end(&*self.store, right)?;
        self.create_crossing(left.id, start, end, CrossingKind::Official, subtype)
    }

    /// Links every sidewalk with its companion on the other side of the road
    /// at regular intervals.
    ///
    /// # Errors
    ///
    /// Fails on broken topology, and under fail fast on the first sidewalk
    /// pair that cannot be linked.
    pub fn build_regular(&mut self) -> Result<usize, Error> {
        let mut covered: HashSet<SidewalkId> = HashSet::new();
        let mut built = 0;

        for id in self.store.sidewalk_ids() {
            if !covered.insert(id) {
                continue;
            }
            let neighbour_id = id.neighbour_id();
            covered.insert(neighbour_id);

            let (Some(sidewalk), Some(neighbour)) =
                (self.store.sidewalk(id), self.store.sidewalk(neighbour_id))
            else {
                continue;
            };

            let own = sample_along(
                sidewalk.segment.geometry(),
                self.config.spacing_m,
                self.config.min_span_m,
            );
            let other = sample_along(
                neighbour.segment.geometry(),
                self.config.spacing_m,
                self.config.min_span_m,
            );
            let wanted = own.len().min(other.len());
            let count = wanted.min(self.capacity(id, neighbour_id));
            if count < wanted {
                warn!(
                    "Sidewalk {id} has split indices left for {count} of {wanted} regular crossings"
                );
            }
            if count == 0 {
                continue;
            }
            let crossing_type = if self.config.is_risk_class(&sidewalk.segment.class) {
                CrossingType::Risk
            } else {
                CrossingType::Frequent
            };

            let outcome = self.link_samples(
                id,
                neighbour_id,
                &own[..count],
                &other[..count],
                &crossing_type,
            );
            if let Some(linked) = self
                .policy
                .absorb(outcome, format_args!("regular crossings of sidewalk {id}"))?
            {
                built += linked;
            }
        }

        info!("Built {built} regular crossings");
        Ok(built)
    }

    /// Regular crossings that fit the split indices still free for `id`,
    /// its neighbour and their crossings.
    fn capacity(&self, id: SidewalkId, neighbour_id: SidewalkId) -> usize {
        let crossings = self.store.remaining_splits(IdStem::Crossing(CrossingStem {
            owner: id.stem,
            kind: CrossingKind::Regular,
        }));
        if !self.config.split_sidewalks {
            return crossings;
        }
        // n cuts leave n + 1 pieces
        [id, neighbour_id]
            .into_iter()
            .map(|sidewalk| {
                self.store
                    .remaining_splits(IdStem::Sidewalk(sidewalk.stem))
                    .saturating_sub(1)
            })
            .fold(crossings, usize::min)
    }

    fn link_samples(
        &mut self,
        id: SidewalkId,
        neighbour_id: SidewalkId,
        own: &[Coord<f64>],
        other: &[Coord<f64>],
        crossing_type: &CrossingType,
    ) -> Result<usize, Error> {
        let mut linked = 0;
        for (start, end) in own.iter().zip(other) {
            if self
                .create_crossing(id, *start, *end, CrossingKind::Regular, crossing_type.clone())?
                .is_some()
            {
                linked += 1;
            }
        }

        if self.config.split_sidewalks {
            self.store.split_sidewalk(id, own)?;
            self.store.split_sidewalk(neighbour_id, other)?;
        }
        Ok(linked)
    }

    /// Stores a straight crossing from `start` to `end` owned by `owner`.
    ///
    /// Zero-length links are skipped and yield `None`.
    fn create_crossing(
        &mut self,
        owner: SidewalkId,
        start: Coord<f64>,
        end: Coord<f64>,
        kind: CrossingKind,
        crossing_type: CrossingType,
    ) -> Result<Option<CrossingId>, Error> {
        if start == end {
            debug!("Skipping zero-length crossing owned by {owner}");
            return Ok(None);
        }

        let sidewalk = self.store.require_sidewalk(owner)?;
        let segment = RoadSegment::new(
            sidewalk.segment.name.as_str(),
            sidewalk.segment.class.as_str(),
            LineString::new(vec![start, end]),
        )?;

        let stem = CrossingStem {
            owner: owner.stem,
            kind,
        };
        if self.store.remaining_splits(IdStem::Crossing(stem)) == 0 {
            warn!("No crossing ids left under {stem}, skipping crossing owned by {owner}");
            return Ok(None);
        }
        let split = self.store.allocate_split(IdStem::Crossing(stem))?;
        let id = CrossingId { stem, split };
        self.store.insert_crossing(Crossing {
            id,
            segment,
            crossing_type,
        });
        Ok(Some(id))
    }
}
