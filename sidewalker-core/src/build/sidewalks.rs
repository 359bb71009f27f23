//! Sidewalk construction.
//!
//! Every node is visited once. For each incident edge the left and right
//! stub are built, or reused from the edge memo when the far end was
//! visited first. Stubs of neighbouring edges are then stitched into
//! continuous corners.

use geo::{Coord, LineString};
use itertools::Itertools;
use log::{debug, info};

use crate::geometry::{
    Side, TurnKind, distance, endpoint, insert_endpoint, intersections, midpoint,
    outward_segment, parallel_line, set_endpoint, split_at, turn_angle,
};
use crate::loading::{ErrorPolicy, NetworkConfig};
use crate::model::{RoadSegment, Sidewalk, SidewalkId};
use crate::topology::{AdjacencyEntry, ConnectionMemo, Stub, TopologyStore};
use crate::{Error, NodeId};

pub struct SidewalkBuilder<'a> {
    store: &'a mut TopologyStore,
    standoff_m: f64,
    policy: ErrorPolicy,
}

/// Part of `line` beyond `point`, seen from its near end.
fn far_part(line: &LineString<f64>, point: Coord<f64>, near_at_end: bool) -> Option<LineString<f64>> {
    match split_at(line, point) {
        Ok((prefix, suffix)) => Some(if near_at_end { prefix } else { suffix }),
        Err(e) => {
            debug!("Cannot truncate stub: {e}");
            None
        }
    }
}

impl<'a> SidewalkBuilder<'a> {
    pub fn new(store: &'a mut TopologyStore, config: &NetworkConfig) -> Self {
        SidewalkBuilder {
            store,
            standoff_m: config.standoff_m,
            policy: config.error_policy,
        }
    }

    /// Builds and stitches the sidewalks around every node, returning the
    /// number of sidewalks built.
    ///
    /// # Errors
    ///
    /// Fails on broken topology, and under fail fast on the first malformed
    /// sidewalk.
    pub fn build(&mut self) -> Result<usize, Error> {
        let before = self.store.sidewalk_count();
        for node in self.store.nodes() {
            self.build_stubs(node)?;
            let stubs = self.store.stubs_at(node)?;
            self.connect_stubs(&stubs)?;
        }

        let built = self.store.sidewalk_count() - before;
        info!(
            "Built {built} sidewalks along {} edges",
            self.store.edge_count()
        );
        Ok(built)
    }

    /// Makes sure every incident edge of `node` has its memo.
    fn build_stubs(&mut self, node: NodeId) -> Result<(), Error> {
        let entries = self.store.neighbours(node).to_vec();
        for entry in entries {
            if self.store.memo_for(entry.edge).is_none() {
                let memo = self.build_edge(node, &entry)?;
                self.store.remember_memo(entry.edge, memo);
            }
        }
        Ok(())
    }

    /// Builds the sidewalks of the edge `node -> entry.neighbour`, sides
    /// relative to that direction.
    fn build_edge(
        &mut self,
        node: NodeId,
        entry: &AdjacencyEntry,
    ) -> Result<ConnectionMemo, Error> {
        let road = self.store.vehicle_road(entry.road)?;
        let placement = road.placement;
        let source = road.source();
        let (name, class) = (road.segment.name.clone(), road.segment.class.clone());
        let from = self.store.location_of(node)?;
        let to = self.store.location_of(entry.neighbour)?;

        let mut memo = ConnectionMemo {
            origin: node,
            left: None,
            right: None,
        };
        for side in [Side::Left, Side::Right] {
            if !placement.has_side(side, entry.forward) {
                continue;
            }
            let id = SidewalkId::new(node, entry.neighbour, side);
            let sidewalk = RoadSegment::new(
                name.as_str(),
                class.as_str(),
                parallel_line(from, to, self.standoff_m, side),
            )
            .map(|segment| Sidewalk {
                id,
                segment,
                source,
            })
            .map_err(Error::from);

            if let Some(sidewalk) = self
                .policy
                .absorb(sidewalk, format_args!("sidewalk {id}"))?
            {
                self.store.insert_sidewalk(sidewalk);
                match side {
                    Side::Left => memo.left = Some(id),
                    Side::Right => memo.right = Some(id),
                }
            }
        }
        Ok(memo)
    }

    fn connect_stubs(&mut self, stubs: &[Option<Stub>]) -> Result<(), Error> {
        if stubs.len() == 2 {
            if let (Some(left), Some(right)) = (stubs[0], stubs[1]) {
                self.connect_ends(left, right)?;
            }
            return Ok(());
        }

        // right stub of each edge meets the left stub of the next edge clockwise
        for (current, next) in stubs.chunks_exact(2).circular_tuple_windows() {
            if let (Some(right), Some(left)) = (current[1], next[0]) {
                self.connect_segments(right, left)?;
            }
        }
        Ok(())
    }

    fn geometry(&self, stub: Stub) -> Result<LineString<f64>, Error> {
        Ok(self
            .store
            .require_sidewalk(stub.id)?
            .segment
            .geometry()
            .clone())
    }

    /// Stitches two stubs meeting at a junction, `first` preceding `second`
    /// in clockwise order.
    fn connect_segments(&mut self, first: Stub, second: Stub) -> Result<(), Error> {
        let first_line = self.geometry(first)?;
        let second_line = self.geometry(second)?;
        let (Some(first_out), Some(second_out)) = (
            outward_segment(&first_line, first.reversed),
            outward_segment(&second_line, second.reversed),
        ) else {
            debug!(
                "Leaving zero-length stub between {} and {} unstitched",
                first.id, second.id
            );
            return Ok(());
        };

        let angle = turn_angle(first_out, second_out);
        match TurnKind::classify(angle) {
            TurnKind::Convex => {
                let corner = second_out.start;
                self.store.update_sidewalk(first.id, |line| {
                    insert_endpoint(line, corner, first.reversed);
                })
            }
            TurnKind::Concave | TurnKind::Straight => {
                let near = first_out.start;
                let meeting = intersections(&first_line, &second_line)
                    .points()
                    .iter()
                    .copied()
                    .min_by(|a, b| distance(*a, near).total_cmp(&distance(*b, near)));

                if let Some(point) = meeting
                    && let Some(first_part) = far_part(&first_line, point, first.reversed)
                    && let Some(second_part) = far_part(&second_line, point, second.reversed)
                {
                    self.store
                        .update_sidewalk(first.id, |line| *line = first_part)?;
                    self.store
                        .update_sidewalk(second.id, |line| *line = second_part)
                } else {
                    self.meet_at_midpoint(first, first_out.start, second, second_out.start)
                }
            }
            TurnKind::Degenerate => {
                debug!(
                    "Degenerate corner between {} and {} ({angle:.2} degrees)",
                    first.id, second.id
                );
                self.meet_at_midpoint(first, first_out.start, second, second_out.start)
            }
        }
    }

    fn meet_at_midpoint(
        &mut self,
        first: Stub,
        first_near: Coord<f64>,
        second: Stub,
        second_near: Coord<f64>,
    ) -> Result<(), Error> {
        let middle = midpoint(first_near, second_near);
        self.store
            .update_sidewalk(first.id, |line| set_endpoint(line, middle, first.reversed))?;
        self.store
            .update_sidewalk(second.id, |line| set_endpoint(line, middle, second.reversed))
    }

    /// Caps a dead end by carrying the left stub around to the right one.
    fn connect_ends(&mut self, left: Stub, right: Stub) -> Result<(), Error> {
        let right_line = self.geometry(right)?;
        let Some(corner) = endpoint(&right_line, right.reversed) else {
            return Ok(());
        };
        self.store
            .update_sidewalk(left.id, |line| insert_endpoint(line, corner, left.reversed))
    }
}
