use geo::LineString;
use serde::Serialize;

use super::ids::{CrossingKind, SidewalkId};
use super::roads::{Crossing, PedestrianRoad, Sidewalk};
use crate::algo::ReconcileStats;
use crate::geometry::merge_lines;
use crate::topology::TopologyStore;

/// Sidewalk removed for duplicating a mapped pedestrian road
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub sidewalk: SidewalkId,
    pub length_km: f64,
    pub ratio: f64,
}

/// Entity counts and total lengths of a finished network
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub pedestrian_roads: usize,
    pub pedestrian_km: f64,
    pub sidewalks: usize,
    pub sidewalk_km: f64,
    /// Sidewalk lines after chaining pieces through their shared ends
    pub merged_sidewalks: usize,
    pub official_crossings: usize,
    pub regular_crossings: usize,
    pub crossing_km: f64,
    pub duplicates_removed: usize,
    pub duplicate_km: f64,
    pub reconciled: ReconcileStats,
}

/// Result of a pipeline run: the final pedestrian roads, sidewalks and
/// crossings together with the duplicates removed on the way.
#[derive(Debug, Default)]
pub struct PedestrianNetwork {
    store: TopologyStore,
    duplicates: Vec<DuplicateReport>,
    reconciled: ReconcileStats,
}

impl PedestrianNetwork {
    pub(crate) fn new(
        store: TopologyStore,
        duplicates: Vec<DuplicateReport>,
        reconciled: ReconcileStats,
    ) -> Self {
        PedestrianNetwork {
            store,
            duplicates,
            reconciled,
        }
    }

    pub fn store(&self) -> &TopologyStore {
        &self.store
    }

    pub fn pedestrian_roads(&self) -> impl Iterator<Item = &PedestrianRoad> {
        self.store.pedestrian_roads()
    }

    pub fn sidewalks(&self) -> impl Iterator<Item = &Sidewalk> {
        self.store.sidewalks()
    }

    pub fn crossings(&self) -> impl Iterator<Item = &Crossing> {
        self.store.crossings()
    }

    pub fn duplicates(&self) -> &[DuplicateReport] {
        &self.duplicates
    }

    /// Entities split during reconciliation
    pub fn reconciled(&self) -> ReconcileStats {
        self.reconciled
    }

    pub fn is_empty(&self) -> bool {
        self.store.pedestrian_road_count() == 0
            && self.store.sidewalk_count() == 0
            && self.store.crossing_count() == 0
    }

    pub fn stats(&self) -> NetworkStats {
        let (official, regular): (Vec<&Crossing>, Vec<&Crossing>) = self
            .crossings()
            .partition(|crossing| crossing.kind() == CrossingKind::Official);

        NetworkStats {
            pedestrian_roads: self.store.pedestrian_road_count(),
            pedestrian_km: self
                .pedestrian_roads()
                .map(|road| road.segment.length_km())
                .sum(),
            sidewalks: self.store.sidewalk_count(),
            sidewalk_km: self
                .sidewalks()
                .map(|sidewalk| sidewalk.segment.length_km())
                .sum(),
            merged_sidewalks: self.merged_sidewalks().len(),
            official_crossings: official.len(),
            regular_crossings: regular.len(),
            crossing_km: self
                .crossings()
                .map(|crossing| crossing.segment.length_km())
                .sum(),
            duplicates_removed: self.duplicates.len(),
            duplicate_km: self.duplicates.iter().map(|d| d.length_km).sum(),
            reconciled: self.reconciled,
        }
    }

    /// Sidewalks chained into maximal polylines through their shared ends.
    pub fn merged_sidewalks(&self) -> Vec<LineString<f64>> {
        let lines: Vec<LineString<f64>> = self
            .sidewalks()
            .map(|sidewalk| sidewalk.segment.geometry().clone())
            .collect();
        merge_lines(&lines)
    }

    /// Drops every collection once the network has been persisted.
    pub fn release(self) {
        drop(self);

        // Building the network leaves many small freed allocations behind
        // that glibc keeps in the heap. Hand them back to the OS.
        //
        // # Safety
        //
        // `malloc_trim` only exists in glibc, which the cfg attribute checks
        // at compile time.
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        unsafe {
            if libc::malloc_trim(0) == 0 {
                log::warn!("Memory trimming failed - continuing anyway");
            } else {
                log::debug!("Successfully trimmed unused heap memory");
            }
        }
    }
}
