//! Duplicate sidewalk detection ("contrast").
//!
//! Pedestrian paths are sampled into short probes perpendicular to the path.
//! A constructed sidewalk crossed by enough near-perpendicular probes runs
//! alongside an already mapped path and is removed.
//!
//! Runs in three passes:
//! 1. probes are sampled from every pedestrian road and indexed,
//! 2. every sidewalk counts the probes it crosses, each probe remembering the
//!    closest sidewalk distance seen,
//! 3. candidates are recounted with only the probes they are nearest to.

use geo::{BoundingRect, Coord, Line, LineString, Rect};
use log::{info, trace};
use rayon::prelude::*;

use crate::geometry::{
    crossing_angle, distance, distance_to_line, orthogonal_line, segmentize,
};
use crate::loading::{ContrastConfig, NetworkConfig};
use crate::model::{DuplicateReport, PedestrianRoad, Sidewalk, SidewalkId};
use crate::topology::TopologyStore;

/// Perpendicular test segment sampled from a pedestrian path
#[derive(Debug, Clone)]
struct Probe {
    line: Line<f64>,
    midpoint: Coord<f64>,
    /// Closest sidewalk distance seen in the candidate pass
    closest_m: f64,
}

impl Probe {
    fn new(at: Coord<f64>, towards: Coord<f64>, half_length_m: f64) -> Self {
        Probe {
            line: orthogonal_line(at, towards, half_length_m),
            midpoint: at,
            closest_m: f64::INFINITY,
        }
    }

    fn envelope(&self) -> Rect<f64> {
        Rect::new(self.line.start, self.line.end)
    }
}

fn probes_along(line: &LineString<f64>, config: &ContrastConfig) -> Vec<Probe> {
    line.lines()
        .filter(|segment| distance(segment.start, segment.end) >= config.min_span_m)
        .flat_map(|segment| {
            segmentize(segment.start, segment.end, config.sample_step_m)
                .into_iter()
                .map(move |at| Probe::new(at, segment.end, config.probe_half_length_m))
        })
        .collect()
}

pub struct DuplicateDetector<'a> {
    store: &'a mut TopologyStore,
    config: &'a ContrastConfig,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(store: &'a mut TopologyStore, config: &'a NetworkConfig) -> Self {
        DuplicateDetector {
            store,
            config: &config.contrast,
        }
    }

    /// Removes every sidewalk duplicating a pedestrian road and reports it.
    pub fn run(self) -> Vec<DuplicateReport> {
        let mut probes = self.sample_probes();
        self.store.index_probes(
            probes
                .iter()
                .enumerate()
                .map(|(idx, probe)| (idx, probe.envelope())),
        );
        info!("Sampled {} duplicate probes", probes.len());

        let candidates = self.find_candidates(&mut probes);
        info!("Found {} duplicate candidates", candidates.len());

        let reports = self.confirm(&probes, &candidates);
        self.store.clear_probe_index();
        for report in &reports {
            self.store.remove_sidewalk(report.sidewalk);
        }

        let removed_km: f64 = reports.iter().map(|r| r.length_km).sum();
        info!(
            "Removed {} duplicate sidewalks ({removed_km:.3} km)",
            reports.len()
        );
        reports
    }

    fn sample_probes(&self) -> Vec<Probe> {
        let roads: Vec<&PedestrianRoad> = self.store.pedestrian_roads().collect();
        let config = self.config;
        roads
            .par_iter()
            .flat_map_iter(|road| probes_along(road.segment.geometry(), config))
            .collect()
    }

    fn is_perpendicular(&self, probe: &Probe, geometry: &LineString<f64>) -> bool {
        crossing_angle(geometry, probe.line)
            .is_some_and(|angle| (angle - 90.0).abs() <= self.config.orientation_tolerance_deg)
    }

    /// Matched probes over the number of probes a path of the sidewalk's
    /// length would carry.
    #[allow(clippy::cast_precision_loss)]
    fn ratio(&self, matched: usize, sidewalk: &Sidewalk) -> f64 {
        let expected = sidewalk.segment.length_km() * 1000.0 / self.config.sample_step_m;
        if expected <= 0.0 {
            return 0.0;
        }
        matched as f64 / expected
    }

    fn find_candidates(&self, probes: &mut [Probe]) -> Vec<SidewalkId> {
        let mut candidates = Vec::new();
        for sidewalk in self.store.sidewalks() {
            let geometry = sidewalk.segment.geometry();
            let Some(envelope) = geometry.bounding_rect() else {
                continue;
            };

            let mut matched = 0;
            for &idx in self.store.probes_near(envelope) {
                let probe = &mut probes[idx];
                if !self.is_perpendicular(probe, geometry) {
                    continue;
                }
                let distance_m = distance_to_line(probe.midpoint, geometry);
                probe.closest_m = probe.closest_m.min(distance_m);
                matched += 1;
            }

            let ratio = self.ratio(matched, sidewalk);
            trace!("Sidewalk {} matched {matched} probes, ratio {ratio:.3}", sidewalk.id);
            if ratio > self.config.threshold {
                candidates.push(sidewalk.id);
            }
        }
        candidates
    }

    fn confirm(&self, probes: &[Probe], candidates: &[SidewalkId]) -> Vec<DuplicateReport> {
        candidates
            .iter()
            .filter_map(|&id| {
                let sidewalk = self.store.sidewalk(id)?;
                let geometry = sidewalk.segment.geometry();
                let envelope = geometry.bounding_rect()?;

                let matched = self
                    .store
                    .probes_near(envelope)
                    .map(|&idx| &probes[idx])
                    .filter(|probe| self.is_perpendicular(probe, geometry))
                    .filter(|probe| {
                        let distance_m = distance_to_line(probe.midpoint, geometry);
                        (distance_m - probe.closest_m).abs() <= self.config.nearest_tolerance_m
                    })
                    .count();

                let ratio = self.ratio(matched, sidewalk);
                (ratio > self.config.threshold).then(|| DuplicateReport {
                    sidewalk: id,
                    length_km: sidewalk.segment.length_km(),
                    ratio,
                })
            })
            .collect()
    }
}
