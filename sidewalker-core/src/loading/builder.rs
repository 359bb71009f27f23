use geo::{ConvexHull, Intersects, MultiPoint, Point};
use geojson::GeoJson;
use log::info;

use super::config::NetworkConfig;
use super::geojson::read_network_with_policy;
use super::raw::RawNetwork;
use crate::Error;
use crate::algo::{DuplicateDetector, ReconcileStats, Reconciler};
use crate::build::{CrossingBuilder, SidewalkBuilder};
use crate::model::PedestrianNetwork;
use crate::topology::TopologyStore;

/// Creates a pedestrian network from a classified street network
///
/// Stages run in order: topology, sidewalks, official crossings, duplicate
/// detection, regular crossings, reconciliation.
///
/// # Errors
///
/// Returns an error for an invalid configuration, broken topology, or under
/// fail fast the first malformed entity
pub fn create_pedestrian_network(
    raw: RawNetwork,
    config: &NetworkConfig,
) -> Result<PedestrianNetwork, Error> {
    config.validate()?;
    validate_coverage(&raw);

    info!(
        "Building topology from {} vehicle ways and {} pedestrian roads",
        raw.vehicle_ways.len(),
        raw.pedestrian_roads.len()
    );
    let mut store = TopologyStore::from_raw(raw, config.error_policy)?;
    info!(
        "Recorded {} edges between {} nodes",
        store.edge_count(),
        store.node_count()
    );

    SidewalkBuilder::new(&mut store, config).build()?;
    CrossingBuilder::new(&mut store, config).build_official()?;

    let duplicates = if config.detect_duplicates {
        DuplicateDetector::new(&mut store, config).run()
    } else {
        Vec::new()
    };

    CrossingBuilder::new(&mut store, config).build_regular()?;

    let reconciled = if config.reconcile {
        Reconciler::new(&mut store, config).run()?
    } else {
        store.index_sidewalks();
        store.index_crossings();
        ReconcileStats::default()
    };

    let network = PedestrianNetwork::new(store, duplicates, reconciled);
    let stats = network.stats();
    info!(
        "Pedestrian network created: {} pedestrian roads, {} sidewalks ({:.2} km), {} crossings",
        stats.pedestrian_roads,
        stats.sidewalks,
        stats.sidewalk_km,
        stats.official_crossings + stats.regular_crossings
    );
    Ok(network)
}

/// Reads a GeoJSON street network and creates its pedestrian network.
///
/// # Errors
///
/// Same as [`create_pedestrian_network`], plus malformed GeoJSON input
pub fn create_pedestrian_network_from_geojson(
    geojson: &GeoJson,
    config: &NetworkConfig,
) -> Result<PedestrianNetwork, Error> {
    config.validate()?;
    let raw = read_network_with_policy(geojson, config.error_policy)?;
    create_pedestrian_network(raw, config)
}

/// Warns about pedestrian roads lying entirely outside the vehicle network.
#[allow(clippy::cast_precision_loss)]
fn validate_coverage(raw: &RawNetwork) {
    if raw.vehicle_ways.is_empty() || raw.pedestrian_roads.is_empty() {
        return;
    }

    let nodes: MultiPoint = raw
        .vehicle_ways
        .iter()
        .flat_map(|way| way.road.segment.geometry().points())
        .collect::<Vec<Point<f64>>>()
        .into();
    let hull = nodes.convex_hull();

    let outside = raw
        .pedestrian_roads
        .iter()
        .filter(|road| !road.segment.geometry().intersects(&hull))
        .count();
    if outside > 0 {
        let total = raw.pedestrian_roads.len();
        let percentage = (outside as f64 / total as f64) * 100.0;
        log::warn!(
            "{outside} of {total} pedestrian roads ({percentage:.1}%) lie outside the vehicle \
        network coverage area. They are kept but will not meet any sidewalk."
        );
    }
}
