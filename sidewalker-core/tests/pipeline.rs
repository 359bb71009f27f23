mod common;

use std::collections::HashMap;

use common::{add_road, m};
use geo::LineString;
use sidewalker_core::geometry::{Side, distance, join, split_at};
use sidewalker_core::prelude::*;

fn sidewalks_only() -> NetworkConfig {
    let mut config = NetworkConfig {
        detect_duplicates: false,
        reconcile: false,
        ..NetworkConfig::default()
    };
    config.crossings.split_sidewalks = false;
    config
}

/// Centre 1 with a road running west to east through it and a second road
/// leaving north.
fn t_junction() -> RawNetwork {
    let mut raw = RawNetwork::new();
    add_road(
        &mut raw,
        10,
        "residential",
        SidewalkPlacement::Both,
        &[(4, -100.0, 15.0), (1, 0.0, 0.0), (2, 100.0, 0.0)],
    );
    add_road(
        &mut raw,
        11,
        "residential",
        SidewalkPlacement::Both,
        &[(1, 0.0, 0.0), (3, 0.0, 100.0)],
    );
    raw
}

fn stitched(raw: RawNetwork) -> TopologyStore {
    let config = sidewalks_only();
    let mut store = TopologyStore::from_raw(raw, config.error_policy).unwrap();
    SidewalkBuilder::new(&mut store, &config).build().unwrap();
    store
}

fn first_coord(store: &TopologyStore, from: u64, to: u64, side: Side) -> geo::Coord<f64> {
    store
        .sidewalk(SidewalkId::new(from, to, side))
        .unwrap()
        .segment
        .geometry()
        .0[0]
}

#[test]
fn t_junction_corners() {
    let store = stitched(t_junction());
    assert_eq!(store.sidewalk_count(), 6);

    // outer side carries the corner vertex of the western sidewalk
    assert_eq!(
        first_coord(&store, 1, 2, Side::Right),
        first_coord(&store, 1, 4, Side::Left)
    );
    let outer = store
        .sidewalk(SidewalkId::new(1, 2, Side::Right))
        .unwrap()
        .segment
        .geometry();
    assert!(distance(outer.0[1], m(0.0, -3.0)) < 1e-3);

    // inner side is cut back to the meeting point of both stubs
    let meeting = first_coord(&store, 1, 3, Side::Right);
    assert_eq!(meeting, first_coord(&store, 1, 2, Side::Left));
    assert!(distance(meeting, m(3.0, 3.0)) < 1e-3);
    assert!((distance(meeting, m(0.0, 0.0)) - 18.0_f64.sqrt()).abs() < 1e-2);
}

#[test]
fn one_sidewalk_per_side_and_edge() {
    // node ids deliberately out of spatial order
    let ids = [5, 9, 1, 7, 3, 8, 2, 6, 4];
    let at = |row: usize, col: usize| {
        let node = ids[row * 3 + col];
        (node, col as f64 * 100.0, row as f64 * 100.0)
    };

    let mut raw = RawNetwork::new();
    for row in 0..3 {
        add_road(
            &mut raw,
            100 + row as u64,
            "residential",
            SidewalkPlacement::Both,
            &[at(row, 0), at(row, 1), at(row, 2)],
        );
    }
    for col in 0..3 {
        add_road(
            &mut raw,
            200 + col as u64,
            "residential",
            SidewalkPlacement::Both,
            &[at(0, col), at(1, col), at(2, col)],
        );
    }

    let store = stitched(raw);
    assert_eq!(store.edge_count(), 12);
    assert_eq!(store.sidewalk_count(), 24);

    let mut sides: HashMap<(u64, u64), Vec<Side>> = HashMap::new();
    for sidewalk in store.sidewalks() {
        let stem = sidewalk.id.stem;
        let pair = (stem.from.min(stem.to), stem.from.max(stem.to));
        sides.entry(pair).or_default().push(stem.side);
    }
    assert_eq!(sides.len(), 12);
    for (pair, found) in sides {
        assert_eq!(found.len(), 2, "edge {pair:?}");
        assert_ne!(found[0], found[1], "edge {pair:?}");
    }

    // centre node: four edges in clockwise order
    let centre = ids[4];
    let bearings: Vec<f64> = store
        .neighbours(centre)
        .iter()
        .map(|entry| entry.bearing)
        .collect();
    assert_eq!(bearings.len(), 4);
    assert!(bearings.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn neighbour_of_neighbour_is_identity() {
    let store = stitched(t_junction());
    for sidewalk in store.sidewalks() {
        assert_eq!(sidewalk.id.neighbour_id().neighbour_id(), sidewalk.id);
        assert_ne!(sidewalk.id.neighbour_id(), sidewalk.id);
    }

    let wide = SidewalkId::new(123_456_789, 42, Side::Right);
    let text = wide.to_string();
    assert_eq!(text.parse::<SidewalkId>().unwrap(), wide);
    assert_eq!(wide.neighbour_id().neighbour_id(), wide);
}

#[test]
fn split_then_join_restores_line() {
    let line = LineString::new(vec![m(0.0, 0.0), m(50.0, 0.0), m(50.0, 50.0)]);

    let (prefix, suffix) = split_at(&line, m(50.0, 0.0)).unwrap();
    assert_eq!(join(&prefix, &suffix), line);

    let (prefix, suffix) = split_at(&line, m(50.0, 20.0)).unwrap();
    let rejoined = join(&prefix, &suffix);
    assert_eq!(rejoined.0.len(), 4);
    assert_eq!(rejoined.0[0], line.0[0]);
    assert_eq!(rejoined.0[1], line.0[1]);
    assert_eq!(rejoined.0[3], line.0[2]);
}

fn road_with_path(path_y: f64) -> RawNetwork {
    let mut raw = RawNetwork::new();
    add_road(
        &mut raw,
        10,
        "residential",
        SidewalkPlacement::Both,
        &[(1, 0.0, 0.0), (2, 200.0, 0.0)],
    );
    raw.add_pedestrian_path(20, "", "footway", vec![m(0.0, path_y), m(200.0, path_y)])
        .unwrap();
    raw
}

#[test]
fn shadowed_sidewalk_is_removed() {
    let config = NetworkConfig {
        reconcile: false,
        ..NetworkConfig::default()
    };
    let network = create_pedestrian_network(road_with_path(5.0), &config).unwrap();

    // both sides shadow the path, only the nearer one is confirmed
    let duplicates = network.duplicates();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].sidewalk, SidewalkId::new(1, 2, Side::Left));
    assert!(duplicates[0].ratio > 0.9);
    assert!(
        network
            .sidewalks()
            .all(|sidewalk| sidewalk.id.stem.side == Side::Right)
    );
    assert_eq!(network.stats().regular_crossings, 0);
}

#[test]
fn distant_path_keeps_sidewalks() {
    let config = NetworkConfig {
        reconcile: false,
        ..NetworkConfig::default()
    };
    let network = create_pedestrian_network(road_with_path(20.0), &config).unwrap();
    assert!(network.duplicates().is_empty());
    assert!(network.stats().regular_crossings > 0);
}

#[test]
fn crossing_path_splits_into_distinct_children() {
    let mut raw = RawNetwork::new();
    add_road(
        &mut raw,
        10,
        "residential",
        SidewalkPlacement::Left,
        &[(1, 0.0, 0.0), (2, 200.0, 0.0)],
    );
    raw.add_pedestrian_path(20, "", "footway", vec![m(100.0, -1.0), m(100.0, 20.0)])
        .unwrap();

    let network = create_pedestrian_network(raw, &NetworkConfig::default()).unwrap();
    let parent_path = PedestrianId::new(20).to_string();
    let parent_sidewalk = SidewalkId::new(1, 2, Side::Left).to_string();

    let paths: Vec<String> = network.pedestrian_roads().map(|r| r.id.to_string()).collect();
    let sidewalks: Vec<String> = network.sidewalks().map(|s| s.id.to_string()).collect();
    assert_eq!(paths.len(), 2);
    assert_eq!(sidewalks.len(), 2);

    let mut all: Vec<&String> = paths.iter().chain(&sidewalks).collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 4);
    assert!(!paths.contains(&parent_path));
    assert!(!sidewalks.contains(&parent_sidewalk));

    let meeting = m(100.0, 3.0);
    for road in network.pedestrian_roads() {
        let line = road.segment.geometry();
        let ends = [line.0[0], line.0[line.0.len() - 1]];
        assert!(ends.iter().any(|end| distance(*end, meeting) < 1e-3));
    }
}

#[test]
fn geojson_input_to_output() {
    let input = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [0.002, 0.0]]},
                "properties": {"id": 10, "highway": "primary", "name": "Main", "nodes": [1, 2]}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [0.002, 0.0]},
                "properties": {"id": 2, "highway": "crossing", "crossing": "zebra"}
            }
        ]
    }"#;
    let geojson: geojson::GeoJson = input.parse().unwrap();
    let network =
        create_pedestrian_network_from_geojson(&geojson, &NetworkConfig::default()).unwrap();
    let stats = network.stats();
    assert!(stats.sidewalks >= 2);
    assert_eq!(stats.official_crossings, 0);

    let output = network.to_geojson().unwrap();
    assert_eq!(
        output.features.len(),
        stats.pedestrian_roads + stats.sidewalks + stats.official_crossings + stats.regular_crossings
    );
}

#[test]
fn long_road_runs_with_default_config() {
    let mut raw = RawNetwork::new();
    add_road(
        &mut raw,
        10,
        "residential",
        SidewalkPlacement::Both,
        &[(1, 0.0, 0.0), (2, 5200.0, 0.0)],
    );

    let network = create_pedestrian_network(raw, &NetworkConfig::default()).unwrap();
    let stats = network.stats();
    assert_eq!(stats.regular_crossings, 98);
    assert_eq!(stats.sidewalks, 198);
    assert!(network.crossings().all(|c| c.id.split <= 99));
}

#[test]
fn many_paths_across_a_long_road_run_with_default_config() {
    let mut raw = RawNetwork::new();
    add_road(
        &mut raw,
        10,
        "residential",
        SidewalkPlacement::Both,
        &[(1, 0.0, 0.0), (2, 2600.0, 0.0)],
    );
    // between the regular crossings, which sit every 50 m
    for k in 0..30_u32 {
        let x = 25.0 + 80.0 * f64::from(k);
        raw.add_pedestrian_path(100 + u64::from(k), "", "footway", vec![m(x, -20.0), m(x, 20.0)])
            .unwrap();
    }

    let network = create_pedestrian_network(raw, &NetworkConfig::default()).unwrap();
    let stats = network.stats();
    // every path meets both sidewalks
    assert_eq!(stats.pedestrian_roads, 90);
    assert_eq!(stats.reconciled.pedestrian_roads, 30);
    // the sidewalk stems run out of split indices before every meeting is cut
    assert!(stats.reconciled.sidewalks > 0);
    assert!(stats.reconciled.sidewalks < 60);
    assert!(network.sidewalks().all(|s| s.id.split <= 99));
}
