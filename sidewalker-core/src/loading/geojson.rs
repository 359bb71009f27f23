//! Ingestion of a classified street network from GeoJSON.
//!
//! LineString features are source ways carrying OSM style properties and the
//! ids of the nodes along their coordinates. Point features describe nodes,
//! of which only tagged crossings matter here.

use geo::{Coord, LineString};
use geojson::{Feature, GeoJson};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::config::ErrorPolicy;
use super::raw::RawNetwork;
use super::raw_types::{NodeProperties, WayProperties};
use super::tags;
use crate::model::ids::MAX_SPLIT_INDEX;
use crate::model::{PedestrianId, PedestrianRoad, RoadSegment, VehicleId, VehicleRoad};
use crate::{Error, NodeId, WayId};

struct PedestrianWay {
    source: WayId,
    name: String,
    class: String,
    coords: Vec<Coord<f64>>,
    nodes: Vec<NodeId>,
}

/// Parses GeoJSON text and reads the network from it.
///
/// # Errors
///
/// Fails on malformed GeoJSON or, under fail fast, on the first bad feature.
pub fn read_network_str(text: &str, policy: ErrorPolicy) -> Result<RawNetwork, Error> {
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|e| Error::GeoJsonError(e.to_string()))?;
    read_network_with_policy(&geojson, policy)
}

/// Reads a network, failing on the first malformed feature.
///
/// # Errors
///
/// Fails when the input is not a FeatureCollection or a feature is malformed.
pub fn read_network(geojson: &GeoJson) -> Result<RawNetwork, Error> {
    read_network_with_policy(geojson, ErrorPolicy::FailFast)
}

/// Reads a network, handling malformed features according to `policy`.
///
/// # Errors
///
/// Fails when the input is not a FeatureCollection, and under fail fast on
/// the first malformed feature.
pub fn read_network_with_policy(
    geojson: &GeoJson,
    policy: ErrorPolicy,
) -> Result<RawNetwork, Error> {
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(Error::InvalidData(
            "Expected a GeoJSON FeatureCollection".to_string(),
        ));
    };

    let mut raw = RawNetwork::new();
    let mut pedestrian_ways = Vec::new();
    for (position, feature) in collection.features.iter().enumerate() {
        let outcome = read_feature(feature, &mut raw, &mut pedestrian_ways);
        policy.absorb(outcome, format_args!("feature #{position}"))?;
    }

    split_pedestrian_ways(&mut raw, pedestrian_ways, policy)?;

    info!(
        "Read {} vehicle ways, {} pedestrian roads and {} crossing nodes",
        raw.vehicle_ways.len(),
        raw.pedestrian_roads.len(),
        raw.crossing_nodes.len()
    );
    Ok(raw)
}

fn properties<T: DeserializeOwned + Default>(feature: &Feature) -> Result<T, Error> {
    match &feature.properties {
        Some(map) => serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| Error::InvalidData(format!("Malformed feature properties: {e}"))),
        None => Ok(T::default()),
    }
}

fn read_feature(
    feature: &Feature,
    raw: &mut RawNetwork,
    pedestrian_ways: &mut Vec<PedestrianWay>,
) -> Result<(), Error> {
    let Some(geometry) = &feature.geometry else {
        return Ok(());
    };

    match geo::Geometry::<f64>::try_from(geometry.clone())
        .map_err(|e| Error::GeoJsonError(e.to_string()))?
    {
        geo::Geometry::LineString(line) => read_way(properties(feature)?, line, raw, pedestrian_ways),
        geo::Geometry::Point(point) => {
            read_node(&properties(feature)?, point.0, raw);
            Ok(())
        }
        _ => {
            debug!("Ignoring feature with unsupported geometry type");
            Ok(())
        }
    }
}

fn read_way(
    props: WayProperties,
    line: LineString<f64>,
    raw: &mut RawNetwork,
    pedestrian_ways: &mut Vec<PedestrianWay>,
) -> Result<(), Error> {
    let highway = props.highway.as_deref().unwrap_or_default();
    let area = props.area.as_deref();
    let vehicle = tags::is_vehicle(highway, area);
    let pedestrian = tags::is_pedestrian(highway, area, props.foot.as_deref());
    if !vehicle && !pedestrian {
        return Ok(());
    }

    let source = props
        .id
        .ok_or_else(|| Error::InvalidData(format!("{highway} way without an id")))?;
    if !props.nodes.is_empty() && props.nodes.len() != line.0.len() {
        return Err(Error::InvalidData(format!(
            "Way {source} has {} node ids for {} coordinates",
            props.nodes.len(),
            line.0.len()
        )));
    }
    for (node, coord) in props.nodes.iter().zip(&line.0) {
        raw.add_node(*node, *coord);
    }

    let name = props.name.clone().unwrap_or_default();
    if vehicle {
        if props.nodes.is_empty() {
            return Err(Error::InvalidData(format!(
                "Vehicle way {source} has no node ids"
            )));
        }
        let road = VehicleRoad {
            id: VehicleId { source, part: 0 },
            segment: RoadSegment::new(name, highway, line)?,
            placement: tags::sidewalk_placement(props.sidewalk.as_deref()),
            lanes: tags::parse_lanes(&props.lanes),
        };
        raw.add_vehicle_way(road, props.nodes);
    } else {
        pedestrian_ways.push(PedestrianWay {
            source,
            name,
            class: highway.to_string(),
            coords: line.0,
            nodes: props.nodes,
        });
    }
    Ok(())
}

fn read_node(props: &NodeProperties, location: Coord<f64>, raw: &mut RawNetwork) {
    let Some(id) = props.id else {
        return;
    };
    raw.add_node(id, location);
    if let Some(subtype) = tags::crossing_subtype(props.highway.as_deref(), props.crossing.as_deref()) {
        raw.tag_crossing(id, subtype);
    }
}

/// Cuts a pedestrian way at every interior node another pedestrian way
/// also passes through.
fn pedestrian_pieces(way: &PedestrianWay, usage: &HashMap<NodeId, usize>) -> Vec<Vec<Coord<f64>>> {
    if way.nodes.len() != way.coords.len() || way.coords.len() < 3 {
        return vec![way.coords.clone()];
    }

    let last = way.coords.len() - 1;
    let mut pieces = Vec::new();
    let mut current = vec![way.coords[0]];
    for (index, (node, coord)) in way.nodes.iter().zip(&way.coords).enumerate().skip(1) {
        current.push(*coord);
        if index < last && usage.get(node).is_some_and(|count| *count > 1) {
            pieces.push(std::mem::replace(&mut current, vec![*coord]));
        }
    }
    pieces.push(current);
    pieces
}

/// Concatenates consecutive pieces sharing their joint coordinates.
fn join_pieces(pieces: Vec<Vec<Coord<f64>>>) -> Vec<Coord<f64>> {
    let mut joined: Vec<Coord<f64>> = Vec::new();
    for piece in pieces {
        let skip = usize::from(!joined.is_empty());
        joined.extend(piece.into_iter().skip(skip));
    }
    joined
}

fn split_pedestrian_ways(
    raw: &mut RawNetwork,
    ways: Vec<PedestrianWay>,
    policy: ErrorPolicy,
) -> Result<(), Error> {
    let mut usage: HashMap<NodeId, usize> = HashMap::new();
    for way in &ways {
        for node in way.nodes.iter().unique() {
            *usage.entry(*node).or_default() += 1;
        }
    }

    for way in ways {
        let mut pieces = pedestrian_pieces(&way, &usage);
        let capacity = usize::from(MAX_SPLIT_INDEX) + 1;
        if pieces.len() > capacity {
            warn!(
                "Pedestrian way {} would split into {} pieces, keeping its tail unsplit",
                way.source,
                pieces.len()
            );
            let tail = pieces.split_off(capacity - 1);
            pieces.push(join_pieces(tail));
        }

        let roads = pieces
            .into_iter()
            .zip(0..=MAX_SPLIT_INDEX)
            .map(|(coords, split)| {
                Ok(PedestrianRoad {
                    id: PedestrianId {
                        source: way.source,
                        split,
                    },
                    segment: RoadSegment::new(
                        way.name.as_str(),
                        way.class.as_str(),
                        LineString::new(coords),
                    )?,
                })
            })
            .collect::<Result<Vec<_>, Error>>();

        if let Some(roads) = policy.absorb(roads, format_args!("pedestrian way {}", way.source))? {
            raw.pedestrian_roads.extend(roads);
        }
    }
    Ok(())
}
