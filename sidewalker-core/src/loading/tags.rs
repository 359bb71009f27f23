//! Tag based classification of source ways and nodes

use serde_json::Value;

use crate::model::SidewalkPlacement;

const VEHICLE_CLASSES: &[&str] = &[
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "unclassified",
    "road",
    "residential",
    "service",
    "motorway_link",
    "trunk_link",
    "primary_link",
    "secondary_link",
    "tertiary_link",
    "bus_guideway",
];

const PEDESTRIAN_CLASSES: &[&str] = &[
    "pedestrian",
    "footway",
    "steps",
    "path",
    "track",
    "living_street",
];

/// Crossing subtype used when a crossing node carries no `crossing` tag
pub const UNKNOWN_CROSSING: &str = "unknown";

pub fn is_area(area: Option<&str>) -> bool {
    area.is_some_and(|value| value != "no")
}

pub fn is_vehicle(highway: &str, area: Option<&str>) -> bool {
    !is_area(area) && VEHICLE_CLASSES.contains(&highway)
}

pub fn is_pedestrian(highway: &str, area: Option<&str>, foot: Option<&str>) -> bool {
    if is_area(area) {
        return false;
    }
    PEDESTRIAN_CLASSES.contains(&highway) || (highway == "cycleway" && foot == Some("yes"))
}

pub fn sidewalk_placement(sidewalk: Option<&str>) -> SidewalkPlacement {
    match sidewalk {
        Some("none" | "no") => SidewalkPlacement::None,
        Some("left") => SidewalkPlacement::Left,
        Some("right") => SidewalkPlacement::Right,
        _ => SidewalkPlacement::Both,
    }
}

/// Lane count from a number or a numeric string, 0 when absent or malformed
pub fn parse_lanes(lanes: &Value) -> u32 {
    match lanes {
        Value::Number(number) => number
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Subtype of a tagged crossing node, `None` for other nodes
pub fn crossing_subtype(highway: Option<&str>, crossing: Option<&str>) -> Option<String> {
    (highway == Some("crossing")).then(|| crossing.unwrap_or(UNKNOWN_CROSSING).to_string())
}
