use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::NodeId;

/// Properties of a LineString feature
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct WayProperties {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Option<u64>,
    pub highway: Option<String>,
    pub name: Option<String>,
    pub sidewalk: Option<String>,
    pub lanes: Value,
    pub foot: Option<String>,
    pub area: Option<String>,
    pub nodes: Vec<NodeId>,
}

/// Properties of a Point feature
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NodeProperties {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Option<u64>,
    pub highway: Option<String>,
    pub crossing: Option<String>,
}

/// Accepts ids given either as JSON numbers or as numeric strings
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}
