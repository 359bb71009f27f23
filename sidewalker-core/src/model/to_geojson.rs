use std::fmt::Display;

use geojson::{Feature, FeatureCollection, Geometry, GeometryValue};
use serde_json::json;

use super::network::PedestrianNetwork;
use super::roads::RoadSegment;
use crate::Error;

impl PedestrianNetwork {
    /// Converts every pedestrian road, sidewalk and crossing to a `GeoJSON`
    /// `FeatureCollection`.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::new();

        for road in self.pedestrian_roads() {
            features.push(create_feature(road.id, "pedestrian", &road.segment, None)?);
        }
        for sidewalk in self.sidewalks() {
            features.push(create_feature(
                sidewalk.id,
                "sidewalk",
                &sidewalk.segment,
                None,
            )?);
        }
        for crossing in self.crossings() {
            features.push(create_feature(
                crossing.id,
                "crossing",
                &crossing.segment,
                Some(crossing.crossing_type.as_str()),
            )?);
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn create_feature(
    id: impl Display,
    kind: &str,
    segment: &RoadSegment,
    crossing_type: Option<&str>,
) -> Result<Feature, Error> {
    let geometry = Geometry::new(GeometryValue::from(segment.geometry()));

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "id": id.to_string(),
            "kind": kind,
            "class": segment.class,
            "name": segment.name,
            "type": crossing_type,
            "length": segment.length_km(),
        }
    });

    serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}
