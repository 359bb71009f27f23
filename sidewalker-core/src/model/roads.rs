//! Road-like entities: vehicle roads, pedestrian roads, sidewalks and crossings

use std::fmt;

use geo::LineString;
use serde::{Deserialize, Serialize};

use super::ids::{CrossingId, CrossingKind, IdStem, PedestrianId, SidewalkId, VehicleId};
use crate::WayId;
use crate::geometry::{GeometryError, Side, line_length};

/// Shape shared by every road-like entity
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    /// Street name, empty when unnamed
    pub name: String,
    /// Class tag of the road, e.g. `residential` or `footway`
    pub class: String,
    length_km: f64,
    geometry: LineString<f64>,
}

impl RoadSegment {
    /// # Errors
    ///
    /// Fails when the geometry has fewer than two coordinates.
    pub fn new(
        name: impl Into<String>,
        class: impl Into<String>,
        geometry: LineString<f64>,
    ) -> Result<Self, GeometryError> {
        if geometry.0.len() < 2 {
            return Err(GeometryError::TooFewCoordinates(geometry.0.len()));
        }
        Ok(RoadSegment {
            name: name.into(),
            class: class.into(),
            length_km: line_length(&geometry) / 1000.0,
            geometry,
        })
    }

    pub fn geometry(&self) -> &LineString<f64> {
        &self.geometry
    }

    /// Great-circle length in kilometers
    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    /// Mutates the geometry in place and refreshes the length.
    ///
    /// # Errors
    ///
    /// Fails, leaving the segment untouched, when the result would have
    /// fewer than two coordinates.
    pub fn update_geometry(
        &mut self,
        update: impl FnOnce(&mut LineString<f64>),
    ) -> Result<(), GeometryError> {
        let mut geometry = self.geometry.clone();
        update(&mut geometry);
        if geometry.0.len() < 2 {
            return Err(GeometryError::TooFewCoordinates(geometry.0.len()));
        }
        self.length_km = line_length(&geometry) / 1000.0;
        self.geometry = geometry;
        Ok(())
    }

    /// Same name and class over a new geometry.
    pub fn with_geometry(&self, geometry: LineString<f64>) -> Result<Self, GeometryError> {
        RoadSegment::new(self.name.clone(), self.class.clone(), geometry)
    }
}

/// Which sides of a vehicle road carry a sidewalk, relative to the
/// direction of its geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidewalkPlacement {
    None,
    Left,
    Right,
    #[default]
    Both,
}

impl SidewalkPlacement {
    /// Whether a sidewalk exists on `side` when the road is walked forward
    /// (along its geometry) or backward.
    pub fn has_side(self, side: Side, forward: bool) -> bool {
        let tagged = match self {
            SidewalkPlacement::None => return false,
            SidewalkPlacement::Both => return true,
            SidewalkPlacement::Left => Side::Left,
            SidewalkPlacement::Right => Side::Right,
        };
        if forward { side == tagged } else { side != tagged }
    }
}

/// Road carrying vehicle traffic; immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRoad {
    pub id: VehicleId,
    pub segment: RoadSegment,
    pub placement: SidewalkPlacement,
    pub lanes: u32,
}

impl VehicleRoad {
    pub fn source(&self) -> WayId {
        self.id.source
    }
}

/// Ability to be replaced by children when cut into pieces
pub trait Splittable: Sized {
    type Id: Copy + Ord + fmt::Display;

    fn id(&self) -> Self::Id;

    fn split(&self) -> u8;

    /// Stem under which the split indices of children are allocated
    fn stem(&self) -> IdStem;

    fn segment(&self) -> &RoadSegment;

    /// Child carrying everything but the geometry and split index over.
    ///
    /// # Errors
    ///
    /// Fails for geometries with fewer than two coordinates.
    fn child(&self, split: u8, geometry: LineString<f64>) -> Result<Self, GeometryError>;
}

/// Path dedicated to pedestrians, taken from the source map
#[derive(Debug, Clone, PartialEq)]
pub struct PedestrianRoad {
    pub id: PedestrianId,
    pub segment: RoadSegment,
}

impl PedestrianRoad {
    pub fn source(&self) -> WayId {
        self.id.source
    }
}

impl Splittable for PedestrianRoad {
    type Id = PedestrianId;

    fn id(&self) -> PedestrianId {
        self.id
    }

    fn split(&self) -> u8 {
        self.id.split
    }

    fn stem(&self) -> IdStem {
        IdStem::Pedestrian(self.id.source)
    }

    fn segment(&self) -> &RoadSegment {
        &self.segment
    }

    fn child(&self, split: u8, geometry: LineString<f64>) -> Result<Self, GeometryError> {
        Ok(PedestrianRoad {
            id: PedestrianId {
                source: self.id.source,
                split,
            },
            segment: self.segment.with_geometry(geometry)?,
        })
    }
}

/// Sidewalk built alongside a vehicle road
#[derive(Debug, Clone, PartialEq)]
pub struct Sidewalk {
    pub id: SidewalkId,
    /// Name and class of the owning vehicle road
    pub segment: RoadSegment,
    /// Source way of the owning vehicle road
    pub source: WayId,
}

impl Sidewalk {
    pub fn neighbour_id(&self) -> SidewalkId {
        self.id.neighbour_id()
    }
}

impl Splittable for Sidewalk {
    type Id = SidewalkId;

    fn id(&self) -> SidewalkId {
        self.id
    }

    fn split(&self) -> u8 {
        self.id.split
    }

    fn stem(&self) -> IdStem {
        IdStem::Sidewalk(self.id.stem)
    }

    fn segment(&self) -> &RoadSegment {
        &self.segment
    }

    fn child(&self, split: u8, geometry: LineString<f64>) -> Result<Self, GeometryError> {
        Ok(Sidewalk {
            id: SidewalkId {
                stem: self.id.stem,
                split,
            },
            segment: self.segment.with_geometry(geometry)?,
            source: self.source,
        })
    }
}

/// Crossing subtype
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CrossingType {
    /// Subtype tagged on an official crossing node, e.g. `zebra`
    Tagged(String),
    /// Regular crossing over a high traffic road
    Risk,
    Frequent,
}

impl CrossingType {
    pub fn as_str(&self) -> &str {
        match self {
            CrossingType::Tagged(subtype) => subtype,
            CrossingType::Risk => "risk",
            CrossingType::Frequent => "frequent",
        }
    }
}

impl fmt::Display for CrossingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link between two sidewalks across a vehicle road
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub id: CrossingId,
    pub segment: RoadSegment,
    pub crossing_type: CrossingType,
}

impl Crossing {
    pub fn kind(&self) -> CrossingKind {
        self.id.kind()
    }
}

impl Splittable for Crossing {
    type Id = CrossingId;

    fn id(&self) -> CrossingId {
        self.id
    }

    fn split(&self) -> u8 {
        self.id.split
    }

    fn stem(&self) -> IdStem {
        IdStem::Crossing(self.id.stem)
    }

    fn segment(&self) -> &RoadSegment {
        &self.segment
    }

    fn child(&self, split: u8, geometry: LineString<f64>) -> Result<Self, GeometryError> {
        Ok(Crossing {
            id: CrossingId {
                stem: self.id.stem,
                split,
            },
            segment: self.segment.with_geometry(geometry)?,
            crossing_type: self.crossing_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::m;

    #[test]
    fn test_segment_rejects_short_geometry() {
        let empty = RoadSegment::new("", "footway", LineString::new(vec![]));
        assert_eq!(empty, Err(GeometryError::TooFewCoordinates(0)));
        let single = RoadSegment::new("", "footway", LineString::new(vec![m(0.0, 0.0)]));
        assert_eq!(single, Err(GeometryError::TooFewCoordinates(1)));
    }

    #[test]
    fn test_segment_length_follows_geometry() {
        let mut segment = RoadSegment::new(
            "Main Street",
            "residential",
            LineString::new(vec![m(0.0, 0.0), m(1000.0, 0.0)]),
        )
        .unwrap();
        assert!((segment.length_km() - 1.0).abs() < 1e-9);

        segment
            .update_geometry(|line| line.0.push(m(1000.0, 500.0)))
            .unwrap();
        assert!((segment.length_km() - 1.5).abs() < 1e-9);

        assert!(segment.update_geometry(|line| line.0.truncate(1)).is_err());
        assert_eq!(segment.geometry().0.len(), 3);
    }

    #[test]
    fn test_placement_sides() {
        assert!(SidewalkPlacement::Both.has_side(Side::Left, false));
        assert!(!SidewalkPlacement::None.has_side(Side::Right, true));
        assert!(SidewalkPlacement::Left.has_side(Side::Left, true));
        assert!(!SidewalkPlacement::Left.has_side(Side::Right, true));
        assert!(SidewalkPlacement::Left.has_side(Side::Right, false));
        assert!(!SidewalkPlacement::Right.has_side(Side::Right, false));
    }

    #[test]
    fn test_child_keeps_stem_name_and_class() {
        let sidewalk = Sidewalk {
            id: SidewalkId::new(1, 2, Side::Right),
            segment: RoadSegment::new(
                "Main Street",
                "primary",
                LineString::new(vec![m(0.0, 0.0), m(10.0, 0.0)]),
            )
            .unwrap(),
            source: 42,
        };
        let child = sidewalk
            .child(3, LineString::new(vec![m(0.0, 0.0), m(5.0, 0.0)]))
            .unwrap();
        assert_eq!(child.id.stem, sidewalk.id.stem);
        assert_eq!(child.id.split, 3);
        assert_eq!(child.segment.name, "Main Street");
        assert_eq!(child.segment.class, "primary");
        assert_eq!(child.source, 42);
    }
}
