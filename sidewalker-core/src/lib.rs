//! Core of sidewalker: derives a pedestrian network (sidewalks and crossings)
//! from a classified street network.
//!
//! The pipeline runs in fixed stages: topology construction, sidewalk
//! construction with corner stitching, official crossings, duplicate
//! detection, regular crossings and finally reconciliation of every
//! pedestrian entity at its mutual intersections.

pub mod algo;
pub mod build;
mod error;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::Error;

/// Identifier of a node in the source street network
pub type NodeId = u64;
/// Identifier of a way in the source street network
pub type WayId = u64;
