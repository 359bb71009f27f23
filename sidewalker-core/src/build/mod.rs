//! Builders deriving sidewalks and crossings from the street topology.

pub mod crossings;
pub mod sidewalks;

pub use crossings::CrossingBuilder;
pub use sidewalks::SidewalkBuilder;
