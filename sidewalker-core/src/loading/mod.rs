//! This module reads a classified street network, holds the run
//! configuration and drives the pipeline that turns the network into a
//! pedestrian network.

mod builder;
mod config;
pub mod geojson;
mod raw;
mod raw_types;
pub mod tags;

pub use builder::{create_pedestrian_network, create_pedestrian_network_from_geojson};
pub use config::{ContrastConfig, CrossingConfig, ErrorPolicy, NetworkConfig};
pub use raw::{RawNetwork, RawVehicleWay};
