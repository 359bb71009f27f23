use thiserror::Error;

use crate::NodeId;
use crate::geometry::GeometryError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("No location known for node {0}")]
    MissingLocation(NodeId),
    #[error("Split indices exhausted for {0}")]
    SplitIndexExhausted(String),
    #[error("Topology inconsistency: {0}")]
    Topology(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by a single malformed input entity.
    ///
    /// Under [`ErrorPolicy::SkipAndLog`](crate::loading::ErrorPolicy) these
    /// drop the offending entity instead of aborting the run.
    pub fn is_entity_local(&self) -> bool {
        matches!(
            self,
            Error::Geometry(_)
                | Error::InvalidId(_)
                | Error::MissingLocation(_)
                | Error::InvalidData(_)
        )
    }
}
