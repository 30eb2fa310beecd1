use crate::{EdgeId, StationId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid SSID mode: {0} (expected `keep` or `strip`)")]
    InvalidSsidMode(String),
    #[error("Duplicate station id: {0}")]
    DuplicateStation(StationId),
    #[error("Edge {edge} references unknown station {station}")]
    DanglingEdge { edge: EdgeId, station: StationId },
    #[error("Edge {0} has a zero count")]
    EmptyEdge(EdgeId),
    #[error("Station {0} has no attributed packets")]
    EmptyNode(StationId),
}
