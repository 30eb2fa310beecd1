use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod error;
pub mod frame;
pub mod topology;

pub use error::CoreError;
pub use frame::{FrameRecord, PacketKind, PathHop};
pub use topology::{Edge, Node, TopologyGraph, TopologyStats};

/// Canonical station identifier (callsign, optionally with its SSID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a raw callsign token, applying the SSID policy.
    pub fn from_callsign(call: &str, mode: SsidMode) -> Self {
        let call = call.trim().to_ascii_uppercase();
        match mode {
            SsidMode::Keep => Self(call),
            SsidMode::Strip => Self(call.split('-').next().unwrap_or_default().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Edge identity, derived from the ordered `(source, target)` pair so that
/// repeated hops accumulate onto the same edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn between(source: &StationId, target: &StationId) -> Self {
        Self(format!("{}->{}", source, target))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the secondary station identifier (SSID) is part of a node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsidMode {
    Keep,
    #[default]
    Strip,
}

impl SsidMode {
    pub fn from_keep_flag(keep_ssid: bool) -> Self {
        if keep_ssid { Self::Keep } else { Self::Strip }
    }
}

impl FromStr for SsidMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "strip" => Ok(Self::Strip),
            _ => Err(CoreError::InvalidSsidMode(s.to_string())),
        }
    }
}
