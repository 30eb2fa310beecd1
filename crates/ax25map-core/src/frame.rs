use crate::StationId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PacketKind {
    Id,
    Beacon,
    #[default]
    Other,
}

impl PacketKind {
    /// Classify a frame by its destination field.
    pub fn from_destination(destination: &str) -> Self {
        match destination.to_ascii_uppercase().as_str() {
            "ID" => Self::Id,
            "BEACON" => Self::Beacon,
            _ => Self::Other,
        }
    }
}

/// One entry of a digipeater path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHop {
    pub station: StationId,
    /// The station actually relayed this frame (trailing `*` in the log).
    pub used: bool,
}

impl PathHop {
    pub fn new(station: StationId, used: bool) -> Self {
        Self { station, used }
    }
}

/// A parsed link-layer frame header. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub source: StationId,
    pub destination: StationId,
    pub digipeater_path: Vec<PathHop>,
    pub payload_sample: Option<String>,
    pub packet_kind: PacketKind,
    pub control: Option<String>,
    pub pid: Option<String>,
    pub length: Option<u32>,
    pub heard_at: Option<NaiveDateTime>,
}

impl FrameRecord {
    pub fn has_used_marker(&self) -> bool {
        self.digipeater_path.iter().any(|hop| hop.used)
    }

    /// The rightmost path station carrying a used marker: the last relay
    /// before the receiver.
    pub fn last_used_hop(&self) -> Option<&PathHop> {
        self.digipeater_path.iter().rev().find(|hop| hop.used)
    }

    /// The station this frame proves to be directly receivable.
    pub fn hearable_station(&self) -> &StationId {
        match self.last_used_hop() {
            Some(hop) => &hop.station,
            None => &self.source,
        }
    }

    /// Ordered stations the frame traversed: the source followed by the
    /// path, truncated after the last used station when one exists.
    pub fn hop_chain(&self) -> Vec<&StationId> {
        let end = self
            .digipeater_path
            .iter()
            .rposition(|hop| hop.used)
            .map(|idx| idx + 1)
            .unwrap_or(self.digipeater_path.len());

        std::iter::once(&self.source)
            .chain(self.digipeater_path[..end].iter().map(|hop| &hop.station))
            .collect()
    }

    /// Consecutive `(from, to)` pairs of the hop chain that become edges.
    /// A path of fewer than two relayed stations links nothing, and
    /// repeated stations are skipped.
    pub fn hop_edges(&self) -> Vec<(&StationId, &StationId)> {
        let chain = self.hop_chain();
        if chain.len() < 3 {
            return Vec::new();
        }
        chain
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .filter(|(from, to)| from != to)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(source: &str, path: &[(&str, bool)]) -> FrameRecord {
        FrameRecord {
            source: StationId::new(source),
            destination: StationId::new("BEACON"),
            digipeater_path: path
                .iter()
                .map(|(s, used)| PathHop::new(StationId::new(*s), *used))
                .collect(),
            payload_sample: None,
            packet_kind: PacketKind::Beacon,
            control: Some("UI".to_string()),
            pid: None,
            length: None,
            heard_at: None,
        }
    }

    #[test]
    fn test_hop_chain_without_markers_uses_whole_path() {
        let f = frame("AB6BR", &[("WOODY", false), ("KJOHN", false)]);
        let chain: Vec<&str> = f.hop_chain().iter().map(|s| s.as_str()).collect();
        assert_eq!(chain, vec!["AB6BR", "WOODY", "KJOHN"]);
        assert_eq!(f.hearable_station().as_str(), "AB6BR");
    }

    #[test]
    fn test_hop_chain_stops_at_last_used() {
        let f = frame("K7BBS", &[("HMKR", true), ("KJOHN", true), ("KROCK", false)]);
        let chain: Vec<&str> = f.hop_chain().iter().map(|s| s.as_str()).collect();
        assert_eq!(chain, vec!["K7BBS", "HMKR", "KJOHN"]);
        assert_eq!(f.hearable_station().as_str(), "KJOHN");
    }

    #[test]
    fn test_single_station_path_links_nothing() {
        for used in [false, true] {
            let f = frame("AB6BR", &[("WOODY", used)]);
            assert!(f.hop_edges().is_empty());
        }
        let f = frame("AB6BR", &[]);
        assert!(f.hop_edges().is_empty());

        // Only one hop has been relayed so far.
        let f = frame("K7BBS", &[("HMKR", true), ("KROCK", false)]);
        assert!(f.hop_edges().is_empty());
    }

    #[test]
    fn test_hop_edges_follow_chain() {
        let f = frame("AB6BR", &[("WOODY", true), ("WOODY", true), ("KJOHN", true)]);
        let edges: Vec<(&str, &str)> = f
            .hop_edges()
            .into_iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        assert_eq!(edges, vec![("AB6BR", "WOODY"), ("WOODY", "KJOHN")]);
    }

    #[test]
    fn test_packet_kind_from_destination() {
        assert_eq!(PacketKind::from_destination("id"), PacketKind::Id);
        assert_eq!(PacketKind::from_destination("BEACON"), PacketKind::Beacon);
        assert_eq!(PacketKind::from_destination("APRS"), PacketKind::Other);
    }
}
