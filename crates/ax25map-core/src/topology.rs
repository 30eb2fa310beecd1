use crate::{CoreError, EdgeId, StationId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: StationId,
    /// Frames that reference this station in any role.
    pub packet_count: u32,
    /// Frames this station originated.
    pub originated: u32,
    pub is_hearable: bool,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
    pub last_payload: Option<String>,
}

impl Node {
    pub fn new(id: StationId) -> Self {
        Self {
            id,
            packet_count: 0,
            originated: 0,
            is_hearable: false,
            first_seen: None,
            last_seen: None,
            last_payload: None,
        }
    }

    /// Widen the seen window with a frame timestamp.
    pub fn observe(&mut self, heard_at: Option<NaiveDateTime>) {
        let Some(at) = heard_at else {
            return;
        };
        self.first_seen = Some(self.first_seen.map_or(at, |first| first.min(at)));
        self.last_seen = Some(self.last_seen.map_or(at, |last| last.max(at)));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: StationId,
    pub target: StationId,
    pub count: u32,
}

impl Edge {
    pub fn new(source: StationId, target: StationId) -> Self {
        Self {
            id: EdgeId::between(&source, &target),
            source,
            target,
            count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub hearable_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Snapshot of the reconstructed network: every station seen, every relay
/// hop observed, and the stations receivable without a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub hearable_nodes: Vec<StationId>,
    pub stats: TopologyStats,
}

impl TopologyGraph {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), now)
    }

    /// Assemble a graph, deriving the hearable list and stats from the parts.
    pub fn from_parts(mut nodes: Vec<Node>, mut edges: Vec<Edge>, now: DateTime<Utc>) -> Self {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        let hearable_nodes: Vec<StationId> = nodes
            .iter()
            .filter(|n| n.is_hearable)
            .map(|n| n.id.clone())
            .collect();
        let stats = TopologyStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            hearable_count: hearable_nodes.len(),
            last_updated: now,
        };
        Self {
            nodes,
            edges,
            hearable_nodes,
            stats,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &StationId) -> Option<&Node> {
        self.nodes
            .binary_search_by(|n| n.id.cmp(id))
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.node(id).is_some()
    }

    pub fn is_hearable(&self, id: &StationId) -> bool {
        self.node(id).is_some_and(|n| n.is_hearable)
    }

    /// Structural equality: same stations, same hop counts, same hearable
    /// set. Timestamps and payload samples are ignored.
    pub fn same_topology(&self, other: &TopologyGraph) -> bool {
        self.hearable_nodes == other.hearable_nodes
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.id == b.id)
            && self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(a, b)| a.id == b.id && a.count == b.count)
    }

    /// Check the model invariants: unique node ids, positive counts, and
    /// edges that only reference existing nodes.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(CoreError::DuplicateStation(node.id.clone()));
            }
            if node.packet_count == 0 {
                return Err(CoreError::EmptyNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            if edge.count == 0 {
                return Err(CoreError::EmptyEdge(edge.id.clone()));
            }
            for station in [&edge.source, &edge.target] {
                if !seen.contains(station) {
                    return Err(CoreError::DanglingEdge {
                        edge: edge.id.clone(),
                        station: station.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
