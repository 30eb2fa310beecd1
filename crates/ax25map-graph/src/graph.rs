use crate::geometry::{Rect, Vec2};
use ax25map_core::{EdgeId, StationId, TopologyGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

/// Positions produced by a layout run, one per node.
pub type LayoutPositions = HashMap<NodeIndex, Vec2>;

const NODE_HEIGHT: f32 = 30.0;
const MIN_NODE_WIDTH: f32 = 60.0;
const CHAR_WIDTH: f32 = 8.0;
const LABEL_PADDING: f32 = 16.0;

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: StationId,
    pub size: Vec2,
    /// Distinct neighbours, ignoring edge direction.
    pub degree: usize,
    pub hearable: bool,
    pub packet_count: u32,
}

impl LayoutNode {
    /// Placement weight: well-connected, hearable, busy stations are heavier.
    pub fn importance(&self) -> f32 {
        1.0 + self.degree as f32 * 0.5
            + if self.hearable { 2.0 } else { 0.0 }
            + (1.0 + self.packet_count as f32).ln() * 0.5
    }

    pub fn rect_at(&self, center: Vec2) -> Rect {
        Rect::from_center_size(center, self.size)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutEdge {
    pub id: EdgeId,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
    pub count: u32,
}

/// Immutable snapshot of a topology, indexed for the layout loops.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    node_map: HashMap<StationId, NodeIndex>,
    adjacency: Vec<Vec<NodeIndex>>,
}

impl GraphModel {
    pub fn from_topology(graph: &TopologyGraph) -> Self {
        let mut node_map = HashMap::with_capacity(graph.nodes.len());
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            node_map.insert(node.id.clone(), NodeIndex(nodes.len()));
            nodes.push(LayoutNode {
                size: Self::node_size(node.id.as_str()),
                id: node.id.clone(),
                degree: 0,
                hearable: node.is_hearable,
                packet_count: node.packet_count,
            });
        }

        let mut edges = Vec::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            match (node_map.get(&edge.source), node_map.get(&edge.target)) {
                (Some(&source_idx), Some(&target_idx)) => edges.push(LayoutEdge {
                    id: edge.id.clone(),
                    source_idx,
                    target_idx,
                    count: edge.count,
                }),
                _ => tracing::warn!(
                    "Dropping edge {} because an endpoint is missing from the topology",
                    edge.id
                ),
            }
        }

        let mut adjacency: Vec<Vec<NodeIndex>> = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            adjacency[edge.source_idx.0].push(edge.target_idx);
            adjacency[edge.target_idx.0].push(edge.source_idx);
        }
        for (idx, neighbours) in adjacency.iter_mut().enumerate() {
            neighbours.sort();
            neighbours.dedup();
            nodes[idx].degree = neighbours.len();
        }

        Self {
            nodes,
            edges,
            node_map,
            adjacency,
        }
    }

    /// Box size for a station label.
    pub fn node_size(label: &str) -> Vec2 {
        let width = (label.chars().count() as f32 * CHAR_WIDTH + LABEL_PADDING).max(MIN_NODE_WIDTH);
        Vec2::new(width, NODE_HEIGHT)
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

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn index_of(&self, id: &StationId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.adjacency[idx.0]
    }

    pub fn importance(&self) -> Vec<f32> {
        self.nodes.iter().map(LayoutNode::importance).collect()
    }

    /// Node boxes centred on their layout positions. Nodes without a
    /// position are skipped.
    pub fn rects(&self, positions: &LayoutPositions) -> HashMap<NodeIndex, Rect> {
        self.node_indices()
            .filter_map(|idx| positions.get(&idx).map(|&p| (idx, self[idx].rect_at(p))))
            .collect()
    }

    /// Key positions by station id, for persistence and serialization.
    pub fn positions_by_id(&self, positions: &LayoutPositions) -> BTreeMap<StationId, Vec2> {
        positions
            .iter()
            .filter_map(|(idx, &p)| self.nodes.get(idx.0).map(|n| (n.id.clone(), p)))
            .collect()
    }

    /// Inverse of [`positions_by_id`](Self::positions_by_id); ids unknown to
    /// this model are dropped.
    pub fn positions_from_ids<'a>(
        &self,
        positions: impl IntoIterator<Item = (&'a StationId, &'a Vec2)>,
    ) -> LayoutPositions {
        positions
            .into_iter()
            .filter_map(|(id, &p)| self.index_of(id).map(|idx| (idx, p)))
            .collect()
    }
}

impl Index<NodeIndex> for GraphModel {
    type Output = LayoutNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for GraphModel {
    type Output = LayoutEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}
