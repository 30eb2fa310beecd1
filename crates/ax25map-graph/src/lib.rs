//! Layout engine for station topologies: placement algorithms, connector
//! routing, edge bundling and drawing-quality scores.

pub mod bundling;
pub mod edge_router;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod quality;

pub use bundling::{BundleResult, EdgeBundleGroup, EdgeBundler, calculate_thickness};
pub use edge_router::{AnchorAssignment, AnchorRouter};
pub use geometry::{AnchorSide, Rect, Vec2};
pub use graph::{EdgeIndex, GraphModel, LayoutEdge, LayoutNode, LayoutPositions, NodeIndex};
pub use layout::{
    Canvas, ForceDirectedLayouter, HubLayouter, InvalidCanvas, LayoutConfig, Layouter,
    SpringLayouter, SpringPhase, grid_positions, layouter_for,
};
pub use quality::{Grade, LayoutQuality, LayoutQualityAssessor, segments_cross};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::graph::GraphModel;
    use ax25map_core::{Edge, Node, StationId, TopologyGraph};
    use chrono::Utc;

    /// One station per distinct name and one hop edge per `(from, to)` pair.
    pub(crate) fn model_from_links(links: &[(&str, &str)]) -> GraphModel {
        let mut names: Vec<&str> = links.iter().flat_map(|&(a, b)| [a, b]).collect();
        names.sort_unstable();
        names.dedup();
        let nodes = names
            .into_iter()
            .map(|name| Node {
                packet_count: 1,
                ..Node::new(StationId::new(name))
            })
            .collect();
        let edges = links
            .iter()
            .map(|&(a, b)| Edge::new(StationId::new(a), StationId::new(b)))
            .collect();
        GraphModel::from_topology(&TopologyGraph::from_parts(nodes, edges, Utc::now()))
    }
}
