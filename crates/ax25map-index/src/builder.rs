use crate::line_parser::LineParser;
use crate::log_reader::LogReader;
use ax25map_core::{Edge, EdgeId, FrameRecord, Node, SsidMode, StationId, TopologyGraph};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderOptions {
    pub ssid_mode: SsidMode,
    /// Create nodes for frame destinations (`BEACON`, `ID`, ...).
    pub include_destinations: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            ssid_mode: SsidMode::Strip,
            include_destinations: true,
        }
    }
}

/// Accumulates frames into nodes, hop edges and the hearable set.
///
/// Hearable status is a union over all frames, so the resulting graph does
/// not depend on the order frames are fed in.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    options: BuilderOptions,
    nodes: HashMap<StationId, Node>,
    edges: HashMap<EdgeId, Edge>,
    frames_seen: usize,
}

impl TopologyBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Full rebuild from raw log lines.
    pub fn from_lines<I, S>(lines: I, options: BuilderOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reader = LogReader::new(LineParser::new(options.ssid_mode));
        let mut builder = Self::new(options);
        builder.ingest_all(&reader.read(lines));
        builder
    }

    pub fn options(&self) -> BuilderOptions {
        self.options
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn ingest_all<'a>(&mut self, frames: impl IntoIterator<Item = &'a FrameRecord>) {
        for frame in frames {
            self.ingest(frame);
        }
    }

    pub fn ingest(&mut self, frame: &FrameRecord) {
        self.frames_seen += 1;

        let source = self.touch(&frame.source, frame);
        source.originated += 1;
        if let Some(payload) = &frame.payload_sample {
            source.last_payload = Some(payload.clone());
        }

        let mut referenced: HashSet<&StationId> = HashSet::new();
        referenced.insert(&frame.source);
        if self.options.include_destinations && referenced.insert(&frame.destination) {
            self.touch(&frame.destination, frame);
        }
        for hop in &frame.digipeater_path {
            if referenced.insert(&hop.station) {
                self.touch(&hop.station, frame);
            }
        }

        if let Some(node) = self.nodes.get_mut(frame.hearable_station()) {
            node.is_hearable = true;
        }

        for (from, to) in frame.hop_edges() {
            self.edges
                .entry(EdgeId::between(from, to))
                .and_modify(|edge| edge.count += 1)
                .or_insert_with(|| Edge::new(from.clone(), to.clone()));
        }
    }

    /// Count one more referencing frame for `station`, creating it if new.
    fn touch(&mut self, station: &StationId, frame: &FrameRecord) -> &mut Node {
        let node = self
            .nodes
            .entry(station.clone())
            .or_insert_with(|| Node::new(station.clone()));
        node.packet_count += 1;
        node.observe(frame.heard_at);
        node
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TopologyGraph {
        TopologyGraph::from_parts(
            self.nodes.values().cloned().collect(),
            self.edges.values().cloned().collect(),
            now,
        )
    }

    pub fn finish(self, now: DateTime<Utc>) -> TopologyGraph {
        let graph = TopologyGraph::from_parts(
            self.nodes.into_values().collect(),
            self.edges.into_values().collect(),
            now,
        );
        tracing::debug!(
            frames = self.frames_seen,
            nodes = graph.stats.total_nodes,
            edges = graph.stats.total_edges,
            hearable = graph.stats.hearable_count,
            "Topology built"
        );
        graph
    }
}

/// Rebuild a topology from scratch.
pub fn build_topology<I, S>(lines: I, options: BuilderOptions, now: DateTime<Utc>) -> TopologyGraph
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    TopologyBuilder::from_lines(lines, options).finish(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(lines: &[&str]) -> TopologyGraph {
        build_topology(lines.iter(), BuilderOptions::default(), Utc::now())
    }

    fn edge_count(graph: &TopologyGraph, from: &str, to: &str) -> Option<u32> {
        let id = EdgeId::between(&StationId::new(from), &StationId::new(to));
        graph.edges.iter().find(|e| e.id == id).map(|e| e.count)
    }

    #[test]
    fn test_direct_frame_is_hearable_without_edges() {
        let graph = build(&["fm K6FB to BEACON ctl UI pid=F0(Text) len 48"]);
        assert!(graph.is_hearable(&StationId::new("K6FB")));
        assert!(graph.edges.is_empty());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_unmarked_path_makes_source_hearable() {
        let graph = build(&["fm AB6BR to TONY via WOODY KJOHN KBERR ctl UI pid=F0(Text) len 4"]);

        assert!(graph.is_hearable(&StationId::new("AB6BR")));
        assert!(!graph.is_hearable(&StationId::new("WOODY")));
        assert_eq!(edge_count(&graph, "AB6BR", "WOODY"), Some(1));
        assert_eq!(edge_count(&graph, "WOODY", "KJOHN"), Some(1));
        assert_eq!(edge_count(&graph, "KJOHN", "KBERR"), Some(1));
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_last_used_station_is_hearable() {
        let graph = build(&[
            "fm K7BBS to BEACON via HMKR* KRDG* KBANN* KBETH* WOODY* KJOHN* KROCK ctl UI",
        ]);

        assert!(graph.is_hearable(&StationId::new("KJOHN")));
        assert!(!graph.is_hearable(&StationId::new("K7BBS")));
        assert!(!graph.is_hearable(&StationId::new("WOODY")));
        assert_eq!(graph.edge_count(), 6);
        for (from, to) in [
            ("K7BBS", "HMKR"),
            ("HMKR", "KRDG"),
            ("KRDG", "KBANN"),
            ("KBANN", "KBETH"),
            ("KBETH", "WOODY"),
            ("WOODY", "KJOHN"),
        ] {
            assert_eq!(edge_count(&graph, from, to), Some(1), "{from}->{to}");
        }
        assert_eq!(edge_count(&graph, "KJOHN", "KROCK"), None);
        assert!(graph.contains(&StationId::new("KROCK")));
    }

    #[test]
    fn test_repeated_hops_accumulate() {
        let graph = build(&[
            "fm AB6BR to TONY via WOODY* KJOHN* ctl UI",
            "fm AB6BR-2 to TONY via WOODY* KJOHN* ctl UI",
            "fm WOODY to ID ctl UI",
        ]);

        assert_eq!(edge_count(&graph, "AB6BR", "WOODY"), Some(2));
        assert_eq!(edge_count(&graph, "WOODY", "KJOHN"), Some(2));
        let woody = graph.node(&StationId::new("WOODY")).unwrap();
        assert_eq!(woody.packet_count, 3);
        assert_eq!(woody.originated, 1);
        let ab6br = graph.node(&StationId::new("AB6BR")).unwrap();
        assert_eq!(ab6br.originated, 2);
        assert!(woody.is_hearable);
    }

    #[test]
    fn test_single_station_path_creates_no_edge() {
        for line in [
            "fm AB6BR to TONY via WOODY ctl UI",
            "fm AB6BR to TONY via WOODY* ctl UI",
        ] {
            let graph = build(&[line]);
            assert_eq!(graph.edge_count(), 0, "{line}");
            assert_eq!(graph.node_count(), 3, "{line}");
            assert_eq!(graph.node(&StationId::new("WOODY")).unwrap().packet_count, 1);
            assert!(graph.validate().is_ok());
        }

        let graph = build(&["fm AB6BR to TONY via WOODY ctl UI"]);
        assert!(graph.is_hearable(&StationId::new("AB6BR")));
        let graph = build(&["fm AB6BR to TONY via WOODY* ctl UI"]);
        assert!(graph.is_hearable(&StationId::new("WOODY")));
        assert!(!graph.is_hearable(&StationId::new("AB6BR")));
    }

    #[test]
    fn test_relay_can_also_be_hearable() {
        let graph = build(&[
            "fm A1AA to CQ via WOODY* KJOHN* ctl UI",
            "fm WOODY to ID ctl UI",
        ]);
        let woody = graph.node(&StationId::new("WOODY")).unwrap();
        assert!(woody.is_hearable);
        assert_eq!(edge_count(&graph, "WOODY", "KJOHN"), Some(1));
    }

    #[test]
    fn test_self_loops_are_skipped() {
        let graph = build(&["fm KJOHN-1 to CQ via KJOHN-2* ctl UI"]);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_destinations_can_be_excluded() {
        let options = BuilderOptions {
            include_destinations: false,
            ..Default::default()
        };
        let graph = build_topology(["fm K6FB to BEACON ctl UI"], options, Utc::now());
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.contains(&StationId::new("BEACON")));
    }

    #[test]
    fn test_payload_sample_lands_on_source() {
        let graph = build(&["fm K6FB to BEACON ctl UI", "Santa Cruz BBS"]);
        let node = graph.node(&StationId::new("K6FB")).unwrap();
        assert_eq!(node.last_payload.as_deref(), Some("Santa Cruz BBS"));
    }

    #[test]
    fn test_empty_input_yields_empty_graph() {
        let graph = build(&[]);
        assert!(graph.is_empty());
        assert_eq!(graph.stats.hearable_count, 0);
    }
}
