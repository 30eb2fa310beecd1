//! Text renderings of a topology for external graph tools.

use ax25map_core::{StationId, TopologyGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

const HEARABLE_FILL: &str = "#ffaa66";
const DEFAULT_FILL: &str = "#e6f2ff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Dot,
    Mermaid,
    Edges,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub directed: bool,
    /// Also list stations that take part in no edge.
    pub emit_isolated: bool,
}

pub fn export(graph: &TopologyGraph, format: ExportFormat, options: ExportOptions) -> String {
    match format {
        ExportFormat::Dot => to_dot(graph, options),
        ExportFormat::Mermaid => to_mermaid(graph, options),
        ExportFormat::Edges => to_edge_list(graph, options),
    }
}

fn visible_nodes(graph: &TopologyGraph, options: ExportOptions) -> BTreeSet<&StationId> {
    if options.emit_isolated {
        return graph.nodes.iter().map(|n| &n.id).collect();
    }
    graph
        .edges
        .iter()
        .flat_map(|e| [&e.source, &e.target])
        .collect()
}

pub fn to_dot(graph: &TopologyGraph, options: ExportOptions) -> String {
    let (kind, connector) = if options.directed {
        ("digraph", "->")
    } else {
        ("graph", "--")
    };

    let mut out = String::new();
    let _ = writeln!(out, "{kind} G {{");
    let _ = writeln!(out, "  graph [overlap=false, splines=true];");
    let _ = writeln!(
        out,
        "  node [shape=ellipse, style=filled, fillcolor=\"{DEFAULT_FILL}\"];"
    );

    for id in visible_nodes(graph, options) {
        if graph.is_hearable(id) {
            let _ = writeln!(out, "  \"{}\" [fillcolor=\"{HEARABLE_FILL}\"];", escape_dot(id));
        } else {
            let _ = writeln!(out, "  \"{}\";", escape_dot(id));
        }
    }

    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "  \"{}\" {connector} \"{}\" [label=\"{}\"];",
            escape_dot(&edge.source),
            escape_dot(&edge.target),
            edge.count
        );
    }
    out.push_str("}\n");
    out
}

fn escape_dot(id: &StationId) -> String {
    id.as_str().replace('\\', "\\\\").replace('"', "\\\"")
}

fn mermaid_id(id: &StationId) -> String {
    id.as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn to_mermaid(graph: &TopologyGraph, options: ExportOptions) -> String {
    let arrow = if options.directed { "-->" } else { "---" };

    let mut out = String::from("flowchart LR\n");
    for id in visible_nodes(graph, options) {
        let class = if graph.is_hearable(id) { ":::hearable" } else { "" };
        let _ = writeln!(out, "  {}[\"{}\"]{class}", mermaid_id(id), id);
    }
    for edge in &graph.edges {
        let _ = writeln!(
            out,
            "  {} {arrow} |{}| {}",
            mermaid_id(&edge.source),
            edge.count,
            mermaid_id(&edge.target)
        );
    }
    if !graph.hearable_nodes.is_empty() {
        let _ = writeln!(
            out,
            "  classDef hearable fill:{HEARABLE_FILL},stroke:#ff6600,stroke-width:2px"
        );
    }
    out
}

pub fn to_edge_list(graph: &TopologyGraph, options: ExportOptions) -> String {
    let mut out = String::from("from\tto\tcount\n");
    for edge in &graph.edges {
        let _ = writeln!(out, "{}\t{}\t{}", edge.source, edge.target, edge.count);
    }
    if options.emit_isolated {
        let connected = visible_nodes(graph, ExportOptions::default());
        for node in graph.nodes.iter().filter(|n| !connected.contains(&n.id)) {
            let _ = writeln!(out, "{}\t\t0", node.id);
        }
    }
    out
}
