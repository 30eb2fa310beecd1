use ax25map_core::{StationId, TopologyGraph};
use ax25map_index::{BuilderOptions, TopologyBuilder, build_topology};
use chrono::Utc;
use proptest::prelude::*;

const CALLS: &[&str] = &["K6FB", "AB6BR", "WOODY", "KJOHN", "KROCK", "HMKR", "KBETH-2"];

const SAMPLE_LOG: &str = "\
2024-03-01 18:20:00 fm K6FB to BEACON ctl UI pid=F0(Text) len 48
K6FB Santa Cruz BBS
0000  96 88 64 a8 9e 40 e0 96
2024-03-01 18:21:00 fm AB6BR to TONY via WOODY KJOHN KBERR ctl UI pid=F0(Text) len 4
2024-03-01 18:22:00 fm K7BBS to BEACON via HMKR* KRDG* KBANN* KBETH* WOODY* KJOHN* KROCK ctl UI
status: link up
";

fn build(lines: &[String]) -> TopologyGraph {
    build_topology(lines, BuilderOptions::default(), Utc::now())
}

fn frame_line() -> impl Strategy<Value = String> {
    let call = || proptest::sample::select(CALLS);
    (
        call(),
        call(),
        proptest::collection::vec((call(), any::<bool>()), 0..5),
    )
        .prop_map(|(src, dst, path)| {
            let mut line = format!("fm {src} to {dst}");
            if !path.is_empty() {
                line.push_str(" via");
                for (hop, used) in path {
                    line.push(' ');
                    line.push_str(hop);
                    if used {
                        line.push('*');
                    }
                }
            }
            line.push_str(" ctl UI pid=F0(Text) len 1");
            line
        })
}

#[test]
fn test_sample_log_topology() -> anyhow::Result<()> {
    let graph = build_topology(SAMPLE_LOG.lines(), BuilderOptions::default(), Utc::now());
    graph.validate()?;

    let hearable: Vec<&str> = graph.hearable_nodes.iter().map(|s| s.as_str()).collect();
    assert_eq!(hearable, vec!["AB6BR", "K6FB", "KJOHN"]);
    assert_eq!(graph.stats.total_edges, 8);
    assert_eq!(graph.stats.hearable_count, 3);

    let k6fb = graph
        .node(&StationId::new("K6FB"))
        .ok_or_else(|| anyhow::anyhow!("K6FB missing"))?;
    assert_eq!(k6fb.last_payload.as_deref(), Some("K6FB Santa Cruz BBS"));
    assert!(k6fb.first_seen.is_some());
    Ok(())
}

#[test]
fn test_replaying_log_is_idempotent() {
    let lines: Vec<String> = SAMPLE_LOG.lines().map(str::to_string).collect();
    let first = build(&lines);
    let second = build(&lines);
    assert!(first.same_topology(&second));
}

#[test]
fn test_incremental_ingest_matches_full_rebuild() {
    let lines: Vec<String> = SAMPLE_LOG.lines().map(str::to_string).collect();
    let (head, tail) = lines.split_at(3);

    let reader = ax25map_index::LogReader::default();
    let mut builder = TopologyBuilder::new(BuilderOptions::default());
    builder.ingest_all(&reader.read(head));
    builder.ingest_all(&reader.read(tail));

    assert!(builder.snapshot(Utc::now()).same_topology(&build(&lines)));
    assert_eq!(builder.frames_seen(), 3);
}

proptest! {
    #[test]
    fn prop_frame_order_does_not_matter(
        (lines, shuffled) in proptest::collection::vec(frame_line(), 0..20)
            .prop_flat_map(|lines| (Just(lines.clone()), Just(lines).prop_shuffle()))
    ) {
        let a = build(&lines);
        let b = build(&shuffled);
        prop_assert!(a.same_topology(&b));
    }

    #[test]
    fn prop_graph_invariants_hold(lines in proptest::collection::vec(frame_line(), 0..20)) {
        let graph = build(&lines);
        prop_assert!(graph.validate().is_ok());
        prop_assert_eq!(graph.stats.hearable_count, graph.hearable_nodes.len());
        prop_assert!(graph.edges.iter().all(|e| e.source != e.target));
        // every frame yields exactly one hearable station
        prop_assert!(lines.is_empty() || !graph.hearable_nodes.is_empty());
    }
}
