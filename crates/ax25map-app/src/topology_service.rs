//! Holds the current topology snapshot and rebuilds it on demand.

use crate::source::LogSource;
use anyhow::Result;
use ax25map_core::TopologyGraph;
use ax25map_events::{Event, EventBus};
use ax25map_index::{BuilderOptions, build_topology};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

struct Current {
    generation: u64,
    graph: Arc<TopologyGraph>,
}

/// Read-only query surface over the reconstructed network.
///
/// Every rebuild starts from the full retained log. Readers get a cheap
/// `Arc` snapshot and never observe a half-built graph. `generation` only
/// moves when a rebuild actually changes nodes, edge counts or the
/// hearable set.
pub struct TopologyService {
    options: BuilderOptions,
    log: Mutex<Vec<String>>,
    current: RwLock<Current>,
    events: EventBus,
}

impl TopologyService {
    pub fn new(options: BuilderOptions, events: EventBus) -> Self {
        Self {
            options,
            log: Mutex::new(Vec::new()),
            current: RwLock::new(Current {
                generation: 0,
                graph: Arc::new(TopologyGraph::empty(Utc::now())),
            }),
            events,
        }
    }

    pub fn options(&self) -> BuilderOptions {
        self.options
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn snapshot(&self) -> Arc<TopologyGraph> {
        Arc::clone(&self.current.read().graph)
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Snapshot and the generation it belongs to, read together.
    pub fn versioned_snapshot(&self) -> (u64, Arc<TopologyGraph>) {
        let current = self.current.read();
        (current.generation, Arc::clone(&current.graph))
    }

    /// Replace the retained log with `source` and rebuild. Returns whether
    /// the topology changed. When the source cannot be read the previous
    /// snapshot stays in place.
    pub fn refresh(&self, source: &dyn LogSource) -> Result<bool> {
        let lines = match source.read_lines() {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!("Refresh failed, keeping previous topology: {e:#}");
                self.events.publish(Event::RefreshFailed {
                    error: format!("{e:#}"),
                });
                return Err(e);
            }
        };

        let mut log = self.log.lock();
        *log = lines;
        Ok(self.rebuild(&log))
    }

    /// Append newly observed lines and rebuild from the whole log.
    pub fn ingest_lines<I, S>(&self, lines: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut log = self.log.lock();
        log.extend(lines.into_iter().map(Into::into));
        self.rebuild(&log)
    }

    /// Explicit "recompute now": refresh from `source` and hand back the
    /// resulting snapshot.
    pub fn recompute_now(&self, source: &dyn LogSource) -> Result<Arc<TopologyGraph>> {
        self.refresh(source)?;
        Ok(self.snapshot())
    }

    fn rebuild(&self, lines: &[String]) -> bool {
        let graph = build_topology(lines, self.options, Utc::now());
        let stats = graph.stats.clone();

        let mut current = self.current.write();
        let changed = !current.graph.same_topology(&graph);
        current.graph = Arc::new(graph);
        if changed {
            current.generation += 1;
        }
        let generation = current.generation;
        drop(current);

        if changed {
            tracing::info!(
                generation,
                nodes = stats.total_nodes,
                edges = stats.total_edges,
                hearable = stats.hearable_count,
                "Topology changed"
            );
            self.events.publish(Event::TopologyChanged {
                total_nodes: stats.total_nodes,
                total_edges: stats.total_edges,
                hearable_count: stats.hearable_count,
            });
        } else {
            tracing::debug!(lines = lines.len(), "Rebuild produced identical topology");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticLogSource;
    use ax25map_core::StationId;

    struct BrokenSource;

    impl LogSource for BrokenSource {
        fn read_lines(&self) -> Result<Vec<String>> {
            anyhow::bail!("device unplugged")
        }
    }

    fn service() -> TopologyService {
        TopologyService::new(BuilderOptions::default(), EventBus::new())
    }

    #[test]
    fn test_refresh_emits_change_once() -> Result<()> {
        let service = service();
        let rx = service.events().receiver();
        let source = StaticLogSource::new(["fm K6FB to BEACON ctl UI pid=F0(Text) len 48"]);

        assert!(service.refresh(&source)?);
        assert!(!service.refresh(&source)?);
        assert_eq!(service.generation(), 1);

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![Event::TopologyChanged {
                total_nodes: 2,
                total_edges: 0,
                hearable_count: 1,
            }]
        );
        Ok(())
    }

    #[test]
    fn test_ingest_appends_to_log() {
        let service = service();
        service.ingest_lines(["fm AB6BR to TONY via WOODY* KJOHN* ctl UI"]);
        service.ingest_lines(["fm AB6BR to TONY via WOODY* KJOHN* ctl UI"]);

        let graph = service.snapshot();
        assert_eq!(graph.edges[0].count, 2);
        assert_eq!(service.generation(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_snapshot() -> Result<()> {
        let service = service();
        service.refresh(&StaticLogSource::new(["fm K6FB to ID ctl UI"]))?;
        let before = service.snapshot();

        assert!(service.refresh(&BrokenSource).is_err());
        assert!(Arc::ptr_eq(&before, &service.snapshot()));
        assert!(service.snapshot().contains(&StationId::new("K6FB")));
        assert!(
            service
                .events()
                .drain()
                .iter()
                .any(|e| matches!(e, Event::RefreshFailed { .. }))
        );
        Ok(())
    }

    #[test]
    fn test_recompute_now_returns_fresh_snapshot() -> Result<()> {
        let service = service();
        let graph = service.recompute_now(&StaticLogSource::new(["fm KJOHN to ID ctl UI"]))?;
        assert!(graph.is_hearable(&StationId::new("KJOHN")));
        Ok(())
    }
}
