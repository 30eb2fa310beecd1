//! Layout runs against the live topology: stale-run discard, debounced
//! anchor recomputation after node moves, and layout save/restore.

use crate::topology_service::TopologyService;
use anyhow::{Result, anyhow};
use ax25map_core::{EdgeId, StationId, TopologyGraph};
use ax25map_events::{Event, EventBus, LayoutAlgorithm, Scheduler, TaskClass};
use ax25map_graph::{
    AnchorAssignment, AnchorRouter, BundleResult, Canvas, EdgeBundler, GraphModel, HubLayouter,
    LayoutConfig, LayoutPositions, LayoutQuality, LayoutQualityAssessor, Layouter, Vec2,
    layouter_for,
};
use ax25map_project::{LayoutStore, SavedLayout};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything the rendering side needs from one completed layout.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub algorithm: LayoutAlgorithm,
    pub generation: u64,
    pub positions: BTreeMap<StationId, Vec2>,
    pub anchors: BTreeMap<EdgeId, AnchorAssignment>,
    pub bundles: BundleResult,
    pub quality: LayoutQuality,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub enum LayoutOutcome {
    Completed(Box<LayoutReport>),
    /// The topology changed while the run was in flight; a fresh run has
    /// been scheduled.
    Stale { algorithm: LayoutAlgorithm },
}

#[derive(Debug)]
enum SessionTask {
    Anchors(LayoutPositions),
    Relayout(LayoutAlgorithm),
}

struct ActiveLayout {
    algorithm: LayoutAlgorithm,
    generation: u64,
    model: GraphModel,
    positions: LayoutPositions,
    anchors: HashMap<EdgeId, AnchorAssignment>,
}

pub struct LayoutSession {
    canvas: Canvas,
    config: LayoutConfig,
    anchor_debounce: Duration,
    router: AnchorRouter,
    bundler: EdgeBundler,
    assessor: LayoutQualityAssessor,
    scheduler: Scheduler<TaskClass, SessionTask>,
    active: Option<ActiveLayout>,
    events: EventBus,
    anchor_runs: usize,
}

impl LayoutSession {
    pub fn new(canvas: Canvas, config: LayoutConfig, anchor_debounce: Duration, events: EventBus) -> Self {
        Self {
            canvas,
            config,
            anchor_debounce,
            router: AnchorRouter::default(),
            bundler: EdgeBundler::default(),
            assessor: LayoutQualityAssessor::default(),
            scheduler: Scheduler::new(),
            active: None,
            events,
            anchor_runs: 0,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn algorithm(&self) -> Option<LayoutAlgorithm> {
        self.active.as_ref().map(|a| a.algorithm)
    }

    /// Current positions keyed by station, if a layout is active.
    pub fn positions(&self) -> Option<BTreeMap<StationId, Vec2>> {
        self.active
            .as_ref()
            .map(|a| a.model.positions_by_id(&a.positions))
    }

    pub fn anchor(&self, edge: &EdgeId) -> Option<AnchorAssignment> {
        self.active.as_ref()?.anchors.get(edge).copied()
    }

    /// Number of anchor recomputations executed by `poll`.
    pub fn anchor_runs(&self) -> usize {
        self.anchor_runs
    }

    pub fn run(&mut self, algorithm: LayoutAlgorithm, service: &TopologyService) -> LayoutOutcome {
        let (generation, snapshot) = service.versioned_snapshot();
        self.run_snapshot(algorithm, snapshot, generation, service)
    }

    /// Lay out a specific snapshot. The result is kept only if `service`
    /// is still at `generation` when the run finishes.
    pub fn run_snapshot(
        &mut self,
        algorithm: LayoutAlgorithm,
        snapshot: Arc<TopologyGraph>,
        generation: u64,
        service: &TopologyService,
    ) -> LayoutOutcome {
        let started = Instant::now();
        let model = GraphModel::from_topology(&snapshot);
        let positions = layouter_for(algorithm, self.config).execute(&model, self.canvas);

        if service.generation() != generation {
            tracing::info!(%algorithm, generation, "Discarding layout of outdated topology");
            self.events.publish(Event::LayoutDiscarded { algorithm });
            self.scheduler
                .schedule(TaskClass::Relayout, SessionTask::Relayout(algorithm), Duration::ZERO);
            return LayoutOutcome::Stale { algorithm };
        }

        let report = self.activate(algorithm, generation, model, positions, started);
        LayoutOutcome::Completed(Box::new(report))
    }

    fn activate(
        &mut self,
        algorithm: LayoutAlgorithm,
        generation: u64,
        model: GraphModel,
        positions: LayoutPositions,
        started: Instant,
    ) -> LayoutReport {
        let anchors = self.router.route_all(&model, &positions);
        let bundles = self.bundler.bundle(&model, &positions);
        let quality = self.assessor.assess(&model, &positions);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            %algorithm,
            nodes = model.node_count(),
            edges = model.edge_count(),
            crossings = quality.crossings,
            score = quality.score,
            grade = %quality.grade,
            elapsed_ms,
            "Layout completed"
        );
        self.events.publish(Event::LayoutCompleted {
            algorithm,
            grade: quality.grade.as_char(),
            score: quality.score,
        });

        // A fresh layout supersedes any anchor work queued for the old one.
        self.scheduler.cancel(TaskClass::AnchorRecompute);

        let report = LayoutReport {
            algorithm,
            generation,
            positions: model.positions_by_id(&positions),
            anchors: anchors.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            bundles,
            quality,
            elapsed_ms,
        };
        self.active = Some(ActiveLayout {
            algorithm,
            generation,
            model,
            positions,
            anchors,
        });
        report
    }

    pub fn node_moved(&mut self, id: &StationId, position: Vec2) -> bool {
        self.node_moved_at(Instant::now(), id, position)
    }

    /// Move one node and schedule anchor recomputation. Returns `false` when
    /// there is no active layout or the station is unknown.
    pub fn node_moved_at(&mut self, now: Instant, id: &StationId, position: Vec2) -> bool {
        let canvas = self.canvas;
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let Some(idx) = active.model.index_of(id) else {
            return false;
        };
        active.positions.insert(idx, canvas.clamp(position));
        self.scheduler.schedule_at(
            now,
            TaskClass::AnchorRecompute,
            SessionTask::Anchors(active.positions.clone()),
            self.anchor_debounce,
        );
        true
    }

    pub fn poll(&mut self, service: &TopologyService) -> usize {
        self.poll_at(Instant::now(), service)
    }

    /// Execute every due task. Returns how many ran.
    pub fn poll_at(&mut self, now: Instant, service: &TopologyService) -> usize {
        let due = self.scheduler.poll_at(now);
        let count = due.len();
        for (_, task) in due {
            match task {
                SessionTask::Anchors(positions) => self.recompute_anchors(&positions),
                SessionTask::Relayout(algorithm) => {
                    self.run(algorithm, service);
                }
            }
        }
        count
    }

    fn recompute_anchors(&mut self, positions: &LayoutPositions) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.anchors = self.router.route_all(&active.model, positions);
        self.anchor_runs += 1;
        tracing::debug!(edges = active.anchors.len(), "Anchors recomputed");
        self.events.publish(Event::AnchorsRecomputed {
            edge_count: active.anchors.len(),
        });
    }

    /// Persist the active layout. Errors when nothing has been laid out yet.
    pub fn save_layout(&self, store: &dyn LayoutStore) -> Result<SavedLayout> {
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| anyhow!("No layout to save; run a layout first"))?;
        let layout = SavedLayout::new(active.algorithm, active.model.positions_by_id(&active.positions));
        store.save(&layout)?;
        self.events.publish(Event::LayoutSaved {
            algorithm: layout.algorithm,
            node_count: layout.node_count,
        });
        Ok(layout)
    }

    /// Load the saved layout for `algorithm` onto the current topology.
    /// `Ok(None)` when nothing was saved. Positions of stations that no
    /// longer exist are dropped; stations the snapshot does not cover are
    /// placed by the hub layout.
    pub fn restore_layout(
        &mut self,
        store: &dyn LayoutStore,
        algorithm: LayoutAlgorithm,
        service: &TopologyService,
    ) -> Result<Option<LayoutReport>> {
        let Some(saved) = store.restore(algorithm)? else {
            tracing::info!(%algorithm, "No saved layout");
            return Ok(None);
        };

        let started = Instant::now();
        let (generation, snapshot) = service.versioned_snapshot();
        let model = GraphModel::from_topology(&snapshot);

        let mut positions = model.positions_from_ids(&saved.positions);
        let dropped = saved.positions.len() - positions.len();
        if dropped > 0 {
            tracing::info!(dropped, "Dropped saved positions for unknown stations");
        }
        if positions.len() < model.node_count() {
            let fallback = HubLayouter.execute(&model, self.canvas);
            for (idx, p) in fallback {
                positions.entry(idx).or_insert(p);
            }
        }
        for p in positions.values_mut() {
            *p = self.canvas.clamp(*p);
        }

        Ok(Some(self.activate(algorithm, generation, model, positions, started)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax25map_index::BuilderOptions;
    use ax25map_project::MemoryLayoutStore;

    const LOG: [&str; 3] = [
        "fm K6FB to BEACON ctl UI",
        "fm AB6BR to TONY via WOODY KJOHN KBERR ctl UI",
        "fm K7BBS to BEACON via HMKR* KRDG* KBANN* KBETH* WOODY* KJOHN* KROCK ctl UI",
    ];
    const DEBOUNCE: Duration = Duration::from_millis(100);

    fn setup() -> (TopologyService, LayoutSession) {
        let events = EventBus::new();
        let service = TopologyService::new(BuilderOptions::default(), events.clone());
        service.ingest_lines(LOG);
        let session = LayoutSession::new(
            Canvas::new(1000.0, 800.0),
            LayoutConfig::seeded(11),
            DEBOUNCE,
            events,
        );
        (service, session)
    }

    #[test]
    fn test_run_reports_every_node() {
        let (service, mut session) = setup();
        let LayoutOutcome::Completed(report) = session.run(LayoutAlgorithm::Hub, &service) else {
            panic!("expected a completed layout");
        };
        assert_eq!(report.positions.len(), service.snapshot().node_count());
        assert_eq!(report.anchors.len(), service.snapshot().edge_count());
        assert_eq!(session.algorithm(), Some(LayoutAlgorithm::Hub));
    }

    #[test]
    fn test_stale_run_is_discarded_and_rescheduled() {
        let (service, mut session) = setup();
        let (generation, snapshot) = service.versioned_snapshot();
        service.ingest_lines(["fm NEW1 to CQ via K6FB ctl UI"]);

        let outcome = session.run_snapshot(LayoutAlgorithm::Spring, snapshot, generation, &service);
        assert!(matches!(outcome, LayoutOutcome::Stale { .. }));
        assert!(session.positions().is_none());

        assert_eq!(session.poll(&service), 1);
        let positions = session.positions().unwrap();
        assert!(positions.contains_key(&StationId::new("NEW1")));
    }

    #[test]
    fn test_drag_burst_recomputes_anchors_once() {
        let (service, mut session) = setup();
        session.run(LayoutAlgorithm::Hub, &service);
        let woody = StationId::new("WOODY");
        let start = Instant::now();

        for (i, x) in [200.0, 260.0, 320.0].into_iter().enumerate() {
            let at = start + Duration::from_millis(20 * i as u64);
            assert!(session.node_moved_at(at, &woody, Vec2::new(x, 600.0)));
        }

        assert_eq!(session.poll_at(start + Duration::from_millis(90), &service), 0);
        assert_eq!(session.poll_at(start + Duration::from_millis(150), &service), 1);
        assert_eq!(session.poll_at(start + Duration::from_secs(5), &service), 0);
        assert_eq!(session.anchor_runs(), 1);

        let positions = session.positions().unwrap();
        assert_eq!(positions[&woody], Vec2::new(320.0, 600.0));
    }

    #[test]
    fn test_node_moved_without_layout_is_ignored() {
        let (_, mut session) = setup();
        assert!(!session.node_moved(&StationId::new("WOODY"), Vec2::ZERO));
    }

    #[test]
    fn test_save_and_restore_drop_unknown_nodes() -> Result<()> {
        let (service, mut session) = setup();
        let store = MemoryLayoutStore::new();
        assert!(session.save_layout(&store).is_err());
        assert!(session.restore_layout(&store, LayoutAlgorithm::Hub, &service)?.is_none());

        session.run(LayoutAlgorithm::Hub, &service);
        let mut saved = session.save_layout(&store)?;
        saved
            .positions
            .insert(StationId::new("GONE"), Vec2::new(10.0, 10.0));
        saved.positions.remove(&StationId::new("K6FB"));
        store.save(&saved)?;

        let report = session
            .restore_layout(&store, LayoutAlgorithm::Hub, &service)?
            .unwrap();
        assert!(!report.positions.contains_key(&StationId::new("GONE")));
        assert!(report.positions.contains_key(&StationId::new("K6FB")));
        assert_eq!(report.positions.len(), service.snapshot().node_count());
        assert_eq!(
            report.positions[&StationId::new("WOODY")],
            saved.positions[&StationId::new("WOODY")]
        );
        Ok(())
    }
}
