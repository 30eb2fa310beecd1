use crate::geometry::{Rect, Vec2};
use crate::graph::{GraphModel, LayoutPositions, NodeIndex};
use crate::quality::{LayoutQuality, LayoutQualityAssessor};
use ax25map_events::LayoutAlgorithm;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, TAU};
use thiserror::Error;

/// Spreads coincident nodes apart deterministically.
const GOLDEN_ANGLE: f32 = 2.399_963;
const MIN_DISTANCE: f32 = 0.01;

/// Computes a position for every node of a snapshot on a given canvas.
pub trait Layouter {
    fn algorithm(&self) -> LayoutAlgorithm;

    fn execute(&self, model: &GraphModel, canvas: Canvas) -> LayoutPositions;
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Canvas size must be finite and positive, got {width}x{height}")]
pub struct InvalidCanvas {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}

impl Canvas {
    pub const DEFAULT_MARGIN: f32 = 50.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin: Self::DEFAULT_MARGIN,
        }
    }

    /// Like [`Canvas::new`] for sizes that come from users.
    pub fn try_new(width: f32, height: f32) -> Result<Self, InvalidCanvas> {
        let usable = |side: f32| side.is_finite() && side > 0.0;
        if usable(width) && usable(height) {
            Ok(Self::new(width, height))
        } else {
            Err(InvalidCanvas { width, height })
        }
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// The area nodes may occupy. Collapses to the center line on an axis
    /// narrower than twice the margin.
    pub fn inner(&self) -> Rect {
        let (min_x, max_x) = Self::axis_bounds(self.width, self.margin);
        let (min_y, max_y) = Self::axis_bounds(self.height, self.margin);
        Rect::from_min_max(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    fn axis_bounds(dimension: f32, margin: f32) -> (f32, f32) {
        if dimension - margin < margin {
            (dimension * 0.5, dimension * 0.5)
        } else {
            (margin, dimension - margin)
        }
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        if !point.is_finite() {
            return self.inner().center();
        }
        let inner = self.inner();
        Vec2::new(
            point.x.clamp(inner.min.x, inner.max.x),
            point.y.clamp(inner.min.y, inner.max.y),
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.inner().contains(point)
    }

    fn random_point(&self, rng: &mut StdRng) -> Vec2 {
        let inner = self.inner();
        Vec2::new(
            random_between(rng, inner.min.x, inner.max.x),
            random_between(rng, inner.min.y, inner.max.y),
        )
    }
}

fn random_between(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

/// Shared tuning for all layouters. A fixed seed makes runs reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub seed: Option<u64>,
}

impl LayoutConfig {
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

pub fn layouter_for(algorithm: LayoutAlgorithm, config: LayoutConfig) -> Box<dyn Layouter + Send + Sync> {
    match algorithm {
        LayoutAlgorithm::ForceDirected => Box::new(ForceDirectedLayouter::new(config)),
        LayoutAlgorithm::Spring => Box::new(SpringLayouter::new(config)),
        LayoutAlgorithm::Hub => Box::new(HubLayouter),
    }
}

fn into_positions(points: Vec<Vec2>) -> LayoutPositions {
    points
        .into_iter()
        .enumerate()
        .map(|(i, p)| (NodeIndex(i), p))
        .collect()
}

/// Row-major grid of `count` cell centres filling `area`.
pub fn grid_positions(count: usize, area: Rect) -> Vec<Vec2> {
    if count == 0 {
        return Vec::new();
    }
    let cols = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    let cell_w = area.width() / cols as f32;
    let cell_h = area.height() / rows as f32;

    (0..count)
        .map(|i| {
            let (col, row) = (i % cols, i / cols);
            Vec2::new(
                area.min.x + (col as f32 + 0.5) * cell_w,
                area.min.y + (row as f32 + 0.5) * cell_h,
            )
        })
        .collect()
}

/// Fruchterman-Reingold with importance-weighted forces and periodic
/// quality checkpoints that shake the layout out of bad local optima.
#[derive(Debug, Clone)]
pub struct ForceDirectedLayouter {
    pub iterations: usize,
    pub checkpoint_interval: usize,
    pub max_crossings: usize,
    pub max_overlap: f32,
    pub config: LayoutConfig,
}

impl ForceDirectedLayouter {
    pub const DEFAULT_ITERATIONS: usize = 500;
    pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 100;

    pub fn new(config: LayoutConfig) -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            checkpoint_interval: Self::DEFAULT_CHECKPOINT_INTERVAL,
            max_crossings: 5,
            max_overlap: 200.0,
            config,
        }
    }

    /// Checkpoint rule: too many crossings or too much node crowding.
    fn needs_perturbation(&self, quality: &LayoutQuality) -> bool {
        quality.crossings > self.max_crossings || quality.overlap_penalty > self.max_overlap
    }

    /// Push apart every pair closer than `min_separation`, then jitter by a
    /// tenth of the current temperature.
    fn perturb(
        &self,
        pos: &mut [Vec2],
        rng: &mut StdRng,
        temperature: f32,
        min_separation: f32,
        canvas: Canvas,
    ) {
        let n = pos.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let delta = pos[i] - pos[j];
                let dist = delta.length();
                if dist >= min_separation {
                    continue;
                }
                let dir = if dist > MIN_DISTANCE {
                    delta * (1.0 / dist)
                } else {
                    Vec2::from_angle(rng.gen_range(0.0..TAU))
                };
                let push = (min_separation - dist) * 0.5;
                pos[i] += dir * push;
                pos[j] -= dir * push;
            }
        }

        let jitter = temperature * 0.1;
        for p in pos.iter_mut() {
            if jitter > 0.0 {
                *p += Vec2::new(
                    rng.gen_range(-jitter..jitter),
                    rng.gen_range(-jitter..jitter),
                );
            }
            *p = canvas.clamp(*p);
        }
    }
}

impl Layouter for ForceDirectedLayouter {
    fn algorithm(&self) -> LayoutAlgorithm {
        LayoutAlgorithm::ForceDirected
    }

    fn execute(&self, model: &GraphModel, canvas: Canvas) -> LayoutPositions {
        let n = model.node_count();
        if n == 0 {
            return LayoutPositions::new();
        }

        let mut rng = self.config.rng();
        let inner = canvas.inner();
        let area = (inner.width() * inner.height()).max(1.0);
        let k = (area / n as f32).sqrt();
        let k_sq = k * k;
        let importance = model.importance();
        let center = canvas.center();
        let assessor = LayoutQualityAssessor::default();
        let initial_temperature = canvas.width / 10.0;

        let mut pos: Vec<Vec2> = (0..n).map(|_| canvas.random_point(&mut rng)).collect();

        for iteration in 0..self.iterations {
            let temperature =
                initial_temperature * (1.0 - iteration as f32 / self.iterations as f32);
            let mut disp = vec![Vec2::ZERO; n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let delta = pos[i] - pos[j];
                    let dist = delta.length();
                    let dir = if dist > MIN_DISTANCE {
                        delta * (1.0 / dist)
                    } else {
                        Vec2::from_angle((i * n + j) as f32 * GOLDEN_ANGLE)
                    };
                    let force =
                        k_sq * (importance[i] * importance[j]).sqrt() / dist.max(MIN_DISTANCE);
                    disp[i] += dir * force;
                    disp[j] -= dir * force;
                }
            }

            for edge in model.edges() {
                let (s, t) = (edge.source_idx.0, edge.target_idx.0);
                let delta = pos[t] - pos[s];
                let dist = delta.length().max(MIN_DISTANCE);
                let ideal = k * (1.0 + 0.25 * (1.0 + edge.count as f32).ln());
                let force = dist * dist / ideal;
                let dir = delta * (1.0 / dist);
                disp[s] += dir * force;
                disp[t] -= dir * force;
            }

            for (i, node) in model.nodes().iter().enumerate() {
                if node.hearable {
                    disp[i] += (center - pos[i]).normalized() * (0.05 * temperature);
                }
            }

            for i in 0..n {
                let max_step = temperature / importance[i].sqrt();
                let len = disp[i].length();
                if len > f32::EPSILON && max_step > 0.0 {
                    pos[i] += disp[i] * (len.min(max_step) / len);
                }
                pos[i] = canvas.clamp(pos[i]);
            }

            let done = iteration + 1;
            if self.checkpoint_interval > 0
                && done % self.checkpoint_interval == 0
                && done < self.iterations
            {
                let snapshot = into_positions(pos.clone());
                let quality = assessor.assess(model, &snapshot);
                if self.needs_perturbation(&quality) {
                    tracing::debug!(
                        iteration = done,
                        crossings = quality.crossings,
                        overlap = quality.overlap_penalty,
                        "Perturbing force-directed layout"
                    );
                    self.perturb(
                        &mut pos,
                        &mut rng,
                        temperature,
                        assessor.overlap_threshold,
                        canvas,
                    );
                }
            }
        }

        into_positions(pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringPhase {
    pub iterations: usize,
    pub repulsion: f32,
    pub attraction: f32,
    /// Step cap as a fraction of the canvas step scale.
    pub temperature: f32,
    /// Extra gap, in pixels, required between node boxes.
    pub min_separation: f32,
}

impl SpringPhase {
    pub const fn new(
        iterations: usize,
        repulsion: f32,
        attraction: f32,
        temperature: f32,
        min_separation: f32,
    ) -> Self {
        Self {
            iterations,
            repulsion,
            attraction,
            temperature,
            min_separation,
        }
    }
}

/// Multi-phase spring embedder with momentum and overlap-boosted repulsion,
/// seeded from a jittered grid.
#[derive(Debug, Clone)]
pub struct SpringLayouter {
    pub phases: Vec<SpringPhase>,
    pub overlap_boost: f32,
    pub momentum: f32,
    pub config: LayoutConfig,
}

impl SpringLayouter {
    pub const DEFAULT_PHASES: [SpringPhase; 3] = [
        SpringPhase::new(200, 1.0, 1.0, 1.0, 40.0),
        SpringPhase::new(120, 0.6, 0.8, 0.5, 30.0),
        SpringPhase::new(60, 0.3, 0.6, 0.25, 20.0),
    ];

    pub fn new(config: LayoutConfig) -> Self {
        Self {
            phases: Self::DEFAULT_PHASES.to_vec(),
            overlap_boost: 3.0,
            momentum: 0.8,
            config,
        }
    }

    fn seed_grid(&self, n: usize, canvas: Canvas, rng: &mut StdRng) -> Vec<Vec2> {
        let inner = canvas.inner();
        let cols = (n as f32).sqrt().ceil() as usize;
        let rows = n.div_ceil(cols);
        let jitter_x = inner.width() / cols as f32 * 0.2;
        let jitter_y = inner.height() / rows as f32 * 0.2;

        grid_positions(n, inner)
            .into_iter()
            .map(|p| {
                canvas.clamp(Vec2::new(
                    p.x + random_between(rng, -jitter_x, jitter_x),
                    p.y + random_between(rng, -jitter_y, jitter_y),
                ))
            })
            .collect()
    }
}

impl Layouter for SpringLayouter {
    fn algorithm(&self) -> LayoutAlgorithm {
        LayoutAlgorithm::Spring
    }

    fn execute(&self, model: &GraphModel, canvas: Canvas) -> LayoutPositions {
        let n = model.node_count();
        if n == 0 {
            return LayoutPositions::new();
        }

        let mut rng = self.config.rng();
        let mut pos = self.seed_grid(n, canvas, &mut rng);
        let mut velocity = vec![Vec2::ZERO; n];

        let inner = canvas.inner();
        let length = (inner.width() * inner.height() / n as f32).sqrt().max(1.0);
        let step_scale = canvas.width.min(canvas.height) * 0.05;
        let half_diagonal: Vec<f32> = model.nodes().iter().map(|n| n.size.length() * 0.5).collect();

        for phase in &self.phases {
            let max_step = phase.temperature * step_scale;
            for _ in 0..phase.iterations {
                let mut force = vec![Vec2::ZERO; n];

                for i in 0..n {
                    for j in (i + 1)..n {
                        let delta = pos[i] - pos[j];
                        let raw = delta.length();
                        let dist = raw.max(MIN_DISTANCE);
                        let dir = if raw > MIN_DISTANCE {
                            delta * (1.0 / raw)
                        } else {
                            Vec2::from_angle((i * n + j) as f32 * GOLDEN_ANGLE)
                        };
                        let mut f = phase.repulsion * length * length * length / (dist * dist);
                        if dist < half_diagonal[i] + half_diagonal[j] + phase.min_separation {
                            f *= self.overlap_boost;
                        }
                        force[i] += dir * f;
                        force[j] -= dir * f;
                    }
                }

                for edge in model.edges() {
                    let (s, t) = (edge.source_idx.0, edge.target_idx.0);
                    let delta = pos[t] - pos[s];
                    let dist = delta.length();
                    if dist < MIN_DISTANCE {
                        continue;
                    }
                    let degree_sum = (model.nodes()[s].degree + model.nodes()[t].degree) as f32;
                    let ideal = length * (0.6 + 0.1 * degree_sum);
                    let f = phase.attraction * (dist - ideal);
                    let dir = delta * (1.0 / dist);
                    force[s] += dir * f;
                    force[t] -= dir * f;
                }

                for i in 0..n {
                    let mut v = velocity[i] * self.momentum + force[i] * (1.0 - self.momentum);
                    let speed = v.length();
                    if speed > max_step {
                        v = v * (max_step / speed);
                    }
                    velocity[i] = v;
                    pos[i] = canvas.clamp(pos[i] + v);
                }
            }
        }

        into_positions(pos)
    }
}

/// Non-physical placement: hearable stations on a horizontal line through
/// the centre, their relay-only neighbours fanned around them, everything
/// else in a band along the bottom.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubLayouter;

impl HubLayouter {
    const MIN_FAN_RADIUS: f32 = 40.0;
    const BOTTOM_BAND: f32 = 0.15;
}

impl Layouter for HubLayouter {
    fn algorithm(&self) -> LayoutAlgorithm {
        LayoutAlgorithm::Hub
    }

    fn execute(&self, model: &GraphModel, canvas: Canvas) -> LayoutPositions {
        if model.is_empty() {
            return LayoutPositions::new();
        }
        let inner = canvas.inner();

        let hubs: Vec<NodeIndex> = model.node_indices().filter(|&i| model[i].hearable).collect();
        if hubs.is_empty() {
            return into_positions(
                grid_positions(model.node_count(), inner)
                    .into_iter()
                    .map(|p| canvas.clamp(p))
                    .collect(),
            );
        }

        let mut positions = LayoutPositions::with_capacity(model.node_count());
        let mut placed: HashSet<NodeIndex> = HashSet::new();

        let spacing = inner.width() / (hubs.len() + 1) as f32;
        let line_y = canvas.center().y;
        for (i, &hub) in hubs.iter().enumerate() {
            positions.insert(hub, Vec2::new(inner.min.x + spacing * (i + 1) as f32, line_y));
            placed.insert(hub);
        }

        let base_radius = (spacing * 0.45)
            .min(inner.height() * 0.35)
            .max(Self::MIN_FAN_RADIUS);
        for &hub in &hubs {
            let origin = positions[&hub];
            let fan: Vec<NodeIndex> = model
                .neighbors(hub)
                .iter()
                .copied()
                .filter(|n| !model[*n].hearable && !placed.contains(n))
                .collect();
            let count = fan.len();
            for (j, leaf) in fan.into_iter().enumerate() {
                let angle = -FRAC_PI_2 + TAU * j as f32 / count as f32;
                let radius = base_radius * (1.0 + 0.3 * (j % 3) as f32);
                positions.insert(leaf, origin + Vec2::from_angle(angle) * radius);
                placed.insert(leaf);
            }
        }

        let rest: Vec<NodeIndex> = model.node_indices().filter(|i| !placed.contains(i)).collect();
        let band = Rect::from_min_max(
            Vec2::new(inner.min.x, inner.max.y - inner.height() * Self::BOTTOM_BAND),
            inner.max,
        );
        let slots = grid_positions(rest.len(), band);
        for (idx, p) in rest.into_iter().zip(slots) {
            positions.insert(idx, p);
        }

        for p in positions.values_mut() {
            *p = canvas.clamp(*p);
        }
        positions
    }
}
