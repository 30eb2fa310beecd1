use crate::geometry::{AnchorSide, Rect, Vec2};
use crate::graph::{GraphModel, LayoutPositions, NodeIndex};
use ax25map_core::EdgeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chosen connection sides for one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorAssignment {
    pub source_side: AnchorSide,
    pub target_side: AnchorSide,
    pub start: Vec2,
    pub end: Vec2,
    /// No side combination avoided every other node box.
    pub obstructed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    source_side: AnchorSide,
    target_side: AnchorSide,
    start: Vec2,
    end: Vec2,
    distance: f32,
    /// `distance` adjusted by the facing bonus or away penalty.
    score: f32,
}

/// Picks, per edge, the pair of box sides that gives the shortest
/// well-facing connector without cutting through other nodes.
#[derive(Debug, Clone, Copy)]
pub struct AnchorRouter {
    pub facing_threshold: f32,
    pub facing_bonus: f32,
    pub away_threshold: f32,
    pub away_penalty: f32,
    /// Obstacles are shrunk by this much so grazing a corner is not a hit.
    pub obstacle_inset: f32,
}

impl Default for AnchorRouter {
    fn default() -> Self {
        Self {
            facing_threshold: 0.7,
            facing_bonus: 0.8,
            away_threshold: -0.3,
            away_penalty: 1.5,
            obstacle_inset: 1.0,
        }
    }
}

impl AnchorRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every side combination, best score first.
    fn candidates(&self, source: &Rect, target: &Rect) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(16);
        for source_side in AnchorSide::ALL {
            for target_side in AnchorSide::ALL {
                let start = source_side.anchor_point(source);
                let end = target_side.anchor_point(target);
                let direction = (end - start).normalized();

                let out_cos = source_side.direction_vector().dot(direction);
                let in_cos = target_side.direction_vector().dot(-direction);

                let distance = start.distance(end);
                let mut score = distance;
                if out_cos > self.facing_threshold && in_cos > self.facing_threshold {
                    score *= self.facing_bonus;
                } else if out_cos < self.away_threshold || in_cos < self.away_threshold {
                    score *= self.away_penalty;
                }

                candidates.push(Candidate {
                    source_side,
                    target_side,
                    start,
                    end,
                    distance,
                    score,
                });
            }
        }
        candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
        candidates
    }

    fn is_blocked(&self, start: Vec2, end: Vec2, obstacles: &[Rect]) -> bool {
        obstacles
            .iter()
            .any(|r| r.expand(-self.obstacle_inset).intersects_segment(start, end))
    }

    /// Route one edge between `source` and `target`, avoiding `obstacles`
    /// (the boxes of every other node). The best-scoring combination wins
    /// when it is clear; otherwise the rest are tried shortest first.
    pub fn route(&self, source: &Rect, target: &Rect, obstacles: &[Rect]) -> AnchorAssignment {
        let mut candidates = self.candidates(source, target);
        let best = candidates[0];

        let (chosen, obstructed) = if !self.is_blocked(best.start, best.end, obstacles) {
            (best, false)
        } else {
            candidates[1..].sort_by(|a, b| a.distance.total_cmp(&b.distance));
            match candidates[1..]
                .iter()
                .find(|c| !self.is_blocked(c.start, c.end, obstacles))
            {
                Some(clear) => (*clear, false),
                None => (best, true),
            }
        };

        AnchorAssignment {
            source_side: chosen.source_side,
            target_side: chosen.target_side,
            start: chosen.start,
            end: chosen.end,
            obstructed,
        }
    }

    /// Route every edge whose endpoints both have positions.
    pub fn route_all(
        &self,
        model: &GraphModel,
        positions: &LayoutPositions,
    ) -> HashMap<EdgeId, AnchorAssignment> {
        let rects = model.rects(positions);
        let mut routes = HashMap::with_capacity(model.edge_count());
        let mut obstacles: Vec<Rect> = Vec::with_capacity(rects.len());

        for edge in model.edges() {
            let (Some(source), Some(target)) =
                (rects.get(&edge.source_idx), rects.get(&edge.target_idx))
            else {
                continue;
            };

            obstacles.clear();
            obstacles.extend(
                rects
                    .iter()
                    .filter(|(idx, _)| !Self::is_endpoint(**idx, edge.source_idx, edge.target_idx))
                    .map(|(_, r)| *r),
            );
            routes.insert(edge.id.clone(), self.route(source, target, &obstacles));
        }

        let obstructed = routes.values().filter(|r| r.obstructed).count();
        if obstructed > 0 {
            tracing::debug!(obstructed, total = routes.len(), "Some edges could not avoid nodes");
        }
        routes
    }

    fn is_endpoint(idx: NodeIndex, source: NodeIndex, target: NodeIndex) -> bool {
        idx == source || idx == target
    }
}
