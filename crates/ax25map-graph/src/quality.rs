//! Scoring of a finished drawing: edge crossings, node crowding and how
//! evenly edges fan out around each node.

use crate::geometry::Vec2;
use crate::graph::{GraphModel, LayoutPositions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_score(score: f32) -> Self {
        if score < 50.0 {
            Grade::A
        } else if score < 100.0 {
            Grade::B
        } else if score < 200.0 {
            Grade::C
        } else {
            Grade::D
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutQuality {
    pub crossings: usize,
    pub overlap_penalty: f32,
    pub angular_resolution: f32,
    pub score: f32,
    pub grade: Grade,
}

impl LayoutQuality {
    pub fn from_parts(crossings: usize, overlap_penalty: f32, angular_resolution: f32) -> Self {
        let score =
            crossings as f32 * 10.0 + overlap_penalty + (4.0 * PI - angular_resolution) * 5.0;
        Self {
            crossings,
            overlap_penalty,
            angular_resolution,
            score,
            grade: Grade::from_score(score),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutQualityAssessor {
    /// Node centres closer than this are penalised.
    pub overlap_threshold: f32,
}

impl Default for LayoutQualityAssessor {
    fn default() -> Self {
        Self {
            overlap_threshold: 50.0,
        }
    }
}

impl LayoutQualityAssessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assess(&self, model: &GraphModel, positions: &LayoutPositions) -> LayoutQuality {
        LayoutQuality::from_parts(
            Self::count_crossings(model, positions),
            self.overlap_penalty(model, positions),
            Self::angular_resolution(model, positions),
        )
    }

    pub fn count_crossings(model: &GraphModel, positions: &LayoutPositions) -> usize {
        let segments: Vec<_> = model
            .edges()
            .iter()
            .filter_map(|e| {
                let a = positions.get(&e.source_idx)?;
                let b = positions.get(&e.target_idx)?;
                Some((e.source_idx, e.target_idx, *a, *b))
            })
            .collect();

        (0..segments.len())
            .into_par_iter()
            .map(|i| {
                let (s1, t1, a1, b1) = segments[i];
                segments[i + 1..]
                    .iter()
                    .filter(|&&(s2, t2, a2, b2)| {
                        let shares_endpoint = s1 == s2 || s1 == t2 || t1 == s2 || t1 == t2;
                        !shares_endpoint && segments_cross(a1, b1, a2, b2)
                    })
                    .count()
            })
            .sum()
    }

    pub fn overlap_penalty(&self, model: &GraphModel, positions: &LayoutPositions) -> f32 {
        let points: Vec<Vec2> = model
            .node_indices()
            .filter_map(|idx| positions.get(&idx).copied())
            .collect();

        let mut penalty = 0.0;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                let d = a.distance(*b);
                if d < self.overlap_threshold {
                    penalty += self.overlap_threshold - d;
                }
            }
        }
        penalty
    }

    /// Sum of angular gaps between consecutive neighbours, averaged over the
    /// nodes with more than one neighbour. Zero when there are none.
    pub fn angular_resolution(model: &GraphModel, positions: &LayoutPositions) -> f32 {
        let mut total = 0.0;
        let mut counted = 0usize;

        for idx in model.node_indices() {
            let neighbours = model.neighbors(idx);
            if neighbours.len() < 2 {
                continue;
            }
            let Some(&center) = positions.get(&idx) else {
                continue;
            };

            let mut angles: Vec<f32> = neighbours
                .iter()
                .filter_map(|n| positions.get(n))
                .map(|&p| (p - center).angle())
                .collect();
            if angles.len() < 2 {
                continue;
            }
            angles.sort_by(f32::total_cmp);

            let mut gaps: f32 = angles.windows(2).map(|w| w[1] - w[0]).sum();
            gaps += angles[0] + TAU - angles[angles.len() - 1];
            total += gaps;
            counted += 1;
        }

        if counted == 0 {
            0.0
        } else {
            total / counted as f32
        }
    }
}

/// Standard parametric segment intersection; parallel segments never cross.
pub fn segments_cross(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let r = p2 - p1;
    let s = p4 - p3;
    let denom = r.cross(s);
    if denom.abs() < 1e-6 {
        return false;
    }
    let qp = p3 - p1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}
