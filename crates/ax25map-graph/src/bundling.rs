use crate::geometry::Vec2;
use crate::graph::{GraphModel, LayoutPositions};
use ax25map_core::EdgeId;
use serde::{Deserialize, Serialize};

/// Edges drawn as one visual bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBundleGroup {
    pub edge_ids: Vec<EdgeId>,
    /// Mean undirected direction in degrees, `[0, 180)`.
    pub mean_angle: f32,
    pub centroid: Vec2,
    pub thickness: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleResult {
    pub bundles: Vec<EdgeBundleGroup>,
    pub unbundled: Vec<EdgeId>,
}

/// Stroke width for a bundle of `edge_count` edges: `min(log2(n) + 1, 6)`.
pub fn calculate_thickness(edge_count: usize) -> f32 {
    const BASE_WIDTH: f32 = 1.0;
    const MAX_WIDTH: f32 = 6.0;

    if edge_count <= 1 {
        BASE_WIDTH
    } else {
        ((edge_count as f32).log2() + BASE_WIDTH).min(MAX_WIDTH)
    }
}

/// Groups near-parallel, nearby edges. Reads positions only.
#[derive(Debug, Clone, Copy)]
pub struct EdgeBundler {
    pub angle_tolerance_deg: f32,
    pub midpoint_radius: f32,
}

impl Default for EdgeBundler {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: 30.0,
            midpoint_radius: 60.0,
        }
    }
}

struct Segment {
    id: EdgeId,
    angle: f32,
    midpoint: Vec2,
}

impl EdgeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundle(&self, model: &GraphModel, positions: &LayoutPositions) -> BundleResult {
        let segments: Vec<Segment> = model
            .edges()
            .iter()
            .filter_map(|edge| {
                let a = *positions.get(&edge.source_idx)?;
                let b = *positions.get(&edge.target_idx)?;
                Some(Segment {
                    id: edge.id.clone(),
                    angle: (b - a).angle().to_degrees().rem_euclid(180.0),
                    midpoint: (a + b) * 0.5,
                })
            })
            .collect();

        // Greedy: each edge joins the first group whose leader it matches.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            let home = groups.iter_mut().find(|group| {
                let leader = &segments[group[0]];
                self.is_compatible(leader, segment)
            });
            match home {
                Some(group) => group.push(i),
                None => groups.push(vec![i]),
            }
        }

        let mut result = BundleResult::default();
        for group in groups {
            if group.len() < 2 {
                result.unbundled.extend(group.iter().map(|&i| segments[i].id.clone()));
                continue;
            }
            let members: Vec<&Segment> = group.iter().map(|&i| &segments[i]).collect();
            result.bundles.push(EdgeBundleGroup {
                edge_ids: members.iter().map(|s| s.id.clone()).collect(),
                mean_angle: Self::mean_axial_angle(&members),
                centroid: members.iter().fold(Vec2::ZERO, |acc, s| acc + s.midpoint)
                    * (1.0 / members.len() as f32),
                thickness: calculate_thickness(members.len()),
            });
        }

        tracing::debug!(
            bundles = result.bundles.len(),
            unbundled = result.unbundled.len(),
            "Edges bundled"
        );
        result
    }

    fn is_compatible(&self, a: &Segment, b: &Segment) -> bool {
        let diff = (a.angle - b.angle).abs() % 180.0;
        diff.min(180.0 - diff) < self.angle_tolerance_deg
            && a.midpoint.distance(b.midpoint) <= self.midpoint_radius
    }

    /// Circular mean of undirected angles (doubled-angle method).
    fn mean_axial_angle(members: &[&Segment]) -> f32 {
        let sum = members.iter().fold(Vec2::ZERO, |acc, s| {
            acc + Vec2::from_angle((s.angle * 2.0).to_radians())
        });
        (sum.angle().to_degrees() * 0.5).rem_euclid(180.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ax25map_core::StationId;
    use crate::test_support::model_from_links;

    fn setup(coords: &[(&str, f32, f32)]) -> (GraphModel, LayoutPositions) {
        let model = model_from_links(&[("A1", "B1"), ("C1", "D1"), ("E1", "F1")]);
        let positions = coords
            .iter()
            .map(|&(id, x, y)| (model.index_of(&StationId::new(id)).unwrap(), Vec2::new(x, y)))
            .collect();
        (model, positions)
    }

    #[test]
    fn test_parallel_close_edges_bundle() {
        let (model, positions) = setup(&[
            ("A1", 100.0, 100.0),
            ("B1", 300.0, 100.0),
            ("C1", 100.0, 120.0),
            ("D1", 300.0, 125.0),
            // Perpendicular edge through the same area.
            ("E1", 200.0, 0.0),
            ("F1", 200.0, 250.0),
        ]);

        let result = EdgeBundler::default().bundle(&model, &positions);
        assert_eq!(result.bundles.len(), 1);
        let bundle = &result.bundles[0];
        assert_eq!(bundle.edge_ids.len(), 2);
        assert_eq!(bundle.thickness, 2.0);
        assert!(bundle.mean_angle < 5.0 || bundle.mean_angle > 175.0);
        assert_eq!(result.unbundled, vec![EdgeId("E1->F1".into())]);
    }

    #[test]
    fn test_opposite_directions_count_as_parallel() {
        let (model, positions) = setup(&[
            ("A1", 100.0, 100.0),
            ("B1", 300.0, 100.0),
            ("C1", 300.0, 110.0),
            ("D1", 100.0, 110.0),
            ("E1", 700.0, 700.0),
            ("F1", 750.0, 700.0),
        ]);
        let result = EdgeBundler::default().bundle(&model, &positions);
        assert_eq!(result.bundles.len(), 1);
        assert_eq!(result.bundles[0].edge_ids.len(), 2);
    }

    #[test]
    fn test_distant_edges_stay_apart() {
        let (model, positions) = setup(&[
            ("A1", 0.0, 0.0),
            ("B1", 100.0, 0.0),
            ("C1", 0.0, 500.0),
            ("D1", 100.0, 500.0),
            ("E1", 0.0, 900.0),
            ("F1", 100.0, 900.0),
        ]);
        let result = EdgeBundler::default().bundle(&model, &positions);
        assert!(result.bundles.is_empty());
        assert_eq!(result.unbundled.len(), 3);
    }

    #[test]
    fn test_thickness_scale() {
        assert_eq!(calculate_thickness(1), 1.0);
        assert_eq!(calculate_thickness(2), 2.0);
        assert_eq!(calculate_thickness(4), 3.0);
        assert_eq!(calculate_thickness(1000), 6.0);
    }
}
