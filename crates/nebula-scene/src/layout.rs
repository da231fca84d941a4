//! Node placement.
//!
//! Force-directed simulation is an external concern; anything that can
//! produce positions for a graph plugs in through [`Layout`].

use std::f32::consts::PI;

use glam::Vec3;
use nebula_graph::SimilarityGraph;

/// Source of node positions.
pub trait Layout {
    /// Initial positions, one per node in graph order.
    fn positions(&mut self, graph: &SimilarityGraph) -> Vec<Vec3>;

    /// Advance an iterative layout. Static layouts never move.
    fn step(&mut self, _graph: &SimilarityGraph, _positions: &mut [Vec3]) -> bool {
        false
    }
}

/// Fibonacci-sphere placement.
///
/// Nodes are spread evenly over a sphere in graph order; search results are
/// pulled inward by relevance so the best hits sit closest to the centre.
#[derive(Debug, Clone)]
pub struct SphericalLayout {
    radius: f32,
}

impl SphericalLayout {
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

impl Layout for SphericalLayout {
    fn positions(&mut self, graph: &SimilarityGraph) -> Vec<Vec3> {
        let n = graph.nodes.len();
        let golden_angle = PI * (3.0 - 5.0f32.sqrt());

        graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
                let ring = (1.0 - y * y).max(0.0).sqrt();
                let theta = golden_angle * i as f32;
                let shell = match (node.is_search_result, node.score) {
                    (true, Some(score)) => 1.0 - 0.5 * score.clamp(0.0, 1.0),
                    _ => 1.0,
                };
                Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * self.radius * shell
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_graph::{Entity, GraphNode};

    fn graph_of(n: usize) -> SimilarityGraph {
        SimilarityGraph {
            nodes: (0..n as u64)
                .map(|i| GraphNode::from_entity(&Entity::new(i, "")))
                .collect(),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_positions_on_sphere() {
        let positions = SphericalLayout::new(50.0).positions(&graph_of(64));
        assert_eq!(positions.len(), 64);
        for p in &positions {
            assert!((p.length() - 50.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_positions_are_distinct() {
        let positions = SphericalLayout::new(10.0).positions(&graph_of(32));
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance(*b) > 1e-3);
            }
        }
    }

    #[test]
    fn test_search_results_pulled_inward() {
        let mut graph = graph_of(2);
        graph.nodes[1].is_search_result = true;
        graph.nodes[1].score = Some(1.0);
        let positions = SphericalLayout::new(10.0).positions(&graph);
        assert!((positions[0].length() - 10.0).abs() < 1e-3);
        assert!((positions[1].length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_static_layout_never_steps() {
        let graph = graph_of(3);
        let mut layout = SphericalLayout::new(1.0);
        let mut positions = layout.positions(&graph);
        assert!(!layout.step(&graph, &mut positions));
    }
}
