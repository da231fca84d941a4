//! Graph plus layout positions and opacity tables.

use glam::Vec3;
use nebula_graph::{Adjacency, EntityId, GraphNode, SimilarityGraph};

use crate::layout::Layout;

/// Scene state for one graph version.
#[derive(Debug, Clone)]
pub struct GraphScene {
    graph: SimilarityGraph,
    adjacency: Adjacency,
    positions: Vec<Vec3>,
    node_opacity: Vec<f32>,
    link_opacity: Vec<f32>,
    node_scale: f32,
    version: u64,
}

impl GraphScene {
    /// Lay out `graph` and derive its lookup tables.
    ///
    /// `node_scale` converts a node's abstract size into world units.
    pub fn new(graph: SimilarityGraph, layout: &mut dyn Layout, node_scale: f32) -> Self {
        let mut scene = Self {
            graph: SimilarityGraph::default(),
            adjacency: Adjacency::default(),
            positions: Vec::new(),
            node_opacity: Vec::new(),
            link_opacity: Vec::new(),
            node_scale,
            version: 0,
        };
        scene.install(graph, layout);
        scene
    }

    /// Swap in a new graph version. Opacity resets to fully visible.
    pub fn replace_graph(&mut self, graph: SimilarityGraph, layout: &mut dyn Layout) {
        self.install(graph, layout);
        self.version += 1;
    }

    fn install(&mut self, graph: SimilarityGraph, layout: &mut dyn Layout) {
        let mut positions = layout.positions(&graph);
        positions.resize(graph.nodes.len(), Vec3::ZERO);

        self.adjacency = Adjacency::from_graph(&graph);
        self.node_opacity = vec![1.0; graph.nodes.len()];
        self.link_opacity = vec![1.0; graph.links.len()];
        self.positions = positions;
        self.graph = graph;

        tracing::debug!(
            nodes = self.graph.nodes.len(),
            links = self.graph.links.len(),
            version = self.version,
            "scene installed"
        );
    }

    /// Advance an iterative layout by one step. Returns whether positions moved.
    pub fn step_layout(&mut self, layout: &mut dyn Layout) -> bool {
        layout.step(&self.graph, &mut self.positions)
    }

    #[must_use]
    pub fn graph(&self) -> &SimilarityGraph {
        &self.graph
    }

    #[must_use]
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.nodes.len()
    }

    #[must_use]
    pub fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.adjacency.index_of(id)
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.graph.nodes.get(index)
    }

    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[must_use]
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    /// Node size in world units.
    #[must_use]
    pub fn world_size(&self, index: usize) -> f32 {
        self.graph
            .nodes
            .get(index)
            .map_or(0.0, |n| n.size * self.node_scale)
    }

    #[must_use]
    pub fn node_opacity(&self, index: usize) -> f32 {
        self.node_opacity.get(index).copied().unwrap_or(1.0)
    }

    #[must_use]
    pub fn link_opacity(&self, index: usize) -> f32 {
        self.link_opacity.get(index).copied().unwrap_or(1.0)
    }

    pub fn set_node_opacity(&mut self, index: usize, opacity: f32) {
        if let Some(slot) = self.node_opacity.get_mut(index) {
            *slot = opacity;
        }
    }

    pub fn set_link_opacity(&mut self, index: usize, opacity: f32) {
        if let Some(slot) = self.link_opacity.get_mut(index) {
            *slot = opacity;
        }
    }

    /// Every node and link back to fully visible.
    pub fn restore_opacity(&mut self) {
        self.node_opacity.fill(1.0);
        self.link_opacity.fill(1.0);
    }

    /// Link endpoints as node indices, skipping links outside the node set.
    pub fn link_endpoints(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.graph.links.iter().enumerate().filter_map(|(i, l)| {
            Some((
                i,
                self.adjacency.index_of(&l.source)?,
                self.adjacency.index_of(&l.target)?,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SphericalLayout;
    use nebula_graph::{Entity, GraphOptions, build_graph};

    fn sample_graph() -> SimilarityGraph {
        let entities = vec![
            Entity::new("1", "one").with_vector(vec![1.0, 0.0]).with_rating(8.0),
            Entity::new("2", "two").with_vector(vec![1.0, 0.0]),
            Entity::new("3", "three").with_vector(vec![0.0, 1.0]),
        ];
        build_graph(&entities, &GraphOptions::default())
    }

    #[test]
    fn test_new_scene_fully_visible() {
        let scene = GraphScene::new(sample_graph(), &mut SphericalLayout::new(10.0), 2.0);
        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.positions().len(), 3);
        assert!((0..3).all(|i| scene.node_opacity(i) == 1.0));
        assert_eq!(scene.link_opacity(0), 1.0);
        assert_eq!(scene.world_size(0), 10.0);
    }

    #[test]
    fn test_replace_graph_bumps_version_and_resets() {
        let mut layout = SphericalLayout::new(10.0);
        let mut scene = GraphScene::new(sample_graph(), &mut layout, 1.0);
        scene.set_node_opacity(1, 0.1);
        scene.replace_graph(sample_graph(), &mut layout);
        assert_eq!(scene.version(), 1);
        assert_eq!(scene.node_opacity(1), 1.0);
    }

    #[test]
    fn test_link_endpoints() {
        let scene = GraphScene::new(sample_graph(), &mut SphericalLayout::new(1.0), 1.0);
        let endpoints: Vec<_> = scene.link_endpoints().collect();
        assert_eq!(endpoints, vec![(0, 0, 1), (1, 2, 0)]);
    }

    #[test]
    fn test_out_of_range_accessors() {
        let scene = GraphScene::new(SimilarityGraph::default(), &mut SphericalLayout::new(1.0), 1.0);
        assert_eq!(scene.position(4), None);
        assert_eq!(scene.world_size(4), 0.0);
        assert_eq!(scene.node_opacity(4), 1.0);
    }
}
