//! Focus+context hover highlight.
//!
//! Hovering a node focuses it: the node and its neighbours stay opaque, the
//! rest of the graph dims, and every neighbour gets a floating label with
//! its similarity to the focused node. Labels are created through an
//! [`OverlayHost`] and are always disposed before the next set is created.

use std::collections::HashSet;

use glam::Vec3;
use nebula_graph::EntityId;

use crate::scene::GraphScene;

/// Creates and destroys label overlays on behalf of the highlight.
pub trait OverlayHost {
    /// Handle to one live label.
    type Overlay;

    fn spawn_label(&mut self, text: &str, position: Vec3) -> Self::Overlay;

    fn dispose_label(&mut self, overlay: Self::Overlay);
}

/// Highlight state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HighlightState {
    #[default]
    Idle,
    Focused(EntityId),
}

/// Dimming and label placement parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    pub dim_node_opacity: f32,
    pub dim_link_opacity: f32,
    /// Label height above a neighbour, in multiples of its world size.
    pub label_margin: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            dim_node_opacity: 0.12,
            dim_link_opacity: 0.02,
            label_margin: 1.5,
        }
    }
}

/// A live label owned by the highlight.
#[derive(Debug)]
pub struct LabelOverlay<O> {
    /// Neighbour the label floats above.
    pub node: usize,
    pub text: String,
    pub position: Vec3,
    pub handle: O,
}

/// `round(similarity * 100)` followed by `%`.
#[must_use]
pub fn label_text(similarity: f32) -> String {
    format!("{}%", (f64::from(similarity) * 100.0).round() as i64)
}

/// Hover state machine and the overlays it owns.
#[derive(Debug)]
pub struct HighlightController<O> {
    state: HighlightState,
    neighbors: HashSet<usize>,
    overlays: Vec<LabelOverlay<O>>,
    style: HighlightStyle,
}

impl<O> Default for HighlightController<O> {
    fn default() -> Self {
        Self::new(HighlightStyle::default())
    }
}

impl<O> HighlightController<O> {
    #[must_use]
    pub fn new(style: HighlightStyle) -> Self {
        Self {
            state: HighlightState::Idle,
            neighbors: HashSet::new(),
            overlays: Vec::new(),
            style,
        }
    }

    /// Apply a hover event. `None`, or an id not in the scene, means nothing
    /// is hovered.
    ///
    /// Returns whether the state changed. Re-hovering the focused node is a
    /// no-op and keeps its overlays.
    pub fn hover<H>(&mut self, target: Option<&EntityId>, scene: &mut GraphScene, host: &mut H) -> bool
    where
        H: OverlayHost<Overlay = O>,
    {
        let next = target.and_then(|id| scene.index_of(id).map(|index| (id.clone(), index)));

        match (&self.state, &next) {
            (HighlightState::Idle, None) => return false,
            (HighlightState::Focused(current), Some((id, _))) if current == id => return false,
            _ => {}
        }

        self.dispose_overlays(host);

        match next {
            Some((id, index)) => self.focus(id, index, scene, host),
            None => self.enter_idle(scene),
        }
        true
    }

    /// Force `Idle`, disposing overlays and restoring full opacity.
    pub fn reset<H>(&mut self, scene: &mut GraphScene, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        self.dispose_overlays(host);
        self.enter_idle(scene);
    }

    /// Dispose overlays without touching a scene. Used on teardown.
    pub fn dispose<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        self.dispose_overlays(host);
        self.state = HighlightState::Idle;
        self.neighbors.clear();
    }

    fn dispose_overlays<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        for overlay in self.overlays.drain(..) {
            host.dispose_label(overlay.handle);
        }
    }

    fn enter_idle(&mut self, scene: &mut GraphScene) {
        scene.restore_opacity();
        self.neighbors.clear();
        if let HighlightState::Focused(previous) = &self.state {
            tracing::trace!(node = %previous, "highlight cleared");
        }
        self.state = HighlightState::Idle;
    }

    fn focus<H>(&mut self, id: EntityId, index: usize, scene: &mut GraphScene, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        let neighbors = scene.adjacency().neighbors(index).to_vec();
        self.neighbors = neighbors.iter().map(|n| n.node).collect();

        for i in 0..scene.node_count() {
            let lit = i == index || self.neighbors.contains(&i);
            let opacity = if lit { 1.0 } else { self.style.dim_node_opacity };
            scene.set_node_opacity(i, opacity);
        }

        let touching: HashSet<usize> = neighbors.iter().map(|n| n.link).collect();
        for link in 0..scene.graph().links.len() {
            let opacity = if touching.contains(&link) {
                1.0
            } else {
                self.style.dim_link_opacity
            };
            scene.set_link_opacity(link, opacity);
        }

        for neighbor in &neighbors {
            let Some(base) = scene.position(neighbor.node) else {
                continue;
            };
            let lift = scene.world_size(neighbor.node) * self.style.label_margin;
            let position = base + Vec3::Y * lift;
            let text = label_text(neighbor.similarity);
            let handle = host.spawn_label(&text, position);
            self.overlays.push(LabelOverlay {
                node: neighbor.node,
                text,
                position,
                handle,
            });
        }

        tracing::trace!(node = %id, neighbors = neighbors.len(), "highlight focused");
        self.state = HighlightState::Focused(id);
    }

    #[must_use]
    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    #[must_use]
    pub fn focused(&self) -> Option<&EntityId> {
        match &self.state {
            HighlightState::Focused(id) => Some(id),
            HighlightState::Idle => None,
        }
    }

    #[must_use]
    pub fn is_neighbor(&self, index: usize) -> bool {
        self.neighbors.contains(&index)
    }

    #[must_use]
    pub fn overlays(&self) -> &[LabelOverlay<O>] {
        &self.overlays
    }

    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    #[must_use]
    pub fn style(&self) -> HighlightStyle {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SphericalLayout;
    use nebula_graph::{GraphNode, SimilarityGraph, SimilarityLink, SimilarityMethod};

    /// Records every spawn and dispose so tests can check the live set.
    #[derive(Default)]
    struct RecordingHost {
        next: u32,
        live: HashSet<u32>,
        spawned: Vec<String>,
        disposed: Vec<u32>,
    }

    impl OverlayHost for RecordingHost {
        type Overlay = u32;

        fn spawn_label(&mut self, text: &str, _position: Vec3) -> u32 {
            self.next += 1;
            self.live.insert(self.next);
            self.spawned.push(text.to_string());
            self.next
        }

        fn dispose_label(&mut self, overlay: u32) {
            assert!(self.live.remove(&overlay), "double dispose of {overlay}");
            self.disposed.push(overlay);
        }
    }

    fn link(a: &str, b: &str, similarity: f32) -> SimilarityLink {
        SimilarityLink {
            source: EntityId::from(a),
            target: EntityId::from(b),
            similarity,
            method: SimilarityMethod::EmbeddingCosine,
            rescued: false,
        }
    }

    /// hub linked to a (0.8) and b (0.42); c linked to d only.
    fn scene() -> GraphScene {
        let nodes = ["hub", "a", "b", "c", "d"]
            .iter()
            .map(|id| GraphNode::from_entity(&nebula_graph::Entity::new(*id, *id)))
            .collect();
        let graph = SimilarityGraph {
            nodes,
            links: vec![link("hub", "a", 0.8), link("b", "hub", 0.42), link("c", "d", 0.9)],
        };
        GraphScene::new(graph, &mut SphericalLayout::new(10.0), 1.0)
    }

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    #[test]
    fn test_label_text_rounds() {
        assert_eq!(label_text(0.8), "80%");
        assert_eq!(label_text(0.42), "42%");
        assert_eq!(label_text(0.125), "13%");
        assert_eq!(label_text(1.0), "100%");
        assert_eq!(label_text(0.0), "0%");
    }

    #[test]
    fn test_focus_labels_neighbors() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();

        assert!(highlight.hover(Some(&id("hub")), &mut scene, &mut host));
        assert_eq!(highlight.state(), &HighlightState::Focused(id("hub")));
        assert_eq!(host.spawned, vec!["80%", "42%"]);
        assert_eq!(highlight.overlay_count(), 2);
    }

    #[test]
    fn test_focus_dims_context() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();
        highlight.hover(Some(&id("hub")), &mut scene, &mut host);

        for lit in ["hub", "a", "b"] {
            let i = scene.index_of(&id(lit)).unwrap();
            assert_eq!(scene.node_opacity(i), 1.0, "{lit}");
        }
        for dim in ["c", "d"] {
            let i = scene.index_of(&id(dim)).unwrap();
            assert_eq!(scene.node_opacity(i), 0.12, "{dim}");
        }
        assert_eq!(scene.link_opacity(0), 1.0);
        assert_eq!(scene.link_opacity(1), 1.0);
        assert_eq!(scene.link_opacity(2), 0.02);
    }

    #[test]
    fn test_label_sits_above_neighbor() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();
        highlight.hover(Some(&id("hub")), &mut scene, &mut host);

        let overlay = &highlight.overlays()[0];
        let a = scene.index_of(&id("a")).unwrap();
        assert_eq!(overlay.node, a);
        let expected = scene.position(a).unwrap() + Vec3::Y * scene.world_size(a) * 1.5;
        assert!(overlay.position.distance(expected) < 1e-5);
    }

    #[test]
    fn test_switching_focus_disposes_first() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();

        highlight.hover(Some(&id("hub")), &mut scene, &mut host);
        highlight.hover(Some(&id("c")), &mut scene, &mut host);
        assert_eq!(host.disposed, vec![1, 2]);
        assert_eq!(host.live.len(), 1);
        assert_eq!(highlight.overlay_count(), 1);
        assert_eq!(highlight.overlays()[0].text, "90%");
    }

    #[test]
    fn test_rehover_same_node_is_noop() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();

        highlight.hover(Some(&id("hub")), &mut scene, &mut host);
        assert!(!highlight.hover(Some(&id("hub")), &mut scene, &mut host));
        assert_eq!(host.spawned.len(), 2);
        assert!(host.disposed.is_empty());
    }

    #[test]
    fn test_idle_restores_and_frees_everything() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();

        for target in ["hub", "a", "c", "b", "hub"] {
            highlight.hover(Some(&id(target)), &mut scene, &mut host);
        }
        assert!(highlight.hover(None, &mut scene, &mut host));

        assert_eq!(highlight.state(), &HighlightState::Idle);
        assert_eq!(highlight.overlay_count(), 0);
        assert!(host.live.is_empty());
        assert!((0..scene.node_count()).all(|i| scene.node_opacity(i) == 1.0));
        assert!((0..3).all(|l| scene.link_opacity(l) == 1.0));
    }

    #[test]
    fn test_unknown_id_is_idle() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();

        assert!(!highlight.hover(Some(&id("ghost")), &mut scene, &mut host));
        highlight.hover(Some(&id("hub")), &mut scene, &mut host);
        assert!(highlight.hover(Some(&id("ghost")), &mut scene, &mut host));
        assert_eq!(highlight.state(), &HighlightState::Idle);
        assert!(host.live.is_empty());
    }

    #[test]
    fn test_dispose_on_teardown() {
        let mut scene = scene();
        let mut host = RecordingHost::default();
        let mut highlight = HighlightController::default();
        highlight.hover(Some(&id("hub")), &mut scene, &mut host);
        highlight.dispose(&mut host);
        assert!(host.live.is_empty());
        assert_eq!(highlight.focused(), None);
    }
}
