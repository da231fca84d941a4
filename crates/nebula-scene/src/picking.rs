//! Screen-space node picking.

use glam::{Vec2, Vec3};

use crate::scene::GraphScene;

/// A node projected into window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenNode {
    pub position: Vec2,
    /// Projected radius in pixels.
    pub radius: f32,
}

/// Nearest node whose projected disc (at least `min_radius_px` wide) contains
/// `cursor`.
///
/// `project` maps a world position and world radius to the screen, returning
/// `None` for points behind the camera.
pub fn pick_nearest<P>(scene: &GraphScene, cursor: Vec2, min_radius_px: f32, project: P) -> Option<usize>
where
    P: Fn(Vec3, f32) -> Option<ScreenNode>,
{
    scene
        .positions()
        .iter()
        .enumerate()
        .filter_map(|(index, &world)| {
            let screen = project(world, scene.world_size(index) * 0.5)?;
            let distance = screen.position.distance(cursor);
            (distance <= screen.radius.max(min_radius_px)).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use nebula_graph::{Entity, GraphNode, SimilarityGraph};

    /// Places nodes on the x axis, 10 units apart.
    struct Row;

    impl Layout for Row {
        fn positions(&mut self, graph: &SimilarityGraph) -> Vec<Vec3> {
            (0..graph.nodes.len())
                .map(|i| Vec3::new(i as f32 * 10.0, 0.0, 0.0))
                .collect()
        }
    }

    fn scene(n: u64) -> GraphScene {
        let graph = SimilarityGraph {
            nodes: (0..n)
                .map(|i| GraphNode::from_entity(&Entity::new(i, "")))
                .collect(),
            links: Vec::new(),
        };
        GraphScene::new(graph, &mut Row, 1.0)
    }

    /// Orthographic: one world unit per pixel, nothing behind the camera.
    fn flat(world: Vec3, radius: f32) -> Option<ScreenNode> {
        Some(ScreenNode {
            position: world.truncate(),
            radius,
        })
    }

    #[test]
    fn test_picks_nearest_within_radius() {
        let scene = scene(3);
        assert_eq!(pick_nearest(&scene, Vec2::new(11.0, 0.0), 3.0, flat), Some(1));
        assert_eq!(pick_nearest(&scene, Vec2::new(18.5, 1.0), 3.0, flat), Some(2));
    }

    #[test]
    fn test_miss_outside_radius() {
        let scene = scene(3);
        assert_eq!(pick_nearest(&scene, Vec2::new(5.0, 0.0), 3.0, flat), None);
    }

    #[test]
    fn test_behind_camera_is_skipped() {
        let scene = scene(2);
        let hidden_first = |world: Vec3, radius: f32| {
            (world.x > 0.0).then_some(ScreenNode {
                position: world.truncate(),
                radius,
            })
        };
        assert_eq!(pick_nearest(&scene, Vec2::new(4.0, 0.0), 8.0, hidden_first), Some(1));
    }
}
