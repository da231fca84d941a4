//! Explorer session: everything interactive that does not need the GPU.
//!
//! [`ExplorerSession`] owns the scene, camera, highlight and input state and
//! turns queued [`InputEvent`]s into hover highlights, selections and camera
//! motion. Overlays are created through whatever [`OverlayHost`] the caller
//! passes in, which is the graph renderer in the running app.

use std::time::Duration;

use glam::{Vec2, Vec3};
use nebula_config::{CameraEasing, Config};
use nebula_graph::{EntityId, GraphNode, SimilarityGraph};
use nebula_input::{MOUSE_POINTER_ID, MouseState, PointerAggregate, PointerSnapshot};
use nebula_render::{Camera, CameraDirector, EasingFunction, FlyTo, UniformFrame};
use nebula_scene::{
    GraphScene, HighlightController, HighlightStyle, Layout, OverlayHost, ScreenNode, label_text,
    pick_nearest,
};
use tracing::{debug, info};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase};

/// Called with the clicked node after the camera flight has started.
pub type NodeClickHook = Box<dyn FnMut(&GraphNode)>;
/// Called whenever the hovered node changes; `None` when hover ends.
pub type NodeHoverHook = Box<dyn FnMut(Option<&GraphNode>)>;

/// Window input, queued until the next frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Cursor position in physical pixels.
    CursorMoved { x: f64, y: f64 },
    CursorLeft,
    MouseButton {
        button: MouseButton,
        state: ElementState,
    },
    Wheel(MouseScrollDelta),
    Touch {
        id: u64,
        phase: TouchPhase,
        x: f64,
        y: f64,
    },
    ClearSelection,
}

/// Session parameters, usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub title: String,
    pub node_scale: f32,
    pub pick_radius_px: f32,
    pub highlight: HighlightStyle,
    pub fov_y_degrees: f32,
    pub start_distance: f32,
    pub fly_distance: f32,
    pub fly_duration: Duration,
    pub lateral_offset: f32,
    pub easing: EasingFunction,
    pub orbit_sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub invert_y: bool,
    pub mouse_move_scale: f32,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.window.title.clone(),
            node_scale: config.render.node_scale,
            pick_radius_px: config.highlight.pick_radius_px,
            highlight: HighlightStyle {
                dim_node_opacity: config.highlight.dim_node_opacity,
                dim_link_opacity: config.highlight.dim_link_opacity,
                label_margin: config.highlight.label_margin,
            },
            fov_y_degrees: config.camera.fov_y_degrees,
            start_distance: config.camera.start_distance,
            fly_distance: config.camera.fly_distance,
            fly_duration: Duration::from_millis(config.camera.fly_duration_ms),
            lateral_offset: config.camera.lateral_offset,
            easing: easing_from_config(config.camera.easing),
            orbit_sensitivity: config.input.orbit_sensitivity,
            zoom_sensitivity: config.input.zoom_sensitivity,
            invert_y: config.input.invert_y,
            mouse_move_scale: config.input.mouse_move_scale,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn easing_from_config(easing: CameraEasing) -> EasingFunction {
    match easing {
        CameraEasing::Linear => EasingFunction::Linear,
        CameraEasing::EaseIn => EasingFunction::EaseIn,
        CameraEasing::EaseOut => EasingFunction::EaseOut,
        CameraEasing::EaseInOut => EasingFunction::EaseInOut,
    }
}

/// What a frame changed that the window has to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// A camera flight is still running.
    pub animating: bool,
    /// New window title after the selection changed.
    pub title: Option<String>,
}

/// Interactive state of one explorer window.
pub struct ExplorerSession<O> {
    settings: SessionSettings,
    scene: GraphScene,
    layout: Box<dyn Layout>,
    highlight: HighlightController<O>,
    director: CameraDirector,
    camera: Camera,
    mouse: MouseState,
    mouse_down: bool,
    pointers: PointerAggregate,
    viewport: Vec2,
    hovered: Option<EntityId>,
    selected: Option<EntityId>,
    pending_title: Option<String>,
    on_node_click: Option<NodeClickHook>,
    on_node_hover: Option<NodeHoverHook>,
}

impl<O> ExplorerSession<O> {
    pub fn new(graph: SimilarityGraph, mut layout: Box<dyn Layout>, settings: SessionSettings) -> Self {
        let scene = GraphScene::new(graph, layout.as_mut(), settings.node_scale);
        let camera = Camera {
            position: Vec3::new(0.0, 0.0, settings.start_distance),
            target: Vec3::ZERO,
            fov_y: settings.fov_y_degrees.to_radians(),
            ..Camera::default()
        };
        info!(
            nodes = scene.node_count(),
            links = scene.graph().links.len(),
            "Explorer session ready"
        );

        Self {
            highlight: HighlightController::new(settings.highlight),
            director: CameraDirector::new(settings.easing),
            pointers: PointerAggregate::default().with_mouse_move_scale(settings.mouse_move_scale),
            settings,
            scene,
            layout,
            camera,
            mouse: MouseState::new(),
            mouse_down: false,
            viewport: Vec2::ONE,
            hovered: None,
            selected: None,
            pending_title: None,
            on_node_click: None,
            on_node_hover: None,
        }
    }

    pub fn set_on_node_click(&mut self, hook: impl FnMut(&GraphNode) + 'static) {
        self.on_node_click = Some(Box::new(hook));
    }

    pub fn set_on_node_hover(&mut self, hook: impl FnMut(Option<&GraphNode>) + 'static) {
        self.on_node_hover = Some(Box::new(hook));
    }

    /// Track a new surface size in physical pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        self.viewport = Vec2::new(width, height);
        self.camera.set_aspect_ratio(width, height);
        self.pointers.set_surface(height, 1.0);
    }

    /// Apply one queued input event.
    pub fn apply<H>(&mut self, event: InputEvent, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        match event {
            InputEvent::CursorMoved { x, y } => {
                self.mouse.on_cursor_moved(x, y);
                self.pointers.on_mouse_move(x, y);
                if self.mouse_down {
                    self.pointers.on_pointer_move(MOUSE_POINTER_ID, x, y);
                }
            }
            InputEvent::CursorLeft => {
                self.mouse.on_cursor_left();
                self.pointers.on_pointer_leave(MOUSE_POINTER_ID);
                self.pointers.on_mouse_leave();
                self.mouse_down = false;
            }
            InputEvent::MouseButton { button, state } => {
                self.mouse.on_button(button, state);
                if button != MouseButton::Left {
                    return;
                }
                match state {
                    ElementState::Pressed => {
                        self.mouse_down = true;
                        if let Some(position) = self.mouse.position() {
                            self.pointers.on_pointer_down(
                                MOUSE_POINTER_ID,
                                f64::from(position.x),
                                f64::from(position.y),
                            );
                        }
                    }
                    ElementState::Released => {
                        self.mouse_down = false;
                        self.pointers.on_pointer_up(MOUSE_POINTER_ID);
                    }
                }
            }
            InputEvent::Wheel(delta) => self.mouse.on_scroll(delta),
            InputEvent::Touch { id, phase, x, y } => match phase {
                TouchPhase::Started => self.pointers.on_pointer_down(id, x, y),
                TouchPhase::Moved => self.pointers.on_pointer_move(id, x, y),
                TouchPhase::Ended => self.pointers.on_pointer_up(id),
                TouchPhase::Cancelled => self.pointers.on_pointer_leave(id),
            },
            InputEvent::ClearSelection => self.clear_selection(host),
        }
    }

    /// Turn this frame's gestures into camera motion, hover and selection,
    /// then advance the camera flight and the layout.
    pub fn frame<H>(&mut self, now: Duration, host: &mut H) -> FrameOutcome
    where
        H: OverlayHost<Overlay = O>,
    {
        let drag = self.mouse.drag_delta();
        if drag != Vec2::ZERO {
            let pitch_sign = if self.settings.invert_y { 1.0 } else { -1.0 };
            let delta = Vec2::new(drag.x, drag.y * pitch_sign) * self.settings.orbit_sensitivity;
            self.director.orbit(&mut self.camera, delta);
        }
        let scroll = self.mouse.scroll();
        if scroll != 0.0 {
            self.director
                .dolly(&mut self.camera, scroll, self.settings.zoom_sensitivity);
        }

        if let Some(cursor) = self.mouse.take_click()
            && let Some(index) = self.pick(cursor)
        {
            self.select(index, now);
        }

        let hovered = if self.mouse.is_dragging() {
            self.hovered.clone()
        } else {
            self.mouse
                .position()
                .and_then(|cursor| self.pick(cursor))
                .and_then(|index| self.scene.node(index))
                .map(|node| node.id.clone())
        };
        self.set_hover(hovered, host);

        let animating = self.director.update(&mut self.camera, now);
        self.scene.step_layout(self.layout.as_mut());
        self.mouse.clear_transients();

        FrameOutcome {
            animating,
            title: self.pending_title.take(),
        }
    }

    /// Select the node at `index`: fire the click hook, fly the camera to it
    /// and retitle the window.
    pub fn select(&mut self, index: usize, now: Duration) -> bool {
        let (Some(node), Some(position)) = (self.scene.node(index), self.scene.position(index)) else {
            return false;
        };
        let node = node.clone();

        match node.score {
            Some(score) => info!(id = %node.id, "{} (Similarity: {})", node.title, label_text(score)),
            None => info!(id = %node.id, "{}", node.title),
        }

        self.director.fly_to(
            &self.camera,
            FlyTo {
                target: position,
                distance: self.settings.fly_distance,
                duration: self.settings.fly_duration,
                lateral_offset: self.settings.lateral_offset,
            },
            now,
        );
        if let Some(hook) = self.on_node_click.as_mut() {
            hook(&node);
        }

        self.pending_title = Some(format!("{} - {}", node.title, self.settings.title));
        self.selected = Some(node.id);
        true
    }

    /// Drop the selection and the hover highlight.
    pub fn clear_selection<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        if self.selected.take().is_some() {
            self.pending_title = Some(self.settings.title.clone());
        }
        self.set_hover(None, host);
        self.highlight.reset(&mut self.scene, host);
    }

    /// Swap in a rebuilt graph. The highlight returns to idle first.
    pub fn replace_graph<H>(&mut self, graph: SimilarityGraph, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        self.highlight.reset(&mut self.scene, host);
        self.scene.replace_graph(graph, self.layout.as_mut());
        self.hovered = None;
        if self.selected.take().is_some() {
            self.pending_title = Some(self.settings.title.clone());
        }
    }

    /// Release every overlay. The session is not used afterwards.
    pub fn dispose<H>(&mut self, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        self.director.cancel();
        self.highlight.dispose(host);
    }

    /// Background uniforms for this frame, borrowing the pointer coordinates
    /// from `snapshot`.
    pub fn background_frame<'a>(&self, snapshot: &'a PointerSnapshot, time: Duration) -> UniformFrame<'a> {
        UniformFrame {
            resolution: self.viewport,
            time: time.as_secs_f32(),
            movement: snapshot.movement,
            touch: snapshot.first,
            pointer_count: snapshot.count as u32,
            pointers: &snapshot.coords,
        }
    }

    pub fn pointer_snapshot(&self) -> PointerSnapshot {
        self.pointers.snapshot()
    }

    pub fn scene(&self) -> &GraphScene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn director(&self) -> &CameraDirector {
        &self.director
    }

    pub fn highlight(&self) -> &HighlightController<O> {
        &self.highlight
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&EntityId> {
        self.hovered.as_ref()
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    fn set_hover<H>(&mut self, target: Option<EntityId>, host: &mut H)
    where
        H: OverlayHost<Overlay = O>,
    {
        self.highlight.hover(target.as_ref(), &mut self.scene, host);
        if target == self.hovered {
            return;
        }
        debug!(hovered = ?target, "Hover changed");
        self.hovered = target;
        if let Some(hook) = self.on_node_hover.as_mut() {
            let node = self
                .hovered
                .as_ref()
                .and_then(|id| self.scene.index_of(id))
                .and_then(|index| self.scene.node(index));
            hook(node);
        }
    }

    fn pick(&self, cursor: Vec2) -> Option<usize> {
        let camera = &self.camera;
        let viewport = self.viewport;
        pick_nearest(&self.scene, cursor, self.settings.pick_radius_px, |world, radius| {
            Some(ScreenNode {
                position: camera.project(world, viewport)?,
                radius: camera.projected_radius(world, radius, viewport.y),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use nebula_graph::{Entity, GraphOptions, build_graph};
    use nebula_scene::{HighlightState, SphericalLayout};

    /// Counts live labels.
    #[derive(Default)]
    struct Labels {
        next: u32,
        live: Vec<(u32, String)>,
    }

    impl OverlayHost for Labels {
        type Overlay = u32;

        fn spawn_label(&mut self, text: &str, _position: Vec3) -> u32 {
            self.next += 1;
            self.live.push((self.next, text.to_string()));
            self.next
        }

        fn dispose_label(&mut self, overlay: u32) {
            self.live.retain(|(id, _)| *id != overlay);
        }
    }

    fn graph() -> SimilarityGraph {
        let entities = vec![
            Entity::new("1", "one").with_vector(vec![1.0, 0.0]),
            Entity::new("2", "two").with_vector(vec![1.0, 0.0]),
            Entity::new("3", "three").with_vector(vec![0.0, 1.0]),
        ];
        build_graph(&entities, &GraphOptions::default())
    }

    fn session() -> ExplorerSession<u32> {
        let mut session = ExplorerSession::new(
            graph(),
            Box::new(SphericalLayout::new(120.0)),
            SessionSettings::default(),
        );
        session.resize(1280, 720);
        session
    }

    fn screen_of(session: &ExplorerSession<u32>, index: usize) -> Vec2 {
        let world = session.scene().position(index).unwrap();
        session.camera().project(world, session.viewport()).unwrap()
    }

    fn move_to(session: &mut ExplorerSession<u32>, labels: &mut Labels, at: Vec2) {
        session.apply(
            InputEvent::CursorMoved {
                x: f64::from(at.x),
                y: f64::from(at.y),
            },
            labels,
        );
    }

    fn click(session: &mut ExplorerSession<u32>, labels: &mut Labels, at: Vec2) {
        move_to(session, labels, at);
        for state in [ElementState::Pressed, ElementState::Released] {
            session.apply(
                InputEvent::MouseButton {
                    button: MouseButton::Left,
                    state,
                },
                labels,
            );
        }
    }

    #[test]
    fn test_hover_creates_and_clears_labels() {
        let mut session = session();
        let mut labels = Labels::default();

        let at = screen_of(&session, 0);
        move_to(&mut session, &mut labels, at);
        session.frame(Duration::ZERO, &mut labels);

        assert_eq!(session.hovered(), Some(&EntityId::new("1")));
        assert_eq!(
            session.highlight().state(),
            &HighlightState::Focused(EntityId::new("1"))
        );
        let mut texts: Vec<_> = labels.live.iter().map(|(_, t)| t.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["10%", "100%"]);

        session.apply(InputEvent::CursorLeft, &mut labels);
        session.frame(Duration::from_millis(16), &mut labels);
        assert!(labels.live.is_empty());
        assert_eq!(session.hovered(), None);
        assert_eq!(session.scene().node_opacity(2), 1.0);
    }

    #[test]
    fn test_click_selects_and_flies() {
        let mut session = session();
        let mut labels = Labels::default();
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicked);
        session.set_on_node_click(move |node| sink.borrow_mut().push(node.id.clone()));

        let at = screen_of(&session, 1);
        click(&mut session, &mut labels, at);
        let outcome = session.frame(Duration::from_millis(100), &mut labels);

        assert_eq!(clicked.borrow().as_slice(), &[EntityId::new("2")]);
        assert_eq!(session.selected(), Some(&EntityId::new("2")));
        assert!(outcome.animating);
        assert_eq!(outcome.title.as_deref(), Some("two - Nebula Explorer"));

        let flight = session.director().flight().unwrap();
        assert_eq!(flight.to.focus, session.scene().position(1).unwrap());

        // Flight ends after the configured duration.
        let outcome = session.frame(Duration::from_millis(3200), &mut labels);
        assert!(!outcome.animating);
        assert!(outcome.title.is_none());
    }

    #[test]
    fn test_click_on_empty_space_selects_nothing() {
        let mut session = session();
        let mut labels = Labels::default();
        click(&mut session, &mut labels, Vec2::new(2.0, 2.0));
        let outcome = session.frame(Duration::ZERO, &mut labels);
        assert_eq!(session.selected(), None);
        assert!(!outcome.animating);
    }

    #[test]
    fn test_clear_selection_restores_title_and_highlight() {
        let mut session = session();
        let mut labels = Labels::default();
        let at = screen_of(&session, 0);
        click(&mut session, &mut labels, at);
        session.frame(Duration::ZERO, &mut labels);
        assert!(!labels.live.is_empty());

        session.apply(InputEvent::ClearSelection, &mut labels);
        assert!(labels.live.is_empty());
        assert_eq!(session.selected(), None);
        assert_eq!(session.highlight().state(), &HighlightState::Idle);
    }

    #[test]
    fn test_replace_graph_forces_idle() {
        let mut session = session();
        let mut labels = Labels::default();
        let at = screen_of(&session, 0);
        move_to(&mut session, &mut labels, at);
        session.frame(Duration::ZERO, &mut labels);
        assert_eq!(labels.live.len(), 2);

        session.replace_graph(graph(), &mut labels);
        assert!(labels.live.is_empty());
        assert_eq!(session.scene().version(), 1);
        assert_eq!(session.highlight().state(), &HighlightState::Idle);
    }

    #[test]
    fn test_drag_orbits_and_cancels_flight() {
        let mut session = session();
        let mut labels = Labels::default();
        session.select(0, Duration::ZERO);
        assert!(session.director().is_flying());

        move_to(&mut session, &mut labels, Vec2::new(100.0, 100.0));
        session.apply(
            InputEvent::MouseButton {
                button: MouseButton::Left,
                state: ElementState::Pressed,
            },
            &mut labels,
        );
        move_to(&mut session, &mut labels, Vec2::new(160.0, 100.0));
        session.frame(Duration::from_millis(16), &mut labels);

        assert!(!session.director().is_flying());
        assert_eq!(session.pointer_snapshot().count, 1);
    }

    #[test]
    fn test_touch_feeds_background_uniforms() {
        let mut session = session();
        let mut labels = Labels::default();
        session.apply(
            InputEvent::Touch {
                id: 7,
                phase: TouchPhase::Started,
                x: 10.0,
                y: 20.0,
            },
            &mut labels,
        );
        let snapshot = session.pointer_snapshot();
        let frame = session.background_frame(&snapshot, Duration::from_millis(1500));
        assert_eq!(frame.pointer_count, 1);
        assert_eq!(frame.pointers, &[10.0_f32, 700.0][..]);
        assert_eq!(frame.touch, Vec2::new(10.0, 700.0));
        assert!((frame.time - 1.5).abs() < 1e-6);
        assert_eq!(frame.resolution, Vec2::new(1280.0, 720.0));

        session.apply(
            InputEvent::Touch {
                id: 7,
                phase: TouchPhase::Ended,
                x: 10.0,
                y: 20.0,
            },
            &mut labels,
        );
        let snapshot = session.pointer_snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.first, Vec2::new(10.0, 700.0));
    }
}
