//! Mouse state for graph navigation.
//!
//! [`MouseState`] turns winit mouse events into the three gestures the
//! explorer cares about: hover position, left-drag orbit deltas, and clicks
//! (a press and release without meaningful travel). Wheel input accumulates
//! for dolly.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Travel in pixels beyond which a press becomes a drag instead of a click.
pub const CLICK_SLOP_PX: f32 = 4.0;

/// Pixels of a `PixelDelta` scroll counted as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

/// Per-frame mouse gestures.
///
/// # Usage
///
/// 1. Forward winit events via the `on_*` methods.
/// 2. Query or take gestures once per frame.
/// 3. Call [`clear_transients`](Self::clear_transients) at end of frame.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Option<Vec2>,
    press_origin: Option<Vec2>,
    dragging: bool,
    drag_delta: Vec2,
    scroll: f32,
    click: Option<Vec2>,
}

impl MouseState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Event handlers ──────────────────────────────────────────────

    /// Process a `CursorMoved` event.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        if let (Some(origin), Some(previous)) = (self.press_origin, self.position) {
            if !self.dragging && new_pos.distance(origin) > CLICK_SLOP_PX {
                self.dragging = true;
            }
            if self.dragging {
                self.drag_delta += new_pos - previous;
            }
        }
        self.position = Some(new_pos);
    }

    /// Process a `MouseInput` event. Only the left button drives gestures.
    pub fn on_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                self.press_origin = self.position;
                self.dragging = false;
            }
            ElementState::Released => {
                if self.press_origin.take().is_some() && !self.dragging {
                    self.click = self.position;
                }
                self.dragging = false;
            }
        }
    }

    /// Process a `MouseWheel` event.
    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(_x, y) => {
                self.scroll += y;
            }
            MouseScrollDelta::PixelDelta(pos) => {
                self.scroll += (pos.y / PIXELS_PER_LINE) as f32;
            }
        }
    }

    /// Process a `CursorLeft` event: hover ends and any press is abandoned.
    pub fn on_cursor_left(&mut self) {
        self.position = None;
        self.press_origin = None;
        self.dragging = false;
    }

    /// Clears per-frame transients: drag delta, scroll, pending click.
    pub fn clear_transients(&mut self) {
        self.drag_delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.click = None;
    }

    /// Consume the pending click position, if any.
    pub fn take_click(&mut self) -> Option<Vec2> {
        self.click.take()
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Cursor position in window pixels, `None` while outside the window.
    #[must_use]
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Drag travel accumulated this frame.
    #[must_use]
    pub fn drag_delta(&self) -> Vec2 {
        self.drag_delta
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Scroll wheel lines accumulated this frame (positive = away from user).
    #[must_use]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }
}
