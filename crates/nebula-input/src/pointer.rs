//! Multi-pointer aggregation for the shader background.
//!
//! [`PointerAggregate`] merges mouse and touch contacts into the values the
//! background shader consumes: every active contact in canvas coordinates,
//! the first contact (or the last known one once all are lifted), and a
//! running movement total.

use glam::Vec2;

/// Identifier of a pointer contact (touch id, or [`MOUSE_POINTER_ID`]).
pub type PointerId = u64;

/// Reserved id for the mouse acting as a pointer while a button is held.
pub const MOUSE_POINTER_ID: PointerId = u64::MAX;

/// Maximum number of contacts the shader reads.
pub const MAX_SHADER_POINTERS: usize = 10;

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: PointerId,
    /// Canvas coordinates (Y up, scaled).
    position: Vec2,
    /// Window coordinates as reported by the platform.
    client: Vec2,
}

/// Copy of the aggregate values taken once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerSnapshot {
    pub first: Vec2,
    pub coords: Vec<f32>,
    pub count: usize,
    pub movement: Vec2,
}

/// Pointer state shared by all contacts.
///
/// Contacts are kept in insertion order; moving a contact keeps its place.
#[derive(Debug, Clone)]
pub struct PointerAggregate {
    contacts: Vec<Contact>,
    last_coords: Vec2,
    movement: Vec2,
    last_mouse: Option<Vec2>,
    active: bool,
    surface_height: f32,
    scale: f32,
    mouse_move_scale: f32,
}

impl Default for PointerAggregate {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl PointerAggregate {
    /// Mouse deltas are scaled by this before entering the movement total.
    pub const DEFAULT_MOUSE_MOVE_SCALE: f32 = 0.1;

    #[must_use]
    pub fn new(surface_height: f32, scale: f32) -> Self {
        Self {
            contacts: Vec::new(),
            last_coords: Vec2::ZERO,
            movement: Vec2::ZERO,
            last_mouse: None,
            active: false,
            surface_height,
            scale,
            mouse_move_scale: Self::DEFAULT_MOUSE_MOVE_SCALE,
        }
    }

    #[must_use]
    pub fn with_mouse_move_scale(mut self, scale: f32) -> Self {
        self.mouse_move_scale = scale;
        self
    }

    /// Update the canvas height (physical pixels) and the client-to-canvas scale.
    pub fn set_surface(&mut self, surface_height: f32, scale: f32) {
        self.surface_height = surface_height;
        self.scale = scale;
    }

    /// `(x * scale, height - y * scale)`.
    #[must_use]
    pub fn map(&self, client: Vec2) -> Vec2 {
        Vec2::new(
            client.x * self.scale,
            self.surface_height - client.y * self.scale,
        )
    }

    // ── Event handlers ──────────────────────────────────────────────

    /// A contact starts.
    pub fn on_pointer_down(&mut self, id: PointerId, x: f64, y: f64) {
        let client = Vec2::new(x as f32, y as f32);
        let position = self.map(client);
        self.active = true;
        tracing::trace!(id, x = position.x, y = position.y, "pointer down");
        match self.contacts.iter_mut().find(|c| c.id == id) {
            Some(contact) => {
                contact.position = position;
                contact.client = client;
            }
            None => self.contacts.push(Contact {
                id,
                position,
                client,
            }),
        }
    }

    /// A contact moves. Ignored unless some contact is down.
    pub fn on_pointer_move(&mut self, id: PointerId, x: f64, y: f64) {
        if !self.active {
            return;
        }
        let client = Vec2::new(x as f32, y as f32);
        let position = self.map(client);
        self.last_coords = position;

        match self.contacts.iter_mut().find(|c| c.id == id) {
            Some(contact) => {
                self.movement += client - contact.client;
                contact.position = position;
                contact.client = client;
            }
            None => self.contacts.push(Contact {
                id,
                position,
                client,
            }),
        }
    }

    /// A contact lifts.
    pub fn on_pointer_up(&mut self, id: PointerId) {
        self.release(id);
    }

    /// A contact leaves the canvas.
    pub fn on_pointer_leave(&mut self, id: PointerId) {
        self.release(id);
    }

    /// Cursor motion, tracked whether or not a button is held.
    pub fn on_mouse_move(&mut self, x: f64, y: f64) {
        let mapped = self.map(Vec2::new(x as f32, y as f32));
        self.last_coords = mapped;
        if let Some(previous) = self.last_mouse {
            self.movement += (mapped - previous) * self.mouse_move_scale;
        }
        self.last_mouse = Some(mapped);
    }

    /// Cursor left the window: the next motion starts a fresh delta.
    pub fn on_mouse_leave(&mut self) {
        self.last_mouse = None;
    }

    fn release(&mut self, id: PointerId) {
        if self.contacts.len() == 1 {
            self.last_coords = self.first();
        }
        self.contacts.retain(|c| c.id != id);
        self.active = !self.contacts.is_empty();
        tracing::trace!(id, remaining = self.contacts.len(), "pointer released");
    }

    /// Return the accumulated movement and reset it to zero.
    ///
    /// Nothing else resets the total.
    pub fn take_movement(&mut self) -> Vec2 {
        std::mem::take(&mut self.movement)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// First active contact, or the last known coordinate when none is active.
    #[must_use]
    pub fn first(&self) -> Vec2 {
        self.contacts
            .first()
            .map_or(self.last_coords, |c| c.position)
    }

    /// Active contacts flattened as `[x0, y0, x1, y1, ...]`, `[0, 0]` when empty.
    /// Only the first [`MAX_SHADER_POINTERS`] contacts are included.
    #[must_use]
    pub fn coords(&self) -> Vec<f32> {
        if self.contacts.is_empty() {
            return vec![0.0, 0.0];
        }
        self.contacts
            .iter()
            .take(MAX_SHADER_POINTERS)
            .flat_map(|c| [c.position.x, c.position.y])
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.contacts.len()
    }

    /// Running movement total.
    #[must_use]
    pub fn movement(&self) -> Vec2 {
        self.movement
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn snapshot(&self) -> PointerSnapshot {
        PointerSnapshot {
            first: self.first(),
            coords: self.coords(),
            count: self.count(),
            movement: self.movement,
        }
    }
}
