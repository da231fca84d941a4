//! GPU-agnostic scene state for the similarity graph.
//!
//! Holds the graph together with its layout positions and per-node and
//! per-link opacity tables, and drives the hover highlight. The renderer
//! reads these tables every frame; nothing here owns GPU resources.

mod highlight;
mod layout;
mod picking;
mod scene;

pub use highlight::{
    HighlightController, HighlightState, HighlightStyle, LabelOverlay, OverlayHost, label_text,
};
pub use layout::{Layout, SphericalLayout};
pub use picking::{ScreenNode, pick_nearest};
pub use scene::GraphScene;
