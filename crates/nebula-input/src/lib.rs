//! Input handling: pointer aggregation for the shader background and mouse
//! gestures for graph navigation.

pub mod mouse;
pub mod pointer;

pub use mouse::{CLICK_SLOP_PX, MouseState};
pub use pointer::{
    MAX_SHADER_POINTERS, MOUSE_POINTER_ID, PointerAggregate, PointerId, PointerSnapshot,
};
