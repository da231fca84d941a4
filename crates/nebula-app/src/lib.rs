//! Nebula explorer application.
//!
//! Graph loading, the interactive session, the frame scheduler and the
//! winit window that ties them to the renderer.

pub mod catalog;
pub mod frame_loop;
pub mod platform;
pub mod session;
pub mod window;
