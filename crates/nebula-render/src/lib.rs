//! wgpu rendering for the Nebula explorer: surface management, the shader
//! background, node sprites, similarity links and camera motion.

pub mod background;
pub mod buffer;
pub mod camera;
pub mod camera_director;
pub mod gpu;
pub mod label;
pub mod line_pipeline;
pub mod pass;
pub mod poster;
pub mod render_cache;
pub mod renderer;
pub mod shader;
pub mod sprite_pipeline;
pub mod texture;
pub mod uniforms;

pub use background::{BackgroundRenderer, DEFAULT_BACKGROUND_SHADER};
pub use buffer::{DynamicBuffer, SpriteInstance, VertexPositionColor};
pub use camera::{Camera, CameraUniform};
pub use camera_director::{CameraDirector, CameraFlight, CameraSnapshot, EasingFunction, FlyTo};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use pass::{BACKGROUND_BLACK, FrameEncoder, RenderPassBuilder};
pub use render_cache::{
    CacheStats, LabelHandle, LabelOverlays, LabelSprite, MaterialError, MaterialFactory,
    RenderObjectCache,
};
pub use renderer::{FrameView, GraphRenderer, RendererSettings};
pub use shader::{
    CompiledStage, ProgramLinker, ProgramState, ShaderError, ShaderProgram, Stage, test_fragment,
};
pub use texture::{ManagedTexture, TextureError, TextureUploader};
pub use uniforms::{UniformField, UniformFrame, UniformKind, UniformTable};
