//! Frame renderer for the similarity graph.
//!
//! [`GraphRenderer`] draws the background, links, node sprites and the
//! highlight labels in one color pass. Node sprites are looked up by entity
//! id in a table owned here and built lazily the first time a node is on
//! screen; materials come from the [`RenderObjectCache`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use nebula_graph::EntityId;
use nebula_scene::{GraphScene, OverlayHost};

use crate::background::BackgroundRenderer;
use crate::buffer::{DynamicBuffer, SpriteInstance, VertexPositionColor};
use crate::camera::Camera;
use crate::gpu::{RenderContext, SurfaceError};
use crate::label::rasterize_label;
use crate::line_pipeline::{LinePipeline, link_vertices};
use crate::pass::{FrameEncoder, RenderPassBuilder};
use crate::poster::{PLACEHOLDER_SIZE, load_poster, placeholder_disc};
use crate::render_cache::{LabelHandle, LabelOverlays, MaterialError, MaterialFactory, RenderObjectCache};
use crate::shader::ShaderError;
use crate::sprite_pipeline::{CameraBinding, SpritePipeline, back_to_front};
use crate::texture::{ManagedTexture, TextureUploader};
use crate::uniforms::UniformFrame;

/// Screen pixels per font pixel when rasterising labels.
const LABEL_PIXEL_SCALE: u32 = 4;
/// Extra pixels around the viewport in which sprites are still built.
const VISIBILITY_MARGIN_PX: f32 = 64.0;

/// Appearance settings.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Tint for nodes drawn with the placeholder disc.
    pub node_color: [f32; 3],
    /// Tint for search-result nodes drawn with the placeholder disc.
    pub result_color: [f32; 3],
    pub link_color: [f32; 3],
    pub poster_dir: Option<PathBuf>,
    /// World-space height of a similarity label.
    pub label_height: f32,
    pub background: bool,
    /// Fragment source for the background; the built-in one when `None`.
    pub background_shader: Option<String>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            node_color: [0.0, 0.953, 1.0],
            result_color: [1.0, 0.62, 0.2],
            link_color: [0.6, 0.7, 1.0],
            poster_dir: None,
            label_height: 3.0,
            background: true,
            background_shader: None,
        }
    }
}

/// Everything one frame needs from the outside.
pub struct FrameView<'a> {
    pub scene: &'a GraphScene,
    pub camera: &'a Camera,
    /// Background uniforms; `time` is the frame timestamp in seconds.
    pub background: UniformFrame<'a>,
}

#[derive(Debug, Clone)]
struct NodeSprite {
    material: Arc<ManagedTexture>,
    /// Placeholder discs take the node color; posters are drawn untinted.
    tinted: bool,
}

/// Builds GPU materials for the render cache.
struct GpuMaterials<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    uploader: &'a TextureUploader,
    poster_dir: Option<&'a Path>,
}

impl MaterialFactory for GpuMaterials<'_> {
    type Material = Arc<ManagedTexture>;

    fn poster(&mut self, key: &str) -> Result<Self::Material, MaterialError> {
        let image = load_poster(self.poster_dir, key)?;
        Ok(self
            .uploader
            .upload_image(self.device, self.queue, key, &image)?)
    }

    fn label(&mut self, text: &str) -> Result<Self::Material, MaterialError> {
        let image = rasterize_label(text, LABEL_PIXEL_SCALE, [255, 255, 255, 255]);
        Ok(self
            .uploader
            .upload_image(self.device, self.queue, text, &image)?)
    }

    fn placeholder(&mut self) -> Result<Self::Material, MaterialError> {
        let image = placeholder_disc(PLACEHOLDER_SIZE);
        Ok(self
            .uploader
            .upload_image(self.device, self.queue, "placeholder", &image)?)
    }
}

/// Renders the graph scene and hosts the highlight labels.
pub struct GraphRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    camera_binding: CameraBinding,
    sprite_pipeline: SpritePipeline,
    line_pipeline: LinePipeline,
    uploader: TextureUploader,
    cache: RenderObjectCache<Arc<ManagedTexture>>,
    sprites: HashMap<EntityId, NodeSprite>,
    scene_version: Option<u64>,
    labels: LabelOverlays<Arc<ManagedTexture>>,
    background: Option<BackgroundRenderer>,
    sprite_instances: DynamicBuffer,
    line_vertices: DynamicBuffer,
    settings: RendererSettings,
    disposed: bool,
}

impl GraphRenderer {
    /// Create pipelines and the background program.
    pub fn init(context: &RenderContext, settings: RendererSettings) -> Result<Self, ShaderError> {
        let device = context.device.clone();
        let queue = context.queue.clone();
        let format = context.surface_format;

        let camera_binding = CameraBinding::new(&device);
        let uploader = TextureUploader::new(&device);
        let sprite_pipeline = SpritePipeline::new(
            &device,
            format,
            &camera_binding.layout,
            uploader.bind_group_layout(),
        );
        let line_pipeline = LinePipeline::new(&device, format, &camera_binding.layout);

        let background = if settings.background {
            Some(BackgroundRenderer::new(
                &device,
                &queue,
                format,
                settings.background_shader.as_deref(),
            )?)
        } else {
            None
        };

        let sprite_instances =
            DynamicBuffer::new(&device, "sprite-instances", wgpu::BufferUsages::VERTEX);
        let line_vertices = DynamicBuffer::new(&device, "link-vertices", wgpu::BufferUsages::VERTEX);

        log::info!(
            "Graph renderer ready ({:?}, background {})",
            format,
            if background.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            device,
            queue,
            camera_binding,
            sprite_pipeline,
            line_pipeline,
            uploader,
            cache: RenderObjectCache::new(),
            sprites: HashMap::new(),
            scene_version: None,
            labels: LabelOverlays::new(),
            background,
            sprite_instances,
            line_vertices,
            settings,
            disposed: false,
        })
    }

    /// Draw one frame. Does nothing once disposed.
    pub fn render(&mut self, context: &RenderContext, view: &FrameView<'_>) -> Result<(), SurfaceError> {
        if self.disposed {
            return Ok(());
        }

        let (width, height) = context.size();
        let viewport = Vec2::new(width as f32, height as f32);
        self.sync_scene(view.scene);
        self.build_visible_sprites(view.scene, view.camera, viewport);

        let links = build_link_vertices(view.scene, self.settings.link_color);
        self.line_vertices.write(&self.device, &self.queue, &links);

        let draws = self.sprite_draw_list(view.scene, view.camera);
        let instances: Vec<SpriteInstance> = draws.iter().map(|(_, instance)| *instance).collect();
        self.sprite_instances
            .write(&self.device, &self.queue, &instances);

        self.camera_binding.update(&self.queue, view.camera);
        if let Some(background) = self.background.as_mut() {
            background.update(&view.background);
        }

        let surface_texture = context.get_current_texture()?;
        let mut frame = FrameEncoder::new(&context.device, surface_texture);
        {
            let mut pass = frame.begin_render_pass(&RenderPassBuilder::new().label("graph-pass"));

            if let Some(background) = self.background.as_ref() {
                background.draw(&mut pass);
            }

            if !links.is_empty() {
                pass.set_pipeline(&self.line_pipeline.pipeline);
                pass.set_bind_group(0, &self.camera_binding.bind_group, &[]);
                pass.set_vertex_buffer(0, self.line_vertices.slice());
                pass.draw(0..links.len() as u32, 0..1);
            }

            if !draws.is_empty() {
                pass.set_pipeline(&self.sprite_pipeline.pipeline);
                pass.set_bind_group(0, &self.camera_binding.bind_group, &[]);
                pass.set_vertex_buffer(0, self.sprite_instances.slice());
                for (index, (material, _)) in draws.iter().enumerate() {
                    let instance = index as u32;
                    pass.set_bind_group(1, &material.bind_group, &[]);
                    pass.draw(0..4, instance..instance + 1);
                }
            }
        }
        frame.submit(&context.queue);
        Ok(())
    }

    /// Swap the background fragment shader if it compiles.
    pub fn replace_background_shader(&mut self, source: &str) -> Result<(), ShaderError> {
        match self.background.as_mut() {
            Some(background) => background.replace_shader(source),
            None => Ok(()),
        }
    }

    /// Release every GPU resource this renderer created. Terminal.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(background) = self.background.as_mut() {
            background.dispose();
        }
        self.labels.clear();
        self.sprites.clear();
        let released = self.cache.teardown();
        self.sprite_instances.destroy();
        self.line_vertices.destroy();
        self.disposed = true;
        log::info!("Graph renderer disposed ({released} cached materials released)");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Drop node sprites when the scene was rebuilt.
    fn sync_scene(&mut self, scene: &GraphScene) {
        if self.scene_version != Some(scene.version()) {
            self.sprites.clear();
            self.scene_version = Some(scene.version());
        }
    }

    fn build_visible_sprites(&mut self, scene: &GraphScene, camera: &Camera, viewport: Vec2) {
        for (index, &position) in scene.positions().iter().enumerate() {
            let Some(node) = scene.node(index) else {
                continue;
            };
            if self.sprites.contains_key(&node.id) || !is_on_screen(camera, position, viewport) {
                continue;
            }
            let mut factory = GpuMaterials {
                device: &self.device,
                queue: &self.queue,
                uploader: &self.uploader,
                poster_dir: self.settings.poster_dir.as_deref(),
            };
            let material = match self.cache.poster(node.poster.as_deref(), &mut factory) {
                Ok(material) => material,
                Err(err) => {
                    log::error!("No material for node {}: {err}", node.id);
                    continue;
                }
            };
            let tinted = match self.cache.placeholder(&mut factory) {
                Ok(placeholder) => Arc::ptr_eq(&placeholder, &material),
                Err(_) => false,
            };
            self.sprites
                .insert(node.id.clone(), NodeSprite { material, tinted });
        }
    }

    /// Node sprites far to near, then labels on top.
    fn sprite_draw_list(
        &self,
        scene: &GraphScene,
        camera: &Camera,
    ) -> Vec<(Arc<ManagedTexture>, SpriteInstance)> {
        let mut nodes = Vec::new();
        let mut centers = Vec::new();
        for (index, &position) in scene.positions().iter().enumerate() {
            let Some(node) = scene.node(index) else {
                continue;
            };
            let Some(sprite) = self.sprites.get(&node.id) else {
                continue;
            };
            let tint = if !sprite.tinted {
                [1.0; 3]
            } else if node.is_search_result {
                self.settings.result_color
            } else {
                self.settings.node_color
            };
            let instance = node_instance(
                position,
                scene.world_size(index),
                sprite.material.aspect(),
                tint,
                scene.node_opacity(index),
            );
            nodes.push((Arc::clone(&sprite.material), instance));
            centers.push(position);
        }

        let mut draws: Vec<_> = back_to_front(camera, &centers)
            .into_iter()
            .map(|i| nodes[i].clone())
            .collect();

        let half_height = self.settings.label_height * 0.5;
        for label in self.labels.iter() {
            if let Some(material) = &label.material {
                draws.push((
                    Arc::clone(material),
                    SpriteInstance {
                        center: label.position.to_array(),
                        half_extent: [half_height * material.aspect(), half_height],
                        color: [1.0, 1.0, 1.0, 1.0],
                    },
                ));
            }
        }
        draws
    }
}

impl OverlayHost for GraphRenderer {
    type Overlay = LabelHandle;

    fn spawn_label(&mut self, text: &str, position: Vec3) -> LabelHandle {
        let mut factory = GpuMaterials {
            device: &self.device,
            queue: &self.queue,
            uploader: &self.uploader,
            poster_dir: self.settings.poster_dir.as_deref(),
        };
        self.labels.spawn(&mut self.cache, &mut factory, text, position)
    }

    fn dispose_label(&mut self, overlay: LabelHandle) {
        self.labels.dispose(overlay);
    }
}

fn is_on_screen(camera: &Camera, position: Vec3, viewport: Vec2) -> bool {
    camera.project(position, viewport).is_some_and(|screen| {
        screen.x >= -VISIBILITY_MARGIN_PX
            && screen.y >= -VISIBILITY_MARGIN_PX
            && screen.x <= viewport.x + VISIBILITY_MARGIN_PX
            && screen.y <= viewport.y + VISIBILITY_MARGIN_PX
    })
}

/// Billboard for a node of world size `size`. Width follows the material's
/// aspect ratio.
pub fn node_instance(position: Vec3, size: f32, aspect: f32, tint: [f32; 3], opacity: f32) -> SpriteInstance {
    let half_height = size * 0.5;
    SpriteInstance {
        center: position.to_array(),
        half_extent: [half_height * aspect, half_height],
        color: [tint[0], tint[1], tint[2], opacity],
    }
}

/// Line-list vertices for every link whose endpoints are in the scene.
pub fn build_link_vertices(scene: &GraphScene, color: [f32; 3]) -> Vec<VertexPositionColor> {
    let positions = scene.positions();
    let links = &scene.graph().links;
    scene
        .link_endpoints()
        .filter_map(|(link, source, target)| {
            Some(link_vertices(
                *positions.get(source)?,
                *positions.get(target)?,
                color,
                links.get(link)?.similarity,
                scene.link_opacity(link),
            ))
        })
        .flatten()
        .collect()
}
