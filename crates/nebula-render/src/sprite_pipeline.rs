//! Camera-facing textured quads for nodes and labels.

use std::num::NonZeroU64;

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::buffer::SpriteInstance;
use crate::camera::{Camera, CameraUniform};

/// Camera uniform buffer plus the bind group both graph pipelines share.
pub struct CameraBinding {
    pub buffer: wgpu::Buffer,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl CameraBinding {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<CameraUniform>() as u64
                    ),
                },
                count: None,
            }],
        });

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera-uniform"),
            contents: bytemuck::bytes_of(&Camera::default().to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera-bind-group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            layout,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&camera.to_uniform()));
    }
}

/// Alpha-blended billboard pipeline.
pub struct SpritePipeline {
    pub pipeline: wgpu::RenderPipeline,
}

impl SpritePipeline {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        camera_layout: &wgpu::BindGroupLayout,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite-shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER_SOURCE.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite-pipeline-layout"),
            bind_group_layouts: &[camera_layout, texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[SpriteInstance::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self { pipeline }
    }
}

/// Indices of `centers` ordered farthest-first along the view direction.
///
/// Sprites have no depth buffer, so drawing in this order keeps nearer
/// translucent quads on top. Equal depths keep their input order.
pub fn back_to_front(camera: &Camera, centers: &[Vec3]) -> Vec<usize> {
    let forward = camera.forward();
    let depth = |center: Vec3| (center - camera.position).dot(forward);
    let mut order: Vec<usize> = (0..centers.len()).collect();
    order.sort_by(|&a, &b| depth(centers[b]).total_cmp(&depth(centers[a])));
    order
}

/// The WGSL source code for the sprite shader.
pub const SPRITE_SHADER_SOURCE: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: CameraUniform;

@group(1) @binding(0)
var sprite_texture: texture_2d<f32>;
@group(1) @binding(1)
var sprite_sampler: sampler;

struct SpriteInput {
    @location(0) center: vec3<f32>,
    @location(1) half_extent: vec2<f32>,
    @location(2) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32, sprite: SpriteInput) -> VertexOutput {
    let corner = vec2<f32>(f32(index & 1u), f32((index >> 1u) & 1u));
    let offset = (corner * 2.0 - 1.0) * sprite.half_extent;
    let world = sprite.center + camera.right.xyz * offset.x + camera.up.xyz * offset.y;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    out.color = sprite.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(sprite_texture, sprite_sampler, in.uv) * in.color;
    if color.a < 0.004 {
        discard;
    }
    return color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureUploader, create_test_device_queue};

    #[test]
    fn test_sprite_shader_parses() {
        let module = naga::front::wgsl::parse_str(SPRITE_SHADER_SOURCE).unwrap();
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        );
        validator.validate(&module).unwrap();
    }

    #[test]
    fn test_back_to_front_orders_by_depth() {
        let camera = Camera::default();
        let centers = [
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 0.0, -100.0),
            Vec3::new(5.0, 0.0, 0.0),
        ];
        assert_eq!(back_to_front(&camera, &centers), vec![1, 2, 0]);
    }

    #[test]
    fn test_back_to_front_keeps_ties_stable() {
        let camera = Camera::default();
        let centers = [Vec3::X, Vec3::NEG_X, Vec3::Y];
        assert_eq!(back_to_front(&camera, &centers), vec![0, 1, 2]);
    }

    #[test]
    fn test_pipeline_creation() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let camera = CameraBinding::new(&device);
        camera.update(&queue, &Camera::default());
        let textures = TextureUploader::new(&device);
        let _pipeline = SpritePipeline::new(
            &device,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            &camera.layout,
            textures.bind_group_layout(),
        );
    }
}
