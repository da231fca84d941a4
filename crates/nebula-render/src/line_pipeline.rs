//! Similarity links drawn as colored line segments.

use glam::Vec3;

use crate::buffer::VertexPositionColor;

/// Alpha-blended line-list pipeline.
pub struct LinePipeline {
    pub pipeline: wgpu::RenderPipeline,
}

impl LinePipeline {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line-shader"),
            source: wgpu::ShaderSource::Wgsl(LINE_SHADER_SOURCE.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line-pipeline-layout"),
            bind_group_layouts: &[camera_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[VertexPositionColor::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
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

/// Two vertices for the segment `from -> to`. Links fade with lower
/// similarity; `opacity` comes from the highlight state.
pub fn link_vertices(
    from: Vec3,
    to: Vec3,
    color: [f32; 3],
    similarity: f32,
    opacity: f32,
) -> [VertexPositionColor; 2] {
    let alpha = (0.25 + 0.75 * similarity.clamp(0.0, 1.0)) * opacity.clamp(0.0, 1.0);
    let color = [color[0], color[1], color[2], alpha];
    [
        VertexPositionColor {
            position: from.to_array(),
            color,
        },
        VertexPositionColor {
            position: to.to_array(),
            color,
        },
    ]
}

/// The WGSL source code for the line shader.
pub const LINE_SHADER_SOURCE: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: CameraUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite_pipeline::CameraBinding;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_line_shader_parses() {
        let module = naga::front::wgsl::parse_str(LINE_SHADER_SOURCE).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap();
    }

    #[test]
    fn test_link_vertices_alpha() {
        let [a, b] = link_vertices(Vec3::ZERO, Vec3::X, [0.5, 0.5, 1.0], 1.0, 1.0);
        assert_eq!(a.position, [0.0, 0.0, 0.0]);
        assert_eq!(b.position, [1.0, 0.0, 0.0]);
        assert_eq!(a.color[3], 1.0);

        let [dim, _] = link_vertices(Vec3::ZERO, Vec3::X, [1.0; 3], 0.0, 0.02);
        assert!((dim.color[3] - 0.005).abs() < 1e-6);
    }

    #[test]
    fn test_pipeline_creation() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let camera = CameraBinding::new(&device);
        let _pipeline =
            LinePipeline::new(&device, wgpu::TextureFormat::Bgra8UnormSrgb, &camera.layout);
    }
}
