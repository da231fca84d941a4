//! Full-screen animated background driven by pointer input.
//!
//! The background is a single quad drawn as a triangle strip with a
//! replaceable fragment shader. [`WgpuLinker`] turns the validated stages
//! into a wgpu pipeline; [`BackgroundRenderer`] owns the program and the quad.

use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::shader::{CompiledStage, ProgramLinker, ShaderError, ShaderProgram};
use crate::uniforms::UniformFrame;

/// Quad corners in clip space, ordered for a triangle strip.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0];

/// Pass-through vertex stage for the background quad.
pub const BACKGROUND_VERTEX_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}
"#;

/// Drifting clouds with a warm glow following the first pointer.
pub const DEFAULT_BACKGROUND_SHADER: &str = r#"
struct Uniforms {
    resolution: vec2<f32>,
    time: f32,
    pointer_count: i32,
    movement: vec2<f32>,
    touch: vec2<f32>,
    pointers: array<vec4<f32>, 5>,
}

@group(0) @binding(0) var<uniform> u: Uniforms;

fn rnd(seed: vec2<f32>) -> f32 {
    var p = fract(seed * vec2<f32>(12.9898, 78.233));
    p += dot(p, p + 34.56);
    return fract(p.x * p.y);
}

fn noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let w = f * f * (3.0 - 2.0 * f);
    let a = rnd(i);
    let b = rnd(i + vec2<f32>(1.0, 0.0));
    let c = rnd(i + vec2<f32>(0.0, 1.0));
    let d = rnd(i + 1.0);
    return mix(mix(a, b, w.x), mix(c, d, w.x), w.y);
}

fn fbm(start: vec2<f32>) -> f32 {
    var p = start;
    var t = 0.0;
    var a = 1.0;
    let m = mat2x2<f32>(1.0, -0.5, 0.2, 1.2);
    for (var i = 0; i < 5; i++) {
        t += a * noise(p);
        p = p * (2.0 * m);
        a *= 0.5;
    }
    return t;
}

fn clouds(start: vec2<f32>) -> f32 {
    var p = start;
    var d = 1.0;
    var t = 0.0;
    for (var i = 0.0; i < 3.0; i += 1.0) {
        let a = d * fbm(i * 10.0 + p.x * 0.2 + 0.2 * (1.0 + i) * p.y + d + i * i + p);
        t = mix(t, d, a);
        d = a;
        p *= 2.0 / (i + 1.0);
    }
    return t;
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    // Canvas coordinates grow upwards.
    let fc = vec2<f32>(frag.x, u.resolution.y - frag.y);
    let r = u.resolution;
    let mn = min(r.x, r.y);

    var uv = (fc - 0.5 * r) / mn;
    let st = uv * vec2<f32>(2.0, 1.0);
    var col = vec3<f32>(0.0);
    let bg = clouds(vec2<f32>(st.x + u.time * 0.5, -st.y));
    uv *= 1.0 - 0.3 * (sin(u.time * 0.2) * 0.5 + 0.5);

    let glow = exp(-length(fc - u.touch) * 0.005) * 0.8;

    for (var i = 1.0; i < 12.0; i += 1.0) {
        uv += 0.1 * cos(i * vec2<f32>(0.1 + 0.01 * i, 0.8) + i * i + u.time * 0.5 + 0.1 * uv.x + u.movement * 0.02);
        let p = uv;
        let d = length(p);
        col += 0.00125 / d * (cos(sin(i) * vec3<f32>(1.0, 2.0, 3.0)) + 1.0);
        let b = noise(i + p + bg * 1.731);
        col += 0.002 * b / length(max(p, vec2<f32>(b * p.x * 0.02, p.y)));
        col = mix(col, vec3<f32>(bg * 0.25, bg * 0.137, bg * 0.05), d);
    }

    col += vec3<f32>(0.98, 0.58, 0.20) * glow * 0.5;
    col += vec3<f32>(0.98, 0.46, 0.08) * glow * 0.3;
    return vec4<f32>(col, 1.0);
}
"#;

/// GPU objects of a linked background program.
pub struct BackgroundProgram {
    pub pipeline: wgpu::RenderPipeline,
    uniform_layout: Option<wgpu::BindGroupLayout>,
    uniforms: Option<(wgpu::Buffer, wgpu::BindGroup)>,
}

impl BackgroundProgram {
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.uniforms.as_ref().map(|(_, group)| group)
    }
}

/// Links background programs with wgpu.
pub struct WgpuLinker {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
}

impl WgpuLinker {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            format,
        }
    }

    fn module(&self, stage: &CompiledStage) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(stage.entry_point()),
                source: wgpu::ShaderSource::Wgsl(stage.source().into()),
            })
    }
}

impl ProgramLinker for WgpuLinker {
    type Program = BackgroundProgram;

    fn link(
        &mut self,
        vertex: &CompiledStage,
        fragment: &CompiledStage,
    ) -> Result<BackgroundProgram, String> {
        let uniform_size = fragment.uniforms().size();
        let max_binding = self.device.limits().max_uniform_buffer_binding_size;
        if u64::from(uniform_size) > u64::from(max_binding) {
            return Err(format!(
                "uniform struct of {uniform_size} bytes exceeds the device limit of {max_binding}"
            ));
        }

        // Pipeline validation errors are returned as the link diagnostic
        // instead of reaching the device's uncaptured-error handler.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_layout = NonZeroU64::new(u64::from(uniform_size)).map(|size| {
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("background-uniform-layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(size),
                        },
                        count: None,
                    }],
                })
        });
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = uniform_layout.iter().collect();
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("background-pipeline-layout"),
                bind_group_layouts: &bind_group_layouts,
                immediate_size: 0,
            });

        let vertex_module = self.module(vertex);
        let fragment_module = self.module(fragment);

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("background-pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(vertex.entry_point()),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 8,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
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
                    module: &fragment_module,
                    entry_point: Some(fragment.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(error.to_string());
        }

        Ok(BackgroundProgram {
            pipeline,
            uniform_layout,
            uniforms: None,
        })
    }

    fn bind_uniforms(&mut self, program: &mut BackgroundProgram, size: u64) {
        let Some(layout) = program.uniform_layout.as_ref() else {
            return;
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("background-uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background-uniform-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        program.uniforms = Some((buffer, group));
    }

    fn upload(&mut self, program: &BackgroundProgram, bytes: &[u8]) {
        if let Some((buffer, _)) = program.uniforms.as_ref() {
            self.queue.write_buffer(buffer, 0, bytes);
        }
    }

    fn release(&mut self, program: BackgroundProgram) {
        if let Some((buffer, _)) = program.uniforms {
            buffer.destroy();
        }
    }
}

/// Owns the background program and its quad.
pub struct BackgroundRenderer {
    program: ShaderProgram<WgpuLinker>,
    quad: wgpu::Buffer,
}

impl BackgroundRenderer {
    /// Build the background with `fragment_source`, falling back to
    /// [`DEFAULT_BACKGROUND_SHADER`] when it is missing or does not compile.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        fragment_source: Option<&str>,
    ) -> Result<Self, ShaderError> {
        let fragment = match fragment_source {
            Some(source) => match crate::shader::test_fragment(source) {
                None => source,
                Some(diagnostic) => {
                    log::warn!("Custom background shader rejected, using default: {diagnostic}");
                    DEFAULT_BACKGROUND_SHADER
                }
            },
            None => DEFAULT_BACKGROUND_SHADER,
        };

        let linker = WgpuLinker::new(device.clone(), queue.clone(), format);
        let mut program = ShaderProgram::new(linker, BACKGROUND_VERTEX_SHADER, fragment);
        program.setup()?;
        program.init()?;

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("background-quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self { program, quad })
    }

    /// Upload this frame's uniforms. Does nothing unless the program is active.
    pub fn update(&mut self, frame: &UniformFrame<'_>) -> bool {
        self.program.write_uniforms(frame)
    }

    /// Record the quad draw into `pass`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if !self.program.is_active() {
            return;
        }
        let Some(program) = self.program.program() else {
            return;
        };
        pass.set_pipeline(&program.pipeline);
        if let Some(group) = program.bind_group() {
            pass.set_bind_group(0, group, &[]);
        }
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..4, 0..1);
    }

    /// Swap the fragment shader if `source` passes the trial compile.
    pub fn replace_shader(&mut self, source: &str) -> Result<(), ShaderError> {
        self.program.replace_if_valid(source)
    }

    pub fn program(&self) -> &ShaderProgram<WgpuLinker> {
        &self.program
    }

    /// Release the program and the quad.
    pub fn dispose(&mut self) {
        self.program.dispose();
        self.quad.destroy();
    }
}
