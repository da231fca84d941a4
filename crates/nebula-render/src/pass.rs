//! Render pass and per-frame encoder helpers.
//!
//! [`RenderPassBuilder`] describes the single color pass the explorer draws
//! each frame; [`FrameEncoder`] owns the acquired surface texture and its
//! command encoder until the frame is submitted and presented.

/// The explorer draws on pure black.
pub const BACKGROUND_BLACK: wgpu::Color = wgpu::Color::BLACK;

/// How the color attachment is initialised at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorLoad {
    Clear(wgpu::Color),
    /// Keep whatever an earlier pass drew.
    Load,
}

/// Fluent description of a color-only render pass.
#[derive(Debug, Clone)]
pub struct RenderPassBuilder {
    load: ColorLoad,
    label: Option<&'static str>,
}

impl Default for RenderPassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPassBuilder {
    /// A pass that clears to [`BACKGROUND_BLACK`].
    pub fn new() -> Self {
        Self {
            load: ColorLoad::Clear(BACKGROUND_BLACK),
            label: None,
        }
    }

    /// Set the clear color for the color attachment.
    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.load = ColorLoad::Clear(color);
        self
    }

    /// Draw over the existing contents instead of clearing.
    pub fn load_existing(mut self) -> Self {
        self.load = ColorLoad::Load;
        self
    }

    /// Set debug label for the render pass.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    #[must_use]
    pub fn color_load(&self) -> ColorLoad {
        self.load
    }

    fn load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        match self.load {
            ColorLoad::Clear(color) => wgpu::LoadOp::Clear(color),
            ColorLoad::Load => wgpu::LoadOp::Load,
        }
    }

    /// Begin the pass on `encoder`, targeting `color_view`.
    pub fn begin<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
        color_view: &'encoder wgpu::TextureView,
    ) -> wgpu::RenderPass<'encoder> {
        let color_attachment = wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: self.load_op(),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        };

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: self.label,
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// One frame's surface texture plus the encoder recording into it.
pub struct FrameEncoder {
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    surface_view: wgpu::TextureView,
}

impl FrameEncoder {
    pub fn new(device: &wgpu::Device, surface_texture: wgpu::SurfaceTexture) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            encoder,
            surface_texture,
            surface_view,
        }
    }

    /// Begin a render pass on the surface using `builder`.
    pub fn begin_render_pass<'a>(&'a mut self, builder: &RenderPassBuilder) -> wgpu::RenderPass<'a> {
        builder.begin(&mut self.encoder, &self.surface_view)
    }

    /// Surface size of this frame in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        let texture = &self.surface_texture.texture;
        (texture.width(), texture.height())
    }

    /// Submit the recorded commands and present the surface texture.
    pub fn submit(self, queue: &wgpu::Queue) {
        queue.submit(std::iter::once(self.encoder.finish()));
        self.surface_texture.present();
    }
}
