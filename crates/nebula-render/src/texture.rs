//! GPU texture creation and bind groups for sprite materials.
//!
//! [`TextureUploader`] turns RGBA pixel data into an [`Arc<ManagedTexture>`]
//! with a ready-to-bind [`wgpu::BindGroup`]. Caching lives one level up in
//! [`crate::render_cache::RenderObjectCache`].

use std::sync::Arc;

/// Pixel format of every sprite texture.
pub const SPRITE_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A GPU texture with its view, bind group, and metadata.
pub struct ManagedTexture {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// Default view into the texture.
    pub view: wgpu::TextureView,
    /// Pre-built bind group for immediate use in draw calls.
    pub bind_group: wgpu::BindGroup,
    /// Width and height in texels.
    pub dimensions: (u32, u32),
}

impl ManagedTexture {
    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        let (width, height) = self.dimensions;
        width as f32 / height.max(1) as f32
    }
}

impl std::fmt::Debug for ManagedTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTexture")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur during texture creation.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// Pixel data length doesn't match the expected size for the given dimensions.
    #[error("texture data size ({actual}) does not match expected ({expected}) for {width}x{height}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    /// Width or height is zero.
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    /// Larger than the device allows.
    #[error("texture {width}x{height} exceeds the device limit of {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },
}

/// Creates sprite textures sharing one sampler and bind group layout.
pub struct TextureUploader {
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    max_dimension: u32,
}

impl TextureUploader {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            sampler,
            bind_group_layout,
            max_dimension: device.limits().max_texture_dimension_2d,
        }
    }

    /// Upload tightly packed RGBA8 pixels.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        validate_dimensions(width, height)?;
        if width > self.max_dimension || height > self.max_dimension {
            return Err(TextureError::TooLarge {
                width,
                height,
                limit: self.max_dimension,
            });
        }
        validate_data_size(data, width, height)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SPRITE_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: None,
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-bind-group")),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        log::debug!("Created texture '{label}' ({width}x{height})");
        Ok(Arc::new(ManagedTexture {
            texture,
            view,
            bind_group,
            dimensions: (width, height),
        }))
    }

    /// Upload a decoded image.
    pub fn upload_image(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &image::RgbaImage,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        self.upload(device, queue, label, image.as_raw(), image.width(), image.height())
    }

    /// The shared bind group layout for texture + sampler pairs.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

/// Validate that dimensions are non-zero.
fn validate_dimensions(width: u32, height: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    Ok(())
}

/// Validate that data size matches RGBA8 at the given dimensions.
fn validate_data_size(data: &[u8], width: u32, height: u32) -> Result<(), TextureError> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(TextureError::DataSizeMismatch {
            actual: data.len(),
            expected,
            width,
            height,
        });
    }
    Ok(())
}

/// Create a test GPU device and queue. Returns `None` if no GPU is available.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                ..Default::default()
            })
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(1, 1).is_ok());
        assert!(matches!(
            validate_dimensions(0, 4),
            Err(TextureError::ZeroDimensions { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_validate_data_size() {
        assert!(validate_data_size(&[0; 16], 2, 2).is_ok());
        assert!(matches!(
            validate_data_size(&[0; 15], 2, 2),
            Err(TextureError::DataSizeMismatch {
                actual: 15,
                expected: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_upload_creates_bindable_texture() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let uploader = TextureUploader::new(&device);
        let texture = uploader
            .upload(&device, &queue, "test-4x2", &[255u8; 32], 4, 2)
            .unwrap();
        assert_eq!(texture.dimensions, (4, 2));
        assert!((texture.aspect() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_upload_image() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let uploader = TextureUploader::new(&device);
        let image = image::RgbaImage::from_pixel(3, 5, image::Rgba([10, 20, 30, 255]));
        let texture = uploader
            .upload_image(&device, &queue, "test-image", &image)
            .unwrap();
        assert_eq!(texture.dimensions, (3, 5));
    }

    #[test]
    fn test_upload_rejects_bad_input() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let uploader = TextureUploader::new(&device);
        assert!(matches!(
            uploader.upload(&device, &queue, "zero", &[], 0, 0),
            Err(TextureError::ZeroDimensions { .. })
        ));
        assert!(matches!(
            uploader.upload(&device, &queue, "short", &[0; 4], 2, 2),
            Err(TextureError::DataSizeMismatch { .. })
        ));
    }
}
