use crate::error::TerrainError;
use crate::types::TextureKind;

const ATLAS_BINDING: u32 = 0;
const ATLAS_SAMPLER_BINDING: u32 = 1;
const LIGHTMAP_BINDING: u32 = 2;
const LIGHTMAP_SAMPLER_BINDING: u32 = 3;

/// The two resident terrain textures and their shared bind group.
///
/// Imports are pure functions of (kind, width, height, pixels): a valid
/// upload replaces the resident texture of that kind and rebuilds the bind
/// group; an invalid one is rejected before any device call. 1x1 placeholders
/// (white atlas, full-bright lightmap) keep the bind group valid before the
/// first import.
pub(crate) struct TerrainTextures {
    layout: wgpu::BindGroupLayout,
    atlas_sampler: wgpu::Sampler,
    lightmap_sampler: wgpu::Sampler,
    atlas_view: wgpu::TextureView,
    lightmap_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl TerrainTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = Self::create_bind_group_layout(device);

        // Block atlas is pixel art; filtering would bleed between tiles.
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Terrain Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let lightmap_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Terrain Lightmap Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let atlas_view = upload(device, queue, "Terrain Atlas", 1, 1, &[255; 4]);
        let lightmap_view = upload(device, queue, "Terrain Lightmap", 1, 1, &[255; 4]);
        let bind_group = Self::create_bind_group(
            device,
            &layout,
            &atlas_view,
            &atlas_sampler,
            &lightmap_view,
            &lightmap_sampler,
        );

        Self {
            layout,
            atlas_sampler,
            lightmap_sampler,
            atlas_view,
            lightmap_view,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn import(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: TextureKind,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), TerrainError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(TerrainError::TextureSizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        let label = match kind {
            TextureKind::Atlas => "Terrain Atlas",
            TextureKind::Lightmap => "Terrain Lightmap",
        };
        let view = upload(device, queue, label, width, height, pixels);
        match kind {
            TextureKind::Atlas => self.atlas_view = view,
            TextureKind::Lightmap => self.lightmap_view = view,
        }
        self.bind_group = Self::create_bind_group(
            device,
            &self.layout,
            &self.atlas_view,
            &self.atlas_sampler,
            &self.lightmap_view,
            &self.lightmap_sampler,
        );
        log::debug!("terrain: imported {label} {width}x{height}");
        Ok(())
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Texture Bind Group Layout"),
            entries: &[
                texture_entry(ATLAS_BINDING),
                sampler_entry(ATLAS_SAMPLER_BINDING),
                texture_entry(LIGHTMAP_BINDING),
                sampler_entry(LIGHTMAP_SAMPLER_BINDING),
            ],
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        atlas_view: &wgpu::TextureView,
        atlas_sampler: &wgpu::Sampler,
        lightmap_view: &wgpu::TextureView,
        lightmap_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: ATLAS_BINDING,
                    resource: wgpu::BindingResource::TextureView(atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: ATLAS_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(atlas_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: LIGHTMAP_BINDING,
                    resource: wgpu::BindingResource::TextureView(lightmap_view),
                },
                wgpu::BindGroupEntry {
                    binding: LIGHTMAP_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(lightmap_sampler),
                },
            ],
        })
    }
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
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
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
