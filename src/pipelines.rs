use crate::types::{RenderType, VERTEX_STRIDE};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) const FRAME_BUFFER_GROUP_ID: u32 = 0;
const UNIFORMS_BINDING: u32 = 0;
const CHUNK_INFO_BINDING: u32 = 1;

pub(crate) const TEXTURE_GROUP_ID: u32 = 1;

/// One render pipeline per render type, all sharing the terrain shader and
/// layout. The types differ only in fixed-function state: translucent blends
/// and keeps depth read-only, everything else overwrites; alpha testing is a
/// shader-side threshold in the frame uniforms, so the cutout types need no
/// pipeline of their own beyond opaque state.
pub(crate) struct TerrainPipelines {
    frame_bind_group_layout: wgpu::BindGroupLayout,
    pipelines: [wgpu::RenderPipeline; RenderType::COUNT],
}

impl TerrainPipelines {
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        texture_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Terrain Frame Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: UNIFORMS_BINDING,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: CHUNK_INFO_BINDING,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, texture_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("terrain.wgsl"));

        let pipelines = RenderType::ALL.map(|rt| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(rt.label()),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[vertex_buffer_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: rt.blend_state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: rt.depth_write_enabled(),
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        Self {
            frame_bind_group_layout,
            pipelines,
        }
    }

    pub fn pipeline(&self, rt: RenderType) -> &wgpu::RenderPipeline {
        &self.pipelines[rt.index()]
    }

    pub fn create_frame_bind_group(
        &self,
        device: &wgpu::Device,
        rt: RenderType,
        uniform_buffer: &wgpu::Buffer,
        chunk_info_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(rt.label()),
            layout: &self.frame_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: UNIFORMS_BINDING,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: CHUNK_INFO_BINDING,
                    resource: chunk_info_buffer.as_entire_binding(),
                },
            ],
        })
    }
}

/// Fixed 32-byte mesher vertex record. The normal at byte 28 is baked into
/// the vertex color upstream, so the shader does not consume it; the stride
/// still skips over it.
fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
        // Position, block-local.
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        // Baked vertex color.
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Unorm8x4,
            offset: 12,
            shader_location: 1,
        },
        // Block atlas uv.
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 16,
            shader_location: 2,
        },
        // Lightmap coordinates, 0..240 per axis.
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Uint16x2,
            offset: 24,
            shader_location: 3,
        },
    ];
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}
