use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::diagnostics::{DiagnosticsCollector, DiagnosticsSnapshot, PendingFrame};
use crate::error::TerrainError;
use crate::pipelines::{TerrainPipelines, DEPTH_FORMAT, FRAME_BUFFER_GROUP_ID, TEXTURE_GROUP_ID};
use crate::registry::ChunkStore;
use crate::textures::TerrainTextures;
use crate::types::{
    ChunkInfo, DrawIndexedIndirectArgs, FrameUniforms, RenderType, TextureKind, MAX_CHUNKS,
    MAX_QUADS_PER_CHUNK, VERTEX_STRIDE,
};

/// Device features the batched draw path cannot work without.
pub const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::MULTI_DRAW_INDIRECT
    .union(wgpu::Features::INDIRECT_FIRST_INSTANCE);

/// Optional: GPU frame timing. Without it `gpu_time_nanos` reads 0.
pub const OPTIONAL_FEATURES: wgpu::Features = wgpu::Features::TIMESTAMP_QUERY;

const TIMESTAMP_CAPACITY: u32 = 1 + RenderType::COUNT as u32;
const CHUNK_INFO_SIZE: u64 = std::mem::size_of::<ChunkInfo>() as u64;
const INDIRECT_ARGS_SIZE: u64 = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;

pub struct TerrainConfig {
    /// Initial mega-buffer capacity per render type, in vertices. The buffer
    /// doubles when demand exceeds it, so this only sets the floor.
    pub initial_vertex_capacity: u32,
    /// Color format for offscreen frames when no surface is configured.
    pub offscreen_format: wgpu::TextureFormat,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            initial_vertex_capacity: 256 * 1024,
            offscreen_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Presentable surface handed over by the windowing layer. The surface is
/// reconfigured whenever `begin_frame` asks for a different size.
pub struct ScreenTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

struct RenderTypeResources {
    store: ChunkStore,
    mega_buffer: wgpu::Buffer,
    chunk_info_buffer: wgpu::Buffer,
    indirect_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl RenderTypeResources {
    fn new(
        device: &wgpu::Device,
        pipelines: &TerrainPipelines,
        rt: RenderType,
        initial_capacity: u32,
        max_capacity: u32,
    ) -> Self {
        let mega_buffer = create_mega_buffer(device, rt, initial_capacity);
        let chunk_info_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Terrain Chunk Info Buffer"),
            size: MAX_CHUNKS as u64 * CHUNK_INFO_SIZE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indirect_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Terrain Indirect Args Buffer"),
            size: MAX_CHUNKS as u64 * INDIRECT_ARGS_SIZE,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Terrain Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group =
            pipelines.create_frame_bind_group(device, rt, &uniform_buffer, &chunk_info_buffer);

        Self {
            store: ChunkStore::new(initial_capacity, max_capacity),
            mega_buffer,
            chunk_info_buffer,
            indirect_buffer,
            uniform_buffer,
            bind_group,
        }
    }
}

fn create_mega_buffer(device: &wgpu::Device, rt: RenderType, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(rt.label()),
        size: capacity as u64 * VERTEX_STRIDE,
        usage: wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

/// Offscreen color target. The texture is kept and a fresh view is created
/// per frame, since views are not shareable handles.
struct OffscreenTarget {
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

struct DepthTarget {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct Timestamps {
    query_set: wgpu::QuerySet,
    period_nanos: f32,
}

struct FrameSession {
    encoder: wgpu::CommandEncoder,
    target_view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
    pending: PendingFrame,
    cleared: bool,
    timestamps_used: u32,
}

/// The terrain rendering context: mega-buffers, chunk registries, resident
/// textures, pipelines, and the frame lifecycle. One instance per process,
/// explicitly owned by the caller's render driver.
///
/// All mutating calls take `&mut self`; producers and the frame driver must
/// share the instance from a single logical thread. GPU execution is
/// asynchronous: `end_frame` returns at submission, and diagnostics update
/// once the device signals completion (during device polling).
pub struct TerrainRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    screen: Option<ScreenTarget>,
    offscreen_format: wgpu::TextureFormat,

    pipelines: TerrainPipelines,
    textures: TerrainTextures,
    quad_index_buffer: wgpu::Buffer,
    render_types: [RenderTypeResources; RenderType::COUNT],

    offscreen: Option<OffscreenTarget>,
    depth: Option<DepthTarget>,
    session: Option<FrameSession>,

    diagnostics: DiagnosticsCollector,
    timestamps: Option<Timestamps>,
    shut_down: bool,
}

impl TerrainRenderer {
    /// Builds the context on an externally created device and queue. The
    /// device must carry [`REQUIRED_FEATURES`]; [`OPTIONAL_FEATURES`] enable
    /// GPU timing. Pass a [`ScreenTarget`] to allow on-screen frames.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        screen: Option<ScreenTarget>,
        config: TerrainConfig,
    ) -> Result<Self, TerrainError> {
        let missing = REQUIRED_FEATURES - device.features();
        if !missing.is_empty() {
            return Err(TerrainError::MissingFeatures(missing));
        }

        let target_format = screen
            .as_ref()
            .map(|s| s.config.format)
            .unwrap_or(config.offscreen_format);
        let max_capacity =
            (device.limits().max_buffer_size / VERTEX_STRIDE).min(u32::MAX as u64) as u32;

        let textures = TerrainTextures::new(&device, &queue);
        let pipelines = TerrainPipelines::new(&device, target_format, textures.bind_group_layout());

        let render_types = RenderType::ALL.map(|rt| {
            RenderTypeResources::new(
                &device,
                &pipelines,
                rt,
                config.initial_vertex_capacity,
                max_capacity,
            )
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Quad Index Buffer"),
            contents: bytemuck::cast_slice(&quad_indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let timestamps = if device.features().contains(wgpu::Features::TIMESTAMP_QUERY) {
            Some(Timestamps {
                query_set: device.create_query_set(&wgpu::QuerySetDescriptor {
                    label: Some("Terrain Frame Timestamps"),
                    ty: wgpu::QueryType::Timestamp,
                    count: TIMESTAMP_CAPACITY,
                }),
                period_nanos: queue.get_timestamp_period(),
            })
        } else {
            None
        };

        log::info!(
            "terrain renderer up: {} initial vertices per render type, gpu timing {}",
            config.initial_vertex_capacity,
            if timestamps.is_some() { "on" } else { "off" },
        );

        Ok(Self {
            device,
            queue,
            screen,
            offscreen_format: config.offscreen_format,
            pipelines,
            textures,
            quad_index_buffer,
            render_types,
            offscreen: None,
            depth: None,
            session: None,
            diagnostics: DiagnosticsCollector::default(),
            timestamps,
            shut_down: false,
        })
    }

    /// Uploads one chunk section's vertex data. `vertex_data` is opaque
    /// 32-byte records copied verbatim into the render type's mega-buffer.
    /// Re-uploading a live identity supersedes it: the replacement range is
    /// allocated and written before the old one is freed, so a failed upload
    /// leaves the previous geometry rendering unchanged.
    pub fn set_chunk(
        &mut self,
        rt: RenderType,
        chunk_index: i32,
        vertex_data: &[u8],
        num_vertices: u32,
        offset_x: f32,
        offset_y: f32,
        offset_z: f32,
    ) -> Result<(), TerrainError> {
        self.ensure_live()?;
        let expected = num_vertices as u64 * VERTEX_STRIDE;
        if vertex_data.len() as u64 != expected {
            return Err(TerrainError::VertexDataSizeMismatch {
                vertices: num_vertices,
                expected,
                actual: vertex_data.len(),
            });
        }

        let res = &mut self.render_types[rt.index()];
        let old_capacity = res.store.capacity();
        let outcome = res
            .store
            .set(chunk_index, num_vertices, [offset_x, offset_y, offset_z])?;

        if let Some(new_capacity) = outcome.grown_capacity {
            grow_mega_buffer(&self.device, &self.queue, res, rt, old_capacity, new_capacity);
        }

        if num_vertices > 0 {
            self.queue.write_buffer(
                &res.mega_buffer,
                outcome.range.offset as u64 * VERTEX_STRIDE,
                vertex_data,
            );
        }
        let info = ChunkInfo {
            offset: [offset_x, offset_y, offset_z],
            vertex_offset: outcome.range.offset,
            vertex_count: outcome.range.count,
            ..Default::default()
        };
        self.queue.write_buffer(
            &res.chunk_info_buffer,
            outcome.slot as u64 * CHUNK_INFO_SIZE,
            bytemuck::bytes_of(&info),
        );
        Ok(())
    }

    /// Drops every chunk registered under `rt` and returns their ranges to
    /// the pool. Must not be called while a frame that already drew `rt` is
    /// still being recorded.
    pub fn clear_chunks(&mut self, rt: RenderType) {
        if self.shut_down {
            return;
        }
        let res = &mut self.render_types[rt.index()];
        let dropped = res.store.len();
        res.store.clear();
        if dropped > 0 {
            log::debug!("terrain: cleared {dropped} {} chunks", rt.label());
        }
    }

    /// Replaces the resident texture of `kind` with an RGBA8 pixel buffer.
    /// Rejects mismatched sizes before any device call; the resident texture
    /// survives a failed import untouched.
    pub fn import_texture(
        &mut self,
        kind: TextureKind,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), TerrainError> {
        self.ensure_live()?;
        self.textures
            .import(&self.device, &self.queue, kind, width, height, pixels)
    }

    /// Opens the frame: acquires the drawable (or the internally managed
    /// offscreen target) at `width`x`height` and starts command recording.
    /// Rejects nested frames; a failed acquire leaves no open state.
    pub fn begin_frame(
        &mut self,
        width: u32,
        height: u32,
        to_screen: bool,
    ) -> Result<(), TerrainError> {
        self.ensure_live()?;
        if self.session.is_some() {
            return Err(TerrainError::FrameAlreadyOpen);
        }
        if width == 0 || height == 0 {
            return Err(TerrainError::SurfaceUnavailable(format!(
                "zero-sized target {width}x{height}"
            )));
        }

        let (target_view, surface_texture) = if to_screen {
            let screen = self
                .screen
                .as_mut()
                .ok_or_else(|| TerrainError::SurfaceUnavailable("no surface configured".into()))?;
            if screen.config.width != width || screen.config.height != height {
                screen.config.width = width;
                screen.config.height = height;
                screen.surface.configure(&self.device, &screen.config);
            }
            let frame = screen
                .surface
                .get_current_texture()
                .map_err(|e| TerrainError::SurfaceUnavailable(e.to_string()))?;
            let view = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            (view, Some(frame))
        } else {
            let target = match self.offscreen.take() {
                Some(t) if t.width == width && t.height == height => t,
                _ => create_color_target(&self.device, self.offscreen_format, width, height),
            };
            let view = target
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.offscreen = Some(target);
            (view, None)
        };

        if !matches!(&self.depth, Some(t) if t.width == width && t.height == height) {
            self.depth = Some(create_depth_target(&self.device, width, height));
        }

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terrain Frame Encoder"),
            });
        self.session = Some(FrameSession {
            encoder,
            target_view,
            surface_texture,
            pending: PendingFrame::default(),
            cleared: false,
            timestamps_used: 0,
        });
        Ok(())
    }

    /// Draws every live chunk of `rt` in one batched draw: per-chunk indirect
    /// args index the shared quad index buffer with `base_vertex` at the
    /// chunk's range and `first_instance` at its slot, and the vertex stage
    /// pulls the world offset from the ChunkInfo record. Zero live chunks
    /// skip the pass entirely. One call per render type per frame; repeats
    /// are rejected.
    pub fn render(
        &mut self,
        rt: RenderType,
        view_proj: &[f32; 16],
        fog_start: f32,
        fog_end: f32,
        fog_color: [f32; 4],
        alpha_threshold: f32,
    ) -> Result<(), TerrainError> {
        self.ensure_live()?;
        let session = self.session.as_mut().ok_or(TerrainError::NoOpenFrame)?;
        if session.pending.rendered[rt.index()] {
            return Err(TerrainError::RenderTypeAlreadyRendered(rt.label()));
        }

        let res = &self.render_types[rt.index()];
        let live = res.store.slots();
        if live.is_empty() {
            session.pending.record(rt, 0, 0);
            return Ok(());
        }

        let uniforms = FrameUniforms {
            view_proj: *view_proj,
            fog_start,
            fog_end,
            fog_color,
            alpha_threshold,
            ..Default::default()
        };
        self.queue
            .write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut total_vertices = 0u64;
        let args: Vec<DrawIndexedIndirectArgs> = live
            .iter()
            .enumerate()
            .map(|(slot, chunk)| {
                total_vertices += chunk.range.count as u64;
                DrawIndexedIndirectArgs {
                    index_count: chunk.range.count / 4 * 6,
                    instance_count: 1,
                    first_index: 0,
                    base_vertex: chunk.range.offset as i32,
                    first_instance: slot as u32,
                }
            })
            .collect();
        self.queue
            .write_buffer(&res.indirect_buffer, 0, bytemuck::cast_slice(&args));

        let depth_view = match &self.depth {
            Some(t) => &t.view,
            None => return Err(TerrainError::NoOpenFrame),
        };
        let (load, depth_load) = if session.cleared {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        } else {
            // First pass of the frame clears to the fog color so unfilled sky
            // reads as distance haze.
            (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: fog_color[0] as f64,
                    g: fog_color[1] as f64,
                    b: fog_color[2] as f64,
                    a: 1.0,
                }),
                wgpu::LoadOp::Clear(1.0),
            )
        };
        let timestamp_writes = self.timestamps.as_ref().map(|ts| {
            let beginning = if session.timestamps_used == 0 {
                session.timestamps_used = 1;
                Some(0)
            } else {
                None
            };
            let end = session.timestamps_used;
            session.timestamps_used += 1;
            wgpu::RenderPassTimestampWrites {
                query_set: &ts.query_set,
                beginning_of_pass_write_index: beginning,
                end_of_pass_write_index: Some(end),
            }
        });

        {
            let mut rpass = session
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(rt.label()),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &session.target_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes,
                    occlusion_query_set: None,
                });
            rpass.set_pipeline(self.pipelines.pipeline(rt));
            rpass.set_bind_group(FRAME_BUFFER_GROUP_ID, &res.bind_group, &[]);
            rpass.set_bind_group(TEXTURE_GROUP_ID, self.textures.bind_group(), &[]);
            rpass.set_vertex_buffer(0, res.mega_buffer.slice(..));
            rpass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.multi_draw_indexed_indirect(&res.indirect_buffer, 0, live.len() as u32);
        }

        session.cleared = true;
        session.pending.record(rt, 1, total_vertices);
        Ok(())
    }

    /// Closes and submits the frame, presenting if it was opened on-screen.
    /// Diagnostics for this frame publish asynchronously once the device
    /// signals completion; until then the accessors keep reporting the
    /// previous frame. A call with no open frame logs and returns.
    pub fn end_frame(&mut self) {
        let Some(mut session) = self.session.take() else {
            log::warn!("terrain: end_frame with no open frame");
            return;
        };

        let readback = self.timestamps.as_ref().and_then(|ts| {
            if session.timestamps_used < 2 {
                return None;
            }
            let count = session.timestamps_used;
            let size = count as u64 * 8;
            let resolve = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Terrain Timestamp Resolve"),
                size,
                usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Terrain Timestamp Readback"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            session
                .encoder
                .resolve_query_set(&ts.query_set, 0..count, &resolve, 0);
            session
                .encoder
                .copy_buffer_to_buffer(&resolve, 0, &readback, 0, size);
            Some((readback, ts.period_nanos))
        });

        self.queue.submit(Some(session.encoder.finish()));
        if let Some(frame) = session.surface_texture {
            frame.present();
        }

        let collector = self.diagnostics.clone();
        let pending = session.pending;
        match readback {
            Some((readback, period_nanos)) => {
                let readback = Arc::new(readback);
                let buffer = Arc::clone(&readback);
                readback.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                    let gpu_time_nanos = match result {
                        Ok(()) => {
                            let stamps: Vec<u64> = {
                                let data = buffer.slice(..).get_mapped_range();
                                bytemuck::cast_slice(&data).to_vec()
                            };
                            buffer.unmap();
                            let first = stamps.first().copied().unwrap_or(0);
                            let last = stamps.last().copied().unwrap_or(0);
                            (last.saturating_sub(first) as f64 * period_nanos as f64) as u64
                        }
                        Err(e) => {
                            log::warn!("terrain: timestamp readback failed: {e}");
                            0
                        }
                    };
                    collector.publish(&pending, gpu_time_nanos);
                });
            }
            None => {
                self.queue.on_submitted_work_done(move || {
                    collector.publish(&pending, 0);
                });
            }
        }
    }

    /// Drives completion callbacks without blocking; diagnostics for
    /// submitted frames land during these polls.
    pub fn poll_completions(&self) -> bool {
        self.device.poll(wgpu::Maintain::Poll).is_queue_empty()
    }

    /// Blocks until all submitted GPU work has finished and every completion
    /// callback has run.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    pub fn frame_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn live_chunk_count(&self, rt: RenderType) -> usize {
        self.render_types[rt.index()].store.len()
    }

    // --- Diagnostics reads: last completed frame, no side effects ---

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn gpu_time_nanos(&self) -> u64 {
        self.diagnostics.snapshot().gpu_time_nanos
    }

    pub fn draw_count(&self) -> u32 {
        self.diagnostics.snapshot().draw_calls
    }

    pub fn vertex_count(&self) -> u64 {
        self.diagnostics.snapshot().vertices
    }

    pub fn rt_draw_count(&self, rt: RenderType) -> u32 {
        self.diagnostics.snapshot().rt_draw_calls[rt.index()]
    }

    pub fn rt_vertex_count(&self, rt: RenderType) -> u64 {
        self.diagnostics.snapshot().rt_vertices[rt.index()]
    }

    /// Releases all owned device resources. Idempotent; an open frame is
    /// abandoned unsubmitted. Every later call on this instance fails with
    /// [`TerrainError::ShutDown`].
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.session = None;
        self.offscreen = None;
        self.depth = None;
        for res in &self.render_types {
            res.store_destroy();
        }
        self.quad_index_buffer.destroy();
        self.shut_down = true;
        log::info!("terrain renderer shut down");
    }

    fn ensure_live(&self) -> Result<(), TerrainError> {
        if self.shut_down {
            Err(TerrainError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl RenderTypeResources {
    fn store_destroy(&self) {
        self.mega_buffer.destroy();
        self.chunk_info_buffer.destroy();
        self.indirect_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}

impl Drop for TerrainRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Doubles the device-side mega-buffer and copies the live contents forward.
/// Range offsets are vertex indices, not pointers, so they all stay valid.
fn grow_mega_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    res: &mut RenderTypeResources,
    rt: RenderType,
    old_capacity: u32,
    new_capacity: u32,
) {
    log::info!(
        "terrain: growing {} mega-buffer {} -> {} vertices",
        rt.label(),
        old_capacity,
        new_capacity,
    );
    let new_buffer = create_mega_buffer(device, rt, new_capacity);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Terrain Mega-Buffer Growth"),
    });
    encoder.copy_buffer_to_buffer(
        &res.mega_buffer,
        0,
        &new_buffer,
        0,
        old_capacity as u64 * VERTEX_STRIDE,
    );
    queue.submit(Some(encoder.finish()));
    res.mega_buffer.destroy();
    res.mega_buffer = new_buffer;
}

fn create_color_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> OffscreenTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Terrain Offscreen Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    OffscreenTarget {
        texture,
        width,
        height,
    }
}

fn create_depth_target(device: &wgpu::Device, width: u32, height: u32) -> DepthTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Terrain Depth Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    DepthTarget {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        width,
        height,
    }
}

/// Static index pattern turning quad vertex streams into triangle lists:
/// two triangles per quad, 16-bit indices, rebased per chunk via base_vertex.
fn quad_indices() -> Vec<u16> {
    let mut indices = Vec::with_capacity(MAX_QUADS_PER_CHUNK * 6);
    for quad in 0..MAX_QUADS_PER_CHUNK as u32 {
        let v = quad * 4;
        for i in [0, 1, 2, 2, 3, 0] {
            indices.push((v + i) as u16);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_index_pattern_covers_the_full_16_bit_space() {
        let indices = quad_indices();
        assert_eq!(indices.len(), MAX_QUADS_PER_CHUNK * 6);
        assert_eq!(indices[..6], [0, 1, 2, 2, 3, 0]);
        // Last quad's highest vertex is exactly the top of u16 range.
        assert_eq!(*indices.last().unwrap(), 65532);
        assert_eq!(indices[indices.len() - 2], 65535);
    }
}
