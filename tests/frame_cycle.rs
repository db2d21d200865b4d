//! End-to-end frame cycle against a real device. Skips (passing) when no
//! adapter with multi-draw-indirect support is available.

use terrain_megabuf::{
    RenderType, TerrainConfig, TerrainError, TerrainRenderer, TextureKind, OPTIONAL_FEATURES,
    REQUIRED_FEATURES, VERTEX_STRIDE,
};

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn create_renderer() -> Option<TerrainRenderer> {
    let _ = env_logger::builder().is_test(true).try_init();

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
    if !adapter.features().contains(REQUIRED_FEATURES) {
        eprintln!("skipping: adapter lacks multi-draw-indirect support");
        return None;
    }
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("terrain test device"),
            required_features: REQUIRED_FEATURES | (OPTIONAL_FEATURES & adapter.features()),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
        },
        None,
    ))
    .ok()?;

    TerrainRenderer::new(device, queue, None, TerrainConfig::default()).ok()
}

/// Flat quads along +x, one per 4 vertices. Content is irrelevant to the
/// counters but keeps the draw geometrically sane.
fn quad_vertices(count: u32) -> Vec<u8> {
    assert_eq!(count % 4, 0);
    let mut data = vec![0u8; (count as u64 * VERTEX_STRIDE) as usize];
    for v in 0..count as usize {
        let quad = (v / 4) as f32;
        let corner = v % 4;
        let (dx, dz) = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)][corner];
        let pos = [quad + dx, 0.0f32, dz];
        data[v * 32..v * 32 + 12].copy_from_slice(bytemuck::cast_slice(&pos));
    }
    data
}

#[test]
fn full_frame_batches_each_render_type_into_one_draw() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    renderer
        .set_chunk(RenderType::Solid, 0, &quad_vertices(100), 100, 0.0, 0.0, 0.0)
        .unwrap();
    renderer
        .set_chunk(RenderType::Solid, 1, &quad_vertices(48), 48, 16.0, 0.0, 0.0)
        .unwrap();

    renderer.begin_frame(64, 64, false).unwrap();
    for rt in RenderType::ALL {
        renderer
            .render(rt, &IDENTITY, 32.0, 96.0, [0.6, 0.7, 0.9, 1.0], 0.0)
            .unwrap();
    }
    renderer.end_frame();
    renderer.wait_idle();

    // Two chunks, one batched draw, and no draws for the empty types.
    assert_eq!(renderer.rt_draw_count(RenderType::Solid), 1);
    assert_eq!(renderer.rt_vertex_count(RenderType::Solid), 148);
    assert_eq!(renderer.rt_draw_count(RenderType::Cutout), 0);
    assert_eq!(renderer.rt_vertex_count(RenderType::Translucent), 0);
    assert_eq!(renderer.draw_count(), 1);
    assert_eq!(renderer.vertex_count(), 148);
}

#[test]
fn replacement_and_clear_are_reflected_in_the_next_frame() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    renderer
        .set_chunk(RenderType::Solid, 5, &quad_vertices(64), 64, 0.0, 0.0, 0.0)
        .unwrap();
    // Replace the same identity with a smaller mesh.
    renderer
        .set_chunk(RenderType::Solid, 5, &quad_vertices(8), 8, 0.0, 0.0, 0.0)
        .unwrap();
    assert_eq!(renderer.live_chunk_count(RenderType::Solid), 1);

    renderer.begin_frame(32, 32, false).unwrap();
    renderer
        .render(RenderType::Solid, &IDENTITY, 32.0, 96.0, [0.0; 4], 0.0)
        .unwrap();
    renderer.end_frame();
    renderer.wait_idle();
    assert_eq!(renderer.rt_vertex_count(RenderType::Solid), 8);

    renderer.clear_chunks(RenderType::Solid);
    renderer.begin_frame(32, 32, false).unwrap();
    renderer
        .render(RenderType::Solid, &IDENTITY, 32.0, 96.0, [0.0; 4], 0.0)
        .unwrap();
    renderer.end_frame();
    renderer.wait_idle();
    assert_eq!(renderer.rt_draw_count(RenderType::Solid), 0);
    assert_eq!(renderer.vertex_count(), 0);
}

#[test]
fn frame_lifecycle_misuse_is_rejected() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    assert!(matches!(
        renderer.render(RenderType::Solid, &IDENTITY, 0.0, 1.0, [0.0; 4], 0.0),
        Err(TerrainError::NoOpenFrame)
    ));

    renderer.begin_frame(16, 16, false).unwrap();
    assert!(matches!(
        renderer.begin_frame(16, 16, false),
        Err(TerrainError::FrameAlreadyOpen)
    ));
    renderer
        .render(RenderType::Solid, &IDENTITY, 0.0, 1.0, [0.0; 4], 0.0)
        .unwrap();
    assert!(matches!(
        renderer.render(RenderType::Solid, &IDENTITY, 0.0, 1.0, [0.0; 4], 0.0),
        Err(TerrainError::RenderTypeAlreadyRendered(_))
    ));
    // No surface was configured, so on-screen frames are unavailable.
    renderer.end_frame();
    assert!(matches!(
        renderer.begin_frame(16, 16, true),
        Err(TerrainError::SurfaceUnavailable(_))
    ));
    renderer.wait_idle();
}

#[test]
fn invalid_uploads_are_rejected_before_touching_the_device() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    // Length that disagrees with the vertex count.
    assert!(matches!(
        renderer.set_chunk(RenderType::Solid, 0, &[0u8; 100], 4, 0.0, 0.0, 0.0),
        Err(TerrainError::VertexDataSizeMismatch { .. })
    ));
    // Not a whole number of quads.
    assert!(matches!(
        renderer.set_chunk(RenderType::Solid, 0, &[0u8; 6 * 32], 6, 0.0, 0.0, 0.0),
        Err(TerrainError::NotQuadAligned(6))
    ));
    assert_eq!(renderer.live_chunk_count(RenderType::Solid), 0);
}

#[test]
fn texture_imports_validate_pixel_buffer_size() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    assert!(matches!(
        renderer.import_texture(TextureKind::Atlas, 16, 16, &[0u8; 100]),
        Err(TerrainError::TextureSizeMismatch { .. })
    ));
    renderer
        .import_texture(TextureKind::Atlas, 16, 16, &[128u8; 16 * 16 * 4])
        .unwrap();
    renderer
        .import_texture(TextureKind::Lightmap, 16, 16, &[255u8; 16 * 16 * 4])
        .unwrap();

    // The frame after an import renders with the new bind group.
    renderer
        .set_chunk(RenderType::Solid, 0, &quad_vertices(4), 4, 0.0, 0.0, 0.0)
        .unwrap();
    renderer.begin_frame(16, 16, false).unwrap();
    renderer
        .render(RenderType::Solid, &IDENTITY, 0.0, 64.0, [0.0; 4], 0.0)
        .unwrap();
    renderer.end_frame();
    renderer.wait_idle();
    assert_eq!(renderer.vertex_count(), 4);
}

#[test]
fn shutdown_is_terminal_and_idempotent() {
    let Some(mut renderer) = create_renderer() else {
        return;
    };

    renderer.shutdown();
    renderer.shutdown();
    assert!(matches!(
        renderer.set_chunk(RenderType::Solid, 0, &quad_vertices(4), 4, 0.0, 0.0, 0.0),
        Err(TerrainError::ShutDown)
    ));
    assert!(matches!(
        renderer.begin_frame(16, 16, false),
        Err(TerrainError::ShutDown)
    ));
}

#[test]
fn mega_buffer_growth_keeps_earlier_chunks_rendering() {
    let Some(renderer) = create_renderer() else {
        return;
    };
    drop(renderer);

    // Growth path needs a tiny initial capacity to trigger cheaply.
    let Some(mut renderer) = create_small_renderer() else {
        return;
    };
    renderer
        .set_chunk(RenderType::Solid, 0, &quad_vertices(64), 64, 0.0, 0.0, 0.0)
        .unwrap();
    for i in 1..8 {
        renderer
            .set_chunk(RenderType::Solid, i, &quad_vertices(64), 64, i as f32, 0.0, 0.0)
            .unwrap();
    }
    renderer.begin_frame(32, 32, false).unwrap();
    renderer
        .render(RenderType::Solid, &IDENTITY, 32.0, 96.0, [0.0; 4], 0.0)
        .unwrap();
    renderer.end_frame();
    renderer.wait_idle();
    assert_eq!(renderer.rt_draw_count(RenderType::Solid), 1);
    assert_eq!(renderer.rt_vertex_count(RenderType::Solid), 8 * 64);
}

fn create_small_renderer() -> Option<TerrainRenderer> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter =
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
    if !adapter.features().contains(REQUIRED_FEATURES) {
        return None;
    }
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("terrain small test device"),
            required_features: REQUIRED_FEATURES,
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
        },
        None,
    ))
    .ok()?;
    TerrainRenderer::new(
        device,
        queue,
        None,
        TerrainConfig {
            initial_vertex_capacity: 64,
            ..TerrainConfig::default()
        },
    )
    .ok()
}
