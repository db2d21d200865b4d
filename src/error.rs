use thiserror::Error;

use crate::types::{MAX_CHUNKS, MAX_VERTICES_PER_CHUNK};

/// Failures are local and recoverable: no variant leaves the chunk registry
/// or the mega-buffer pool in a partially-mutated state.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("render type index {0} out of range (0..=3)")]
    InvalidRenderType(usize),

    #[error("chunk vertex count {0} is not a multiple of 4")]
    NotQuadAligned(u32),

    #[error("chunk vertex count {0} exceeds per-chunk limit {MAX_VERTICES_PER_CHUNK}")]
    ChunkTooLarge(u32),

    #[error("render type already holds {MAX_CHUNKS} live chunks")]
    TooManyChunks,

    #[error("vertex data is {actual} bytes, expected {expected} for {vertices} vertices")]
    VertexDataSizeMismatch {
        vertices: u32,
        expected: u64,
        actual: usize,
    },

    #[error("mega-buffer cannot grow past {max} vertices (need {needed})")]
    OutOfSpace { needed: u64, max: u64 },

    #[error("pixel data is {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    TextureSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("a frame is already open")]
    FrameAlreadyOpen,

    #[error("no frame is open")]
    NoOpenFrame,

    #[error("render type {0} was already rendered this frame")]
    RenderTypeAlreadyRendered(&'static str),

    #[error("no presentable surface: {0}")]
    SurfaceUnavailable(String),

    #[error("device is missing required features: {0:?}")]
    MissingFeatures(wgpu::Features),

    #[error("renderer has been shut down")]
    ShutDown,
}
