//! GPU-resident terrain geometry for a voxel world renderer.
//!
//! Chunk meshes are built elsewhere; this crate owns their life on the
//! device. Each render type (solid, cutout-mipped, cutout, translucent) keeps
//! one growable mega vertex buffer carved into per-chunk ranges, a registry
//! mapping chunk identities to those ranges, and a frame path that draws
//! every live chunk of a render type in a single multi-draw-indirect call.
//! Frame diagnostics (GPU time, draws, vertices) are collected asynchronously
//! and always describe the most recently completed frame.
//!
//! The caller supplies the `wgpu` device and queue, drives the frame
//! lifecycle (`begin_frame` / `render` per type / `end_frame`), and feeds
//! chunk uploads, optionally paced by [`UploadBudgeter`].

mod alloc;
mod budget;
mod diagnostics;
mod error;
mod pipelines;
mod registry;
mod renderer;
mod textures;
mod types;

pub use budget::{UploadBudgeter, DEFAULT_MIN_UPLOADS_PER_FRAME, DEFAULT_UPLOAD_BUDGET};
pub use diagnostics::DiagnosticsSnapshot;
pub use error::TerrainError;
pub use renderer::{
    ScreenTarget, TerrainConfig, TerrainRenderer, OPTIONAL_FEATURES, REQUIRED_FEATURES,
};
pub use types::{
    RenderType, TextureKind, MAX_CHUNKS, MAX_QUADS_PER_CHUNK, MAX_VERTICES_PER_CHUNK,
    VERTEX_STRIDE,
};
