use bytemuck::{Pod, Zeroable};

use crate::error::TerrainError;

/// Max chunk sections tracked per render type.
pub const MAX_CHUNKS: usize = 8192;

/// Max quads per chunk section. 16384 quads * 4 verts = 65536, so the shared
/// quad index buffer stays within a 16-bit index space per chunk.
pub const MAX_QUADS_PER_CHUNK: usize = 16384;

/// Max vertices a single chunk section may carry.
pub const MAX_VERTICES_PER_CHUNK: u32 = (MAX_QUADS_PER_CHUNK * 4) as u32;

/// Size of one terrain vertex record in bytes. The mesher produces fixed
/// 32-byte records (position, color, atlas uv, lightmap uv, normal); this
/// crate copies them into device memory verbatim.
pub const VERTEX_STRIDE: u64 = 32;

/// Terrain render passes, in the order the world renderer drives them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RenderType {
    Solid,
    CutoutMipped,
    Cutout,
    Translucent,
}

impl RenderType {
    pub const COUNT: usize = 4;

    pub const ALL: [RenderType; Self::COUNT] = [
        RenderType::Solid,
        RenderType::CutoutMipped,
        RenderType::Cutout,
        RenderType::Translucent,
    ];

    pub fn from_index(index: usize) -> Option<RenderType> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderType::Solid => "solid",
            RenderType::CutoutMipped => "cutout_mipped",
            RenderType::Cutout => "cutout",
            RenderType::Translucent => "translucent",
        }
    }

    /// Translucent geometry blends over the scene; everything else overwrites.
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            RenderType::Translucent => Some(wgpu::BlendState::ALPHA_BLENDING),
            _ => None,
        }
    }

    /// Translucent geometry tests depth but must not occlude what is behind it.
    pub fn depth_write_enabled(self) -> bool {
        !matches!(self, RenderType::Translucent)
    }
}

/// Upstream drivers address render types by integer.
impl TryFrom<usize> for RenderType {
    type Error = TerrainError;

    fn try_from(index: usize) -> Result<Self, TerrainError> {
        Self::from_index(index).ok_or(TerrainError::InvalidRenderType(index))
    }
}

/// Per-chunk metadata record, one storage-buffer slot per live chunk.
///
/// A single batched draw positions every chunk of a render type: each
/// sub-draw carries its slot as the instance index and the vertex stage looks
/// its world offset up here, so no per-chunk bind or uniform churn happens
/// inside the pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct ChunkInfo {
    pub offset: [f32; 3],
    pub _pad0: f32,
    /// Offset into the mega-buffer, in vertices.
    pub vertex_offset: u32,
    /// Number of vertices, always a multiple of 4.
    pub vertex_count: u32,
    pub _pad1: [u32; 2],
}

/// Per-frame uniforms shared by all chunks of one render type.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Column-major 4x4 view-projection matrix.
    pub view_proj: [f32; 16],
    pub fog_start: f32,
    pub fog_end: f32,
    pub _pad0: [f32; 2],
    pub fog_color: [f32; 4],
    pub alpha_threshold: f32,
    pub _pad1: [f32; 3],
}

/// Indexed indirect draw arguments, matching wgpu's GPU-side layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// The two resident terrain textures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureKind {
    /// Block atlas, sampled nearest.
    Atlas,
    /// 16x16-ish lightmap, sampled linear.
    Lightmap,
}

impl TextureKind {
    pub fn from_index(index: usize) -> Option<TextureKind> {
        match index {
            0 => Some(TextureKind::Atlas),
            1 => Some(TextureKind::Lightmap),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_record_layouts_match_wire_contract() {
        assert_eq!(std::mem::size_of::<ChunkInfo>(), 32);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 112);
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
    }

    #[test]
    fn render_type_round_trips() {
        for rt in RenderType::ALL {
            assert_eq!(RenderType::from_index(rt.index()), Some(rt));
        }
        assert_eq!(RenderType::from_index(4), None);
    }
}
