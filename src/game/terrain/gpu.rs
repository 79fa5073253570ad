use glam::Vec2;
use renderer::{
    AsVertexLayout, BufferDescriptor, BufferId, Renderer, TextureDescriptor, TextureFormat,
    TextureId, VertexBufferLayout,
};

use super::{HeightField, PatchMesh, PatchVertex, Terrain};

/// Terrain resources living on the GPU.
pub struct GpuTerrain {
    pub vertex_buffer: BufferId,
    /// Four control points per patch.
    pub index_buffer: BufferId,
    /// Two triangles per patch, for pipelines without a tessellation stage.
    pub triangle_index_buffer: BufferId,
    /// One `R16Float` texel per height sample.
    pub height_texture: TextureId,

    pub index_count: u32,
    pub triangle_index_count: u32,
    pub patch_count: usize,
    pub layer_count: usize,

    /// World units between two height samples.
    pub cell_spacing: f32,
    /// Texture coordinate step between two neighbouring height texels.
    pub texel_size: Vec2,
}

impl GpuTerrain {
    pub fn new(renderer: &mut Renderer, terrain: &Terrain) -> Self {
        let mesh = terrain.mesh();
        let field = terrain.field();

        let vertex_buffer = renderer.create_buffer_init(
            BufferDescriptor::vertex("terrain_patch_vertices"),
            mesh.vertices(),
        );
        let index_buffer = renderer.create_buffer_init(
            BufferDescriptor::index("terrain_patch_indices"),
            mesh.indices(),
        );
        let triangle_indices = mesh.triangle_indices();
        let triangle_index_buffer = renderer.create_buffer_init(
            BufferDescriptor::index("terrain_triangle_indices"),
            &triangle_indices,
        );

        let texels = field.to_f16_texels();
        let height_texture = renderer.create_texture_init(
            height_texture_descriptor(field),
            bytemuck::cast_slice(&texels),
        );

        tracing::info!(
            "Uploaded terrain: {} patches, {} indices, {}x{} height texture",
            mesh.layout().patch_total(),
            mesh.indices().len(),
            field.width(),
            field.height(),
        );

        Self {
            vertex_buffer,
            index_buffer,
            triangle_index_buffer,
            height_texture,
            index_count: mesh.indices().len() as u32,
            triangle_index_count: triangle_indices.len() as u32,
            patch_count: mesh.layout().patch_total(),
            layer_count: terrain.layer_count(),
            cell_spacing: field.cell_spacing,
            texel_size: texel_size(field),
        }
    }

    /// Replace every resource after the terrain was rebuilt.
    pub fn update(&mut self, renderer: &mut Renderer, terrain: &Terrain) {
        self.release(renderer);
        *self = Self::new(renderer, terrain);
    }

    pub fn release(&self, renderer: &mut Renderer) {
        renderer.remove_buffer(self.vertex_buffer);
        renderer.remove_buffer(self.index_buffer);
        renderer.remove_buffer(self.triangle_index_buffer);
        renderer.remove_texture(self.height_texture);
    }

    /// Layout of [GpuTerrain::vertex_buffer], for building the terrain pipeline.
    pub fn vertex_layout() -> VertexBufferLayout {
        PatchVertex::vertex_buffer_layout()
    }

    /// Control points making up a single patch.
    pub fn patch_control_points() -> u32 {
        PatchMesh::INDICES_PER_PATCH as u32
    }
}

pub fn height_texture_descriptor(field: &HeightField) -> TextureDescriptor {
    TextureDescriptor {
        label: String::from("terrain_height_map"),
        size: field.size(),
        format: TextureFormat::R16Float,
    }
}

/// Size of one height texel in texture coordinates.
pub fn texel_size(field: &HeightField) -> Vec2 {
    Vec2::ONE / field.size().as_vec2()
}
