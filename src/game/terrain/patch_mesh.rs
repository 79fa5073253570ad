use glam::{UVec2, Vec2, Vec3};
use renderer::{AsVertexLayout, VertexAttribute, VertexBufferLayout, VertexFormat};

use crate::game::math::{BoundingBox, gcd};

use super::HeightField;

/// How the height field is partitioned into patches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchLayout {
    /// The exponent that was asked for, `cells_per_patch` is `1 << exponent` unless clamped.
    pub requested_exponent: u32,
    /// Amount of height field cells on each side of a patch.
    pub cells_per_patch: u32,
    /// Amount of patches on each axis.
    pub patch_count: UVec2,
    /// Height field cells on the far edges that are not covered by any patch.
    pub dropped_cells: UVec2,
}

impl PatchLayout {
    /// Pick the patch size for `2^exponent` cells per patch.
    ///
    /// The size is clamped to the greatest common divisor of the cell counts so patches can cover
    /// the field. Cells that still don't fit a whole patch are dropped from the mesh.
    pub fn configure(exponent: u32, field: &HeightField) -> Self {
        let cell_count = field.cell_count();

        let requested = match 1_u32.checked_shl(exponent) {
            Some(cells) => cells,
            None => {
                tracing::warn!(
                    "cells per patch exponent {exponent} is out of range, using 1 cell per patch"
                );
                1
            }
        };

        let divisor = gcd(cell_count.x, cell_count.y);
        let cells_per_patch = if requested > divisor {
            tracing::warn!(
                "{requested} cells per patch does not divide {}x{} cells, clamped to {divisor}",
                cell_count.x,
                cell_count.y
            );
            divisor
        } else {
            requested
        };

        let patch_count = cell_count / cells_per_patch;
        let dropped_cells = cell_count - patch_count * cells_per_patch;
        if dropped_cells != UVec2::ZERO {
            tracing::warn!(
                "patches of {cells_per_patch} cells leave {}x{} cells uncovered",
                dropped_cells.x,
                dropped_cells.y
            );
        }

        Self {
            requested_exponent: exponent,
            cells_per_patch,
            patch_count,
            dropped_cells,
        }
    }

    /// Amount of patch corner vertices on each axis.
    #[inline]
    pub fn patch_vertex_count(&self) -> UVec2 {
        self.patch_count + UVec2::ONE
    }

    #[inline]
    pub fn patch_total(&self) -> usize {
        self.patch_count.x as usize * self.patch_count.y as usize
    }

    #[inline]
    pub fn patch_index(&self, patch_x: u32, patch_y: u32) -> usize {
        patch_y as usize * self.patch_count.x as usize + patch_x as usize
    }
}

/// A corner of a patch. Heights are resolved from the height texture at draw time, so the
/// position lies on the XZ plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PatchVertex {
    pub position: Vec3,
    pub tex_coord: Vec2,
    /// `(min, max)` height of the patch this vertex is the upper-left corner of, zero for all
    /// other vertices.
    pub bounds_y: Vec2,
}

impl AsVertexLayout for PatchVertex {
    fn vertex_buffer_layout() -> VertexBufferLayout {
        const ATTRIBUTES: &[VertexAttribute] = &[
            VertexAttribute {
                format: VertexFormat::Float32x3,
                offset: std::mem::offset_of!(PatchVertex, position) as u64,
                shader_location: 0,
            },
            VertexAttribute {
                format: VertexFormat::Float32x2,
                offset: std::mem::offset_of!(PatchVertex, tex_coord) as u64,
                shader_location: 1,
            },
            VertexAttribute {
                format: VertexFormat::Float32x2,
                offset: std::mem::offset_of!(PatchVertex, bounds_y) as u64,
                shader_location: 2,
            },
        ];

        VertexBufferLayout {
            array_stride: std::mem::size_of::<PatchVertex>() as u64,
            attributes: ATTRIBUTES,
        }
    }
}

/// Static patch geometry for the tessellation stage plus the per patch height bounds used for
/// culling.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchMesh {
    layout: PatchLayout,
    /// World space size of the terrain on X and Z.
    extent: Vec2,
    /// `(min, max)` height per patch, row-major.
    bounds: Vec<Vec2>,
    vertices: Vec<PatchVertex>,
    /// 4 control points per patch: top-left, top-right, bottom-left, bottom-right.
    indices: Vec<u32>,
}

impl PatchMesh {
    /// Amount of indices for each patch in [PatchMesh::indices].
    pub const INDICES_PER_PATCH: usize = 4;

    pub fn build(field: &HeightField, exponent: u32) -> Self {
        let layout = PatchLayout::configure(exponent, field);
        let bounds = Self::build_patch_bounds(&layout, field);
        let vertices = Self::build_vertex_buffer(&layout, field, &bounds);
        let indices = Self::build_index_buffer(&layout);

        tracing::debug!(
            "built {}x{} patches of {} cells ({} vertices, {} indices)",
            layout.patch_count.x,
            layout.patch_count.y,
            layout.cells_per_patch,
            vertices.len(),
            indices.len()
        );

        Self {
            layout,
            extent: field.world_extent(),
            bounds,
            vertices,
            indices,
        }
    }

    /// Throw away everything and build it again from `field`.
    pub fn rebuild(&mut self, field: &HeightField, exponent: u32) {
        *self = Self::build(field, exponent);
    }

    /// Scan the `(cells_per_patch + 1)^2` samples under each patch. Neighbouring patches share
    /// their edge samples, so those are scanned twice.
    pub fn build_patch_bounds(layout: &PatchLayout, field: &HeightField) -> Vec<Vec2> {
        let mut bounds = Vec::with_capacity(layout.patch_total());

        for patch_y in 0..layout.patch_count.y {
            for patch_x in 0..layout.patch_count.x {
                let min = UVec2::new(patch_x, patch_y) * layout.cells_per_patch;
                let max = min + UVec2::splat(layout.cells_per_patch);
                let (lo, hi) = field.min_max(min, max);
                bounds.push(Vec2::new(lo, hi));
            }
        }

        bounds
    }

    /// One vertex per patch corner on a flat grid centered on the origin, row 0 at +Z. Texture
    /// coordinates run from 0 to 1 over the grid.
    pub fn build_vertex_buffer(
        layout: &PatchLayout,
        field: &HeightField,
        bounds: &[Vec2],
    ) -> Vec<PatchVertex> {
        let vertex_count = layout.patch_vertex_count();
        let extent = field.world_extent();
        let half = extent * 0.5;

        let patch_size = extent / layout.patch_count.as_vec2();
        let uv_step = Vec2::ONE / layout.patch_count.as_vec2();

        let mut vertices = Vec::with_capacity(vertex_count.x as usize * vertex_count.y as usize);

        for row in 0..vertex_count.y {
            let z = half.y - row as f32 * patch_size.y;
            for col in 0..vertex_count.x {
                let x = -half.x + col as f32 * patch_size.x;

                let bounds_y = if row < layout.patch_count.y && col < layout.patch_count.x {
                    bounds[layout.patch_index(col, row)]
                } else {
                    Vec2::ZERO
                };

                vertices.push(PatchVertex {
                    position: Vec3::new(x, 0.0, z),
                    tex_coord: Vec2::new(col as f32 * uv_step.x, row as f32 * uv_step.y),
                    bounds_y,
                });
            }
        }

        vertices
    }

    /// Four control points per patch for a patch list topology.
    pub fn build_index_buffer(layout: &PatchLayout) -> Vec<u32> {
        let columns = layout.patch_vertex_count().x;
        let mut indices = Vec::with_capacity(layout.patch_total() * Self::INDICES_PER_PATCH);

        for row in 0..layout.patch_count.y {
            for col in 0..layout.patch_count.x {
                let top_left = row * columns + col;
                let bottom_left = (row + 1) * columns + col;
                indices.extend_from_slice(&[top_left, top_left + 1, bottom_left, bottom_left + 1]);
            }
        }

        indices
    }

    /// Two clockwise triangles per patch for back ends without a tessellation stage. The quads
    /// are split the same way [HeightField::height_at] splits cells.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.indices
            .chunks_exact(Self::INDICES_PER_PATCH)
            .flat_map(|quad| {
                let (top_left, top_right) = (quad[0], quad[1]);
                let (bottom_left, bottom_right) = (quad[2], quad[3]);
                [
                    top_left,
                    top_right,
                    bottom_left,
                    top_right,
                    bottom_right,
                    bottom_left,
                ]
            })
            .collect()
    }

    #[inline]
    pub fn layout(&self) -> &PatchLayout {
        &self.layout
    }

    #[inline]
    pub fn vertices(&self) -> &[PatchVertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn bounds(&self) -> &[Vec2] {
        &self.bounds
    }

    pub fn patch_bounds(&self, patch_x: u32, patch_y: u32) -> Option<Vec2> {
        if patch_x >= self.layout.patch_count.x || patch_y >= self.layout.patch_count.y {
            return None;
        }
        Some(self.bounds[self.layout.patch_index(patch_x, patch_y)])
    }

    /// World space box around the patch at `index`, for culling against a [Frustum].
    ///
    /// [Frustum]: crate::game::math::Frustum
    pub fn patch_bounding_box(&self, index: usize) -> Option<BoundingBox> {
        let count = self.layout.patch_count;
        let (col, row) = (index % count.x as usize, index / count.x as usize);
        let bounds = self.patch_bounds(u32::try_from(col).ok()?, u32::try_from(row).ok()?)?;

        let patch_size = self.extent / count.as_vec2();
        let half = self.extent * 0.5;

        let min_x = -half.x + col as f32 * patch_size.x;
        let max_z = half.y - row as f32 * patch_size.y;

        Some(BoundingBox::new(
            Vec3::new(min_x, bounds.x, max_z - patch_size.y),
            Vec3::new(min_x + patch_size.x, bounds.y, max_z),
        ))
    }
}
