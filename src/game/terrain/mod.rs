use glam::{UVec2, Vec2};

use crate::engine::{
    assets::{AssetError, Assets},
    dirty::Dirty,
};

use super::config::TerrainInfo;

pub mod gpu;
pub mod height_field;
pub mod patch_mesh;

pub use height_field::HeightField;
pub use patch_mesh::{PatchLayout, PatchMesh, PatchVertex};

#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("Could not load height map: {0}")]
    Asset(#[from] AssetError),

    #[error("Height field needs at least 2x2 samples, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Expected {expected} height samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    #[error("Height field contains non-finite samples")]
    NonFiniteHeight,
}

/// The playable terrain: smoothed height field plus the patch geometry built from it.
pub struct Terrain {
    assets: Assets,
    info: TerrainInfo,

    field: HeightField,
    mesh: PatchMesh,

    /// Set when the height samples have to be read from disk again.
    reload: Dirty,
    /// Set when only the patch geometry is stale.
    rebuild: Dirty,
}

impl Terrain {
    /// Load the terrain described by `info`. If the height map can not be loaded, an error is
    /// logged and a flat terrain of the configured size is used instead.
    pub fn new(info: TerrainInfo, assets: &Assets) -> Self {
        let field = match Self::load_field(&info, assets) {
            Ok(field) => field,
            Err(err) => {
                tracing::error!(
                    "Could not load terrain ({}), using flat terrain: {err}",
                    info.height_map.display()
                );
                HeightField::placeholder(info.size, info.cell_spacing, info.height_scale)
            }
        };

        let mesh = PatchMesh::build(&field, info.cells_per_patch_exponent);

        tracing::info!(
            "Terrain {}x{} samples, {}x{} patches, {} layers",
            field.width(),
            field.height(),
            mesh.layout().patch_count.x,
            mesh.layout().patch_count.y,
            info.layers.len(),
        );

        Self {
            assets: assets.clone(),
            info,
            field,
            mesh,
            reload: Dirty::clean(),
            rebuild: Dirty::clean(),
        }
    }

    fn load_field(info: &TerrainInfo, assets: &Assets) -> Result<HeightField, TerrainError> {
        let expected = info.size.x as usize * info.size.y as usize;
        let bytes = assets.load_raw_sized(&info.height_map, expected)?;

        let mut field = HeightField::load(
            &bytes,
            info.size.x,
            info.size.y,
            info.cell_spacing,
            info.height_scale,
        )?;
        field.smooth();

        Ok(field)
    }

    /// Reload the height map and rebuild all geometry. On failure the current terrain is kept
    /// untouched.
    pub fn recreate(&mut self) -> Result<(), TerrainError> {
        let field = Self::load_field(&self.info, &self.assets)?;
        self.mesh.rebuild(&field, self.info.cells_per_patch_exponent);
        self.field = field;

        tracing::info!(
            "Recreated terrain with {} patches",
            self.mesh.layout().patch_total()
        );

        Ok(())
    }

    /// Apply pending setting changes. Call once at the start of a frame, before the geometry is
    /// read. Returns true if anything was rebuilt.
    pub fn sync(&mut self) -> bool {
        if self.reload.is_dirty() {
            self.reload = Dirty::clean();
            self.rebuild = Dirty::clean();
            let Err(err) = self.recreate() else {
                return true;
            };

            tracing::warn!("Keeping previous terrain: {err}");

            // The settings describe the field that is still in use.
            self.info.height_scale = self.field.height_scale;
            self.info.cell_spacing = self.field.cell_spacing;

            let exponent = self.info.cells_per_patch_exponent;
            if self.mesh.layout().requested_exponent == exponent {
                return false;
            }
            self.mesh.rebuild(&self.field, exponent);
            return true;
        }

        let exponent = self.info.cells_per_patch_exponent;
        let (field, mesh) = (&self.field, &mut self.mesh);
        self.rebuild.if_dirty(|| mesh.rebuild(field, exponent))
    }

    pub fn set_height_scale(&mut self, height_scale: f32) {
        if !height_scale.is_finite() || height_scale <= 0.0 {
            tracing::warn!("Ignoring height scale {height_scale}");
            return;
        }
        if self.info.height_scale != height_scale {
            self.info.height_scale = height_scale;
            self.reload.smudge();
        }
    }

    pub fn set_cell_spacing(&mut self, cell_spacing: f32) {
        if !cell_spacing.is_finite() || cell_spacing <= 0.0 {
            tracing::warn!("Ignoring cell spacing {cell_spacing}");
            return;
        }
        if self.info.cell_spacing != cell_spacing {
            self.info.cell_spacing = cell_spacing;
            self.reload.smudge();
        }
    }

    pub fn set_cells_per_patch_exponent(&mut self, exponent: u32) {
        if self.info.cells_per_patch_exponent != exponent {
            self.info.cells_per_patch_exponent = exponent;
            self.rebuild.smudge();
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.reload.is_dirty() || self.rebuild.is_dirty()
    }

    /// Terrain height under the world position, for placing things on the ground.
    #[inline]
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.field.height_at(x, z)
    }

    /// World size along the X axis.
    pub fn width(&self) -> f32 {
        self.extent().x
    }

    /// World size along the Z axis.
    pub fn depth(&self) -> f32 {
        self.extent().y
    }

    fn extent(&self) -> Vec2 {
        self.field.world_extent()
    }

    pub fn size(&self) -> UVec2 {
        self.field.size()
    }

    pub fn info(&self) -> &TerrainInfo {
        &self.info
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn mesh(&self) -> &PatchMesh {
        &self.mesh
    }

    pub fn layer_count(&self) -> usize {
        self.info.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::engine::assets::testing::MemoryFileSystem;

    use super::*;

    const EPSILON: f32 = 1e-4;

    fn info(size: u32, exponent: u32) -> TerrainInfo {
        TerrainInfo {
            height_map: PathBuf::from("terrain.raw"),
            size: UVec2::splat(size),
            cell_spacing: 1.0,
            height_scale: 255.0,
            cells_per_patch_exponent: exponent,
            ..Default::default()
        }
    }

    fn assets_with(bytes: Vec<u8>) -> Assets {
        MemoryFileSystem::default()
            .with_file("terrain.raw", bytes)
            .into_assets()
    }

    #[test]
    fn loads_and_smooths() {
        // 3x3 map with a single spike in the middle.
        let mut bytes = vec![0; 9];
        bytes[4] = 90;
        let terrain = Terrain::new(info(3, 0), &assets_with(bytes));

        // Every sample sees the center, corners average 4, edges 6 and the center 9.
        let field = terrain.field();
        assert!((field.get(0, 0) - 90.0 / 4.0).abs() < EPSILON);
        assert!((field.get(1, 0) - 90.0 / 6.0).abs() < EPSILON);
        assert!((field.get(1, 1) - 90.0 / 9.0).abs() < EPSILON);

        assert_eq!(terrain.width(), 2.0);
        assert_eq!(terrain.depth(), 2.0);
        assert_eq!(terrain.mesh().layout().patch_count, UVec2::splat(2));
        assert_eq!(terrain.layer_count(), 5);
        assert!((terrain.height_at(0.0, 0.0) - 10.0).abs() < EPSILON);
    }

    #[test]
    fn missing_height_map_falls_back_to_flat() {
        let assets = MemoryFileSystem::default().into_assets();
        let terrain = Terrain::new(info(17, 2), &assets);

        assert_eq!(terrain.size(), UVec2::splat(17));
        assert!(terrain.field().heights().iter().all(|&h| h == 0.0));
        assert_eq!(terrain.mesh().layout().patch_count, UVec2::splat(4));
        assert_eq!(terrain.height_at(1.0, -3.0), 0.0);
    }

    #[test]
    fn undersized_height_map_falls_back_to_flat() {
        let terrain = Terrain::new(info(5, 1), &assets_with(vec![255; 24]));
        assert!(terrain.field().heights().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn failed_recreate_keeps_previous_terrain() {
        let mut terrain = Terrain::new(info(5, 1), &assets_with(vec![255; 25]));
        let before = terrain.field().clone();
        assert!((before.get(2, 2) - 255.0).abs() < EPSILON);

        // The new size asks for more samples than the file holds.
        terrain.info.size = UVec2::splat(9);
        assert!(matches!(
            terrain.recreate(),
            Err(TerrainError::Asset(AssetError::Undersized { .. }))
        ));
        assert_eq!(terrain.field(), &before);
        assert_eq!(terrain.mesh().layout().patch_count, UVec2::splat(2));
    }

    #[test]
    fn setters_defer_rebuild_until_sync() {
        let mut terrain = Terrain::new(info(9, 1), &assets_with(vec![51; 81]));
        assert!(!terrain.is_dirty());
        assert!(!terrain.sync());

        terrain.set_cells_per_patch_exponent(2);
        assert!(terrain.is_dirty());
        // Nothing changes before sync.
        assert_eq!(terrain.mesh().layout().patch_count, UVec2::splat(4));

        assert!(terrain.sync());
        assert!(!terrain.is_dirty());
        assert_eq!(terrain.mesh().layout().patch_count, UVec2::splat(2));

        terrain.set_height_scale(510.0);
        assert!(terrain.sync());
        assert!((terrain.height_at(0.0, 0.0) - 102.0).abs() < EPSILON);

        terrain.set_cell_spacing(2.0);
        assert!(terrain.sync());
        assert_eq!(terrain.width(), 16.0);

        // Setting the same value again is not a change.
        terrain.set_cell_spacing(2.0);
        assert!(!terrain.is_dirty());
    }

    #[test]
    fn failed_reload_on_sync_is_not_fatal() {
        let mut terrain = Terrain::new(info(5, 1), &assets_with(vec![255; 25]));
        terrain.assets = MemoryFileSystem::default().into_assets();

        terrain.set_height_scale(1.0);
        assert!(!terrain.sync());
        assert!(!terrain.is_dirty());
        assert!((terrain.field().get(0, 0) - 255.0).abs() < EPSILON);
        assert_eq!(terrain.info().height_scale, 255.0);
    }

    #[test]
    fn failed_reload_still_applies_patch_size() {
        let mut terrain = Terrain::new(info(9, 1), &assets_with(vec![255; 81]));
        assert_eq!(terrain.mesh().layout().cells_per_patch, 2);
        terrain.assets = MemoryFileSystem::default().into_assets();

        terrain.set_cells_per_patch_exponent(2);
        terrain.set_height_scale(1.0);
        terrain.set_cell_spacing(4.0);
        assert!(terrain.sync());
        assert!(!terrain.is_dirty());

        assert_eq!(terrain.mesh().layout().cells_per_patch, 4);
        assert_eq!(terrain.info().height_scale, terrain.field().height_scale);
        assert_eq!(terrain.info().cell_spacing, terrain.field().cell_spacing);
        assert_eq!(terrain.width(), 8.0);

        // Going back to the previous patch size is a change again.
        terrain.set_cells_per_patch_exponent(1);
        assert!(terrain.sync());
        assert_eq!(terrain.mesh().layout().cells_per_patch, 2);
    }

    #[test]
    fn setters_ignore_degenerate_scales() {
        let mut terrain = Terrain::new(info(5, 1), &assets_with(vec![51; 25]));
        terrain.set_height_scale(f32::NAN);
        terrain.set_height_scale(0.0);
        terrain.set_cell_spacing(-2.0);
        terrain.set_cell_spacing(f32::INFINITY);
        assert!(!terrain.is_dirty());
        assert_eq!(terrain.info().height_scale, 255.0);
        assert_eq!(terrain.info().cell_spacing, 1.0);
    }
}
