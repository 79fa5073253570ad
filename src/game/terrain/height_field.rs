use glam::{UVec2, Vec2};

use super::TerrainError;

/// Dense row-major grid of height samples.
///
/// `size` counts samples (vertices), so the grid spans `size - 1` cells on each axis. Sample
/// `(x, y)` lives at world `x` increasing to the right and world `z` decreasing as `y` grows.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    size: UVec2,
    heights: Vec<f32>,
    /// World units between two neighbouring samples.
    pub cell_spacing: f32,
    /// World height of a raw sample of 255.
    pub height_scale: f32,
}

impl HeightField {
    /// All-zero field used when the height map could not be loaded. Dimensions below 2 are
    /// raised to 2 so the result always holds at least one cell.
    pub fn placeholder(size: UVec2, cell_spacing: f32, height_scale: f32) -> Self {
        let size = size.max(UVec2::splat(2));
        Self {
            size,
            heights: vec![0.0; size.x as usize * size.y as usize],
            cell_spacing,
            height_scale,
        }
    }

    pub fn from_heights(
        width: u32,
        height: u32,
        cell_spacing: f32,
        height_scale: f32,
        heights: Vec<f32>,
    ) -> Result<Self, TerrainError> {
        if width < 2 || height < 2 {
            return Err(TerrainError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize;
        if heights.len() != expected {
            return Err(TerrainError::SampleCount {
                expected,
                actual: heights.len(),
            });
        }

        if heights.iter().any(|h| !h.is_finite()) {
            return Err(TerrainError::NonFiniteHeight);
        }

        Ok(Self {
            size: UVec2::new(width, height),
            heights,
            cell_spacing,
            height_scale,
        })
    }

    /// Interpret `bytes` as `width * height` unsigned 8-bit samples in row-major order, each
    /// scaled linearly to `[0, height_scale]`. Extra bytes are ignored.
    pub fn load(
        bytes: &[u8],
        width: u32,
        height: u32,
        cell_spacing: f32,
        height_scale: f32,
    ) -> Result<Self, TerrainError> {
        let expected = width as usize * height as usize;
        if bytes.len() < expected {
            return Err(TerrainError::SampleCount {
                expected,
                actual: bytes.len(),
            });
        }

        let heights = bytes[..expected]
            .iter()
            .map(|&sample| (sample as f32 / 255.0) * height_scale)
            .collect();

        Self::from_heights(width, height, cell_spacing, height_scale, heights)
    }

    /// Amount of samples on each axis.
    #[inline]
    pub fn size(&self) -> UVec2 {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.y
    }

    /// Amount of cells on each axis.
    #[inline]
    pub fn cell_count(&self) -> UVec2 {
        self.size - UVec2::ONE
    }

    /// World space size of the whole field on the X and Z axes.
    pub fn world_extent(&self) -> Vec2 {
        self.cell_count().as_vec2() * self.cell_spacing
    }

    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    pub fn is_valid_index(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.size.x as i64 && y < self.size.y as i64
    }

    /// Height of sample `(x, y)`.
    ///
    /// Panics if the sample is out of bounds. Use [HeightField::safe_get] for coordinates that
    /// come from the world.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        assert!(
            x < self.size.x && y < self.size.y,
            "sample ({x}, {y}) out of bounds for {}x{} height field",
            self.size.x,
            self.size.y
        );
        self.heights[y as usize * self.size.x as usize + x as usize]
    }

    /// Height of sample `(x, y)`, or 0 outside the field.
    #[inline]
    pub fn safe_get(&self, x: i64, y: i64) -> f32 {
        if self.is_valid_index(x, y) {
            self.get(x as u32, y as u32)
        } else {
            0.0
        }
    }

    /// Replace each sample by the mean of itself and its in-bounds neighbours (3x3 box filter
    /// without wrapping or padding). Reads only pre-filter values.
    pub fn smooth(&mut self) {
        let (width, height) = (self.size.x as i64, self.size.y as i64);
        let mut smoothed = Vec::with_capacity(self.heights.len());

        for y in 0..height {
            for x in 0..width {
                smoothed.push(self.average(x, y));
            }
        }

        self.heights = smoothed;
    }

    fn average(&self, x: i64, y: i64) -> f32 {
        let mut sum = 0.0;
        let mut count = 0;

        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if self.is_valid_index(nx, ny) {
                    sum += self.heights[ny as usize * self.size.x as usize + nx as usize];
                    count += 1;
                }
            }
        }

        sum / count as f32
    }

    /// Minimum and maximum height over the samples in `min..=max`.
    pub fn min_max(&self, min: UVec2, max: UVec2) -> (f32, f32) {
        let max = max.min(self.size - UVec2::ONE);

        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for y in min.y..=max.y {
            let row = y as usize * self.size.x as usize;
            for &h in &self.heights[row + min.x as usize..=row + max.x as usize] {
                lo = lo.min(h);
                hi = hi.max(h);
            }
        }

        (lo, hi)
    }

    /// Convert a world position on the XZ plane to fractional grid coordinates (column, row).
    /// The field is centered on the origin and rows grow towards negative Z.
    pub fn world_to_grid(&self, world_x: f32, world_z: f32) -> Vec2 {
        let half = self.world_extent() * 0.5;
        Vec2::new(
            (world_x + half.x) / self.cell_spacing,
            (world_z - half.y) / -self.cell_spacing,
        )
    }

    /// Terrain height under the world position `(world_x, world_z)`.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let grid = self.world_to_grid(world_x, world_z);
        self.height_at_grid(grid.x, grid.y)
    }

    /// Height at fractional grid coordinates.
    ///
    /// Each cell is split into the triangles ABC (`s + t <= 1`, interpolated from A) and BDC
    /// (interpolated from D), the same triangles [super::PatchMesh::triangle_indices] emits. The
    /// seam between them is not smooth. Samples outside the field read as 0.
    pub fn height_at_grid(&self, column: f32, row: f32) -> f32 {
        if !column.is_finite() || !row.is_finite() {
            return 0.0;
        }

        let mut col = column.floor() as i64;
        let mut r = row.floor() as i64;

        // No corner of the cell is inside the field.
        let (width, height) = (self.size.x as i64, self.size.y as i64);
        if !(-1..width).contains(&col) || !(-1..height).contains(&r) {
            return 0.0;
        }

        // Points exactly on the last row/column belong to the cell before it.
        if col == self.size.x as i64 - 1 {
            col -= 1;
        }
        if r == self.size.y as i64 - 1 {
            r -= 1;
        }

        // A---B
        // | / |
        // C---D
        let a = self.safe_get(col, r);
        let b = self.safe_get(col + 1, r);
        let c = self.safe_get(col, r + 1);
        let d = self.safe_get(col + 1, r + 1);

        let s = column - col as f32;
        let t = row - r as f32;

        if s + t <= 1.0 {
            a + s * (b - a) + t * (c - a)
        } else {
            d + (1.0 - s) * (c - d) + (1.0 - t) * (b - d)
        }
    }

    /// Heights encoded as 16-bit floats, row-major, ready for an `R16Float` texture.
    pub fn to_f16_texels(&self) -> Vec<u16> {
        self.heights()
            .iter()
            .map(|&h| half::f16::from_f32(h).to_bits())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn field(width: u32, height: u32, heights: &[f32]) -> HeightField {
        HeightField::from_heights(width, height, 1.0, 1.0, heights.to_vec()).unwrap()
    }

    #[test]
    fn load_scales_samples() {
        let field = HeightField::load(&[0, 255, 51, 102, 7], 2, 2, 0.5, 50.0).unwrap();
        assert_eq!(field.size(), UVec2::new(2, 2));
        assert_eq!(field.get(0, 0), 0.0);
        assert!((field.get(1, 0) - 50.0).abs() < EPSILON);
        assert!((field.get(0, 1) - 10.0).abs() < EPSILON);
        assert!((field.get(1, 1) - 20.0).abs() < EPSILON);
        assert_eq!(field.cell_count(), UVec2::ONE);
        assert_eq!(field.world_extent(), Vec2::splat(0.5));
    }

    #[test]
    fn load_rejects_undersized_and_degenerate_input() {
        assert!(matches!(
            HeightField::load(&[0; 5], 3, 2, 1.0, 1.0),
            Err(TerrainError::SampleCount {
                expected: 6,
                actual: 5
            })
        ));
        assert!(matches!(
            HeightField::load(&[0; 5], 5, 1, 1.0, 1.0),
            Err(TerrainError::InvalidDimensions {
                width: 5,
                height: 1
            })
        ));
        assert!(matches!(
            HeightField::from_heights(2, 2, 1.0, 1.0, vec![0.0, f32::NAN, 0.0, 0.0]),
            Err(TerrainError::NonFiniteHeight)
        ));
    }

    #[test]
    fn placeholder_is_flat_and_never_degenerate() {
        let field = HeightField::placeholder(UVec2::new(4, 0), 0.5, 50.0);
        assert_eq!(field.size(), UVec2::new(4, 2));
        assert!(field.heights().iter().all(|&h| h == 0.0));
        assert_eq!(field.height_at(0.0, 0.0), 0.0);
    }

    #[test]
    fn safe_get_outside_is_zero() {
        let field = field(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(field.safe_get(1, 1), 4.0);
        assert_eq!(field.safe_get(-1, 0), 0.0);
        assert_eq!(field.safe_get(0, 2), 0.0);
        assert_eq!(field.safe_get(2, 0), 0.0);
    }

    #[test]
    #[should_panic]
    fn get_outside_panics() {
        let field = field(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        field.get(2, 0);
    }

    #[test]
    fn smoothing_constant_field_is_noop() {
        let mut field = field(5, 4, &[3.5; 20]);
        field.smooth();
        assert!(field.heights().iter().all(|&h| (h - 3.5).abs() < EPSILON));
    }

    #[test]
    fn smoothing_averages_over_in_bounds_neighbours() {
        let values: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let mut field = field(3, 3, &values);
        field.smooth();

        // Corner: itself and 3 neighbours (1, 2, 4, 5).
        assert!((field.get(0, 0) - 3.0).abs() < EPSILON);
        // Edge: 6 samples (1, 2, 3, 4, 5, 6).
        assert!((field.get(1, 0) - 3.5).abs() < EPSILON);
        // Center: all 9.
        assert!((field.get(1, 1) - 5.0).abs() < EPSILON);
        // Opposite corner: 5, 6, 8, 9.
        assert!((field.get(2, 2) - 7.0).abs() < EPSILON);
    }

    #[test]
    fn smoothing_reads_unfiltered_values() {
        // If smoothing ran in place, the second sample would see the already smoothed first.
        let mut field = field(3, 2, &[6.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        field.smooth();
        assert!((field.get(0, 0) - 1.5).abs() < EPSILON);
        assert!((field.get(1, 0) - 1.0).abs() < EPSILON);
        assert!((field.get(2, 0)).abs() < EPSILON);
    }

    #[test]
    fn diagonal_split_interpolation() {
        // A = (0, 0), B = (1, 0), C = (0, 1), D = (1, 1)
        let field = field(2, 2, &[0.0, 0.0, 0.0, 10.0]);

        let upper_left = field.height_at_grid(0.1, 0.1);
        assert!(upper_left.abs() < EPSILON);

        let lower_right = field.height_at_grid(0.9, 0.9);
        assert!((lower_right - 8.0).abs() < EPSILON);
        // Full bilinear interpolation would give 8.1 here.
        assert!((lower_right - 8.1).abs() > 0.05);

        // On the diagonal both triangles agree.
        assert!(field.height_at_grid(0.5, 0.5).abs() < EPSILON);

        // Corners.
        assert!((field.height_at_grid(1.0, 1.0) - 10.0).abs() < EPSILON);
        assert!(field.height_at_grid(1.0, 0.0).abs() < EPSILON);
    }

    #[test]
    fn world_queries_flip_the_z_axis() {
        // Row 0 is at positive Z.
        let field = HeightField::from_heights(
            3,
            3,
            2.0,
            1.0,
            vec![
                1.0, 1.0, 1.0, //
                5.0, 5.0, 5.0, //
                9.0, 9.0, 9.0,
            ],
        )
        .unwrap();

        assert_eq!(field.world_extent(), Vec2::new(4.0, 4.0));
        assert_eq!(field.world_to_grid(-2.0, 2.0), Vec2::ZERO);
        assert_eq!(field.world_to_grid(2.0, -2.0), Vec2::new(2.0, 2.0));

        assert!((field.height_at(0.0, 2.0) - 1.0).abs() < EPSILON);
        assert!((field.height_at(0.0, 0.0) - 5.0).abs() < EPSILON);
        assert!((field.height_at(1.3, -2.0) - 9.0).abs() < EPSILON);
        assert!((field.height_at(0.0, 1.0) - 3.0).abs() < EPSILON);
    }

    #[test]
    fn queries_outside_the_field_are_forgiving() {
        let field = field(2, 2, &[4.0; 4]);
        assert_eq!(field.height_at(100.0, 100.0), 0.0);
        assert_eq!(field.height_at(f32::NAN, 0.0), 0.0);
        assert!(field.height_at(-100.0, 0.0).is_finite());

        // Far away coordinates must not overflow the cell index.
        assert_eq!(field.height_at(1.0e20, 0.0), 0.0);
        assert_eq!(field.height_at(0.0, -1.0e20), 0.0);
        assert_eq!(field.height_at_grid(0.0, f32::MAX), 0.0);
        assert_eq!(field.height_at_grid(f32::MIN, 0.0), 0.0);

        // The cell just outside the first column still blends towards the field.
        assert!((field.height_at_grid(-0.5, 0.0) - 2.0).abs() < EPSILON);
    }

    #[test]
    fn min_max_is_inclusive() {
        let values: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let field = field(4, 4, &values);
        assert_eq!(field.min_max(UVec2::ZERO, UVec2::ONE), (0.0, 5.0));
        assert_eq!(field.min_max(UVec2::new(2, 2), UVec2::new(3, 3)), (10.0, 15.0));
    }

    #[test]
    fn f16_texels() {
        let field = field(2, 2, &[0.0, 1.0, 0.5, 50.0]);
        let texels = field.to_f16_texels();
        assert_eq!(texels.len(), 4);
        assert_eq!(half::f16::from_bits(texels[1]).to_f32(), 1.0);
        assert_eq!(half::f16::from_bits(texels[3]).to_f32(), 50.0);
    }
}
