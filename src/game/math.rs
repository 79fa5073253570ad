use glam::{Mat4, Vec3, Vec4};

/// A plane in the form `normal . p + distance = 0`. Points with a positive signed distance lie on
/// the side the normal points to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Build a normalized plane from the coefficients of a clip space row combination.
    fn from_row(row: Vec4) -> Self {
        let normal = row.truncate();
        let length = normal.length();

        if length <= f32::EPSILON || !length.is_finite() {
            return Self::new(Vec3::Y, 0.0);
        }

        let inv_length = 1.0 / length;
        Self::new(normal * inv_length, row.w * inv_length)
    }

    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far. Consumers index by position. Normals point inward.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the clip planes from a combined `projection * view` matrix (Gribb-Hartmann).
    ///
    /// Expects a 0..1 depth range, as produced by the `*_lh` projections.
    pub fn from_view_projection(view_projection: Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);

        let left = Plane::from_row(r3 + r0);
        let right = Plane::from_row(r3 - r0);
        let bottom = Plane::from_row(r3 + r1);
        let top = Plane::from_row(r3 - r1);
        let near = Plane::from_row(r2);
        let far = Plane::from_row(r3 - r2);

        Self {
            planes: [left, right, bottom, top, near, far],
        }
    }

    /// Conservative test; may report boxes near frustum corners as visible.
    pub fn intersects_bounding_box(&self, b: &BoundingBox) -> bool {
        const EPS: f32 = 1e-5;
        for plane in &self.planes {
            // The corner furthest along the plane normal.
            let mask = plane.normal.cmplt(Vec3::ZERO);
            let p = Vec3::select(mask, b.min, b.max);
            if plane.signed_distance(p) < -EPS {
                return false;
            }
        }
        true
    }
}

impl From<Mat4> for Frustum {
    fn from(view_projection: Mat4) -> Self {
        Self::from_view_projection(view_projection)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Greatest common divisor.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
