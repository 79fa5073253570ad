use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::engine::dirty::Dirty;

use super::math::{Frustum, Plane};

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Invalid lens (fov_y: {fov_y}, aspect: {aspect}, near: {near}, far: {far})")]
    InvalidLens {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

/// Cached perspective parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lens {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

impl Lens {
    fn validate(&self) -> Result<(), CameraError> {
        let valid = self.fov_y > 0.0
            && self.fov_y < std::f32::consts::PI
            && self.aspect > 0.0
            && self.aspect.is_finite()
            && self.near > 0.0
            && self.near < self.far
            && self.far.is_finite();

        if valid {
            Ok(())
        } else {
            Err(CameraError::InvalidLens {
                fov_y: self.fov_y,
                aspect: self.aspect,
                near: self.near,
                far: self.far,
            })
        }
    }

    fn projection(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Snapshot of the camera matrices for a single frame.
#[derive(Clone, Copy, Debug, Default, bytemuck::NoUninit)]
#[repr(C)]
pub struct Matrices {
    pub projection: Mat4,
    pub view: Mat4,
    /// `projection * view`.
    pub view_projection: Mat4,
    pub position: Vec4,
}

/// Left-handed, Y-up first person camera.
///
/// The view matrix is a cache. Every mutator smudges it and it is rebuilt, including the basis
/// re-orthonormalization, the next time a matrix is requested.
#[derive(Debug)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    look: Vec3,

    lens: Lens,
    /// Scale applied to [Camera::walk] and [Camera::strafe] distances.
    pub walk_speed: f32,
    /// Look straight down from high above the terrain, keeping the current projection.
    overhead_debug: bool,

    view: Mat4,
    projection: Mat4,
    dirty: Dirty,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 50.0, 0.0))
    }
}

impl Camera {
    pub const DEFAULT_WALK_SPEED: f32 = 8.0;
    pub const OVERHEAD_POSITION: Vec3 = Vec3::new(0.0, 500.0, 0.0);

    pub fn new(position: Vec3) -> Self {
        let lens = Lens::default();
        Self {
            position,
            right: Vec3::X,
            up: Vec3::Y,
            look: Vec3::Z,
            lens,
            walk_speed: Self::DEFAULT_WALK_SPEED,
            overhead_debug: false,
            view: Mat4::IDENTITY,
            projection: lens.projection(),
            dirty: Dirty::smudged(),
        }
    }

    pub fn set_lens(
        &mut self,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), CameraError> {
        let lens = Lens {
            fov_y,
            aspect,
            near,
            far,
        };
        lens.validate()?;

        self.lens = lens;
        self.projection = lens.projection();
        Ok(())
    }

    #[inline]
    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    pub fn near_window_height(&self) -> f32 {
        let lens = self.lens();
        2.0 * lens.near * (0.5 * lens.fov_y).tan()
    }

    pub fn far_window_height(&self) -> f32 {
        let lens = self.lens();
        2.0 * lens.far * (0.5 * lens.fov_y).tan()
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty.smudge();
    }

    pub fn modify_height(&mut self, delta: f32) {
        self.position.y += delta;
        self.dirty.smudge();
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[inline]
    pub fn look(&self) -> Vec3 {
        self.look
    }

    /// Point the camera at `target`, keeping the world Y axis as the reference up direction.
    pub fn look_at(&mut self, target: Vec3) {
        let look = (target - self.position).normalize_or_zero();
        if look == Vec3::ZERO {
            return;
        }

        let right = Vec3::Y.cross(look).try_normalize().unwrap_or(self.right());
        self.look = look;
        self.right = right;
        self.up = look.cross(right);
        self.dirty.smudge();
    }

    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance * self.walk_speed;
        self.dirty.smudge();
    }

    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance * self.walk_speed;
        self.dirty.smudge();
    }

    /// Rotate up and look about the right vector. Unbounded, pitching past vertical flips the
    /// camera over.
    pub fn pitch(&mut self, angle: f32) {
        let rotation = Mat3::from_axis_angle(self.right.normalize(), angle);
        self.up = rotation * self.up;
        self.look = rotation * self.look;
        self.dirty.smudge();
    }

    /// Rotate the whole basis about the world Y axis.
    pub fn rotate_y(&mut self, angle: f32) {
        let rotation = Mat3::from_rotation_y(angle);
        self.right = rotation * self.right;
        self.up = rotation * self.up;
        self.look = rotation * self.look;
        self.dirty.smudge();
    }

    pub fn set_overhead_debug(&mut self, enabled: bool) {
        if self.overhead_debug != enabled {
            self.overhead_debug = enabled;
            self.dirty.smudge();
        }
    }

    #[inline]
    pub fn overhead_debug(&self) -> bool {
        self.overhead_debug
    }

    /// Re-orthonormalize the basis and rebuild the view matrix, whether or not anything changed.
    pub fn update_view_matrix(&mut self) {
        self.dirty.smudge();
        self.sync();
    }

    /// Rebuild the view matrix if any mutator ran since the last sync and return the matrices for
    /// this frame.
    pub fn sync(&mut self) -> Matrices {
        let mut dirty = self.dirty;
        dirty.if_dirty(|| self.rebuild_view());
        self.dirty = dirty;

        let projection = self.projection();
        Matrices {
            projection,
            view: self.view,
            view_projection: projection * self.view,
            position: self.eye().extend(1.0),
        }
    }

    pub fn view(&mut self) -> Mat4 {
        self.sync().view
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&mut self) -> Mat4 {
        self.projection() * self.view()
    }

    /// The six clip planes (left, right, bottom, top, near, far) of the current view.
    pub fn frustum(&mut self) -> Frustum {
        Frustum {
            planes: extract_frustum_planes(self.view_projection()),
        }
    }

    /// Position the view matrix is built from.
    fn eye(&self) -> Vec3 {
        if self.overhead_debug {
            Self::OVERHEAD_POSITION
        } else {
            self.position
        }
    }

    fn rebuild_view(&mut self) {
        // Basis vectors drift under repeated rotation, so correct them before building the view.
        let look = self.look.normalize();
        let up = look.cross(self.right).normalize();
        let right = up.cross(look);

        self.right = right;
        self.up = up;
        self.look = look;

        self.view = if self.overhead_debug {
            let look = Vec3::NEG_Y;
            let up = look.cross(right).try_normalize().unwrap_or(Vec3::Z);
            let right = up.cross(look);
            view_from_basis(Self::OVERHEAD_POSITION, right, up, look)
        } else {
            view_from_basis(self.position, right, up, look)
        };

        tracing::trace!("camera view rebuilt at {:?}", self.eye());
    }
}

/// Build a left-handed view matrix from an orthonormal basis.
fn view_from_basis(position: Vec3, right: Vec3, up: Vec3, look: Vec3) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(right.x, up.x, look.x, 0.0),
        Vec4::new(right.y, up.y, look.y, 0.0),
        Vec4::new(right.z, up.z, look.z, 0.0),
        Vec4::new(
            -position.dot(right),
            -position.dot(up),
            -position.dot(look),
            1.0,
        ),
    )
}

/// Derive the six normalized clip planes of `view_projection`, in the order left, right, bottom,
/// top, near, far.
pub fn extract_frustum_planes(view_projection: Mat4) -> [Plane; 6] {
    Frustum::from_view_projection(view_projection).planes
}

/// Keeps the camera a fixed distance above the ground, easing into height changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundFollow {
    /// Distance between the ground and the eye.
    pub height: f32,
    /// How quickly the camera catches up with the target height, per second.
    pub smooth_factor: f32,
}

impl Default for GroundFollow {
    fn default() -> Self {
        Self {
            height: 15.0,
            smooth_factor: 8.0,
        }
    }
}

impl GroundFollow {
    /// Move the camera towards `ground_height + height`. `ground_height` should come from a
    /// forgiving query since the camera can leave the terrain.
    pub fn apply(&self, camera: &mut Camera, ground_height: f32, delta_time: f32) {
        let target = ground_height + self.height;
        let t = (delta_time * self.smooth_factor).clamp(0.0, 1.0);
        camera.modify_height((target - camera.position().y) * t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_orthonormal(camera: &Camera) {
        let (r, u, l) = (camera.right(), camera.up(), camera.look());
        for v in [r, u, l] {
            assert!((v.length() - 1.0).abs() < EPSILON, "length {}", v.length());
        }
        assert!(r.dot(u).abs() < EPSILON);
        assert!(r.dot(l).abs() < EPSILON);
        assert!(u.dot(l).abs() < EPSILON);
    }

    #[test]
    fn basis_is_orthonormal_after_rotations() {
        let mut camera = Camera::default();

        let mut angle = 0.37_f32;
        for i in 0..500 {
            if i % 3 == 0 {
                camera.pitch(angle);
            } else {
                camera.rotate_y(-angle * 1.7);
            }
            angle = (angle * 1.31).rem_euclid(2.5) + 0.01;
        }

        camera.update_view_matrix();
        assert_orthonormal(&camera);

        // A second rebuild leaves the basis as it is.
        let (r, u, l) = (camera.right(), camera.up(), camera.look());
        camera.update_view_matrix();
        assert!(camera.right().abs_diff_eq(r, EPSILON));
        assert!(camera.up().abs_diff_eq(u, EPSILON));
        assert!(camera.look().abs_diff_eq(l, EPSILON));
    }

    #[test]
    fn pitch_is_not_clamped() {
        let mut camera = Camera::default();
        camera.pitch(std::f32::consts::PI);
        camera.update_view_matrix();
        assert!(camera.up().abs_diff_eq(Vec3::NEG_Y, EPSILON));
        assert!(camera.look().abs_diff_eq(Vec3::NEG_Z, EPSILON));
    }

    #[test]
    fn view_matrix_moves_eye_to_origin() {
        let mut camera = Camera::new(Vec3::new(10.0, 20.0, -5.0));
        camera.rotate_y(0.8);
        camera.pitch(-0.3);

        let view = camera.view();
        let eye = view.transform_point3(camera.position());
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPSILON));

        let ahead = view.transform_point3(camera.position() + camera.look() * 3.0);
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), EPSILON));

        let beside = view.transform_point3(camera.position() + camera.right());
        assert!(beside.abs_diff_eq(Vec3::X, EPSILON));
    }

    #[test]
    fn view_matches_look_to() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
        camera.rotate_y(1.2);
        let view = camera.view();
        let expected = Mat4::look_to_lh(camera.position(), camera.look(), camera.up());
        assert!(view.abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn mutators_smudge_the_cache() {
        let mut camera = Camera::new(Vec3::ZERO);
        let before = camera.view();

        camera.walk(1.0);
        let after = camera.view();
        assert_ne!(before, after);
        assert!(
            camera
                .position()
                .abs_diff_eq(Vec3::new(0.0, 0.0, Camera::DEFAULT_WALK_SPEED), EPSILON)
        );

        camera.strafe(-0.5);
        assert!(camera.position().abs_diff_eq(
            Vec3::new(
                -0.5 * Camera::DEFAULT_WALK_SPEED,
                0.0,
                Camera::DEFAULT_WALK_SPEED
            ),
            EPSILON
        ));

        let matrices = camera.sync();
        assert_eq!(matrices.view_projection, camera.projection() * matrices.view);
        assert_eq!(matrices.position.truncate(), camera.position());

        camera.modify_height(2.5);
        assert!((camera.position().y - 2.5).abs() < EPSILON);
        assert_ne!(camera.sync().view, matrices.view);

        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.sync().position, Vec4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn invalid_lens_is_rejected() {
        let mut camera = Camera::default();
        let projection = camera.projection();

        assert!(camera.set_lens(1.0, 1.5, 10.0, 10.0).is_err());
        assert!(camera.set_lens(1.0, 1.5, 20.0, 10.0).is_err());
        assert!(camera.set_lens(0.0, 1.5, 1.0, 10.0).is_err());
        assert!(camera.set_lens(std::f32::consts::PI, 1.5, 1.0, 10.0).is_err());
        assert_eq!(camera.projection(), projection);

        camera.set_lens(1.0, 1.5, 1.0, 10.0).unwrap();
        assert_eq!(camera.lens().aspect, 1.5);
        assert_ne!(camera.projection(), projection);
    }

    #[test]
    fn window_heights() {
        let mut camera = Camera::default();
        camera
            .set_lens(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0)
            .unwrap();
        assert!((camera.near_window_height() - 2.0).abs() < EPSILON);
        assert!((camera.far_window_height() - 200.0).abs() < 1e-2);
    }

    #[test]
    fn frustum_contains_what_is_ahead() {
        let mut camera = Camera::new(Vec3::new(0.0, 10.0, 0.0));
        camera.set_lens(1.2, 1.0, 0.5, 500.0).unwrap();
        camera.rotate_y(std::f32::consts::FRAC_PI_2);

        let frustum = camera.frustum();
        let ahead = camera.position() + camera.look() * 50.0;
        let behind = camera.position() - camera.look() * 50.0;
        let inside = |point: Vec3| {
            frustum
                .planes
                .iter()
                .all(|plane| plane.signed_distance(point) >= 0.0)
        };
        assert!(inside(ahead));
        assert!(!inside(behind));

        let planes = extract_frustum_planes(camera.view_projection());
        assert_eq!(planes, frustum.planes);
    }

    #[test]
    fn overhead_debug_view_looks_down() {
        let mut camera = Camera::new(Vec3::new(3.0, 4.0, 5.0));
        camera.set_overhead_debug(true);

        let view = camera.view();
        let below = view.transform_point3(Vec3::new(0.0, 400.0, 0.0));
        assert!(below.abs_diff_eq(Vec3::new(0.0, 0.0, 100.0), EPSILON));
        // The camera itself is untouched.
        assert_eq!(camera.position(), Vec3::new(3.0, 4.0, 5.0));
        assert!(camera.look().abs_diff_eq(Vec3::Z, EPSILON));
    }

    #[test]
    fn look_at_target() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.look_at(Vec3::new(10.0, 0.0, 0.0));
        camera.update_view_matrix();
        assert!(camera.look().abs_diff_eq(Vec3::X, EPSILON));
        assert!(camera.up().abs_diff_eq(Vec3::Y, EPSILON));
        assert_orthonormal(&camera);
    }

    #[test]
    fn ground_follow_eases_towards_target() {
        let mut camera = Camera::new(Vec3::new(0.0, 100.0, 0.0));
        let follow = GroundFollow {
            height: 10.0,
            smooth_factor: 5.0,
        };

        follow.apply(&mut camera, 20.0, 0.1);
        assert!((camera.position().y - 65.0).abs() < EPSILON);

        // Large steps never overshoot.
        follow.apply(&mut camera, 20.0, 10.0);
        assert!((camera.position().y - 30.0).abs() < EPSILON);
    }
}
