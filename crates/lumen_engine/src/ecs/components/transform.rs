//! Transform component
//!
//! Local TRS state plus cached local and world matrices. Setters flip the
//! dirty flag; the transform system rebuilds caches and propagates world
//! matrices down the hierarchy each frame.

use crate::foundation::math::{self, Mat4, Quat, Vec3};

/// Spatial transform relative to the entity's parent (or world space for
/// roots). Y-up, right-handed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    local_position: Vec3,
    local_rotation: Quat,
    local_scale: Vec3,

    /// Cached T*R*S of the local fields. Stale while `dirty` is set.
    local_matrix: Mat4,
    /// Parent world matrix times local matrix, written during propagation.
    world_matrix: Mat4,
    dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            local_position: Vec3::zeros(),
            local_rotation: Quat::identity(),
            local_scale: Vec3::new(1.0, 1.0, 1.0),
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            dirty: false,
        }
    }
}

impl Transform {
    /// Identity transform at the origin.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transform with only a position set.
    pub fn from_position(position: Vec3) -> Self {
        Self::identity().with_position(position)
    }

    /// Builder: set position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    /// Builder: set rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Builder: set rotation from Euler angles in degrees (roll, pitch, yaw).
    pub fn with_rotation_euler_degrees(mut self, roll: f32, pitch: f32, yaw: f32) -> Self {
        self.set_rotation_euler_degrees(roll, pitch, yaw);
        self
    }

    /// Builder: set scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.local_position
    }

    pub fn rotation(&self) -> Quat {
        self.local_rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.local_scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.local_position = position;
        self.dirty = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.local_rotation = rotation;
        self.dirty = true;
    }

    pub fn set_rotation_euler_degrees(&mut self, roll: f32, pitch: f32, yaw: f32) {
        self.set_rotation(Quat::from_euler_angles(
            math::deg_to_rad(roll),
            math::deg_to_rad(pitch),
            math::deg_to_rad(yaw),
        ));
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.local_scale = scale;
        self.dirty = true;
    }

    /// Rotate by `delta` on top of the current rotation.
    pub fn rotate(&mut self, delta: Quat) {
        self.local_rotation = delta * self.local_rotation;
        self.dirty = true;
    }

    /// Translate by `delta` in parent space.
    pub fn translate(&mut self, delta: Vec3) {
        self.local_position += delta;
        self.dirty = true;
    }

    /// Whether local fields changed since the cache was last rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild the cached local matrix from position, rotation and scale.
    pub fn rebuild_local_matrix(&mut self) {
        let translation = Mat4::new_translation(&self.local_position);
        let rotation = self.local_rotation.to_homogeneous();
        let scale = Mat4::new_nonuniform_scaling(&self.local_scale);
        self.local_matrix = translation * rotation * scale;
        self.dirty = false;
    }

    /// The cached local matrix. Call [`rebuild_local_matrix`] first if the
    /// transform may be dirty.
    ///
    /// [`rebuild_local_matrix`]: Self::rebuild_local_matrix
    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    /// The world matrix written by the last propagation pass.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub(crate) fn set_world_matrix(&mut self, world: Mat4) {
        self.world_matrix = world;
    }

    /// World-space position taken from the cached world matrix.
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.column(3).xyz()
    }

    /// World-space right axis (+X column, normalized).
    pub fn right(&self) -> Vec3 {
        self.world_matrix.column(0).xyz().normalize()
    }

    /// World-space up axis (+Y column, normalized).
    pub fn up(&self) -> Vec3 {
        self.world_matrix.column(1).xyz().normalize()
    }

    /// World-space forward axis. The camera convention is -Z forward.
    pub fn forward(&self) -> Vec3 {
        (-self.world_matrix.column(2).xyz()).normalize()
    }

    /// Point the local -Z axis at `target` from the current local position.
    ///
    /// Only meaningful for root entities; the look-at is computed in the
    /// parent's space.
    pub fn look_at(&mut self, target: Vec3, world_up: Vec3) {
        let view = math::look_at_rh(self.local_position, target, world_up);
        // The view matrix is the inverse of the camera's pose; the rotation
        // block is orthonormal, so its transpose recovers the orientation.
        let rot = nalgebra::Rotation3::from_matrix_unchecked(
            view.fixed_view::<3, 3>(0, 0).transpose().into_owned(),
        );
        self.set_rotation(Quat::from_rotation_matrix(&rot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    #[test]
    fn identity_matrices_until_touched() {
        let t = Transform::identity();
        assert!(!t.is_dirty());
        assert_eq!(t.local_matrix(), Mat4::identity());
        assert_eq!(t.world_matrix(), Mat4::identity());
    }

    #[test]
    fn setters_mark_dirty_and_rebuild_clears() {
        let mut t = Transform::identity();
        t.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(t.is_dirty());

        t.rebuild_local_matrix();
        assert!(!t.is_dirty());
        assert_relative_eq!(
            t.local_matrix().column(3).xyz(),
            Vec3::new(1.0, 2.0, 3.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn local_matrix_applies_scale_then_rotation_then_translation() {
        let mut t = Transform::identity()
            .with_position(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation(Quat::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_2))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        t.rebuild_local_matrix();

        // (1, 0, 0) scales to (2, 0, 0), rotates to (0, 2, 0), then translates.
        let p = t.local_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.xyz(), Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let mut t = Transform::from_position(Vec3::new(0.0, 0.0, 5.0));
        t.look_at(Vec3::zeros(), Vec3::y());
        t.rebuild_local_matrix();
        t.set_world_matrix(t.local_matrix());

        assert_relative_eq!(t.forward(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(t.up(), Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn euler_degree_setter_rotates_about_z() {
        let mut t = Transform::identity();
        t.set_rotation_euler_degrees(0.0, 0.0, 90.0);
        t.rebuild_local_matrix();

        let p = t.local_matrix() * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.xyz(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }
}
