//! Math types and projection helpers
//!
//! Thin aliases over nalgebra plus the view/projection constructors the
//! renderer needs. All conventions are right-handed, Y-up, with clip-space
//! depth in [0, 1] as Vulkan expects.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Unit quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Convert degrees to radians
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * constants::DEG_TO_RAD
}

/// Right-handed look-at view matrix.
///
/// Maps world space into a camera space where the camera looks down -Z.
pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = (target - eye).normalize();
    let s = f.cross(&up).normalize();
    let u = s.cross(&f);

    Mat4::new(
        s.x, s.y, s.z, -s.dot(&eye),
        u.x, u.y, u.z, -u.dot(&eye),
        -f.x, -f.y, -f.z, f.dot(&eye),
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Right-handed perspective projection with depth mapped to [0, 1].
///
/// `fov_y` is the vertical field of view in radians.
pub fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let tan_half_fovy = (fov_y * 0.5).tan();

    let mut m = Mat4::zeros();
    m[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
    m[(1, 1)] = 1.0 / tan_half_fovy;
    m[(2, 2)] = far / (near - far);
    m[(2, 3)] = -(far * near) / (far - near);
    m[(3, 2)] = -1.0;
    m
}

/// Right-handed orthographic projection with depth mapped to [0, 1].
pub fn ortho_rh_zo(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let mut m = Mat4::identity();
    m[(0, 0)] = 2.0 / (right - left);
    m[(1, 1)] = 2.0 / (top - bottom);
    m[(2, 2)] = -1.0 / (far - near);
    m[(0, 3)] = -(right + left) / (right - left);
    m[(1, 3)] = -(top + bottom) / (top - bottom);
    m[(2, 3)] = -near / (far - near);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = look_at_rh(eye, Vec3::zeros(), Vec3::y());

        let eye_in_view = view.transform_point(&nalgebra::Point3::from(eye));
        assert_relative_eq!(eye_in_view.coords, Vec3::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn look_at_target_lands_on_negative_z() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = look_at_rh(eye, Vec3::zeros(), Vec3::y());

        let target_in_view = view.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(target_in_view.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn perspective_depth_range_is_zero_to_one() {
        let proj = perspective_rh_zo(deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0);

        // A point on the near plane projects to depth 0, far plane to depth 1.
        let near_clip = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far_clip = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);

        assert_relative_eq!(near_clip.z / near_clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far_clip.z / far_clip.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn ortho_maps_bounds_to_clip_corners() {
        let proj = ortho_rh_zo(-2.0, 2.0, -1.0, 1.0, 0.1, 10.0);

        let corner = proj * Vec4::new(2.0, 1.0, -0.1, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(corner.z, 0.0, epsilon = 1e-5);
    }
}
