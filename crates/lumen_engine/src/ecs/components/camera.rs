//! Camera component
//!
//! Projection parameters plus the view/projection matrices the camera system
//! derives each frame. The camera looks down its local -Z axis.

use crate::foundation::math::{self, Mat4};

/// Projection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Camera parameters and derived matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    /// Vertical field of view in degrees, perspective only.
    pub fov_y_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    /// Half the vertical extent of the view volume, orthographic only.
    pub orthographic_size: f32,
    /// Width over height. Updated from the viewport by the camera system.
    pub aspect_ratio: f32,

    view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            fov_y_degrees: 60.0,
            near_plane: 0.03,
            far_plane: 1000.0,
            orthographic_size: 5.0,
            aspect_ratio: 16.0 / 9.0,
            view_matrix: Mat4::identity(),
            projection_matrix: Mat4::identity(),
        }
    }
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            projection: Projection::Perspective,
            fov_y_degrees,
            near_plane,
            far_plane,
            ..Default::default()
        }
    }

    pub fn orthographic(size: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            projection: Projection::Orthographic,
            orthographic_size: size,
            near_plane,
            far_plane,
            ..Default::default()
        }
    }

    /// Recompute the projection matrix from the current parameters.
    pub fn rebuild_projection(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective => math::perspective_rh_zo(
                math::deg_to_rad(self.fov_y_degrees),
                self.aspect_ratio,
                self.near_plane,
                self.far_plane,
            ),
            Projection::Orthographic => {
                let half_h = self.orthographic_size;
                let half_w = half_h * self.aspect_ratio;
                math::ortho_rh_zo(
                    -half_w,
                    half_w,
                    -half_h,
                    half_h,
                    self.near_plane,
                    self.far_plane,
                )
            }
        };
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub(crate) fn set_view_matrix(&mut self, view: Mat4) {
        self.view_matrix = view;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_engine_conventions() {
        let cam = Camera::default();
        assert_eq!(cam.projection, Projection::Perspective);
        assert_relative_eq!(cam.fov_y_degrees, 60.0);
        assert_relative_eq!(cam.near_plane, 0.03);
        assert_relative_eq!(cam.far_plane, 1000.0);
        assert_relative_eq!(cam.orthographic_size, 5.0);
        assert_relative_eq!(cam.aspect_ratio, 16.0 / 9.0);
    }

    #[test]
    fn orthographic_projection_spans_twice_the_size() {
        let mut cam = Camera::orthographic(5.0, 0.1, 100.0);
        cam.aspect_ratio = 2.0;
        cam.rebuild_projection();

        // Top of the view volume maps to clip y = +1.
        let proj = cam.projection_matrix();
        let top = proj * crate::foundation::math::Vec4::new(0.0, 5.0, -1.0, 1.0);
        assert_relative_eq!(top.y, 1.0, epsilon = 1e-5);

        // Width is aspect * height.
        let right = proj * crate::foundation::math::Vec4::new(10.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(right.x, 1.0, epsilon = 1e-5);
    }
}
