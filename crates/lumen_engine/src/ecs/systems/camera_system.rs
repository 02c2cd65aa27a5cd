//! Camera system
//!
//! Derives view and projection matrices for every (Transform, Camera) pair.
//! The viewport handle is shared with the engine, which writes the
//! framebuffer size into it on resize events.

use crate::ecs::components::{Camera, Transform};
use crate::ecs::World;
use crate::foundation::math;
use crate::render::api::Viewport;

/// Updates camera matrices from transforms and the current viewport.
pub struct CameraSystem {
    viewport: Viewport,
}

impl CameraSystem {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn run(&self, world: &mut World) {
        let aspect = self.viewport.aspect_ratio();

        for entity in world.entities_with2::<Transform, Camera>() {
            let (position, forward, up) = {
                let transform = match world.get::<Transform>(entity) {
                    Some(t) => t,
                    None => continue,
                };
                (transform.world_position(), transform.forward(), transform.up())
            };

            if let Some(camera) = world.get_mut::<Camera>(entity) {
                camera.set_view_matrix(math::look_at_rh(position, position + forward, up));
                camera.aspect_ratio = aspect;
                camera.rebuild_projection();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::TransformSystem;
    use crate::foundation::math::{Vec3, Vec4};
    use approx::assert_relative_eq;

    #[test]
    fn view_matrix_follows_the_transform() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        world.insert(e, Camera::default());

        TransformSystem::new().run(&mut world).unwrap();
        CameraSystem::new(Viewport::new(800, 600)).run(&mut world);

        let view = world.get::<Camera>(e).unwrap().view_matrix();
        // The origin sits 5 units down the camera's -Z.
        let origin = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.xyz(), Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn aspect_ratio_comes_from_the_viewport() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Transform::identity());
        world.insert(e, Camera::default());

        let viewport = Viewport::new(1920, 1080);
        TransformSystem::new().run(&mut world).unwrap();
        CameraSystem::new(viewport.clone()).run(&mut world);
        assert_relative_eq!(
            world.get::<Camera>(e).unwrap().aspect_ratio,
            1920.0 / 1080.0
        );

        // Resize flows through the shared handle on the next run.
        viewport.set(1000, 500);
        CameraSystem::new(viewport).run(&mut world);
        assert_relative_eq!(world.get::<Camera>(e).unwrap().aspect_ratio, 2.0);
    }

    #[test]
    fn zero_height_viewport_falls_back_to_square_aspect() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Transform::identity());
        world.insert(e, Camera::default());

        TransformSystem::new().run(&mut world).unwrap();
        CameraSystem::new(Viewport::new(800, 0)).run(&mut world);

        assert_relative_eq!(world.get::<Camera>(e).unwrap().aspect_ratio, 1.0);
    }

    #[test]
    fn scaled_transform_still_yields_orthonormal_view_basis() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(
            e,
            Transform::from_position(Vec3::new(0.0, 0.0, 5.0))
                .with_scale(Vec3::new(3.0, 3.0, 3.0)),
        );
        world.insert(e, Camera::default());

        TransformSystem::new().run(&mut world).unwrap();
        CameraSystem::new(Viewport::new(800, 600)).run(&mut world);

        // Scale must not leak into the view matrix.
        let view = world.get::<Camera>(e).unwrap().view_matrix();
        let origin = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.xyz(), Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }
}
