//! Mesh renderer system
//!
//! Walks renderable entities and records their draws into the frame's
//! command buffer. No culling, sorting or batching; submission order is the
//! world's ascending entity-id order.

use crate::ecs::components::{Camera, MaterialRef, MeshRenderer, Transform};
use crate::ecs::{Entity, World};
use crate::render::vulkan::renderer::FrameContext;
use crate::render::RenderResult;
use log::{debug, warn};

/// Records draw commands for every visible (MeshRenderer, MaterialRef,
/// Transform) entity.
pub struct MeshRendererSystem;

impl MeshRendererSystem {
    pub fn new() -> Self {
        Self
    }

    /// The camera used for this frame: the explicitly designated entity if
    /// it carries Camera and Transform, otherwise the first (Camera,
    /// Transform) in iteration order.
    fn resolve_camera(world: &World) -> Option<Entity> {
        if let Some(designated) = world.active_camera() {
            if world.has::<Camera>(designated) && world.has::<Transform>(designated) {
                return Some(designated);
            }
            warn!(
                "active camera entity {} lacks Camera or Transform, falling back",
                designated.id()
            );
        }
        world.entities_with2::<Camera, Transform>().into_iter().next()
    }

    pub fn run(&self, world: &mut World, frame: &mut FrameContext) -> RenderResult<()> {
        let camera_entity = match Self::resolve_camera(world) {
            Some(e) => e,
            None => {
                debug!("no camera in world, skipping draw pass");
                return Ok(());
            }
        };
        let (view, projection) = match world.get::<Camera>(camera_entity) {
            Some(camera) => (camera.view_matrix(), camera.projection_matrix()),
            None => return Ok(()),
        };

        for entity in world.entities_with3::<MeshRenderer, MaterialRef, Transform>() {
            let (mesh, visible) = match world.get::<MeshRenderer>(entity) {
                Some(r) => (r.mesh.clone(), r.should_render()),
                None => continue,
            };
            if !visible {
                continue;
            }
            let material = match world.get::<MaterialRef>(entity) {
                Some(m) => m.material.clone(),
                None => continue,
            };
            let model = match world.get::<Transform>(entity) {
                Some(t) => t.world_matrix(),
                None => continue,
            };

            let shader = material.shader();
            shader.set_uniform_mat4("model", &model)?;
            shader.set_uniform_mat4("view", &view)?;
            shader.set_uniform_mat4("projection", &projection)?;

            material.bind(frame)?;
            mesh.record_draw(frame)?;
        }

        Ok(())
    }
}

impl Default for MeshRendererSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designated_camera_wins_over_iteration_order() {
        let mut world = World::new();
        let first = world.create_entity();
        let second = world.create_entity();
        for e in [first, second] {
            world.insert(e, Transform::identity());
            world.insert(e, Camera::default());
        }

        assert_eq!(MeshRendererSystem::resolve_camera(&world), Some(first));

        world.set_active_camera(Some(second));
        assert_eq!(MeshRendererSystem::resolve_camera(&world), Some(second));
    }

    #[test]
    fn invalid_designation_falls_back_to_first_camera() {
        let mut world = World::new();
        let cam = world.create_entity();
        world.insert(cam, Transform::identity());
        world.insert(cam, Camera::default());

        let bare = world.create_entity();
        world.set_active_camera(Some(bare));

        assert_eq!(MeshRendererSystem::resolve_camera(&world), Some(cam));
    }

    #[test]
    fn no_camera_resolves_to_none() {
        let mut world = World::new();
        world.create_entity();
        assert_eq!(MeshRendererSystem::resolve_camera(&world), None);
    }
}
