//! Transform propagation system
//!
//! Two passes per frame: rebuild dirty local matrices, then walk the
//! hierarchy from the roots with an explicit stack, writing each entity's
//! world matrix as parent world x local. The stack keeps traversal depth
//! independent of hierarchy depth, and a visited set turns a cycle into an
//! error instead of an endless walk.

use crate::ecs::components::{Hierarchy, Transform};
use crate::ecs::{Entity, World};
use crate::foundation::math::Mat4;
use crate::scene::{SceneError, SceneResult};
use std::collections::HashSet;

/// Recomputes world matrices for every entity with a Transform.
pub struct TransformSystem;

impl TransformSystem {
    pub fn new() -> Self {
        Self
    }

    /// Run both passes over the world.
    pub fn run(&self, world: &mut World) -> SceneResult<()> {
        self.rebuild_dirty_locals(world);
        self.propagate(world)
    }

    fn rebuild_dirty_locals(&self, world: &mut World) {
        for entity in world.entities_with::<Transform>() {
            if let Some(transform) = world.get_mut::<Transform>(entity) {
                if transform.is_dirty() {
                    transform.rebuild_local_matrix();
                }
            }
        }
    }

    fn propagate(&self, world: &mut World) -> SceneResult<()> {
        let mut stack: Vec<(Entity, Mat4)> = Vec::new();
        for entity in world.entities_with::<Transform>() {
            let is_root = match world.get::<Hierarchy>(entity) {
                Some(h) => h.is_root(),
                None => true,
            };
            if is_root {
                stack.push((entity, Mat4::identity()));
            }
        }

        let mut visited: HashSet<Entity> = HashSet::new();
        while let Some((entity, parent_world)) = stack.pop() {
            if !visited.insert(entity) {
                return Err(SceneError::CyclicHierarchy {
                    entity_id: entity.id(),
                });
            }

            let local = match world.get::<Transform>(entity) {
                Some(t) => t.local_matrix(),
                // Hierarchy nodes without a Transform do not contribute a
                // matrix; their subtree is skipped.
                None => continue,
            };
            let world_matrix = parent_world * local;
            if let Some(transform) = world.get_mut::<Transform>(entity) {
                transform.set_world_matrix(world_matrix);
            }

            if let Some(hierarchy) = world.get::<Hierarchy>(entity) {
                for child in hierarchy.children.clone() {
                    if world.has::<Transform>(child) {
                        stack.push((child, world_matrix));
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for TransformSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Quat, Vec3};
    use approx::assert_relative_eq;

    fn world_pos(world: &World, e: Entity) -> Vec3 {
        world.get::<Transform>(e).unwrap().world_position()
    }

    #[test]
    fn root_world_matrix_equals_local() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));

        TransformSystem::new().run(&mut world).unwrap();

        assert_relative_eq!(world_pos(&world, e), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn child_world_matrix_composes_parent_then_local() {
        let mut world = World::new();
        let parent = world.create_entity();
        let child = world.create_entity();

        world.insert(parent, Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        world.insert(
            parent,
            Hierarchy {
                parent: None,
                children: vec![child],
            },
        );
        world.insert(child, Transform::from_position(Vec3::new(0.0, 5.0, 0.0)));
        world.insert(child, Hierarchy::with_parent(parent));

        TransformSystem::new().run(&mut world).unwrap();

        assert_relative_eq!(world_pos(&world, child), Vec3::new(10.0, 5.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn parent_rotation_applies_to_child_position() {
        let mut world = World::new();
        let parent = world.create_entity();
        let child = world.create_entity();

        // 90 degrees about Z carries the child's +X offset onto +Y.
        world.insert(
            parent,
            Transform::identity()
                .with_rotation(Quat::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_2)),
        );
        world.insert(
            parent,
            Hierarchy {
                parent: None,
                children: vec![child],
            },
        );
        world.insert(child, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        world.insert(child, Hierarchy::with_parent(parent));

        TransformSystem::new().run(&mut world).unwrap();

        assert_relative_eq!(world_pos(&world, child), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn three_level_chain_accumulates() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();

        world.insert(a, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        world.insert(
            a,
            Hierarchy {
                parent: None,
                children: vec![b],
            },
        );
        world.insert(b, Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
        world.insert(
            b,
            Hierarchy {
                parent: Some(a),
                children: vec![c],
            },
        );
        world.insert(c, Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));
        world.insert(c, Hierarchy::with_parent(b));

        TransformSystem::new().run(&mut world).unwrap();

        assert_relative_eq!(world_pos(&world, c), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn repeated_propagation_is_bit_identical() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();

        world.insert(
            a,
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Quat::from_euler_angles(0.1, 0.2, 0.3)),
        );
        world.insert(
            a,
            Hierarchy {
                parent: None,
                children: vec![b],
            },
        );
        world.insert(b, Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
        world.insert(
            b,
            Hierarchy {
                parent: Some(a),
                children: vec![c],
            },
        );
        world.insert(c, Transform::from_position(Vec3::new(0.0, 0.0, 3.0)));
        world.insert(c, Hierarchy::with_parent(b));

        let mut system = TransformSystem::new();
        system.run(&mut world).unwrap();
        let first: Vec<Mat4> = [a, b, c]
            .iter()
            .map(|&e| world.get::<Transform>(e).unwrap().world_matrix())
            .collect();

        // A second run over the clean graph must not perturb a single bit.
        system.run(&mut world).unwrap();
        for (&e, expected) in [a, b, c].iter().zip(&first) {
            assert_eq!(world.get::<Transform>(e).unwrap().world_matrix(), *expected);
        }
    }

    #[test]
    fn dirty_flag_cleared_after_run() {
        let mut world = World::new();
        let e = world.create_entity();
        let mut t = Transform::identity();
        t.set_position(Vec3::new(4.0, 0.0, 0.0));
        assert!(t.is_dirty());
        world.insert(e, t);

        TransformSystem::new().run(&mut world).unwrap();

        assert!(!world.get::<Transform>(e).unwrap().is_dirty());
        assert_relative_eq!(world_pos(&world, e), Vec3::new(4.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn child_without_transform_is_skipped() {
        let mut world = World::new();
        let parent = world.create_entity();
        let bare = world.create_entity();
        let grandchild = world.create_entity();

        world.insert(parent, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        world.insert(
            parent,
            Hierarchy {
                parent: None,
                children: vec![bare],
            },
        );
        // `bare` has hierarchy links but no Transform.
        world.insert(
            bare,
            Hierarchy {
                parent: Some(parent),
                children: vec![grandchild],
            },
        );
        world.insert(grandchild, Transform::identity());
        world.insert(grandchild, Hierarchy::with_parent(bare));

        TransformSystem::new().run(&mut world).unwrap();

        // The grandchild hangs off a skipped node, so it keeps its default
        // world matrix rather than inheriting through it.
        assert_relative_eq!(world_pos(&world, grandchild), Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn reachable_cycle_reports_error() {
        let mut world = World::new();
        let root = world.create_entity();
        let a = world.create_entity();

        world.insert(root, Transform::identity());
        world.insert(
            root,
            Hierarchy {
                parent: None,
                children: vec![a],
            },
        );
        world.insert(a, Transform::identity());
        world.insert(
            a,
            Hierarchy {
                parent: Some(root),
                // Link back up to the root.
                children: vec![root],
            },
        );

        let err = TransformSystem::new().run(&mut world).unwrap_err();
        assert!(matches!(err, SceneError::CyclicHierarchy { .. }));
    }
}
