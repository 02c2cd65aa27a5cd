//! Scene: a world plus its game systems

use crate::ecs::World;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::RenderResult;
use crate::scene::{GameSystem, SceneResult};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a game system.
pub type SystemHandle = Rc<RefCell<dyn GameSystem>>;

/// A named ECS world with an ordered list of game systems.
pub struct Scene {
    name: String,
    world: World,
    systems: Vec<SystemHandle>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: World::new(),
            systems: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Append a system. The same handle (by identity) is added at most once;
    /// a repeat add is ignored and returns false.
    pub fn add_system(&mut self, system: SystemHandle) -> bool {
        if self.systems.iter().any(|s| Rc::ptr_eq(s, &system)) {
            debug!("scene '{}': system already registered, ignoring", self.name);
            return false;
        }
        self.systems.push(system);
        true
    }

    /// Detach a system by identity. Returns whether it was present.
    pub fn remove_system(&mut self, system: &SystemHandle) -> bool {
        let before = self.systems.len();
        self.systems.retain(|s| !Rc::ptr_eq(s, system));
        self.systems.len() != before
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn initialize(&mut self) -> SceneResult<()> {
        debug!("scene '{}': initialize", self.name);
        for system in &self.systems {
            system.borrow_mut().initialize(&mut self.world)?;
        }
        Ok(())
    }

    pub fn update(&mut self, delta_time: f32) -> SceneResult<()> {
        for system in &self.systems {
            system.borrow_mut().update(&mut self.world, delta_time)?;
        }
        Ok(())
    }

    pub fn fixed_update(&mut self, fixed_delta: f32) -> SceneResult<()> {
        for system in &self.systems {
            system.borrow_mut().fixed_update(&mut self.world, fixed_delta)?;
        }
        Ok(())
    }

    pub fn render(&mut self, frame: &mut FrameContext) -> RenderResult<()> {
        for system in &self.systems {
            system.borrow_mut().render(&mut self.world, frame)?;
        }
        Ok(())
    }

    pub fn shutdown(&mut self) {
        debug!("scene '{}': shutdown", self.name);
        for system in &self.systems {
            system.borrow_mut().shutdown(&mut self.world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneError;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_update: bool,
    }

    impl GameSystem for Recorder {
        fn initialize(&mut self, _world: &mut World) -> SceneResult<()> {
            self.calls.push("initialize");
            Ok(())
        }

        fn update(&mut self, _world: &mut World, _dt: f32) -> SceneResult<()> {
            self.calls.push("update");
            if self.fail_update {
                return Err(SceneError::SystemFailure {
                    system: "recorder".into(),
                    phase: "update",
                    message: "forced".into(),
                });
            }
            Ok(())
        }

        fn fixed_update(&mut self, _world: &mut World, _dt: f32) -> SceneResult<()> {
            self.calls.push("fixed_update");
            Ok(())
        }

        fn shutdown(&mut self, _world: &mut World) {
            self.calls.push("shutdown");
        }
    }

    #[test]
    fn duplicate_system_handle_is_rejected() {
        let mut scene = Scene::new("main");
        let system: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder::default()));
        let handle: SystemHandle = system.clone();

        assert!(scene.add_system(handle.clone()));
        assert!(!scene.add_system(handle));
        assert_eq!(scene.system_count(), 1);

        // A distinct instance of the same type is a different system.
        assert!(scene.add_system(Rc::new(RefCell::new(Recorder::default()))));
        assert_eq!(scene.system_count(), 2);
    }

    #[test]
    fn lifecycle_dispatches_in_insertion_order() {
        let mut scene = Scene::new("main");
        let a: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder::default()));
        let b: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder::default()));
        scene.add_system(a.clone());
        scene.add_system(b.clone());

        scene.initialize().unwrap();
        scene.update(0.016).unwrap();
        scene.fixed_update(0.02).unwrap();
        scene.shutdown();

        for sys in [&a, &b] {
            assert_eq!(
                sys.borrow().calls,
                vec!["initialize", "update", "fixed_update", "shutdown"]
            );
        }
    }

    #[test]
    fn first_error_stops_dispatch() {
        let mut scene = Scene::new("main");
        let failing: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder {
            fail_update: true,
            ..Default::default()
        }));
        let after: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder::default()));
        scene.add_system(failing);
        scene.add_system(after.clone());

        assert!(scene.update(0.016).is_err());
        assert!(after.borrow().calls.is_empty());
    }

    #[test]
    fn remove_system_by_identity() {
        let mut scene = Scene::new("main");
        let handle: SystemHandle = Rc::new(RefCell::new(Recorder::default()));
        scene.add_system(handle.clone());

        assert!(scene.remove_system(&handle));
        assert!(!scene.remove_system(&handle));
        assert_eq!(scene.system_count(), 0);
    }
}
