//! Scene registry with one active scene

use crate::render::vulkan::renderer::FrameContext;
use crate::render::RenderResult;
use crate::scene::{Scene, SceneError, SceneResult};
use log::{debug, warn};
use std::collections::HashMap;

/// Identifier handed out by [`SceneManager::add_scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Owns every scene and routes lifecycle calls to the active one.
pub struct SceneManager {
    next_id: u32,
    scenes: HashMap<SceneId, Scene>,
    names: HashMap<String, SceneId>,
    active: Option<SceneId>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            scenes: HashMap::new(),
            names: HashMap::new(),
            active: None,
        }
    }

    /// Register a scene. Names are unique; ids increase monotonically.
    pub fn add_scene(&mut self, scene: Scene) -> SceneResult<SceneId> {
        if self.names.contains_key(scene.name()) {
            return Err(SceneError::DuplicateScene(scene.name().to_owned()));
        }
        let id = SceneId(self.next_id);
        self.next_id += 1;
        self.names.insert(scene.name().to_owned(), id);
        debug!("registered scene '{}' as {:?}", scene.name(), id);
        self.scenes.insert(id, scene);
        Ok(id)
    }

    pub fn scene_by_id(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(&id)
    }

    pub fn scene_by_id_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        self.scenes.get_mut(&id)
    }

    pub fn scene_by_name(&self, name: &str) -> Option<&Scene> {
        self.names.get(name).and_then(|id| self.scenes.get(id))
    }

    pub fn id_by_name(&self, name: &str) -> Option<SceneId> {
        self.names.get(name).copied()
    }

    /// Make `id` the scene that receives lifecycle dispatches.
    pub fn set_active_scene(&mut self, id: SceneId) -> SceneResult<()> {
        if !self.scenes.contains_key(&id) {
            return Err(SceneError::SceneNotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn active_scene_id(&self) -> Option<SceneId> {
        self.active
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.and_then(|id| self.scenes.get(&id))
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        self.active.and_then(|id| self.scenes.get_mut(&id))
    }

    /// Remove a scene, running its shutdown hooks. Clears the active scene
    /// if it was the one destroyed.
    pub fn destroy_scene(&mut self, id: SceneId) -> SceneResult<()> {
        let mut scene = self.scenes.remove(&id).ok_or(SceneError::SceneNotFound(id))?;
        scene.shutdown();
        self.names.remove(scene.name());
        if self.active == Some(id) {
            warn!("destroyed the active scene '{}'", scene.name());
            self.active = None;
        }
        Ok(())
    }

    pub fn initialize_active(&mut self) -> SceneResult<()> {
        match self.active_scene_mut() {
            Some(scene) => scene.initialize(),
            None => Ok(()),
        }
    }

    pub fn update_active(&mut self, delta_time: f32) -> SceneResult<()> {
        match self.active_scene_mut() {
            Some(scene) => scene.update(delta_time),
            None => Ok(()),
        }
    }

    pub fn fixed_update_active(&mut self, fixed_delta: f32) -> SceneResult<()> {
        match self.active_scene_mut() {
            Some(scene) => scene.fixed_update(fixed_delta),
            None => Ok(()),
        }
    }

    pub fn render_active(&mut self, frame: &mut FrameContext) -> RenderResult<()> {
        match self.active_scene_mut() {
            Some(scene) => scene.render(frame),
            None => Ok(()),
        }
    }

    /// Shut down every scene, active first.
    pub fn shutdown_all(&mut self) {
        let mut ids: Vec<SceneId> = self.scenes.keys().copied().collect();
        ids.sort();
        if let Some(active) = self.active.take() {
            ids.retain(|id| *id != active);
            ids.insert(0, active);
        }
        for id in ids {
            if let Some(mut scene) = self.scenes.remove(&id) {
                self.names.remove(scene.name());
                scene.shutdown();
            }
        }
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_monotonically() {
        let mut mgr = SceneManager::new();
        let a = mgr.add_scene(Scene::new("a")).unwrap();
        let b = mgr.add_scene(Scene::new("b")).unwrap();
        assert!(a < b);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut mgr = SceneManager::new();
        mgr.add_scene(Scene::new("level")).unwrap();
        let err = mgr.add_scene(Scene::new("level")).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateScene(name) if name == "level"));
    }

    #[test]
    fn lookup_by_id_and_name() {
        let mut mgr = SceneManager::new();
        let id = mgr.add_scene(Scene::new("menu")).unwrap();

        assert_eq!(mgr.scene_by_id(id).unwrap().name(), "menu");
        assert_eq!(mgr.scene_by_name("menu").unwrap().name(), "menu");
        assert_eq!(mgr.id_by_name("menu"), Some(id));
        assert!(mgr.scene_by_name("missing").is_none());
    }

    #[test]
    fn activating_missing_scene_fails() {
        let mut mgr = SceneManager::new();
        let id = mgr.add_scene(Scene::new("a")).unwrap();
        mgr.destroy_scene(id).unwrap();

        let err = mgr.set_active_scene(id).unwrap_err();
        assert!(matches!(err, SceneError::SceneNotFound(missing) if missing == id));
    }

    #[test]
    fn destroying_the_active_scene_clears_it() {
        let mut mgr = SceneManager::new();
        let id = mgr.add_scene(Scene::new("a")).unwrap();
        mgr.set_active_scene(id).unwrap();

        mgr.destroy_scene(id).unwrap();
        assert!(mgr.active_scene_id().is_none());

        // The name is free for reuse afterwards.
        mgr.add_scene(Scene::new("a")).unwrap();
    }

    #[test]
    fn dispatch_without_active_scene_is_a_no_op() {
        let mut mgr = SceneManager::new();
        mgr.add_scene(Scene::new("idle")).unwrap();

        assert!(mgr.initialize_active().is_ok());
        assert!(mgr.update_active(0.016).is_ok());
        assert!(mgr.fixed_update_active(0.02).is_ok());
    }
}
