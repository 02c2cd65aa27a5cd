//! ECS World implementation

use super::{Component, Entity};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};

/// Per-component-type storage, keyed by entity.
///
/// BTreeMap keeps iteration in ascending entity-id order, so system passes
/// over the world are deterministic.
struct Storage<T: Component> {
    items: BTreeMap<Entity, T>,
}

impl<T: Component> Storage<T> {
    fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

/// Type-erased view of a storage, so the world can drop an entity's
/// components without knowing their concrete types.
trait AnyStorage {
    fn remove_entity(&mut self, entity: Entity);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStorage for Storage<T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.items.remove(&entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// ECS World containing all entities and components
pub struct World {
    next_entity_id: u32,
    entities: Vec<Entity>,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
    active_camera: Option<Entity>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self {
            next_entity_id: 0,
            entities: Vec::new(),
            storages: HashMap::new(),
            active_camera: None,
        }
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.push(entity);
        entity
    }

    /// Destroy an entity, dropping all of its components.
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.entities.retain(|e| *e != entity);
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        if self.active_camera == Some(entity) {
            self.active_camera = None;
        }
    }

    fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<Storage<T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<Storage<T>>())
    }

    /// Attach a component to an entity, replacing any existing one.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::new()));
        storage
            .as_any_mut()
            .downcast_mut::<Storage<T>>()
            .expect("storage type mismatch for TypeId")
            .items
            .insert(entity, component);
    }

    /// Get a component from an entity
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.items.get(&entity)
    }

    /// Get a mutable component from an entity
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.items.get_mut(&entity)
    }

    /// Detach and return an entity's component, if present.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storage_mut::<T>()?.items.remove(&entity)
    }

    /// Whether the entity currently has a component of type T.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>()
            .map(|s| s.items.contains_key(&entity))
            .unwrap_or(false)
    }

    /// Entities holding a component of type T, in ascending id order.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.storage::<T>()
            .map(|s| s.items.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Entities holding both A and B, in ascending id order.
    pub fn entities_with2<A: Component, B: Component>(&self) -> Vec<Entity> {
        self.entities_with::<A>()
            .into_iter()
            .filter(|e| self.has::<B>(*e))
            .collect()
    }

    /// Entities holding A, B and C, in ascending id order.
    pub fn entities_with3<A: Component, B: Component, C: Component>(&self) -> Vec<Entity> {
        self.entities_with::<A>()
            .into_iter()
            .filter(|e| self.has::<B>(*e) && self.has::<C>(*e))
            .collect()
    }

    /// Get an iterator over all entities
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Mark an entity as the camera used for rendering.
    ///
    /// Passing `None` clears the designation. The entity is not required to
    /// carry a Camera component yet; systems check at use time.
    pub fn set_active_camera(&mut self, entity: Option<Entity>) {
        self.active_camera = entity;
    }

    /// The entity designated as the rendering camera, if any.
    pub fn active_camera(&self) -> Option<Entity> {
        self.active_camera
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(f32);
    struct Velocity(f32);
    struct Tag;

    impl Component for Position {}
    impl Component for Velocity {}
    impl Component for Tag {}

    #[test]
    fn entities_get_distinct_ids() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        assert_ne!(a, b);
        assert!(a.id() < b.id());
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Position(3.0));

        assert_eq!(world.get::<Position>(e).unwrap().0, 3.0);
        assert!(world.get::<Velocity>(e).is_none());
    }

    #[test]
    fn insert_replaces_existing_component() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Position(1.0));
        world.insert(e, Position(2.0));

        assert_eq!(world.get::<Position>(e).unwrap().0, 2.0);
    }

    #[test]
    fn get_mut_mutates_in_place() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Position(1.0));

        world.get_mut::<Position>(e).unwrap().0 = 9.0;
        assert_eq!(world.get::<Position>(e).unwrap().0, 9.0);
    }

    #[test]
    fn remove_detaches_component() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Position(5.0));

        let taken = world.remove::<Position>(e).unwrap();
        assert_eq!(taken.0, 5.0);
        assert!(!world.has::<Position>(e));
        assert!(world.remove::<Position>(e).is_none());
    }

    #[test]
    fn destroy_entity_drops_all_components() {
        let mut world = World::new();
        let e = world.create_entity();
        world.insert(e, Position(1.0));
        world.insert(e, Velocity(2.0));
        world.set_active_camera(Some(e));

        world.destroy_entity(e);

        assert!(!world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));
        assert!(world.active_camera().is_none());
        assert_eq!(world.entities().count(), 0);
    }

    #[test]
    fn entities_with_iterates_in_ascending_id_order() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();

        // Insert out of order; iteration is still sorted.
        world.insert(c, Position(3.0));
        world.insert(a, Position(1.0));
        world.insert(b, Position(2.0));

        assert_eq!(world.entities_with::<Position>(), vec![a, b, c]);
    }

    #[test]
    fn multi_component_views_intersect() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();

        world.insert(a, Position(0.0));
        world.insert(b, Position(0.0));
        world.insert(b, Velocity(0.0));
        world.insert(c, Position(0.0));
        world.insert(c, Velocity(0.0));
        world.insert(c, Tag);

        assert_eq!(world.entities_with2::<Position, Velocity>(), vec![b, c]);
        assert_eq!(world.entities_with3::<Position, Velocity, Tag>(), vec![c]);
    }

    #[test]
    fn active_camera_designation() {
        let mut world = World::new();
        assert!(world.active_camera().is_none());

        let cam = world.create_entity();
        world.set_active_camera(Some(cam));
        assert_eq!(world.active_camera(), Some(cam));

        world.set_active_camera(None);
        assert!(world.active_camera().is_none());
    }
}
