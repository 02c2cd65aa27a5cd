//! Entity-Component-System implementation
//!
//! A minimal ECS: entities are plain ids, components live in per-type
//! storages keyed by entity, and systems are free functions over the world.

pub mod component;
pub mod components;
pub mod entity;
pub mod systems;
pub mod world;

pub use component::Component;
pub use components::{Camera, Hierarchy, MaterialRef, MeshRenderer, Projection, Transform};
pub use entity::Entity;
pub use world::World;
