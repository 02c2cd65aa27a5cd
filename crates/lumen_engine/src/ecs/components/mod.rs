//! ECS Components module
//!
//! Pure data components; all logic lives in the systems.

pub mod camera;
pub mod hierarchy;
pub mod renderable;
pub mod transform;

pub use camera::{Camera, Projection};
pub use hierarchy::Hierarchy;
pub use renderable::{MaterialRef, MeshRenderer};
pub use transform::Transform;
