//! ECS systems
//!
//! Systems are plain structs with a `run` method over the world; the engine
//! and game code decide when each one runs.

pub mod camera_system;
pub mod mesh_renderer;
pub mod transform_system;

pub use camera_system::CameraSystem;
pub use mesh_renderer::MeshRendererSystem;
pub use transform_system::TransformSystem;
