//! # Lumen Engine
//!
//! A small real-time rendering engine: a Vulkan backend with explicit GPU
//! resource and frame lifecycle management, an entity-component scene graph
//! with hierarchical transforms and cameras, and a scene/system layer that
//! composes them into a running application.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lumen_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     lumen_engine::foundation::logging::init();
//!     let config = EngineConfig::default();
//!     let mut engine = Engine::initialize(&config.api, &config.window)?;
//!
//!     while engine.is_running() {
//!         engine.poll_events();
//!         engine.update(0.016)?;
//!         engine.render()?;
//!     }
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod ecs;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod window;

mod engine;

pub use engine::{Engine, EngineError, EngineResult};

/// Common imports for engine users.
pub mod prelude {
    pub use crate::core::config::{EngineConfig, WindowSettings};
    pub use crate::ecs::{
        Camera, Component, Entity, Hierarchy, MaterialRef, MeshRenderer, Projection, Transform,
        World,
    };
    pub use crate::ecs::systems::{CameraSystem, MeshRendererSystem, TransformSystem};
    pub use crate::foundation::math::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use crate::render::api::{GraphicsApiType, GraphicsContext, Viewport};
    pub use crate::render::mesh::MeshData;
    pub use crate::render::{FrameContext, RenderError, RenderResult};
    pub use crate::scene::{GameSystem, Scene, SceneError, SceneId, SceneManager, SceneResult};
    pub use crate::{Engine, EngineError, EngineResult};
}
