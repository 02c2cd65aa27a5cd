//! Scene management
//!
//! A [`Scene`] bundles an ECS world with an ordered list of game systems;
//! the [`SceneManager`] keeps named scenes and dispatches lifecycle calls to
//! the active one.

pub mod game_system;
pub mod scene;
pub mod scene_manager;

pub use game_system::GameSystem;
pub use scene::Scene;
pub use scene_manager::{SceneId, SceneManager};

use thiserror::Error;

/// Errors from scene management and scene-graph traversal
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("a scene named '{0}' already exists")]
    DuplicateScene(String),

    #[error("no scene with id {0:?}")]
    SceneNotFound(SceneId),

    #[error("cyclic hierarchy detected at entity {entity_id}")]
    CyclicHierarchy { entity_id: u32 },

    #[error("system '{system}' failed during {phase}: {message}")]
    SystemFailure {
        system: String,
        phase: &'static str,
        message: String,
    },
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
