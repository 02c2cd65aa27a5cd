//! Game system lifecycle trait

use crate::ecs::World;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::RenderResult;
use crate::scene::SceneResult;

/// Lifecycle hooks for game logic attached to a scene.
///
/// All hooks default to no-ops so implementors only write the phases they
/// care about. Hooks run in the order systems were added to the scene.
pub trait GameSystem {
    /// Called once when the owning scene becomes active.
    fn initialize(&mut self, world: &mut World) -> SceneResult<()> {
        let _ = world;
        Ok(())
    }

    /// Called once per frame with the elapsed wall time in seconds.
    fn update(&mut self, world: &mut World, delta_time: f32) -> SceneResult<()> {
        let _ = (world, delta_time);
        Ok(())
    }

    /// Called on the fixed timestep, possibly several times per frame.
    fn fixed_update(&mut self, world: &mut World, fixed_delta: f32) -> SceneResult<()> {
        let _ = (world, fixed_delta);
        Ok(())
    }

    /// Called between begin_frame and end_frame to record draw commands.
    fn render(&mut self, world: &mut World, frame: &mut FrameContext) -> RenderResult<()> {
        let _ = (world, frame);
        Ok(())
    }

    /// Called when the scene is destroyed or the engine shuts down.
    fn shutdown(&mut self, world: &mut World) {
        let _ = world;
    }
}
