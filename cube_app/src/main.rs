//! Spinning-cube demo
//!
//! Builds one scene containing a textured cube and a perspective camera,
//! then runs the engine loop with a fixed-timestep accumulator.

use lumen_engine::foundation::logging;
use lumen_engine::prelude::*;
use lumen_engine::scene::scene::SystemHandle;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

const CONFIG_PATH: &str = "cube_app.toml";
const FIXED_DELTA: f32 = 1.0 / 60.0;
const SPIN_RADIANS_PER_SECOND: f32 = 0.9;

/// Runs the engine-provided systems in render order: transforms, then
/// cameras, then draw recording.
struct RenderPipeline {
    transforms: TransformSystem,
    cameras: CameraSystem,
    renderer: MeshRendererSystem,
}

impl RenderPipeline {
    fn new(viewport: Viewport) -> Self {
        Self {
            transforms: TransformSystem::new(),
            cameras: CameraSystem::new(viewport),
            renderer: MeshRendererSystem::new(),
        }
    }
}

impl GameSystem for RenderPipeline {
    fn update(&mut self, world: &mut World, _delta_time: f32) -> SceneResult<()> {
        self.transforms.run(world)?;
        self.cameras.run(world);
        Ok(())
    }

    fn render(&mut self, world: &mut World, frame: &mut FrameContext) -> RenderResult<()> {
        self.renderer.run(world, frame)
    }
}

/// Rotates the cube about the world Y axis.
struct Spinner {
    target: Entity,
}

impl GameSystem for Spinner {
    fn update(&mut self, world: &mut World, delta_time: f32) -> SceneResult<()> {
        if let Some(transform) = world.get_mut::<Transform>(self.target) {
            let spin = Quat::from_axis_angle(
                &nalgebra::Vector3::y_axis(),
                SPIN_RADIANS_PER_SECOND * delta_time,
            );
            transform.rotate(spin);
        }
        Ok(())
    }
}

fn build_scene(engine: &mut Engine) -> Result<SceneId, Box<dyn std::error::Error>> {
    let mesh = engine.meshes().create(engine.context(), MeshData::cube())?;
    let shader = engine.shaders().create(engine.context(), "unlit")?;
    let material = engine.materials().create(engine.context(), shader)?;

    let mut scene = Scene::new("main");
    let world = scene.world_mut();

    let cube = world.create_entity();
    world.insert(cube, Transform::identity());
    world.insert(cube, MeshRenderer::new(mesh));
    world.insert(cube, MaterialRef::new(material));

    let camera = world.create_entity();
    let mut camera_transform = Transform::from_position(Vec3::new(0.0, 1.5, 4.0));
    camera_transform.look_at(Vec3::zeros(), Vec3::y());
    world.insert(camera, camera_transform);
    world.insert(camera, Camera::default());
    world.set_active_camera(Some(camera));

    let pipeline: SystemHandle = Rc::new(RefCell::new(RenderPipeline::new(
        engine.viewport().clone(),
    )));
    let spinner: SystemHandle = Rc::new(RefCell::new(Spinner { target: cube }));
    scene.add_system(spinner);
    scene.add_system(pipeline);

    let id = engine.scene_manager_mut().add_scene(scene)?;
    engine.scene_manager_mut().set_active_scene(id)?;
    engine.scene_manager_mut().initialize_active()?;
    Ok(id)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = match EngineConfig::from_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            log::debug!("no usable {CONFIG_PATH} ({e}), using defaults");
            EngineConfig::default()
        }
    };

    let mut engine = Engine::initialize(&config.api, &config.window)?;
    build_scene(&mut engine)?;

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;

    while engine.is_running() {
        let now = Instant::now();
        let delta_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        engine.poll_events();

        accumulator += delta_time;
        while accumulator >= FIXED_DELTA {
            engine.fixed_update(FIXED_DELTA)?;
            accumulator -= FIXED_DELTA;
        }

        engine.update(delta_time)?;
        engine.render()?;
    }

    engine.shutdown();
    Ok(())
}
