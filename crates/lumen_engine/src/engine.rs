//! Engine façade
//!
//! Owns the window, the graphics backend, the resource factories and the
//! scene manager, and drives the per-frame loop. Initialization aborts on
//! the first failure; nothing partially constructed is returned.

use crate::core::config::WindowSettings;
use crate::render::api::{GraphicsApiType, GraphicsContext, Viewport};
use crate::render::material::MaterialFactory;
use crate::render::mesh::MeshFactory;
use crate::render::shader::ShaderFactory;
use crate::render::texture::TextureFactory;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::renderer::FrameManager;
use crate::render::RenderError;
use crate::scene::scene_manager::SceneManager;
use crate::scene::SceneError;
use crate::window::{Window, WindowError};
use ash::vk;
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;

/// Default root for per-shader SPIR-V directories.
const SHADER_BASE_DIR: &str = "resources/shaders";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct Engine {
    api: GraphicsApiType,
    window: Option<Window>,
    context: GraphicsContext,
    frame_manager: Option<FrameManager>,
    viewport: Viewport,
    scene_manager: SceneManager,
    meshes: MeshFactory,
    shaders: ShaderFactory,
    materials: MaterialFactory,
    textures: TextureFactory,
    shutdown_done: bool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("api", &self.api)
            .field("shutdown_done", &self.shutdown_done)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Bring up the backend named by `api_name`.
    ///
    /// `"noapi"` runs headless with no window or GPU. `"vulkan"` creates the
    /// window, device context and frame manager. Other recognized names fail
    /// with [`RenderError::UnsupportedBackend`]; unknown names with
    /// [`RenderError::UnknownApi`].
    pub fn initialize(api_name: &str, settings: &WindowSettings) -> EngineResult<Self> {
        let api = GraphicsApiType::from_name(api_name)?;

        let (window, context, frame_manager, viewport) = match api {
            GraphicsApiType::NoApi => {
                info!("engine initializing headless");
                let viewport = Viewport::new(settings.width, settings.height);
                (None, GraphicsContext::Headless, None, viewport)
            }
            GraphicsApiType::Vulkan => {
                info!(
                    "engine initializing vulkan, {}x{} '{}'",
                    settings.width, settings.height, settings.title
                );
                let mut window = Window::new(&settings.title, settings.width, settings.height)?;
                let ctx = Arc::new(
                    VulkanContext::new(&mut window, &settings.title, cfg!(debug_assertions))
                        .map_err(RenderError::from)?,
                );

                let (fb_width, fb_height) = window.framebuffer_size();
                let extent = vk::Extent2D {
                    width: fb_width,
                    height: fb_height,
                };
                let frame_manager = FrameManager::new(Arc::clone(&ctx), extent, settings.vsync)
                    .map_err(RenderError::from)?;
                let viewport = Viewport::new(fb_width, fb_height);

                (
                    Some(window),
                    GraphicsContext::Vulkan(ctx),
                    Some(frame_manager),
                    viewport,
                )
            }
            other => {
                error!("backend {other:?} is not implemented");
                return Err(RenderError::UnsupportedBackend(other).into());
            }
        };

        Ok(Self {
            api,
            window,
            context,
            frame_manager,
            viewport,
            scene_manager: SceneManager::new(),
            meshes: MeshFactory::new(),
            shaders: ShaderFactory::new(SHADER_BASE_DIR),
            materials: MaterialFactory::new(),
            textures: TextureFactory::new(),
            shutdown_done: false,
        })
    }

    pub fn api(&self) -> GraphicsApiType {
        self.api
    }

    /// Headless engines run until told otherwise; windowed engines run until
    /// the window is closed.
    pub fn is_running(&self) -> bool {
        match &self.window {
            Some(window) => !window.should_close(),
            None => true,
        }
    }

    /// Pump window events. Framebuffer resizes update the shared viewport
    /// and schedule swapchain recreation.
    pub fn poll_events(&mut self) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        window.poll_events();

        let resize = window
            .flush_events()
            .filter_map(|(_, event)| match event {
                glfw::WindowEvent::FramebufferSize(w, h) => Some((w as u32, h as u32)),
                _ => None,
            })
            .last();

        if let Some((width, height)) = resize {
            debug!("framebuffer resized to {width}x{height}");
            self.viewport.set(width, height);
            if let Some(frame_manager) = self.frame_manager.as_mut() {
                frame_manager.note_resize(width, height);
            }
        }
    }

    pub fn update(&mut self, delta_time: f32) -> EngineResult<()> {
        self.scene_manager.update_active(delta_time)?;
        Ok(())
    }

    pub fn fixed_update(&mut self, fixed_delta: f32) -> EngineResult<()> {
        self.scene_manager.fixed_update_active(fixed_delta)?;
        Ok(())
    }

    /// Render one frame through the active scene. A frame boundary that had
    /// to recreate the swapchain is skipped without error.
    pub fn render(&mut self) -> EngineResult<()> {
        let Some(frame_manager) = self.frame_manager.as_mut() else {
            return Ok(());
        };

        let Some(mut frame) = frame_manager.begin_frame().map_err(RenderError::from)? else {
            return Ok(());
        };
        self.scene_manager.render_active(&mut frame)?;
        frame_manager.end_frame(frame).map_err(RenderError::from)?;
        Ok(())
    }

    /// Tear down in dependency order: scenes, then GPU resources, then the
    /// frame manager and device, then the window.
    pub fn shutdown(&mut self) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;
        info!("engine shutting down");

        self.scene_manager.shutdown_all();

        if let Some(frame_manager) = &self.frame_manager {
            if let Err(e) = frame_manager.wait_idle() {
                error!("wait idle during shutdown failed: {e}");
            }
        }
        self.materials.release_all();
        self.meshes.release_all();
        self.textures.release_all();
        self.shaders.release_all();

        self.frame_manager = None;
        self.context = GraphicsContext::Headless;
        self.window = None;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn scene_manager(&self) -> &SceneManager {
        &self.scene_manager
    }

    pub fn scene_manager_mut(&mut self) -> &mut SceneManager {
        &mut self.scene_manager
    }

    pub fn meshes(&self) -> &MeshFactory {
        &self.meshes
    }

    pub fn shaders(&self) -> &ShaderFactory {
        &self.shaders
    }

    pub fn materials(&self) -> &MaterialFactory {
        &self.materials
    }

    pub fn textures(&self) -> &TextureFactory {
        &self.textures
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_engine_runs_without_window_or_gpu() {
        let mut engine = Engine::initialize("noapi", &WindowSettings::default()).unwrap();
        assert_eq!(engine.api(), GraphicsApiType::NoApi);
        assert!(engine.is_running());
        engine.poll_events();
        engine.update(0.016).unwrap();
        engine.render().unwrap();
        engine.shutdown();
    }

    #[test]
    fn unknown_api_name_aborts_initialization() {
        let err = Engine::initialize("glide", &WindowSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Render(RenderError::UnknownApi(_))
        ));
    }

    #[test]
    fn recognized_but_unimplemented_backend_is_rejected() {
        let err = Engine::initialize("metal", &WindowSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Render(RenderError::UnsupportedBackend(GraphicsApiType::Metal))
        ));
    }

    #[test]
    fn headless_factories_reject_resource_creation() {
        let engine = Engine::initialize("noapi", &WindowSettings::default()).unwrap();
        let err = engine
            .meshes()
            .create(engine.context(), crate::render::mesh::MeshData::quad())
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBackend(_)));
    }
}
