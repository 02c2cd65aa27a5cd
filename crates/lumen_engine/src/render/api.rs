//! Graphics API selection and shared context
//!
//! The backend is chosen once at engine initialization and carried as a
//! closed enum; factories match on it instead of dispatching through a
//! trait object, so unsupported combinations surface as typed errors.

use crate::render::vulkan::context::VulkanContext;
use crate::render::{RenderError, RenderResult};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// The graphics APIs an application can name.
///
/// Only `Vulkan` is implemented; `NoApi` runs the engine headless. The
/// remaining names parse so configuration files stay portable, but selecting
/// them fails with [`RenderError::UnsupportedBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsApiType {
    NoApi,
    Vulkan,
    OpenGl,
    DirectX,
    Metal,
}

impl GraphicsApiType {
    /// Parse a case-insensitive API name.
    pub fn from_name(name: &str) -> RenderResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "noapi" => Ok(Self::NoApi),
            "vulkan" => Ok(Self::Vulkan),
            "opengl" => Ok(Self::OpenGl),
            "directx" => Ok(Self::DirectX),
            "metal" => Ok(Self::Metal),
            other => Err(RenderError::UnknownApi(other.to_owned())),
        }
    }

    /// The directory name used when resolving shader byte code.
    pub fn shader_dir(&self) -> &'static str {
        match self {
            Self::NoApi => "noapi",
            Self::Vulkan => "vulkan",
            Self::OpenGl => "opengl",
            Self::DirectX => "directx",
            Self::Metal => "metal",
        }
    }
}

/// The live backend, shared by the frame manager and every factory.
pub enum GraphicsContext {
    /// No GPU at all. Factory calls fail with `UnsupportedBackend`.
    Headless,
    Vulkan(Arc<VulkanContext>),
}

impl GraphicsContext {
    pub fn api(&self) -> GraphicsApiType {
        match self {
            Self::Headless => GraphicsApiType::NoApi,
            Self::Vulkan(_) => GraphicsApiType::Vulkan,
        }
    }

    /// The Vulkan context, or `UnsupportedBackend` for anything else.
    pub fn vulkan(&self) -> RenderResult<&Arc<VulkanContext>> {
        match self {
            Self::Vulkan(ctx) => Ok(ctx),
            other => Err(RenderError::UnsupportedBackend(other.api())),
        }
    }
}

/// Shared framebuffer size, written by the engine on resize events and read
/// by the camera system. Single-threaded by design.
#[derive(Clone)]
pub struct Viewport {
    size: Rc<Cell<(u32, u32)>>,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
        }
    }

    pub fn set(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    /// Width over height, or 1.0 while the framebuffer is zero-height
    /// (minimized window).
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.size.get();
        if h > 0 {
            w as f32 / h as f32
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_names_parse_case_insensitively() {
        assert_eq!(GraphicsApiType::from_name("Vulkan").unwrap(), GraphicsApiType::Vulkan);
        assert_eq!(GraphicsApiType::from_name("VULKAN").unwrap(), GraphicsApiType::Vulkan);
        assert_eq!(GraphicsApiType::from_name("noapi").unwrap(), GraphicsApiType::NoApi);
        assert_eq!(GraphicsApiType::from_name("OpenGL").unwrap(), GraphicsApiType::OpenGl);
        assert_eq!(GraphicsApiType::from_name("directx").unwrap(), GraphicsApiType::DirectX);
        assert_eq!(GraphicsApiType::from_name("Metal").unwrap(), GraphicsApiType::Metal);
    }

    #[test]
    fn unknown_api_name_is_a_typed_error() {
        let err = GraphicsApiType::from_name("glide").unwrap_err();
        assert!(matches!(err, RenderError::UnknownApi(name) if name == "glide"));
    }

    #[test]
    fn headless_context_rejects_vulkan_access() {
        let ctx = GraphicsContext::Headless;
        assert_eq!(ctx.api(), GraphicsApiType::NoApi);
        let err = ctx.vulkan().unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnsupportedBackend(GraphicsApiType::NoApi)
        ));
    }

    #[test]
    fn viewport_is_shared_between_clones() {
        let viewport = Viewport::new(800, 600);
        let clone = viewport.clone();
        clone.set(1024, 512);

        assert_eq!(viewport.size(), (1024, 512));
        assert_eq!(viewport.aspect_ratio(), 2.0);
    }

    #[test]
    fn zero_height_aspect_is_one() {
        let viewport = Viewport::new(640, 0);
        assert_eq!(viewport.aspect_ratio(), 1.0);
    }
}
