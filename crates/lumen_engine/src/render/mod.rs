//! Rendering layer
//!
//! Backend-agnostic resource types and factories on top, the Vulkan
//! implementation underneath. Factories hand out shared handles and keep
//! weak references so every GPU resource can be released in one sweep
//! before the device goes down.

pub mod api;
pub mod image;
pub mod material;
pub mod mesh;
pub mod shader;
pub mod texture;
pub mod vulkan;

pub use api::{GraphicsApiType, GraphicsContext, Viewport};
pub use image::Image;
pub use material::{Material, MaterialFactory, MaterialHandle};
pub use mesh::{Mesh, MeshData, MeshFactory, MeshHandle, Vertex};
pub use shader::{Shader, ShaderFactory, ShaderHandle, ShaderStage};
pub use texture::{Texture, TextureFactory, TextureHandle};
pub use vulkan::renderer::{FrameContext, FrameManager};

use thiserror::Error;

/// Errors from resource creation and frame recording
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("operation is not supported by the {0:?} backend")]
    UnsupportedBackend(GraphicsApiType),

    #[error("unknown graphics API name '{0}'")]
    UnknownApi(String),

    #[error("shader binding '{name}' not found")]
    BindingNotFound { name: String },

    #[error("mesh has no GPU buffers (released or never uploaded)")]
    MeshNotUploaded,

    #[error("{0} has been released and no longer owns GPU objects")]
    ResourceReleased(&'static str),

    #[error("image is invalid: {0}")]
    InvalidImage(String),

    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Vulkan(#[from] vulkan::VulkanError),
}

/// Result alias for render operations
pub type RenderResult<T> = Result<T, RenderError>;
