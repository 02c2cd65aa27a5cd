//! Vulkan backend
//!
//! Low-level wrappers over ash. Ownership rule: the context owns instance,
//! device and everything created directly from them; per-resource GPU state
//! lives behind the factories and must be released before the context drops.

pub mod buffer;
pub mod context;
pub mod framebuffer;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use context::VulkanContext;
pub use renderer::{FrameContext, FrameManager};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};

use ash::vk;
use thiserror::Error;

/// How many frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Vulkan-specific error types
#[derive(Debug, Error)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Context or resource initialization failed
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for an allocation
    #[error("no suitable memory type found")]
    NoSuitableMemoryType,
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
