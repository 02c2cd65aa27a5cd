//! Textures and the texture factory

use crate::render::image::Image;
use crate::render::vulkan::texture::GpuTexture;
use crate::render::{GraphicsContext, RenderError, RenderResult};
use log::debug;
use std::sync::{Arc, Mutex, Weak};

/// A sampled GPU texture.
pub struct Texture {
    width: u32,
    height: u32,
    gpu: Mutex<Option<GpuTexture>>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a texture.
pub type TextureHandle = Arc<Texture>;

impl Texture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.lock().expect("texture gpu lock").is_some()
    }

    pub(crate) fn with_gpu<R>(&self, f: impl FnOnce(&GpuTexture) -> R) -> Option<R> {
        self.gpu.lock().expect("texture gpu lock").as_ref().map(f)
    }

    fn release_gpu(&self) {
        self.gpu.lock().expect("texture gpu lock").take();
    }
}

/// Uploads images and releases the GPU side in bulk.
pub struct TextureFactory {
    tracked: Mutex<Vec<Weak<Texture>>>,
}

impl TextureFactory {
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Upload `image` through a staging buffer and return a shared handle.
    pub fn create(&self, ctx: &GraphicsContext, image: &Image) -> RenderResult<TextureHandle> {
        let vulkan = ctx.vulkan()?;
        let gpu = GpuTexture::upload(vulkan, image)?;
        let texture = Arc::new(Texture {
            width: image.width(),
            height: image.height(),
            gpu: Mutex::new(Some(gpu)),
        });
        self.tracked
            .lock()
            .expect("texture factory lock")
            .push(Arc::downgrade(&texture));
        debug!("created {}x{} texture", image.width(), image.height());
        Ok(texture)
    }

    /// Load an image file and upload it.
    pub fn create_from_file(
        &self,
        ctx: &GraphicsContext,
        path: impl AsRef<std::path::Path>,
    ) -> RenderResult<TextureHandle> {
        let image = Image::from_file(path)?;
        self.create(ctx, &image)
    }

    /// Drop GPU objects from every live texture. Runs before device teardown.
    pub fn release_all(&self) {
        let mut tracked = self.tracked.lock().expect("texture factory lock");
        let mut released = 0usize;
        for weak in tracked.iter() {
            if let Some(texture) = weak.upgrade() {
                texture.release_gpu();
                released += 1;
            }
        }
        tracked.clear();
        debug!("texture factory released {released} textures");
    }
}

impl Default for TextureFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_context_cannot_create_textures() {
        let factory = TextureFactory::new();
        let err = factory
            .create(&GraphicsContext::Headless, &Image::white())
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBackend(_)));
    }
}
