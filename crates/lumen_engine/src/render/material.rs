//! Materials and the material factory
//!
//! A material is a shader plus the graphics pipeline built for it. Binding a
//! material flushes the shader's staged uniforms into the current frame's
//! uniform buffer, then binds the pipeline and descriptor set.

use crate::render::shader::ShaderHandle;
use crate::render::texture::TextureHandle;
use crate::render::vulkan::material::GpuMaterial;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::{GraphicsContext, RenderError, RenderResult};
use log::debug;
use std::sync::{Arc, Mutex, Weak};

/// A shader with its pipeline state.
pub struct Material {
    shader: ShaderHandle,
    /// Keeps the bound albedo texture alive while descriptors reference it.
    albedo: Mutex<Option<TextureHandle>>,
    gpu: Mutex<Option<GpuMaterial>>,
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material").finish_non_exhaustive()
    }
}

/// Shared handle to a material.
pub type MaterialHandle = Arc<Material>;

impl Material {
    pub fn shader(&self) -> &ShaderHandle {
        &self.shader
    }

    /// Flush uniforms and bind pipeline + descriptors for this frame.
    pub fn bind(&self, frame: &FrameContext) -> RenderResult<()> {
        self.shader.flush(frame.frame_index())?;

        let guard = self.gpu.lock().expect("material gpu lock");
        let gpu = guard
            .as_ref()
            .ok_or(RenderError::ResourceReleased("material"))?;

        self.shader
            .with_gpu(|shader_gpu| gpu.record_bind(frame, shader_gpu))
            .ok_or(RenderError::ResourceReleased("shader"))?;
        Ok(())
    }

    /// Point the sampler binding at `texture` for all frames in flight.
    ///
    /// The device must be idle or the descriptor unused by in-flight frames.
    pub fn set_albedo_texture(&self, texture: TextureHandle) -> RenderResult<()> {
        self.shader
            .with_gpu(|shader_gpu| texture.with_gpu(|tex_gpu| shader_gpu.bind_texture(tex_gpu)))
            .flatten()
            .ok_or(RenderError::ResourceReleased("shader or texture"))?;
        *self.albedo.lock().expect("material albedo lock") = Some(texture);
        Ok(())
    }

    fn release_gpu(&self) {
        self.gpu.lock().expect("material gpu lock").take();
        self.albedo.lock().expect("material albedo lock").take();
    }
}

/// Builds pipelines for shaders and releases them in bulk.
pub struct MaterialFactory {
    tracked: Mutex<Vec<Weak<Material>>>,
}

impl MaterialFactory {
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Build the graphics pipeline for `shader` and return a shared handle.
    pub fn create(&self, ctx: &GraphicsContext, shader: ShaderHandle) -> RenderResult<MaterialHandle> {
        let vulkan = ctx.vulkan()?;
        let gpu = shader
            .with_gpu(|shader_gpu| GpuMaterial::new(vulkan, shader_gpu))
            .ok_or(RenderError::ResourceReleased("shader"))??;

        let material = Arc::new(Material {
            shader,
            albedo: Mutex::new(None),
            gpu: Mutex::new(Some(gpu)),
        });
        self.tracked
            .lock()
            .expect("material factory lock")
            .push(Arc::downgrade(&material));
        debug!("created material for shader '{}'", material.shader.name());
        Ok(material)
    }

    /// Drop pipelines from every live material. Runs before device teardown.
    pub fn release_all(&self) {
        let mut tracked = self.tracked.lock().expect("material factory lock");
        let mut released = 0usize;
        for weak in tracked.iter() {
            if let Some(material) = weak.upgrade() {
                material.release_gpu();
                released += 1;
            }
        }
        tracked.clear();
        debug!("material factory released {released} materials");
    }
}

impl Default for MaterialFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::Shader;

    #[test]
    fn headless_context_cannot_create_materials() {
        let factory = MaterialFactory::new();
        let shader = Shader::new_for_tests("unlit");
        let err = factory
            .create(&GraphicsContext::Headless, shader)
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBackend(_)));
    }

    #[test]
    fn material_exposes_its_shader() {
        let shader = Shader::new_for_tests("unlit");
        let material = Material {
            shader: shader.clone(),
            albedo: Mutex::new(None),
            gpu: Mutex::new(None),
        };
        assert_eq!(material.shader().name(), "unlit");
        assert!(Arc::ptr_eq(material.shader(), &shader));
    }
}
