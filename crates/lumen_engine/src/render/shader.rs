//! Shaders and the shader factory
//!
//! Byte code is resolved on disk as `<base>/<shader name>/<backend>/<stage>.spv`.
//! Every shader exposes the same uniform block: `model`, `view` and
//! `projection` matrices at fixed offsets, staged CPU-side by name and
//! flushed into the bound frame's uniform buffer when a material binds.

use crate::foundation::math::Mat4;
use crate::render::vulkan::shader::GpuShader;
use crate::render::{GraphicsApiType, GraphicsContext, RenderError, RenderResult};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex.spv",
            Self::Fragment => "fragment.spv",
        }
    }
}

/// Size of the per-object uniform block in bytes.
pub const UNIFORM_BLOCK_SIZE: usize = 3 * 64;

fn standard_uniform_offsets() -> HashMap<String, usize> {
    HashMap::from([
        ("model".to_owned(), 0),
        ("view".to_owned(), 64),
        ("projection".to_owned(), 128),
    ])
}

/// Resolve the on-disk path of one stage's byte code.
pub fn shader_path(
    base_dir: &Path,
    shader_name: &str,
    api: GraphicsApiType,
    stage: ShaderStage,
) -> PathBuf {
    base_dir
        .join(shader_name)
        .join(api.shader_dir())
        .join(stage.file_name())
}

/// A compiled shader with its staged uniform block.
pub struct Shader {
    name: String,
    offsets: HashMap<String, usize>,
    staging: Mutex<[u8; UNIFORM_BLOCK_SIZE]>,
    gpu: Mutex<Option<GpuShader>>,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a shader.
pub type ShaderHandle = Arc<Shader>;

impl Shader {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage a 4x4 matrix uniform by name. Unknown names are a typed error.
    pub fn set_uniform_mat4(&self, name: &str, value: &Mat4) -> RenderResult<()> {
        let offset = *self
            .offsets
            .get(name)
            .ok_or_else(|| RenderError::BindingNotFound {
                name: name.to_owned(),
            })?;
        let bytes: &[u8] = bytemuck::cast_slice(value.as_slice());
        let mut staging = self.staging.lock().expect("shader staging lock");
        staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy the staged block into the frame's uniform buffer.
    pub(crate) fn flush(&self, frame_index: usize) -> RenderResult<()> {
        let staging = self.staging.lock().expect("shader staging lock");
        let guard = self.gpu.lock().expect("shader gpu lock");
        if let Some(gpu) = guard.as_ref() {
            gpu.write_uniforms(frame_index, &staging[..]);
        }
        Ok(())
    }

    pub(crate) fn with_gpu<R>(&self, f: impl FnOnce(&GpuShader) -> R) -> Option<R> {
        self.gpu.lock().expect("shader gpu lock").as_ref().map(f)
    }

    fn release_gpu(&self) {
        self.gpu.lock().expect("shader gpu lock").take();
    }

    #[cfg(test)]
    pub(crate) fn staged_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.staging.lock().expect("shader staging lock")[offset..offset + len].to_vec()
    }

    #[cfg(test)]
    pub(crate) fn new_for_tests(name: &str) -> ShaderHandle {
        Arc::new(Self {
            name: name.to_owned(),
            offsets: standard_uniform_offsets(),
            staging: Mutex::new([0u8; UNIFORM_BLOCK_SIZE]),
            gpu: Mutex::new(None),
        })
    }
}

/// Loads shader byte code and owns the bulk-release sweep.
pub struct ShaderFactory {
    base_dir: PathBuf,
    tracked: Mutex<Vec<Weak<Shader>>>,
}

impl ShaderFactory {
    /// `base_dir` is the root the per-shader directories live under.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Load `<name>`'s vertex and fragment stages and build the GPU pipeline
    /// inputs (modules, descriptor sets, per-frame uniform buffers).
    pub fn create(&self, ctx: &GraphicsContext, name: &str) -> RenderResult<ShaderHandle> {
        let vulkan = ctx.vulkan()?;
        let api = ctx.api();

        let vertex_code = read_spv(&shader_path(&self.base_dir, name, api, ShaderStage::Vertex))?;
        let fragment_code =
            read_spv(&shader_path(&self.base_dir, name, api, ShaderStage::Fragment))?;

        let gpu = GpuShader::new(vulkan, &vertex_code, &fragment_code)?;
        let shader = Arc::new(Shader {
            name: name.to_owned(),
            offsets: standard_uniform_offsets(),
            staging: Mutex::new([0u8; UNIFORM_BLOCK_SIZE]),
            gpu: Mutex::new(Some(gpu)),
        });
        self.tracked
            .lock()
            .expect("shader factory lock")
            .push(Arc::downgrade(&shader));
        debug!("created shader '{name}'");
        Ok(shader)
    }

    /// Drop GPU objects from every live shader. Runs before device teardown.
    pub fn release_all(&self) {
        let mut tracked = self.tracked.lock().expect("shader factory lock");
        let mut released = 0usize;
        for weak in tracked.iter() {
            if let Some(shader) = weak.upgrade() {
                shader.release_gpu();
                released += 1;
            }
        }
        tracked.clear();
        debug!("shader factory released {released} shaders");
    }
}

fn read_spv(path: &Path) -> RenderResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| RenderError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_paths_follow_name_backend_stage() {
        let path = shader_path(
            Path::new("shaders"),
            "unlit",
            GraphicsApiType::Vulkan,
            ShaderStage::Vertex,
        );
        assert_eq!(path, Path::new("shaders/unlit/vulkan/vertex.spv"));

        let frag = shader_path(
            Path::new("assets/shaders"),
            "unlit",
            GraphicsApiType::OpenGl,
            ShaderStage::Fragment,
        );
        assert_eq!(frag, Path::new("assets/shaders/unlit/opengl/fragment.spv"));
    }

    #[test]
    fn staging_known_uniforms_lands_at_fixed_offsets() {
        let shader = Shader::new_for_tests("unlit");
        let model = Mat4::identity() * 2.0;
        let projection = Mat4::identity() * 3.0;

        shader.set_uniform_mat4("model", &model).unwrap();
        shader.set_uniform_mat4("projection", &projection).unwrap();

        let expected_model: &[u8] = bytemuck::cast_slice(model.as_slice());
        let expected_proj: &[u8] = bytemuck::cast_slice(projection.as_slice());
        assert_eq!(shader.staged_bytes(0, 64), expected_model);
        assert_eq!(shader.staged_bytes(128, 64), expected_proj);
        // The view slot stays zeroed until staged.
        assert_eq!(shader.staged_bytes(64, 64), vec![0u8; 64]);
    }

    #[test]
    fn unknown_uniform_name_is_binding_not_found() {
        let shader = Shader::new_for_tests("unlit");
        let err = shader
            .set_uniform_mat4("light_direction", &Mat4::identity())
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::BindingNotFound { name } if name == "light_direction"
        ));
    }

    #[test]
    fn headless_context_cannot_create_shaders() {
        let factory = ShaderFactory::new("shaders");
        let err = factory
            .create(&GraphicsContext::Headless, "unlit")
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBackend(_)));
    }
}
