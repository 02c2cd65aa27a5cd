//! Mesh data and the mesh factory
//!
//! [`MeshData`] is plain CPU geometry; [`Mesh`] pairs it with optional GPU
//! buffers. The factory uploads synchronously and tracks every mesh it made
//! through weak references, so [`MeshFactory::release_all`] can strip GPU
//! buffers from live handles before the device is torn down.

use crate::render::vulkan::mesh::GpuMesh;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::{GraphicsContext, RenderError, RenderResult};
use bytemuck::{Pod, Zeroable};
use log::debug;
use std::sync::{Arc, Mutex, Weak};

/// Interleaved vertex: position then texture coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// CPU-side geometry, indexed triangle list with CCW front faces.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit quad in the XY plane, centered on the origin.
    pub fn quad() -> Self {
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [1.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self { vertices, indices }
    }

    /// Unit cube centered on the origin, four vertices per face so each face
    /// gets its own texture coordinates.
    pub fn cube() -> Self {
        // (face normal axis, four corners in CCW order seen from outside)
        let faces: [[[f32; 3]; 4]; 6] = [
            // +Z
            [
                [-0.5, -0.5, 0.5],
                [0.5, -0.5, 0.5],
                [0.5, 0.5, 0.5],
                [-0.5, 0.5, 0.5],
            ],
            // -Z
            [
                [0.5, -0.5, -0.5],
                [-0.5, -0.5, -0.5],
                [-0.5, 0.5, -0.5],
                [0.5, 0.5, -0.5],
            ],
            // +X
            [
                [0.5, -0.5, 0.5],
                [0.5, -0.5, -0.5],
                [0.5, 0.5, -0.5],
                [0.5, 0.5, 0.5],
            ],
            // -X
            [
                [-0.5, -0.5, -0.5],
                [-0.5, -0.5, 0.5],
                [-0.5, 0.5, 0.5],
                [-0.5, 0.5, -0.5],
            ],
            // +Y
            [
                [-0.5, 0.5, 0.5],
                [0.5, 0.5, 0.5],
                [0.5, 0.5, -0.5],
                [-0.5, 0.5, -0.5],
            ],
            // -Y
            [
                [-0.5, -0.5, -0.5],
                [0.5, -0.5, -0.5],
                [0.5, -0.5, 0.5],
                [-0.5, -0.5, 0.5],
            ],
        ];
        let uvs: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (face_index, corners) in faces.iter().enumerate() {
            let base = (face_index * 4) as u32;
            for (corner, uv) in corners.iter().zip(uvs.iter()) {
                vertices.push(Vertex::new(*corner, *uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self { vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex payload as raw bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index payload as raw bytes for buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// A mesh shared across render components.
pub struct Mesh {
    data: MeshData,
    gpu: Mutex<Option<GpuMesh>>,
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a mesh.
pub type MeshHandle = Arc<Mesh>;

impl Mesh {
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Whether GPU buffers are currently attached.
    pub fn is_uploaded(&self) -> bool {
        self.gpu.lock().expect("mesh gpu lock").is_some()
    }

    /// Bind vertex/index buffers and issue the indexed draw.
    pub fn record_draw(&self, frame: &FrameContext) -> RenderResult<()> {
        let guard = self.gpu.lock().expect("mesh gpu lock");
        let gpu = guard.as_ref().ok_or(RenderError::MeshNotUploaded)?;
        gpu.record_draw(frame);
        Ok(())
    }

    /// Drop the GPU side, keeping the CPU data.
    fn release_gpu(&self) {
        self.gpu.lock().expect("mesh gpu lock").take();
    }
}

/// Creates meshes and releases their GPU buffers in bulk.
pub struct MeshFactory {
    tracked: Mutex<Vec<Weak<Mesh>>>,
}

impl MeshFactory {
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Upload `data` and return a shared handle.
    ///
    /// Fails with `UnsupportedBackend` when the context has no GPU.
    pub fn create(&self, ctx: &GraphicsContext, data: MeshData) -> RenderResult<MeshHandle> {
        let vulkan = ctx.vulkan()?;
        let gpu = GpuMesh::upload(vulkan, &data)?;
        let mesh = Arc::new(Mesh {
            data,
            gpu: Mutex::new(Some(gpu)),
        });
        self.tracked
            .lock()
            .expect("mesh factory lock")
            .push(Arc::downgrade(&mesh));
        Ok(mesh)
    }

    /// Strip GPU buffers from every mesh still alive. Must run before the
    /// device is destroyed; later handle drops become no-ops on the GPU side.
    pub fn release_all(&self) {
        let mut tracked = self.tracked.lock().expect("mesh factory lock");
        let mut released = 0usize;
        for weak in tracked.iter() {
            if let Some(mesh) = weak.upgrade() {
                mesh.release_gpu();
                released += 1;
            }
        }
        tracked.clear();
        debug!("mesh factory released {released} meshes");
    }

    /// Number of tracked meshes still alive.
    pub fn live_count(&self) -> usize {
        self.tracked
            .lock()
            .expect("mesh factory lock")
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl Default for MeshFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_two_ccw_triangles() {
        let quad = MeshData::quad();
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(quad.index_count(), 6);

        // All corners sit in the XY plane.
        assert!(quad.vertices.iter().all(|v| v.position[2] == 0.0));
        assert_eq!(quad.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(quad.vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn cube_has_per_face_vertices() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);

        // Every corner is on the half-unit bound.
        for v in &cube.vertices {
            for c in v.position {
                assert_eq!(c.abs(), 0.5);
            }
        }
        // Indices stay within the vertex range.
        assert!(cube.indices.iter().all(|i| (*i as usize) < 24));
    }

    #[test]
    fn vertex_bytes_match_layout() {
        let quad = MeshData::quad();
        assert_eq!(
            quad.vertex_bytes().len(),
            quad.vertices.len() * std::mem::size_of::<Vertex>()
        );
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(quad.index_bytes().len(), 6 * 4);
    }

    #[test]
    fn headless_context_cannot_create_meshes() {
        let factory = MeshFactory::new();
        let err = factory
            .create(&GraphicsContext::Headless, MeshData::quad())
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedBackend(_)));
        assert_eq!(factory.live_count(), 0);
    }
}
