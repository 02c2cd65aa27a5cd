//! Mesh renderer components

use crate::render::material::MaterialHandle;
use crate::render::mesh::MeshHandle;

/// Component for entities drawn as a mesh.
#[derive(Clone)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    pub visible: bool,
}

impl MeshRenderer {
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            visible: true,
        }
    }

    pub fn should_render(&self) -> bool {
        self.visible
    }
}

/// Material used when drawing the entity's mesh.
#[derive(Clone)]
pub struct MaterialRef {
    pub material: MaterialHandle,
}

impl MaterialRef {
    pub fn new(material: MaterialHandle) -> Self {
        Self { material }
    }
}
