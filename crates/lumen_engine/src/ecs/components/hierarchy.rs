//! Hierarchy component
//!
//! Parent/children links for transform propagation. Links are plain entity
//! ids; nothing here keeps them alive or consistent, the transform system
//! validates the graph when it walks it.

use crate::ecs::Entity;

/// Scene-graph links for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    /// `None` for roots.
    pub parent: Option<Entity>,
    pub children: Vec<Entity>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node already attached under `parent`.
    pub fn with_parent(parent: Entity) -> Self {
        Self {
            parent: Some(parent),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
