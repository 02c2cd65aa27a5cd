//! Component trait

/// Marker trait for components
pub trait Component: 'static {}

impl Component for crate::ecs::components::Transform {}
impl Component for crate::ecs::components::Hierarchy {}
impl Component for crate::ecs::components::Camera {}
impl Component for crate::ecs::components::MeshRenderer {}
impl Component for crate::ecs::components::MaterialRef {}
