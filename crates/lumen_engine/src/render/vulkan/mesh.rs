//! GPU side of a mesh: device-local vertex and index buffers

use crate::render::mesh::MeshData;
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::vulkan::VulkanResult;
use ash::vk;

pub struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl GpuMesh {
    /// Synchronous upload through staging buffers.
    pub fn upload(ctx: &VulkanContext, data: &MeshData) -> VulkanResult<Self> {
        let vertex_buffer = Buffer::device_local_with_data(
            ctx,
            data.vertex_bytes(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            ctx,
            data.index_bytes(),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: data.index_count(),
        })
    }

    /// Bind both buffers and issue the indexed draw.
    pub fn record_draw(&self, frame: &FrameContext) {
        let device = frame.device();
        let cmd = frame.command_buffer();
        unsafe {
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.handle()], &[0]);
            device.cmd_bind_index_buffer(
                cmd,
                self.index_buffer.handle(),
                0,
                vk::IndexType::UINT32,
            );
            device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
