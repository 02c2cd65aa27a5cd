//! GPU side of a material: pipeline layout and graphics pipeline

use crate::foundation::resource::ManagedResource;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::pipeline;
use crate::render::vulkan::renderer::FrameContext;
use crate::render::vulkan::shader::GpuShader;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::vk;

pub struct GpuMaterial {
    pipeline: ManagedResource<vk::Pipeline>,
    pipeline_layout: ManagedResource<vk::PipelineLayout>,
}

impl GpuMaterial {
    pub fn new(ctx: &VulkanContext, shader: &GpuShader) -> VulkanResult<Self> {
        let device = ctx.device().clone();

        let set_layouts = [shader.set_layout()];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let raw_layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };
        let pipeline_layout = {
            let device = device.clone();
            ManagedResource::new(raw_layout, vk::PipelineLayout::null(), move |l| unsafe {
                device.destroy_pipeline_layout(l, None)
            })
        };

        let raw_pipeline = pipeline::create_graphics_pipeline(ctx, shader, pipeline_layout.get())?;
        let pipeline = ManagedResource::new(raw_pipeline, vk::Pipeline::null(), move |p| unsafe {
            device.destroy_pipeline(p, None)
        });

        Ok(Self {
            pipeline,
            pipeline_layout,
        })
    }

    /// Bind the pipeline and this frame's descriptor set.
    pub fn record_bind(&self, frame: &FrameContext, shader: &GpuShader) {
        let device = frame.device();
        let cmd = frame.command_buffer();
        unsafe {
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.get());
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout.get(),
                0,
                &[shader.descriptor_set(frame.frame_index())],
                &[],
            );
        }
    }
}
