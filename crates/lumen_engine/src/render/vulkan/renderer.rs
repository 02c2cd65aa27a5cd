//! Frame lifecycle manager
//!
//! Owns the swapchain, depth buffer, framebuffers, per-frame command
//! buffers and synchronization. `begin_frame` may return `None` when the
//! swapchain had to be recreated or the window is minimized; the caller
//! skips rendering for that frame and tries again next loop.

use crate::foundation::resource::ManagedResource;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::framebuffer::{DepthBuffer, Framebuffers};
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::{VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT};
use ash::{vk, Device};
use log::{debug, warn};
use std::sync::Arc;

/// Everything a system needs to record draw commands for one frame.
pub struct FrameContext {
    device: Device,
    command_buffer: vk::CommandBuffer,
    frame_index: usize,
    image_index: u32,
    extent: vk::Extent2D,
}

impl FrameContext {
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Which of the frames in flight this is; indexes per-frame resources
    /// like uniform buffers and descriptor sets.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

/// Drives acquisition, submission and presentation.
pub struct FrameManager {
    ctx: Arc<VulkanContext>,
    swapchain: Swapchain,
    depth: DepthBuffer,
    framebuffers: Framebuffers,
    command_pool: ManagedResource<vk::CommandPool>,
    command_buffers: Vec<vk::CommandBuffer>,
    frames: Vec<FrameSync>,
    /// Fence of the frame last rendered into each swapchain image.
    images_in_flight: Vec<vk::Fence>,
    current_frame: usize,
    window_extent: vk::Extent2D,
    vsync: bool,
    recreate_pending: bool,
}

impl FrameManager {
    pub fn new(
        ctx: Arc<VulkanContext>,
        window_extent: vk::Extent2D,
        vsync: bool,
    ) -> VulkanResult<Self> {
        let swapchain = Swapchain::new(&ctx, window_extent, vsync, vk::SwapchainKHR::null())?;
        let depth = DepthBuffer::new(&ctx, swapchain.extent())?;
        let framebuffers = Framebuffers::new(&ctx, &swapchain, &depth)?;

        let device = ctx.device().clone();
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(ctx.physical().graphics_family);
        let raw_pool = unsafe {
            device
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };
        let command_pool = {
            let device = device.clone();
            ManagedResource::new(raw_pool, vk::CommandPool::null(), move |p| unsafe {
                device.destroy_command_pool(p, None)
            })
        };

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool.get())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
        let command_buffers = unsafe {
            device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        let mut frames = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            frames.push(FrameSync::new(device.clone())?);
        }
        let images_in_flight = vec![vk::Fence::null(); swapchain.image_count()];

        Ok(Self {
            ctx,
            swapchain,
            depth,
            framebuffers,
            command_pool,
            command_buffers,
            frames,
            images_in_flight,
            current_frame: 0,
            window_extent,
            vsync,
            recreate_pending: false,
        })
    }

    /// The engine reports framebuffer resizes here; the swapchain is
    /// rebuilt at the next frame boundary.
    pub fn note_resize(&mut self, width: u32, height: u32) {
        self.window_extent = vk::Extent2D { width, height };
        self.recreate_pending = true;
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Start a frame: wait for this frame's previous work, acquire an
    /// image, and open the command buffer + render pass.
    ///
    /// Returns `Ok(None)` when no image could be acquired this loop (the
    /// swapchain was just recreated, or the window has zero area).
    pub fn begin_frame(&mut self) -> VulkanResult<Option<FrameContext>> {
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(None);
        }
        if self.recreate_pending {
            self.recreate_swapchain()?;
            self.recreate_pending = false;
            return Ok(None);
        }

        let sync = &self.frames[self.current_frame];
        sync.in_flight.wait(u64::MAX)?;

        let image_index = match self
            .swapchain
            .acquire_next_image(sync.image_available.handle())
        {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    self.recreate_pending = true;
                }
                index
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                debug!("swapchain out of date on acquire, recreating");
                self.recreate_swapchain()?;
                return Ok(None);
            }
            Err(e) => return Err(VulkanError::Api(e)),
        };

        // A previous frame may still be rendering into this image.
        let image_fence = self.images_in_flight[image_index as usize];
        if image_fence != vk::Fence::null() {
            unsafe {
                self.ctx
                    .device()
                    .wait_for_fences(&[image_fence], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }
        let sync = &self.frames[self.current_frame];
        self.images_in_flight[image_index as usize] = sync.in_flight.handle();

        sync.in_flight.reset()?;

        let device = self.ctx.device();
        let cmd = self.command_buffers[self.current_frame];
        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            let begin_info = vk::CommandBufferBeginInfo::builder();
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        let extent = self.swapchain.extent();
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.05, 0.05, 0.08, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let render_pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.ctx.render_pass())
            .framebuffer(self.framebuffers.get(image_index))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            device.cmd_set_scissor(cmd, 0, &[scissor]);
        }

        Ok(Some(FrameContext {
            device: device.clone(),
            command_buffer: cmd,
            frame_index: self.current_frame,
            image_index,
            extent,
        }))
    }

    /// Close the frame: end the render pass, submit, present, advance.
    pub fn end_frame(&mut self, frame: FrameContext) -> VulkanResult<()> {
        let device = self.ctx.device();
        let cmd = frame.command_buffer;
        unsafe {
            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).map_err(VulkanError::Api)?;
        }

        let sync = &self.frames[self.current_frame];
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [cmd];
        let submit = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();
        unsafe {
            device
                .queue_submit(self.ctx.graphics_queue(), &[submit], sync.in_flight.handle())
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [frame.image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let present_result = unsafe {
            self.ctx
                .swapchain_loader()
                .queue_present(self.ctx.present_queue(), &present_info)
        };
        match present_result {
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                warn!("swapchain stale after present, recreating");
                self.recreate_swapchain()?;
                // A resize flagged in the same frame is satisfied by this
                // rebuild; keeping the flag would recreate twice.
                self.recreate_pending = false;
            }
            Ok(false) => {
                if self.recreate_pending {
                    self.recreate_swapchain()?;
                    self.recreate_pending = false;
                }
            }
            Err(e) => return Err(VulkanError::Api(e)),
        }

        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
        Ok(())
    }

    /// Rebuild swapchain, depth buffer and framebuffers for the current
    /// window extent. Pipelines stay valid: the render pass is unchanged.
    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            // Minimized; nothing to rebuild until a real size arrives.
            return Ok(());
        }
        self.ctx.wait_idle()?;

        let new_swapchain = Swapchain::new(
            &self.ctx,
            self.window_extent,
            self.vsync,
            self.swapchain.handle(),
        )?;
        self.swapchain = new_swapchain;
        self.depth = DepthBuffer::new(&self.ctx, self.swapchain.extent())?;
        self.framebuffers = Framebuffers::new(&self.ctx, &self.swapchain, &self.depth)?;
        self.images_in_flight = vec![vk::Fence::null(); self.swapchain.image_count()];

        debug!(
            "swapchain recreated at {}x{}",
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );
        Ok(())
    }

    /// Block until the GPU is idle. Called before factory release sweeps.
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.ctx.wait_idle()
    }
}

impl Drop for FrameManager {
    fn drop(&mut self) {
        let _ = self.ctx.wait_idle();
    }
}
