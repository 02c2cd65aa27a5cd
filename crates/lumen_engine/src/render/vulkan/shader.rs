//! GPU side of a shader: modules, descriptor sets and per-frame uniforms
//!
//! Every shader uses the same descriptor interface: binding 0 is the
//! uniform block (vertex stage), binding 1 a combined image sampler
//! (fragment stage). A 1x1 white texture is bound by default so a shader
//! is drawable before any texture is assigned.

use crate::foundation::resource::ManagedResource;
use crate::render::image::Image;
use crate::render::shader::UNIFORM_BLOCK_SIZE;
use crate::render::vulkan::buffer::MappedBuffer;
use crate::render::vulkan::context::VulkanContext;
use crate::render::vulkan::texture::GpuTexture;
use crate::render::vulkan::{VulkanError, VulkanResult, MAX_FRAMES_IN_FLIGHT};
use ash::{vk, Device};
use std::io::Cursor;

pub struct GpuShader {
    device: Device,
    vertex_module: ManagedResource<vk::ShaderModule>,
    fragment_module: ManagedResource<vk::ShaderModule>,
    set_layout: ManagedResource<vk::DescriptorSetLayout>,
    descriptor_pool: ManagedResource<vk::DescriptorPool>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    uniform_buffers: Vec<MappedBuffer>,
    // Keeps the white fallback alive while descriptors may reference it.
    _default_texture: GpuTexture,
}

impl GpuShader {
    pub fn new(
        ctx: &VulkanContext,
        vertex_code: &[u8],
        fragment_code: &[u8],
    ) -> VulkanResult<Self> {
        let device = ctx.device().clone();

        let vertex_module = Self::create_module(&device, vertex_code)?;
        let fragment_module = Self::create_module(&device, fragment_code)?;

        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let raw_layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };
        let set_layout = {
            let device = device.clone();
            ManagedResource::new(raw_layout, vk::DescriptorSetLayout::null(), move |l| unsafe {
                device.destroy_descriptor_set_layout(l, None)
            })
        };

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: MAX_FRAMES_IN_FLIGHT as u32,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: MAX_FRAMES_IN_FLIGHT as u32,
            },
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(MAX_FRAMES_IN_FLIGHT as u32);
        let raw_pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };
        let descriptor_pool = {
            let device = device.clone();
            ManagedResource::new(raw_pool, vk::DescriptorPool::null(), move |p| unsafe {
                device.destroy_descriptor_pool(p, None)
            })
        };

        let layouts = vec![set_layout.get(); MAX_FRAMES_IN_FLIGHT];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool.get())
            .set_layouts(&layouts);
        let descriptor_sets = unsafe {
            device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        let mut uniform_buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            uniform_buffers.push(MappedBuffer::new(ctx, UNIFORM_BLOCK_SIZE as vk::DeviceSize)?);
        }

        let default_texture = GpuTexture::upload(ctx, &Image::white())?;

        let shader = Self {
            device,
            vertex_module,
            fragment_module,
            set_layout,
            descriptor_pool,
            descriptor_sets,
            uniform_buffers,
            _default_texture: default_texture,
        };
        shader.write_initial_descriptors();
        Ok(shader)
    }

    fn create_module(
        device: &Device,
        code: &[u8],
    ) -> VulkanResult<ManagedResource<vk::ShaderModule>> {
        let words = ash::util::read_spv(&mut Cursor::new(code)).map_err(|e| {
            VulkanError::InitializationFailed(format!("invalid SPIR-V: {e}"))
        })?;
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&words);
        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        let device = device.clone();
        Ok(ManagedResource::new(
            module,
            vk::ShaderModule::null(),
            move |m| unsafe { device.destroy_shader_module(m, None) },
        ))
    }

    fn write_initial_descriptors(&self) {
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            let buffer_info = [vk::DescriptorBufferInfo {
                buffer: self.uniform_buffers[frame].handle(),
                offset: 0,
                range: UNIFORM_BLOCK_SIZE as vk::DeviceSize,
            }];
            let image_info = [vk::DescriptorImageInfo {
                sampler: self._default_texture.sampler(),
                image_view: self._default_texture.view(),
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let writes = [
                vk::WriteDescriptorSet::builder()
                    .dst_set(self.descriptor_sets[frame])
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_info)
                    .build(),
                vk::WriteDescriptorSet::builder()
                    .dst_set(self.descriptor_sets[frame])
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_info)
                    .build(),
            ];
            unsafe { self.device.update_descriptor_sets(&writes, &[]) };
        }
    }

    /// Copy the staged uniform block into one frame's buffer.
    pub fn write_uniforms(&self, frame_index: usize, bytes: &[u8]) {
        self.uniform_buffers[frame_index].write(bytes);
    }

    /// Point the sampler binding of every frame's set at `texture`.
    ///
    /// Descriptors must not be in use by in-flight frames when this runs.
    pub fn bind_texture(&self, texture: &GpuTexture) {
        for frame in 0..MAX_FRAMES_IN_FLIGHT {
            let image_info = [vk::DescriptorImageInfo {
                sampler: texture.sampler(),
                image_view: texture.view(),
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let write = [vk::WriteDescriptorSet::builder()
                .dst_set(self.descriptor_sets[frame])
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)
                .build()];
            unsafe { self.device.update_descriptor_sets(&write, &[]) };
        }
    }

    pub fn vertex_module(&self) -> vk::ShaderModule {
        self.vertex_module.get()
    }

    pub fn fragment_module(&self) -> vk::ShaderModule {
        self.fragment_module.get()
    }

    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.set_layout.get()
    }

    pub fn descriptor_set(&self, frame_index: usize) -> vk::DescriptorSet {
        self.descriptor_sets[frame_index]
    }
}
