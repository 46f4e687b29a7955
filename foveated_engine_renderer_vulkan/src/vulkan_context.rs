/// GpuContext - shared GPU objects every Vulkan resource needs
///
/// Contains everything needed for GPU operations:
/// - Instance, surface and logical device
/// - Allocator for memory management, with a running byte count
/// - Graphics and present queues
/// - The command pool and the fixed descriptor pool
///
/// Buffers, images, framebuffers and the swapchain each hold an `Arc` to it;
/// the device and instance are destroyed when the last of them lets go.

use ash::vk;
use foveated_engine::foveated::{Error, Result};
use foveated_engine::{engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::vulkan_device::{self, DeviceQueues};
use crate::vulkan_error::{init_error, VkResultExt, LOG_SOURCE};

pub struct GpuContext {
    // Kept alive for the instance's function pointers
    _entry: ash::Entry,
    pub instance: ash::Instance,

    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,

    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<crate::vulkan_debug::DebugMessenger>,

    pub queues: DeviceQueues,

    /// Vulkan logical device
    pub device: ash::Device,

    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,
    allocated_bytes: AtomicU64,

    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    /// TRANSIENT + RESET_COMMAND_BUFFER pool on the graphics family
    pub command_pool: vk::CommandPool,

    /// Fixed-size pool for every descriptor set
    pub descriptor_pool: vk::DescriptorPool,
}

impl GpuContext {
    /// Create the instance, the window surface and the logical device
    ///
    /// # Arguments
    ///
    /// * `window` - Window the surface presents to
    /// * `enable_validation` - Install the validation layer and messenger
    ///   (only honored with the `vulkan-validation` feature)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, enable_validation: bool) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("load the Vulkan library", e))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Foveated Viewer")
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Foveated Engine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let display_handle = window.display_handle().map_err(|e| init_error("get display handle", e))?;
            let window_handle = window.window_handle().map_err(|e| init_error("get window handle", e))?;

            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .or_init("get required surface extensions")?
                .to_vec();
            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut layer_names: Vec<*const std::ffi::c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            {
                if enable_validation {
                    extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                    layer_names.push(crate::vulkan_debug::VALIDATION_LAYER.as_ptr());
                }
            }
            #[cfg(not(feature = "vulkan-validation"))]
            {
                if enable_validation {
                    engine_warn!(LOG_SOURCE, "Validation requested but the vulkan-validation feature is off");
                }
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).or_init("create Vulkan instance")?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if enable_validation {
                Some(crate::vulkan_debug::DebugMessenger::new(&entry, &instance)?)
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .or_init("create window surface")?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let queues = DeviceQueues::select(&instance, &surface_loader, surface)?;
            let device = queues.create_logical_device(&instance)?;

            let graphics_queue = device.get_device_queue(queues.graphics_family, 0);
            let present_queue = device.get_device_queue(queues.present_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: queues.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("create GPU allocator", e))?;

            let command_pool = vulkan_device::create_command_pool(&device, queues.graphics_family)?;
            let descriptor_pool = vulkan_device::create_descriptor_pool(&device)?;

            engine_info!(LOG_SOURCE, "Vulkan device ready on '{}'", queues.device_name);

            Ok(Self {
                _entry: entry,
                instance,
                surface_loader,
                surface,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
                queues,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                allocated_bytes: AtomicU64::new(0),
                graphics_queue,
                present_queue,
                command_pool,
                descriptor_pool,
            })
        }
    }

    // ===== MEMORY =====

    /// Allocate memory for a buffer or image and count it
    ///
    /// # Arguments
    ///
    /// * `name` - Debug name of the allocation
    /// * `requirements` - Memory requirements of the resource
    /// * `location` - `GpuOnly` or `CpuToGpu` (persistently mapped)
    /// * `linear` - Buffers and linear images are `true`
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator lock poisoned".to_string()))?;
        let allocation = allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(LOG_SOURCE, "Out of GPU memory for '{}' ({:.2} MB): {}", name, size_mb, e);
                Error::OutOfMemory
            })?;
        self.allocated_bytes.fetch_add(allocation.size(), Ordering::Relaxed);
        Ok(allocation)
    }

    /// Return an allocation; never panics, so it is safe from `Drop`
    pub fn free(&self, allocation: Allocation) {
        let size = allocation.size();
        if let Ok(mut allocator) = self.allocator.lock() {
            if allocator.free(allocation).is_ok() {
                self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
            }
        }
    }

    /// Bytes currently allocated through [`GpuContext::allocate`]
    pub fn used_vram(&self) -> u64 {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    // ===== COMMAND BUFFERS =====

    pub fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        unsafe { self.device.allocate_command_buffers(&info).or_init("allocate command buffers") }
    }

    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        unsafe {
            self.device.free_command_buffers(self.command_pool, command_buffers);
        }
    }

    /// Record `record` into a fresh command buffer, submit it and wait for the queue to idle
    ///
    /// This is the serialization point that makes the shared staging buffer safe.
    pub fn one_time_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let command_buffers = self.allocate_command_buffers(1)?;
        let command_buffer = command_buffers[0];

        let result = unsafe {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .or_backend("begin one-time command buffer")
                .and_then(|_| {
                    record(&self.device, command_buffer);
                    self.device
                        .end_command_buffer(command_buffer)
                        .or_backend("end one-time command buffer")
                })
                .and_then(|_| {
                    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                    self.device
                        .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                        .or_backend("submit one-time command buffer")
                })
                .and_then(|_| {
                    self.device
                        .queue_wait_idle(self.graphics_queue)
                        .or_backend("wait for one-time command buffer")
                })
        };

        self.free_command_buffers(&command_buffers);
        result
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Every resource holding an Arc is gone; nothing can be in flight
            self.device.device_wait_idle().ok();
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            #[cfg(feature = "vulkan-validation")]
            {
                if let Some(messenger) = &self.debug_messenger {
                    messenger.destroy();
                }
            }
            self.instance.destroy_instance(None);
        }
    }
}
