/// Device/Queue Manager - physical device choice, queue families, pools
///
/// The selection rules are plain functions over queried properties so they can
/// be tested without a GPU; [`DeviceQueues::select`] feeds them the real data.

use ash::vk;
use foveated_engine::foveated::Result;
use foveated_engine::{engine_bail, engine_info};
use std::ffi::CStr;

use crate::vulkan_error::{VkResultExt, LOG_SOURCE};

/// One 4x4 float matrix, the only push constant any pipeline uses
pub const MIN_PUSH_CONSTANTS_SIZE: u32 = 64;

/// Fixed descriptor pool capacity (never grown)
pub const POOL_UNIFORM_BUFFERS: u32 = 16;
pub const POOL_COMBINED_IMAGE_SAMPLERS: u32 = 2048;
pub const POOL_MAX_SETS: u32 = 2048;

/// What device selection needs to know about one physical device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub name: String,
    pub max_push_constants_size: u32,
}

/// Index of the first candidate able to push one matrix
pub fn pick_device(candidates: &[DeviceCandidate]) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.max_push_constants_size >= MIN_PUSH_CONSTANTS_SIZE)
}

/// Graphics and present family indices (they may be the same family)
///
/// # Arguments
///
/// * `families` - Queue family properties in enumeration order
/// * `supports_present` - Whether family `i` can present to the surface
pub fn pick_queue_families<F>(families: &[vk::QueueFamilyProperties], supports_present: F) -> Option<(u32, u32)>
where
    F: Fn(u32) -> bool,
{
    let graphics = families
        .iter()
        .position(|f| f.queue_count > 0 && f.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;

    // Prefer presenting from the graphics family when it can
    let present = if supports_present(graphics) {
        graphics
    } else {
        (0..families.len() as u32).find(|&i| families[i as usize].queue_count > 0 && supports_present(i))?
    };
    Some((graphics, present))
}

/// Queue families to open, without duplicates
pub fn unique_families(graphics: u32, present: u32) -> Vec<u32> {
    if graphics == present {
        vec![graphics]
    } else {
        vec![graphics, present]
    }
}

/// The chosen physical device and its queue families
#[derive(Debug, Clone)]
pub struct DeviceQueues {
    pub physical_device: vk::PhysicalDevice,
    pub device_name: String,
    pub graphics_family: u32,
    pub present_family: u32,
}

impl DeviceQueues {
    /// Enumerate devices, log each, keep the first that qualifies
    pub fn select(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        unsafe {
            let physical_devices = instance
                .enumerate_physical_devices()
                .or_init("enumerate physical devices")?;

            let candidates: Vec<DeviceCandidate> = physical_devices
                .iter()
                .map(|&pd| {
                    let properties = instance.get_physical_device_properties(pd);
                    let name = CStr::from_ptr(properties.device_name.as_ptr())
                        .to_string_lossy()
                        .into_owned();
                    engine_info!(
                        LOG_SOURCE,
                        "Found GPU '{}' (max push constants {} bytes)",
                        name,
                        properties.limits.max_push_constants_size
                    );
                    DeviceCandidate { name, max_push_constants_size: properties.limits.max_push_constants_size }
                })
                .collect();

            let Some(index) = pick_device(&candidates) else {
                engine_bail!(
                    LOG_SOURCE,
                    "No GPU among {} supports {} bytes of push constants",
                    candidates.len(),
                    MIN_PUSH_CONSTANTS_SIZE
                );
            };
            let physical_device = physical_devices[index];

            let families = instance.get_physical_device_queue_family_properties(physical_device);
            let Some((graphics_family, present_family)) = pick_queue_families(&families, |i| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            }) else {
                engine_bail!(LOG_SOURCE, "GPU '{}' has no graphics or present queue family", candidates[index].name);
            };

            engine_info!(
                LOG_SOURCE,
                "Using GPU '{}' (graphics family {}, present family {})",
                candidates[index].name,
                graphics_family,
                present_family
            );

            Ok(Self {
                physical_device,
                device_name: candidates[index].name.clone(),
                graphics_family,
                present_family,
            })
        }
    }

    /// Open the logical device with one queue per unique family
    pub fn create_logical_device(&self, instance: &ash::Instance) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families(self.graphics_family, self.present_family)
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        unsafe {
            instance
                .create_device(self.physical_device, &device_create_info, None)
                .or_init("create logical device")
        }
    }
}

/// Command pool for per-pass and one-time command buffers
pub fn create_command_pool(device: &ash::Device, graphics_family: u32) -> Result<vk::CommandPool> {
    let info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(graphics_family)
        .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
    unsafe { device.create_command_pool(&info, None).or_init("create command pool") }
}

/// Fixed-size descriptor pool; exhausting it is fatal
pub fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: POOL_UNIFORM_BUFFERS,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: POOL_COMBINED_IMAGE_SAMPLERS,
        },
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(POOL_MAX_SETS);
    unsafe { device.create_descriptor_pool(&info, None).or_init("create descriptor pool") }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
