/// Vulkan Debug Messenger - routes validation layer messages into the engine log
///
/// Only compiled with the `vulkan-validation` feature. Messages keep the
/// layer's message id as a prefix and land under `foveated::vulkan::validation`.

use ash::vk;
use foveated_engine::foveated::log::LogSeverity;
use foveated_engine::foveated::Result;
use std::ffi::CStr;

use crate::vulkan_error::VkResultExt;

/// Name of the Khronos validation layer
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

const VALIDATION_SOURCE: &str = "foveated::vulkan::validation";

/// Engine severity of a validation message
pub fn log_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Debug
    } else {
        LogSeverity::Trace
    }
}

/// Vulkan debug messenger callback
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown".into()
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_string_lossy()
    };
    let message = if callback_data.p_message.is_null() {
        "No message".into()
    } else {
        CStr::from_ptr(callback_data.p_message).to_string_lossy()
    };

    foveated_engine::log::log(
        log_severity(message_severity),
        VALIDATION_SOURCE,
        format!("[{:?}] {}: {}", message_type, message_id_name, message),
    );

    // Never abort the call that triggered the message
    vk::FALSE
}

/// Debug utils loader and the messenger it created
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Install the callback for warnings and errors of every message type
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&info, None)
                .or_init("create debug messenger")?
        };
        Ok(Self { loader, messenger })
    }

    /// Must run before the instance is destroyed
    pub fn destroy(&self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}
