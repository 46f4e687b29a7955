/// Mapping of `vk::Result` failures onto engine errors
///
/// Every GPU call goes through [`VkResultExt`], so the log line and the error
/// message both carry the device code (`VK_ERROR_DEVICE_LOST`, ...) and the
/// call site of the failing call.

use ash::vk;
use foveated_engine::foveated::log::LogSeverity;
use foveated_engine::foveated::{Error, Result};
use std::panic::Location;

pub(crate) const LOG_SOURCE: &str = "foveated::vulkan";

/// Readable device code of a Vulkan result
pub fn vk_code(result: vk::Result) -> String {
    format!("VK_{:?}", result)
}

/// Whether a result is one of the two out-of-memory codes
pub fn is_out_of_memory(result: vk::Result) -> bool {
    matches!(
        result,
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY
    )
}

#[track_caller]
fn report(what: &str, detail: String) -> String {
    let location = Location::caller();
    let message = format!("Failed to {}: {}", what, detail);
    foveated_engine::log::log_detailed(
        LogSeverity::Error,
        LOG_SOURCE,
        message.clone(),
        location.file(),
        location.line(),
    );
    message
}

/// Logging conversions from raw Vulkan results
pub trait VkResultExt<T> {
    /// Failure during device, swapchain or framebuffer setup
    fn or_init(self, what: &str) -> Result<T>;

    /// Failure while recording, submitting or presenting a frame
    fn or_backend(self, what: &str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    #[track_caller]
    fn or_init(self, what: &str) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(Error::InitializationFailed(report(what, vk_code(e)))),
        }
    }

    #[track_caller]
    fn or_backend(self, what: &str) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) if is_out_of_memory(e) => {
                report(what, vk_code(e));
                Err(Error::OutOfMemory)
            }
            Err(e) => Err(Error::BackendError(report(what, vk_code(e)))),
        }
    }
}

/// Failure of a non-Vulkan setup call (window handles, loader, allocator)
#[track_caller]
pub fn init_error(what: &str, detail: impl std::fmt::Display) -> Error {
    Error::InitializationFailed(report(what, detail.to_string()))
}

#[cfg(test)]
#[path = "vulkan_error_tests.rs"]
mod tests;
