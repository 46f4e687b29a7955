//! Error types for the foveated engine
//!
//! This module defines the error type used throughout the engine,
//! including device setup, per-frame submission, asset loading and configuration.

use std::fmt;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (carries the device-reported code when there is one)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, model, shader, stage, handle)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, framebuffers, pipelines)
    InitializationFailed(String),

    /// An asset path could not be resolved or decoded by the asset source
    AssetNotFound(String),

    /// A configuration value or command-line argument was malformed
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetNotFound(msg) => write!(f, "Asset not found: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Terminate the process after an unrecoverable error.
///
/// GPU failures (device loss, out-of-memory, pipeline creation, descriptor
/// pool exhaustion) are not retried anywhere in the engine. Library code
/// returns them as [`Error`]; the application hands anything that reaches the
/// top of its loop to this function, which logs it and exits with status 1.
pub fn fatal(error: Error) -> ! {
    crate::engine_error!("foveated::fatal", "Unrecoverable error, terminating: {}", error);
    std::process::exit(1)
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
