//! Unit tests for error.rs
//!
//! Covers Display, Debug and Clone for every Error variant.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display_carries_device_code() {
    let err = Error::BackendError("queue submit failed: VK_ERROR_DEVICE_LOST".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Backend error"));
    assert!(display.contains("VK_ERROR_DEVICE_LOST"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("framebuffer shader stage Shadow".to_string());
    assert_eq!(
        format!("{}", err),
        "Invalid resource: framebuffer shader stage Shadow"
    );
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no device with 64 bytes of push constants".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("push constants"));
}

#[test]
fn test_asset_not_found_display() {
    let err = Error::AssetNotFound("models/fbo.obj".to_string());
    assert_eq!(format!("{}", err), "Asset not found: models/fbo.obj");
}

#[test]
fn test_invalid_config_display() {
    let err = Error::InvalidConfig("--Width".to_string());
    assert_eq!(format!("{}", err), "Invalid config: --Width");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug_names_variant() {
    assert!(format!("{:?}", Error::BackendError("x".into())).contains("BackendError"));
    assert!(format!("{:?}", Error::AssetNotFound("x".into())).contains("AssetNotFound"));
    assert!(format!("{:?}", Error::InvalidConfig("x".into())).contains("InvalidConfig"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::InvalidResource("stale handle".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

#[test]
fn test_result_propagates_with_question_mark() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfMemory)
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(Error::OutOfMemory)));
}
