/// Unit tests for resolution.rs

use crate::graphics_device::Extent2D;
use crate::renderer::resolution::{scaled_extent, ResolutionScale};

#[test]
fn test_same_scale_needs_no_rebuild() {
    let scale = ResolutionScale::default();
    assert_eq!(scale.current(), 1.0);
    assert!(!scale.needs_rebuild(1.0));
}

#[test]
fn test_roundoff_needs_no_rebuild() {
    let scale = ResolutionScale::new(0.5);
    // 50% from a percentage slider
    assert!(!scale.needs_rebuild(50.000_01 / 100.0));
    assert!(!scale.needs_rebuild(0.500_05));
}

#[test]
fn test_real_change_needs_rebuild() {
    let mut scale = ResolutionScale::new(1.0);
    assert!(scale.needs_rebuild(0.75));
    scale.commit(0.75);
    assert!(!scale.needs_rebuild(0.75));
    assert!(scale.needs_rebuild(1.0));
}

#[test]
fn test_scaled_extent() {
    let extent = Extent2D::new(1600, 900);
    assert_eq!(scaled_extent(extent, 1.0), extent);
    assert_eq!(scaled_extent(extent, 0.5), Extent2D::new(800, 450));
    assert_eq!(scaled_extent(Extent2D::new(10, 10), 0.0), Extent2D::new(1, 1));
}
