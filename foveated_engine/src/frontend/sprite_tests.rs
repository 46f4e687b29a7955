/// Unit tests for sprite placement

use glam::{Mat4, Vec2, Vec3, Vec4};
use slotmap::SlotMap;
use crate::frontend::sprite::*;
use crate::graphics_device::{DepthMode, ModelHandle, ShaderHandle};
use crate::renderer::Drawable;

#[test]
fn test_sprite_depth_interpolates_layers() {
    assert!((sprite_depth(0, DepthMode::ZeroToOne) - 0.7).abs() < 1e-6);
    assert!((sprite_depth(MAX_UI_LAYER, DepthMode::ZeroToOne) - 0.2).abs() < 1e-6);
    assert!((sprite_depth(25, DepthMode::ZeroToOne) - 0.45).abs() < 1e-6);
    assert_eq!(sprite_depth(40, DepthMode::NegativeOneToOne), 0.5);
}

#[test]
fn test_higher_layer_is_closer() {
    assert!(sprite_depth(10, DepthMode::ZeroToOne) < sprite_depth(5, DepthMode::ZeroToOne));
}

#[test]
fn test_sprite_matrix_flips_y_and_places_depth() {
    let transform = Transform2D {
        position: Vec2::new(0.25, -0.5),
        rotation: 0.0,
        scale: Vec2::new(2.0, 3.0),
        layer: 0,
    };
    let m = sprite_matrix(&transform, DepthMode::ZeroToOne, Mat4::IDENTITY);

    assert_eq!(m.x_axis, Vec4::new(2.0, 0.0, 0.0, 0.0));
    assert_eq!(m.y_axis, Vec4::new(0.0, -3.0, 0.0, 0.0));
    assert!((m.w_axis - Vec4::new(0.25, -0.5, 0.7, 1.0)).length() < 1e-6);
}

#[test]
fn test_sprite_matrix_applies_aspect_last() {
    let aspect = Mat4::from_scale(Vec3::new(9.0 / 16.0, 1.0, 1.0));
    let transform = Transform2D { position: Vec2::new(1.0, 0.0), ..Transform2D::default() };
    let m = sprite_matrix(&transform, DepthMode::ZeroToOne, aspect);

    // Translation is squeezed by the aspect matrix too
    assert!((m.w_axis.x - 9.0 / 16.0).abs() < 1e-6);
}

#[test]
fn test_rotation_is_in_degrees() {
    let transform = Transform2D { rotation: 90.0, ..Transform2D::default() };
    let m = sprite_matrix(&transform, DepthMode::ZeroToOne, Mat4::IDENTITY);
    let rotated = m.transform_vector3(Vec3::X);
    assert!((rotated - Vec3::Y).length() < 1e-5);
}

#[test]
fn test_back_to_front_sorts_by_depth() {
    let mut shaders: SlotMap<ShaderHandle, ()> = SlotMap::with_key();
    let mut models: SlotMap<ModelHandle, ()> = SlotMap::with_key();
    let shader = shaders.insert(());
    let model = models.insert(());
    let at = |z: f32| Drawable {
        shader,
        model,
        texture: None,
        num_faces: 2,
        transform: Mat4::from_translation(Vec3::new(0.0, 0.0, z)),
    };

    let mut queue = vec![at(0.2), at(0.7), at(0.45)];
    order_ui(&mut queue, UiOrder::Submission);
    assert_eq!(queue[0].transform.w_axis.z, 0.2);

    order_ui(&mut queue, UiOrder::BackToFront);
    let depths: Vec<f32> = queue.iter().map(|d| d.transform.w_axis.z).collect();
    assert_eq!(depths, vec![0.7, 0.45, 0.2]);
}
