/// Unit tests for light.rs

use crate::renderer::light::{frame_uniforms, DirectionalLight};
use glam::{Mat4, Vec3, Vec4};

fn light(direction: Vec3) -> DirectionalLight {
    DirectionalLight {
        direction,
        ambient: Vec3::new(0.1, 0.2, 0.3),
        diffuse: Vec3::ONE,
        specular: Vec3::ONE,
    }
}

#[test]
fn test_shadow_camera_position() {
    let light = light(Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(light.shadow_camera_position(), Vec3::new(0.0, 20.0, 0.0));
}

#[test]
fn test_light_space_maps_origin_to_center() {
    let light = light(Vec3::new(1.0, -1.0, 0.5).normalize());
    let clip = light.light_space_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(clip.x.abs() < 1e-5);
    assert!(clip.y.abs() < 1e-5);
    // 20 units away in a [1, 100] zero-to-one depth range
    assert!((clip.z - 19.0 / 99.0).abs() < 1e-5);
    assert!((clip.w - 1.0).abs() < 1e-6);
}

#[test]
fn test_vertical_light_uses_x_up_vector() {
    let matrix = light(Vec3::new(0.0, -1.0, 0.0)).light_space_matrix();
    assert!(matrix.is_finite());
    let clip = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((clip.z - 19.0 / 99.0).abs() < 1e-5);
}

#[test]
fn test_light_data_layout() {
    let data = light(Vec3::Z).to_light_data();
    assert_eq!(std::mem::size_of_val(&data), 4 * 16 + 64);
    assert_eq!(data.direction, Vec4::new(0.0, 0.0, 1.0, 0.0));
    assert_eq!(data.ambient, Vec4::new(0.1, 0.2, 0.3, 1.0));
}

#[test]
fn test_frame_uniforms_flip_projection_and_patch_user_data() {
    let light = light(Vec3::NEG_Y);
    let projection = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
    let uniforms = frame_uniforms(Mat4::IDENTITY, projection, Mat4::IDENTITY, &light);

    assert_eq!(uniforms.camera.view, Mat4::IDENTITY);
    assert_eq!(uniforms.camera.projection.y_axis.y, -projection.y_axis.y);
    assert_eq!(uniforms.camera.projection.x_axis, projection.x_axis);
    assert_eq!(uniforms.user_data.w_axis, Vec4::new(0.1, 0.2, 0.3, 1.0));
    assert_eq!(uniforms.user_data.x_axis, Vec4::X);
    assert_eq!(uniforms.light.light_space, light.light_space_matrix());
}

#[test]
fn test_clear_color() {
    assert_eq!(light(Vec3::Y).clear_color(0.0), [0.1, 0.2, 0.3, 0.0]);
}
