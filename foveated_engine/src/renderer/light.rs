/// Directional light and the per-frame uniform values derived from it

use glam::{Mat4, Vec3, Vec4};
use crate::graphics_device::{CameraUniform, FrameUniforms, LightData};

/// Distance of the shadow camera from the origin
const LIGHT_DISTANCE: f32 = 20.0;
/// Half extent of the shadow camera's orthographic box
const LIGHT_HALF_EXTENT: f32 = 20.0;
const LIGHT_NEAR: f32 = 1.0;
const LIGHT_FAR: f32 = 100.0;

/// The single supported light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -1.0).normalize(),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(0.5),
        }
    }
}

impl DirectionalLight {
    /// Position of the shadow camera, looking at the origin
    pub fn shadow_camera_position(&self) -> Vec3 {
        -LIGHT_DISTANCE * self.direction
    }

    /// Projection * view of the shadow camera
    pub fn light_space_matrix(&self) -> Mat4 {
        let position = self.shadow_camera_position();
        // look_at degenerates when the view axis is parallel to +Y
        let up = if position.x == 0.0 && position.z == 0.0 && position.y != 0.0 {
            Vec3::X
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(position, Vec3::ZERO, up);
        let projection = Mat4::orthographic_rh(
            -LIGHT_HALF_EXTENT,
            LIGHT_HALF_EXTENT,
            LIGHT_HALF_EXTENT,
            -LIGHT_HALF_EXTENT,
            LIGHT_NEAR,
            LIGHT_FAR,
        );
        projection * view
    }

    /// Uniform payload with the light-space matrix filled in
    pub fn to_light_data(&self) -> LightData {
        LightData {
            direction: self.direction.extend(0.0),
            ambient: self.ambient.extend(1.0),
            diffuse: self.diffuse.extend(1.0),
            specular: self.specular.extend(1.0),
            light_space: self.light_space_matrix(),
        }
    }

    /// Color the color passes clear to
    pub fn clear_color(&self, alpha: f32) -> [f32; 4] {
        [self.ambient.x, self.ambient.y, self.ambient.z, alpha]
    }
}

/// Build the uniforms of one frame
///
/// The projection's Y axis is flipped for Vulkan clip space, and the user
/// data matrix's last column carries the ambient color.
pub fn frame_uniforms(view: Mat4, projection: Mat4, user_data: Mat4, light: &DirectionalLight) -> FrameUniforms {
    let mut projection = projection;
    projection.y_axis.y *= -1.0;

    let mut user_data = user_data;
    user_data.w_axis = Vec4::new(light.ambient.x, light.ambient.y, light.ambient.z, 1.0);

    FrameUniforms {
        camera: CameraUniform { view, projection },
        user_data,
        light: light.to_light_data(),
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
