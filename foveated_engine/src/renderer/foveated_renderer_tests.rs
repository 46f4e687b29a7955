/// Unit tests for FoveatedRenderer, driven through MockGraphicsDevice
///
/// Covers pass ordering, the semaphore graph, resolution rescaling with its
/// generation guard, the foveation toggle and shutdown idempotence.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockState};
use crate::graphics_device::{
    DrawStage, Extent2D, GraphicsDevice, ModelHandle, Pass, PassSync, ShaderHandle, TextureData,
    Vertex,
};
use crate::renderer::{Drawable, FoveatedRenderer, FrameInput, RenderBackend, RenderSettings};

const CODE: [u8; 8] = [3, 2, 35, 7, 0, 0, 1, 0];

struct Harness {
    renderer: FoveatedRenderer<MockGraphicsDevice>,
    state: Arc<Mutex<MockState>>,
    scene_shader: ShaderHandle,
    cube: ModelHandle,
}

fn harness(settings: RenderSettings) -> Harness {
    let device = MockGraphicsDevice::new(1600, 900, 2048);
    let state = device.state();
    let mut renderer = FoveatedRenderer::new(device, settings);

    let quad = renderer.load_model(&[Vertex::default(); 4], &[0, 1, 2, 2, 3, 0]).unwrap();
    let cube = renderer.load_model(&[Vertex::default(); 8], &[0; 36]).unwrap();
    renderer.set_framebuffer_model(quad, 2);

    let ui = renderer.create_shader(&CODE, &CODE, DrawStage::Ui).unwrap();
    let aspect = renderer.create_shader(&CODE, &CODE, DrawStage::Aspect).unwrap();
    let shadow = renderer.create_shader(&CODE, &CODE, DrawStage::Shadow).unwrap();
    let clear = renderer.create_shader(&CODE, &CODE, DrawStage::Foveated).unwrap();
    let scene_shader = renderer.create_shader(&CODE, &CODE, DrawStage::World).unwrap();
    renderer.set_framebuffer_shader(ui, DrawStage::Ui).unwrap();
    renderer.set_framebuffer_shader(aspect, DrawStage::Aspect).unwrap();
    renderer.set_shadow_shader(shadow);
    renderer.set_foveated_clear_shader(clear);

    state.lock().unwrap().events.clear();
    Harness { renderer, state, scene_shader, cube }
}

impl Harness {
    fn drawable(&self, transform: Mat4) -> Drawable {
        Drawable {
            shader: self.scene_shader,
            model: self.cube,
            texture: None,
            num_faces: 12,
            transform,
        }
    }

    fn draw_empty(&mut self) {
        self.renderer.draw(&FrameInput::empty()).unwrap();
    }
}

// ============================================================================
// PASS ORDERING
// ============================================================================

#[test]
fn test_passes_submitted_in_dependency_order_every_frame() {
    let mut h = harness(RenderSettings::default());
    let world = [h.drawable(Mat4::IDENTITY)];
    for _ in 0..3 {
        let frame = FrameInput { world: &world, ..FrameInput::empty() };
        h.renderer.draw(&frame).unwrap();
    }

    let state = h.state.lock().unwrap();
    let passes = state.submitted_passes();
    assert_eq!(passes.len(), 15);
    for frame in passes.chunks(5) {
        assert_eq!(frame, Pass::ALL);
    }
    assert_eq!(h.renderer.frame_count(), 3);
}

#[test]
fn test_frame_event_sequence() {
    let mut h = harness(RenderSettings::default());
    h.draw_empty();

    let state = h.state.lock().unwrap();
    assert_eq!(
        state.events,
        vec![
            "wait_fence",
            "uniforms",
            "submit:Shadow",
            "submit:World",
            "submit:Foveated",
            "submit:Ui",
            "acquire:0",
            "submit:Present",
            "present:0",
        ]
    );
}

#[test]
fn test_submissions_carry_the_semaphore_graph() {
    let mut h = harness(RenderSettings::default());
    h.draw_empty();

    let state = h.state.lock().unwrap();
    for submission in &state.submissions {
        assert_eq!(submission.sync, PassSync::for_pass(submission.recording.pass));
    }
    let present = &state.submissions_of(Pass::Present)[0];
    assert!(present.sync.signal_frame_fence);
    assert_eq!(present.recording.swapchain_image, Some(0));
}

// ============================================================================
// END-TO-END
// ============================================================================

#[test]
fn test_single_drawable_without_foveation() {
    let mut settings = RenderSettings::default();
    settings.set_foveation_enabled(false);
    let mut h = harness(settings);

    let world = [h.drawable(Mat4::IDENTITY)];
    let frame = FrameInput {
        view: Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
        projection: Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0),
        world: &world,
        ..FrameInput::empty()
    };
    h.renderer.draw(&frame).unwrap();

    let state = h.state.lock().unwrap();
    let world_pass = &state.submissions_of(Pass::World)[0].recording;
    let foveated_pass = &state.submissions_of(Pass::Foveated)[0].recording;
    assert_eq!(world_pass.geometry_draw_count(), 1);
    assert_eq!(world_pass.draws[0].index_count, 36);
    assert_eq!(foveated_pass.geometry_draw_count(), 0);
    assert!(foveated_pass.draws.is_empty());
    assert_eq!(state.submissions_of(Pass::Shadow)[0].recording.draws.len(), 1);
}

#[test]
fn test_overlay_reaches_present_with_ui_disabled() {
    let mut settings = RenderSettings::default();
    settings.set_draw_ui(false);
    let mut h = harness(settings);

    let hud = [h.drawable(Mat4::IDENTITY)];
    let frame = FrameInput { ui: &hud, overlay: &hud, ..FrameInput::empty() };
    h.renderer.draw(&frame).unwrap();

    let state = h.state.lock().unwrap();
    assert_eq!(state.submissions_of(Pass::Ui)[0].recording.geometry_draw_count(), 0);
    let present = &state.submissions_of(Pass::Present)[0].recording;
    assert_eq!(present.composite_draw_count(), 1);
    assert_eq!(present.geometry_draw_count(), 1);
    assert_eq!(present.draws[1].shader, Some(h.scene_shader));
}

#[test]
fn test_identity_camera_draws() {
    let mut h = harness(RenderSettings::default());
    h.draw_empty();

    let state = h.state.lock().unwrap();
    let uniforms = state.uniforms[0];
    assert_eq!(uniforms.camera.view, Mat4::IDENTITY);
    assert_eq!(uniforms.camera.projection.y_axis.y, -1.0);
}

#[test]
fn test_draw_without_composite_resources_fails_before_gpu_work() {
    let device = MockGraphicsDevice::new(640, 480, 512);
    let state = device.state();
    let mut renderer = FoveatedRenderer::new(device, RenderSettings::default());

    let err = renderer.draw(&FrameInput::empty()).unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
    assert!(state.lock().unwrap().events.is_empty());
}

#[test]
fn test_gpu_error_stops_the_frame() {
    let mut h = harness(RenderSettings::default());
    if let Some(device) = h.renderer.device_mut() {
        device.fail_on_submit = Some(Pass::World);
    }
    let err = h.renderer.draw(&FrameInput::empty()).unwrap_err();
    assert!(matches!(err, Error::BackendError(msg) if msg.contains("VK_ERROR_DEVICE_LOST")));

    let state = h.state.lock().unwrap();
    assert_eq!(state.submitted_passes(), vec![Pass::Shadow]);
    assert_eq!(state.count_events("present"), 0);
}

// ============================================================================
// RESOLUTION SCALE
// ============================================================================

#[test]
fn test_unchanged_scale_never_rebuilds() {
    let mut h = harness(RenderSettings::default());
    h.renderer.settings_mut().set_base_res_scale(1.0);
    h.draw_empty();
    h.draw_empty();
    assert_eq!(h.state.lock().unwrap().rebuilds, 0);
}

#[test]
fn test_scale_change_rebuilds_once() {
    let mut h = harness(RenderSettings::default());
    h.renderer.settings_mut().set_base_res_scale(0.5);
    h.draw_empty();
    h.draw_empty();
    h.renderer.settings_mut().set_base_res_scale(0.500_01);
    h.draw_empty();

    let state = h.state.lock().unwrap();
    assert_eq!(state.rebuilds, 1);
    assert_eq!(state.descriptor_writes, 1);
    let world = &state.submissions_of(Pass::World)[0].recording;
    assert_eq!(world.viewport.width, 800.0);
    assert_eq!(world.viewport.height, 450.0);
    // Foveated keeps its full resolution
    let foveated = &state.submissions_of(Pass::Foveated)[0].recording;
    assert_eq!(foveated.viewport.width, 1600.0);
    assert_eq!(h.renderer.world_scale(), 0.5);
}

#[test]
fn test_rebuild_happens_between_fence_and_submissions() {
    let mut h = harness(RenderSettings::default());
    h.renderer.settings_mut().set_base_res_scale(0.25);
    h.draw_empty();

    let state = h.state.lock().unwrap();
    assert_eq!(
        &state.events[..5],
        &["wait_fence", "resize:World:400x225", "descriptor:World", "uniforms", "submit:Shadow"]
    );
}

#[test]
fn test_disabling_foveation_restores_full_size() {
    let mut h = harness(RenderSettings::default());
    h.renderer.settings_mut().set_base_res_scale(0.5);
    h.draw_empty();
    h.renderer.settings_mut().set_foveation_enabled(false);
    h.draw_empty();

    assert_eq!(h.state.lock().unwrap().rebuilds, 2);
    let device = h.renderer.device().unwrap();
    assert_eq!(device.framebuffer_extent(Pass::World), Extent2D::new(1600, 900));
    assert_eq!(h.renderer.settings().base_res_scale(), 0.5);
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "World descriptor is stale"))]
fn test_stale_world_descriptor_is_refused() {
    let mut h = harness(RenderSettings::default());
    if let Some(device) = h.renderer.device_mut() {
        device.force_generation(Pass::World, 7);
    }
    let result = h.renderer.draw(&FrameInput::empty());
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(h.state.lock().unwrap().submissions_of(Pass::Ui).is_empty());
}

// ============================================================================
// RESOURCES
// ============================================================================

#[test]
fn test_zero_sized_texture_yields_none() {
    let mut h = harness(RenderSettings::default());
    assert_eq!(h.renderer.load_texture(&TextureData::new(0, 0, 4, vec![])).unwrap(), None);
    assert!(h.renderer.load_texture(&TextureData::new(2, 2, 4, vec![0; 16])).unwrap().is_some());
    assert_eq!(h.state.lock().unwrap().live_textures, 1);
}

#[test]
fn test_framebuffer_shader_only_for_ui_and_aspect() {
    let mut h = harness(RenderSettings::default());
    for stage in [DrawStage::World, DrawStage::Shadow, DrawStage::Foveated] {
        let result = h.renderer.set_framebuffer_shader(h.scene_shader, stage);
        assert!(matches!(result, Err(Error::InvalidResource(_))));
    }
}

#[test]
fn test_delete_waits_for_idle_device() {
    let mut h = harness(RenderSettings::default());
    h.renderer.delete_model(h.cube).unwrap();
    h.renderer.delete_shader(h.scene_shader).unwrap();

    let state = h.state.lock().unwrap();
    assert_eq!(state.events, vec!["wait_idle", "destroy_model", "wait_idle", "destroy_shader"]);
}

#[test]
fn test_info_queries() {
    let h = harness(RenderSettings::default());
    assert_eq!(h.renderer.device_name(), "Mock Device");
    assert_eq!(h.renderer.shader_folder_name(), "MOCK");
    assert_eq!(h.renderer.screen_extent(), Extent2D::new(1600, 900));
    assert!(h.renderer.used_vram() > 0);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_twice_is_a_no_op() {
    let mut h = harness(RenderSettings::default());
    h.renderer.shutdown().unwrap();
    h.renderer.shutdown().unwrap();
    assert!(h.renderer.is_shut_down());

    let state = h.state.lock().unwrap();
    assert_eq!(state.count_events("wait_idle"), 1);
    assert_eq!(state.count_events("drop"), 1);
}

#[test]
fn test_draw_after_shutdown_is_an_error() {
    let mut h = harness(RenderSettings::default());
    h.renderer.shutdown().unwrap();
    assert!(matches!(h.renderer.draw(&FrameInput::empty()), Err(Error::BackendError(_))));
    assert!(h.renderer.load_model(&[Vertex::default()], &[0]).is_err());
    assert_eq!(h.renderer.device_name(), "");
}
