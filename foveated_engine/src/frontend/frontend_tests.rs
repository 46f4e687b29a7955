/// Unit tests for Frontend, over FoveatedRenderer and MockGraphicsDevice

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::frontend::*;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockState};
use crate::graphics_device::{Pass, TextureData, Vertex};
use crate::renderer::{FoveatedRenderer, RenderSettings};

const CODE: [u8; 8] = [3, 2, 35, 7, 0, 0, 1, 0];

/// In-memory asset source counting every decode by path
#[derive(Default)]
struct MemoryAssets {
    decodes: Arc<Mutex<FxHashMap<String, usize>>>,
}

impl MemoryAssets {
    fn count(&self, path: &str) {
        *self.decodes.lock().unwrap().entry(path.to_string()).or_default() += 1;
    }
}

impl AssetSource for MemoryAssets {
    fn load_model(&mut self, path: &str) -> Result<ModelData> {
        self.count(path);
        if path == "models/missing.obj" {
            return Err(Error::AssetNotFound(path.to_string()));
        }
        let quad = MeshData { vertices: vec![Vertex::default(); 4], indices: vec![0, 1, 2, 2, 3, 0] };
        Ok(ModelData {
            meshes: vec![quad.clone(), quad],
            root: ModelNode::new(Mat4::IDENTITY, vec![0])
                .with_child(ModelNode::new(Mat4::from_translation(Vec3::Y), vec![1])),
        })
    }

    fn load_image(&mut self, path: &str) -> Result<TextureData> {
        self.count(path);
        if path == "textures/empty.png" {
            return Ok(TextureData::new(0, 0, 4, vec![]));
        }
        Ok(TextureData::new(2, 2, 4, vec![255; 16]))
    }

    fn load_font(&mut self, path: &str) -> Result<FontData> {
        self.count(path);
        let glyphs = (0..GLYPH_COUNT)
            .map(|i| {
                let size = if i == 0 { 0 } else { 8 };
                GlyphBitmap { width: size, height: size, bearing_top: 6, pixels: vec![128; (size * size) as usize] }
            })
            .collect();
        Ok(FontData { glyphs })
    }

    fn read_shader(&mut self, path: &str) -> Result<Vec<u8>> {
        self.count(path);
        Ok(CODE.to_vec())
    }
}

struct Harness {
    frontend: Frontend,
    state: Arc<Mutex<MockState>>,
    decodes: Arc<Mutex<FxHashMap<String, usize>>>,
}

fn harness() -> Harness {
    let device = MockGraphicsDevice::new(1600, 900, 2048);
    let state = device.state();
    let renderer = FoveatedRenderer::new(device, RenderSettings::default());
    let assets = MemoryAssets::default();
    let decodes = assets.decodes.clone();

    let frontend = Frontend::init(Box::new(renderer), &EngineConfig::default(), Box::new(assets)).unwrap();
    state.lock().unwrap().events.clear();
    Harness { frontend, state, decodes }
}

impl Harness {
    fn decodes(&self, path: &str) -> usize {
        self.decodes.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[test]
fn test_init_loads_composite_resources() {
    let h = harness();
    assert_eq!(h.decodes("models/fbo.obj"), 1);
    assert_eq!(h.decodes("models/sprite.obj"), 1);
    assert_eq!(h.decodes("shaders/MOCK/fbo.vert"), 3);
    assert_eq!(h.decodes("shaders/MOCK/fbo_foveated.frag"), 1);
    assert_eq!(h.decodes("shaders/MOCK/shadowpass.vert"), 1);
    assert_eq!(h.decodes("shaders/MOCK/text.frag"), 2);
    assert_eq!(h.state.lock().unwrap().live_shaders, 7);
}

#[test]
fn test_init_frame_renders_without_camera() {
    let mut h = harness();
    h.frontend.begin_frame();
    h.frontend.end_frame().unwrap();

    let state = h.state.lock().unwrap();
    assert_eq!(state.submitted_passes(), Pass::ALL.to_vec());
    assert_eq!(state.uniforms[0].camera.view, Mat4::IDENTITY);
}

#[test]
fn test_model_cache_decodes_once() {
    let mut h = harness();
    let first = h.frontend.load_model("models/cube.obj").unwrap();
    let second = h.frontend.load_model("models/cube.obj").unwrap();

    assert_eq!(first, second);
    assert_eq!(h.decodes("models/cube.obj"), 1);
    assert_eq!(h.state.lock().unwrap().count_events("create_model"), 2);
}

#[test]
fn test_texture_cache_returns_same_handle() {
    let mut h = harness();
    let a = h.frontend.load_texture("textures/wall.png").unwrap();
    let b = h.frontend.load_texture("textures/wall.png").unwrap();
    assert!(a.is_some());
    assert_eq!(a, b);
    assert_eq!(h.decodes("textures/wall.png"), 1);

    assert_eq!(h.frontend.load_texture("textures/empty.png").unwrap(), None);
    assert_eq!(h.frontend.load_texture("textures/empty.png").unwrap(), None);
    assert_eq!(h.decodes("textures/empty.png"), 1);
}

#[test]
fn test_shader_cache_is_keyed_by_stage() {
    let mut h = harness();
    let world = h.frontend.load_shader("basic.vert", "basic.frag", crate::graphics_device::DrawStage::World).unwrap();
    let again = h.frontend.load_shader("basic.vert", "basic.frag", crate::graphics_device::DrawStage::World).unwrap();
    let foveated = h
        .frontend
        .load_shader("basic.vert", "basic.frag", crate::graphics_device::DrawStage::Foveated)
        .unwrap();

    assert_eq!(world, again);
    assert_ne!(world, foveated);
    assert_eq!(h.decodes("shaders/MOCK/basic.vert"), 2);
}

#[test]
fn test_font_glyphs_become_textures() {
    let mut h = harness();
    let font = h.frontend.load_font("font.ttf").unwrap();
    let _ = h.frontend.load_font("font.ttf").unwrap();

    assert_eq!(font.characters().len(), GLYPH_COUNT);
    assert!(font.character(' ').unwrap().texture.is_none());
    assert!(font.character('A').unwrap().texture.is_some());
    assert_eq!(h.decodes("font.ttf"), 1);
    assert_eq!(h.state.lock().unwrap().count_events("create_texture"), GLYPH_COUNT - 1);
}

#[test]
fn test_missing_asset_propagates() {
    let mut h = harness();
    assert!(matches!(h.frontend.load_model("models/missing.obj"), Err(Error::AssetNotFound(_))));
}

#[test]
fn test_draw_model_queues_flattened_meshes() {
    let mut h = harness();
    let mut tree = h.frontend.load_model("models/cube.obj").unwrap();
    let shader = h.frontend.load_shader("basic.vert", "basic.frag", crate::graphics_device::DrawStage::World).unwrap();
    tree.set_shader(shader);

    let placement = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
    h.frontend.begin_frame();
    h.frontend.draw_model(&tree, placement);
    assert_eq!(h.frontend.world_queue().len(), 2);
    assert_eq!(h.frontend.world_queue()[1].transform, placement * Mat4::from_translation(Vec3::Y));
    h.frontend.end_frame().unwrap();

    let state = h.state.lock().unwrap();
    assert_eq!(state.submissions_of(Pass::World)[0].recording.geometry_draw_count(), 2);
    assert_eq!(state.submissions_of(Pass::Foveated)[0].recording.geometry_draw_count(), 2);
}

#[test]
fn test_begin_frame_clears_queues() {
    let mut h = harness();
    let texture = h.frontend.load_texture("textures/wall.png").unwrap();
    h.frontend.draw_sprites(&[texture], &[Transform2D::default()], false);
    assert_eq!(h.frontend.ui_queue().len(), 1);
    h.frontend.begin_frame();
    assert!(h.frontend.ui_queue().is_empty());
}

#[test]
fn test_sprite_mismatch_draws_shorter_length() {
    let mut h = harness();
    let texture = h.frontend.load_texture("textures/wall.png").unwrap();
    h.frontend.begin_frame();
    h.frontend.draw_sprites(&[texture, texture, texture], &[Transform2D::default(); 2], false);
    assert_eq!(h.frontend.ui_queue().len(), 2);
}

#[test]
fn test_sprite_depth_and_aspect() {
    let mut h = harness();
    let texture = h.frontend.load_texture("textures/wall.png").unwrap();
    h.frontend.begin_frame();
    let transform = Transform2D { position: Vec2::new(1.0, 0.0), layer: MAX_UI_LAYER, ..Transform2D::default() };
    h.frontend.draw_sprites(&[texture], &[transform], false);

    let m = h.frontend.ui_queue()[0].transform;
    assert!((m.w_axis.z - 0.2).abs() < 1e-6);
    assert!((m.w_axis.x - 900.0 / 1600.0).abs() < 1e-6);
}

#[test]
fn test_draw_text_uses_glyph_textures() {
    let mut h = harness();
    let font = h.frontend.load_font("font.ttf").unwrap();
    h.frontend.begin_frame();
    h.frontend.draw_text(&font, "Hi there", &Transform2D::default(), 0.1);

    // The space has no glyph texture
    assert_eq!(h.frontend.ui_queue().len(), 7);
    assert_eq!(h.frontend.ui_queue()[0].texture, font.character('H').unwrap().texture);
}

#[test]
fn test_overlay_text_is_presented_with_ui_disabled() {
    let mut h = harness();
    let font = h.frontend.load_font("font.ttf").unwrap();
    h.frontend.backend_mut().unwrap().settings_mut().set_draw_ui(false);
    h.frontend.begin_frame();
    h.frontend.draw_overlay_text(&font, "FPS", &Transform2D::default(), 0.1);

    assert!(h.frontend.ui_queue().is_empty());
    assert_eq!(h.frontend.overlay_queue().len(), 3);
    assert_ne!(h.frontend.overlay_queue()[0].shader, h.frontend.text_shader);

    h.frontend.end_frame().unwrap();
    let state = h.state.lock().unwrap();
    assert_eq!(state.submissions_of(Pass::Ui)[0].recording.geometry_draw_count(), 0);
    let present = &state.submissions_of(Pass::Present)[0].recording;
    assert_eq!(present.composite_draw_count(), 1);
    assert_eq!(present.geometry_draw_count(), 3);
    drop(state);

    h.frontend.begin_frame();
    assert!(h.frontend.overlay_queue().is_empty());
}

#[test]
fn test_ui_queue_back_to_front() {
    let mut h = harness();
    let texture = h.frontend.load_texture("textures/wall.png").unwrap();
    h.frontend.set_ui_order(UiOrder::BackToFront);
    h.frontend.begin_frame();
    let front = Transform2D { layer: 40, ..Transform2D::default() };
    let back = Transform2D { layer: 0, ..Transform2D::default() };
    h.frontend.draw_sprites(&[texture, texture], &[front, back], false);
    h.frontend.end_frame().unwrap();

    let state = h.state.lock().unwrap();
    let ui = &state.submissions_of(Pass::Ui)[0].recording;
    // Two composite quads come first
    assert!(ui.draws[2].transform.w_axis.z > ui.draws[3].transform.w_axis.z);
}

#[test]
fn test_camera_and_gaze_reach_the_backend() {
    let mut h = harness();
    let view = Mat4::look_at_rh(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO, Vec3::Y);
    h.frontend.set_main_camera(Camera { view, projection: Mat4::IDENTITY });
    h.frontend.set_gaze_point(Vec2::new(0.0, 0.0));
    h.frontend.begin_frame();
    h.frontend.end_frame().unwrap();

    h.frontend.clear_main_camera();
    h.frontend.begin_frame();
    h.frontend.end_frame().unwrap();

    let state = h.state.lock().unwrap();
    assert_eq!(state.uniforms[0].camera.view, view);
    assert_eq!(state.uniforms[1].camera.view, Mat4::IDENTITY);
    let scissor = state.submissions_of(Pass::Foveated)[0].recording.scissor;
    assert_eq!((scissor.x, scissor.y), (0, 0));
}

#[test]
fn test_set_camera_shader_replaces_ui_composite() {
    let mut h = harness();
    h.frontend.set_camera_shader("fbo.vert", "grayscale.frag").unwrap();
    assert_eq!(h.decodes("shaders/MOCK/grayscale.frag"), 1);
}

#[test]
fn test_shutdown_deletes_everything_once() {
    let mut h = harness();
    h.frontend.load_model("models/cube.obj").unwrap();
    h.frontend.load_texture("textures/wall.png").unwrap();
    h.frontend.load_font("font.ttf").unwrap();

    h.frontend.shutdown().unwrap();
    h.frontend.shutdown().unwrap();
    assert!(h.frontend.is_shut_down());

    let state = h.state.lock().unwrap();
    assert_eq!(state.live_models, 0);
    assert_eq!(state.live_textures, 0);
    assert_eq!(state.live_shaders, 0);
    assert_eq!(state.count_events("drop"), 1);
}

#[test]
fn test_use_after_shutdown_is_an_error() {
    let mut h = harness();
    h.frontend.shutdown().unwrap();
    assert!(h.frontend.load_texture("textures/other.png").is_err());
    assert!(h.frontend.end_frame().is_err());
    assert_eq!(h.frontend.screen_resolution().width, 0);
}
