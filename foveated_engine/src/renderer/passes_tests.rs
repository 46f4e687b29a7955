/// Unit tests for passes.rs

use crate::error::Error;
use crate::graphics_device::{
    BoundTexture, ClearValue, DrawKind, Extent2D, ModelHandle, Pass, ShaderHandle, TextureHandle,
};
use crate::renderer::passes::*;
use crate::renderer::{DirectionalLight, Drawable, FrameInput, RenderSettings};
use glam::{Mat4, Vec2, Vec3};
use slotmap::SlotMap;

struct Fixture {
    composite: ResolvedComposite,
    world: Vec<Drawable>,
    ui: Vec<Drawable>,
    texture: TextureHandle,
}

fn fixture() -> Fixture {
    let mut shaders: SlotMap<ShaderHandle, ()> = SlotMap::with_key();
    let mut models: SlotMap<ModelHandle, ()> = SlotMap::with_key();
    let mut textures: SlotMap<TextureHandle, ()> = SlotMap::with_key();
    let texture = textures.insert(());

    let composite = ResolvedComposite {
        quad: models.insert(()),
        quad_faces: 2,
        ui_shader: shaders.insert(()),
        aspect_shader: shaders.insert(()),
        shadow_shader: shaders.insert(()),
        foveated_clear_shader: shaders.insert(()),
    };
    let scene_shader = shaders.insert(());
    let world = vec![
        Drawable {
            shader: scene_shader,
            model: models.insert(()),
            texture: Some(texture),
            num_faces: 12,
            transform: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        },
        Drawable {
            shader: scene_shader,
            model: models.insert(()),
            texture: None,
            num_faces: 1,
            transform: Mat4::IDENTITY,
        },
    ];
    let ui = vec![Drawable {
        shader: scene_shader,
        model: composite.quad,
        texture: Some(texture),
        num_faces: 2,
        transform: Mat4::IDENTITY,
    }];
    Fixture { composite, world, ui, texture }
}

fn frame<'a>(fixture: &'a Fixture) -> FrameInput<'a> {
    FrameInput {
        world: &fixture.world,
        ui: &fixture.ui,
        light: DirectionalLight {
            ambient: Vec3::new(0.2, 0.3, 0.4),
            ..DirectionalLight::default()
        },
        ..FrameInput::empty()
    }
}

const EXTENT: Extent2D = Extent2D { width: 1600, height: 900 };

#[test]
fn test_resolve_reports_missing_slot() {
    let err = CompositeResources::default().resolve().unwrap_err();
    match err {
        Error::InvalidResource(msg) => assert!(msg.contains("framebuffer model")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_shadow_pass_uses_light_space_and_dummy_texture() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let recording = record_shadow(&frame, Extent2D::new(4096, 4096), &fixture.composite);

    assert_eq!(recording.pass, Pass::Shadow);
    assert_eq!(recording.clear, vec![ClearValue::DepthStencil { depth: 1.0, stencil: 0 }]);
    assert_eq!(recording.pass_shader, Some(fixture.composite.shadow_shader));
    assert!(!recording.bind_frame_set);
    assert_eq!(recording.scissor, Extent2D::new(4096, 4096).full_rect());

    let light_space = frame.light.light_space_matrix();
    assert_eq!(recording.draws.len(), 2);
    assert_eq!(recording.draws[0].transform, light_space * fixture.world[0].transform);
    assert_eq!(recording.draws[0].texture, BoundTexture::Texture(fixture.texture));
    assert_eq!(recording.draws[1].texture, BoundTexture::Dummy);
    assert_eq!(recording.draws[0].index_count, 36);
    assert!(recording.draws.iter().all(|d| d.shader.is_none()));
}

#[test]
fn test_world_pass_draws_scene_in_order() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let recording = record_world(&frame, Extent2D::new(800, 450));

    assert_eq!(recording.clear[0], ClearValue::Color([0.2, 0.3, 0.4, 1.0]));
    assert_eq!(recording.viewport.width, 800.0);
    assert_eq!(recording.geometry_draw_count(), 2);
    assert_eq!(recording.draws[0].model, fixture.world[0].model);
    assert_eq!(recording.draws[1].texture, BoundTexture::Unbound);
    assert_eq!(recording.draws[0].transform, fixture.world[0].transform);
}

#[test]
fn test_foveated_pass_with_foveation() {
    let fixture = fixture();
    let mut frame = frame(&fixture);
    frame.gaze = Vec2::splat(0.5);
    let recording = record_foveated(&frame, EXTENT, &RenderSettings::default(), &fixture.composite);

    assert_eq!(recording.clear[0], ClearValue::Color([0.2, 0.3, 0.4, 0.0]));
    assert_eq!(recording.viewport.width, 1600.0);
    assert_eq!((recording.scissor.x, recording.scissor.y), (680, 330));
    assert_eq!(recording.composite_draw_count(), 1);
    assert_eq!(recording.draws[0].shader, Some(fixture.composite.foveated_clear_shader));
    assert_eq!(recording.draws[0].kind, DrawKind::Composite);
    assert_eq!(recording.geometry_draw_count(), 2);
}

#[test]
fn test_foveated_pass_without_foveation_only_clears() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let mut settings = RenderSettings::default();
    settings.set_foveation_enabled(false);
    let recording = record_foveated(&frame, EXTENT, &settings, &fixture.composite);

    assert!(recording.draws.is_empty());
    assert_eq!(recording.clear.len(), 2);
}

#[test]
fn test_ui_pass_composites_world_then_foveated() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let recording = record_ui(&frame, EXTENT, &RenderSettings::default(), &fixture.composite);

    assert_eq!(recording.clear.len(), 1);
    assert_eq!(recording.draws[0].texture, BoundTexture::Framebuffer(Pass::World));
    assert_eq!(recording.draws[1].texture, BoundTexture::Framebuffer(Pass::Foveated));
    assert_eq!(recording.draws[0].index_count, 6);
    assert_eq!(recording.composite_draw_count(), 2);
    assert_eq!(recording.geometry_draw_count(), 1);
}

#[test]
fn test_ui_pass_skips_ui_drawables_when_disabled() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let mut settings = RenderSettings::default();
    settings.set_draw_ui(false);
    let recording = record_ui(&frame, EXTENT, &settings, &fixture.composite);

    assert_eq!(recording.composite_draw_count(), 2);
    assert_eq!(recording.geometry_draw_count(), 0);
}

#[test]
fn test_present_pass_draws_ui_through_aspect_shader() {
    let fixture = fixture();
    let frame = frame(&fixture);
    let recording = record_present(&frame, EXTENT, &fixture.composite, 2);

    assert_eq!(recording.swapchain_image, Some(2));
    assert_eq!(recording.draws.len(), 1);
    assert_eq!(recording.draws[0].shader, Some(fixture.composite.aspect_shader));
    assert_eq!(recording.draws[0].texture, BoundTexture::Framebuffer(Pass::Ui));
}

#[test]
fn test_present_pass_draws_overlay_after_aspect_quad() {
    let fixture = fixture();
    let overlay = fixture.ui.clone();
    let frame = FrameInput { overlay: &overlay, ..frame(&fixture) };
    let recording = record_present(&frame, EXTENT, &fixture.composite, 0);

    assert_eq!(recording.composite_draw_count(), 1);
    assert_eq!(recording.geometry_draw_count(), 1);
    assert_eq!(recording.draws[0].shader, Some(fixture.composite.aspect_shader));
    assert_eq!(recording.draws[1].kind, DrawKind::Geometry);
    assert_eq!(recording.draws[1].texture, BoundTexture::Texture(fixture.texture));
}
