/// Unit tests for glyph metrics and text layout

use glam::Vec2;
use slotmap::SlotMap;
use crate::frontend::font::*;
use crate::frontend::sprite::Transform2D;
use crate::graphics_device::TextureHandle;

fn font() -> (Font, Vec<TextureHandle>) {
    let mut textures: SlotMap<TextureHandle, ()> = SlotMap::with_key();
    let handles: Vec<TextureHandle> = (0..GLYPH_COUNT).map(|_| textures.insert(())).collect();
    let characters = handles
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            // Space has no coverage
            let texture = if i == 0 { None } else { Some(t) };
            Character::from_metrics(texture, 128, 64, 96)
        })
        .collect();
    (Font::new(characters), handles)
}

#[test]
fn test_glyph_count_covers_printable_ascii() {
    assert_eq!(GLYPH_COUNT, 95);
}

#[test]
fn test_metrics_from_bitmap() {
    let c = Character::from_metrics(None, 128, 64, 96);
    assert_eq!(c.internal_scale, Vec2::new(0.5, 0.25));
    // (2 * 96 - 128 - 64) / 256
    assert_eq!(c.internal_shift, Vec2::new(0.0, 0.0));

    let c = Character::from_metrics(None, 10, 100, 20);
    assert_eq!(c.internal_shift.y, (40.0 - 128.0 - 100.0) / 256.0);
}

#[test]
fn test_character_lookup() {
    let (font, handles) = font();
    assert_eq!(font.character('A').and_then(|c| c.texture), Some(handles['A' as usize - 32]));
    assert!(font.character('\n').is_none());
    assert!(font.character('é').is_none());
}

#[test]
fn test_layout_advances_and_scales() {
    let (font, handles) = font();
    let base = Transform2D { position: Vec2::new(-1.0, 0.5), scale: Vec2::new(2.0, 2.0), layer: 3, ..Transform2D::default() };

    let glyphs = font.layout("AB", &base, 0.1);
    assert_eq!(glyphs.len(), 2);
    assert_eq!(glyphs[0].0, handles['A' as usize - 32]);

    let scale = Vec2::new(0.5, 0.25) * 2.0 * TEXT_SCALE;
    assert!((glyphs[0].1.scale - scale).length() < 1e-6);
    assert!((glyphs[1].1.position.x - (-1.0 + 0.1 * 2.0)).abs() < 1e-6);
    assert_eq!(glyphs[1].1.layer, 3);
}

#[test]
fn test_space_advances_without_sprite() {
    let (font, _) = font();
    let glyphs = font.layout("A B", &Transform2D::default(), 0.1);
    assert_eq!(glyphs.len(), 2);
    assert!((glyphs[1].1.position.x - 0.2).abs() < 1e-6);
}
