/// Glyph metrics and text layout
///
/// A font is rasterized once per printable ASCII character (' ' up to, not
/// including, 127) at [`FONT_SIZE`] pixels. Each glyph becomes a one-channel
/// texture plus the scale and vertical shift that place it on the sprite quad.

use glam::Vec2;
use crate::frontend::sprite::Transform2D;
use crate::graphics_device::TextureHandle;

/// Pixel size glyphs are rasterized at
pub const FONT_SIZE: u32 = 256;

pub const FIRST_GLYPH: char = ' ';

/// Number of glyphs in a font, ' '..127
pub const GLYPH_COUNT: usize = 127 - FIRST_GLYPH as usize;

/// Base text size relative to a glyph's internal scale
pub const TEXT_SCALE: f32 = 0.1;

/// One rasterized glyph as decoded by the asset layer
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Distance from the baseline to the top row, in pixels
    pub bearing_top: i32,
    /// `width * height` coverage bytes
    pub pixels: Vec<u8>,
}

/// Decoded font: [`GLYPH_COUNT`] glyphs starting at [`FIRST_GLYPH`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontData {
    pub glyphs: Vec<GlyphBitmap>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Character {
    /// `None` for glyphs without coverage, such as the space
    pub texture: Option<TextureHandle>,
    pub internal_scale: Vec2,
    pub internal_shift: Vec2,
}

impl Character {
    pub fn from_metrics(texture: Option<TextureHandle>, width: u32, height: u32, bearing_top: i32) -> Self {
        let size = FONT_SIZE as f32;
        let bearing = 2 * bearing_top - (FONT_SIZE / 2) as i32 - height as i32;
        Self {
            texture,
            internal_scale: Vec2::new(width as f32 / size, height as f32 / size),
            internal_shift: Vec2::new(0.0, bearing as f32 / size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    characters: Vec<Character>,
}

impl Font {
    pub fn new(characters: Vec<Character>) -> Self {
        Self { characters }
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// Glyph of `c`, `None` outside the rasterized range
    pub fn character(&self, c: char) -> Option<&Character> {
        let index = (c as usize).checked_sub(FIRST_GLYPH as usize)?;
        self.characters.get(index)
    }

    /// Lay `text` out as glyph sprites starting at `base.position`
    ///
    /// Glyphs advance by `char_offset * base.scale.x` per character.
    /// Characters with no glyph texture still advance but produce no sprite.
    pub fn layout(&self, text: &str, base: &Transform2D, char_offset: f32) -> Vec<(TextureHandle, Transform2D)> {
        let start = base.position;
        text.chars()
            .enumerate()
            .filter_map(|(i, c)| {
                let character = self.character(c)?;
                let texture = character.texture?;
                let scale = character.internal_scale * base.scale * TEXT_SCALE;
                let position = Vec2::new(
                    start.x + char_offset * i as f32 * base.scale.x,
                    start.y + character.internal_shift.y * scale.y,
                );
                Some((texture, Transform2D { position, rotation: base.rotation, scale, layer: base.layer }))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "font_tests.rs"]
mod tests;
