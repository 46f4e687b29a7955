//! File-backed asset source
//!
//! Models are Wavefront OBJ (tobj), images PNG (image) and fonts TrueType
//! (fontdue). The two composite quads fall back to a built-in mesh when the
//! data folder does not ship them.

use std::path::{Path, PathBuf};
use foveated_engine::foveated::device::{TextureData, Vertex};
use foveated_engine::foveated::frontend::{
    AssetSource, FontData, GlyphBitmap, MeshData, ModelData, ModelNode, FIRST_GLYPH, FONT_SIZE, GLYPH_COUNT,
};
use foveated_engine::foveated::{Error, Result};
use foveated_engine::{engine_debug, engine_warn};
use glam::{Mat4, Vec2, Vec3};

const LOG_SOURCE: &str = "foveated::demo";

/// Models the Frontend loads at init, drawn as one quad covering [-1, 1]
const BUILTIN_QUADS: [&str; 2] = ["models/fbo.obj", "models/sprite.obj"];

pub struct FileAssets {
    data_path: PathBuf,
}

impl FileAssets {
    pub fn new(data_path: &Path) -> Self {
        Self { data_path: data_path.to_path_buf() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let full = self.data_path.join(path);
        if full.is_file() {
            Ok(full)
        } else {
            Err(Error::AssetNotFound(full.display().to_string()))
        }
    }
}

/// Two triangles covering [-1, 1] with texture coordinates over [0, 1]
pub fn unit_quad() -> MeshData {
    let corner = |x: f32, y: f32| {
        Vertex::new(
            Vec3::new(x, y, 0.0),
            Vec3::Z,
            Vec2::new((x + 1.0) * 0.5, (y + 1.0) * 0.5),
            Vec3::ONE,
        )
    };
    MeshData {
        vertices: vec![corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)],
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

/// Convert one triangulated, single-indexed OBJ mesh
pub fn convert_mesh(mesh: &tobj::Mesh) -> MeshData {
    let vertex_count = mesh.positions.len() / 3;
    let vec3_at = |values: &[f32], i: usize, fallback: Vec3| {
        values
            .get(3 * i..3 * i + 3)
            .map_or(fallback, |v| Vec3::new(v[0], v[1], v[2]))
    };
    let vertices = (0..vertex_count)
        .map(|i| {
            let tex_coord = mesh
                .texcoords
                .get(2 * i..2 * i + 2)
                .map_or(Vec2::ZERO, |t| Vec2::new(t[0], t[1]));
            Vertex::new(
                vec3_at(&mesh.positions, i, Vec3::ZERO),
                vec3_at(&mesh.normals, i, Vec3::Z),
                tex_coord,
                vec3_at(&mesh.vertex_color, i, Vec3::ONE),
            )
        })
        .collect();
    MeshData { vertices, indices: mesh.indices.clone() }
}

/// Image bytes with the channel count the file was stored with, rows bottom to top
pub fn convert_image(image: image::DynamicImage) -> TextureData {
    let image = image.flipv();
    let (width, height) = (image.width(), image.height());
    match image.color().channel_count() {
        1 => TextureData::new(width, height, 1, image.into_luma8().into_raw()),
        2 => TextureData::new(width, height, 2, image.into_luma_alpha8().into_raw()),
        3 => TextureData::new(width, height, 3, image.into_rgb8().into_raw()),
        _ => TextureData::new(width, height, 4, image.into_rgba8().into_raw()),
    }
}

impl AssetSource for FileAssets {
    fn load_model(&mut self, path: &str) -> Result<ModelData> {
        let file = match self.resolve(path) {
            Ok(file) => file,
            Err(e) if BUILTIN_QUADS.contains(&path) => {
                engine_debug!(LOG_SOURCE, "{} ({}), using the built-in quad", path, e);
                return Ok(ModelData { meshes: vec![unit_quad()], root: ModelNode::new(Mat4::IDENTITY, vec![0]) });
            }
            Err(e) => return Err(e),
        };

        let options = tobj::LoadOptions { triangulate: true, single_index: true, ..Default::default() };
        let (models, _materials) = tobj::load_obj(&file, &options)
            .map_err(|e| Error::InvalidResource(format!("{}: {}", file.display(), e)))?;

        let meshes: Vec<MeshData> = models.iter().map(|m| convert_mesh(&m.mesh)).collect();
        let root = ModelNode::new(Mat4::IDENTITY, (0..meshes.len()).collect());
        engine_debug!(LOG_SOURCE, "Decoded {} ({} meshes)", path, meshes.len());
        Ok(ModelData { meshes, root })
    }

    fn load_image(&mut self, path: &str) -> Result<TextureData> {
        let file = self.resolve(path)?;
        let image = image::open(&file).map_err(|e| Error::InvalidResource(format!("{}: {}", file.display(), e)))?;
        Ok(convert_image(image))
    }

    fn load_font(&mut self, path: &str) -> Result<FontData> {
        let file = self.resolve(path)?;
        let bytes = std::fs::read(&file).map_err(|e| Error::AssetNotFound(format!("{}: {}", file.display(), e)))?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| Error::InvalidResource(format!("{}: {}", file.display(), e)))?;

        let glyphs = (0..GLYPH_COUNT as u32)
            .map(|offset| {
                let c = char::from_u32(FIRST_GLYPH as u32 + offset).unwrap_or(FIRST_GLYPH);
                let (metrics, pixels) = font.rasterize(c, FONT_SIZE as f32);
                GlyphBitmap {
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    bearing_top: metrics.ymin + metrics.height as i32,
                    pixels,
                }
            })
            .collect();
        Ok(FontData { glyphs })
    }

    fn read_shader(&mut self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        std::fs::read(&file).map_err(|e| {
            engine_warn!(LOG_SOURCE, "Cannot read shader {}: {}", file.display(), e);
            Error::AssetNotFound(file.display().to_string())
        })
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
