//! Frontend - scene submission and asset caches above the RenderBackend
//!
//! The Frontend owns the [`RenderBackend`] and the [`AssetSource`]. It maps
//! asset paths to backend handles (models, textures, fonts and shaders are
//! each loaded at most once per path), queues world and UI drawables for the
//! current frame, and hands them to the backend in [`Frontend::end_frame`].
//!
//! # Frame flow
//!
//! ```text
//! begin_frame()                       clears the queues
//! draw_model / draw_sprites / draw_text / draw_overlay_text
//! end_frame()                         camera + light + gaze -> backend.draw()
//! ```
//!
//! Overlay text skips the UI framebuffer and is drawn straight into the
//! presented image, so diagnostics stay visible with `DrawUI` off.

use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::frontend::asset_source::AssetSource;
use crate::frontend::font::{Character, Font, GLYPH_COUNT};
use crate::frontend::model_tree::{Mesh, ModelTree};
use crate::frontend::sprite::{order_ui, sprite_matrix, Transform2D, UiOrder};
use crate::graphics_device::{DepthMode, DrawStage, Extent2D, ShaderHandle, TextureData, TextureHandle};
use crate::renderer::{DirectionalLight, Drawable, FrameInput, RenderBackend};
use crate::{engine_debug, engine_info, engine_warn};

const FRAMEBUFFER_MODEL: &str = "models/fbo.obj";
const SPRITE_MODEL: &str = "models/sprite.obj";
const FRAMEBUFFER_VERTEX: &str = "fbo.vert";
const FRAMEBUFFER_FRAGMENT: &str = "fbo.frag";
const FOVEATED_CLEAR_FRAGMENT: &str = "fbo_foveated.frag";
const SHADOW_VERTEX: &str = "shadowpass.vert";
const SHADOW_FRAGMENT: &str = "shadowpass.frag";
const SPRITE_VERTEX: &str = "sprite.vert";
const SPRITE_FRAGMENT: &str = "sprite.frag";
const TEXT_FRAGMENT: &str = "text.frag";

/// View and projection of the main camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

pub struct Frontend {
    /// `None` once shut down
    backend: Option<Box<dyn RenderBackend>>,
    assets: Box<dyn AssetSource>,

    // ===== CACHES (keyed by path) =====
    models: FxHashMap<String, ModelTree>,
    textures: FxHashMap<String, Option<TextureHandle>>,
    fonts: FxHashMap<String, Font>,
    /// Keyed by `vertex + fragment + stage index`
    shaders: FxHashMap<String, ShaderHandle>,

    // ===== UI RESOURCES =====
    text_shader: ShaderHandle,
    sprite_shader: ShaderHandle,
    /// Text pipeline built against the present pass
    overlay_text_shader: ShaderHandle,
    sprite_quad: Mesh,
    aspect: Mat4,
    ui_order: UiOrder,

    // ===== FRAME STATE =====
    camera: Option<Camera>,
    user_data: Mat4,
    light: DirectionalLight,
    gaze: Vec2,
    world_queue: Vec<Drawable>,
    ui_queue: Vec<Drawable>,
    overlay_queue: Vec<Drawable>,
}

impl Frontend {
    /// Build the Frontend and register the composite resources with the backend
    ///
    /// # Arguments
    ///
    /// * `backend` - Renderer every draw and load goes through
    /// * `config` - Resolved engine configuration (screen size)
    /// * `assets` - Decoder for model, image, font and shader files
    ///
    /// # Returns
    ///
    /// The Frontend, or the first load error. Any error here is fatal.
    pub fn init(backend: Box<dyn RenderBackend>, config: &EngineConfig, assets: Box<dyn AssetSource>) -> Result<Self> {
        let aspect = Mat4::from_scale(Vec3::new(1.0 / config.aspect_ratio(), 1.0, 1.0));
        let mut frontend = Self {
            backend: Some(backend),
            assets,
            models: FxHashMap::default(),
            textures: FxHashMap::default(),
            fonts: FxHashMap::default(),
            shaders: FxHashMap::default(),
            text_shader: ShaderHandle::default(),
            sprite_shader: ShaderHandle::default(),
            overlay_text_shader: ShaderHandle::default(),
            sprite_quad: Mesh { model: Default::default(), texture: None, num_faces: 0 },
            aspect,
            ui_order: UiOrder::default(),
            camera: None,
            user_data: Mat4::ZERO,
            light: DirectionalLight::default(),
            gaze: Vec2::splat(0.5),
            world_queue: Vec::new(),
            ui_queue: Vec::new(),
            overlay_queue: Vec::new(),
        };

        let quad = frontend.first_mesh(FRAMEBUFFER_MODEL)?;
        let ui = frontend.load_shader(FRAMEBUFFER_VERTEX, FRAMEBUFFER_FRAGMENT, DrawStage::Ui)?;
        let present = frontend.load_shader(FRAMEBUFFER_VERTEX, FRAMEBUFFER_FRAGMENT, DrawStage::Aspect)?;
        let shadow = frontend.load_shader(SHADOW_VERTEX, SHADOW_FRAGMENT, DrawStage::Shadow)?;
        let clear = frontend.load_shader(FRAMEBUFFER_VERTEX, FOVEATED_CLEAR_FRAGMENT, DrawStage::Foveated)?;
        {
            let backend = frontend.live_backend()?;
            backend.set_framebuffer_model(quad.model, quad.num_faces);
            backend.set_framebuffer_shader(ui, DrawStage::Ui)?;
            backend.set_framebuffer_shader(present, DrawStage::Aspect)?;
            backend.set_shadow_shader(shadow);
            backend.set_foveated_clear_shader(clear);
        }

        frontend.text_shader = frontend.load_shader(SPRITE_VERTEX, TEXT_FRAGMENT, DrawStage::Ui)?;
        frontend.sprite_shader = frontend.load_shader(SPRITE_VERTEX, SPRITE_FRAGMENT, DrawStage::Ui)?;
        frontend.overlay_text_shader = frontend.load_shader(SPRITE_VERTEX, TEXT_FRAGMENT, DrawStage::Aspect)?;
        frontend.sprite_quad = frontend.first_mesh(SPRITE_MODEL)?;

        engine_info!(
            "foveated::frontend",
            "Frontend ready ({}x{}, aspect {:.3})",
            config.width,
            config.height,
            config.aspect_ratio()
        );
        Ok(frontend)
    }

    fn live_backend(&mut self) -> Result<&mut (dyn RenderBackend + 'static)> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::BackendError("frontend is shut down".to_string())),
        }
    }

    fn first_mesh(&mut self, path: &str) -> Result<Mesh> {
        let tree = self.load_model(path)?;
        tree.meshes
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("{} has no meshes", path)))
    }

    // ===== ASSET LOADING =====

    /// Load a model file, or return the cached tree for `path`
    ///
    /// The returned tree has no shader and untextured meshes; callers assign
    /// both before drawing.
    pub fn load_model(&mut self, path: &str) -> Result<ModelTree> {
        if let Some(tree) = self.models.get(path) {
            return Ok(tree.clone());
        }
        let data = self.assets.load_model(path)?;
        let backend = self.live_backend()?;

        let mut meshes = Vec::with_capacity(data.meshes.len());
        for mesh in &data.meshes {
            meshes.push(Mesh {
                model: backend.load_model(&mesh.vertices, &mesh.indices)?,
                texture: None,
                num_faces: mesh.num_faces(),
            });
        }
        let tree = ModelTree::new(data.root, meshes);

        engine_debug!("foveated::frontend", "Loaded model '{}' ({} meshes)", path, tree.meshes.len());
        self.models.insert(path.to_string(), tree.clone());
        Ok(tree)
    }

    /// Load an image, or return the cached handle for `path`
    ///
    /// A zero-sized image caches and returns `None`.
    pub fn load_texture(&mut self, path: &str) -> Result<Option<TextureHandle>> {
        if let Some(&texture) = self.textures.get(path) {
            return Ok(texture);
        }
        let data = self.assets.load_image(path)?;
        let texture = self.live_backend()?.load_texture(&data)?;

        engine_debug!("foveated::frontend", "Loaded texture '{}' ({}x{})", path, data.width, data.height);
        self.textures.insert(path.to_string(), texture);
        Ok(texture)
    }

    /// Rasterize a font into one texture per glyph, or return the cached font
    pub fn load_font(&mut self, path: &str) -> Result<Font> {
        if let Some(font) = self.fonts.get(path) {
            return Ok(font.clone());
        }
        let data = self.assets.load_font(path)?;
        if data.glyphs.len() != GLYPH_COUNT {
            engine_warn!(
                "foveated::frontend",
                "Font '{}' has {} glyphs, expected {}",
                path,
                data.glyphs.len(),
                GLYPH_COUNT
            );
        }

        let backend = self.live_backend()?;
        let mut characters = Vec::with_capacity(data.glyphs.len());
        for glyph in data.glyphs {
            let (width, height, bearing_top) = (glyph.width, glyph.height, glyph.bearing_top);
            let texture = backend.load_texture(&TextureData::new(width, height, 1, glyph.pixels))?;
            characters.push(Character::from_metrics(texture, width, height, bearing_top));
        }
        let font = Font::new(characters);

        self.fonts.insert(path.to_string(), font.clone());
        Ok(font)
    }

    /// Load a shader pair for `stage`, or return the cached handle
    ///
    /// Files resolve to `shaders/<backend folder>/<file>`.
    pub fn load_shader(&mut self, vertex_file: &str, fragment_file: &str, stage: DrawStage) -> Result<ShaderHandle> {
        let key = format!("{}{}{}", vertex_file, fragment_file, stage.index());
        if let Some(&shader) = self.shaders.get(&key) {
            return Ok(shader);
        }

        let folder = self.live_backend()?.shader_folder_name();
        let vertex_code = self.assets.read_shader(&format!("shaders/{}/{}", folder, vertex_file))?;
        let fragment_code = self.assets.read_shader(&format!("shaders/{}/{}", folder, fragment_file))?;
        let shader = self.live_backend()?.create_shader(&vertex_code, &fragment_code, stage)?;

        engine_debug!(
            "foveated::frontend",
            "Created shader {} + {} for {:?}",
            vertex_file,
            fragment_file,
            stage
        );
        self.shaders.insert(key, shader);
        Ok(shader)
    }

    // ===== FRAME =====

    pub fn begin_frame(&mut self) {
        self.world_queue.clear();
        self.ui_queue.clear();
        self.overlay_queue.clear();
    }

    /// Queue every mesh of `tree` placed by `root_transform`
    pub fn draw_model(&mut self, tree: &ModelTree, root_transform: Mat4) {
        tree.flatten_into(root_transform, &mut self.world_queue);
    }

    /// Queue screen-space sprites, one per texture/transform pair
    ///
    /// A length mismatch is logged and the shorter length is drawn.
    pub fn draw_sprites(&mut self, textures: &[Option<TextureHandle>], transforms: &[Transform2D], is_text: bool) {
        if textures.len() != transforms.len() {
            engine_warn!(
                "foveated::frontend",
                "Sprite/transform count mismatch ({} vs {}), drawing {}",
                textures.len(),
                transforms.len(),
                textures.len().min(transforms.len())
            );
        }
        let shader = if is_text { self.text_shader } else { self.sprite_shader };
        let sprites = self.sprite_drawables(textures, transforms, shader);
        self.ui_queue.extend(sprites);
    }

    fn sprite_drawables(
        &self,
        textures: &[Option<TextureHandle>],
        transforms: &[Transform2D],
        shader: ShaderHandle,
    ) -> Vec<Drawable> {
        let depth_mode = self.depth_mode();
        textures
            .iter()
            .zip(transforms)
            .map(|(&texture, transform)| Drawable {
                shader,
                model: self.sprite_quad.model,
                texture,
                num_faces: self.sprite_quad.num_faces,
                transform: sprite_matrix(transform, depth_mode, self.aspect),
            })
            .collect()
    }

    /// Queue `text` as glyph sprites, see [`Font::layout`]
    pub fn draw_text(&mut self, font: &Font, text: &str, base: &Transform2D, char_offset: f32) {
        let (textures, transforms): (Vec<_>, Vec<_>) = font
            .layout(text, base, char_offset)
            .into_iter()
            .map(|(texture, transform)| (Some(texture), transform))
            .unzip();
        self.draw_sprites(&textures, &transforms, true);
    }

    /// Queue `text` for the Present pass, over the composited frame
    ///
    /// Unlike [`Frontend::draw_text`] the glyphs are drawn at swapchain
    /// resolution and ignore the `DrawUI` toggle.
    pub fn draw_overlay_text(&mut self, font: &Font, text: &str, base: &Transform2D, char_offset: f32) {
        let (textures, transforms): (Vec<_>, Vec<_>) = font
            .layout(text, base, char_offset)
            .into_iter()
            .map(|(texture, transform)| (Some(texture), transform))
            .unzip();
        let glyphs = self.sprite_drawables(&textures, &transforms, self.overlay_text_shader);
        self.overlay_queue.extend(glyphs);
    }

    /// Submit the queued frame to the backend
    pub fn end_frame(&mut self) -> Result<()> {
        let (view, projection) = match self.camera {
            Some(camera) => (camera.view, camera.projection),
            None => (Mat4::IDENTITY, Mat4::IDENTITY),
        };
        order_ui(&mut self.ui_queue, self.ui_order);

        let frame = FrameInput {
            view,
            projection,
            user_data: self.user_data,
            world: &self.world_queue,
            ui: &self.ui_queue,
            overlay: &self.overlay_queue,
            light: self.light,
            gaze: self.gaze,
        };
        match self.backend.as_deref_mut() {
            Some(backend) => backend.draw(&frame),
            None => Err(Error::BackendError("frontend is shut down".to_string())),
        }
    }

    // ===== STATE =====

    pub fn set_gaze_point(&mut self, gaze: Vec2) {
        self.gaze = gaze;
    }

    pub fn gaze_point(&self) -> Vec2 {
        self.gaze
    }

    pub fn set_directional_light(&mut self, light: DirectionalLight) {
        self.light = light;
    }

    pub fn set_main_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    /// Draw with identity view and projection until a camera is set again
    pub fn clear_main_camera(&mut self) {
        self.camera = None;
    }

    pub fn set_shader_user_data(&mut self, user_data: Mat4) {
        self.user_data = user_data;
    }

    /// Replace the shader compositing the world framebuffers into the UI pass
    pub fn set_camera_shader(&mut self, vertex_file: &str, fragment_file: &str) -> Result<()> {
        let shader = self.load_shader(vertex_file, fragment_file, DrawStage::Ui)?;
        self.live_backend()?.set_framebuffer_shader(shader, DrawStage::Ui)
    }

    pub fn set_ui_order(&mut self, order: UiOrder) {
        self.ui_order = order;
    }

    // ===== INFO =====

    pub fn screen_resolution(&self) -> Extent2D {
        self.backend.as_ref().map(|b| b.screen_extent()).unwrap_or_default()
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.backend.as_ref().map_or(DepthMode::ZeroToOne, |b| b.depth_mode())
    }

    pub fn backend(&self) -> Option<&dyn RenderBackend> {
        self.backend.as_deref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut (dyn RenderBackend + 'static)> {
        self.backend.as_deref_mut()
    }

    pub fn world_queue(&self) -> &[Drawable] {
        &self.world_queue
    }

    pub fn ui_queue(&self) -> &[Drawable] {
        &self.ui_queue
    }

    pub fn overlay_queue(&self) -> &[Drawable] {
        &self.overlay_queue
    }

    // ===== SHUTDOWN =====

    /// Delete every cached resource, then shut the backend down
    ///
    /// A second call does nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };

        for texture in self.textures.drain().filter_map(|(_, t)| t) {
            backend.delete_texture(texture)?;
        }
        for (_, tree) in self.models.drain() {
            for mesh in tree.meshes {
                backend.delete_model(mesh.model)?;
            }
        }
        for (_, shader) in self.shaders.drain() {
            backend.delete_shader(shader)?;
        }
        for (_, font) in self.fonts.drain() {
            for texture in font.characters().iter().filter_map(|c| c.texture) {
                backend.delete_texture(texture)?;
            }
        }
        self.world_queue.clear();
        self.ui_queue.clear();
        self.overlay_queue.clear();

        backend.shutdown()?;
        engine_info!("foveated::frontend", "Frontend shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.backend.is_none()
    }
}

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod tests;
