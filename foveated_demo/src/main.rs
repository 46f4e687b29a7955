//! Foveated viewer
//!
//! Opens a window on the Vulkan backend, loads one model and follows the
//! gaze (or the mouse when no tracker module is installed).
//!
//! ```text
//! foveated_demo [--Option=Value ...] [model.obj]
//! ```
//!
//! Keys: `F` foveation, `U` UI, `G` next gaze device, `-`/`=` base resolution,
//! `[`/`]` foveated box, `Esc` quit.
//!
//! The statistics line is drawn as overlay text, so it stays on screen with
//! the UI pass off.

mod assets;

use std::path::Path;
use std::time::Instant;

use foveated_engine::foveated::config::{EngineConfig, Options};
use foveated_engine::foveated::device::DrawStage;
use foveated_engine::foveated::frontend::{Camera, Font, Frontend, ModelTree, Transform2D, MAX_UI_LAYER};
use foveated_engine::foveated::gaze::{CursorTracker, GazeDevice, GazeRegistry, MouseGaze, MOUSE_GAZE_NAME};
use foveated_engine::foveated::log::{set_logger, DefaultLogger, LogSeverity};
use foveated_engine::foveated::render::{FoveatedRenderer, RenderSettings};
use foveated_engine::foveated::{fatal, EngineContext, Error, Result};
use foveated_engine::{engine_info, engine_warn};
use foveated_engine_renderer_vulkan::foveated::VulkanGraphicsDevice;
use glam::{Mat4, Vec2, Vec3};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::assets::FileAssets;

const LOG_SOURCE: &str = "foveated::demo";
const CONFIG_FILE: &str = "config.txt";

const DEFAULT_MODEL: &str = "models/scene.obj";
const MODEL_TEXTURE: &str = "textures/scene.png";
const HUD_FONT: &str = "fonts/hud.ttf";
const WORLD_VERTEX: &str = "world.vert";
const WORLD_FRAGMENT: &str = "world.frag";

const SCALE_STEP: f32 = 0.05;
const BOX_STEP: u32 = 40;

struct Scene {
    model: ModelTree,
    /// `None` when the data folder has no HUD font
    font: Option<Font>,
}

fn load_scene(frontend: &mut Frontend, model_file: &str) -> Result<Scene> {
    let mut model = frontend.load_model(model_file)?;
    model.set_shader(frontend.load_shader(WORLD_VERTEX, WORLD_FRAGMENT, DrawStage::World)?);

    match frontend.load_texture(MODEL_TEXTURE) {
        Ok(texture) => model.set_texture(texture),
        Err(Error::AssetNotFound(path)) => engine_warn!(LOG_SOURCE, "No model texture ({}), drawing untextured", path),
        Err(e) => return Err(e),
    }

    let font = match frontend.load_font(HUD_FONT) {
        Ok(font) => Some(font),
        Err(Error::AssetNotFound(path)) => {
            engine_warn!(LOG_SOURCE, "No HUD font ({}), statistics are not drawn", path);
            None
        }
        Err(e) => return Err(e),
    };
    Ok(Scene { model, font })
}

/// Mouse factory for scanned "mouse" modules, and the fallback when the scan finds nothing
fn setup_gaze(gaze: &mut GazeRegistry, tracker: &CursorTracker, hardware_path: &Path) -> Result<()> {
    let factory_tracker = tracker.clone();
    gaze.register_factory(MOUSE_GAZE_NAME, move || {
        Ok(Box::new(MouseGaze::new(factory_tracker.clone())) as Box<dyn GazeDevice>)
    });

    if gaze.scan(hardware_path) == 0 {
        engine_info!(LOG_SOURCE, "No gaze hardware in {}, following the mouse", hardware_path.display());
        gaze.add_device(Box::new(MouseGaze::new(tracker.clone())));
    }
    gaze.select_device(0)
}

struct App {
    config: EngineConfig,
    model_file: String,
    tracker: CursorTracker,
    started: Instant,

    // Dropped before the window the swapchain presents into
    engine: Option<EngineContext>,
    scene: Option<Scene>,
    window: Option<Window>,
}

impl App {
    fn new(config: EngineConfig, model_file: Option<String>) -> Self {
        let tracker = CursorTracker::new(config.width, config.height);
        Self {
            config,
            model_file: model_file.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tracker,
            started: Instant::now(),
            engine: None,
            scene: None,
            window: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Foveated Viewer")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("create window: {}", e)))?;

        let device = VulkanGraphicsDevice::new(&window, &self.config)?;
        let renderer = FoveatedRenderer::new(device, RenderSettings::from_config(&self.config));
        let assets = FileAssets::new(&self.config.data_path);
        let mut engine = EngineContext::new(self.config.clone(), Box::new(renderer), Box::new(assets))?;

        setup_gaze(engine.gaze_mut(), &self.tracker, &self.config.hardware_path)?;
        let scene = load_scene(engine.frontend_mut(), &self.model_file)?;

        self.engine = Some(engine);
        self.scene = Some(scene);
        self.window = Some(window);
        Ok(())
    }

    fn hud_line(&self) -> Option<String> {
        let engine = self.engine.as_ref()?;
        let backend = engine.frontend().backend()?;
        let settings = backend.settings();
        let gaze = engine.gaze();
        let tracker = gaze.current_index().and_then(|i| gaze.device_name(i)).unwrap_or("none");
        let point = gaze.gaze_point();
        Some(format!(
            "{}  {} MB  gaze {} ({:.2}, {:.2})  base {:.0}%  box {}  foveation {}",
            backend.device_name(),
            backend.used_vram() / (1024 * 1024),
            tracker,
            point.x,
            point.y,
            settings.effective_base_res_scale() * 100.0,
            settings.foveated_box_size(),
            if settings.foveation_enabled() { "on" } else { "off" }
        ))
    }

    fn redraw(&mut self) -> Result<()> {
        let hud = self.hud_line();
        let aspect = self.config.aspect_ratio();
        let spin = Mat4::from_rotation_y(self.started.elapsed().as_secs_f32() * 0.5);
        let (Some(engine), Some(scene)) = (self.engine.as_mut(), self.scene.as_ref()) else {
            return Ok(());
        };

        engine.frontend_mut().set_main_camera(Camera {
            view: Mat4::look_at_rh(Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0),
        });

        engine.frame(|frontend| {
            frontend.draw_model(&scene.model, spin);
            if let (Some(font), Some(hud)) = (&scene.font, &hud) {
                let base = Transform2D {
                    position: Vec2::new(-0.95 * aspect, 0.9),
                    layer: MAX_UI_LAYER,
                    ..Transform2D::default()
                };
                frontend.draw_overlay_text(font, hud, &base, 0.05);
            }
            Ok(())
        })
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed {
            return;
        }
        if event.logical_key == Key::Named(NamedKey::Escape) {
            self.shutdown();
            event_loop.exit();
            return;
        }
        if event.logical_key.as_ref() == Key::Character("g") {
            self.next_gaze_device();
            return;
        }
        let Some(backend) = self.engine.as_mut().and_then(|e| e.frontend_mut().backend_mut()) else {
            return;
        };
        let settings = backend.settings_mut();
        match event.logical_key.as_ref() {
            Key::Character("f") => settings.set_foveation_enabled(!settings.foveation_enabled()),
            Key::Character("u") => settings.set_draw_ui(!settings.draw_ui()),
            Key::Character("-") => settings.set_base_res_scale(settings.base_res_scale() - SCALE_STEP),
            Key::Character("=") => settings.set_base_res_scale(settings.base_res_scale() + SCALE_STEP),
            Key::Character("[") => {
                settings.set_foveated_box_size(settings.foveated_box_size().saturating_sub(BOX_STEP))
            }
            Key::Character("]") => settings.set_foveated_box_size(settings.foveated_box_size() + BOX_STEP),
            _ => {}
        }
    }

    fn next_gaze_device(&mut self) {
        let Some(gaze) = self.engine.as_mut().map(|e| e.gaze_mut()) else {
            return;
        };
        if let Err(e) = gaze.select_next_device() {
            engine_warn!(LOG_SOURCE, "Gaze device switch failed: {}", e);
        }
    }

    /// Release the engine while the window is still alive
    fn shutdown(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.shutdown() {
                fatal(e);
            }
        }
        self.scene = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                fatal(e);
            }
        }
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.tracker.handle_event(&event);
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    fatal(e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn print_usage() {
    println!("Usage: foveated_demo [--Option=Value ...] [model.obj]");
    println!();
    println!("Options (also read from {}):", CONFIG_FILE);
    println!("  Width, Height, ShadowResolution, DrawUI, DataPath, HardwarePath,");
    println!("  Validation, Foveation, BaseResScale, FoveatedBoxSize");
}

fn main() {
    set_logger(DefaultLogger::with_min_severity(LogSeverity::Info));

    let mut options = Options::load(Path::new(CONFIG_FILE)).unwrap_or_else(|e| fatal(e));
    let command_line = options.apply_args(std::env::args().skip(1)).unwrap_or_else(|e| fatal(e));
    if command_line.help_requested {
        print_usage();
        return;
    }
    let config = EngineConfig::from_options(&options).unwrap_or_else(|e| fatal(e));

    let event_loop = EventLoop::new()
        .unwrap_or_else(|e| fatal(Error::InitializationFailed(format!("create event loop: {}", e))));
    let mut app = App::new(config, command_line.map_file);
    if let Err(e) = event_loop.run_app(&mut app) {
        fatal(Error::BackendError(format!("event loop: {}", e)));
    }
}
