//! Engine configuration
//!
//! Options arrive as named strings, from a `OPTION VALUE` text file and from
//! `--Name=Value` command-line overrides. [`EngineConfig`] is the typed view
//! the rest of the engine reads once before initialization.

use std::path::{Path, PathBuf};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_warn};

/// Fallback values used when an option is neither in the file nor on the command line
const DEFAULT_OPTIONS: &[(&str, &str)] = &[("Width", "1600"), ("Height", "900")];

/// Name of the data folder looked up next to the working directory
const DATA_FOLDER_NAME: &str = "data";

/// Result of feeding command-line tokens to [`Options::apply_args`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    /// `--help` was given; the caller should print usage and exit
    pub help_requested: bool,
    /// Last positional argument (the map/scene file to load)
    pub map_file: Option<String>,
}

/// Named string options
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: FxHashMap<String, String>,
}

impl Options {
    /// Empty option set (defaults still apply on lookup)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `OPTION VALUE` format
    ///
    /// Each non-empty line holds a name and a value separated by whitespace;
    /// `#` starts a comment. A later line overrides an earlier one.
    pub fn parse(text: &str) -> Result<Self> {
        let mut options = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let value = fields.next().ok_or_else(|| {
                Error::InvalidConfig(format!("line {}: option '{}' has no value", index + 1, name))
            })?;
            options.set(name, value);
        }
        Ok(options)
    }

    /// Load options from a file; a missing file yields the defaults only
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let options = Self::parse(&text)?;
                engine_debug!("foveated::config", "Loaded {} options from {}", options.len(), path.display());
                Ok(options)
            }
            Err(e) => {
                engine_warn!(
                    "foveated::config",
                    "Config file not found: {} ({}). Default options will be used",
                    path.display(),
                    e
                );
                Ok(Self::new())
            }
        }
    }

    /// Apply command-line tokens (without the program name)
    ///
    /// `--Name=Value` overrides option `Name`; a bare token is remembered as
    /// the map file. A `--token` without `=` is rejected.
    pub fn apply_args<I, S>(&mut self, args: I) -> Result<CommandLine>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut command_line = CommandLine::default();
        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" {
                command_line.help_requested = true;
            } else if let Some(param) = arg.strip_prefix("--") {
                let (name, value) = param.split_once('=').ok_or_else(|| {
                    Error::InvalidConfig(format!("bad argument '{}', expected --Option=Value", arg))
                })?;
                if name.is_empty() {
                    return Err(Error::InvalidConfig(format!("bad argument '{}', empty option name", arg)));
                }
                self.set(name, value);
            } else {
                command_line.map_file = Some(arg.to_string());
            }
        }
        Ok(command_line)
    }

    /// Set or replace an option
    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Whether the option was explicitly given (defaults do not count)
    pub fn exists(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of explicitly given options
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no option was explicitly given
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Option value, falling back to the built-in defaults
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str).or_else(|| {
            DEFAULT_OPTIONS
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        })
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        self.get_parsed(name)
    }

    pub fn get_float(&self, name: &str) -> Result<Option<f32>> {
        self.get_parsed(name)
    }

    /// Booleans accept `1`/`0`, `true`/`false`, `on`/`off`
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get_string(name) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(Some(true)),
                "0" | "false" | "off" | "no" => Ok(Some(false)),
                _ => Err(Error::InvalidConfig(format!("option {}='{}' is not a boolean", name, value))),
            },
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.get_string(name) {
            None => Ok(None),
            Some(value) => value.parse::<T>().map(Some).map_err(|_| {
                Error::InvalidConfig(format!("option {}='{}' has the wrong type", name, value))
            }),
        }
    }
}

/// Typed engine configuration, resolved before initialization
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Square shadow map size in pixels
    pub shadow_resolution: u32,
    /// Whether UI drawables (sprites, text) are composited
    pub draw_ui: bool,
    /// Root folder for models, textures, fonts and shaders
    pub data_path: PathBuf,
    /// Folder scanned for gaze-tracking modules
    pub hardware_path: PathBuf,
    /// Enable the backend's validation layers (when compiled in)
    pub enable_validation: bool,
    /// Whether the foveated pass draws geometry
    pub foveation_enabled: bool,
    /// Initial base-resolution scale of the World pass
    pub base_res_scale: f32,
    /// Initial side length of the foveated square, in pixels
    pub foveated_box_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_path = PathBuf::from(DATA_FOLDER_NAME);
        Self {
            width: 1600,
            height: 900,
            shadow_resolution: 4096,
            draw_ui: true,
            hardware_path: data_path.join("..").join("hardware"),
            data_path,
            enable_validation: cfg!(debug_assertions),
            foveation_enabled: true,
            base_res_scale: 1.0,
            foveated_box_size: crate::renderer::DEFAULT_FOVEATED_BOX_SIZE,
        }
    }
}

impl EngineConfig {
    /// Build the typed configuration from named options
    pub fn from_options(options: &Options) -> Result<Self> {
        let defaults = Self::default();

        let data_path = options
            .get_string("DataPath")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let hardware_path = options
            .get_string("HardwarePath")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_path.join("..").join("hardware"));

        let config = Self {
            width: positive(options, "Width", defaults.width)?,
            height: positive(options, "Height", defaults.height)?,
            shadow_resolution: positive(options, "ShadowResolution", defaults.shadow_resolution)?,
            draw_ui: options.get_bool("DrawUI")?.unwrap_or(defaults.draw_ui),
            data_path,
            hardware_path,
            enable_validation: options.get_bool("Validation")?.unwrap_or(defaults.enable_validation),
            foveation_enabled: options.get_bool("Foveation")?.unwrap_or(defaults.foveation_enabled),
            base_res_scale: options.get_float("BaseResScale")?.unwrap_or(defaults.base_res_scale),
            foveated_box_size: positive(options, "FoveatedBoxSize", defaults.foveated_box_size)?,
        };
        engine_debug!(
            "foveated::config",
            "Resolved config: {}x{}, shadow {}, ui {}, data '{}'",
            config.width,
            config.height,
            config.shadow_resolution,
            config.draw_ui,
            config.data_path.display()
        );
        Ok(config)
    }

    /// Absolute location of a data file
    pub fn data_file(&self, file: &str) -> PathBuf {
        self.data_path.join(file)
    }

    /// Width over height of the output window
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

fn positive(options: &Options, name: &str, default: u32) -> Result<u32> {
    match options.get_int(name)? {
        None => Ok(default),
        Some(value) if value > 0 && value <= u32::MAX as i64 => Ok(value as u32),
        Some(value) => Err(Error::InvalidConfig(format!("option {}={} must be positive", name, value))),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
